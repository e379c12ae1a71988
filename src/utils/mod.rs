pub mod username_cache;
