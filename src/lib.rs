// Re-exported under the crate namespace so integration tests can mount the
// app the same way main does.
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod model;
pub mod routes;
pub mod utils;
