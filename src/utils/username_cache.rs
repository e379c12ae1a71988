use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use sqlx::MySqlPool;
use std::time::Duration;
use tracing::info;

/// In-memory cache of taken usernames, sitting in front of the uniqueness
/// check so repeated registration attempts skip the database. Only positive
/// ("taken") entries are stored; a miss falls through to the DB.
pub struct UsernameCache {
    cache: Cache<String, bool>,
}

impl UsernameCache {
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(500_000)
                .time_to_live(Duration::from_secs(86400)) // 24h TTL
                .build(),
        }
    }

    /// Mark a username as taken.
    pub async fn mark_taken(&self, username: &str) {
        self.cache.insert(username.to_lowercase(), true).await;
    }

    /// Forget a username (the owning user was deleted).
    pub async fn mark_available(&self, username: &str) {
        self.cache.invalidate(&username.to_lowercase()).await;
    }

    pub async fn is_taken(&self, username: &str) -> bool {
        self.cache
            .get(&username.to_lowercase())
            .await
            .unwrap_or(false)
    }

    async fn batch_mark(&self, usernames: &[String]) {
        let futures: Vec<_> = usernames
            .iter()
            .map(|u| self.cache.insert(u.to_lowercase(), true))
            .collect();

        futures::future::join_all(futures).await;
    }

    /// Load existing usernames from the database in batches.
    pub async fn warmup(&self, pool: &MySqlPool, batch_size: usize) -> Result<()> {
        let mut stream =
            sqlx::query_as::<_, (String,)>("SELECT username FROM users ORDER BY created_at DESC")
                .fetch(pool);

        let mut batch = Vec::with_capacity(batch_size);
        let mut total_count = 0usize;

        while let Some(row) = stream.next().await {
            let (username,) = row?;
            batch.push(username);
            total_count += 1;

            if batch.len() >= batch_size {
                self.batch_mark(&batch).await;
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.batch_mark(&batch).await;
        }

        info!("Username cache warmup complete: {} users", total_count);

        Ok(())
    }
}

impl Default for UsernameCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn taken_then_available_round_trip() {
        let cache = UsernameCache::new();
        assert!(!cache.is_taken("alice").await);

        cache.mark_taken("alice").await;
        assert!(cache.is_taken("alice").await);
        // lookups are case-insensitive
        assert!(cache.is_taken("ALICE").await);

        cache.mark_available("Alice").await;
        assert!(!cache.is_taken("alice").await);
    }
}
