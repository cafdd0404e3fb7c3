//! Key-to-pool routing across several SQLite databases.
//!
//! Routing only. Rows are never moved between shards and nothing is
//! replicated, so a key must always be resolved with the same strategy and
//! shard count.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use pharmacy_config::{DatabaseConfig, ShardStrategy};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::connection::prepare_database;
use crate::errors::{DatabaseError, DatabaseResult};

struct Shard {
    url: String,
    pool: SqlitePool,
}

pub struct ShardManager {
    shards: Vec<Shard>,
    strategy: ShardStrategy,
    cursor: AtomicUsize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ShardSelection {
    pub index: usize,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ShardHealth {
    pub index: usize,
    pub url: String,
    pub healthy: bool,
    pub latency_ms: Option<f64>,
    pub error: Option<String>,
}

/// `h = h * 31 + byte` over the key bytes, wrapping at 32 bits.
pub fn rolling_hash(key: &str) -> u32 {
    key.bytes()
        .fold(0u32, |h, byte| h.wrapping_mul(31).wrapping_add(u32::from(byte)))
}

impl ShardManager {
    /// Open one pool per configuration, in order.
    pub async fn connect(configs: &[DatabaseConfig], strategy: ShardStrategy) -> DatabaseResult<Self> {
        let mut pools = Vec::with_capacity(configs.len());
        for config in configs {
            let pool = prepare_database(config)
                .await
                .map_err(|e| DatabaseError::Connection(format!("{e:#}")))?;
            pools.push((config.url.clone(), pool));
        }
        Self::from_pools(pools, strategy)
    }

    pub fn from_pools(pools: Vec<(String, SqlitePool)>, strategy: ShardStrategy) -> DatabaseResult<Self> {
        if pools.is_empty() {
            return Err(DatabaseError::Validation(
                "at least one shard must be configured".into(),
            ));
        }

        let shards: Vec<Shard> = pools
            .into_iter()
            .map(|(url, pool)| Shard { url, pool })
            .collect();
        info!(shards = shards.len(), ?strategy, "shard manager ready");

        Ok(Self {
            shards,
            strategy,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn strategy(&self) -> ShardStrategy {
        self.strategy
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Choose a shard for `key`.
    ///
    /// Round-robin ignores the key and rotates a shared cursor. Hashing maps
    /// the same key to the same shard for a fixed shard count.
    pub fn shard_for(&self, key: &str) -> ShardSelection {
        let count = self.shards.len();
        let index = match self.strategy {
            ShardStrategy::RoundRobin => self.cursor.fetch_add(1, Ordering::Relaxed) % count,
            ShardStrategy::Hash => rolling_hash(key) as usize % count,
        };
        ShardSelection {
            index,
            url: self.shards[index].url.clone(),
        }
    }

    pub fn pool(&self, index: usize) -> Option<&SqlitePool> {
        self.shards.get(index).map(|shard| &shard.pool)
    }

    pub async fn health(&self) -> Vec<ShardHealth> {
        let mut report = Vec::with_capacity(self.shards.len());
        for (index, shard) in self.shards.iter().enumerate() {
            let started = Instant::now();
            let probe = sqlx::query("SELECT 1").execute(&shard.pool).await;
            let entry = match probe {
                Ok(_) => ShardHealth {
                    index,
                    url: shard.url.clone(),
                    healthy: true,
                    latency_ms: Some(started.elapsed().as_secs_f64() * 1_000.0),
                    error: None,
                },
                Err(error) => {
                    warn!(index, url = %shard.url, %error, "shard health probe failed");
                    ShardHealth {
                        index,
                        url: shard.url.clone(),
                        healthy: false,
                        latency_ms: None,
                        error: Some(error.to_string()),
                    }
                }
            };
            report.push(entry);
        }
        report
    }

    pub async fn close(&self) {
        for shard in &self.shards {
            shard.pool.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn manager(count: usize, strategy: ShardStrategy) -> (ShardManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let configs: Vec<DatabaseConfig> = (0..count)
            .map(|i| DatabaseConfig {
                url: format!("sqlite://{}", temp_dir.path().join(format!("shard-{i}.db")).display()),
                max_connections: 1,
            })
            .collect();
        let manager = ShardManager::connect(&configs, strategy).await.unwrap();
        (manager, temp_dir)
    }

    #[test]
    fn rolling_hash_matches_reference_values() {
        assert_eq!(rolling_hash(""), 0);
        assert_eq!(rolling_hash("a"), 97);
        assert_eq!(rolling_hash("ab"), 97 * 31 + 98);

        let long = "x".repeat(64);
        let expected = long
            .bytes()
            .fold(0u64, |h, byte| (h * 31 + u64::from(byte)) % (1 << 32)) as u32;
        assert_eq!(rolling_hash(&long), expected);
    }

    #[tokio::test]
    async fn round_robin_rotates_through_shards() {
        let (manager, _temp_dir) = manager(3, ShardStrategy::RoundRobin).await;
        let picked: Vec<usize> = (0..6).map(|_| manager.shard_for("same-key").index).collect();
        assert_eq!(picked, vec![0, 1, 2, 0, 1, 2]);
    }

    #[tokio::test]
    async fn hash_strategy_is_stable_per_key() {
        let (manager, _temp_dir) = manager(4, ShardStrategy::Hash).await;
        let first = manager.shard_for("customer@example.com");
        let second = manager.shard_for("customer@example.com");
        assert_eq!(first, second);
        assert_eq!(first.index, rolling_hash("customer@example.com") as usize % 4);
        assert!(manager.pool(first.index).is_some());
        assert!(manager.pool(4).is_none());
    }

    #[tokio::test]
    async fn health_probes_every_shard() {
        let (manager, _temp_dir) = manager(2, ShardStrategy::Hash).await;
        let health = manager.health().await;
        assert_eq!(health.len(), 2);
        assert!(health.iter().all(|shard| shard.healthy && shard.latency_ms.is_some()));

        manager.close().await;
        let closed = manager.health().await;
        assert!(closed.iter().all(|shard| !shard.healthy));
    }

    #[test]
    fn zero_shards_is_rejected() {
        let result = ShardManager::from_pools(Vec::new(), ShardStrategy::RoundRobin);
        assert!(matches!(result, Err(DatabaseError::Validation(_))));
    }
}
