//! Point-in-time copies of the primary database.

use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::fs;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::errors::{DatabaseError, DatabaseResult};
use crate::time::format_timestamp;

const FILE_PREFIX: &str = "pharmacy-";
const FILE_SUFFIX: &str = ".db";
const STAMP_FORMAT: &str = "%Y%m%dT%H%M%S%3fZ";

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BackupRecord {
    pub file_name: String,
    pub size_bytes: u64,
    pub created_at: String,
}

/// Writes `VACUUM INTO` snapshots to a directory and keeps the newest
/// `retention` of them.
#[derive(Debug, Clone)]
pub struct BackupManager {
    directory: PathBuf,
    retention: usize,
}

impl BackupManager {
    pub fn new(directory: impl Into<PathBuf>, retention: usize) -> Self {
        Self {
            directory: directory.into(),
            retention: retention.max(1),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    pub async fn create_backup(&self, pool: &SqlitePool) -> DatabaseResult<BackupRecord> {
        fs::create_dir_all(&self.directory).await.map_err(|e| {
            DatabaseError::Backup(format!(
                "failed to create backup directory {}: {e}",
                self.directory.display()
            ))
        })?;

        let now = Utc::now();
        let mut file_name = backup_file_name(now.naive_utc());
        let mut offset = 1;
        while fs::try_exists(self.directory.join(&file_name)).await.unwrap_or(false) {
            file_name = backup_file_name((now + Duration::milliseconds(offset)).naive_utc());
            offset += 1;
        }

        let path = self.directory.join(&file_name);
        let target = path.to_string_lossy().into_owned();
        sqlx::query("VACUUM INTO ?")
            .bind(&target)
            .execute(pool)
            .await?;

        let record = self.record_for(&file_name).await?;
        info!(file = %record.file_name, size_bytes = record.size_bytes, "database backup written");

        let removed = self.prune().await?;
        if !removed.is_empty() {
            info!(removed = removed.len(), "pruned old backups");
        }
        Ok(record)
    }

    /// Backups written by this manager, newest first.
    pub async fn list_backups(&self) -> DatabaseResult<Vec<BackupRecord>> {
        let mut names = self.backup_file_names().await?;
        names.sort_unstable_by(|a, b| b.cmp(a));

        let mut records = Vec::with_capacity(names.len());
        for name in names {
            records.push(self.record_for(&name).await?);
        }
        Ok(records)
    }

    /// Delete the oldest backups beyond the retention count. Returns the removed file names.
    pub async fn prune(&self) -> DatabaseResult<Vec<String>> {
        let mut names = self.backup_file_names().await?;
        names.sort_unstable_by(|a, b| b.cmp(a));

        let mut removed = Vec::new();
        for name in names.into_iter().skip(self.retention) {
            match fs::remove_file(self.directory.join(&name)).await {
                Ok(()) => removed.push(name),
                Err(error) => warn!(file = %name, %error, "failed to remove old backup"),
            }
        }
        Ok(removed)
    }

    async fn backup_file_names(&self) -> DatabaseResult<Vec<String>> {
        let mut entries = match fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => {
                return Err(DatabaseError::Backup(format!(
                    "failed to read backup directory {}: {error}",
                    self.directory.display()
                )))
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DatabaseError::Backup(e.to_string()))?
        {
            if let Some(name) = entry.file_name().to_str() {
                if parse_backup_stamp(name).is_some() {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    async fn record_for(&self, file_name: &str) -> DatabaseResult<BackupRecord> {
        let metadata = fs::metadata(self.directory.join(file_name))
            .await
            .map_err(|e| DatabaseError::Backup(format!("failed to stat {file_name}: {e}")))?;
        let created_at = parse_backup_stamp(file_name)
            .map(|stamp| format_timestamp(stamp.and_utc()))
            .ok_or_else(|| DatabaseError::Backup(format!("unexpected backup name {file_name}")))?;

        Ok(BackupRecord {
            file_name: file_name.to_string(),
            size_bytes: metadata.len(),
            created_at,
        })
    }
}

fn backup_file_name(at: NaiveDateTime) -> String {
    format!("{FILE_PREFIX}{}{FILE_SUFFIX}", at.format(STAMP_FORMAT))
}

fn parse_backup_stamp(file_name: &str) -> Option<NaiveDateTime> {
    let stamp = file_name
        .strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)?;
    NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_customer, test_pool};
    use tempfile::TempDir;

    #[test]
    fn only_manager_file_names_are_recognised() {
        assert!(parse_backup_stamp("pharmacy-20250102T030405123Z.db").is_some());
        assert!(parse_backup_stamp("pharmacy-latest.db").is_none());
        assert!(parse_backup_stamp("notes.txt").is_none());
        assert!(parse_backup_stamp("../pharmacy-20250102T030405123Z.db").is_none());
    }

    #[tokio::test]
    async fn backup_contains_current_rows() {
        let (pool, _db_dir) = test_pool().await;
        seed_customer(&pool, "kept@example.com").await;
        let backup_dir = TempDir::new().unwrap();
        let manager = BackupManager::new(backup_dir.path().join("snapshots"), 3);

        let record = manager.create_backup(&pool).await.unwrap();
        assert!(record.size_bytes > 0);
        assert!(record.file_name.starts_with("pharmacy-"));

        let copy = sqlx::SqlitePool::connect(&format!(
            "sqlite://{}",
            manager.directory().join(&record.file_name).display()
        ))
        .await
        .unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM customers")
            .fetch_one(&copy)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn retention_keeps_newest_backups() {
        let (pool, _db_dir) = test_pool().await;
        let backup_dir = TempDir::new().unwrap();
        std::fs::write(backup_dir.path().join("unrelated.txt"), b"keep me").unwrap();
        let manager = BackupManager::new(backup_dir.path(), 2);

        let mut created = Vec::new();
        for _ in 0..4 {
            created.push(manager.create_backup(&pool).await.unwrap().file_name);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let listed: Vec<String> = manager
            .list_backups()
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.file_name)
            .collect();
        assert_eq!(listed, vec![created[3].clone(), created[2].clone()]);
        assert!(backup_dir.path().join("unrelated.txt").exists());
    }

    #[tokio::test]
    async fn listing_missing_directory_is_empty() {
        let backup_dir = TempDir::new().unwrap();
        let manager = BackupManager::new(backup_dir.path().join("absent"), 5);
        assert!(manager.list_backups().await.unwrap().is_empty());
    }
}
