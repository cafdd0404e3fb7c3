//! Admin notifications.

use sqlx::SqlitePool;

use crate::entities::notification::{NewNotification, Notification};
use crate::errors::{DatabaseError, DatabaseResult};
use crate::time::now_timestamp;

const NOTIFICATION_COLUMNS: &str = "id, public_id, kind, title, message, reference, read_at, created_at";

pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &NewNotification) -> DatabaseResult<Notification> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            r#"
            INSERT INTO notifications (public_id, kind, title, message, reference, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(cuid2::cuid())
        .bind(request.kind)
        .bind(&request.title)
        .bind(&request.message)
        .bind(&request.reference)
        .bind(now_timestamp())
        .fetch_one(&self.pool)
        .await?;
        Ok(notification)
    }

    pub async fn list(&self, unread_only: bool, limit: i64) -> DatabaseResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE (? = false OR read_at IS NULL) \
             ORDER BY created_at DESC, id DESC LIMIT ?"
        ))
        .bind(unread_only)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    /// Mark one notification as read. Reading it twice keeps the first timestamp.
    pub async fn mark_read(&self, public_id: &str) -> DatabaseResult<Notification> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            "UPDATE notifications SET read_at = COALESCE(read_at, ?) WHERE public_id = ? RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(now_timestamp())
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;

        notification.ok_or_else(|| DatabaseError::NotFound("notification".into()))
    }

    pub async fn mark_all_read(&self) -> DatabaseResult<u64> {
        let result = sqlx::query("UPDATE notifications SET read_at = ? WHERE read_at IS NULL")
            .bind(now_timestamp())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn unread_count(&self) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notifications WHERE read_at IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::notification::NotificationKind;
    use crate::test_support::test_pool;

    fn low_stock(title: &str) -> NewNotification {
        NewNotification {
            kind: NotificationKind::LowStock,
            title: title.into(),
            message: "stock at reorder level".into(),
            reference: None,
        }
    }

    #[tokio::test]
    async fn read_tracking_updates_unread_count() {
        let (pool, _temp_dir) = test_pool().await;
        let repo = NotificationRepository::new(pool);

        let first = repo.create(&low_stock("Aspirin")).await.unwrap();
        repo.create(&low_stock("Bandages")).await.unwrap();
        repo.create(&low_stock("Gauze")).await.unwrap();
        assert_eq!(repo.unread_count().await.unwrap(), 3);

        let read = repo.mark_read(&first.public_id).await.unwrap();
        let read_at = read.read_at.clone().unwrap();
        let again = repo.mark_read(&first.public_id).await.unwrap();
        assert_eq!(again.read_at.as_deref(), Some(read_at.as_str()));

        assert_eq!(repo.list(true, 10).await.unwrap().len(), 2);
        assert_eq!(repo.list(false, 10).await.unwrap().len(), 3);
        assert_eq!(repo.list(false, 1).await.unwrap()[0].title, "Gauze");

        assert_eq!(repo.mark_all_read().await.unwrap(), 2);
        assert_eq!(repo.unread_count().await.unwrap(), 0);

        let missing = repo.mark_read("missing").await;
        assert!(matches!(missing, Err(DatabaseError::NotFound(_))));
    }
}
