//! Per-user daily send quota over the durable counter table.

use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use tracing::warn;

use courier_db::{Database, date_key};
use courier_types::models::User;

use crate::error::DispatchError;

#[derive(Clone)]
pub struct QuotaService {
    db: Arc<Database>,
}

impl QuotaService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Hard precondition gate for a send: rejects once today's count has
    /// reached the user's limit. The check is read-only; a rejected
    /// request leaves no trace.
    pub async fn check_quota(&self, user: &User) -> Result<(), DispatchError> {
        let count = self.today_count(user).await?;
        if count >= user.daily_limit {
            warn!(
                user = %user.username,
                count,
                limit = user.daily_limit,
                "daily message limit reached"
            );
            return Err(DispatchError::RateLimited {
                username: user.username.clone(),
                limit: user.daily_limit,
            });
        }
        Ok(())
    }

    /// Standalone atomic increment of today's counter, capped at the
    /// user's limit. The dispatch engine instead applies the increment
    /// inside the message-persist transaction; this entry point exists
    /// for callers outside that path.
    pub async fn increment_counter(&self, user: &User) -> Result<bool, DispatchError> {
        let db = self.db.clone();
        let user_id = user.id.to_string();
        let limit = user.daily_limit;
        run_blocking(move || db.increment_daily_count(&user_id, &date_key(Utc::now()), limit)).await
    }

    /// Reporting only, never consulted on the write path.
    pub async fn get_remaining(&self, user: &User) -> Result<i64, DispatchError> {
        let count = self.today_count(user).await?;
        Ok((user.daily_limit - count).max(0))
    }

    async fn today_count(&self, user: &User) -> Result<i64, DispatchError> {
        let db = self.db.clone();
        let user_id = user.id.to_string();
        run_blocking(move || db.get_daily_count(&user_id, &date_key(Utc::now()))).await
    }
}

/// Run a blocking rusqlite call off the async runtime.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, DispatchError>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DispatchError::Storage(anyhow!("spawn_blocking join error: {}", e)))?
        .map_err(DispatchError::Storage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_db::format_ts;
    use courier_db::models::UserRow;
    use courier_types::models::Role;
    use uuid::Uuid;

    fn seed_user(db: &Database, daily_limit: i64) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            role: Role::User,
            daily_limit,
            created_at: Utc::now(),
        };
        db.create_user(&UserRow {
            id: user.id.to_string(),
            username: user.username.clone(),
            password: "hash".to_string(),
            role: "user".to_string(),
            daily_limit,
            created_at: format_ts(user.created_at),
        })
        .unwrap();
        user
    }

    fn service() -> (Arc<Database>, QuotaService) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        (db.clone(), QuotaService::new(db))
    }

    #[tokio::test]
    async fn check_passes_below_the_limit() {
        let (db, quota) = service();
        let user = seed_user(&db, 2);

        assert!(quota.check_quota(&user).await.is_ok());
        assert!(quota.increment_counter(&user).await.unwrap());
        assert!(quota.check_quota(&user).await.is_ok());
    }

    #[tokio::test]
    async fn check_rejects_at_the_limit() {
        let (db, quota) = service();
        let user = seed_user(&db, 1);

        assert!(quota.increment_counter(&user).await.unwrap());
        let err = quota.check_quota(&user).await.unwrap_err();
        assert!(matches!(err, DispatchError::RateLimited { limit: 1, .. }));
    }

    #[tokio::test]
    async fn zero_limit_user_is_always_rejected() {
        let (db, quota) = service();
        let user = seed_user(&db, 0);

        assert!(matches!(
            quota.check_quota(&user).await,
            Err(DispatchError::RateLimited { .. })
        ));
        assert_eq!(quota.get_remaining(&user).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn remaining_counts_down_and_floors_at_zero() {
        let (db, quota) = service();
        let user = seed_user(&db, 3);

        assert_eq!(quota.get_remaining(&user).await.unwrap(), 3);
        quota.increment_counter(&user).await.unwrap();
        quota.increment_counter(&user).await.unwrap();
        assert_eq!(quota.get_remaining(&user).await.unwrap(), 1);

        // An admin lowering the limit below today's count must not
        // produce a negative remainder.
        let tightened = User { daily_limit: 1, ..user };
        assert_eq!(quota.get_remaining(&tightened).await.unwrap(), 0);
    }
}
