//! Per-user usage metrics for the admin surface.

use std::sync::Arc;

use chrono::Utc;

use courier_db::{Database, date_key};
use courier_types::api::MetricsResponse;

use crate::error::DispatchError;
use crate::quota::run_blocking;

#[derive(Clone)]
pub struct MetricsService {
    db: Arc<Database>,
}

impl MetricsService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Lifetime and today's usage for every user.
    pub async fn all_user_metrics(&self) -> Result<Vec<MetricsResponse>, DispatchError> {
        let db = self.db.clone();
        run_blocking(move || {
            let today = date_key(Utc::now());
            db.list_users()?
                .into_iter()
                .map(|user| {
                    let total = db.count_messages_by_user(&user.id)?;
                    let sent_today = db.get_daily_count(&user.id, &today)?;
                    Ok(MetricsResponse {
                        username: user.username,
                        total_messages_sent: total,
                        messages_sent_today: sent_today,
                        remaining_messages_today: (user.daily_limit - sent_today).max(0),
                        daily_limit: user.daily_limit,
                    })
                })
                .collect()
        })
        .await
    }
}
