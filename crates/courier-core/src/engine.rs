//! The dispatch engine: quota gate, per-destination fan-out, single-
//! transaction persistence, conditional counter increment.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tracing::{debug, info, warn};
use uuid::Uuid;

use courier_db::models::{CounterBump, DeliveryRow, MessageRow};
use courier_db::{Database, date_key, format_ts};
use courier_platforms::{DeliveryOutcome, PlatformRegistry};
use courier_types::models::{DeliveryRecord, DeliveryStatus, Destination, MessageRecord, User};

use crate::error::DispatchError;
use crate::quota::{QuotaService, run_blocking};

pub struct DispatchEngine {
    db: Arc<Database>,
    registry: Arc<PlatformRegistry>,
    quota: QuotaService,
    adapter_timeout: Duration,
}

impl DispatchEngine {
    pub fn new(
        db: Arc<Database>,
        registry: Arc<PlatformRegistry>,
        adapter_timeout: Duration,
    ) -> Self {
        Self {
            quota: QuotaService::new(db.clone()),
            db,
            registry,
            adapter_timeout,
        }
    }

    /// Relay one message from `sender` to every requested destination.
    ///
    /// The quota gate runs before any adapter is invoked and before the
    /// message exists; per-destination failures are recorded as failed
    /// deliveries, never raised. The message, its deliveries, and the
    /// conditional counter increment commit as one transaction, and the
    /// counter moves by exactly 1 when at least one delivery succeeded.
    pub async fn send_message(
        &self,
        sender: &User,
        content: &str,
        destinations: &[Destination],
    ) -> Result<MessageRecord, DispatchError> {
        self.quota.check_quota(sender).await?;

        info!(
            user = %sender.username,
            destinations = destinations.len(),
            "dispatching message"
        );

        let message_id = Uuid::new_v4();
        let created_at = Utc::now();

        // Destinations are independent: fan out concurrently, reassemble
        // in request order (join_all preserves it).
        let attempts = destinations
            .iter()
            .map(|dest| self.deliver_one(dest, content, &sender.username));
        let outcomes = join_all(attempts).await;

        let mut any_success = false;
        let mut rows = Vec::with_capacity(outcomes.len());
        let mut records = Vec::with_capacity(outcomes.len());
        for (position, (outcome, sent_at)) in outcomes.into_iter().enumerate() {
            any_success |= outcome.is_success();
            let delivery_id = Uuid::new_v4();
            rows.push(DeliveryRow {
                id: delivery_id.to_string(),
                message_id: message_id.to_string(),
                position: position as i64,
                platform: outcome.platform.as_str().to_string(),
                destination: outcome.destination.clone(),
                status: outcome.status.as_str().to_string(),
                provider_response: outcome.provider_response.as_ref().map(|v| v.to_string()),
                error_message: outcome.error_message.clone(),
                sent_at: Some(format_ts(sent_at)),
            });
            records.push(DeliveryRecord {
                id: delivery_id,
                platform: outcome.platform,
                destination: outcome.destination,
                status: outcome.status,
                provider_response: outcome.provider_response,
                error_message: outcome.error_message,
                sent_at: Some(sent_at),
            });
        }

        // All-failed sends persist normally but never touch the counter:
        // one message costs one quota unit, and only when something got
        // through.
        let bump = any_success.then(|| CounterBump {
            user_id: sender.id.to_string(),
            date: date_key(created_at),
            limit: sender.daily_limit,
        });

        let message_row = MessageRow {
            id: message_id.to_string(),
            user_id: sender.id.to_string(),
            content: content.to_string(),
            created_at: format_ts(created_at),
        };

        let db = self.db.clone();
        let counted =
            run_blocking(move || db.insert_message(&message_row, &rows, bump.as_ref())).await?;

        if any_success && !counted {
            // A concurrent sender consumed the last quota slot between our
            // gate check and commit. The delivered message still persists;
            // the counter stays capped at the limit.
            warn!(
                user = %sender.username,
                "counter already at limit, increment skipped"
            );
        }

        let successful = records
            .iter()
            .filter(|d| d.status == DeliveryStatus::Success)
            .count();
        info!(
            message_id = %message_id,
            successful,
            total = records.len(),
            "message dispatch complete"
        );

        Ok(MessageRecord {
            id: message_id,
            user_id: sender.id,
            content: content.to_string(),
            created_at,
            deliveries: records,
        })
    }

    /// One destination: registry lookup, bounded adapter call, outcome.
    /// Lookup failures and timeouts become failed outcomes carrying the
    /// requested destination, since no default was ever resolved.
    async fn deliver_one(
        &self,
        dest: &Destination,
        content: &str,
        sender_name: &str,
    ) -> (DeliveryOutcome, DateTime<Utc>) {
        let requested = dest.destination.clone().unwrap_or_default();

        let outcome = match self.registry.get(dest.platform) {
            Err(err) => {
                warn!(platform = %dest.platform, error = %err, "destination rejected before dispatch");
                DeliveryOutcome::failed(dest.platform, requested, err.to_string())
            }
            Ok(adapter) => {
                debug!(platform = %dest.platform, "invoking platform adapter");
                let send = adapter.send(content, dest.destination.as_deref(), sender_name);
                match tokio::time::timeout(self.adapter_timeout, send).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(platform = %dest.platform, "adapter call timed out");
                        DeliveryOutcome::failed(
                            dest.platform,
                            requested,
                            format!("delivery timed out after {:?}", self.adapter_timeout),
                        )
                    }
                }
            }
        };

        (outcome, Utc::now())
    }
}
