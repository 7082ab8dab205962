//! Row-to-domain conversions shared by the query services and the API
//! boundary. Corrupt rows are logged and degraded, never a panic.

use std::collections::HashMap;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use courier_db::models::{DeliveryRow, MessageRow, UserRow};
use courier_db::parse_ts;
use courier_types::models::{
    DeliveryRecord, DeliveryStatus, MessageRecord, Platform, Role, User,
};

pub fn user_from_row(row: &UserRow) -> anyhow::Result<User> {
    Ok(User {
        id: row.id.parse()?,
        username: row.username.clone(),
        role: row.role.parse::<Role>().map_err(|e| anyhow!(e))?,
        daily_limit: row.daily_limit,
        created_at: parse_ts(&row.created_at)?,
    })
}

/// Reassemble query rows into message records. Delivery rows must arrive
/// ordered by (message_id, position), which the store's batch fetch
/// guarantees.
pub fn assemble_messages(
    messages: Vec<MessageRow>,
    deliveries: Vec<DeliveryRow>,
) -> Vec<MessageRecord> {
    let mut by_message: HashMap<String, Vec<DeliveryRow>> = HashMap::new();
    for row in deliveries {
        by_message.entry(row.message_id.clone()).or_default().push(row);
    }

    messages
        .into_iter()
        .map(|row| {
            let deliveries = by_message
                .remove(&row.id)
                .unwrap_or_default()
                .into_iter()
                .filter_map(delivery_from_row)
                .collect();
            MessageRecord {
                id: parse_uuid(&row.id, "message id"),
                user_id: parse_uuid(&row.user_id, "user_id"),
                created_at: parse_time(&row.created_at, &row.id),
                content: row.content,
                deliveries,
            }
        })
        .collect()
}

fn delivery_from_row(row: DeliveryRow) -> Option<DeliveryRecord> {
    let platform: Platform = match row.platform.parse() {
        Ok(platform) => platform,
        Err(e) => {
            warn!("Corrupt platform '{}' on delivery '{}': {}", row.platform, row.id, e);
            return None;
        }
    };
    let status: DeliveryStatus = match row.status.parse() {
        Ok(status) => status,
        Err(e) => {
            warn!("Corrupt status '{}' on delivery '{}': {}", row.status, row.id, e);
            return None;
        }
    };

    let provider_response = row.provider_response.as_deref().and_then(|raw| {
        serde_json::from_str(raw)
            .map_err(|e| warn!("Corrupt provider response on delivery '{}': {}", row.id, e))
            .ok()
    });
    let sent_at = row.sent_at.as_deref().and_then(|raw| {
        parse_ts(raw)
            .map_err(|e| warn!("Corrupt sent_at '{}' on delivery '{}': {}", raw, row.id, e))
            .ok()
    });

    Some(DeliveryRecord {
        id: parse_uuid(&row.id, "delivery id"),
        platform,
        destination: row.destination,
        status,
        provider_response,
        error_message: row.error_message,
        sent_at,
    })
}

fn parse_uuid(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

fn parse_time(raw: &str, message_id: &str) -> DateTime<Utc> {
    parse_ts(raw).unwrap_or_else(|e| {
        warn!("Corrupt created_at '{}' on message '{}': {}", raw, message_id, e);
        DateTime::default()
    })
}
