use crate::models::{CounterBump, DeliveryRow, MessageRow, UserRow};
use crate::{Database, format_ts};
use anyhow::Result;
use courier_types::models::MessageFilter;
use rusqlite::{Connection, OptionalExtension};

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &UserRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, role, daily_limit, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    user.id,
                    user.username,
                    user.password,
                    user.role,
                    user.daily_limit,
                    user.created_at
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, password, role, daily_limit, created_at
                 FROM users ORDER BY username",
            )?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns false when no user with that id exists.
    pub fn update_user_limit(&self, id: &str, daily_limit: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users SET daily_limit = ?1 WHERE id = ?2",
                rusqlite::params![daily_limit, id],
            )?;
            Ok(updated > 0)
        })
    }

    // -- Messages --

    /// Persist a message with all of its deliveries, and optionally apply
    /// the daily-counter bump, as one transaction. Returns whether the
    /// counter was actually incremented.
    pub fn insert_message(
        &self,
        message: &MessageRow,
        deliveries: &[DeliveryRow],
        bump: Option<&CounterBump>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO messages (id, user_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![message.id, message.user_id, message.content, message.created_at],
            )?;

            for delivery in deliveries {
                tx.execute(
                    "INSERT INTO message_deliveries
                     (id, message_id, position, platform, destination, status,
                      provider_response, error_message, sent_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    rusqlite::params![
                        delivery.id,
                        delivery.message_id,
                        delivery.position,
                        delivery.platform,
                        delivery.destination,
                        delivery.status,
                        delivery.provider_response,
                        delivery.error_message,
                        delivery.sent_at
                    ],
                )?;
            }

            let counted = match bump {
                Some(bump) => bump_counter(&tx, bump)?,
                None => false,
            };

            tx.commit()?;
            Ok(counted)
        })
    }

    /// Messages for one owner (or every owner when `owner` is None),
    /// newest first. Status/platform filters match messages that have at
    /// least one delivery satisfying them.
    pub fn get_messages(&self, owner: Option<&str>, filter: &MessageFilter) -> Result<Vec<MessageRow>> {
        let mut sql = String::from(
            "SELECT m.id, m.user_id, m.content, m.created_at FROM messages m WHERE 1=1",
        );
        let mut values: Vec<String> = Vec::new();

        if let Some(user_id) = owner {
            sql.push_str(" AND m.user_id = ?");
            values.push(user_id.to_string());
        }
        if let Some(from) = filter.from {
            sql.push_str(" AND m.created_at >= ?");
            values.push(format_ts(from));
        }
        if let Some(to) = filter.to {
            sql.push_str(" AND m.created_at <= ?");
            values.push(format_ts(to));
        }
        if filter.status.is_some() || filter.platform.is_some() {
            sql.push_str(" AND EXISTS (SELECT 1 FROM message_deliveries d WHERE d.message_id = m.id");
            if let Some(status) = filter.status {
                sql.push_str(" AND d.status = ?");
                values.push(status.as_str().to_string());
            }
            if let Some(platform) = filter.platform {
                sql.push_str(" AND d.platform = ?");
                values.push(platform.as_str().to_string());
            }
            sql.push(')');
        }
        sql.push_str(" ORDER BY m.created_at DESC");

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> =
                values.iter().map(|v| v as &dyn rusqlite::types::ToSql).collect();
            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        content: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch deliveries for a set of message IDs, request order
    /// within each message.
    pub fn get_deliveries_for_messages(&self, message_ids: &[String]) -> Result<Vec<DeliveryRow>> {
        if message_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=message_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, message_id, position, platform, destination, status,
                        provider_response, error_message, sent_at
                 FROM message_deliveries WHERE message_id IN ({})
                 ORDER BY message_id, position",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = message_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(DeliveryRow {
                        id: row.get(0)?,
                        message_id: row.get(1)?,
                        position: row.get(2)?,
                        platform: row.get(3)?,
                        destination: row.get(4)?,
                        status: row.get(5)?,
                        provider_response: row.get(6)?,
                        error_message: row.get(7)?,
                        sent_at: row.get(8)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Lifetime message total for one user, independent of the daily counter.
    pub fn count_messages_by_user(&self, user_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    // -- Daily counters --

    /// Today's count for a user; absent row reads as 0 (the read path
    /// never creates rows).
    pub fn get_daily_count(&self, user_id: &str, date: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn
                .query_row(
                    "SELECT count FROM daily_message_counts WHERE user_id = ?1 AND date = ?2",
                    rusqlite::params![user_id, date],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(count.unwrap_or(0))
        })
    }

    /// Standalone atomic increment. Returns false when the count already
    /// sits at the limit.
    pub fn increment_daily_count(&self, user_id: &str, date: &str, limit: i64) -> Result<bool> {
        let bump = CounterBump {
            user_id: user_id.to_string(),
            date: date.to_string(),
            limit,
        };
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let counted = bump_counter(&tx, &bump)?;
            tx.commit()?;
            Ok(counted)
        })
    }
}

/// Idempotent row creation plus a conditional single-statement increment.
/// Never reads the count back before writing, so two racing callers cannot
/// both observe "one below the limit" and both pass it.
fn bump_counter(conn: &Connection, bump: &CounterBump) -> Result<bool> {
    conn.execute(
        "INSERT OR IGNORE INTO daily_message_counts (user_id, date, count) VALUES (?1, ?2, 0)",
        rusqlite::params![bump.user_id, bump.date],
    )?;
    let updated = conn.execute(
        "UPDATE daily_message_counts SET count = count + 1
         WHERE user_id = ?1 AND date = ?2 AND count < ?3",
        rusqlite::params![bump.user_id, bump.date, bump.limit],
    )?;
    Ok(updated > 0)
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // column is a compile-time constant ("id" / "username"), never user input
    let sql = format!(
        "SELECT id, username, password, role, daily_limit, created_at FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], user_from_row).optional()?;
    Ok(row)
}

fn user_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<UserRow, rusqlite::Error> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        role: row.get(3)?,
        daily_limit: row.get(4)?,
        created_at: row.get(5)?,
    })
}
