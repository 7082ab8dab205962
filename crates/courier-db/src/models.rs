/// Database row types; these map directly to SQLite rows.
/// Distinct from the courier-types API models to keep the DB layer
/// independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub role: String,
    pub daily_limit: i64,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: String,
}

pub struct DeliveryRow {
    pub id: String,
    pub message_id: String,
    /// Index of the destination in the original request; deliveries are
    /// read back ordered by this column.
    pub position: i64,
    pub platform: String,
    pub destination: String,
    pub status: String,
    pub provider_response: Option<String>,
    pub error_message: Option<String>,
    pub sent_at: Option<String>,
}

/// Conditional counter increment applied inside the same transaction that
/// persists a message. `limit` caps the count; an increment that would
/// pass it is dropped.
pub struct CounterBump {
    pub user_id: String,
    pub date: String,
    pub limit: i64,
}
