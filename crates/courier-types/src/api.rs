use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Destination, Role};

// -- JWT Claims --

/// JWT claims shared by token issuance and the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub role: Role,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
    pub destinations: Vec<Destination>,
}

// -- Admin --

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub username: String,
    pub total_messages_sent: i64,
    pub messages_sent_today: i64,
    pub remaining_messages_today: i64,
    pub daily_limit: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateLimitRequest {
    pub daily_limit: i64,
}
