//! Telegram adapter: one Bot API `sendMessage` call per delivery.

use async_trait::async_trait;
use courier_types::models::Platform;
use serde_json::json;
use tracing::{info, warn};

use crate::adapter::{DeliveryOutcome, PlatformAdapter};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

pub struct TelegramAdapter {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    default_chat_id: String,
}

impl TelegramAdapter {
    pub fn new(
        client: reqwest::Client,
        bot_token: impl Into<String>,
        default_chat_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: TELEGRAM_API_BASE.to_string(),
            bot_token: bot_token.into(),
            default_chat_id: default_chat_id.into(),
        }
    }

    /// Point the adapter at a different API host, used by tests.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[async_trait]
impl PlatformAdapter for TelegramAdapter {
    fn platform(&self) -> Platform {
        Platform::Telegram
    }

    fn is_configured(&self) -> bool {
        !self.bot_token.is_empty() && !self.default_chat_id.is_empty()
    }

    async fn send(
        &self,
        content: &str,
        destination: Option<&str>,
        sender_name: &str,
    ) -> DeliveryOutcome {
        let chat_id = match destination {
            Some(d) if !d.is_empty() => d,
            _ => self.default_chat_id.as_str(),
        };

        info!(chat_id = %chat_id, "sending message to Telegram");

        let body = json!({
            "chat_id": chat_id,
            "text": format!("*From: {}*\n\n{}", sender_name, content),
            "parse_mode": "Markdown",
        });
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);

        let response = match self.client.post(&url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "Telegram request failed");
                return DeliveryOutcome::failed(
                    Platform::Telegram,
                    chat_id,
                    format!("request error: {}", e),
                );
            }
        };

        let status = response.status();
        let payload: serde_json::Value = match response.json().await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "malformed Telegram response");
                return DeliveryOutcome::failed(
                    Platform::Telegram,
                    chat_id,
                    format!("request error: malformed response: {}", e),
                );
            }
        };

        // The Bot API signals failure both via HTTP status and an `ok`
        // field in the body; either one marks the delivery failed.
        if status.is_success() && payload.get("ok").and_then(|v| v.as_bool()) == Some(true) {
            info!(chat_id = %chat_id, "message delivered to Telegram");
            DeliveryOutcome::success(Platform::Telegram, chat_id, payload)
        } else {
            warn!(chat_id = %chat_id, status = %status, "Telegram API returned an error");
            DeliveryOutcome::failed(
                Platform::Telegram,
                chat_id,
                format!("Telegram API error: {}", payload),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_types::models::DeliveryStatus;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer) -> TelegramAdapter {
        TelegramAdapter::new(reqwest::Client::new(), "TOKEN", "777")
            .with_api_base(server.uri())
    }

    #[test]
    fn configured_needs_token_and_default_chat() {
        let client = reqwest::Client::new();
        assert!(TelegramAdapter::new(client.clone(), "t", "c").is_configured());
        assert!(!TelegramAdapter::new(client.clone(), "", "c").is_configured());
        assert!(!TelegramAdapter::new(client, "t", "").is_configured());
    }

    #[tokio::test]
    async fn delivers_to_explicit_chat_with_signature() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .and(body_partial_json(json!({
                "chat_id": "42",
                "text": "*From: alice*\n\nhello",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"message_id": 99},
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = adapter(&server).send("hello", Some("42"), "alice").await;
        assert_eq!(outcome.status, DeliveryStatus::Success);
        assert_eq!(outcome.destination, "42");
        let payload = outcome.provider_response.unwrap();
        assert_eq!(payload["result"]["message_id"], 99);
    }

    #[tokio::test]
    async fn empty_destination_falls_back_to_default_chat() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .and(body_partial_json(json!({"chat_id": "777"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(2)
            .mount(&server)
            .await;

        let a = adapter(&server);
        assert_eq!(a.send("hi", None, "alice").await.destination, "777");
        assert_eq!(a.send("hi", Some(""), "alice").await.destination, "777");
    }

    #[tokio::test]
    async fn provider_reported_failure_is_a_failed_outcome() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": false,
                "description": "Bad Request: chat not found",
            })))
            .mount(&server)
            .await;

        let outcome = adapter(&server).send("hi", Some("42"), "alice").await;
        assert_eq!(outcome.status, DeliveryStatus::Failed);
        assert!(outcome.provider_response.is_none());
        let error = outcome.error_message.unwrap();
        assert!(error.starts_with("Telegram API error:"), "{}", error);
        assert!(error.contains("chat not found"));
    }

    #[tokio::test]
    async fn non_2xx_status_is_a_failed_outcome() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({"ok": false, "description": "Internal"})),
            )
            .mount(&server)
            .await;

        let outcome = adapter(&server).send("hi", None, "alice").await;
        assert_eq!(outcome.status, DeliveryStatus::Failed);
        assert!(outcome.error_message.unwrap().starts_with("Telegram API error:"));
    }

    #[tokio::test]
    async fn malformed_body_is_a_failed_outcome() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let outcome = adapter(&server).send("hi", None, "alice").await;
        assert_eq!(outcome.status, DeliveryStatus::Failed);
        assert!(outcome.error_message.unwrap().starts_with("request error:"));
    }

    #[tokio::test]
    async fn transport_error_is_a_failed_outcome_not_a_panic() {
        // Nothing listens on this port.
        let a = TelegramAdapter::new(reqwest::Client::new(), "TOKEN", "777")
            .with_api_base("http://127.0.0.1:9");

        let outcome = a.send("hi", None, "alice").await;
        assert_eq!(outcome.status, DeliveryStatus::Failed);
        assert!(outcome.error_message.unwrap().starts_with("request error:"));
    }
}
