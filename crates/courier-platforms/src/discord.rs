//! Discord adapter: one webhook POST per delivery.

use async_trait::async_trait;
use courier_types::models::Platform;
use serde_json::json;
use tracing::{info, warn};

use crate::adapter::{DeliveryOutcome, PlatformAdapter};

const WEBHOOK_PREFIX: &str = "https://discord.com/api/webhooks/";
const BOT_USERNAME: &str = "Courier";

pub struct DiscordAdapter {
    client: reqwest::Client,
    webhook_url: String,
}

impl DiscordAdapter {
    pub fn new(client: reqwest::Client, webhook_url: impl Into<String>) -> Self {
        Self {
            client,
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl PlatformAdapter for DiscordAdapter {
    fn platform(&self) -> Platform {
        Platform::Discord
    }

    fn is_configured(&self) -> bool {
        self.webhook_url.starts_with(WEBHOOK_PREFIX)
    }

    async fn send(
        &self,
        content: &str,
        destination: Option<&str>,
        sender_name: &str,
    ) -> DeliveryOutcome {
        // A destination override is an alternate webhook URL; otherwise the
        // configured webhook is both the target and the recorded destination.
        let webhook = match destination {
            Some(d) if !d.is_empty() => d,
            _ => self.webhook_url.as_str(),
        };

        info!("sending message to Discord webhook");

        let body = json!({
            "content": format!("**From: {}**\n\n{}", sender_name, content),
            "username": BOT_USERNAME,
        });

        let response = match self.client.post(webhook).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Discord request failed");
                return DeliveryOutcome::failed(
                    Platform::Discord,
                    webhook,
                    format!("request error: {}", e),
                );
            }
        };

        let status = response.status();
        if status.is_success() {
            // Discord replies 204 No Content on success; synthesize a
            // payload so the record still carries something inspectable.
            info!(status = %status, "message delivered to Discord");
            DeliveryOutcome::success(
                Platform::Discord,
                webhook,
                json!({
                    "status": status.as_u16(),
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                }),
            )
        } else {
            let detail = response.text().await.unwrap_or_default();
            warn!(status = %status, "Discord webhook returned an error");
            DeliveryOutcome::failed(
                Platform::Discord,
                webhook,
                format!("Discord webhook error: status {}: {}", status, detail),
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

    #[test]
    fn configured_requires_a_discord_webhook_url() {
        let client = reqwest::Client::new();
        assert!(
            DiscordAdapter::new(client.clone(), "https://discord.com/api/webhooks/1/abc")
                .is_configured()
        );
        assert!(!DiscordAdapter::new(client.clone(), "").is_configured());
        assert!(!DiscordAdapter::new(client, "https://example.com/hook").is_configured());
    }

    #[tokio::test]
    async fn posts_signed_content_to_configured_webhook() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/webhooks/1/abc"))
            .and(body_partial_json(json!({
                "content": "**From: alice**\n\nhello",
                "username": "Courier",
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let webhook = format!("{}/api/webhooks/1/abc", server.uri());
        let adapter = DiscordAdapter::new(reqwest::Client::new(), webhook.clone());

        let outcome = adapter.send("hello", None, "alice").await;
        assert_eq!(outcome.status, DeliveryStatus::Success);
        assert_eq!(outcome.destination, webhook);
        let payload = outcome.provider_response.unwrap();
        assert_eq!(payload["status"], 204);
    }

    #[tokio::test]
    async fn destination_override_targets_alternate_webhook() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/webhooks/2/alt"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = DiscordAdapter::new(
            reqwest::Client::new(),
            format!("{}/api/webhooks/1/abc", server.uri()),
        );
        let alt = format!("{}/api/webhooks/2/alt", server.uri());

        let outcome = adapter.send("hello", Some(&alt), "alice").await;
        assert_eq!(outcome.status, DeliveryStatus::Success);
        assert_eq!(outcome.destination, alt);
    }

    #[tokio::test]
    async fn error_status_captures_response_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/webhooks/1/abc"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"message": "Invalid Webhook Token"}"#),
            )
            .mount(&server)
            .await;

        let adapter = DiscordAdapter::new(
            reqwest::Client::new(),
            format!("{}/api/webhooks/1/abc", server.uri()),
        );

        let outcome = adapter.send("hello", None, "alice").await;
        assert_eq!(outcome.status, DeliveryStatus::Failed);
        let error = outcome.error_message.unwrap();
        assert!(error.starts_with("Discord webhook error:"), "{}", error);
        assert!(error.contains("Invalid Webhook Token"));
    }

    #[tokio::test]
    async fn transport_error_is_a_failed_outcome() {
        let adapter = DiscordAdapter::new(reqwest::Client::new(), "http://127.0.0.1:9/hook");
        let outcome = adapter.send("hello", None, "alice").await;
        assert_eq!(outcome.status, DeliveryStatus::Failed);
        assert!(outcome.error_message.unwrap().starts_with("request error:"));
    }
}
