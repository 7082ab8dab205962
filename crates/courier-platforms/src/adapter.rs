//! The adapter contract every notification platform implements.

use async_trait::async_trait;
use courier_types::models::{DeliveryStatus, Platform};

/// Normalized result of one delivery attempt against one platform.
///
/// Adapters never surface transport or provider failures as errors; they
/// are folded into a `Failed` outcome so one destination can never abort
/// its siblings.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub platform: Platform,
    /// The destination actually used (after default substitution), or the
    /// requested one when the attempt never reached the network.
    pub destination: String,
    pub status: DeliveryStatus,
    pub provider_response: Option<serde_json::Value>,
    pub error_message: Option<String>,
}

impl DeliveryOutcome {
    pub fn success(
        platform: Platform,
        destination: impl Into<String>,
        response: serde_json::Value,
    ) -> Self {
        Self {
            platform,
            destination: destination.into(),
            status: DeliveryStatus::Success,
            provider_response: Some(response),
            error_message: None,
        }
    }

    pub fn failed(
        platform: Platform,
        destination: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            destination: destination.into(),
            status: DeliveryStatus::Failed,
            provider_response: None,
            error_message: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DeliveryStatus::Success
    }
}

/// One outbound call per invocation, no retries. `is_configured` must stay
/// cheap; the registry consults it on every dispatch.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// The platform tag this adapter serves; used as the registry key.
    fn platform(&self) -> Platform;

    /// Whether required configuration is present and superficially
    /// well-formed. Pure, no I/O.
    fn is_configured(&self) -> bool;

    /// Deliver `content` signed with `sender_name`. A missing or empty
    /// destination means the adapter's configured default.
    async fn send(
        &self,
        content: &str,
        destination: Option<&str>,
        sender_name: &str,
    ) -> DeliveryOutcome;
}
