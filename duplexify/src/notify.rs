//! Error notifications.
//!
//! On a terminal merge failure the worker hands a short description to a
//! [`Notifier`]. Delivery is best effort: failures are logged and dropped.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{Config, PushoverConfig};
use crate::error::{DuplexifyError, Result};

/// Pushover messages endpoint.
pub const PUSHOVER_ENDPOINT: &str = "https://api.pushover.net/1/messages.json";

const PUSHOVER_TITLE: &str = "Duplexify Error";

/// Receives error text on terminal merge failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `message`. Never fails from the caller's point of view.
    async fn send(&self, message: &str);
}

/// Notifier used when nothing is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn send(&self, _message: &str) {}
}

#[derive(Debug, Serialize)]
struct PushoverPayload<'a> {
    token: &'a str,
    user: &'a str,
    message: &'a str,
    title: &'a str,
    priority: i8,
}

/// Sends notifications through the Pushover API.
#[derive(Debug, Clone)]
pub struct PushoverNotifier {
    client: reqwest::Client,
    endpoint: String,
    credentials: PushoverConfig,
}

impl PushoverNotifier {
    /// Create a notifier posting to the public Pushover endpoint.
    pub fn new(credentials: PushoverConfig) -> Self {
        Self::with_endpoint(credentials, PUSHOVER_ENDPOINT)
    }

    /// Create a notifier posting to `endpoint`.
    pub fn with_endpoint(credentials: PushoverConfig, endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            credentials,
        }
    }

    async fn try_send(&self, message: &str) -> Result<()> {
        let payload = PushoverPayload {
            token: &self.credentials.token,
            user: &self.credentials.user,
            message,
            title: PUSHOVER_TITLE,
            priority: 1,
        };

        self.client
            .post(&self.endpoint)
            .timeout(Duration::from_secs(10))
            .json(&payload)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| DuplexifyError::notification(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    async fn send(&self, message: &str) {
        if let Err(err) = self.try_send(message).await {
            warn!(error = %err, "Error notification was not delivered");
        }
    }
}

/// Pick Pushover when credentials are configured, the no-op notifier otherwise.
pub fn notifier_from_config(config: &Config) -> Arc<dyn Notifier> {
    match &config.pushover {
        Some(credentials) => {
            info!("Configured Pushover for error notifications");
            Arc::new(PushoverNotifier::new(credentials.clone()))
        }
        None => Arc::new(NullNotifier),
    }
}
