//! Outbound notification seam.
//!
//! The lifecycle engine treats delivery as advisory: state changes commit
//! before any notification is attempted and are never rolled back when
//! delivery fails (the failure still surfaces to the caller).

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

/// A single outbound message.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Message {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: Message) -> Result<()>;
}

/// Posts messages as JSON to a configured webhook, suitable for bridging to
/// a mail relay or chat hook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String, timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .user_agent("Gatehouse/1.0")
            .build()
            .context("Failed to build notifier HTTP client")?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, message: Message) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&message)
            .send()
            .await
            .context("Notification webhook request failed")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Notification webhook returned status {}",
                response.status()
            );
        }

        Ok(())
    }
}

/// Fallback when no webhook is configured: messages land in the log stream.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: Message) -> Result<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            "Notification (no webhook configured): {}",
            message.body
        );
        Ok(())
    }
}

/// Records messages in memory; used by tests to assert what was sent.
#[derive(Default)]
pub struct MemoryNotifier {
    sent: std::sync::Mutex<Vec<Message>>,
    fail: std::sync::atomic::AtomicBool,
}

impl MemoryNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }

    /// Makes subsequent sends fail, for exercising the
    /// durable-state / best-effort-notify policy.
    pub fn fail_next_sends(&self, fail: bool) {
        self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send(&self, message: Message) -> Result<()> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            anyhow::bail!("Simulated notifier outage");
        }
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(message);
        Ok(())
    }
}
