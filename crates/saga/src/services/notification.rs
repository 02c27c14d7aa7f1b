//! Notification sender port and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::EmailMessage;

use super::ServiceError;

/// Trait for the external notification channel.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Sends an email message.
    async fn send_email(&self, message: &EmailMessage) -> Result<(), ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryNotificationState {
    sent: Vec<EmailMessage>,
    fail_on_send: bool,
}

/// In-memory notification sender for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationSender {
    state: Arc<RwLock<InMemoryNotificationState>>,
}

impl InMemoryNotificationSender {
    /// Creates a new in-memory sender.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the sender to fail on the next send call.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.state.write().unwrap().fail_on_send = fail;
    }

    /// Returns the number of messages sent.
    pub fn sent_count(&self) -> usize {
        self.state.read().unwrap().sent.len()
    }

    /// Returns every message sent so far.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.state.read().unwrap().sent.clone()
    }
}

#[async_trait]
impl NotificationSender for InMemoryNotificationSender {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), ServiceError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_send {
            return Err(ServiceError::Unavailable("mail relay offline".to_string()));
        }
        state.sent.push(message.clone());
        Ok(())
    }
}
