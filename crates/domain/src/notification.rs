//! Notification payloads.

use serde::{Deserialize, Serialize};

/// A plain-text email message.
///
/// Template rendering happens upstream; the core only carries the
/// finished message through the task queue to the notification sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub sender: String,
    pub about: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_roundtrip() {
        let message = EmailMessage {
            to: "taro@example.com".to_string(),
            sender: "noreply@example.com".to_string(),
            about: "Your order".to_string(),
            text: "Thank you for your order.".to_string(),
        };
        let json = serde_json::to_string(&message).unwrap();
        let deserialized: EmailMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(message, deserialized);
    }
}
