use std::sync::Mutex;

use async_trait::async_trait;

use super::{EmailError, Mailer, OutgoingEmail};

/// Mailer used when SMTP is not configured.
///
/// Messages are traced at `info` and kept in memory so local development
/// and tests can read magic links without a mail server.
#[derive(Default)]
pub struct LogMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl LogMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything "sent" so far, oldest first.
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// The most recent message addressed to `to`.
    pub fn last_to(&self, to: &str) -> Option<OutgoingEmail> {
        self.sent().into_iter().rev().find(|m| m.to.eq_ignore_ascii_case(to))
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            body = %email.body,
            "Email (log mailer, not delivered)"
        );
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(to: &str, subject: &str) -> OutgoingEmail {
        OutgoingEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: String::new(),
        }
    }

    #[tokio::test]
    async fn keeps_messages_in_order() {
        let mailer = LogMailer::new();
        mailer.send(email("a@example.com", "one")).await.unwrap();
        mailer.send(email("b@example.com", "two")).await.unwrap();
        mailer.send(email("A@example.com", "three")).await.unwrap();

        assert_eq!(mailer.sent().len(), 3);
        assert_eq!(mailer.last_to("a@example.com").unwrap().subject, "three");
        assert!(mailer.last_to("c@example.com").is_none());
    }
}
