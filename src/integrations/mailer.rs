//! Outbound transactional email.
//!
//! Delivery is best-effort: callers hand a message to [`dispatch`], which sends
//! it on a background task and only logs the outcome.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use thiserror::Error;

use crate::config::SmtpConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError>;
}

/// SMTP delivery over STARTTLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, timeout: Duration) -> Result<Self, EmailError> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .timeout(Some(timeout))
            .build();
        let from = config
            .from
            .parse()
            .map_err(|_| EmailError::InvalidAddress(config.from.clone()))?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|_| EmailError::InvalidAddress(email.to.clone()))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(email.text)?;

        self.transport.send(message).await?;
        tracing::info!(to = %email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}

/// Used when SMTP is not configured: the message is written to the log instead.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            body = %email.text,
            "email delivery disabled; message logged"
        );
        Ok(())
    }
}

/// Fire-and-forget delivery. The caller's outcome never depends on this.
pub fn dispatch(mailer: Arc<dyn Mailer>, email: OutgoingEmail, timeout: Duration) {
    tokio::spawn(async move {
        let to = email.to.clone();
        match tokio::time::timeout(timeout, mailer.send(email)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(to = %to, error = %err, "email delivery failed"),
            Err(_) => tracing::warn!(to = %to, "email delivery timed out"),
        }
    });
}

pub fn verification_email(to: &str, client_url: &str, token: &str, welcome: bool) -> OutgoingEmail {
    let link = format!("{client_url}/verify-email?token={token}");
    let greeting = if welcome { "Welcome to Exporium!\n\n" } else { "" };
    OutgoingEmail {
        to: to.to_string(),
        subject: "Verify your Exporium account".to_string(),
        text: format!(
            "{greeting}Please verify your email by opening this link:\n{link}\n\n\
             This link expires in 24 hours."
        ),
    }
}

pub fn password_reset_email(to: &str, client_url: &str, token: &str) -> OutgoingEmail {
    let link = format!("{client_url}/reset-password?token={token}");
    OutgoingEmail {
        to: to.to_string(),
        subject: "Reset your Exporium password".to_string(),
        text: format!(
            "You requested a password reset.\n\n\
             Open this link to set a new password:\n{link}\n\n\
             This link expires in 1 hour. If you didn't request this, you can ignore this email."
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recording(Mutex<Vec<OutgoingEmail>>);

    #[async_trait]
    impl Mailer for Recording {
        async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
            self.0.lock().unwrap().push(email);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Mailer for Failing {
        async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
            Err(EmailError::InvalidAddress(email.to))
        }
    }

    #[test]
    fn verification_link_points_at_client() {
        let email = verification_email("a@example.com", "http://shop.test", "abc123", true);
        assert!(email.text.starts_with("Welcome to Exporium!"));
        assert!(email.text.contains("http://shop.test/verify-email?token=abc123"));
        let resend = verification_email("a@example.com", "http://shop.test", "abc123", false);
        assert!(!resend.text.contains("Welcome"));
    }

    #[test]
    fn reset_link_points_at_client() {
        let email = password_reset_email("a@example.com", "http://shop.test", "tok");
        assert!(email.text.contains("http://shop.test/reset-password?token=tok"));
        assert_eq!(email.subject, "Reset your Exporium password");
    }

    #[tokio::test]
    async fn dispatch_delivers_in_background() {
        let mailer = Arc::new(Recording::default());
        let email = password_reset_email("a@example.com", "http://shop.test", "tok");
        dispatch(mailer.clone(), email.clone(), Duration::from_secs(1));
        for _ in 0..50 {
            if !mailer.0.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(mailer.0.lock().unwrap().as_slice(), &[email]);
    }

    #[tokio::test]
    async fn dispatch_swallows_failures() {
        dispatch(
            Arc::new(Failing),
            password_reset_email("a@example.com", "http://shop.test", "tok"),
            Duration::from_secs(1),
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
