//! Outbound account emails.
//!
//! With `EMAIL_KEY` set, [`SmtpMailer`] sends the rendered HTML message over
//! STARTTLS. Otherwise [`LogMailer`] logs the link so operators can hand it
//! out manually.

use async_trait::async_trait;
use blogmate::config::EmailConfig;
use blogmate::{BlogError, Result};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::{debug, info};

/// SMTP conversation timeout.
pub const SMTP_TIMEOUT: Duration = Duration::from_secs(20);

/// One HTML email carrying an action link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub link: String,
}

impl LinkEmail {
    pub fn verification(to: &str, public_url: &str, token: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Verify your account".into(),
            body: "Follow the link below to activate your account.".into(),
            link: format!("{}/users/accountVerification?token={}", public_url, token),
        }
    }

    pub fn password_reset(to: &str, public_url: &str, token: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Reset your password".into(),
            body: format!(
                "Use this token with POST /users/resetPassword within the hour: {}",
                token
            ),
            link: format!("{}/users/resetPassword?token={}", public_url, token),
        }
    }

    pub fn render_html(&self) -> String {
        format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"UTF-8\"><title>{title}</title></head>\n\
             <body>\n<h1>{title}</h1>\n<p>{body}</p>\n<a href=\"{link}\">Click the Link</a>\n</body>\n</html>\n",
            title = self.subject,
            body = self.body,
            link = self.link,
        )
    }

    /// Builds the MIME message sent over SMTP.
    pub fn to_message(&self, from: &Mailbox) -> Result<Message> {
        let to: Mailbox = self
            .to
            .parse()
            .map_err(|e| BlogError::validation(format!("invalid recipient '{}': {}", self.to, e)))?;
        Message::builder()
            .from(from.clone())
            .to(to)
            .subject(self.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(self.render_html())
            .map_err(|e| BlogError::internal(format!("failed to build email: {}", e)))
    }
}

/// Delivers account emails.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &LinkEmail) -> Result<()>;
}

/// Logs emails instead of sending them.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &LinkEmail) -> Result<()> {
        info!(to = %email.to, subject = %email.subject, link = %email.link, "Account email");
        Ok(())
    }
}

/// Sends emails through an authenticated STARTTLS relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(host: &str, port: u16, from: &str, password: &str) -> Result<Self> {
        let from: Mailbox = from
            .parse()
            .map_err(|e| BlogError::config(format!("EMAIL_FROM '{}' is invalid: {}", from, e)))?;
        let credentials = Credentials::new(from.email.to_string(), password.to_string());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| BlogError::config(format!("SMTP relay '{}' is invalid: {}", host, e)))?
            .port(port)
            .credentials(credentials)
            .timeout(Some(SMTP_TIMEOUT))
            .build();
        Ok(Self { transport, from })
    }

    /// Builds the mailer from configuration; `None` when SMTP is disabled.
    pub fn from_config(config: &EmailConfig) -> Result<Option<Self>> {
        match (&config.key, &config.from) {
            (Some(key), Some(from)) => {
                Self::new(&config.smtp_host, config.smtp_port, from, key).map(Some)
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &LinkEmail) -> Result<()> {
        let message = email.to_message(&self.from)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| BlogError::internal(format!("SMTP delivery failed: {}", e)))?;
        debug!(to = %email.to, subject = %email.subject, "Account email sent");
        Ok(())
    }
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer").field("from", &self.from).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_link() {
        let email = LinkEmail::verification("a@example.com", "https://blog.example.com", "abc123");
        assert_eq!(
            email.link,
            "https://blog.example.com/users/accountVerification?token=abc123"
        );
        let html = email.render_html();
        assert!(html.contains("<a href=\"https://blog.example.com/users/accountVerification?token=abc123\">"));
        assert!(html.contains("<h1>Verify your account</h1>"));
    }

    #[test]
    fn test_message_carries_html_body() {
        let from: Mailbox = "noreply@blog.example.com".parse().unwrap();
        let email = LinkEmail::password_reset("a@example.com", "https://blog.example.com", "tok");
        let raw = String::from_utf8(email.to_message(&from).unwrap().formatted()).unwrap();
        assert!(raw.contains("Subject: Reset your password"));
        assert!(raw.contains("To: a@example.com"));
        assert!(raw.contains("text/html"));
    }

    #[test]
    fn test_bad_recipient_rejected() {
        let from: Mailbox = "noreply@blog.example.com".parse().unwrap();
        let email = LinkEmail::verification("not an address", "http://localhost", "t");
        assert!(matches!(
            email.to_message(&from),
            Err(BlogError::ValidationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_smtp_mailer_from_config() {
        let mut config = EmailConfig {
            key: None,
            from: None,
            smtp_host: "smtp.example.com".into(),
            smtp_port: 587,
            public_url: "http://localhost:8080".into(),
        };
        assert!(SmtpMailer::from_config(&config).unwrap().is_none());

        config.key = Some("app-password".into());
        config.from = Some("noreply@blog.example.com".into());
        assert!(SmtpMailer::from_config(&config).unwrap().is_some());

        config.from = Some("not an address".into());
        assert!(matches!(
            SmtpMailer::from_config(&config),
            Err(BlogError::Config(_))
        ));
    }
}
