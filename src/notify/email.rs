use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};
use tracing::debug;

use super::{Notifier, NotifyError};

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub sender: String,
    pub password: String,
    pub recipient: String,
}

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

fn parse_mailbox(addr: &str) -> Result<Mailbox, NotifyError> {
    addr.parse().map_err(|e: lettre::address::AddressError| NotifyError::Address {
        address: addr.to_string(),
        reason: e.to_string(),
    })
}

impl EmailSender {
    /// Port 465 uses implicit TLS; anything else negotiates STARTTLS.
    pub fn new(cfg: &EmailConfig) -> Result<Self, NotifyError> {
        let creds = Credentials::new(cfg.sender.clone(), cfg.password.clone());
        let builder = if cfg.smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.smtp_host)
        }
        .map_err(|e| NotifyError::Transport(format!("smtp host {}: {e}", cfg.smtp_host)))?;

        let mailer = builder.port(cfg.smtp_port).credentials(creds).build();

        Ok(Self {
            mailer,
            from: parse_mailbox(&cfg.sender)?,
            to: parse_mailbox(&cfg.recipient)?,
        })
    }
}

#[async_trait]
impl Notifier for EmailSender {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| NotifyError::Build(e.to_string()))?;

        self.mailer
            .send(msg)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        debug!(to = %self.to, "email sent");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}
