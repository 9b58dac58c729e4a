use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{Message, SmtpTransport, Transport};
use log::info;

use crate::config::{Config, Credentials, Endpoint};
use crate::error::{MailError, Result};

/// Composes a plain-text message and submits it over implicit-TLS SMTP,
/// authenticating with the mailbox credentials.
pub struct Sender {
    endpoint: Endpoint,
    credentials: Credentials,
}

impl Sender {
    pub fn new(endpoint: Endpoint, credentials: Credentials) -> Self {
        Self {
            endpoint,
            credentials,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.submission.clone(), cfg.credentials.clone())
    }

    pub fn build_message(&self, to: &str, subject: &str, body: &str) -> Result<Message> {
        let from: Mailbox = self
            .credentials
            .user
            .parse()
            .map_err(|e| MailError::InvalidAddress(format!("from '{}': {e}", self.credentials.user)))?;
        let to: Mailbox = to
            .parse()
            .map_err(|e| MailError::InvalidAddress(format!("to '{to}': {e}")))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .multipart(MultiPart::mixed().singlepart(SinglePart::plain(body.to_string())))
            .map_err(|e| MailError::Submission(format!("failed to build message: {e}")))
    }

    /// Implicit-TLS transport for the submission endpoint. Built per send and
    /// unpooled, so the connection closes once the message is submitted.
    fn transport(&self) -> Result<SmtpTransport> {
        let transport = SmtpTransport::relay(&self.endpoint.host)
            .map_err(|e| MailError::Submission(format!("{}: {e}", self.endpoint)))?
            .port(self.endpoint.port)
            .credentials(SmtpCredentials::new(
                self.credentials.user.clone(),
                self.credentials.password.clone(),
            ))
            .build();
        Ok(transport)
    }

    /// Submits one message. No delivery confirmation and no retry.
    pub fn send(&self, to: &str, subject: &str, body: &str) -> Result<String> {
        let message = self.build_message(to, subject, body)?;

        self.transport()?
            .send(&message)
            .map_err(|e| MailError::Submission(e.to_string()))?;

        info!("message submitted to {} via {}", to, self.endpoint);
        Ok(format!("Email sent to {to}"))
    }
}
