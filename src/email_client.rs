use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::{ExposeSecret, Secret};
use std::fmt::Formatter;
use std::time::Duration;

#[derive(thiserror::Error)]
pub enum EmailClientError {
    #[error("Failed to build the email")]
    Build(#[from] lettre::error::Error),
    #[error("The SMTP relay rejected or dropped the message")]
    Transport(#[from] lettre::transport::smtp::Error),
    #[error("The SMTP relay did not answer within {0:?}")]
    Timeout(Duration),
}

impl std::fmt::Debug for EmailClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        crate::routes::error_chain_fmt(self, f)
    }
}

/// Where and how to reach the SMTP relay.
pub struct SmtpRelay {
    pub host: String,
    pub port: u16,
    /// TLS from the first byte (SMTPS, usually port 465). Plaintext otherwise.
    pub implicit_tls: bool,
    pub username: String,
    pub password: Secret<String>,
}

pub struct EmailClient {
    relay: SmtpRelay,
    sender: Mailbox,
    recipient: Mailbox,
    timeout: Duration,
}

impl EmailClient {
    pub fn new(relay: SmtpRelay, sender: Mailbox, recipient: Mailbox, timeout: Duration) -> Self {
        Self {
            relay,
            sender,
            recipient,
            timeout,
        }
    }

    /// Send one message to the configured recipient over a fresh connection.
    ///
    /// The connection is closed once the relay has accepted (or refused) the
    /// message; nothing is pooled between calls.
    #[tracing::instrument(
        name = "Relaying email",
        skip(self, reply_to, subject, html_content, text_content),
        fields(relay.host = %self.relay.host, relay.port = self.relay.port)
    )]
    pub async fn send_email(
        &self,
        reply_to: Option<Mailbox>,
        subject: &str,
        html_content: &str,
        text_content: &str,
    ) -> Result<(), EmailClientError> {
        let email = self.build_message(reply_to, subject, html_content, text_content)?;
        let transport = self.transport()?;

        tokio::time::timeout(self.timeout, transport.send(email))
            .await
            .map_err(|_| EmailClientError::Timeout(self.timeout))??;
        Ok(())
    }

    fn build_message(
        &self,
        reply_to: Option<Mailbox>,
        subject: &str,
        html_content: &str,
        text_content: &str,
    ) -> Result<Message, EmailClientError> {
        let mut builder = Message::builder()
            .from(self.sender.clone())
            .to(self.recipient.clone())
            .subject(subject);
        if let Some(reply_to) = reply_to {
            builder = builder.reply_to(reply_to);
        }
        let email = builder.multipart(MultiPart::alternative_plain_html(
            text_content.to_string(),
            html_content.to_string(),
        ))?;
        Ok(email)
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailClientError> {
        let builder = if self.relay.implicit_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.relay.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.relay.host)
        };
        let credentials = Credentials::new(
            self.relay.username.clone(),
            self.relay.password.expose_secret().clone(),
        );
        Ok(builder
            .port(self.relay.port)
            .credentials(credentials)
            .authentication(vec![Mechanism::Plain])
            .timeout(Some(self.timeout))
            .build())
    }
}
