//! Mail delivery over SMTP

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
};
use tracing::{info, instrument, warn};

use crate::{
    config::{EmailConfig, SmtpConfig},
    util::{get_smtp_password, get_smtp_user},
};

const SMTPS_PORT: u16 = 465;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("no recipients configured")]
    NoRecipients,

    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Sends plain text mails.
///
/// Implementations are shared between concurrently running evaluations and
/// must support simultaneous sends.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_mail(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), MailError>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(
        smtp: &SmtpConfig,
        from: &str,
        credentials: Option<Credentials>,
    ) -> Result<Self, MailError> {
        let tls_parameters = TlsParameters::builder(smtp.host.clone())
            .dangerous_accept_invalid_certs(smtp.accept_invalid_certs)
            .build()?;

        let tls = if smtp.port == SMTPS_PORT {
            Tls::Wrapper(tls_parameters)
        } else {
            Tls::Required(tls_parameters)
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp.host)
            .port(smtp.port)
            .tls(tls);

        if let Some(credentials) = credentials {
            builder = builder.credentials(credentials);
        }

        Ok(Self {
            transport: builder.build(),
            from: from.parse()?,
        })
    }

    /// Builds the mailer from the email config and the `SMTP_USER` / `SMTP_PASSWORD`
    /// environment variables.
    pub fn from_config(email: &EmailConfig) -> anyhow::Result<Self> {
        let smtp = email
            .smtp
            .as_ref()
            .context("email alerts require an smtp section")?;

        let user = get_smtp_user();
        let from = email
            .from
            .clone()
            .or_else(|| user.clone())
            .context("no sender address: set email.from or SMTP_USER")?;

        let credentials = match (user, get_smtp_password()) {
            (Some(user), Some(password)) => Some(Credentials::new(user, password)),
            _ => None,
        };

        if smtp.accept_invalid_certs {
            warn!(
                "certificate verification for smtp host {} is disabled",
                smtp.host
            );
        }

        Self::new(smtp, &from, credentials).context("failed to set up smtp transport")
    }

    fn build_message(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<Message, MailError> {
        if recipients.is_empty() {
            return Err(MailError::NoRecipients);
        }

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);

        for recipient in recipients {
            builder = builder.to(recipient.parse()?);
        }

        Ok(builder.body(body.to_string())?)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[instrument(skip(self, body))]
    async fn send_mail(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        let message = self.build_message(recipients, subject, body)?;
        self.transport.send(message).await?;
        info!("sent mail to {} recipients", recipients.len());
        Ok(())
    }
}
