use lettre::{
    Message, SmtpTransport, Transport,
    address::AddressError,
    message::{Attachment, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;

use crate::config::MailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail is not configured")]
    NotConfigured,
    #[error("invalid address: {0}")]
    Address(#[from] AddressError),
    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("mail task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A file attached to an outgoing mail.
#[derive(Debug, Clone)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct Mailer {
    transport: SmtpTransport,
    from: String,
}

impl Mailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let mut builder = SmtpTransport::starttls_relay(&config.host)?.port(config.port);
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Ok(Self {
            transport: builder.build(),
            from: config.from.clone(),
        })
    }

    pub async fn send(
        &self,
        to: &str,
        subject: &str,
        body: String,
        attachment: Option<MailAttachment>,
    ) -> Result<(), MailError> {
        let builder = Message::builder()
            .from(self.from.parse()?)
            .to(to.parse()?)
            .subject(subject);

        let text = SinglePart::builder()
            .header(ContentType::TEXT_PLAIN)
            .body(body);
        let message = match attachment {
            Some(file) => {
                let content_type = ContentType::parse(file.content_type)
                    .unwrap_or(ContentType::TEXT_PLAIN);
                builder.multipart(
                    MultiPart::mixed()
                        .singlepart(text)
                        .singlepart(Attachment::new(file.filename).body(file.bytes, content_type)),
                )?
            }
            None => builder.singlepart(text)?,
        };

        // SmtpTransport blocks.
        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&message)).await??;
        tracing::info!(to, subject, "mail sent");
        Ok(())
    }
}
