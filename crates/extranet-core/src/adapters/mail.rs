//! Mail delivery adapters.
//!
//! - [`LogMailer`]: development mode, records each message in the log.
//! - [`SmtpMailer`]: real delivery through an SMTP relay (`smtp` feature).

use tracing::info;

use crate::domain::errors::ExtranetResult;
use crate::domain::mail::OutgoingMail;
use crate::ports::outbound::Mailer;

/// Logs messages instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, mail: &OutgoingMail) -> ExtranetResult<()> {
        info!(
            to = ?mail.to,
            bcc = mail.bcc.len(),
            subject = %mail.subject,
            body_len = mail.html.len(),
            "mail not sent (log transport)"
        );
        Ok(())
    }
}

/// SMTP relay settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub starttls: bool,
    /// `From` header, e.g. `Extranet <noreply@example.fr>`.
    pub from: String,
}

#[cfg(feature = "smtp")]
pub use smtp::SmtpMailer;

#[cfg(feature = "smtp")]
mod smtp {
    use lettre::message::header::ContentType;
    use lettre::message::Mailbox;
    use lettre::transport::smtp::authentication::Credentials;
    use lettre::{Message, SmtpTransport, Transport};
    use tracing::debug;

    use super::SmtpSettings;
    use crate::domain::errors::{ExtranetError, ExtranetResult};
    use crate::domain::mail::OutgoingMail;
    use crate::ports::outbound::Mailer;

    /// Blocking SMTP delivery. Callers already run service code off the
    /// async executor.
    pub struct SmtpMailer {
        transport: SmtpTransport,
        from: Mailbox,
    }

    impl SmtpMailer {
        pub fn new(settings: &SmtpSettings) -> ExtranetResult<Self> {
            let from: Mailbox = settings
                .from
                .parse()
                .map_err(|e| ExtranetError::mail(format!("invalid sender address: {e}")))?;

            let mut builder = if settings.starttls {
                SmtpTransport::starttls_relay(&settings.host)
                    .map_err(|e| ExtranetError::mail(e.to_string()))?
            } else {
                SmtpTransport::builder_dangerous(&settings.host)
            };
            builder = builder.port(settings.port);

            if let (Some(user), Some(password)) = (&settings.username, &settings.password) {
                builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
            }

            Ok(Self {
                transport: builder.build(),
                from,
            })
        }

        fn build(&self, mail: &OutgoingMail) -> ExtranetResult<Message> {
            let mut message = Message::builder()
                .from(self.from.clone())
                .subject(mail.subject.clone())
                .header(ContentType::TEXT_HTML);

            for to in &mail.to {
                message = message.to(parse_mailbox(to)?);
            }
            for bcc in &mail.bcc {
                message = message.bcc(parse_mailbox(bcc)?);
            }

            message
                .body(mail.html.clone())
                .map_err(|e| ExtranetError::mail(e.to_string()))
        }
    }

    fn parse_mailbox(raw: &str) -> ExtranetResult<Mailbox> {
        raw.parse()
            .map_err(|e| ExtranetError::mail(format!("invalid address {raw}: {e}")))
    }

    impl Mailer for SmtpMailer {
        fn send(&self, mail: &OutgoingMail) -> ExtranetResult<()> {
            let message = self.build(mail)?;
            self.transport
                .send(&message)
                .map_err(|e| ExtranetError::mail(e.to_string()))?;
            debug!(subject = %mail.subject, recipients = mail.to.len() + mail.bcc.len(), "mail sent");
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn settings() -> SmtpSettings {
            SmtpSettings {
                host: "localhost".into(),
                port: 2525,
                username: None,
                password: None,
                starttls: false,
                from: "Extranet <noreply@example.fr>".into(),
            }
        }

        #[test]
        fn test_rejects_bad_sender() {
            let mut bad = settings();
            bad.from = "not an address".into();
            assert!(matches!(SmtpMailer::new(&bad), Err(ExtranetError::Mail(_))));
        }

        #[test]
        fn test_builds_message_with_bcc() {
            let mailer = SmtpMailer::new(&settings()).unwrap();
            let mail = OutgoingMail {
                to: vec!["noreply@example.fr".into()],
                bcc: vec!["a@example.fr".into(), "b@example.fr".into()],
                subject: "Fichiers qui ont expiré".into(),
                html: "<p>x</p>".into(),
            };
            let message = mailer.build(&mail).unwrap();
            assert_eq!(message.envelope().to().len(), 3);
        }

        #[test]
        fn test_invalid_recipient_is_mail_error() {
            let mailer = SmtpMailer::new(&settings()).unwrap();
            let mail = OutgoingMail {
                to: vec!["nope".into()],
                bcc: vec![],
                subject: "s".into(),
                html: String::new(),
            };
            assert!(matches!(mailer.build(&mail), Err(ExtranetError::Mail(_))));
        }
    }
}
