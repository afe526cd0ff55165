use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::AsyncSmtpTransportBuilder;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};
use workline_engine::{MailError, Mailer, OutgoingEmail};
use workline_util::{SmtpSettings, SmtpTls};

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// [`Mailer`] that relays HTML messages through an SMTP server.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    default_from: Mailbox,
}

impl SmtpMailer {
    /// Builds a pooled relay transport secured per [`SmtpSettings::tls_mode`].
    /// Messages without a sender use `mail_from`, falling back to
    /// `workline@<host>`.
    pub fn new(smtp: &SmtpSettings, mail_from: Option<&str>) -> Result<Self, MailError> {
        let default_from = match mail_from {
            Some(address) => parse_mailbox(address)?,
            None => parse_mailbox(&format!("workline@{}", smtp.host))?,
        };

        let mut builder = transport_builder(&smtp.host, smtp.tls_mode())?.timeout(Some(SMTP_TIMEOUT));
        if let Some(port) = smtp.port {
            builder = builder.port(port);
        }
        if let (Some(username), Some(password)) = (&smtp.username, &smtp.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        debug!(host = %smtp.host, port = ?smtp.port, tls = ?smtp.tls_mode(), from = %default_from, "smtp mailer configured");
        Ok(Self {
            transport: builder.build(),
            default_from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let from = match &email.from {
            Some(address) => parse_mailbox(address)?,
            None => self.default_from.clone(),
        };
        let message = build_message(from, email)?;

        let response = self.transport.send(message).await.map_err(|error| {
            if error.is_permanent() {
                MailError::Rejected(error.to_string())
            } else {
                MailError::Transport(error.to_string())
            }
        })?;
        info!(to = %email.to, code = %response.code(), "email delivered to relay");
        Ok(())
    }
}

/// `relay` speaks TLS from the first byte, `starttls_relay` upgrades a
/// plaintext session. Both keep their mode when the port is overridden.
fn transport_builder(host: &str, tls: SmtpTls) -> Result<AsyncSmtpTransportBuilder, MailError> {
    let builder = match tls {
        SmtpTls::Wrapper => AsyncSmtpTransport::<Tokio1Executor>::relay(host),
        SmtpTls::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host),
        SmtpTls::None => return Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)),
    };
    builder.map_err(|error| MailError::Transport(error.to_string()))
}

fn build_message(from: Mailbox, email: &OutgoingEmail) -> Result<Message, MailError> {
    Message::builder()
        .from(from)
        .to(parse_mailbox(&email.to)?)
        .subject(email.subject.as_str())
        .header(ContentType::TEXT_HTML)
        .body(email.html.clone())
        .map_err(|error| MailError::Build(error.to_string()))
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.trim().parse().map_err(|error: lettre::address::AddressError| MailError::InvalidAddress {
        address: address.to_string(),
        reason: error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(to: &str) -> OutgoingEmail {
        OutgoingEmail {
            to: to.into(),
            subject: "Welcome".into(),
            html: "<p> Hello,</p>".into(),
            from: None,
        }
    }

    #[test]
    fn invalid_recipients_are_rejected_before_sending() {
        let from = parse_mailbox("robot@example.com").unwrap();
        let error = build_message(from, &email("not-an-address")).unwrap_err();
        assert!(matches!(error, MailError::InvalidAddress { address, .. } if address == "not-an-address"));
    }

    #[test]
    fn messages_are_html() {
        let from = parse_mailbox("robot@example.com").unwrap();
        let message = build_message(from, &email("ada@example.com")).unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("Content-Type: text/html"));
        assert!(formatted.contains("Subject: Welcome"));
    }

    #[tokio::test]
    async fn default_sender_falls_back_to_relay_host() {
        let smtp = SmtpSettings {
            host: "mail.example.com".into(),
            ..SmtpSettings::default()
        };
        let mailer = SmtpMailer::new(&smtp, None).unwrap();
        assert_eq!(mailer.default_from.email.to_string(), "workline@mail.example.com");

        assert!(SmtpMailer::new(&smtp, Some("bad address")).is_err());
    }

    #[tokio::test]
    async fn every_tls_mode_builds_a_transport() {
        for (port, tls) in [
            (Some(465), None),
            (Some(587), None),
            (Some(25), Some(SmtpTls::Starttls)),
            (Some(2525), Some(SmtpTls::None)),
        ] {
            let smtp = SmtpSettings {
                host: "mail.example.com".into(),
                port,
                tls,
                ..SmtpSettings::default()
            };
            assert!(transport_builder(&smtp.host, smtp.tls_mode()).is_ok(), "{port:?} {tls:?}");
            assert!(SmtpMailer::new(&smtp, None).is_ok());
        }
    }

    #[test]
    fn submission_ports_use_starttls() {
        let smtp = SmtpSettings {
            host: "mail.example.com".into(),
            port: Some(587),
            ..SmtpSettings::default()
        };
        assert_eq!(smtp.tls_mode(), SmtpTls::Starttls);
    }
}
