//! Production SMTP connector backed by `lettre`
//!
//! Builds `AsyncSmtpTransport` sessions for the resolver's endpoints and
//! maps the library's failures onto the crate error taxonomy:
//! verification failures become transport-resolution errors, rejected
//! sends become delivery errors carrying the SMTP status code.

use crate::render::RenderedMail;
use crate::resolver::{Endpoint, MailTransport, SmtpConnector};
use async_trait::async_trait;
use booking_core::config::{MailerConfig, SecurityMode};
use booking_core::error::{Error, Result};
use booking_core::traits::DeliveryReceipt;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

/// SMTP connector speaking the real protocol via `lettre`
#[derive(Debug, Default)]
pub struct LettreConnector;

impl LettreConnector {
    /// Create a new connector
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SmtpConnector for LettreConnector {
    async fn establish(
        &self,
        endpoint: &Endpoint,
        security: SecurityMode,
        config: &MailerConfig,
    ) -> Result<Arc<dyn MailTransport>> {
        let transport = build_transport(endpoint, security, config)?;

        // Connection establishment and protocol greeting run under their own
        // bound, independent of the per-operation timeout baked into the
        // transport.
        let verify_timeout =
            Duration::from_secs(config.connect_timeout_secs + config.greeting_timeout_secs);

        match tokio::time::timeout(verify_timeout, transport.test_connection()).await {
            Err(_) => Err(Error::transport_resolution(format!(
                "verification against {} timed out after {}s",
                endpoint,
                verify_timeout.as_secs()
            ))),
            Ok(Err(e)) => Err(Error::transport_resolution(format!(
                "verification against {} failed: {}",
                endpoint, e
            ))),
            Ok(Ok(false)) => Err(Error::transport_resolution(format!(
                "{} rejected the connection test",
                endpoint
            ))),
            Ok(Ok(true)) => Ok(Arc::new(LettreTransport { transport })),
        }
    }

    async fn resolve_ipv4(&self, host: &str, port: u16) -> Result<Ipv4Addr> {
        let addrs = tokio::net::lookup_host((host, port)).await.map_err(|e| {
            Error::transport_resolution(format!("DNS lookup for {} failed: {}", host, e))
        })?;

        addrs
            .filter_map(|addr| match addr.ip() {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
            .next()
            .ok_or_else(|| {
                Error::transport_resolution(format!("no IPv4 address found for {}", host))
            })
    }
}

/// Build an unverified transport for one endpoint.
///
/// For IPv4 literals the TLS parameters keep verifying the configured
/// hostname, so certificate validation behaves exactly as it does for the
/// hostname tier.
fn build_transport(
    endpoint: &Endpoint,
    security: SecurityMode,
    config: &MailerConfig,
) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
    let credentials = Credentials::new(config.username.clone(), config.password.clone());
    let io_timeout = Duration::from_secs(config.io_timeout_secs);

    let builder = match endpoint {
        Endpoint::Hostname(host) => match security {
            SecurityMode::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| {
                    Error::transport_resolution(format!("relay setup for {} failed: {}", host, e))
                })?,
            SecurityMode::Opportunistic => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).map_err(|e| {
                    Error::transport_resolution(format!("relay setup for {} failed: {}", host, e))
                })?
            }
        },
        Endpoint::Ipv4(addr) => {
            let tls_parameters = TlsParameters::new(config.host.clone()).map_err(|e| {
                Error::transport_resolution(format!(
                    "TLS parameters for {} failed: {}",
                    config.host, e
                ))
            })?;
            let tls = match security {
                SecurityMode::Implicit => Tls::Wrapper(tls_parameters),
                SecurityMode::Opportunistic => Tls::Required(tls_parameters),
            };
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(addr.to_string()).tls(tls)
        }
    };

    Ok(builder
        .port(config.port)
        .credentials(credentials)
        .timeout(Some(io_timeout))
        .build())
}

/// Verified transport handle wrapping a `lettre` session
struct LettreTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

#[async_trait]
impl MailTransport for LettreTransport {
    async fn send(&self, mail: &RenderedMail) -> Result<DeliveryReceipt> {
        let message = build_message(mail)?;

        match self.transport.send(message).await {
            Ok(response) => Ok(DeliveryReceipt {
                message_id: response
                    .first_line()
                    .unwrap_or("accepted")
                    .trim()
                    .to_string(),
                recipient: mail.to.clone(),
            }),
            Err(e) => {
                let code = e
                    .status()
                    .and_then(|status| status.to_string().parse::<u16>().ok());
                Err(Error::delivery(code, e.to_string()))
            }
        }
    }
}

/// Assemble the wire message from a rendered confirmation
fn build_message(mail: &RenderedMail) -> Result<Message> {
    let from: Mailbox = mail
        .from
        .parse()
        .map_err(|e| Error::config(format!("invalid sender mailbox {}: {}", mail.from, e)))?;
    let to: Mailbox = mail.to.parse().map_err(|e| {
        Error::invalid_notification_input(format!("invalid recipient {}: {}", mail.to, e))
    })?;

    let mut builder = Message::builder()
        .from(from)
        .to(to)
        .subject(mail.subject.clone());

    if let Some(ref copy) = mail.bcc {
        let bcc: Mailbox = copy
            .parse()
            .map_err(|e| Error::config(format!("invalid copy address {}: {}", copy, e)))?;
        builder = builder.bcc(bcc);
    }

    builder
        .multipart(MultiPart::alternative_plain_html(
            mail.text_body.clone(),
            mail.html_body.clone(),
        ))
        .map_err(|e| Error::Other(format!("failed to build message: {}", e)))
}
