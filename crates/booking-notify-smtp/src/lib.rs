// # SMTP Confirmation Notifier
//
// This crate provides the SMTP-backed notification dispatcher for the
// booking system.
//
// ## Capabilities
//
// - ✅ Renders the confirmation (plain-text + HTML alternative) before any I/O
// - ✅ Resolves the mail transport once per process, with IPv4-literal
//   fallback when hostname verification fails
// - ✅ Bounded timeouts on connection, greeting, and every protocol operation
// - ✅ Bcc copy of every confirmation to the operational address
// - ✅ Typed failures: invalid input, transport resolution, delivery
// - ❌ NO retry logic (a failed send is the caller's decision)
// - ❌ NO automatic re-resolution after a cached failure (explicit
//   `invalidate()` is the extension point)
// - ❌ NO background tasks
//
// ## Security
//
// - The relay password NEVER appears in logs
// - TLS verification always targets the configured hostname, including when
//   the session is established against an IPv4 literal

mod lettre_transport;
pub mod render;
pub mod resolver;

pub use lettre_transport::LettreConnector;
pub use render::{RenderedMail, render_confirmation};
pub use resolver::{Endpoint, MailTransport, SmtpConnector, TransportResolver};

use async_trait::async_trait;
use booking_core::booking::Booking;
use booking_core::config::MailerConfig;
use booking_core::error::Result;
use booking_core::traits::{ConfirmationNotifier, DeliveryReceipt};
use std::sync::Arc;
use tracing::info;

/// SMTP confirmation notifier
///
/// Implements [`ConfirmationNotifier`] on top of a process-wide
/// [`TransportResolver`]. The first confirmation to need the transport
/// performs resolution; all later sends share the verified handle.
pub struct SmtpNotifier {
    config: MailerConfig,
    resolver: TransportResolver,
}

// Custom Debug implementation; the config redacts the relay password
impl std::fmt::Debug for SmtpNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpNotifier")
            .field("config", &self.config)
            .finish()
    }
}

impl SmtpNotifier {
    /// Create a notifier speaking real SMTP via `lettre`.
    ///
    /// Fails with a configuration error when host, credentials or sender are
    /// missing, detectable before any resolution attempt starts.
    pub fn new(config: MailerConfig) -> Result<Self> {
        Self::with_connector(config, Arc::new(LettreConnector::new()))
    }

    /// Create a notifier over a custom connector.
    ///
    /// This is the seam tests use to substitute a fake transport without
    /// network access.
    pub fn with_connector(config: MailerConfig, connector: Arc<dyn SmtpConnector>) -> Result<Self> {
        config.validate()?;
        let resolver = TransportResolver::new(config.clone(), connector);
        Ok(Self { config, resolver })
    }

    /// The transport resolver, exposing the endpoint in use and the
    /// `invalidate()` extension point
    pub fn resolver(&self) -> &TransportResolver {
        &self.resolver
    }
}

#[async_trait]
impl ConfirmationNotifier for SmtpNotifier {
    async fn send_confirmation(&self, booking: &Booking) -> Result<DeliveryReceipt> {
        // Precondition checks and rendering happen before any network I/O.
        let mail = render::render_confirmation(booking, &self.config)?;

        let transport = self.resolver.resolve().await?;
        let receipt = transport.send(&mail).await?;

        info!(
            booking_id = booking.id,
            recipient = %receipt.recipient,
            message_id = %receipt.message_id,
            endpoint = %transport.endpoint,
            "confirmation notification delivered"
        );

        Ok(receipt)
    }
}
