// # Confirmation Notifier Trait
//
// Defines the interface for delivering booking confirmation notifications.
//
// ## Implementations
//
// - SMTP: `booking-notify-smtp` crate
// - Test doubles: counting/failing notifiers in the contract tests
//
// ## Usage
//
// ```rust,ignore
// use booking_core::traits::ConfirmationNotifier;
//
// let notifier = /* ConfirmationNotifier implementation */;
// let receipt = notifier.send_confirmation(&booking).await?;
// tracing::info!("delivered as {}", receipt.message_id);
// ```

use async_trait::async_trait;

use crate::booking::Booking;

/// Proof of a delivered notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Provider-assigned message identifier (first relay response line)
    pub message_id: String,

    /// The recipient the notification went to
    pub recipient: String,
}

/// Trait for notification delivery implementations
///
/// The capability is narrow on purpose: render a confirmation for one
/// booking and attempt delivery exactly once. The lifecycle service owns
/// everything around it: when to notify, what a failure means for the
/// booking, and whether anything is retried (nothing is, in this design).
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks; the
/// lifecycle service invokes them concurrently for unrelated bookings.
///
/// # Single-shot
///
/// Implementations must perform at most one delivery attempt per call and
/// must not retry internally. A failed attempt returns the typed error; the
/// caller decides what happens next.
///
/// # Errors
///
/// - `InvalidNotificationInput`: booking data insufficient to notify,
///   detected before any network I/O
/// - `TransportResolution`: no usable relay session under any fallback tier
/// - `Delivery`: relay reachable but the message was rejected
#[async_trait]
pub trait ConfirmationNotifier: Send + Sync {
    /// Render and deliver the confirmation for a booking
    ///
    /// # Returns
    ///
    /// - `Ok(DeliveryReceipt)`: Accepted by the relay
    /// - `Err(Error)`: One of the typed failures above
    async fn send_confirmation(&self, booking: &Booking) -> Result<DeliveryReceipt, crate::Error>;
}
