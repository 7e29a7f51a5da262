//! Booking lifecycle service
//!
//! The BookingService is responsible for:
//! - Validating booking drafts and customer confirmation input
//! - Computing prices via the pricing policy
//! - Persisting lifecycle transitions through the BookingStore
//! - Dispatching confirmation notifications and classifying their outcome
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ HTTP layer   │── create / confirm / list ──┐
//! │ (external)   │                             ▼
//! └──────────────┘                    ┌────────────────┐
//!                                     │ BookingService │
//!                                     └────────────────┘
//!                                              │
//!              ┌───────────────────────────────┼──────────────────────────┐
//!              │                               │                          │
//!              ▼                               ▼                          ▼
//!      ┌──────────────┐             ┌──────────────────────┐      ┌─────────────┐
//!      │ BookingStore │             │ ConfirmationNotifier │      │   Events    │
//!      │ (persist)    │             │ (deliver)            │      │  (observe)  │
//!      └──────────────┘             └──────────────────────┘      └─────────────┘
//! ```
//!
//! ## Confirmation Flow
//!
//! 1. Validate customer fields (name, email, address, phone, consent)
//! 2. Load the stored booking (unknown id fails here, nothing mutated)
//! 3. Recompute the price from the *stored* category and add-ons
//! 4. Persist customer fields + state `Confirmed`
//! 5. Dispatch the notification synchronously
//!
//! The store write happens-before the dispatch, and a dispatch failure never
//! rolls the booking back: confirmation and notification are decoupled
//! failure domains. The outcome carries both the confirmed booking and the
//! notification result.

use crate::booking::{Booking, BookingDraft, BookingFilter, CustomerDetails};
use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::pricing::{self, Price};
use crate::traits::{BookingStore, ConfirmationNotifier, DeliveryReceipt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Events emitted by the BookingService
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingEvent {
    /// A booking was created in state `Requested`
    BookingCreated {
        booking_id: u64,
        price: Price,
    },

    /// A booking reached state `Confirmed`
    BookingConfirmed {
        booking_id: u64,
        /// True when the booking was already confirmed and was re-confirmed
        repeat: bool,
    },

    /// The confirmation notification was accepted by the relay
    NotificationSent {
        booking_id: u64,
        message_id: String,
    },

    /// The confirmation notification could not be delivered
    NotificationFailed {
        booking_id: u64,
        error: String,
    },
}

/// Result of a confirmation call.
///
/// The booking transition and the notification attempt resolve
/// independently: `booking` is always the confirmed record, while
/// `notification` reports how the delivery attempt ended. Boundary layers
/// map a failed notification to a "confirmed, with warning" response, not to
/// a client error.
#[derive(Debug)]
pub struct ConfirmOutcome {
    /// The booking as persisted, state `Confirmed`
    pub booking: Booking,

    /// Delivery receipt, or the notification failure (wrapped in
    /// [`Error::Notification`])
    pub notification: Result<DeliveryReceipt>,
}

impl ConfirmOutcome {
    /// Whether the notification attempt succeeded
    pub fn notified(&self) -> bool {
        self.notification.is_ok()
    }
}

/// Booking lifecycle service
///
/// Cheap to clone; clones share the store, the notifier and the event
/// channel. One logical request handler holds the only mutable reference to
/// a booking for the duration of its call.
#[derive(Clone)]
pub struct BookingService {
    /// Booking persistence
    store: Arc<dyn BookingStore>,

    /// Notification delivery
    notifier: Arc<dyn ConfirmationNotifier>,

    /// Event sender for external observation
    event_tx: mpsc::Sender<BookingEvent>,
}

impl BookingService {
    /// Create a new booking service
    ///
    /// # Returns
    ///
    /// A tuple of (service, event_receiver) where event_receiver yields
    /// lifecycle events for logging or monitoring.
    pub fn new(
        store: Arc<dyn BookingStore>,
        notifier: Arc<dyn ConfirmationNotifier>,
        config: ServiceConfig,
    ) -> (Self, mpsc::Receiver<BookingEvent>) {
        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let service = Self {
            store,
            notifier,
            event_tx: tx,
        };

        (service, rx)
    }

    /// Create a booking from a client draft.
    ///
    /// Validates required fields, computes the initial price and persists a
    /// record in state `Requested`. On rejection nothing is persisted.
    pub async fn create_booking(&self, draft: BookingDraft) -> Result<Booking> {
        let request = draft.validate()?;

        let booking = self.store.create(request).await?;
        info!(
            booking_id = booking.id,
            category = %booking.category,
            duration_hours = booking.duration_hours,
            price = %booking.price,
            "booking created"
        );

        self.emit_event(BookingEvent::BookingCreated {
            booking_id: booking.id,
            price: booking.price,
        });

        Ok(booking)
    }

    /// Confirm a booking with customer details and dispatch the notification.
    ///
    /// The price is recomputed from the stored category and add-ons; a
    /// client-submitted price is never trusted. A notification failure does
    /// not roll the confirmation back: the booking stays `Confirmed` and
    /// the failure is reported in the outcome, distinct from validation and
    /// not-found errors.
    ///
    /// Confirming an already-confirmed booking is allowed: the stored fields
    /// converge to the same values and the notification is sent again.
    pub async fn confirm_booking(
        &self,
        id: u64,
        details: CustomerDetails,
    ) -> Result<ConfirmOutcome> {
        let customer = details.validated()?;

        let mut booking = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("no booking with id {}", id)))?;

        let repeat = booking.is_confirmed();

        // Finalized price comes from stored fields only.
        let price = pricing::quote(&booking.category, &booking.addons, booking.duration_hours);
        booking.confirm(customer, price);

        self.store.update(&booking).await?;
        info!(booking_id = booking.id, price = %booking.price, repeat, "booking confirmed");

        self.emit_event(BookingEvent::BookingConfirmed {
            booking_id: booking.id,
            repeat,
        });

        let notification = match self.notifier.send_confirmation(&booking).await {
            Ok(receipt) => {
                debug!(
                    booking_id = booking.id,
                    message_id = %receipt.message_id,
                    "confirmation notification delivered"
                );
                self.emit_event(BookingEvent::NotificationSent {
                    booking_id: booking.id,
                    message_id: receipt.message_id.clone(),
                });
                Ok(receipt)
            }
            Err(e) => {
                // The booking stays confirmed; only the delivery failed.
                warn!(booking_id = booking.id, error = %e, "confirmation notification failed");
                self.emit_event(BookingEvent::NotificationFailed {
                    booking_id: booking.id,
                    error: e.to_string(),
                });
                Err(Error::notification(e))
            }
        };

        Ok(ConfirmOutcome {
            booking,
            notification,
        })
    }

    /// Fetch a single booking
    pub async fn get_booking(&self, id: u64) -> Result<Booking> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("no booking with id {}", id)))
    }

    /// List bookings matching a filter, newest first
    pub async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>> {
        self.store.list(filter).await
    }

    /// Emit a lifecycle event
    fn emit_event(&self, event: BookingEvent) {
        // Send event, logging a warning if the channel is full (backpressure).
        // Dropping is preferable to blocking a request handler on observers.
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity or draining the receiver.");
        }
    }
}
