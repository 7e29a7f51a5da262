//! Minimal embedding example for booking-core
//!
//! This example demonstrates using booking-core as a library in a custom
//! application: wire a store and a notifier, create a booking, confirm it,
//! and observe the lifecycle events. The notifier here just prints; swap in
//! `booking_notify_smtp::SmtpNotifier` for real delivery.

use booking_core::booking::{BookingDraft, BookingFilter, CustomerDetails};
use booking_core::config::ServiceConfig;
use booking_core::pricing::{AddOn, CleaningCategory};
use booking_core::store::MemoryBookingStore;
use booking_core::traits::{ConfirmationNotifier, DeliveryReceipt};
use booking_core::{Booking, BookingService, Result};
use std::sync::Arc;

/// Notifier that prints confirmations instead of delivering them
struct ConsoleNotifier;

#[async_trait::async_trait]
impl ConfirmationNotifier for ConsoleNotifier {
    async fn send_confirmation(&self, booking: &Booking) -> Result<DeliveryReceipt> {
        let recipient = booking
            .customer_email
            .clone()
            .unwrap_or_else(|| "<missing>".to_string());
        println!(
            "-> would notify {} about booking {} ({} on {} at {}, EUR {})",
            recipient, booking.id, booking.category, booking.date, booking.time, booking.price
        );
        Ok(DeliveryReceipt {
            message_id: format!("console-{}", booking.id),
            recipient,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let store = Arc::new(MemoryBookingStore::new());
    let (service, mut events) =
        BookingService::new(store, Arc::new(ConsoleNotifier), ServiceConfig::default());

    // A customer requests a five-hour standard cleaning with one add-on
    let draft = BookingDraft {
        location: Some("Vienna".to_string()),
        date: Some("2026-09-01".to_string()),
        time: Some("09:00".to_string()),
        duration_hours: Some(5),
        category: Some(CleaningCategory::Standard),
        addons: [AddOn::IntensiveCleaning].into_iter().collect(),
        renegotiate: false,
    };

    let booking = service.create_booking(draft).await?;
    println!(
        "created booking {} in state {:?}, quoted EUR {}",
        booking.id, booking.state, booking.price
    );

    // Later, the customer confirms with contact details and consent
    let customer = CustomerDetails {
        name: "Maria Huber".to_string(),
        email: "maria@example.com".to_string(),
        address: "Mariahilfer Str. 1, 1060 Wien".to_string(),
        phone: "+43 660 1234567".to_string(),
        gdpr_consent: true,
    };

    let outcome = service.confirm_booking(booking.id, customer).await?;
    println!(
        "confirmed booking {} (notified: {})",
        outcome.booking.id,
        outcome.notified()
    );

    let all = service.list_bookings(&BookingFilter::new()).await?;
    println!("{} booking(s) stored", all.len());

    while let Ok(event) = events.try_recv() {
        println!("event: {:?}", event);
    }

    Ok(())
}
