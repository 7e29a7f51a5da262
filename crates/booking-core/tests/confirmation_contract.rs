//! Lifecycle Contract Test: Booking Confirmation
//!
//! Constraints verified:
//! - Unknown ids fail with NotFound and mutate nothing
//! - Consent and contact-field validation gate the transition
//! - The finalized price comes from stored fields, never from the client
//! - Re-confirmation is store-idempotent but re-sends the notification
//!
//! If this test fails, the lifecycle state machine is broken.

mod common;

use booking_core::BookingService;
use booking_core::booking::BookingState;
use booking_core::config::ServiceConfig;
use booking_core::error::Error;
use booking_core::pricing::{AddOn, Price};
use booking_core::traits::BookingStore;
use common::*;
use std::sync::Arc;

struct Setup {
    service: BookingService,
    store: CountingStore,
    notifier: RecordingNotifier,
}

fn setup() -> Setup {
    let store = CountingStore::new();
    let notifier = RecordingNotifier::succeeding();
    let store_probe = CountingStore::sharing_counters_with(&store);
    let notifier_probe = RecordingNotifier::sharing_counters_with(&notifier);

    let (service, _events) = BookingService::new(
        Arc::new(store),
        Arc::new(notifier),
        ServiceConfig::default(),
    );

    Setup {
        service,
        store: store_probe,
        notifier: notifier_probe,
    }
}

#[tokio::test]
async fn unknown_id_fails_with_not_found_and_mutates_nothing() {
    let s = setup();

    let result = s.service.confirm_booking(999, valid_customer()).await;

    assert!(matches!(result, Err(Error::NotFound(_))));
    assert_eq!(s.store.update_call_count(), 0);
    assert_eq!(s.notifier.send_call_count(), 0);
}

#[tokio::test]
async fn missing_consent_fails_validation_even_when_other_fields_are_valid() {
    let s = setup();
    let booking = s.service.create_booking(valid_draft()).await.unwrap();

    let mut customer = valid_customer();
    customer.gdpr_consent = false;

    let result = s.service.confirm_booking(booking.id, customer).await;
    assert!(matches!(result, Err(Error::Validation(_))));

    // Still requested, never notified
    let stored = s.service.get_booking(booking.id).await.unwrap();
    assert_eq!(stored.state, BookingState::Requested);
    assert_eq!(s.store.update_call_count(), 0);
    assert_eq!(s.notifier.send_call_count(), 0);
}

#[tokio::test]
async fn invalid_contact_fields_fail_validation() {
    let s = setup();
    let booking = s.service.create_booking(valid_draft()).await.unwrap();

    let mut bad_email = valid_customer();
    bad_email.email = "not-an-address".to_string();
    assert!(matches!(
        s.service.confirm_booking(booking.id, bad_email).await,
        Err(Error::Validation(_))
    ));

    let mut bad_phone = valid_customer();
    bad_phone.phone = "12345".to_string();
    assert!(matches!(
        s.service.confirm_booking(booking.id, bad_phone).await,
        Err(Error::Validation(_))
    ));

    let mut no_name = valid_customer();
    no_name.name = "  ".to_string();
    assert!(matches!(
        s.service.confirm_booking(booking.id, no_name).await,
        Err(Error::Validation(_))
    ));

    assert_eq!(s.notifier.send_call_count(), 0);
}

#[tokio::test]
async fn confirmation_persists_customer_fields_and_notifies() {
    let s = setup();
    let booking = s.service.create_booking(valid_draft()).await.unwrap();

    let outcome = s
        .service
        .confirm_booking(booking.id, valid_customer())
        .await
        .unwrap();

    assert!(outcome.notified());
    assert_eq!(outcome.booking.state, BookingState::Confirmed);

    let stored = s.service.get_booking(booking.id).await.unwrap();
    assert_eq!(stored.state, BookingState::Confirmed);
    assert_eq!(stored.customer_name.as_deref(), Some("Maria Huber"));
    assert_eq!(stored.customer_email.as_deref(), Some("maria@example.com"));
    // Phone is stored whitespace-normalized
    assert_eq!(stored.customer_phone.as_deref(), Some("+436601234567"));
    assert!(stored.gdpr_consent);
    assert!(stored.confirmed_at.is_some());

    assert_eq!(s.notifier.send_call_count(), 1);
    assert_eq!(s.notifier.notified_ids(), vec![booking.id]);
}

#[tokio::test]
async fn finalized_price_is_recomputed_from_stored_fields() {
    let s = setup();

    let mut draft = valid_draft();
    draft.addons.insert(AddOn::WindowCleaning);
    let booking = s.service.create_booking(draft).await.unwrap();

    // Simulate a tampered stored price; confirmation must correct it from
    // the stored category and add-ons.
    let mut tampered = booking.clone();
    tampered.price = Price::from_cents(1);
    s.store.update(&tampered).await.unwrap();

    let outcome = s
        .service
        .confirm_booking(booking.id, valid_customer())
        .await
        .unwrap();

    assert_eq!(outcome.booking.price.cents(), 5 * 4200);
    let stored = s.service.get_booking(booking.id).await.unwrap();
    assert_eq!(stored.price.cents(), 5 * 4200);
}

#[tokio::test]
async fn reconfirmation_is_store_idempotent_but_notifies_again() {
    let s = setup();
    let booking = s.service.create_booking(valid_draft()).await.unwrap();

    let first = s
        .service
        .confirm_booking(booking.id, valid_customer())
        .await
        .unwrap();
    let second = s
        .service
        .confirm_booking(booking.id, valid_customer())
        .await
        .unwrap();

    // Stored fields converge to identical values
    assert_eq!(first.booking.state, second.booking.state);
    assert_eq!(first.booking.customer_name, second.booking.customer_name);
    assert_eq!(first.booking.customer_email, second.booking.customer_email);
    assert_eq!(first.booking.customer_phone, second.booking.customer_phone);
    assert_eq!(first.booking.price, second.booking.price);

    // But delivery is attempted independently each time
    assert_eq!(s.notifier.send_call_count(), 2);
    assert_eq!(s.notifier.notified_ids(), vec![booking.id, booking.id]);
}

#[tokio::test]
async fn standard_five_hour_one_addon_scenario() {
    let s = setup();

    let mut draft = valid_draft();
    draft.addons.insert(AddOn::IntensiveCleaning);
    let booking = s.service.create_booking(draft).await.unwrap();
    assert_eq!(booking.price.cents(), 5 * 4200);

    // consent=false rejects
    let mut refused = valid_customer();
    refused.gdpr_consent = false;
    assert!(matches!(
        s.service.confirm_booking(booking.id, refused).await,
        Err(Error::Validation(_))
    ));

    // consent=true with valid contact details confirms; whatever the
    // notification outcome, the stored booking is confirmed
    let outcome = s
        .service
        .confirm_booking(booking.id, valid_customer())
        .await
        .unwrap();
    assert_eq!(outcome.booking.state, BookingState::Confirmed);

    let stored = s.service.get_booking(booking.id).await.unwrap();
    assert_eq!(stored.state, BookingState::Confirmed);
}
