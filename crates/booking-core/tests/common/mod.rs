//! Test doubles and common utilities for lifecycle contract tests
//!
//! This module provides minimal test doubles that verify lifecycle
//! constraints without rendering or network I/O.

use booking_core::booking::{Booking, BookingDraft, BookingFilter, CustomerDetails, NewBooking};
use booking_core::error::{Error, Result};
use booking_core::pricing::CleaningCategory;
use booking_core::store::MemoryBookingStore;
use booking_core::traits::{BookingStore, ConfirmationNotifier, DeliveryReceipt};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A notifier that records every delivery attempt and can be scripted to fail
pub struct RecordingNotifier {
    /// Call counter for send_confirmation()
    send_call_count: Arc<AtomicUsize>,
    /// Booking ids the notifier was asked to deliver for
    notified_ids: Arc<std::sync::Mutex<Vec<u64>>>,
    /// When true, every attempt fails with a delivery error
    fail: bool,
}

impl RecordingNotifier {
    /// A notifier whose attempts all succeed
    pub fn succeeding() -> Self {
        Self {
            send_call_count: Arc::new(AtomicUsize::new(0)),
            notified_ids: Arc::new(std::sync::Mutex::new(Vec::new())),
            fail: false,
        }
    }

    /// A notifier whose attempts all fail with a delivery error
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::succeeding()
        }
    }

    /// Get the number of delivery attempts
    pub fn send_call_count(&self) -> usize {
        self.send_call_count.load(Ordering::SeqCst)
    }

    /// Get the booking ids delivery was attempted for
    pub fn notified_ids(&self) -> Vec<u64> {
        self.notified_ids.lock().unwrap().clone()
    }

    /// Create a new RecordingNotifier that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            send_call_count: Arc::clone(&other.send_call_count),
            notified_ids: Arc::clone(&other.notified_ids),
            fail: other.fail,
        }
    }
}

#[async_trait::async_trait]
impl ConfirmationNotifier for RecordingNotifier {
    async fn send_confirmation(&self, booking: &Booking) -> Result<DeliveryReceipt> {
        self.send_call_count.fetch_add(1, Ordering::SeqCst);
        self.notified_ids.lock().unwrap().push(booking.id);

        if self.fail {
            return Err(Error::delivery(Some(550), "mailbox unavailable"));
        }

        Ok(DeliveryReceipt {
            message_id: format!("queued-{}", booking.id),
            recipient: booking
                .customer_email
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

/// A store wrapper that counts mutations, for "nothing persisted" assertions
pub struct CountingStore {
    inner: MemoryBookingStore,
    /// Call counter for create()
    create_call_count: Arc<AtomicUsize>,
    /// Call counter for update()
    update_call_count: Arc<AtomicUsize>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryBookingStore::new(),
            create_call_count: Arc::new(AtomicUsize::new(0)),
            update_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of times create() was called
    pub fn create_call_count(&self) -> usize {
        self.create_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times update() was called
    pub fn update_call_count(&self) -> usize {
        self.update_call_count.load(Ordering::SeqCst)
    }

    /// Create a new CountingStore that shares counters and data with an
    /// existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            inner: other.inner.clone(),
            create_call_count: Arc::clone(&other.create_call_count),
            update_call_count: Arc::clone(&other.update_call_count),
        }
    }
}

#[async_trait::async_trait]
impl BookingStore for CountingStore {
    async fn create(&self, request: NewBooking) -> Result<Booking> {
        self.create_call_count.fetch_add(1, Ordering::SeqCst);
        self.inner.create(request).await
    }

    async fn get(&self, id: u64) -> Result<Option<Booking>> {
        self.inner.get(id).await
    }

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>> {
        self.inner.list(filter).await
    }

    async fn update(&self, booking: &Booking) -> Result<()> {
        self.update_call_count.fetch_add(1, Ordering::SeqCst);
        self.inner.update(booking).await
    }
}

/// Helper to build a complete booking draft for tests
pub fn valid_draft() -> BookingDraft {
    BookingDraft {
        location: Some("Vienna".to_string()),
        date: Some("2026-09-01".to_string()),
        time: Some("09:00".to_string()),
        duration_hours: Some(5),
        category: Some(CleaningCategory::Standard),
        addons: BTreeSet::new(),
        renegotiate: false,
    }
}

/// Helper to build valid customer details for tests
pub fn valid_customer() -> CustomerDetails {
    CustomerDetails {
        name: "Maria Huber".to_string(),
        email: "maria@example.com".to_string(),
        address: "Mariahilfer Str. 1, 1060 Wien".to_string(),
        phone: "+43 660 1234567".to_string(),
        gdpr_consent: true,
    }
}
