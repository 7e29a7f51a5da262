// # Memory Booking Store
//
// In-memory implementation of BookingStore.
//
// ## Purpose
//
// Provides a simple, fast booking store that doesn't persist across
// restarts. Useful for testing, demos, and deployments where an external
// database adapter replaces this crate's stores entirely.
//
// ## Crash Behavior
//
// - All bookings are lost on restart/crash
// - Identity assignment restarts at 1

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use async_trait::async_trait;

use crate::Error;
use crate::booking::{Booking, BookingFilter, NewBooking};
use crate::traits::BookingStore;

/// In-memory booking store implementation
///
/// Bookings live in a HashMap protected by a RwLock; identities come from an
/// atomic counter. No persistence across restarts.
///
/// # Example
///
/// ```rust,no_run
/// use booking_core::store::MemoryBookingStore;
/// use booking_core::traits::BookingStore;
/// use booking_core::booking::BookingDraft;
/// use booking_core::pricing::CleaningCategory;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryBookingStore::new();
///
///     let draft = BookingDraft {
///         date: Some("2026-09-01".to_string()),
///         time: Some("09:00".to_string()),
///         duration_hours: Some(3),
///         category: Some(CleaningCategory::Standard),
///         ..Default::default()
///     };
///     let booking = store.create(draft.validate()?).await?;
///     assert_eq!(store.get(booking.id).await?.map(|b| b.id), Some(booking.id));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryBookingStore {
    inner: Arc<RwLock<HashMap<u64, Booking>>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryBookingStore {
    /// Create a new empty memory booking store
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Get the number of bookings in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

impl Default for MemoryBookingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn create(&self, request: NewBooking) -> Result<Booking, Error> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let booking = Booking::new(id, request);

        let mut guard = self.inner.write().await;
        guard.insert(id, booking.clone());
        Ok(booking)
    }

    async fn get(&self, id: u64) -> Result<Option<Booking>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(&id).cloned())
    }

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, Error> {
        let guard = self.inner.read().await;
        let mut bookings: Vec<Booking> = guard
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        // Newest first; id breaks creation-timestamp ties
        bookings.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(bookings)
    }

    async fn update(&self, booking: &Booking) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        if !guard.contains_key(&booking.id) {
            return Err(Error::store(format!(
                "cannot update unknown booking {}",
                booking.id
            )));
        }
        guard.insert(booking.id, booking.clone());
        Ok(())
    }
}
