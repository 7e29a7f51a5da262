// # Booking Store Trait
//
// Defines the interface for persisting booking records.
//
// ## Purpose
//
// The store is an opaque keyed-record collection. It assigns identities,
// remembers records, and answers filtered queries. It holds no business
// logic: validation, pricing and state transitions are owned by the
// lifecycle service.
//
// ## Implementations
//
// - Memory: `crate::store::MemoryBookingStore`
// - File-based: `crate::store::FileBookingStore`

use async_trait::async_trait;

use crate::booking::{Booking, BookingFilter, NewBooking};

/// Trait for booking store implementations
///
/// This trait defines the interface for keyed booking persistence.
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
///
/// # Responsibilities
///
/// Stores own identity assignment and the persisted representation, and
/// nothing else. In particular they must not:
///
/// - Validate booking input (owned by the lifecycle service)
/// - Compute or correct prices (owned by the pricing policy)
/// - Decide state transitions (owned by the lifecycle service)
/// - Attempt notification delivery (owned by the dispatcher)
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Persist a new booking in state `Requested`.
    ///
    /// Assigns a process-unique identity and the creation timestamp.
    ///
    /// # Returns
    ///
    /// - `Ok(Booking)`: The created record, including its assigned id
    /// - `Err(Error)`: Storage error
    async fn create(&self, request: NewBooking) -> Result<Booking, crate::Error>;

    /// Fetch a booking by id
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Booking))`: The stored record
    /// - `Ok(None)`: No booking with that id
    /// - `Err(Error)`: Storage error
    async fn get(&self, id: u64) -> Result<Option<Booking>, crate::Error>;

    /// List bookings matching a filter, newest first.
    ///
    /// An empty filter lists everything. Ordering is by creation time,
    /// descending.
    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, crate::Error>;

    /// Replace the stored record with the same id.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Successfully updated
    /// - `Err(Error)`: Unknown id or storage error
    async fn update(&self, booking: &Booking) -> Result<(), crate::Error>;
}
