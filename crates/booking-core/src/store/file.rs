// # File Booking Store
//
// File-based implementation of BookingStore with crash recovery.
//
// ## Purpose
//
// Provides persistent booking storage across daemon restarts and crashes,
// including the identity high-water mark so restarts never reuse an id.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good state
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "next_id": 3,
//   "bookings": {
//     "1": { "id": 1, "date": "2026-09-01", "state": "requested", ... },
//     "2": { "id": 2, "date": "2026-09-02", "state": "confirmed", ... }
//   }
// }
// ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::booking::{Booking, BookingFilter, NewBooking};
use crate::traits::BookingStore;

/// Bookings file format version
/// Used for future migration if format changes
const BOOKINGS_FILE_VERSION: &str = "1.0";

/// File-based booking store with crash recovery
///
/// This implementation persists bookings to a JSON file with atomic writes
/// and automatic corruption recovery.
///
/// # Crash Recovery
///
/// - **Atomic writes**: New state written to temporary file, then renamed
/// - **Backup**: Last known good state kept in `.backup` file
/// - **Corruption detection**: JSON validation on load
/// - **Automatic recovery**: Falls back to backup if main file corrupted
#[derive(Debug)]
pub struct FileBookingStore {
    path: PathBuf,
    state: Arc<RwLock<FileState>>,
}

/// Internal state for the file-based store
#[derive(Debug)]
struct FileState {
    bookings: HashMap<u64, Booking>,
    next_id: u64,
}

/// Serializable bookings file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct BookingsFileFormat {
    version: String,
    next_id: u64,
    bookings: HashMap<u64, Booking>,
}

impl FileBookingStore {
    /// Create or load a file booking store
    ///
    /// This will:
    /// 1. Try to load the existing bookings file
    /// 2. If corruption is detected, try to load from backup
    /// 3. If both fail, start with an empty store
    /// 4. Create parent directories if needed
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create bookings directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let (bookings, next_id) = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(FileState { bookings, next_id })),
        })
    }

    /// Load bookings from file with automatic recovery
    ///
    /// Recovery strategy:
    /// 1. Try to load the main bookings file
    /// 2. If JSON parse error, try loading the backup
    /// 3. If the backup also fails, start empty
    async fn load_with_recovery(path: &Path) -> Result<(HashMap<u64, Booking>, u64), Error> {
        match Self::load(path).await {
            Ok(loaded) => {
                tracing::debug!("Loaded bookings from file: {} record(s)", loaded.0.len());
                Ok(loaded)
            }
            Err(e) => {
                // Check if it's a JSON parse error (corruption)
                let error_str = e.to_string().to_lowercase();
                let corrupted = error_str.contains("json")
                    || error_str.contains("parse")
                    || error_str.contains("expected value");

                if !corrupted {
                    return Err(e);
                }

                tracing::warn!(
                    "Bookings file appears corrupted: {}. Attempting recovery from backup.",
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with empty store.");
                    return Ok((HashMap::new(), 1));
                }

                match Self::load(&backup_path).await {
                    Ok(loaded) => {
                        tracing::info!(
                            "Recovered bookings from backup: {} record(s)",
                            loaded.0.len()
                        );
                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "Failed to restore bookings file from backup: {}",
                                restore_err
                            );
                        }
                        Ok(loaded)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also corrupted: {}. Starting with empty store.",
                            backup_err
                        );
                        Ok((HashMap::new(), 1))
                    }
                }
            }
        }
    }

    /// Load bookings from a file
    async fn load(path: &Path) -> Result<(HashMap<u64, Booking>, u64), Error> {
        if !path.exists() {
            tracing::debug!("Bookings file does not exist: {}", path.display());
            return Ok((HashMap::new(), 1));
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::store(format!(
                "Failed to read bookings file {}: {}",
                path.display(),
                e
            ))
        })?;

        let file: BookingsFileFormat = serde_json::from_str(&content).map_err(|e| {
            Error::store(format!(
                "Failed to parse bookings file {}: {}. \
                File may be corrupted. Try restoring from backup.",
                path.display(),
                e
            ))
        })?;

        if file.version != BOOKINGS_FILE_VERSION {
            tracing::warn!(
                "Bookings file version mismatch: expected {}, got {}. \
                Attempting to load anyway.",
                BOOKINGS_FILE_VERSION,
                file.version
            );
        }

        // Never reuse an id, even if next_id was written by an older build
        // that tracked it loosely.
        let max_id = file.bookings.keys().copied().max().unwrap_or(0);
        let next_id = file.next_id.max(max_id + 1);

        Ok((file.bookings, next_id))
    }

    /// Write bookings to file atomically
    async fn write_state(&self) -> Result<(), Error> {
        let state_guard = self.state.read().await;

        let file = BookingsFileFormat {
            version: BOOKINGS_FILE_VERSION.to_string(),
            next_id: state_guard.next_id,
            bookings: state_guard.bookings.clone(),
        };
        drop(state_guard);

        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| Error::store(format!("Failed to serialize bookings: {}", e)))?;

        // Write to temporary file first
        let temp_path = self.temp_path();
        {
            let mut f = fs::File::create(&temp_path).await.map_err(|e| {
                Error::store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            f.write_all(json.as_bytes()).await.map_err(|e| {
                Error::store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            f.flush().await.map_err(|e| {
                Error::store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        // Create backup of current file (if it exists)
        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        // Atomic rename (temp -> actual)
        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Bookings written to file: {}", self.path.display());
        Ok(())
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    /// Get path to backup file
    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl BookingStore for FileBookingStore {
    async fn create(&self, request: NewBooking) -> Result<Booking, Error> {
        let booking = {
            let mut state_guard = self.state.write().await;
            let id = state_guard.next_id;
            state_guard.next_id += 1;

            let booking = Booking::new(id, request);
            state_guard.bookings.insert(id, booking.clone());
            booking
        };

        // Immediate write for durability
        self.write_state().await?;
        Ok(booking)
    }

    async fn get(&self, id: u64) -> Result<Option<Booking>, Error> {
        let state_guard = self.state.read().await;
        Ok(state_guard.bookings.get(&id).cloned())
    }

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, Error> {
        let state_guard = self.state.read().await;
        let mut bookings: Vec<Booking> = state_guard
            .bookings
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(bookings)
    }

    async fn update(&self, booking: &Booking) -> Result<(), Error> {
        {
            let mut state_guard = self.state.write().await;
            if !state_guard.bookings.contains_key(&booking.id) {
                return Err(Error::store(format!(
                    "cannot update unknown booking {}",
                    booking.id
                )));
            }
            state_guard.bookings.insert(booking.id, booking.clone());
        }

        // Immediate write for durability
        self.write_state().await
    }
}
