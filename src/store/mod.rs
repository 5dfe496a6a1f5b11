//! Append-only persistence of work entries, scoped per user.
//!
//! `EntryStore` is the capability handlers depend on. One backend is built at
//! startup and shared behind an `Arc<dyn EntryStore>`:
//! - [`PgEntryStore`]: PostgreSQL, the production backend
//! - [`JsonFileEntryStore`]: a single JSON file of persisted rows
//! - [`MemoryEntryStore`]: process memory, used by tests
//!
//! All backends persist the same [`WorkEntryRow`] shape and convert back to
//! [`WorkEntry`] on the way out, so `date` is always the UTC date of the
//! stored timestamp.

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::work_entry::{
    entry_total, WorkEntry, WorkEntryRow, MAX_PIECES, MAX_RATE_PER_PIECE,
};

mod file;
mod memory;
mod postgres;

pub use file::JsonFileEntryStore;
pub use memory::MemoryEntryStore;
pub use postgres::PgEntryStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Any failure of the backing store itself.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("file: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::Persistence(e.into())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Persistence(e.into())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Persistence(e.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Persists a new entry owned by `user_id` and returns the stored record.
    async fn save(&self, user_id: Uuid, entry: WorkEntry) -> StoreResult<WorkEntry>;

    /// Every entry owned by `user_id`, newest first.
    async fn list_all(&self, user_id: Uuid) -> StoreResult<Vec<WorkEntry>>;

    /// Entries whose timestamp falls on `date` (UTC), newest first.
    async fn list_by_date(&self, user_id: Uuid, date: NaiveDate) -> StoreResult<Vec<WorkEntry>>;

    /// Cheap liveness probe for readiness checks.
    async fn ping(&self) -> StoreResult<()>;
}

/// Rejects entries that must never be persisted.
pub fn validate_new_entry(entry: &WorkEntry) -> StoreResult<()> {
    if entry.pieces <= 0 {
        return Err(StoreError::Validation(
            "pieces must be a positive number".into(),
        ));
    }
    if entry.pieces > MAX_PIECES {
        return Err(StoreError::Validation(format!(
            "pieces must be at most {}",
            MAX_PIECES
        )));
    }
    if entry.rate_per_piece <= Decimal::ZERO {
        return Err(StoreError::Validation(
            "ratePerPiece must be greater than zero".into(),
        ));
    }
    if entry.rate_per_piece > MAX_RATE_PER_PIECE {
        return Err(StoreError::Validation(format!(
            "ratePerPiece must be at most {}",
            MAX_RATE_PER_PIECE
        )));
    }
    if entry_total(entry.pieces, entry.rate_per_piece) != Some(entry.total) {
        return Err(StoreError::Validation(
            "total must equal pieces * ratePerPiece".into(),
        ));
    }
    Ok(())
}

/// Half-open `[date 00:00, date+1 00:00)` bounds in UTC.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
    let end = date
        .checked_add_days(Days::new(1))
        .map(|next| next.and_time(chrono::NaiveTime::MIN).and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    (start, end)
}

pub(crate) fn row_to_entry(row: WorkEntryRow) -> StoreResult<WorkEntry> {
    WorkEntry::try_from(row).map_err(|e| PersistenceError::CorruptRow(e).into())
}

/// Newest first; stable so equal timestamps keep insertion order.
pub(crate) fn sort_newest_first(entries: &mut [WorkEntry]) {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}


#[cfg(test)]
mod tests {
    use super::contract::{entry, ts};
    use super::*;
    use crate::models::work_entry::WorkSession;

    #[test]
    fn test_validate_new_entry() {
        assert!(validate_new_entry(&entry(1, 1, ts(1, 1))).is_ok());
        assert!(matches!(
            validate_new_entry(&entry(-2, 1, ts(1, 1))),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            validate_new_entry(&entry(2, 0, ts(1, 1))),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_values_above_bounds() {
        let huge = WorkEntry::new(2, Decimal::MAX, WorkSession::Morning, ts(1, 1));
        assert!(matches!(validate_new_entry(&huge), Err(StoreError::Validation(_))));

        let many = entry(MAX_PIECES + 1, 1, ts(1, 1));
        assert!(matches!(validate_new_entry(&many), Err(StoreError::Validation(_))));

        let at_cap = WorkEntry::new(MAX_PIECES, MAX_RATE_PER_PIECE, WorkSession::Evening, ts(1, 1));
        assert!(validate_new_entry(&at_cap).is_ok());
    }

    #[test]
    fn test_validate_rejects_tampered_total() {
        let mut e = entry(2, 5, ts(1, 1));
        e.total = Decimal::from(11);
        assert!(matches!(validate_new_entry(&e), Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_day_bounds_half_open() {
        let (start, end) = day_bounds(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(start.to_rfc3339(), "2024-02-29T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2024-03-01T00:00:00+00:00");
    }
}
