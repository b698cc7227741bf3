//! History port: Trait for the per-user prediction history.
//!
//! Each user owns an ordered, append-only list of prediction records.
//! Insertion order is chronological order.

use crate::domain::PredictionRecord;

/// Number of entries shown alongside a fresh assessment.
pub const DEFAULT_HISTORY_LIMIT: usize = 5;

/// A page of history records, most recent first.
#[derive(Debug, Clone)]
pub struct HistoryPage {
    /// Records in this page
    pub items: Vec<PredictionRecord>,
    /// Total number of records the user has
    pub total_count: usize,
    /// Offset from the most recent record
    pub offset: usize,
    /// Page size limit
    pub limit: usize,
    /// Whether older records remain
    pub has_more: bool,
}

impl HistoryPage {
    #[must_use]
    pub fn new(items: Vec<PredictionRecord>, total_count: usize, offset: usize, limit: usize) -> Self {
        let has_more = offset.saturating_add(items.len()) < total_count;
        Self {
            items,
            total_count,
            offset,
            limit,
            has_more,
        }
    }

    /// Offset of the next (older) page.
    #[must_use]
    pub fn next_offset(&self) -> Option<usize> {
        if self.has_more {
            self.offset.checked_add(self.limit)
        } else {
            None
        }
    }

    /// Offset of the previous (newer) page.
    #[must_use]
    pub fn prev_offset(&self) -> Option<usize> {
        if self.offset > 0 {
            Some(self.offset.saturating_sub(self.limit))
        } else {
            None
        }
    }
}

/// Trait for prediction history storage.
///
/// Stores must make `append` atomic per user; the pipeline takes no locks.
pub trait HistoryStore: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Append a record to the end of the user's list.
    ///
    /// Appending a record whose id is already stored is a no-op, so callers
    /// may retry.
    ///
    /// # Errors
    /// Returns error if the write fails.
    fn append(&self, user_id: &str, record: &PredictionRecord) -> Result<(), Self::Error>;

    /// Most recent records first, at most `limit`.
    ///
    /// # Errors
    /// Returns error if the read fails.
    fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<PredictionRecord>, Self::Error>;

    /// Number of records stored for the user.
    ///
    /// # Errors
    /// Returns error if the read fails.
    fn count(&self, user_id: &str) -> Result<usize, Self::Error>;

    /// Page through the user's history, most recent first.
    ///
    /// # Errors
    /// Returns error if the read fails.
    fn page(&self, user_id: &str, offset: usize, limit: usize) -> Result<HistoryPage, Self::Error>;
}
