//! History entries prepared for display.
//!
//! Stored timestamps are UTC. Display shifts them by a fixed offset
//! (UTC+5:30 by default) without touching the stored record.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::domain::PredictionRecord;
use crate::ports::HistoryPage;

/// Display format for history timestamps.
pub const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A stored record with its local display time.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub record: PredictionRecord,
    pub timestamp_ist: NaiveDateTime,
    pub timestamp_ist_str: String,
}

impl HistoryEntry {
    #[must_use]
    pub fn from_record(record: PredictionRecord, offset_minutes: i64) -> Self {
        let local = record.timestamp().naive_utc() + Duration::minutes(offset_minutes);
        Self {
            timestamp_ist_str: local.format(DISPLAY_TIME_FORMAT).to_string(),
            timestamp_ist: local,
            record,
        }
    }
}

/// A history page with display times.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryView {
    pub items: Vec<HistoryEntry>,
    pub total_count: usize,
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
    pub next_offset: Option<usize>,
    pub prev_offset: Option<usize>,
}

impl HistoryView {
    #[must_use]
    pub fn from_page(page: HistoryPage, offset_minutes: i64) -> Self {
        let next_offset = page.next_offset();
        let prev_offset = page.prev_offset();
        Self {
            items: page
                .items
                .into_iter()
                .map(|r| HistoryEntry::from_record(r, offset_minutes))
                .collect(),
            total_count: page.total_count,
            offset: page.offset,
            limit: page.limit,
            has_more: page.has_more,
            next_offset,
            prev_offset,
        }
    }
}
