//! SQLite adapter: Implementation of HistoryStore.
//!
//! Each user has one row in `users`; each prediction is stored as a JSON
//! document in `predictions`. The autoincrement `seq` column gives the
//! insertion order, which is also the chronological order.
//!
//! # Mutex Behavior
//!
//! The connection is protected by a `Mutex`. A poisoned lock is reported as
//! `StorageError::LockPoisoned` instead of panicking, so a history failure
//! never takes an assessment down with it.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::PredictionRecord;
use crate::ports::{HistoryPage, HistoryStore};

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid user id: {0:?}")]
    InvalidUserId(String),

    #[error("Record {id} cannot be stored: {reason}")]
    Unstorable { id: String, reason: String },

    #[error("Page bound out of range: {0}")]
    InvalidRange(usize),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// SQLite history store.
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    /// Open (or create) a database file.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory database (for testing).
    ///
    /// # Errors
    /// Returns error if database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.lock()?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS predictions (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                record_id TEXT NOT NULL,
                user_id TEXT NOT NULL REFERENCES users(id),
                created_at TEXT NOT NULL,
                document TEXT NOT NULL,
                UNIQUE (user_id, record_id)
            );

            CREATE INDEX IF NOT EXISTS idx_predictions_user_seq
                ON predictions(user_id, seq DESC);
            ",
        )?;

        Ok(())
    }

    fn check_user_id(user_id: &str) -> Result<(), StorageError> {
        if user_id.trim().is_empty() {
            return Err(StorageError::InvalidUserId(user_id.to_string()));
        }
        Ok(())
    }

    fn to_sql_bound(value: usize) -> Result<i64, StorageError> {
        i64::try_from(value).map_err(|_| StorageError::InvalidRange(value))
    }

    /// Serialize a record, refusing documents that would not read back.
    ///
    /// JSON has no non-finite numbers, so e.g. an infinite BMI is written as
    /// `null` and the stored row would be undecodable.
    fn encode(record: &PredictionRecord) -> Result<String, StorageError> {
        let document = serde_json::to_string(record)?;
        if let Err(e) = serde_json::from_str::<PredictionRecord>(&document) {
            return Err(StorageError::Unstorable {
                id: record.id().to_string(),
                reason: e.to_string(),
            });
        }
        Ok(document)
    }

    fn query_page(
        conn: &Connection,
        user_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<PredictionRecord>, StorageError> {
        let mut stmt = conn.prepare(
            r"
            SELECT seq, document
            FROM predictions
            WHERE user_id = ?1
            ORDER BY seq DESC
            LIMIT ?2 OFFSET ?3
            ",
        )?;

        let limit = Self::to_sql_bound(limit)?;
        let offset = Self::to_sql_bound(offset)?;
        let documents = stmt
            .query_map(params![user_id, limit, offset], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        // One bad row must not hide the rest of the history.
        let records = documents
            .into_iter()
            .filter_map(|(seq, document)| match serde_json::from_str(&document) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Skipping undecodable prediction row {seq}: {e}");
                    None
                }
            })
            .collect();
        Ok(records)
    }
}

impl HistoryStore for SqliteHistoryStore {
    type Error = StorageError;

    fn append(&self, user_id: &str, record: &PredictionRecord) -> Result<(), Self::Error> {
        Self::check_user_id(user_id)?;
        let document = Self::encode(record)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT OR IGNORE INTO users (id, created_at) VALUES (?1, ?2)",
            params![user_id, chrono::Utc::now().to_rfc3339()],
        )?;

        let inserted = tx.execute(
            r"
            INSERT OR IGNORE INTO predictions (record_id, user_id, created_at, document)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![
                record.id(),
                user_id,
                record.timestamp().to_rfc3339(),
                document,
            ],
        )?;

        tx.commit()?;

        if inserted == 0 {
            tracing::debug!("Record {} already stored, append skipped", record.id());
        } else {
            tracing::debug!("Appended record {} to history", record.id());
        }
        Ok(())
    }

    fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<PredictionRecord>, Self::Error> {
        let conn = self.lock()?;
        Self::query_page(&conn, user_id, 0, limit)
    }

    fn count(&self, user_id: &str) -> Result<usize, Self::Error> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM predictions WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }

    fn page(&self, user_id: &str, offset: usize, limit: usize) -> Result<HistoryPage, Self::Error> {
        let conn = self.lock()?;

        let total_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM predictions WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        let items = Self::query_page(&conn, user_id, offset, limit)?;

        Ok(HistoryPage::new(items, total_count as usize, offset, limit))
    }
}

impl SqliteHistoryStore {
    /// Whether a user row exists.
    ///
    /// # Errors
    /// Returns error if the read fails.
    pub fn has_user(&self, user_id: &str) -> Result<bool, StorageError> {
        let conn = self.lock()?;
        let found: Option<String> = conn
            .query_row("SELECT id FROM users WHERE id = ?1", params![user_id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::{record_at, scenario_input};
    use crate::domain::{
        FeatureEncoder, PredictionLabels, RecordAssembler, Recommendations, RiskAssessment,
    };
    use chrono::{Duration, TimeZone, Utc};

    fn base_time() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_append_and_recent_order() {
        let store = SqliteHistoryStore::in_memory().expect("Should create db");

        let records: Vec<_> = (0..7)
            .map(|i| record_at([0, i % 3, 0, 0, 0], base_time() + Duration::minutes(i)))
            .collect();
        for record in &records {
            store.append("user-1", record).expect("Should append");
        }

        let recent = store.recent("user-1", 5).expect("Should load");
        assert_eq!(recent.len(), 5);
        let ids: Vec<_> = recent.iter().map(|r| r.id().to_string()).collect();
        let expected: Vec<_> = records.iter().rev().take(5).map(|r| r.id().to_string()).collect();
        assert_eq!(ids, expected);
        assert_eq!(store.count("user-1").expect("Should count"), 7);
    }

    #[test]
    fn test_insertion_order_wins_over_timestamps() {
        let store = SqliteHistoryStore::in_memory().expect("Should create db");
        let later = record_at([0; 5], base_time() + Duration::hours(1));
        let earlier = record_at([0; 5], base_time());

        store.append("u", &later).expect("append");
        store.append("u", &earlier).expect("append");

        let recent = store.recent("u", 5).expect("load");
        assert_eq!(recent[0].id(), earlier.id());
        assert_eq!(recent[1].id(), later.id());
    }

    #[test]
    fn test_append_is_idempotent() {
        let store = SqliteHistoryStore::in_memory().expect("Should create db");
        let record = record_at([0, 1, 1, 1, 1], base_time());

        store.append("user-1", &record).expect("first append");
        store.append("user-1", &record).expect("retry append");

        assert_eq!(store.count("user-1").expect("count"), 1);
    }

    #[test]
    fn test_users_are_isolated() {
        let store = SqliteHistoryStore::in_memory().expect("Should create db");
        store.append("a", &record_at([0; 5], base_time())).expect("append");
        store.append("b", &record_at([0; 5], base_time())).expect("append");
        store.append("b", &record_at([0; 5], base_time())).expect("append");

        assert_eq!(store.count("a").expect("count"), 1);
        assert_eq!(store.recent("b", 5).expect("load").len(), 2);
        assert!(store.recent("nobody", 5).expect("load").is_empty());
        assert!(store.has_user("a").expect("lookup"));
        assert!(!store.has_user("nobody").expect("lookup"));
    }

    #[test]
    fn test_stored_record_is_unchanged() {
        let store = SqliteHistoryStore::in_memory().expect("Should create db");
        let record = record_at([0, 2, 2, 2, 1], base_time());
        store.append("u", &record).expect("append");

        let first = store.recent("u", 1).expect("load");
        let second = store.recent("u", 1).expect("load");
        assert_eq!(first[0].predictions(), record.predictions());
        assert_eq!(first[0].timestamp(), record.timestamp());
        assert_eq!(first[0].id(), second[0].id());
    }

    #[test]
    fn test_pagination() {
        let store = SqliteHistoryStore::in_memory().expect("Should create db");
        for i in 0..12 {
            store
                .append("u", &record_at([0; 5], base_time() + Duration::minutes(i)))
                .expect("append");
        }

        let first = store.page("u", 0, 5).expect("page");
        assert_eq!(first.items.len(), 5);
        assert_eq!(first.total_count, 12);
        assert!(first.has_more);
        assert_eq!(first.next_offset(), Some(5));

        let last = store.page("u", 10, 5).expect("page");
        assert_eq!(last.items.len(), 2);
        assert!(!last.has_more);
        assert_eq!(last.prev_offset(), Some(5));
    }

    /// A record whose BMI overflows to infinity.
    fn overflowing_bmi_record() -> PredictionRecord {
        let mut input = scenario_input();
        input.weight_kg = 1e308;
        input.height_cm = 1.0;
        let encoded = FeatureEncoder::encode(&input);
        let labels = PredictionLabels::try_from(vec![0, 0, 0, 0, 0]).expect("Valid labels");
        let assessment = RiskAssessment::decode(&labels);
        let recs = Recommendations::for_assessment(&assessment);
        RecordAssembler::assemble_at(input, &encoded, assessment, recs, base_time())
    }

    #[test]
    fn test_append_rejects_record_that_cannot_be_read_back() {
        let store = SqliteHistoryStore::in_memory().expect("Should create db");
        store.append("u", &record_at([0; 5], base_time())).expect("append");

        let record = overflowing_bmi_record();
        assert!(record.inputs().bmi.is_infinite());
        let err = store.append("u", &record);
        assert!(matches!(err, Err(StorageError::Unstorable { .. })));

        assert_eq!(store.count("u").expect("count"), 1);
        assert_eq!(store.recent("u", 5).expect("load").len(), 1);
    }

    #[test]
    fn test_undecodable_rows_are_skipped() {
        let store = SqliteHistoryStore::in_memory().expect("Should create db");
        let older = record_at([0; 5], base_time());
        let newer = record_at([0, 1, 0, 0, 0], base_time() + Duration::minutes(2));
        store.append("u", &older).expect("append");
        {
            let conn = store.lock().expect("lock");
            conn.execute(
                "INSERT INTO predictions (record_id, user_id, created_at, document) VALUES (?1, ?2, ?3, ?4)",
                params!["broken", "u", base_time().to_rfc3339(), r#"{"id":"broken","inputs":{"BMI":null}}"#],
            )
            .expect("insert broken row");
        }
        store.append("u", &newer).expect("append");

        let recent = store.recent("u", 5).expect("Should load despite a bad row");
        let ids: Vec<_> = recent.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![newer.id(), older.id()]);

        let page = store.page("u", 0, 5).expect("page");
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_count, 3);
    }

    #[test]
    fn test_page_offset_beyond_sql_range() {
        let store = SqliteHistoryStore::in_memory().expect("Should create db");
        store.append("u", &record_at([0; 5], base_time())).expect("append");

        assert!(matches!(
            store.page("u", usize::MAX, 5),
            Err(StorageError::InvalidRange(usize::MAX))
        ));
        assert!(store.recent("u", usize::MAX).is_err());

        let past_end = store.page("u", 50, 5).expect("page");
        assert!(past_end.items.is_empty());
        assert!(!past_end.has_more);
    }

    #[test]
    fn test_same_record_under_two_users() {
        let store = SqliteHistoryStore::in_memory().expect("Should create db");
        let record = record_at([0; 5], base_time());

        store.append("a", &record).expect("append a");
        store.append("b", &record).expect("append b");
        store.append("b", &record).expect("retry b");

        assert_eq!(store.count("a").expect("count"), 1);
        assert_eq!(store.count("b").expect("count"), 1);
        assert_eq!(store.recent("b", 5).expect("load")[0].id(), record.id());
    }

    #[test]
    fn test_rejects_blank_user() {
        let store = SqliteHistoryStore::in_memory().expect("Should create db");
        let err = store.append("  ", &record_at([0; 5], base_time()));
        assert!(matches!(err, Err(StorageError::InvalidUserId(_))));
    }
}
