//! Database module using DuckDB
//!
//! Stores the mood log and serves chart series for a date range. Rolling
//! statistics are computed by DuckDB window functions over each subject's
//! whole history.

mod filter;
mod queries;
mod schema;

pub use filter::DateFilter;
pub use queries::{EventRow, MoodRow};

use async_trait::async_trait;
use chrono::NaiveDate;
use duckdb::Connection;
use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::chart::SeriesGateway;
use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::series::{Sequence, SequenceKind, Series};
use crate::types::{MoodScore, SubjectId};
use crate::window::{resolve_at, DateRange, WindowType};

/// Default trailing window for rolling statistics, in logged days.
pub const DEFAULT_ROLLING_WINDOW: usize = 14;

/// Accepted rolling window lengths. A deviation needs at least two samples.
pub const ROLLING_WINDOW_RANGE: RangeInclusive<usize> = 2..=365;

/// A day's mood log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayEntry {
    pub date: NaiveDate,
    pub mood: MoodScore,
    pub high: Option<MoodScore>,
    pub low: Option<MoodScore>,
    pub notes: Option<String>,
}

impl DayEntry {
    #[must_use]
    pub const fn new(date: NaiveDate, mood: MoodScore) -> Self {
        Self {
            date,
            mood,
            high: None,
            low: None,
            notes: None,
        }
    }
}

/// An event spanning one or more days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEntry {
    pub name: String,
    pub mood: MoodScore,
    pub span: DateRange,
    pub notes: Option<String>,
}

/// Database wrapper for the mood log using DuckDB
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    owner: SubjectId,
    rolling_window: usize,
}

impl Database {
    /// Create a new database connection
    ///
    /// # Arguments
    /// * `config` - Database configuration
    /// * `data_dir` - Default data directory for local DB
    pub async fn new(config: &DatabaseConfig, data_dir: &Path) -> Result<Self> {
        let db_path = if let Some(ref path) = config.path {
            let path = Path::new(path);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            path.to_path_buf()
        } else {
            std::fs::create_dir_all(data_dir)?;
            data_dir.join("moods.duckdb")
        };

        // Open DuckDB connection (synchronous, so we use spawn_blocking)
        let db_path_str = db_path.to_string_lossy().to_string();
        let conn = tokio::task::spawn_blocking(move || Connection::open(&db_path_str))
            .await
            .map_err(|e| Error::other(e.to_string()))??;

        Self::from_connection(conn)
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            owner: SubjectId::OWNER,
            rolling_window: DEFAULT_ROLLING_WINDOW,
        })
    }

    /// Subject whose full log is shown when no subject is requested
    #[must_use]
    pub fn with_owner(mut self, owner: SubjectId) -> Self {
        self.owner = owner;
        self
    }

    /// Trailing window length for rolling statistics, clamped to
    /// [`ROLLING_WINDOW_RANGE`]
    #[must_use]
    pub fn with_rolling_window(mut self, window: usize) -> Self {
        let clamped = window.clamp(*ROLLING_WINDOW_RANGE.start(), *ROLLING_WINDOW_RANGE.end());
        if clamped != window {
            warn!(requested = window, used = clamped, "rolling window out of range");
        }
        self.rolling_window = clamped;
        self
    }

    #[must_use]
    pub const fn rolling_window(&self) -> usize {
        self.rolling_window
    }

    #[must_use]
    pub const fn owner(&self) -> SubjectId {
        self.owner
    }

    /// Log (or overwrite) one day's mood
    pub async fn log_day(&self, subject: SubjectId, entry: &DayEntry) -> Result<()> {
        let conn = self.conn.lock().await;
        queries::upsert_day(&conn, subject, entry)
    }

    /// Log an event and link it to the logged days it spans
    pub async fn log_event(&self, subject: SubjectId, event: &EventEntry) -> Result<(i64, usize)> {
        let conn = self.conn.lock().await;
        queries::insert_event(&conn, subject, event)
    }

    /// Date of the subject's first log entry
    pub async fn earliest_record(&self, subject: SubjectId) -> Result<Option<NaiveDate>> {
        let conn = self.conn.lock().await;
        queries::earliest_record(&conn, subject)
    }

    /// Number of logged days for the subject
    pub async fn day_count(&self, subject: SubjectId) -> Result<i64> {
        let conn = self.conn.lock().await;
        queries::day_count(&conn, subject)
    }

    /// Logged days in `range` with rolling statistics
    pub async fn mood_rows(&self, subject: SubjectId, range: &DateRange) -> Result<Vec<MoodRow>> {
        let conn = self.conn.lock().await;
        queries::get_mood_rows(&conn, subject, range, self.rolling_window)
    }

    /// Event days inside `range`
    pub async fn event_rows(&self, subject: SubjectId, range: &DateRange) -> Result<Vec<EventRow>> {
        let conn = self.conn.lock().await;
        queries::get_event_rows(&conn, subject, range)
    }
}

#[async_trait]
impl SeriesGateway for Database {
    async fn fetch_series(&self, range: DateRange, subject: Option<SubjectId>) -> Result<Series> {
        let series = match subject {
            None => {
                let rows = self.mood_rows(self.owner, &range).await?;
                let events = self.event_rows(self.owner, &range).await?;
                owner_series(&rows, &events)
            }
            Some(subject) => smoothed_series(&self.mood_rows(subject, &range).await?),
        };
        debug!(%range, ?subject, sequences = series.sequences.len(), "series fetched");
        Ok(series)
    }

    async fn fetch_day_detail(&self, day: NaiveDate, subject: Option<SubjectId>) -> Result<Series> {
        let range = resolve_at(WindowType::Day, day, None, day)?;
        let series = match subject {
            None => day_detail_series(&self.mood_rows(self.owner, &range).await?),
            Some(subject) => smoothed_series(&self.mood_rows(subject, &range).await?),
        };
        debug!(%day, ?subject, sequences = series.sequences.len(), "day detail fetched");
        Ok(series)
    }
}

#[allow(clippy::cast_precision_loss)]
fn mood_sequence(rows: &[MoodRow]) -> Sequence {
    let mut mood = Sequence::new("mood", SequenceKind::Mood);
    for row in rows {
        mood.push(row.date, row.mood as f64);
    }
    mood
}

fn rolling_sequences(rows: &[MoodRow]) -> [Sequence; 2] {
    let mut mean = Sequence::new("rolling mean", SequenceKind::RollingMean);
    let mut deviation = Sequence::new("rolling deviation", SequenceKind::RollingDeviation);
    for row in rows {
        if let Some(value) = row.rolling_mean {
            mean.push(row.date, value);
        }
        if let Some(value) = row.rolling_deviation {
            deviation.push(row.date, value);
        }
    }
    [mean, deviation]
}

/// Raw mood, rolling statistics, then one marker sequence per event.
#[allow(clippy::cast_precision_loss)]
fn owner_series(rows: &[MoodRow], events: &[EventRow]) -> Series {
    let mut series = Series::new();
    series.push(mood_sequence(rows));
    for sequence in rolling_sequences(rows) {
        series.push(sequence);
    }

    let mut current: Option<(i64, Sequence)> = None;
    for event in events {
        if current.as_ref().map(|(id, _)| *id) != Some(event.event_id) {
            if let Some((_, done)) = current.take() {
                series.push(done);
            }
            current = Some((event.event_id, Sequence::new(&event.name, SequenceKind::Event)));
        }
        if let Some((_, sequence)) = current.as_mut() {
            sequence.push(event.date, event.mood as f64);
        }
    }
    if let Some((_, done)) = current {
        series.push(done);
    }

    series
}

/// Rolling statistics only, for viewing another subject's log.
fn smoothed_series(rows: &[MoodRow]) -> Series {
    Series {
        sequences: rolling_sequences(rows).into(),
    }
}

#[allow(clippy::cast_precision_loss)]
fn day_detail_series(rows: &[MoodRow]) -> Series {
    let mut high = Sequence::new("high", SequenceKind::High);
    let mut low = Sequence::new("low", SequenceKind::Low);
    for row in rows {
        if let Some(value) = row.high {
            high.push(row.date, value as f64);
        }
        if let Some(value) = row.low {
            low.push(row.date, value as f64);
        }
    }
    Series {
        sequences: vec![mood_sequence(rows), high, low],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn mood(value: i64) -> MoodScore {
        MoodScore::new(value).unwrap()
    }

    async fn log_days(db: &Database, subject: SubjectId, start: NaiveDate, moods: &[i64]) {
        for (offset, value) in moods.iter().enumerate() {
            let date = start + chrono::Duration::days(i64::try_from(offset).unwrap());
            db.log_day(subject, &DayEntry::new(date, mood(*value)))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_earliest_record_and_count() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.earliest_record(SubjectId::OWNER).await.unwrap(), None);

        log_days(&db, SubjectId::OWNER, d(2019, 3, 1), &[5, 6, 7]).await;
        log_days(&db, SubjectId(2), d(2018, 1, 1), &[1]).await;

        assert_eq!(
            db.earliest_record(SubjectId::OWNER).await.unwrap(),
            Some(d(2019, 3, 1))
        );
        assert_eq!(db.day_count(SubjectId::OWNER).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_log_day_overwrites_same_date() {
        let db = Database::open_in_memory().unwrap();
        let date = d(2024, 2, 1);
        db.log_day(SubjectId::OWNER, &DayEntry::new(date, mood(3)))
            .await
            .unwrap();
        db.log_day(SubjectId::OWNER, &DayEntry::new(date, mood(-8)))
            .await
            .unwrap();

        let range = DateRange::new(date, date).unwrap();
        let rows = db.mood_rows(SubjectId::OWNER, &range).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].mood, -8);
    }

    #[tokio::test]
    async fn test_rolling_window_uses_history_before_range() {
        let db = Database::open_in_memory()
            .unwrap()
            .with_rolling_window(3);
        log_days(&db, SubjectId::OWNER, d(2024, 1, 30), &[10, 20, 30, 40]).await;

        // Feb 1 is the third logged day, so its window is already full.
        let range = DateRange::new(d(2024, 2, 1), d(2024, 2, 29)).unwrap();
        let rows = db.mood_rows(SubjectId::OWNER, &range).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, d(2024, 2, 1));
        assert!((rows[0].rolling_mean.unwrap() - 20.0).abs() < 1e-9);
        assert!((rows[0].rolling_deviation.unwrap() - 10.0).abs() < 1e-9);
        assert!((rows[1].rolling_mean.unwrap() - 30.0).abs() < 1e-9);

        let early = DateRange::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap();
        let rows = db.mood_rows(SubjectId::OWNER, &early).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.rolling_mean.is_none()));
    }

    #[tokio::test]
    async fn test_owner_series_with_events() {
        let db = Database::open_in_memory().unwrap();
        log_days(&db, SubjectId::OWNER, d(2024, 3, 1), &[1, 2, 3, 4]).await;
        let (_, linked) = db
            .log_event(
                SubjectId::OWNER,
                &EventEntry {
                    name: "Trip".into(),
                    mood: mood(25),
                    span: DateRange::new(d(2024, 3, 2), d(2024, 3, 3)).unwrap(),
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(linked, 2);

        let range = DateRange::new(d(2024, 3, 1), d(2024, 3, 31)).unwrap();
        let series = db.fetch_series(range, None).await.unwrap();

        let kinds: Vec<_> = series.sequences.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            [
                SequenceKind::Mood,
                SequenceKind::RollingMean,
                SequenceKind::RollingDeviation,
                SequenceKind::Event
            ]
        );
        assert_eq!(series.first_of(SequenceKind::Mood).unwrap().points.len(), 4);
        let trip = series.first_of(SequenceKind::Event).unwrap();
        assert_eq!(trip.label, "Trip");
        assert_eq!(trip.value_on(d(2024, 3, 3)), Some(25.0));
    }

    #[tokio::test]
    async fn test_subject_series_is_smoothed_only() {
        let db = Database::open_in_memory().unwrap().with_rolling_window(2);
        log_days(&db, SubjectId(5), d(2024, 3, 1), &[0, 10, 20]).await;

        let range = DateRange::new(d(2024, 3, 1), d(2024, 3, 31)).unwrap();
        let series = db.fetch_series(range, Some(SubjectId(5))).await.unwrap();
        assert!(series.first_of(SequenceKind::Mood).is_none());
        let mean = series.first_of(SequenceKind::RollingMean).unwrap();
        assert_eq!(mean.value_on(d(2024, 3, 2)), Some(5.0));
        assert_eq!(mean.points.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_range_returns_empty_series() {
        let db = Database::open_in_memory().unwrap();
        let range = DateRange::new(d(2000, 1, 1), d(2000, 12, 31)).unwrap();
        assert!(db.fetch_series(range, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_day_detail() {
        let db = Database::open_in_memory().unwrap();
        let mut entry = DayEntry::new(d(2024, 5, 2), mood(4));
        entry.high = Some(mood(20));
        entry.low = Some(mood(-10));
        db.log_day(SubjectId::OWNER, &entry).await.unwrap();
        log_days(&db, SubjectId::OWNER, d(2024, 5, 5), &[9]).await;

        let series = db.fetch_day_detail(d(2024, 5, 2), None).await.unwrap();
        assert_eq!(series.first_of(SequenceKind::Mood).unwrap().points.len(), 1);
        assert_eq!(
            series.first_of(SequenceKind::High).unwrap().value_on(d(2024, 5, 2)),
            Some(20.0)
        );
        assert_eq!(
            series.first_of(SequenceKind::Low).unwrap().value_on(d(2024, 5, 2)),
            Some(-10.0)
        );
    }

    #[tokio::test]
    async fn test_subject_day_detail_is_smoothed_only() {
        let db = Database::open_in_memory().unwrap().with_rolling_window(2);
        log_days(&db, SubjectId::OWNER, d(2024, 3, 2), &[-40]).await;
        log_days(&db, SubjectId(5), d(2024, 3, 1), &[7, 9]).await;

        let series = db
            .fetch_day_detail(d(2024, 3, 2), Some(SubjectId(5)))
            .await
            .unwrap();
        assert!(series.first_of(SequenceKind::Mood).is_none());
        assert!(series.first_of(SequenceKind::High).is_none());
        assert!(series.first_of(SequenceKind::Low).is_none());
        let mean = series.first_of(SequenceKind::RollingMean).unwrap();
        assert_eq!(mean.value_on(d(2024, 3, 2)), Some(8.0));
        assert!(series
            .sequences
            .iter()
            .flat_map(|s| &s.points)
            .all(|p| (p.value - -40.0).abs() > f64::EPSILON));
    }

    #[tokio::test]
    async fn test_rolling_window_is_clamped() {
        let db = Database::open_in_memory().unwrap().with_rolling_window(0);
        assert_eq!(db.rolling_window(), 2);
        assert_eq!(db.clone().with_rolling_window(1).rolling_window(), 2);
        assert_eq!(db.clone().with_rolling_window(10_000).rolling_window(), 365);

        // A single logged day never fills the window.
        log_days(&db, SubjectId::OWNER, d(2024, 3, 1), &[12]).await;
        let range = DateRange::new(d(2024, 3, 1), d(2024, 3, 31)).unwrap();
        let rows = db.mood_rows(SubjectId::OWNER, &range).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rolling_mean, None);
    }
}
