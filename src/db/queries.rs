//! Database query implementations for DuckDB

use chrono::NaiveDate;
use duckdb::types::Value;
use duckdb::{params, params_from_iter, Connection, OptionalExt};

use crate::error::{Error, Result};
use crate::types::SubjectId;
use crate::window::DateRange;

use super::filter::DateFilter;
use super::{DayEntry, EventEntry};

/// A logged day with its trailing statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct MoodRow {
    pub date: NaiveDate,
    pub mood: i64,
    pub high: Option<i64>,
    pub low: Option<i64>,
    /// `None` until the trailing window is full
    pub rolling_mean: Option<f64>,
    /// `None` until the trailing window is full
    pub rolling_deviation: Option<f64>,
}

/// One day covered by a logged event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    pub event_id: i64,
    pub name: String,
    pub mood: i64,
    pub date: NaiveDate,
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| Error::other(format!("bad date '{s}' from database: {e}")))
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Insert or replace the log entry for one day
pub fn upsert_day(conn: &Connection, subject: SubjectId, entry: &DayEntry) -> Result<()> {
    conn.execute(
        r"
        INSERT INTO days (user_id, date, overall_mood, max_mood, min_mood, notes)
        VALUES (?, CAST(? AS DATE), ?, ?, ?, ?)
        ON CONFLICT (user_id, date) DO UPDATE SET
            overall_mood = excluded.overall_mood,
            max_mood = excluded.max_mood,
            min_mood = excluded.min_mood,
            notes = excluded.notes
        ",
        params![
            subject.get(),
            format_date(entry.date),
            entry.mood.get(),
            entry.high.map(|m| m.get()),
            entry.low.map(|m| m.get()),
            entry.notes.as_deref(),
        ],
    )?;

    Ok(())
}

/// Insert an event and link it to the logged days it spans.
///
/// Returns the new event id and the number of linked days.
pub fn insert_event(
    conn: &Connection,
    subject: SubjectId,
    event: &EventEntry,
) -> Result<(i64, usize)> {
    let event_id: i64 = conn.query_row(
        r"
        INSERT INTO events (user_id, event_name, overall_mood, notes)
        VALUES (?, ?, ?, ?)
        RETURNING event_id
        ",
        params![
            subject.get(),
            event.name.as_str(),
            event.mood.get(),
            event.notes.as_deref(),
        ],
        |row| row.get(0),
    )?;

    let (start, end) = event.span.to_sql_tuple();
    let linked = conn.execute(
        r"
        INSERT INTO event_days (event_id, day_id)
        SELECT CAST(? AS BIGINT), day_id FROM days
        WHERE user_id = ? AND date >= CAST(? AS DATE) AND date <= CAST(? AS DATE)
        ",
        params![event_id, subject.get(), start, end],
    )?;

    Ok((event_id, linked))
}

/// Date of the subject's first log entry
pub fn earliest_record(conn: &Connection, subject: SubjectId) -> Result<Option<NaiveDate>> {
    let first: Option<String> = conn
        .query_row(
            "SELECT strftime(MIN(date), '%Y-%m-%d') FROM days WHERE user_id = ?",
            params![subject.get()],
            |row| row.get(0),
        )
        .optional()?
        .flatten();

    first.as_deref().map(parse_date).transpose()
}

/// Number of logged days for the subject
pub fn day_count(conn: &Connection, subject: SubjectId) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT COUNT(*) FROM days WHERE user_id = ?")?;
    let count: i64 = stmt.query_row(params![subject.get()], |row| row.get(0))?;
    Ok(count)
}

/// Logged days in `range` with trailing mean and deviation over `window` logged days.
///
/// Statistics run over the whole history so the first days of the range
/// still see the entries before it.
pub fn get_mood_rows(
    conn: &Connection,
    subject: SubjectId,
    range: &DateRange,
    window: usize,
) -> Result<Vec<MoodRow>> {
    let (start, end) = range.to_sql_tuple();
    let mut date_conditions = String::new();
    let mut params = Vec::new();
    DateFilter::new(Some(&start), Some(&end)).apply(&mut date_conditions, &mut params);

    let preceding = window.saturating_sub(1);
    let query = format!(
        r"
        WITH rolled AS (
            SELECT
                date,
                overall_mood,
                max_mood,
                min_mood,
                AVG(overall_mood) OVER w AS rolling_mean,
                STDDEV_SAMP(overall_mood) OVER w AS rolling_deviation,
                COUNT(*) OVER w AS window_len
            FROM days
            WHERE user_id = ?
            WINDOW w AS (ORDER BY date ROWS BETWEEN {preceding} PRECEDING AND CURRENT ROW)
        )
        SELECT
            strftime(date, '%Y-%m-%d'),
            overall_mood,
            max_mood,
            min_mood,
            CASE WHEN window_len >= {window} THEN rolling_mean END,
            CASE WHEN window_len >= {window} THEN rolling_deviation END
        FROM rolled
        WHERE 1=1 {date_conditions}
        ORDER BY date ASC
        "
    );

    let mut values = vec![Value::BigInt(subject.get())];
    values.extend(DateFilter::to_values(&params));

    let mut stmt = conn.prepare(&query)?;
    let rows = stmt.query_map(params_from_iter(values), |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, Option<i64>>(2)?,
            row.get::<_, Option<i64>>(3)?,
            row.get::<_, Option<f64>>(4)?,
            row.get::<_, Option<f64>>(5)?,
        ))
    })?;

    let mut result = Vec::new();
    for row in rows {
        let (date, mood, high, low, rolling_mean, rolling_deviation) = row?;
        result.push(MoodRow {
            date: parse_date(&date)?,
            mood,
            high,
            low,
            rolling_mean,
            rolling_deviation,
        });
    }

    Ok(result)
}

/// Event days falling inside `range`, grouped by event in insertion order
pub fn get_event_rows(
    conn: &Connection,
    subject: SubjectId,
    range: &DateRange,
) -> Result<Vec<EventRow>> {
    let (start, end) = range.to_sql_tuple();
    let mut query = r"
        SELECT e.event_id, e.event_name, e.overall_mood, strftime(d.date, '%Y-%m-%d')
        FROM events e
        JOIN event_days ed ON ed.event_id = e.event_id
        JOIN days d ON d.day_id = ed.day_id
        WHERE e.user_id = ?"
        .to_string();
    let mut params = Vec::new();
    DateFilter::new(Some(&start), Some(&end))
        .on_column("d.date")
        .apply(&mut query, &mut params);
    query.push_str(" ORDER BY e.event_id, d.date");

    let mut values = vec![Value::BigInt(subject.get())];
    values.extend(DateFilter::to_values(&params));

    let mut stmt = conn.prepare(&query)?;
    let rows = stmt.query_map(params_from_iter(values), |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut result = Vec::new();
    for row in rows {
        let (event_id, name, mood, date) = row?;
        result.push(EventRow {
            event_id,
            name,
            mood,
            date: parse_date(&date)?,
        });
    }

    Ok(result)
}
