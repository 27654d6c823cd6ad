//! Database schema initialization

use duckdb::Connection;

use crate::error::Result;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        CREATE SEQUENCE IF NOT EXISTS day_ids START 1;
        CREATE SEQUENCE IF NOT EXISTS event_ids START 1;

        -- One mood log entry per subject and calendar day
        CREATE TABLE IF NOT EXISTS days (
            day_id BIGINT PRIMARY KEY DEFAULT nextval('day_ids'),
            user_id BIGINT NOT NULL,
            date DATE NOT NULL,
            overall_mood BIGINT NOT NULL,
            max_mood BIGINT,
            min_mood BIGINT,
            notes TEXT,
            UNIQUE (user_id, date)
        );

        -- Events are plotted as markers over the days they span
        CREATE TABLE IF NOT EXISTS events (
            event_id BIGINT PRIMARY KEY DEFAULT nextval('event_ids'),
            user_id BIGINT NOT NULL,
            event_name TEXT NOT NULL,
            overall_mood BIGINT NOT NULL,
            notes TEXT
        );

        CREATE TABLE IF NOT EXISTS event_days (
            event_id BIGINT NOT NULL,
            day_id BIGINT NOT NULL,
            PRIMARY KEY (event_id, day_id)
        );
        ",
    )?;

    Ok(())
}
