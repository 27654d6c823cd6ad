//! # Mood Charts
//!
//! Mood-log charting with calendar-aligned time windows.
//!
//! This crate provides:
//! - Window resolution: month, quarter, bi-annual, year, day and all-time
//!   ranges around a pivot date
//! - Forward/backward navigation through steppable windows, bounded by today
//! - A chart session that sequences fetches and discards stale responses
//! - A local DuckDB mood log serving raw mood, rolling statistics and events
//! - Terminal and JSON chart rendering

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod chart;
pub mod config;
pub mod db;
pub mod display;
pub mod error;
pub mod navigation;
pub mod series;
pub mod types;
pub mod window;

pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use navigation::NavigationController;
pub use window::{DateRange, WindowResolver, WindowType};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "mood-charts";
