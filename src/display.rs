//! Display utilities for drawing mood charts in the terminal.
//!
//! # Functions
//!
//! - [`truncate`] - Truncate strings to a maximum length with ellipsis
//! - [`make_bar`] - Draw a value as a bar diverging from the axis midpoint
//! - [`print_section`] - Print a section header
//!
//! [`TerminalChart`] implements [`ChartRenderer`] on top of these, as a text
//! table or as JSON.

use std::io::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::chart::{AxisConfig, ChartRenderer};
use crate::error::Result;
use crate::series::{Sequence, SequenceKind, Series};
use crate::window::DateRange;

/// Width of the bar column on each side of the midpoint
const HALF_BAR_WIDTH: usize = 15;

/// Truncate a string to a maximum length, adding "..." if truncated.
///
/// Handles Unicode characters correctly by counting chars rather than bytes.
/// For `max_len < 3`, truncates without ellipsis since there's no room for "...".
///
/// # Examples
///
/// ```
/// use mood_charts::display::truncate;
///
/// assert_eq!(truncate("hello", 10), "hello");
/// assert_eq!(truncate("hello world", 8), "hello...");
/// assert_eq!(truncate("hello", 2), "he");
/// ```
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_len {
        s.to_string()
    } else if max_len < 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{truncated}...")
    }
}

/// Create a bar for `value` on `axis`, growing left of the midpoint for
/// values below it and right for values above.
///
/// The result is always `2 * half_width + 1` characters wide.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn make_bar(value: f64, axis: &AxisConfig, half_width: usize) -> String {
    let mid = (axis.value_min + axis.value_max) / 2.0;
    let half_span = (axis.value_max - axis.value_min) / 2.0;
    let ratio = if half_span > 0.0 {
        ((value - mid) / half_span).clamp(-1.0, 1.0)
    } else {
        0.0
    };
    let filled = ((ratio.abs() * half_width as f64).round() as usize).min(half_width);
    let pad = " ".repeat(half_width - filled);
    let fill = "█".repeat(filled);

    if ratio < 0.0 {
        format!("{pad}{fill}│{}", " ".repeat(half_width))
    } else {
        format!("{}│{fill}{pad}", " ".repeat(half_width))
    }
}

/// Print a section header with equals signs.
pub fn print_section<W: Write>(out: &mut W, title: &str) -> std::io::Result<()> {
    writeln!(out, "\n{}", "=".repeat(50))?;
    writeln!(out, "  {title}")?;
    writeln!(out, "{}", "=".repeat(50))
}

/// Output format for [`TerminalChart`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartFormat {
    #[default]
    Text,
    Json,
}

#[derive(Serialize)]
struct JsonChart<'a> {
    range: &'a DateRange,
    axis: [f64; 2],
    sequences: &'a [Sequence],
}

/// Chart renderer that writes to a terminal (or any writer).
pub struct TerminalChart<W: Write> {
    out: W,
    format: ChartFormat,
    live: bool,
}

impl<W: Write> TerminalChart<W> {
    pub const fn new(out: W, format: ChartFormat) -> Self {
        Self {
            out,
            format,
            live: false,
        }
    }

    /// Whether a chart is currently on screen
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.live
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_text(&mut self, series: &Series, range: &DateRange, axis: &AxisConfig) -> Result<()> {
        print_section(&mut self.out, &format!("Mood {range}"))?;

        if series.is_empty() {
            writeln!(self.out, "  No mood data for this period.")?;
            return Ok(());
        }

        // Primary line: raw mood for the owner, rolling mean otherwise.
        let primary = series
            .first_of(SequenceKind::Mood)
            .or_else(|| series.first_of(SequenceKind::RollingMean));
        let mean = series.first_of(SequenceKind::RollingMean);
        let events: Vec<&Sequence> = series.of_kind(SequenceKind::Event).collect();
        let high = series.first_of(SequenceKind::High);
        let low = series.first_of(SequenceKind::Low);

        let mut dates: Vec<NaiveDate> = series
            .sequences
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.date))
            .collect();
        dates.sort_unstable();
        dates.dedup();

        for date in dates {
            let value = primary.and_then(|s| s.value_on(date));
            let bar = value.map_or_else(
                || " ".repeat(2 * HALF_BAR_WIDTH + 1),
                |v| make_bar(v, axis, HALF_BAR_WIDTH),
            );
            let value_text = value.map_or_else(|| "    ".to_string(), |v| format!("{v:>4.0}"));
            write!(self.out, "  {date} {value_text} {bar}")?;

            if primary.map(|s| s.kind) == Some(SequenceKind::Mood) {
                if let Some(m) = mean.and_then(|s| s.value_on(date)) {
                    write!(self.out, "  avg {m:>5.1}")?;
                }
            }
            if let (Some(h), Some(l)) = (
                high.and_then(|s| s.value_on(date)),
                low.and_then(|s| s.value_on(date)),
            ) {
                write!(self.out, "  range {l:.0}..{h:.0}")?;
            }

            let names: Vec<String> = events
                .iter()
                .filter(|e| e.value_on(date).is_some())
                .map(|e| truncate(&e.label, 20))
                .collect();
            if !names.is_empty() {
                write!(self.out, "  * {}", names.join(", "))?;
            }
            writeln!(self.out)?;
        }

        Ok(())
    }

    fn write_json(&mut self, series: &Series, range: &DateRange, axis: &AxisConfig) -> Result<()> {
        let chart = JsonChart {
            range,
            axis: [axis.value_min, axis.value_max],
            sequences: &series.sequences,
        };
        serde_json::to_writer_pretty(&mut self.out, &chart)?;
        writeln!(self.out)?;
        Ok(())
    }
}

impl<W: Write> ChartRenderer for TerminalChart<W> {
    fn render(&mut self, series: &Series, range: &DateRange, axis: &AxisConfig) -> Result<()> {
        match self.format {
            ChartFormat::Text => self.write_text(series, range, axis)?,
            ChartFormat::Json => self.write_json(series, range, axis)?,
        }
        self.out.flush()?;
        self.live = true;
        Ok(())
    }

    fn destroy(&mut self) {
        self.live = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn range() -> DateRange {
        DateRange::new(d(2024, 3, 1), d(2024, 3, 31)).unwrap()
    }

    fn render_text(series: &Series) -> String {
        let mut chart = TerminalChart::new(Vec::new(), ChartFormat::Text);
        chart.render(series, &range(), &AxisConfig::MOOD).unwrap();
        assert!(chart.is_live());
        String::from_utf8(chart.into_inner()).unwrap()
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
        assert_eq!(truncate("hello", 2), "he");
        assert_eq!(truncate("héllo wörld", 8), "héllo...");
    }

    #[test]
    fn test_make_bar_diverges_from_midpoint() {
        let axis = AxisConfig::MOOD;
        assert_eq!(make_bar(0.0, &axis, 4), "    │    ");
        assert_eq!(make_bar(50.0, &axis, 4), "    │████");
        assert_eq!(make_bar(-25.0, &axis, 4), "  ██│    ");
        // Out-of-axis values are clamped
        assert_eq!(make_bar(-400.0, &axis, 4), "████│    ");
    }

    #[test]
    fn test_empty_series_shows_placeholder() {
        let text = render_text(&Series::new());
        assert!(text.contains("No mood data for this period."));
        assert!(text.contains("2024-03-01"));
    }

    #[test]
    fn test_text_rows_with_mean_and_events() {
        let mut mood = Sequence::new("mood", SequenceKind::Mood);
        mood.push(d(2024, 3, 2), 10.0);
        mood.push(d(2024, 3, 3), -20.0);
        let mut mean = Sequence::new("rolling mean", SequenceKind::RollingMean);
        mean.push(d(2024, 3, 3), -5.0);
        let mut trip = Sequence::new("Trip", SequenceKind::Event);
        trip.push(d(2024, 3, 3), 25.0);

        let mut series = Series::new();
        series.push(mood);
        series.push(mean);
        series.push(trip);

        let text = render_text(&series);
        let rows: Vec<&str> = text.lines().filter(|l| l.starts_with("  2024")).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].contains("  10"));
        assert!(!rows[0].contains("avg"));
        assert!(rows[1].contains("avg  -5.0"));
        assert!(rows[1].contains("* Trip"));
    }

    #[test]
    fn test_json_output() {
        let mut mood = Sequence::new("mood", SequenceKind::Mood);
        mood.push(d(2024, 3, 2), 10.0);
        let mut series = Series::new();
        series.push(mood);

        let mut chart = TerminalChart::new(Vec::new(), ChartFormat::Json);
        chart.render(&series, &range(), &AxisConfig::MOOD).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&chart.into_inner()).unwrap();

        assert_eq!(value["range"]["start"], "2024-03-01");
        assert_eq!(value["axis"][1], 50.0);
        assert_eq!(value["sequences"][0]["kind"], "mood");
        assert_eq!(value["sequences"][0]["points"][0]["value"], 10.0);
    }

    #[test]
    fn test_destroy_clears_live_chart() {
        let mut chart = TerminalChart::new(Vec::new(), ChartFormat::Text);
        chart.render(&Series::new(), &range(), &AxisConfig::MOOD).unwrap();
        chart.destroy();
        assert!(!chart.is_live());
    }
}
