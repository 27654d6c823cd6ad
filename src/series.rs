//! Chart series returned by the data gateway.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// What a sequence represents on the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SequenceKind {
    /// Logged overall mood
    Mood,
    /// Trailing mean of the mood
    RollingMean,
    /// Trailing standard deviation of the mood
    RollingDeviation,
    /// Highest mood of a day
    High,
    /// Lowest mood of a day
    Low,
    /// A logged event spanning one or more days
    Event,
}

/// One value on the date axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// A named sequence of points, ordered by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub label: String,
    pub kind: SequenceKind,
    pub points: Vec<SeriesPoint>,
}

impl Sequence {
    #[must_use]
    pub fn new(label: impl Into<String>, kind: SequenceKind) -> Self {
        Self {
            label: label.into(),
            kind,
            points: Vec::new(),
        }
    }

    /// Append a point. Callers push in date order.
    pub fn push(&mut self, date: NaiveDate, value: f64) {
        self.points.push(SeriesPoint { date, value });
    }

    /// Value on `date`, if any.
    #[must_use]
    pub fn value_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .iter()
            .find(|p| p.date == date)
            .map(|p| p.value)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Label-ordered collection of sequences over the date axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub sequences: Vec<Sequence>,
}

impl Series {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sequences: Vec::new(),
        }
    }

    /// Add a sequence after the existing ones.
    pub fn push(&mut self, sequence: Sequence) {
        self.sequences.push(sequence);
    }

    /// First sequence of the given kind.
    #[must_use]
    pub fn first_of(&self, kind: SequenceKind) -> Option<&Sequence> {
        self.sequences.iter().find(|s| s.kind == kind)
    }

    /// All sequences of the given kind, in order.
    pub fn of_kind(&self, kind: SequenceKind) -> impl Iterator<Item = &Sequence> {
        self.sequences.iter().filter(move |s| s.kind == kind)
    }

    /// True when no sequence carries a point ("no data" placeholder).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequences.iter().all(Sequence::is_empty)
    }
}
