//! Chart window navigation.
//!
//! [`NavigationController`] owns the visible window of one chart view. It
//! replaces the state and returns a [`RangeChange`] whenever the window moves;
//! the caller forwards that change to the data gateway and renderer.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::window::{shift_months, DateRange, WindowResolver, WindowType};

/// Current window of a chart view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavigationState {
    pub window: WindowType,
    pub range: DateRange,
    /// First logged entry, if known
    pub earliest_record: Option<NaiveDate>,
}

/// Payload emitted whenever the visible range changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RangeChange {
    pub window: WindowType,
    pub range: DateRange,
}

impl From<&NavigationState> for RangeChange {
    fn from(state: &NavigationState) -> Self {
        Self {
            window: state.window,
            range: state.range,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

impl Direction {
    const fn sign(self) -> i32 {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }
}

/// Owns and mutates the navigation state of a single chart.
#[derive(Debug, Clone)]
pub struct NavigationController {
    resolver: WindowResolver,
    state: Option<NavigationState>,
    earliest_record: Option<NaiveDate>,
}

impl NavigationController {
    /// Create a controller with no window selected.
    #[must_use]
    pub const fn new(resolver: WindowResolver) -> Self {
        Self {
            resolver,
            state: None,
            earliest_record: None,
        }
    }

    /// Set the first logged date used by the all-time window.
    #[must_use]
    pub fn with_earliest_record(mut self, earliest: Option<NaiveDate>) -> Self {
        self.earliest_record = earliest;
        self
    }

    /// Update the first logged date (e.g. after the first entry is written).
    pub fn set_earliest_record(&mut self, earliest: Option<NaiveDate>) {
        self.earliest_record = earliest;
        if let Some(state) = self.state.as_mut() {
            state.earliest_record = earliest;
        }
    }

    /// Current state, or `None` before the first [`Self::set_window`].
    #[must_use]
    pub const fn state(&self) -> Option<&NavigationState> {
        self.state.as_ref()
    }

    /// The resolver used for window boundaries.
    #[must_use]
    pub const fn resolver(&self) -> &WindowResolver {
        &self.resolver
    }

    /// Window types the selector may offer.
    ///
    /// All-time is unavailable until an earliest record date is known.
    #[must_use]
    pub fn available_windows(&self) -> Vec<WindowType> {
        WindowType::all()
            .iter()
            .copied()
            .filter(|w| *w != WindowType::AllTime || self.earliest_record.is_some())
            .collect()
    }

    /// Show the period of `window` containing today.
    ///
    /// On error the current state is left untouched.
    pub fn set_window(&mut self, window: WindowType) -> Result<RangeChange> {
        let today = self.resolver.today();
        self.select(window, today)
    }

    /// Like [`Self::set_window`], taking the selector's string value.
    pub fn set_window_named(&mut self, name: &str) -> Result<RangeChange> {
        self.set_window(name.parse()?)
    }

    /// Show the single-day detail window centred on `day`.
    pub fn show_day(&mut self, day: NaiveDate) -> Result<RangeChange> {
        self.select(WindowType::Day, day)
    }

    /// The range currently shown, for re-issuing a fetch.
    #[must_use]
    pub fn current_change(&self) -> Option<RangeChange> {
        self.state.as_ref().map(RangeChange::from)
    }

    /// Re-issue the current range unchanged, for retrying a failed fetch.
    pub fn refresh(&self) -> Result<RangeChange> {
        self.current_change().ok_or(Error::NoActiveWindow)
    }

    /// Move one period forward.
    ///
    /// Returns `Ok(None)` once the visible window already reaches the period
    /// containing today.
    pub fn step_forward(&mut self) -> Result<Option<RangeChange>> {
        let state = self.steppable_state()?;
        let max = self.resolver.absolute_max_range(state.window)?;
        if state.range.end >= max.end {
            debug!(
                window = %state.window,
                end = %state.range.end,
                max_end = %max.end,
                "forward step blocked at latest period"
            );
            return Ok(None);
        }
        let range = self.stepped_range(&state, Direction::Forward)?;
        Ok(Some(self.replace_range(state, range)))
    }

    /// Move one period backward. There is no lower bound.
    pub fn step_backward(&mut self) -> Result<RangeChange> {
        let state = self.steppable_state()?;
        let range = self.stepped_range(&state, Direction::Backward)?;
        Ok(self.replace_range(state, range))
    }

    /// Whether the forward button should be enabled.
    #[must_use]
    pub fn can_step_forward(&self) -> bool {
        self.steppable_state().is_ok_and(|state| {
            self.resolver
                .absolute_max_range(state.window)
                .is_ok_and(|max| state.range.end < max.end)
        })
    }

    /// Whether the backward button should be enabled.
    #[must_use]
    pub fn can_step_backward(&self) -> bool {
        self.steppable_state().is_ok()
    }

    fn select(&mut self, window: WindowType, pivot: NaiveDate) -> Result<RangeChange> {
        let range = self.resolver.resolve(window, pivot, self.earliest_record)?;
        let state = NavigationState {
            window,
            range,
            earliest_record: self.earliest_record,
        };
        debug!(%window, %range, "window selected");
        self.state = Some(state);
        Ok(RangeChange::from(&state))
    }

    fn steppable_state(&self) -> Result<NavigationState> {
        let state = self.state.ok_or(Error::NoActiveWindow)?;
        if state.window.is_steppable() {
            Ok(state)
        } else {
            Err(Error::NotSteppable(state.window))
        }
    }

    /// Shift the period's pivot and re-resolve, so the result is always a
    /// whole calendar period.
    fn stepped_range(&self, state: &NavigationState, direction: Direction) -> Result<DateRange> {
        let months = state
            .window
            .step_months()
            .ok_or(Error::NotSteppable(state.window))?;
        let pivot = shift_months(state.range.start, months * direction.sign())?;
        self.resolver.resolve(state.window, pivot, state.earliest_record)
    }

    fn replace_range(&mut self, state: NavigationState, range: DateRange) -> RangeChange {
        debug!(window = %state.window, from = %state.range, to = %range, "window stepped");
        let next = NavigationState { range, ..state };
        self.state = Some(next);
        RangeChange::from(&next)
    }
}
