//! Chart view state machine
//!
//! A [`ChartSession`] ties one [`NavigationController`] to one renderer.
//! Every accepted navigation action issues a sequence-numbered
//! [`FetchRequest`]; only the response carrying the latest sequence number is
//! rendered, so overlapping fetches can never show an older window's data.

mod driver;

pub use driver::{ChartDriver, ChartStatus};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::navigation::{NavigationController, RangeChange};
use crate::series::Series;
use crate::types::{SubjectId, MOOD_MAX, MOOD_MIN};
use crate::window::{DateRange, WindowType};

/// Source of chart data.
#[async_trait]
pub trait SeriesGateway: Send + Sync {
    /// Series for `range`. `subject` selects another person's (smoothed) log;
    /// `None` means the owner's full log.
    async fn fetch_series(&self, range: DateRange, subject: Option<SubjectId>) -> Result<Series>;

    /// Detail series for the three-day window around `day`. As with
    /// [`fetch_series`](Self::fetch_series), a `subject` only sees smoothed
    /// sequences.
    async fn fetch_day_detail(&self, day: NaiveDate, subject: Option<SubjectId>) -> Result<Series>;
}

/// Draws a chart onto an externally owned surface.
pub trait ChartRenderer {
    /// Draw `series` over `range`.
    fn render(&mut self, series: &Series, range: &DateRange, axis: &AxisConfig) -> Result<()>;

    /// Release the chart currently bound to the surface.
    fn destroy(&mut self);
}

/// Fixed value-axis bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisConfig {
    pub value_min: f64,
    pub value_max: f64,
}

impl AxisConfig {
    /// The mood scale, regardless of the data shown.
    #[allow(clippy::cast_precision_loss)]
    pub const MOOD: Self = Self {
        value_min: MOOD_MIN as f64,
        value_max: MOOD_MAX as f64,
    };
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self::MOOD
    }
}

/// Lifecycle of a chart view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartState {
    /// Before the first window selection
    #[default]
    Idle,
    /// A fetch is in flight
    Loading,
    /// The latest range is rendered
    Ready,
    /// The latest fetch failed; the previous chart stays on screen
    Error,
}

/// User actions that move the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    SetWindow(WindowType),
    ShowDay(NaiveDate),
    StepForward,
    StepBackward,
    /// Re-issue the fetch for the current range
    Refresh,
}

/// A fetch issued for a range change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub seq: u64,
    pub change: RangeChange,
}

impl FetchRequest {
    /// Run the request against `gateway`.
    pub async fn fetch<G>(&self, gateway: &G, subject: Option<SubjectId>) -> Result<Series>
    where
        G: SeriesGateway + ?Sized,
    {
        match self.change.window {
            WindowType::Day => {
                let day = self
                    .change
                    .range
                    .start
                    .succ_opt()
                    .unwrap_or(self.change.range.start);
                gateway.fetch_day_detail(day, subject).await
            }
            _ => gateway.fetch_series(self.change.range, subject).await,
        }
    }
}

/// Result of handing a fetch response to the session.
#[derive(Debug)]
pub enum Completion {
    /// The response was drawn; `empty` means the "no data" placeholder
    Rendered { empty: bool },
    /// Superseded by a newer request and discarded
    Stale,
    /// The fetch failed; the last good chart is kept
    Failed(Error),
}

/// One chart view: navigation, fetch sequencing and the rendered chart.
#[derive(Debug)]
pub struct ChartSession<R> {
    controller: NavigationController,
    renderer: R,
    axis: AxisConfig,
    state: ChartState,
    latest_seq: u64,
    chart_live: bool,
    rendered: Option<RangeChange>,
    last_error: Option<String>,
}

impl<R: ChartRenderer> ChartSession<R> {
    /// Create an idle session.
    pub fn new(controller: NavigationController, renderer: R) -> Self {
        Self {
            controller,
            renderer,
            axis: AxisConfig::MOOD,
            state: ChartState::Idle,
            latest_seq: 0,
            chart_live: false,
            rendered: None,
            last_error: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> ChartState {
        self.state
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self.state, ChartState::Loading)
    }

    #[must_use]
    pub const fn controller(&self) -> &NavigationController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut NavigationController {
        &mut self.controller
    }

    #[must_use]
    pub const fn renderer(&self) -> &R {
        &self.renderer
    }

    /// The range of the chart on screen, which may lag behind the controller
    /// while loading or after an error.
    #[must_use]
    pub const fn rendered(&self) -> Option<RangeChange> {
        self.rendered
    }

    /// Message of the most recent failed fetch, cleared on success.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Apply a navigation action.
    ///
    /// Returns the fetch to issue, or `None` when the action was a no-op
    /// (forward step at the latest period). Errors leave the state unchanged.
    pub fn dispatch(&mut self, action: NavAction) -> Result<Option<FetchRequest>> {
        let change = match action {
            NavAction::SetWindow(window) => Some(self.controller.set_window(window)?),
            NavAction::ShowDay(day) => Some(self.controller.show_day(day)?),
            NavAction::StepForward => self.controller.step_forward()?,
            NavAction::StepBackward => Some(self.controller.step_backward()?),
            NavAction::Refresh => Some(self.controller.refresh()?),
        };

        Ok(change.map(|change| self.issue(change)))
    }

    fn issue(&mut self, change: RangeChange) -> FetchRequest {
        self.latest_seq += 1;
        self.state = ChartState::Loading;
        debug!(
            seq = self.latest_seq,
            window = %change.window,
            range = %change.range,
            "fetch issued"
        );
        FetchRequest {
            seq: self.latest_seq,
            change,
        }
    }

    /// Hand a fetch response to the session.
    ///
    /// Responses for anything but the latest request are discarded. A failed
    /// fetch keeps the last rendered chart on screen. A failed *render* does
    /// not: the previous chart is already destroyed by then, so the surface
    /// is left empty and [`rendered`](Self::rendered) is cleared.
    pub fn complete(&mut self, request: &FetchRequest, result: Result<Series>) -> Completion {
        if request.seq != self.latest_seq || !self.is_loading() {
            debug!(
                seq = request.seq,
                latest = self.latest_seq,
                "stale response discarded"
            );
            return Completion::Stale;
        }

        let series = match result {
            Ok(series) => series,
            Err(e) if e.is_empty_result() => Series::new(),
            Err(e) => {
                warn!(seq = request.seq, range = %request.change.range, "fetch failed: {e}");
                self.state = ChartState::Error;
                self.last_error = Some(e.to_string());
                return Completion::Failed(e);
            }
        };

        if self.chart_live {
            self.renderer.destroy();
            self.chart_live = false;
        }

        if let Err(e) = self
            .renderer
            .render(&series, &request.change.range, &self.axis)
        {
            warn!(seq = request.seq, "render failed: {e}");
            self.state = ChartState::Error;
            self.rendered = None;
            self.last_error = Some(e.to_string());
            return Completion::Failed(e);
        }

        let empty = series.is_empty();
        info!(
            window = %request.change.window,
            range = %request.change.range,
            empty,
            "chart rendered"
        );
        self.chart_live = true;
        self.rendered = Some(request.change);
        self.last_error = None;
        self.state = ChartState::Ready;
        Completion::Rendered { empty }
    }

    /// Release the renderer's chart when the view is torn down.
    pub fn teardown(&mut self) {
        if self.chart_live {
            self.renderer.destroy();
            self.chart_live = false;
        }
    }
}
