//! Async event loop for a chart view

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::series::Series;
use crate::types::SubjectId;
use crate::window::{DateRange, WindowType};

use super::{
    ChartRenderer, ChartSession, ChartState, Completion, FetchRequest, NavAction, SeriesGateway,
};

/// Capacity of the fetch completion channel
const FETCH_CHANNEL_CAPACITY: usize = 16;

/// Snapshot published after every state change, for driving the UI controls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChartStatus {
    pub state: ChartState,
    pub window: Option<WindowType>,
    pub range: Option<DateRange>,
    pub can_step_forward: bool,
    pub can_step_backward: bool,
    /// Selectable windows; all-time is missing until the log has an entry
    pub available_windows: Vec<WindowType>,
    pub last_error: Option<String>,
}

impl ChartStatus {
    /// Whether `window` can currently be selected.
    #[must_use]
    pub fn is_available(&self, window: WindowType) -> bool {
        self.available_windows.contains(&window)
    }

    fn of<R: ChartRenderer>(session: &ChartSession<R>) -> Self {
        let controller = session.controller();
        let current = controller.current_change();
        Self {
            state: session.state(),
            window: current.map(|c| c.window),
            range: current.map(|c| c.range),
            can_step_forward: controller.can_step_forward(),
            can_step_backward: controller.can_step_backward(),
            available_windows: controller.available_windows(),
            last_error: session.last_error().map(String::from),
        }
    }
}

/// A finished fetch, sent back to the event loop
struct FetchOutcome {
    request: FetchRequest,
    result: Result<Series>,
}

/// Runs one chart view: actions come in on a channel, fetches run as spawned
/// tasks and their responses are applied in order of issue.
pub struct ChartDriver<G, R> {
    gateway: Arc<G>,
    session: ChartSession<R>,
    subject: Option<SubjectId>,
    fetch_timeout: Option<Duration>,
    status: watch::Sender<ChartStatus>,
}

impl<G, R> ChartDriver<G, R>
where
    G: SeriesGateway + 'static,
    R: ChartRenderer,
{
    /// Create a driver for `session`, fetching from `gateway`.
    pub fn new(gateway: Arc<G>, session: ChartSession<R>) -> Self {
        let (status, _) = watch::channel(ChartStatus::of(&session));
        Self {
            gateway,
            session,
            subject: None,
            fetch_timeout: None,
            status,
        }
    }

    /// Show another subject's log instead of the owner's.
    #[must_use]
    pub fn with_subject(mut self, subject: Option<SubjectId>) -> Self {
        self.subject = subject;
        self
    }

    /// Fail fetches that take longer than `timeout`.
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Session being driven, for navigating before the loop starts.
    pub fn session_mut(&mut self) -> &mut ChartSession<R> {
        &mut self.session
    }

    /// Receive a [`ChartStatus`] after each state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ChartStatus> {
        self.status.subscribe()
    }

    /// Process actions until the channel closes and the last fetch settles,
    /// then hand back the session.
    pub async fn run(mut self, mut actions: mpsc::Receiver<NavAction>) -> Result<ChartSession<R>> {
        info!("Starting chart view...");

        let (done_tx, mut done_rx) = mpsc::channel::<FetchOutcome>(FETCH_CHANNEL_CAPACITY);
        let mut accepting = true;

        loop {
            if !accepting && !self.session.is_loading() {
                break;
            }

            tokio::select! {
                action = actions.recv(), if accepting => match action {
                    Some(action) => self.handle_action(action, &done_tx),
                    None => {
                        debug!("action channel closed, draining in-flight fetch");
                        accepting = false;
                    }
                },
                Some(outcome) = done_rx.recv() => self.handle_outcome(outcome),
                else => break,
            }
        }

        info!(state = ?self.session.state(), "Chart view stopped");
        Ok(self.session)
    }

    fn handle_action(&mut self, action: NavAction, done_tx: &mpsc::Sender<FetchOutcome>) {
        match self.session.dispatch(action) {
            Ok(Some(request)) => self.spawn_fetch(request, done_tx.clone()),
            Ok(None) => debug!(?action, "navigation blocked"),
            Err(e) => warn!(?action, "navigation rejected: {e}"),
        }
        self.publish();
    }

    fn spawn_fetch(&self, request: FetchRequest, done_tx: mpsc::Sender<FetchOutcome>) {
        let gateway = Arc::clone(&self.gateway);
        let subject = self.subject;
        let timeout = self.fetch_timeout;

        tokio::spawn(async move {
            let fetch = request.fetch(gateway.as_ref(), subject);
            let result = match timeout {
                Some(limit) => tokio::time::timeout(limit, fetch)
                    .await
                    .unwrap_or(Err(Error::Timeout(limit))),
                None => fetch.await,
            };

            if done_tx.send(FetchOutcome { request, result }).await.is_err() {
                debug!(seq = request.seq, "chart view gone, dropping response");
            }
        });
    }

    fn handle_outcome(&mut self, outcome: FetchOutcome) {
        match self.session.complete(&outcome.request, outcome.result) {
            Completion::Stale => return,
            Completion::Rendered { .. } | Completion::Failed(_) => {}
        }
        self.publish();
    }

    fn publish(&self) {
        self.status.send_replace(ChartStatus::of(&self.session));
    }
}
