// src/views/dashboard.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument};

use super::LoadState;
use crate::api::RemoteStore;
use crate::dtos::dashboard::{DashboardStats, Period};

/// One fetch of the profit and loss summary. Each refresh replaces the
/// previous stats wholesale.
pub struct DashboardView {
    store: Arc<dyn RemoteStore>,
    period: Period,
    stats: Option<DashboardStats>,
    state: LoadState,
}

impl DashboardView {
    pub fn new(store: Arc<dyn RemoteStore>, period: Period) -> Self {
        Self { store, period, stats: None, state: LoadState::Loading }
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn set_period(&mut self, period: Period) {
        self.period = period;
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn stats(&self) -> Option<&DashboardStats> {
        self.stats.as_ref()
    }

    // GET /finance/dashboard/?period=
    #[instrument(skip(self), fields(period = %self.period))]
    pub async fn refresh(&mut self) -> LoadState {
        match self.store.dashboard(self.period).await {
            Ok(stats) => {
                debug!(points = stats.chart_data.len(), "Dashboard refreshed");
                self.stats = Some(stats);
                self.state = LoadState::Ready;
            }
            Err(e) => error!(?e, "Failed to fetch dashboard"),
        }
        self.state
    }
}

/// A dashboard that refreshes itself on a fixed interval until stopped or
/// dropped. The refresh loop does not coordinate with inline edits.
pub struct LiveDashboard {
    period_tx: watch::Sender<Period>,
    stats_rx: watch::Receiver<Option<DashboardStats>>,
    handle: Option<JoinHandle<()>>,
}

impl LiveDashboard {
    pub fn spawn(store: Arc<dyn RemoteStore>, period: Period, every: Duration) -> Self {
        let (period_tx, period_rx) = watch::channel(period);
        let (stats_tx, stats_rx) = watch::channel(None);
        let view = DashboardView::new(store, period);

        info!(%period, ?every, "Starting live dashboard");
        let handle = tokio::spawn(run(view, period_rx, stats_tx, every));
        Self { period_tx, stats_rx, handle: Some(handle) }
    }

    pub fn period(&self) -> Period {
        *self.period_tx.borrow()
    }

    /// Switches the period and refreshes right away.
    pub fn set_period(&self, period: Period) {
        self.period_tx.send_replace(period);
    }

    /// Most recent successful fetch.
    pub fn latest(&self) -> Option<DashboardStats> {
        self.stats_rx.borrow().clone()
    }

    /// Receiver that wakes on every successful refresh.
    pub fn subscribe(&self) -> watch::Receiver<Option<DashboardStats>> {
        self.stats_rx.clone()
    }

    /// False once the refresh loop has exited on its own.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the refresh loop and waits for it. A loop that died by
    /// panicking is logged and its error returned.
    pub async fn stop(mut self) -> Result<(), JoinError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        handle.abort();
        match handle.await {
            Err(e) if e.is_panic() => {
                error!(?e, "Dashboard refresh loop panicked");
                Err(e)
            }
            _ => Ok(()),
        }
    }
}

impl Drop for LiveDashboard {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}

async fn run(
    mut view: DashboardView,
    mut period_rx: watch::Receiver<Period>,
    stats_tx: watch::Sender<Option<DashboardStats>>,
    every: Duration,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = period_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                view.set_period(*period_rx.borrow_and_update());
                ticker.reset();
            }
        }

        if view.refresh().await == LoadState::Ready {
            stats_tx.send_replace(view.stats().cloned());
        }
    }
}
