//! Periodic content refresh.
//!
//! The loop is driven by a [`Ticker`] so tests can fire refreshes by hand
//! instead of waiting on a wall clock. Production uses [`IntervalTicker`].
//! The first tick comes one full period after start; the initial load is
//! the caller's job.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::assistant::Assistant;

/// A source of refresh signals. `tick` returns `false` once no more ticks
/// will come, which ends the loop.
#[async_trait]
pub trait Ticker: Send {
    async fn tick(&mut self) -> bool;
}

pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Ticks whenever the paired sender sends; ends when every sender is dropped.
pub struct ChannelTicker {
    rx: mpsc::Receiver<()>,
}

/// A manual ticker and the handle that fires it.
pub fn channel() -> (mpsc::Sender<()>, ChannelTicker) {
    let (tx, rx) = mpsc::channel(8);
    (tx, ChannelTicker { rx })
}

#[async_trait]
impl Ticker for ChannelTicker {
    async fn tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

/// Refresh on every tick until the ticker ends. Returns how many refreshes
/// succeeded. Each tick also drops idle sessions.
pub async fn run_refresh_loop<T: Ticker>(assistant: Arc<Assistant>, mut ticker: T) -> usize {
    let mut succeeded = 0;
    while ticker.tick().await {
        assistant.sweep_idle_sessions();
        if assistant.refresh().await {
            succeeded += 1;
            info!(documents = assistant.document_count(), "scheduled refresh done");
        } else {
            warn!("scheduled refresh failed; will retry on next tick");
        }
    }
    succeeded
}

/// Start the daily (or configured) refresh in the background.
pub fn spawn_refresh_loop(assistant: Arc<Assistant>, period: Duration) -> JoinHandle<usize> {
    info!(period_secs = period.as_secs(), "refresh scheduler started");
    tokio::spawn(run_refresh_loop(assistant, IntervalTicker::new(period)))
}
