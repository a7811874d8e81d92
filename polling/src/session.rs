use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::error::PollingError;

/// Interval used when the caller does not pick one.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(10_000);

pub type PollFuture = BoxFuture<'static, anyhow::Result<()>>;

type Callback = Arc<dyn Fn() -> PollFuture + Send + Sync>;

/// Calls an async operation on a fixed cadence until stopped.
///
/// The session is inert until [`start`](Self::start). Each firing runs the
/// callback on its own task, so a callback slower than the interval overlaps
/// with the next firing instead of delaying it. `last_update` moves only
/// when a call succeeds; errors are logged and polling carries on.
///
/// Whoever owns the session owns its timer: dropping the session stops it.
pub struct PollingSession {
    label: String,
    callback: Callback,
    interval: Duration,
    runtime: Handle,
    is_polling: watch::Sender<bool>,
    last_update: Arc<watch::Sender<Option<DateTime<Utc>>>>,
    timer: Option<JoinHandle<()>>,
}

impl PollingSession {
    /// Creates an inert session on the current Tokio runtime.
    pub fn new<F, Fut, E>(callback: F, interval: Duration) -> Result<Self, PollingError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<anyhow::Error> + 'static,
    {
        if interval.is_zero() {
            return Err(PollingError::ZeroInterval);
        }

        let runtime = Handle::try_current()?;
        let callback: Callback = Arc::new(move || {
            let call = callback();
            async move { call.await.map_err(Into::into) }.boxed()
        });

        Ok(Self {
            label: "polling".to_string(),
            callback,
            interval,
            runtime,
            is_polling: watch::Sender::new(false),
            last_update: Arc::new(watch::Sender::new(None)),
            timer: None,
        })
    }

    pub fn with_default_interval<F, Fut, E>(callback: F) -> Result<Self, PollingError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<anyhow::Error> + 'static,
    {
        Self::new(callback, DEFAULT_INTERVAL)
    }

    /// Name used in log lines.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Starts firing every `interval`, first firing one interval from now.
    /// Does nothing if the session is already active.
    pub fn start(&mut self) {
        if self.is_polling() {
            return;
        }
        self.is_polling.send_replace(true);

        let _guard = self.runtime.enter();
        let period = self.interval;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        // A stalled runtime drops missed firings instead of replaying them.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let callback = Arc::clone(&self.callback);
        let last_update = Arc::clone(&self.last_update);
        let label = self.label.clone();

        tracing::debug!(session = %label, "Polling started (interval: {:?})", period);

        self.timer = Some(self.runtime.spawn(async move {
            loop {
                ticker.tick().await;
                tracing::trace!(session = %label, "Polling tick");
                tokio::spawn(invoke(
                    label.clone(),
                    Arc::clone(&callback),
                    Arc::clone(&last_update),
                ));
            }
        }));
    }

    /// Cancels the timer and marks the session inert. Calls already in
    /// flight run to completion. Safe to call on an inert session.
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            tracing::debug!(session = %self.label, "Polling stopped");
        }
        self.is_polling.send_replace(false);
    }

    /// Stops and starts again; the next firing is one interval from now.
    pub fn restart(&mut self) {
        self.stop();
        self.start();
    }

    pub fn is_polling(&self) -> bool {
        *self.is_polling.borrow()
    }

    /// Completion time of the most recent successful call.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        *self.last_update.borrow()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Receiver that observes start/stop transitions.
    pub fn watch_polling(&self) -> watch::Receiver<bool> {
        self.is_polling.subscribe()
    }

    /// Receiver that observes every successful call.
    pub fn watch_last_update(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.last_update.subscribe()
    }
}

impl Drop for PollingSession {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for PollingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingSession")
            .field("label", &self.label)
            .field("interval", &self.interval)
            .field("is_polling", &self.is_polling())
            .field("last_update", &self.last_update())
            .finish_non_exhaustive()
    }
}

async fn invoke(
    label: String,
    callback: Callback,
    last_update: Arc<watch::Sender<Option<DateTime<Utc>>>>,
) {
    match callback().await {
        Ok(()) => {
            last_update.send_replace(Some(Utc::now()));
        }
        Err(e) => {
            // Continue polling even on error
            tracing::error!(session = %label, "Polling error: {:?}", e);
        }
    }
}
