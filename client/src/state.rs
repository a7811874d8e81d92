//! Loading and error flags shared by the views.
//!
//! One [`AppState`] is created at startup and cloned into whatever needs it.
//! Views subscribe to changes instead of polling the flags.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppStatus {
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppState {
    status: Arc<watch::Sender<AppStatus>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            status: Arc::new(watch::Sender::new(AppStatus::default())),
        }
    }

    pub fn set_loading(&self, loading: bool) {
        self.status.send_if_modified(|status| {
            let changed = status.loading != loading;
            status.loading = loading;
            changed
        });
    }

    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.status.send_modify(|status| status.error = Some(message));
    }

    pub fn clear_error(&self) {
        self.status
            .send_if_modified(|status| status.error.take().is_some());
    }

    pub fn snapshot(&self) -> AppStatus {
        self.status.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.status.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.status.borrow().error.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AppStatus> {
        self.status.subscribe()
    }

    /// Runs `fut` with the loading flag raised.
    ///
    /// A previous error is cleared first; a failure is recorded as the new
    /// error. The result is handed back unchanged.
    pub async fn track<T, E, F>(&self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.clear_error();
        self.set_loading(true);
        let result = fut.await;
        if let Err(e) = &result {
            self.set_error(e.to_string());
        }
        self.set_loading(false);
        result
    }
}
