use thiserror::Error;

#[derive(Debug, Error)]
pub enum PollingError {
    #[error("Polling interval must be greater than zero")]
    ZeroInterval,

    #[error("Polling session must be created inside a Tokio runtime")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
