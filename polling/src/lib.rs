//! Fixed-cadence polling for dashboard views.
//!
//! A [`PollingSession`] calls an async operation every `interval` until it is
//! stopped or dropped. Firings follow the wall clock and never wait for the
//! previous call to finish, and a failing call is logged without ending the
//! session.

mod error;
mod session;

pub use error::PollingError;
pub use session::{PollFuture, PollingSession, DEFAULT_INTERVAL};
