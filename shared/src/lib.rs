//! Types shared between the dashboard client and the static host.
//!
//! - [`models`]: lifecycle enums as the backend puts them on the wire
//! - [`api`]: request/response bodies
//! - [`progress`]: stepper model used to render lifecycle progress
//! - [`routes`]: client-side route table

pub mod api;
pub mod models;
pub mod progress;
pub mod routes;

pub use progress::{Step, StepStatus, Stepper};
pub use routes::Route;
