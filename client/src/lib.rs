//! Dashboard client: talks to the settlement API on behalf of the views.
//!
//! [`ApiClient`] attaches the stored bearer token, unwraps response bodies
//! and normalizes errors. [`AppState`] carries the loading/error flags the
//! views bind to, and is passed explicitly to whoever needs it.

pub mod api;
pub mod config;
pub mod error;
pub mod state;
pub mod token;

pub use api::{ApiClient, ApiClientBuilder, ExportedFile};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use state::{AppState, AppStatus};
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore};
