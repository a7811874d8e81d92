use axum::{routing::get, Router};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::error::StartupError;
use crate::health::{health_check, HealthState};

pub const ENTRY_DOCUMENT: &str = "index.html";

/// Checks that the build output exists and holds the entry document.
/// Returns the entry document's path.
pub fn verify_build_output(dist_dir: &Path) -> Result<PathBuf, StartupError> {
    if !dist_dir.is_dir() {
        return Err(StartupError::BuildDirMissing(dist_dir.to_path_buf()));
    }

    let index = dist_dir.join(ENTRY_DOCUMENT);
    if !index.is_file() {
        return Err(StartupError::EntryDocumentMissing(index));
    }

    Ok(index)
}

/// `/health` plus every file under `dist_dir`. Paths with no matching file
/// get the entry document with a 200 so client-side routes resolve.
/// `/health` reports uptime relative to `started`.
pub fn build_router(dist_dir: &Path, index: &Path, started: Instant) -> Router {
    let static_files = ServeDir::new(dist_dir).fallback(ServeFile::new(index));

    Router::new()
        .route("/health", get(health_check))
        .with_state(HealthState::new(started))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
}
