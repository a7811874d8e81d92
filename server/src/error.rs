use std::path::PathBuf;
use thiserror::Error;

/// Conditions that keep the server from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Build directory not found: {}", .0.display())]
    BuildDirMissing(PathBuf),

    #[error("Entry document not found: {}", .0.display())]
    EntryDocumentMissing(PathBuf),
}
