//! Persisted bearer token.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Where the client reads its bearer token from.
///
/// A missing or blank token means requests go out unauthenticated.
pub trait TokenStore: Send + Sync {
    fn token(&self) -> io::Result<Option<String>>;
    fn set_token(&self, token: &str) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

/// Token kept in a single file on disk.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn token(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(normalize(&contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set_token(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token.trim())
    }

    fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// Token held in memory, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(normalize(&token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> io::Result<Option<String>> {
        let token = self.token.read().unwrap_or_else(|e| e.into_inner());
        Ok(token.clone())
    }

    fn set_token(&self, token: &str) -> io::Result<()> {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = normalize(token);
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

fn normalize(raw: &str) -> Option<String> {
    let token = raw.trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested").join("token"));

        assert_eq!(store.token().unwrap(), None);

        store.set_token("abc123\n").unwrap();
        assert_eq!(store.token().unwrap(), Some("abc123".to_string()));

        store.clear().unwrap();
        assert_eq!(store.token().unwrap(), None);
        store.clear().unwrap();
    }

    #[test]
    fn test_blank_file_means_no_token() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("token");
        fs::write(&path, "   \n").unwrap();

        let store = FileTokenStore::new(&path);
        assert_eq!(store.token().unwrap(), None);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryTokenStore::with_token("secret");
        assert_eq!(store.token().unwrap(), Some("secret".to_string()));

        store.set_token("").unwrap();
        assert_eq!(store.token().unwrap(), None);

        store.set_token("next").unwrap();
        store.clear().unwrap();
        assert_eq!(store.token().unwrap(), None);
    }
}
