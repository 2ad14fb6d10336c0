//! JSON token file.

use crate::error::AuthError;
use mailsend_oauth::Token;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Reads and writes the persisted [`Token`].
///
/// No locking is applied; the last writer wins.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Creates a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the token file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the token.
    ///
    /// A missing file yields `None`, as does a file that is not a valid
    /// token (logged).
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(&self) -> Result<Option<Token>, AuthError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no stored token");
                return Ok(None);
            }
            Err(source) => {
                return Err(AuthError::Store {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        match serde_json::from_str(&contents) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                warn!(path = %self.path.display(), "ignoring unreadable token file: {e}");
                Ok(None)
            }
        }
    }

    /// Writes the token, overwriting any previous one and creating parent
    /// directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, token: &Token) -> Result<(), AuthError> {
        let json = serde_json::to_string_pretty(token)?;
        let store_err = |source| AuthError::Store {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(store_err)?;
        }
        write_private(&self.path, json.as_bytes()).map_err(store_err)?;

        info!(path = %self.path.display(), "saved token");
        Ok(())
    }
}

/// Writes `contents`, creating the file readable by the owner only.
///
/// An existing file keeps its mode from creation, so it is tightened too.
#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    std::fs::write(path, contents)
}
