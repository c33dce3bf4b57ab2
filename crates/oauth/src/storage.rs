use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::types::TokenSet;

/// Name of the token record inside the store directory.
const TOKEN_FILENAME: &str = "tokens.json";

/// File-based storage for the single persisted token record.
///
/// Writes are atomic from a reader's perspective: the record is written
/// to a temp file in the same directory and renamed into place, so a
/// reader sees the prior or the new contents, never a mix.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(TOKEN_FILENAME),
        }
    }

    /// Store backed by a specific file (useful for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the stored record wholesale, creating the directory on
    /// first save.
    pub fn save(&self, tokens: &TokenSet) -> Result<()> {
        let dir = self
            .path
            .parent()
            .context("token store path has no parent directory")?;
        std::fs::create_dir_all(dir)?;

        let data = serde_json::to_string_pretty(tokens)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &data)?;

        // Keep token material out of other users' reach.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
        }

        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// The stored record, or `None` when nothing has been saved yet.
    ///
    /// Absence is the signal to run the authorization flow; a corrupt
    /// file is an error, not absence.
    pub fn load(&self) -> Result<Option<TokenSet>> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let tokens = serde_json::from_str(&data)
            .with_context(|| format!("corrupt token record at {}", self.path.display()))?;
        Ok(Some(tokens))
    }

    /// Remove the stored record. A missing file is not an error.
    pub fn delete(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
