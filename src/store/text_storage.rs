use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use thiserror::Error;

/// How long a `.processing` lock keeps other uploads from re-queueing the text.
const LOCK_FRESHNESS: Duration = Duration::from_secs(10);

const ORIGINAL_FILE: &str = "original.txt";
const TOKENS_FILE: &str = "tokens.txt";
const TOKENS_JSON_FILE: &str = "tokens.json";
const LOCK_FILE: &str = ".processing";

/// Number of leading hash characters that become single-character directories.
const SHARD_DEPTH: usize = 5;

#[derive(Debug, Error)]
pub enum TextStorageError {
    #[error("invalid content hash '{0}'")]
    InvalidHash(String),
    #[error("upload not found: {0}")]
    MissingSource(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// What `place` did with an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Content with this hash was already stored; the upload was left alone.
    Existing,
    /// The upload was moved into a freshly created directory.
    Placed,
}

/// Content-addressed storage for uploaded texts.
///
/// Each text lives in `<root>/<c1>/<c2>/<c3>/<c4>/<c5>/<hash>/`, next to the
/// files the external tokenizer produces for it.
#[derive(Debug, Clone)]
pub struct TextStorage {
    root: PathBuf,
}

impl TextStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn text_dir(&self, hash: &str) -> Result<PathBuf, TextStorageError> {
        validate_hash(hash)?;
        let mut dir = self.root.clone();
        for c in hash.chars().take(SHARD_DEPTH) {
            dir.push(c.to_string());
        }
        dir.push(hash);
        Ok(dir)
    }

    pub fn original_path(&self, hash: &str) -> Result<PathBuf, TextStorageError> {
        Ok(self.text_dir(hash)?.join(ORIGINAL_FILE))
    }

    pub fn tokens_path(&self, hash: &str) -> Result<PathBuf, TextStorageError> {
        Ok(self.text_dir(hash)?.join(TOKENS_FILE))
    }

    pub fn tokens_json_path(&self, hash: &str) -> Result<PathBuf, TextStorageError> {
        Ok(self.text_dir(hash)?.join(TOKENS_JSON_FILE))
    }

    pub fn lock_path(&self, hash: &str) -> Result<PathBuf, TextStorageError> {
        Ok(self.text_dir(hash)?.join(LOCK_FILE))
    }

    pub fn has_content(&self, hash: &str) -> Result<bool, TextStorageError> {
        Ok(self.original_path(hash)?.is_file())
    }

    /// Moves `source` into the directory for `hash`, unless content for that
    /// hash is already stored.
    pub fn place(&self, hash: &str, source: &Path) -> Result<Placement, TextStorageError> {
        if self.has_content(hash)? {
            tracing::debug!(hash, "content already stored");
            return Ok(Placement::Existing);
        }
        if !source.is_file() {
            return Err(TextStorageError::MissingSource(source.to_path_buf()));
        }

        let dir = self.text_dir(hash)?;
        create_private_dir(&dir)?;

        let target = dir.join(ORIGINAL_FILE);
        move_file(source, &target)?;
        set_private_mode(&target)?;

        tracing::debug!(hash, path = %target.display(), "placed new text");
        Ok(Placement::Placed)
    }

    /// True when the tokenizer has not produced output for `hash` yet and no
    /// fresh `.processing` lock says another worker is on it.
    pub fn needs_processing(&self, hash: &str) -> Result<bool, TextStorageError> {
        if self.tokens_path(hash)?.exists() {
            return Ok(false);
        }

        let lock = self.lock_path(hash)?;
        match fs::metadata(&lock) {
            Ok(meta) => {
                let modified = meta.modified()?;
                // A clock skewed into the future counts as fresh.
                let age = SystemTime::now()
                    .duration_since(modified)
                    .unwrap_or_default();
                Ok(age >= LOCK_FRESHNESS)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
            Err(e) => Err(TextStorageError::Io(e)),
        }
    }
}

fn validate_hash(hash: &str) -> Result<(), TextStorageError> {
    let valid = hash.len() >= SHARD_DEPTH
        && hash
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase());
    if valid {
        Ok(())
    } else {
        Err(TextStorageError::InvalidHash(hash.to_string()))
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new()
        .recursive(true)
        .mode(0o770)
        .create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn set_private_mode(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o770))
}

#[cfg(not(unix))]
fn set_private_mode(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Renames, falling back to copy + remove when the upload directory is on a
/// different filesystem.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            tracing::debug!(error = %rename_err, "rename failed, copying instead");
            fs::copy(from, to)?;
            if let Err(e) = fs::remove_file(from) {
                tracing::warn!(path = %from.display(), error = %e, "failed to remove upload after copy");
            }
            Ok(())
        }
    }
}
