//! Credential persistence.
//!
//! The store holds exactly one value: the current access token. Absence
//! means the user is anonymous. Only the
//! [`AuthSessionManager`](crate::AuthSessionManager) writes to it.
//!
//! Storage failures never reach callers. A [`FileCredentialStore`] that
//! hits an I/O error switches to memory-only mode for the rest of the
//! process, so the user stays signed in until they quit.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

/// The fixed key the token is stored under.
pub const TOKEN_KEY: &str = "access_token";

/// Durable storage for the session token.
///
/// All methods are infallible. Implementations that can fail internally
/// must degrade rather than report.
pub trait CredentialStore: Send + Sync + 'static {
    /// Returns the stored token, if any.
    fn get(&self) -> Option<String>;

    /// Replaces the stored token.
    fn set(&self, token: &str);

    /// Removes the stored token. Removing an absent token is a no-op.
    fn clear(&self);
}

impl<T: CredentialStore + ?Sized> CredentialStore for Arc<T> {
    fn get(&self) -> Option<String> {
        (**self).get()
    }

    fn set(&self, token: &str) {
        (**self).set(token)
    }

    fn clear(&self) {
        (**self).clear()
    }
}

// ---------------------------------------------------------------------------
// MemoryCredentialStore
// ---------------------------------------------------------------------------

/// A store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<String> {
        self.token.lock().clone()
    }

    fn set(&self, token: &str) {
        *self.token.lock() = Some(token.to_owned());
    }

    fn clear(&self) {
        *self.token.lock() = None;
    }
}

// ---------------------------------------------------------------------------
// FileCredentialStore
// ---------------------------------------------------------------------------

/// A store backed by one file named [`TOKEN_KEY`] inside a directory.
///
/// Writes go to a sibling temp file first and are renamed into place, so
/// a crash mid-write leaves either the old token or the new one.
///
/// The in-memory copy is authoritative for reads. It is loaded once at
/// construction and updated on every write.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    state: Mutex<FileState>,
}

#[derive(Debug)]
struct FileState {
    cached: Option<String>,
    degraded: bool,
}

impl FileCredentialStore {
    /// Opens (or prepares) the store under `dir`.
    ///
    /// The directory is created lazily on the first write. A token file
    /// that exists but can't be read puts the store in degraded mode.
    pub fn open(dir: impl AsRef<Path>) -> Self {
        let path = dir.as_ref().join(TOKEN_KEY);
        let mut state = FileState {
            cached: None,
            degraded: false,
        };

        match fs::read_to_string(&path) {
            Ok(contents) => {
                let token = contents.trim();
                if !token.is_empty() {
                    state.cached = Some(token.to_owned());
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => degrade(&mut state, &path, "read", &e),
        }

        Self {
            path,
            state: Mutex::new(state),
        }
    }

    /// Path of the token file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` once an I/O failure has switched the store to
    /// memory-only mode.
    pub fn is_degraded(&self) -> bool {
        self.state.lock().degraded
    }

    fn write(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, token)?;
        fs::rename(&tmp, &self.path)
    }

    fn remove(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<String> {
        self.state.lock().cached.clone()
    }

    fn set(&self, token: &str) {
        let mut state = self.state.lock();
        state.cached = Some(token.to_owned());
        if state.degraded {
            return;
        }
        if let Err(e) = self.write(token) {
            degrade(&mut state, &self.path, "write", &e);
        }
    }

    fn clear(&self) {
        let mut state = self.state.lock();
        state.cached = None;
        if state.degraded {
            return;
        }
        if let Err(e) = self.remove() {
            degrade(&mut state, &self.path, "remove", &e);
        }
    }
}

fn degrade(state: &mut FileState, path: &Path, op: &str, error: &io::Error) {
    if !state.degraded {
        tracing::warn!(
            path = %path.display(),
            op,
            error = %error,
            "credential storage unavailable, keeping token in memory only"
        );
        state.degraded = true;
    }
}
