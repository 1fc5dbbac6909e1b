//! Chat history persistence
//!
//! History lives under two keys: the JSON-serialized session collection and
//! the active session id. The full collection is rewritten on every save.

use crate::error::{ParleyError, Result};
use crate::session::ChatSession;
use directories::ProjectDirs;
use sled::Db;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub mod types;
pub use types::PersistedHistory;

/// Key holding the serialized session collection
pub const SESSIONS_KEY: &str = "chatHistories";

/// Key holding the active session id
pub const ACTIVE_ID_KEY: &str = "currentChatId";

/// Durable key-value storage for chat history
pub trait HistoryBackend: Send {
    /// Reads the stored history
    ///
    /// Missing or malformed session data decodes as an empty collection;
    /// only backend failures are errors.
    fn load(&self) -> Result<PersistedHistory>;

    /// Replaces the stored history
    ///
    /// A `None` active id removes the stored id.
    fn save(&self, sessions: &[ChatSession], active_id: Option<&str>) -> Result<()>;

    /// Makes previous saves durable
    ///
    /// Saves may be buffered until this is called.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Decodes a stored session blob, falling back to an empty collection
pub fn decode_sessions(bytes: &[u8]) -> Vec<ChatSession> {
    match serde_json::from_slice(bytes) {
        Ok(sessions) => sessions,
        Err(e) => {
            tracing::warn!("Ignoring malformed chat history: {}", e);
            Vec::new()
        }
    }
}

fn decode_active_id(bytes: &[u8]) -> Option<String> {
    let id = String::from_utf8_lossy(bytes).trim().to_string();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

fn encode_sessions(sessions: &[ChatSession]) -> Result<Vec<u8>> {
    serde_json::to_vec(sessions)
        .map_err(|e| ParleyError::Storage(format!("Serialization failed: {}", e)).into())
}

/// Attempts made to acquire the database lock before giving up
const OPEN_ATTEMPTS: u32 = 8;

/// Delay before the first retry; doubled after each failed attempt
const OPEN_BACKOFF: Duration = Duration::from_millis(25);

/// History stored in an embedded `sled` database
///
/// Clones share the same open database.
#[derive(Clone)]
pub struct SledHistory {
    db: Db,
    path: PathBuf,
}

impl SledHistory {
    /// Opens (or creates) the database in the user's data directory
    ///
    /// `PARLEY_HISTORY_DB` overrides the location.
    ///
    /// # Errors
    ///
    /// Returns `ParleyError::Storage` if the data directory cannot be
    /// determined or the database cannot be opened.
    pub fn open_default() -> Result<Self> {
        if let Ok(override_path) = std::env::var("PARLEY_HISTORY_DB") {
            return Self::open(override_path);
        }
        Self::open(default_history_path()?)
    }

    /// Opens (or creates) the database at `path`
    ///
    /// # Examples
    ///
    /// ```
    /// use parley::storage::{HistoryBackend, SledHistory};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let history = SledHistory::open(dir.path().join("history")).unwrap();
    /// assert!(history.load().unwrap().sessions.is_empty());
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ParleyError::Storage(format!("Failed to create data directory: {}", e))
            })?;
        }

        let db = open_with_retry(&path)
            .map_err(|e| ParleyError::Storage(format!("Failed to open database: {}", e)))?;

        tracing::debug!("Opened chat history at {}", path.display());
        Ok(Self { db, path })
    }

    /// Location of the database directory
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Opens the database, retrying while another handle still holds its lock
///
/// A just-dropped handle releases the lock only once sled's flusher thread
/// exits, and two processes may start at the same moment.
fn open_with_retry(path: &Path) -> sled::Result<Db> {
    let mut delay = OPEN_BACKOFF;
    let mut attempt = 1;
    loop {
        match sled::open(path) {
            Err(e) if attempt < OPEN_ATTEMPTS && is_lock_contention(&e) => {
                tracing::debug!(attempt, "History database is locked, retrying: {}", e);
                std::thread::sleep(delay);
                delay *= 2;
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// sled reports a held lock as an `Other` I/O error with a fixed message
fn is_lock_contention(error: &sled::Error) -> bool {
    match error {
        sled::Error::Io(io) => {
            io.kind() == std::io::ErrorKind::WouldBlock
                || io.to_string().contains("could not acquire lock")
        }
        _ => false,
    }
}

/// Default history location under the platform data directory
pub fn default_history_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "parley", "parley")
        .ok_or_else(|| ParleyError::Storage("Could not determine data directory".into()))?;
    Ok(proj_dirs.data_dir().join("history"))
}

impl HistoryBackend for SledHistory {
    fn load(&self) -> Result<PersistedHistory> {
        let sessions = self
            .db
            .get(SESSIONS_KEY)
            .map_err(|e| ParleyError::Storage(format!("Get failed: {}", e)))?
            .map(|bytes| decode_sessions(&bytes))
            .unwrap_or_default();

        let active_id = self
            .db
            .get(ACTIVE_ID_KEY)
            .map_err(|e| ParleyError::Storage(format!("Get failed: {}", e)))?
            .and_then(|bytes| decode_active_id(&bytes));

        Ok(PersistedHistory {
            sessions,
            active_id,
        })
    }

    fn save(&self, sessions: &[ChatSession], active_id: Option<&str>) -> Result<()> {
        let value = encode_sessions(sessions)?;
        self.db
            .insert(SESSIONS_KEY, value)
            .map_err(|e| ParleyError::Storage(format!("Insert failed: {}", e)))?;

        match active_id {
            Some(id) => self
                .db
                .insert(ACTIVE_ID_KEY, id.as_bytes())
                .map(|_| ()),
            None => self.db.remove(ACTIVE_ID_KEY).map(|_| ()),
        }
        .map_err(|e| ParleyError::Storage(format!("Insert failed: {}", e)))?;

        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| ParleyError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    sessions: Option<Vec<u8>>,
    active_id: Option<String>,
    saves: usize,
    flushes: usize,
}

/// In-memory history, used for ephemeral runs and tests
///
/// Clones share the same underlying storage. Sessions are kept in their
/// serialized form so loads go through the same decoding path as on disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryHistory {
    /// Creates an empty in-memory history
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a history whose session key holds `raw` bytes verbatim
    pub fn with_raw_sessions(raw: impl Into<Vec<u8>>) -> Self {
        let history = Self::default();
        if let Ok(mut inner) = history.inner.lock() {
            inner.sessions = Some(raw.into());
        }
        history
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.saves).unwrap_or(0)
    }

    /// Number of flushes so far
    pub fn flush_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.flushes).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|_| ParleyError::Storage("History lock poisoned".into()).into())
    }
}

impl HistoryBackend for MemoryHistory {
    fn load(&self) -> Result<PersistedHistory> {
        let inner = self.lock()?;
        Ok(PersistedHistory {
            sessions: inner
                .sessions
                .as_deref()
                .map(decode_sessions)
                .unwrap_or_default(),
            active_id: inner.active_id.clone(),
        })
    }

    fn save(&self, sessions: &[ChatSession], active_id: Option<&str>) -> Result<()> {
        let value = encode_sessions(sessions)?;
        let mut inner = self.lock()?;
        inner.sessions = Some(value);
        inner.active_id = active_id.map(str::to_string);
        inner.saves += 1;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.lock()?.flushes += 1;
        Ok(())
    }
}
