use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tempfile::NamedTempFile;

/// Error type for durable store operations
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("could not write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not encode {what}: {source}")]
    Encode {
        what: &'static str,
        source: serde_json::Error,
    },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// The host application's two durable stores: the global settings blob and
/// the per-conversation data blob. Both hold JSON text.
pub trait HostStorage {
    /// The last saved settings blob, if any
    fn load_settings(&self) -> Result<Option<String>, PersistenceError>;
    fn save_settings(&mut self, json: &str) -> Result<(), PersistenceError>;
    fn save_chat_data(&mut self, json: &str) -> Result<(), PersistenceError>;
}

/// A flat string key-value store. Reads and writes are whole-value.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

// ---------------------------------------------------------------------------
// In-memory storage
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryState {
    settings: Option<String>,
    chat_data: Option<String>,
    entries: HashMap<String, String>,
    settings_saves: usize,
    chat_saves: usize,
    fail_writes: bool,
}

/// Storage kept in memory. Clones share the same state, so a caller can hand
/// one clone to a store and keep another to inspect what was written.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a previously persisted settings blob
    pub fn with_settings(json: &str) -> Self {
        let storage = Self::default();
        storage.lock().settings = Some(json.to_string());
        storage
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a test thread panicked mid-write
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn settings_json(&self) -> Option<String> {
        self.lock().settings.clone()
    }

    pub fn chat_json(&self) -> Option<String> {
        self.lock().chat_data.clone()
    }

    pub fn settings_saves(&self) -> usize {
        self.lock().settings_saves
    }

    pub fn chat_saves(&self) -> usize {
        self.lock().chat_saves
    }

    /// Make every subsequent write fail with `PersistenceError::Unavailable`
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    fn check_writable(state: &MemoryState) -> Result<(), PersistenceError> {
        if state.fail_writes {
            return Err(PersistenceError::Unavailable("memory storage is read-only".into()));
        }
        Ok(())
    }
}

impl HostStorage for MemoryStorage {
    fn load_settings(&self) -> Result<Option<String>, PersistenceError> {
        Ok(self.lock().settings.clone())
    }

    fn save_settings(&mut self, json: &str) -> Result<(), PersistenceError> {
        let mut state = self.lock();
        Self::check_writable(&state)?;
        state.settings = Some(json.to_string());
        state.settings_saves += 1;
        Ok(())
    }

    fn save_chat_data(&mut self, json: &str) -> Result<(), PersistenceError> {
        let mut state = self.lock();
        Self::check_writable(&state)?;
        state.chat_data = Some(json.to_string());
        state.chat_saves += 1;
        Ok(())
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.lock().entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let mut state = self.lock();
        Self::check_writable(&state)?;
        state.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Directory storage
// ---------------------------------------------------------------------------

/// Storage rooted at a directory:
///
/// ```text
/// <root>/settings.json
/// <root>/chats/<chat_id>.json
/// <root>/kv/<key>
/// ```
#[derive(Debug, Clone)]
pub struct DirStorage {
    root: PathBuf,
    chat_id: String,
}

impl DirStorage {
    pub fn new(root: impl Into<PathBuf>, chat_id: impl Into<String>) -> Self {
        DirStorage {
            root: root.into(),
            chat_id: chat_id.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    pub fn chat_path(&self) -> PathBuf {
        self.root.join("chats").join(format!("{}.json", self.chat_id))
    }

    pub fn key_path(&self, key: &str) -> PathBuf {
        self.root.join("kv").join(key)
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, PersistenceError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PersistenceError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), PersistenceError> {
    atomic_write(path, content.as_bytes()).map_err(|e| PersistenceError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write `content` to `path` atomically using a temp file + rename.
/// Missing parent directories are created.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl HostStorage for DirStorage {
    fn load_settings(&self) -> Result<Option<String>, PersistenceError> {
        read_optional(&self.settings_path())
    }

    fn save_settings(&mut self, json: &str) -> Result<(), PersistenceError> {
        write_file(&self.settings_path(), json)
    }

    fn save_chat_data(&mut self, json: &str) -> Result<(), PersistenceError> {
        write_file(&self.chat_path(), json)
    }
}

impl KeyValueStore for DirStorage {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        read_optional(&self.key_path(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        write_file(&self.key_path(key), value)
    }
}
