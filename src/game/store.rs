//! Session persistence.
//!
//! Games are keyed by session id. The engine loads a game before every
//! action and writes it back afterwards, so a store only has to be able to
//! round-trip a whole [`Game`].

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

use super::Game;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("corrupt session: {0}")]
    Json(#[from] serde_json::Error),

    #[error("session store lock poisoned")]
    Poisoned,

    #[error("invalid session id '{0}'")]
    BadId(String),
}

pub trait SessionStore: Send {
    fn get(&self, id: &str) -> Result<Option<Game>, StoreError>;
    fn put(&self, game: &Game) -> Result<(), StoreError>;
    fn delete(&self, id: &str) -> Result<(), StoreError>;
    /// Ids of every stored session.
    fn ids(&self) -> Result<Vec<String>, StoreError>;
}

/// Keeps games in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    games: Mutex<HashMap<String, Game>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, id: &str) -> Result<Option<Game>, StoreError> {
        let games = self.games.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(games.get(id).cloned())
    }

    fn put(&self, game: &Game) -> Result<(), StoreError> {
        let mut games = self.games.lock().map_err(|_| StoreError::Poisoned)?;
        games.insert(game.id.clone(), game.clone());
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut games = self.games.lock().map_err(|_| StoreError::Poisoned)?;
        games.remove(id);
        Ok(())
    }

    fn ids(&self) -> Result<Vec<String>, StoreError> {
        let games = self.games.lock().map_err(|_| StoreError::Poisoned)?;
        let mut ids: Vec<String> = games.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

/// One JSON file per session in a directory.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    /// Opens `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(JsonDirStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, id: &str) -> Result<PathBuf, StoreError> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::BadId(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }
}

impl SessionStore for JsonDirStore {
    fn get(&self, id: &str) -> Result<Option<Game>, StoreError> {
        let path = self.path(id)?;
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&text)?))
    }

    fn put(&self, game: &Game) -> Result<(), StoreError> {
        let path = self.path(&game.id)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(game)?)?;
        // Readers never see a half-written file.
        fs::rename(&tmp, &path)?;
        log::debug!("saved session {} to {}", game.id, path.display());
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path(id)?) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn ids(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
