use std::error::Error;
use std::fmt;
use std::path::Path;

use rusqlite::Connection;

use crate::db;

/// Durable string-to-string store mirroring remote records on this device.
pub trait LocalCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;
    fn remove(&self, key: &str) -> Result<(), CacheError>;
    fn clear(&self) -> Result<(), CacheError>;
}

#[derive(Debug)]
pub enum CacheError {
    Io(std::io::Error),
    Db(rusqlite::Error),
    Unavailable(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Io(err) => write!(f, "cache I/O error: {}", err),
            CacheError::Db(err) => write!(f, "cache database error: {}", err),
            CacheError::Unavailable(message) => write!(f, "cache unavailable: {}", message),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CacheError::Io(err) => Some(err),
            CacheError::Db(err) => Some(err),
            CacheError::Unavailable(_) => None,
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(value: std::io::Error) -> Self {
        CacheError::Io(value)
    }
}

impl From<rusqlite::Error> for CacheError {
    fn from(value: rusqlite::Error) -> Self {
        CacheError::Db(value)
    }
}

pub struct SqliteCache {
    conn: Connection,
}

impl SqliteCache {
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = db::open_connection(path)?;
        Ok(Self { conn })
    }

    pub fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(db::list_cache_keys(&self.conn)?)
    }
}

impl LocalCache for SqliteCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(db::get_cache_entry(&self.conn, key)?)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        Ok(db::set_cache_entry(&self.conn, key, value)?)
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        Ok(db::remove_cache_entry(&self.conn, key)?)
    }

    fn clear(&self) -> Result<(), CacheError> {
        db::clear_cache_entries(&self.conn)?;
        Ok(())
    }
}
