//! One synchronizer for every record category.
//!
//! Remote reads and writes go to the record's canonical path. The local cache
//! only ever holds a value that was just read from, or just written to, the
//! remote store.

use std::error::Error;
use std::fmt;

use tracing::{debug, warn};

use crate::cache::{CacheError, LocalCache};
use crate::calendar::LogDate;
use crate::locks::{FileLock, KeyLocks, LockError};
use crate::records::{Profile, Record, RecordKey, ValidationError};
use crate::remote::{RemoteError, RemoteStore};

#[derive(Debug)]
pub enum SaveError {
    Validation(ValidationError),
    Persistence(RemoteError),
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::Validation(err) => write!(f, "{}", err),
            SaveError::Persistence(err) => write!(f, "failed to save: {}", err),
        }
    }
}

impl Error for SaveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SaveError::Validation(err) => Some(err),
            SaveError::Persistence(err) => Some(err),
        }
    }
}

impl From<ValidationError> for SaveError {
    fn from(value: ValidationError) -> Self {
        SaveError::Validation(value)
    }
}

#[derive(Debug)]
pub enum ReadError {
    Remote(RemoteError),
    Decode {
        path: String,
        source: serde_json::Error,
    },
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Remote(err) => write!(f, "failed to load: {}", err),
            ReadError::Decode { path, source } => {
                write!(f, "record at '{}' is malformed: {}", path, source)
            }
        }
    }
}

impl Error for ReadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReadError::Remote(err) => Some(err),
            ReadError::Decode { source, .. } => Some(source),
        }
    }
}

impl From<RemoteError> for ReadError {
    fn from(value: RemoteError) -> Self {
        ReadError::Remote(value)
    }
}

pub struct RecordSynchronizer<'a> {
    remote: &'a dyn RemoteStore,
    cache: &'a dyn LocalCache,
    locks: Option<KeyLocks>,
}

impl<'a> RecordSynchronizer<'a> {
    pub fn new(remote: &'a dyn RemoteStore, cache: &'a dyn LocalCache) -> Self {
        Self {
            remote,
            cache,
            locks: None,
        }
    }

    /// Serializes load and save of the same record across processes.
    pub fn with_locks(mut self, locks: KeyLocks) -> Self {
        self.locks = Some(locks);
        self
    }

    /// Remote value for the day, or the empty record when none exists yet.
    pub fn load<R: Record>(&self, user_id: &str, date: LogDate) -> Result<R, ReadError> {
        Ok(self
            .load_existing::<R>(user_id, date)?
            .unwrap_or_default())
    }

    pub fn load_existing<R: Record>(
        &self,
        user_id: &str,
        date: LogDate,
    ) -> Result<Option<R>, ReadError> {
        self.read_record(&R::key(user_id, date))
    }

    /// Last mirrored value, without touching the remote store.
    pub fn cached<R: Record>(&self, user_id: &str, date: LogDate) -> Option<R> {
        self.cached_record(&R::key(user_id, date))
    }

    pub fn save<R: Record>(&self, user_id: &str, date: LogDate, record: &R) -> Result<(), SaveError> {
        self.write_record(&R::key(user_id, date), record)
    }

    pub fn load_profile(&self, user_id: &str) -> Result<Option<Profile>, ReadError> {
        self.read_record(&RecordKey::profile(user_id))
    }

    pub fn save_profile(&self, user_id: &str, profile: &Profile) -> Result<(), SaveError> {
        self.write_record(&RecordKey::profile(user_id), profile)
    }

    pub fn evict(&self, key: &RecordKey) -> Result<(), CacheError> {
        self.cache.remove(&key.cache_key())
    }

    pub(crate) fn read_record<R: Record>(&self, key: &RecordKey) -> Result<Option<R>, ReadError> {
        debug_assert_eq!(key.category(), R::CATEGORY);
        let _guard = self
            .lock(key)
            .map_err(|err| ReadError::Remote(RemoteError::Lock(err)))?;
        let path = key.remote_path();
        let Some(value) = self.remote.read(&path)? else {
            debug!(category = %R::CATEGORY, path = %path, "no remote record");
            return Ok(None);
        };
        let record = serde_json::from_value::<R>(value).map_err(|source| ReadError::Decode {
            path: path.to_string(),
            source,
        })?;
        self.mirror(key, &record);
        Ok(Some(record))
    }

    pub(crate) fn write_record<R: Record>(&self, key: &RecordKey, record: &R) -> Result<(), SaveError> {
        debug_assert_eq!(key.category(), R::CATEGORY);
        record.validate()?;
        let _guard = self
            .lock(key)
            .map_err(|err| SaveError::Persistence(RemoteError::Lock(err)))?;
        let value = serde_json::to_value(record)
            .map_err(|err| SaveError::Persistence(RemoteError::Json(err)))?;
        let path = key.remote_path();
        self.remote
            .write(&path, &value)
            .map_err(SaveError::Persistence)?;
        debug!(category = %R::CATEGORY, path = %path, "record saved");
        self.mirror(key, record);
        Ok(())
    }

    pub(crate) fn cached_record<R: Record>(&self, key: &RecordKey) -> Option<R> {
        let cache_key = key.cache_key();
        let raw = match self.cache.get(&cache_key) {
            Ok(raw) => raw?,
            Err(err) => {
                warn!(key = %cache_key, error = %err, "cache read failed");
                return None;
            }
        };
        match serde_json::from_str::<R>(&raw) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(key = %cache_key, error = %err, "ignoring malformed cache entry");
                None
            }
        }
    }

    fn mirror<R: Record>(&self, key: &RecordKey, record: &R) {
        let cache_key = key.cache_key();
        let result = serde_json::to_string(record)
            .map_err(|err| CacheError::Unavailable(err.to_string()))
            .and_then(|raw| self.cache.set(&cache_key, &raw));
        if let Err(err) = result {
            warn!(key = %cache_key, error = %err, "cache mirror failed; dropping stale entry");
            if let Err(err) = self.cache.remove(&cache_key) {
                warn!(key = %cache_key, error = %err, "failed to drop stale cache entry");
            }
        }
    }

    fn lock(&self, key: &RecordKey) -> Result<Option<FileLock>, LockError> {
        match &self.locks {
            Some(locks) => locks.lock(&key.cache_key()).map(Some),
            None => Ok(None),
        }
    }
}
