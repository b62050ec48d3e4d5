//! Path-addressed record store.
//!
//! Records live at slash-separated paths such as `users/{uid}/profile` or
//! `users/{uid}/logs/water/2024-03-01`. A write replaces the whole value at
//! its path. Writing JSON `null` deletes it.

use std::error::Error;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::locks::{FileLock, LockError};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordPath(String);

impl RecordPath {
    pub fn from_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> Self {
        Self(segments.into_iter().collect::<Vec<_>>().join("/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// User id of a `users/{uid}/…` path.
    pub fn owner(&self) -> Option<&str> {
        let mut segments = self.segments();
        match (segments.next(), segments.next()) {
            (Some("users"), Some(uid)) if !uid.is_empty() => Some(uid),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), RemoteError> {
        for segment in self.segments() {
            let valid = !segment.is_empty()
                && segment != "."
                && segment != ".."
                && segment
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'));
            if !valid {
                return Err(RemoteError::InvalidPath(self.0.clone()));
            }
        }
        Ok(())
    }
}

impl fmt::Display for RecordPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait RemoteStore {
    fn read(&self, path: &RecordPath) -> Result<Option<Value>, RemoteError>;
    fn write(&self, path: &RecordPath, value: &Value) -> Result<(), RemoteError>;
}

#[derive(Debug)]
pub enum RemoteError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Lock(LockError),
    InvalidPath(String),
    Closed,
    Unauthenticated,
    PermissionDenied(String),
    Unavailable(String),
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::Io(err) => write!(f, "remote I/O error: {}", err),
            RemoteError::Json(err) => write!(f, "remote JSON error: {}", err),
            RemoteError::Lock(err) => write!(f, "remote record is busy: {}", err),
            RemoteError::InvalidPath(path) => write!(f, "invalid record path '{}'", path),
            RemoteError::Closed => write!(f, "backend connection is closed"),
            RemoteError::Unauthenticated => write!(f, "not signed in"),
            RemoteError::PermissionDenied(path) => {
                write!(f, "permission denied for record path '{}'", path)
            }
            RemoteError::Unavailable(message) => write!(f, "backend unavailable: {}", message),
        }
    }
}

impl Error for RemoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RemoteError::Io(err) => Some(err),
            RemoteError::Json(err) => Some(err),
            RemoteError::Lock(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RemoteError {
    fn from(value: std::io::Error) -> Self {
        RemoteError::Io(value)
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(value: serde_json::Error) -> Self {
        RemoteError::Json(value)
    }
}

impl From<LockError> for RemoteError {
    fn from(value: LockError) -> Self {
        RemoteError::Lock(value)
    }
}

/// Stores each record as one JSON file below `root`.
#[derive(Debug, Clone)]
pub struct FsRecordStore {
    root: PathBuf,
    lock_timeout: Duration,
}

impl FsRecordStore {
    pub fn new(root: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            root: root.into(),
            lock_timeout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_for(&self, path: &RecordPath) -> Result<PathBuf, RemoteError> {
        path.validate()?;
        let segments = path.segments().collect::<Vec<_>>();
        let (leaf, dirs) = segments
            .split_last()
            .ok_or_else(|| RemoteError::InvalidPath(path.to_string()))?;
        let mut file = self.root.clone();
        for segment in dirs {
            file.push(segment);
        }
        file.push(format!("{leaf}.json"));
        Ok(file)
    }
}

impl RemoteStore for FsRecordStore {
    fn read(&self, path: &RecordPath) -> Result<Option<Value>, RemoteError> {
        let file = self.file_for(path)?;
        if !file.exists() {
            debug!(path = %path, "remote record absent");
            return Ok(None);
        }
        let raw = fs::read_to_string(&file)?;
        match serde_json::from_str::<Value>(&raw)? {
            Value::Null => Ok(None),
            value => Ok(Some(value)),
        }
    }

    fn write(&self, path: &RecordPath, value: &Value) -> Result<(), RemoteError> {
        let file = self.file_for(path)?;
        let parent = file
            .parent()
            .ok_or_else(|| RemoteError::InvalidPath(path.to_string()))?;
        fs::create_dir_all(parent)?;

        let mut lock_path = file.clone().into_os_string();
        lock_path.push(".lock");
        let _lock = FileLock::acquire(Path::new(&lock_path), self.lock_timeout)?;

        if value.is_null() {
            if file.exists() {
                fs::remove_file(&file)?;
            }
            debug!(path = %path, "remote record deleted");
            return Ok(());
        }

        let staging = parent.join(format!(".{}.tmp", Uuid::now_v7().simple()));
        {
            let mut handle = fs::File::create(&staging)?;
            serde_json::to_writer_pretty(&mut handle, value)?;
            handle.write_all(b"\n")?;
            handle.sync_all()?;
        }
        if let Err(err) = fs::rename(&staging, &file) {
            let _ = fs::remove_file(&staging);
            return Err(err.into());
        }
        debug!(path = %path, "remote record written");
        Ok(())
    }
}
