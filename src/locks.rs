use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

const RETRY_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug)]
pub enum LockError {
    Busy(PathBuf),
    Io(std::io::Error),
}

impl std::fmt::Display for LockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockError::Busy(path) => write!(f, "lock busy: {}", path.display()),
            LockError::Io(err) => write!(f, "lock I/O error: {}", err),
        }
    }
}

impl std::error::Error for LockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LockError::Busy(_) => None,
            LockError::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for LockError {
    fn from(value: std::io::Error) -> Self {
        LockError::Io(value)
    }
}

/// Exclusive lock held as long as the lock file created for it exists.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    _file: File,
}

impl FileLock {
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self, LockError> {
        let start = Instant::now();
        loop {
            match try_acquire(path)? {
                Some(guard) => return Ok(guard),
                None if start.elapsed() >= timeout => {
                    return Err(LockError::Busy(path.to_path_buf()));
                }
                None => thread::sleep(RETRY_INTERVAL),
            }
        }
    }

    pub fn try_acquire(path: &Path) -> Result<Option<Self>, LockError> {
        try_acquire(path)
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn try_acquire(path: &Path) -> Result<Option<FileLock>, LockError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => Ok(Some(FileLock {
            path: path.to_path_buf(),
            _file: file,
        })),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(None),
        Err(err) => Err(LockError::Io(err)),
    }
}

/// One lock file per record key, so load and save on the same key never
/// interleave across processes.
#[derive(Debug, Clone)]
pub struct KeyLocks {
    dir: PathBuf,
    timeout: Duration,
}

impl KeyLocks {
    pub fn new(dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            dir: dir.into(),
            timeout,
        }
    }

    pub fn lock(&self, key: &str) -> Result<FileLock, LockError> {
        let path = self.path_for(key);
        debug!(key, path = %path.display(), "acquiring record lock");
        FileLock::acquire(&path, self.timeout)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name = key
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_') {
                    ch
                } else {
                    '_'
                }
            })
            .collect::<String>();
        self.dir.join(format!("{file_name}.lock"))
    }
}
