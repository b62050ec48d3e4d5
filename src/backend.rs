//! Explicitly opened handle over the record store and the account provider.
//!
//! Record access is only allowed while the handle is open and a user is
//! signed in, and only below that user's own `users/{uid}/` subtree.

use std::cell::Cell;

use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::{AuthError, AuthProvider, FsAuthProvider, Identity};
use crate::config::Settings;
use crate::remote::{FsRecordStore, RecordPath, RemoteError, RemoteStore};

pub struct Backend<S = FsRecordStore, A = FsAuthProvider> {
    records: S,
    auth: A,
    open: Cell<bool>,
}

impl Backend {
    pub fn open(settings: &Settings) -> Self {
        let records = FsRecordStore::new(settings.data_dir(), settings.lock_timeout);
        debug!(records = %records.root().display(), "opening backend");
        let auth = FsAuthProvider::open(
            settings.accounts_file(),
            settings.session_file(),
            settings.lock_timeout,
        );
        Self::new(records, auth)
    }
}

impl<S: RemoteStore, A: AuthProvider> Backend<S, A> {
    pub fn new(records: S, auth: A) -> Self {
        Self {
            records,
            auth,
            open: Cell::new(true),
        }
    }

    pub fn close(&self) {
        if self.open.replace(false) {
            debug!("backend closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.get()
    }

    fn authorize(&self, path: &RecordPath) -> Result<(), RemoteError> {
        if !self.is_open() {
            return Err(RemoteError::Closed);
        }
        let identity = self
            .auth
            .current_user()
            .ok_or(RemoteError::Unauthenticated)?;
        if path.owner() != Some(identity.user_id.as_str()) {
            warn!(user_id = %identity.user_id, path = %path, "rejected access outside own records");
            return Err(RemoteError::PermissionDenied(path.to_string()));
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), AuthError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(AuthError::Closed)
        }
    }
}

impl<S: RemoteStore, A: AuthProvider> RemoteStore for Backend<S, A> {
    fn read(&self, path: &RecordPath) -> Result<Option<Value>, RemoteError> {
        self.authorize(path)?;
        self.records.read(path)
    }

    fn write(&self, path: &RecordPath, value: &Value) -> Result<(), RemoteError> {
        self.authorize(path)?;
        self.records.write(path, value)
    }
}

impl<S: RemoteStore, A: AuthProvider> AuthProvider for Backend<S, A> {
    fn current_user(&self) -> Option<Identity> {
        if !self.is_open() {
            return None;
        }
        self.auth.current_user()
    }

    fn register(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.ensure_open()?;
        self.auth.register(email, password)
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.ensure_open()?;
        self.auth.sign_in(email, password)
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        self.ensure_open()?;
        self.auth.sign_out()
    }
}
