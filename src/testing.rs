//! In-memory doubles for the storage and account traits.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use serde_json::Value;

use crate::auth::{AuthError, AuthProvider, Identity};
use crate::cache::{CacheError, LocalCache};
use crate::remote::{RecordPath, RemoteError, RemoteStore};

#[derive(Debug, Default)]
pub struct MemoryRemote {
    records: RefCell<BTreeMap<String, Value>>,
    reads: Cell<usize>,
    writes: Cell<usize>,
    fail_reads: Cell<bool>,
    fail_writes: Cell<bool>,
}

impl MemoryRemote {
    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    pub fn calls(&self) -> usize {
        self.reads() + self.writes()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    pub fn get(&self, path: &str) -> Option<Value> {
        self.records.borrow().get(path).cloned()
    }

    pub fn insert(&self, path: &str, value: Value) {
        self.records.borrow_mut().insert(path.to_string(), value);
    }
}

impl RemoteStore for MemoryRemote {
    fn read(&self, path: &RecordPath) -> Result<Option<Value>, RemoteError> {
        self.reads.set(self.reads.get() + 1);
        if self.fail_reads.get() {
            return Err(RemoteError::Unavailable("injected read failure".to_string()));
        }
        Ok(self.get(path.as_str()))
    }

    fn write(&self, path: &RecordPath, value: &Value) -> Result<(), RemoteError> {
        self.writes.set(self.writes.get() + 1);
        if self.fail_writes.get() {
            return Err(RemoteError::Unavailable("injected write failure".to_string()));
        }
        let mut records = self.records.borrow_mut();
        if value.is_null() {
            records.remove(path.as_str());
        } else {
            records.insert(path.to_string(), value.clone());
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RefCell<BTreeMap<String, String>>,
    fail_sets: Cell<bool>,
    clears: Cell<usize>,
}

impl MemoryCache {
    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clears(&self) -> usize {
        self.clears.get()
    }

    pub fn fail_sets(&self, fail: bool) {
        self.fail_sets.set(fail);
    }
}

impl LocalCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        if self.fail_sets.get() {
            return Err(CacheError::Unavailable("injected set failure".to_string()));
        }
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.clears.set(self.clears.get() + 1);
        self.entries.borrow_mut().clear();
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct MemoryAccount {
    identity: Identity,
    password: String,
}

#[derive(Debug, Default)]
pub struct MemoryAuth {
    accounts: RefCell<Vec<MemoryAccount>>,
    current: RefCell<Option<Identity>>,
}

impl AuthProvider for MemoryAuth {
    fn current_user(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    fn register(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        if !email.contains('@') {
            return Err(AuthError::InvalidEmail);
        }
        if password.len() < 6 {
            return Err(AuthError::WeakPassword);
        }
        let mut accounts = self.accounts.borrow_mut();
        if accounts.iter().any(|account| account.identity.email == email) {
            return Err(AuthError::EmailInUse);
        }
        let identity = Identity {
            user_id: format!("user-{}", accounts.len() + 1),
            email: email.to_string(),
        };
        accounts.push(MemoryAccount {
            identity: identity.clone(),
            password: password.to_string(),
        });
        *self.current.borrow_mut() = Some(identity.clone());
        Ok(identity)
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let identity = self
            .accounts
            .borrow()
            .iter()
            .find(|account| account.identity.email == email && account.password == password)
            .map(|account| account.identity.clone())
            .ok_or(AuthError::InvalidCredentials)?;
        *self.current.borrow_mut() = Some(identity.clone());
        Ok(identity)
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        self.current.borrow_mut().take();
        Ok(())
    }
}
