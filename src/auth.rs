use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::now_utc_rfc3339;
use crate::locks::{FileLock, LockError};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
}

pub trait AuthProvider {
    fn current_user(&self) -> Option<Identity>;
    fn register(&self, email: &str, password: &str) -> Result<Identity, AuthError>;
    fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;
    fn sign_out(&self) -> Result<(), AuthError>;
}

#[derive(Debug)]
pub enum AuthError {
    InvalidEmail,
    WeakPassword,
    EmailInUse,
    InvalidCredentials,
    Closed,
    Io(std::io::Error),
    Json(serde_json::Error),
    Lock(LockError),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidEmail => write!(f, "The email address is badly formatted."),
            AuthError::WeakPassword => write!(
                f,
                "Password should be at least {} characters.",
                MIN_PASSWORD_LEN
            ),
            AuthError::EmailInUse => {
                write!(f, "The email address is already in use by another account.")
            }
            AuthError::InvalidCredentials => {
                write!(f, "The email or password is incorrect.")
            }
            AuthError::Closed => write!(f, "backend connection is closed"),
            AuthError::Io(err) => write!(f, "account store I/O error: {}", err),
            AuthError::Json(err) => write!(f, "account store is corrupt: {}", err),
            AuthError::Lock(err) => write!(f, "account store is busy: {}", err),
        }
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AuthError::Io(err) => Some(err),
            AuthError::Json(err) => Some(err),
            AuthError::Lock(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AuthError {
    fn from(value: std::io::Error) -> Self {
        AuthError::Io(value)
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(value: serde_json::Error) -> Self {
        AuthError::Json(value)
    }
}

impl From<LockError> for AuthError {
    fn from(value: LockError) -> Self {
        AuthError::Lock(value)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AccountsFile {
    #[serde(default)]
    accounts: Vec<Account>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Account {
    user_id: String,
    email: String,
    salt: String,
    password_sha256: String,
    created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedSession {
    user_id: String,
    email: String,
    signed_in_at: String,
}

/// Email/password accounts kept in a shared JSON file, with the signed-in
/// session persisted on this device.
#[derive(Debug)]
pub struct FsAuthProvider {
    accounts_file: PathBuf,
    session_file: PathBuf,
    lock_timeout: Duration,
    current: RefCell<Option<Identity>>,
}

impl FsAuthProvider {
    pub fn open(
        accounts_file: impl Into<PathBuf>,
        session_file: impl Into<PathBuf>,
        lock_timeout: Duration,
    ) -> Self {
        let session_file = session_file.into();
        let current = restore_session(&session_file);
        Self {
            accounts_file: accounts_file.into(),
            session_file,
            lock_timeout,
            current: RefCell::new(current),
        }
    }

    fn lock_accounts(&self) -> Result<FileLock, AuthError> {
        let mut lock_path = self.accounts_file.clone().into_os_string();
        lock_path.push(".lock");
        Ok(FileLock::acquire(Path::new(&lock_path), self.lock_timeout)?)
    }

    fn load_accounts(&self) -> Result<AccountsFile, AuthError> {
        if !self.accounts_file.exists() {
            return Ok(AccountsFile::default());
        }
        let raw = fs::read_to_string(&self.accounts_file)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn store_accounts(&self, accounts: &AccountsFile) -> Result<(), AuthError> {
        write_json_atomic(&self.accounts_file, accounts)
    }

    fn persist_session(&self, identity: &Identity) -> Result<(), AuthError> {
        let session = PersistedSession {
            user_id: identity.user_id.clone(),
            email: identity.email.clone(),
            signed_in_at: now_utc_rfc3339(),
        };
        write_json_atomic(&self.session_file, &session)?;
        *self.current.borrow_mut() = Some(identity.clone());
        Ok(())
    }
}

impl AuthProvider for FsAuthProvider {
    fn current_user(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    fn register(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let identity = {
            let _lock = self.lock_accounts()?;
            let mut accounts = self.load_accounts()?;
            if accounts.accounts.iter().any(|account| account.email == email) {
                return Err(AuthError::EmailInUse);
            }
            let salt = Uuid::now_v7().simple().to_string();
            let account = Account {
                user_id: Uuid::now_v7().simple().to_string(),
                email: email.clone(),
                password_sha256: password_digest(&salt, password),
                salt,
                created_at: now_utc_rfc3339(),
            };
            let identity = Identity {
                user_id: account.user_id.clone(),
                email: account.email.clone(),
            };
            accounts.accounts.push(account);
            self.store_accounts(&accounts)?;
            identity
        };

        info!(user_id = %identity.user_id, "account registered");
        self.persist_session(&identity)?;
        Ok(identity)
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = normalize_email(email)?;
        let accounts = self.load_accounts()?;
        let account = accounts
            .accounts
            .iter()
            .find(|account| account.email == email)
            .ok_or(AuthError::InvalidCredentials)?;
        if password_digest(&account.salt, password) != account.password_sha256 {
            return Err(AuthError::InvalidCredentials);
        }

        let identity = Identity {
            user_id: account.user_id.clone(),
            email: account.email.clone(),
        };
        self.persist_session(&identity)?;
        info!(user_id = %identity.user_id, "signed in");
        Ok(identity)
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        if self.session_file.exists() {
            fs::remove_file(&self.session_file)?;
        }
        if let Some(previous) = self.current.borrow_mut().take() {
            info!(user_id = %previous.user_id, "signed out");
        }
        Ok(())
    }
}

fn restore_session(session_file: &Path) -> Option<Identity> {
    let raw = fs::read_to_string(session_file).ok()?;
    match serde_json::from_str::<PersistedSession>(&raw) {
        Ok(session) => Some(Identity {
            user_id: session.user_id,
            email: session.email,
        }),
        Err(err) => {
            warn!(path = %session_file.display(), error = %err, "ignoring unreadable session file");
            None
        }
    }
}

fn normalize_email(raw: &str) -> Result<String, AuthError> {
    let email = raw.trim().to_ascii_lowercase();
    let (local, domain) = email.split_once('@').ok_or(AuthError::InvalidEmail)?;
    let valid = !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace);
    if !valid {
        return Err(AuthError::InvalidEmail);
    }
    Ok(email)
}

fn password_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn write_json_atomic(path: &Path, value: &impl Serialize) -> Result<(), AuthError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut staging = path.to_path_buf().into_os_string();
    staging.push(format!(".{}.tmp", Uuid::now_v7().simple()));
    let staging = PathBuf::from(staging);
    fs::write(&staging, serde_json::to_vec_pretty(value)?)?;
    if let Err(err) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(err.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use uuid::Uuid;

    use super::{AuthError, AuthProvider, FsAuthProvider};

    fn workspace() -> PathBuf {
        let root = std::env::temp_dir().join(format!("fitlog-auth-test-{}", Uuid::now_v7()));
        std::fs::create_dir_all(&root).expect("workspace should be creatable");
        root
    }

    fn provider(root: &std::path::Path) -> FsAuthProvider {
        FsAuthProvider::open(
            root.join("remote/auth/accounts.json"),
            root.join("home/session.json"),
            Duration::from_millis(200),
        )
    }

    #[test]
    fn register_signs_in_and_persists_session() {
        let root = workspace();
        let auth = provider(&root);
        let identity = auth
            .register(" Ana@Example.com ", "secret1")
            .expect("register should succeed");
        assert_eq!(identity.email, "ana@example.com");
        assert_eq!(auth.current_user(), Some(identity.clone()));

        let reopened = provider(&root);
        assert_eq!(reopened.current_user(), Some(identity));
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn sign_in_checks_password_and_sign_out_forgets_session() {
        let root = workspace();
        let auth = provider(&root);
        let registered = auth.register("ana@example.com", "secret1").expect("register");
        auth.sign_out().expect("sign out");
        assert!(auth.current_user().is_none());
        assert!(provider(&root).current_user().is_none());

        let wrong = auth.sign_in("ana@example.com", "nope-nope");
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
        let unknown = auth.sign_in("bob@example.com", "secret1");
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));

        let signed_in = auth.sign_in("ANA@example.com", "secret1").expect("sign in");
        assert_eq!(signed_in, registered);
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn register_rejects_bad_input_and_duplicates() {
        let root = workspace();
        let auth = provider(&root);
        assert!(matches!(
            auth.register("not-an-email", "secret1"),
            Err(AuthError::InvalidEmail)
        ));
        assert!(matches!(
            auth.register("ana@example.com", "123"),
            Err(AuthError::WeakPassword)
        ));
        auth.register("ana@example.com", "secret1").expect("first register");
        let duplicate = auth
            .register("ana@example.com", "secret2")
            .expect_err("duplicate should fail");
        assert_eq!(
            duplicate.to_string(),
            "The email address is already in use by another account."
        );
        let _ = std::fs::remove_dir_all(root);
    }
}
