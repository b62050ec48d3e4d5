use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FitlogConfig {
    pub remote: RemoteSection,
    pub cache: CacheSection,
    pub locks: LocksSection,
    pub log: LogSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSection {
    pub root: String,
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            root: "remote".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub path: String,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            path: "cache/state.sqlite".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocksSection {
    pub timeout_ms: u64,
}

impl Default for LocksSection {
    fn default() -> Self {
        Self { timeout_ms: 2000 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub filter: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Render(toml::ser::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "config I/O error: {}", err),
            ConfigError::Parse(err) => write!(f, "invalid config TOML: {}", err),
            ConfigError::Render(err) => write!(f, "failed to render config TOML: {}", err),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
            ConfigError::Render(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        ConfigError::Parse(value)
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(value: toml::ser::Error) -> Self {
        ConfigError::Render(value)
    }
}

impl FitlogConfig {
    pub(crate) fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.locks.timeout_ms)
    }
}

/// Resolved locations for one fitlog home directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub home: PathBuf,
    pub remote_root: PathBuf,
    pub cache_path: PathBuf,
    pub lock_timeout: Duration,
    pub log_filter: String,
}

impl Settings {
    /// Loads `<home>/config.toml` (defaults when absent) and applies
    /// command-line or environment overrides.
    pub fn load(
        home: &Path,
        remote_override: Option<&Path>,
        cache_override: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let config = load_config(home)?;
        Ok(Self::resolve(home, &config, remote_override, cache_override))
    }

    pub(crate) fn resolve(
        home: &Path,
        config: &FitlogConfig,
        remote_override: Option<&Path>,
        cache_override: Option<&str>,
    ) -> Self {
        let remote_root = match remote_override {
            Some(path) => path.to_path_buf(),
            None => home.join(&config.remote.root),
        };
        let cache_path = match cache_override {
            Some(path) => PathBuf::from(path),
            None => home.join(&config.cache.path),
        };
        Self {
            home: home.to_path_buf(),
            remote_root,
            cache_path,
            lock_timeout: config.lock_timeout(),
            log_filter: config.log.filter.clone(),
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.remote_root.join("data")
    }

    pub fn accounts_file(&self) -> PathBuf {
        self.remote_root.join("auth").join("accounts.json")
    }

    pub fn session_file(&self) -> PathBuf {
        self.home.join(SESSION_FILE_NAME)
    }

    pub fn lock_dir(&self) -> PathBuf {
        self.home.join("locks")
    }

    pub fn config_file(&self) -> PathBuf {
        self.home.join(CONFIG_FILE_NAME)
    }
}

pub fn load_config(home: &Path) -> Result<FitlogConfig, ConfigError> {
    let path = home.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(FitlogConfig::default());
    }
    let raw = std::fs::read_to_string(path)?;
    FitlogConfig::from_toml(&raw)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use super::{FitlogConfig, Settings};

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = FitlogConfig::from_toml("[locks]\ntimeout_ms = 50\n").expect("valid toml");
        assert_eq!(config.locks.timeout_ms, 50);
        assert_eq!(config.remote.root, "remote");
        assert_eq!(config.cache.path, "cache/state.sqlite");
        assert_eq!(config.log.filter, "warn");
        assert_eq!(config.lock_timeout(), Duration::from_millis(50));
    }

    #[test]
    fn default_config_renders_and_parses_back() {
        let rendered = FitlogConfig::default().to_toml().expect("render");
        assert!(rendered.contains("[remote]"));
        let parsed = FitlogConfig::from_toml(&rendered).expect("parse");
        assert_eq!(parsed, FitlogConfig::default());
    }

    #[test]
    fn invalid_toml_is_reported() {
        let err = FitlogConfig::from_toml("remote = ").expect_err("invalid toml");
        assert!(err.to_string().contains("invalid config TOML"));
    }

    #[test]
    fn paths_resolve_relative_to_home_unless_overridden() {
        let home = Path::new("/tmp/fitlog-home");
        let config = FitlogConfig::default();
        let settings = Settings::resolve(home, &config, None, None);
        assert_eq!(settings.remote_root, home.join("remote"));
        assert_eq!(settings.data_dir(), home.join("remote/data"));
        assert_eq!(settings.accounts_file(), home.join("remote/auth/accounts.json"));
        assert_eq!(settings.cache_path, home.join("cache/state.sqlite"));
        assert_eq!(settings.session_file(), home.join("session.json"));

        let shared = Path::new("/srv/fitlog");
        let settings = Settings::resolve(home, &config, Some(shared), Some("/tmp/c.sqlite"));
        assert_eq!(settings.remote_root, shared);
        assert_eq!(settings.cache_path, Path::new("/tmp/c.sqlite"));
    }
}
