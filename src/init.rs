use std::io::{self, Write};

use crate::app::AppError;
use crate::config::{FitlogConfig, Settings};
use crate::db;

const ANSI_RESET: &str = "\x1b[0m";
const ANSI_BOLD_CYAN: &str = "\x1b[1;36m";
const ANSI_BOLD_GREEN: &str = "\x1b[1;32m";
const ANSI_BOLD_MAGENTA: &str = "\x1b[1;35m";
const ANSI_DIM: &str = "\x1b[2m";

pub(crate) fn init_home(settings: &Settings) -> Result<(), AppError> {
    print_banner("READY, SET, LOG")?;
    progress(&format!("preparing {}", settings.home.display()))?;
    std::fs::create_dir_all(&settings.home)?;
    if write_default_config(settings)? {
        progress_ok("wrote default config.toml")?;
    } else {
        progress_note("keeping existing config.toml")?;
    }

    progress(&format!(
        "opening cache database at {}",
        settings.cache_path.display()
    ))?;
    if let Some(parent) = settings.cache_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = db::open_connection(&settings.cache_path)?;
    let schema = db::get_meta(&conn, "schema_version")?.unwrap_or_else(|| "?".to_string());
    progress_ok(&format!("local cache ready (schema v{schema})"))?;

    progress(&format!(
        "preparing record store at {}",
        settings.remote_root.display()
    ))?;
    std::fs::create_dir_all(settings.data_dir())?;
    if let Some(parent) = settings.accounts_file().parent() {
        std::fs::create_dir_all(parent)?;
    }
    progress_ok("record store ready")?;
    progress_note("next: fitlog register <email> --password <password>")?;
    Ok(())
}

/// Writes the default config unless one exists. Returns whether it wrote.
fn write_default_config(settings: &Settings) -> Result<bool, AppError> {
    let path = settings.config_file();
    if path.exists() {
        return Ok(false);
    }
    let rendered = FitlogConfig::default().to_toml()?;
    std::fs::write(path, rendered)?;
    Ok(true)
}

fn progress(message: &str) -> Result<(), AppError> {
    println!("{ANSI_BOLD_CYAN}•{ANSI_RESET} {message}");
    io::stdout().flush()?;
    Ok(())
}

fn progress_ok(message: &str) -> Result<(), AppError> {
    println!("{ANSI_BOLD_GREEN}✓{ANSI_RESET} {message}");
    io::stdout().flush()?;
    Ok(())
}

fn progress_note(message: &str) -> Result<(), AppError> {
    println!("{ANSI_DIM}{message}{ANSI_RESET}");
    io::stdout().flush()?;
    Ok(())
}

fn print_banner(title: &str) -> Result<(), AppError> {
    println!("{ANSI_BOLD_MAGENTA}{title}{ANSI_RESET}");
    println!(
        "{ANSI_DIM}fitlog version {}{ANSI_RESET}",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    io::stdout().flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::init_home;
    use crate::config::{load_config, FitlogConfig, Settings};

    #[test]
    fn init_creates_layout_and_keeps_existing_config() {
        let home = std::env::temp_dir().join(format!("fitlog-init-test-{}", Uuid::now_v7()));
        let settings = Settings::load(&home, None, None).expect("settings");
        init_home(&settings).expect("first init");

        assert!(settings.config_file().exists());
        assert!(settings.cache_path.exists());
        assert!(settings.data_dir().is_dir());
        assert_eq!(load_config(&home).expect("config"), FitlogConfig::default());

        std::fs::write(settings.config_file(), "[log]\nfilter = \"debug\"\n")
            .expect("custom config");
        init_home(&settings).expect("second init");
        assert_eq!(load_config(&home).expect("config").log.filter, "debug");

        let _ = std::fs::remove_dir_all(home);
    }
}
