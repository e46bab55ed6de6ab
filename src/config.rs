// Configuration loading and parsing (committee.toml, credentials.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub draw: DrawConfig,
    pub editing: EditingConfig,
    pub credentials: CredentialsConfig,
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn reveal_duration(&self) -> Duration {
        Duration::from_secs(self.draw.reveal_duration_secs)
    }

    pub fn settle_period(&self) -> Duration {
        Duration::from_millis(self.editing.settle_millis)
    }
}

// ---------------------------------------------------------------------------
// committee.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire committee.toml file.
#[derive(Debug, Clone, Deserialize)]
struct CommitteeFile {
    api: ApiConfig,
    draw: DrawConfig,
    editing: EditingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Backend base URL, e.g. "https://committee.example.com".
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DrawConfig {
    /// How long the lottery reveal animation runs.
    pub reveal_duration_secs: u64,
    /// Default countdown length for the draw timer.
    pub timer_seconds: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditingConfig {
    /// Quiet period after the last keystroke before an amount edit commits.
    pub settle_millis: u64,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

/// Optional stored login. When both fields are present the app logs in
/// automatically on startup; otherwise the login screen is shown.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub phone_no: Option<String>,
    pub password: Option<String>,
}

impl CredentialsConfig {
    pub fn login_pair(&self) -> Option<(String, String)> {
        match (&self.phone_no, &self.password) {
            (Some(phone), Some(password)) => Some((phone.clone(), password.clone())),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/committee.toml` and
/// (optionally) `config/credentials.toml`, relative to the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- committee.toml (required) ---
    let committee_path = config_dir.join("committee.toml");
    let committee_text = read_file(&committee_path)?;
    let committee_file: CommitteeFile =
        toml::from_str(&committee_text).map_err(|e| ConfigError::ParseError {
            path: committee_path.clone(),
            source: e,
        })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        api: committee_file.api,
        draw: committee_file.draw,
        editing: committee_file.editing,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };

        // Skip .example template files
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // File already exists in config/, skip it
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.api.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "api.base_url".into(),
            message: "must not be empty".into(),
        });
    }
    if !config.api.base_url.starts_with("http://") && !config.api.base_url.starts_with("https://") {
        return Err(ConfigError::ValidationError {
            field: "api.base_url".into(),
            message: format!(
                "must start with http:// or https://, got {}",
                config.api.base_url
            ),
        });
    }

    if config.api.timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "api.timeout_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.draw.reveal_duration_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "draw.reveal_duration_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.draw.timer_seconds == 0 {
        return Err(ConfigError::ValidationError {
            field: "draw.timer_seconds".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.editing.settle_millis == 0 {
        return Err(ConfigError::ValidationError {
            field: "editing.settle_millis".into(),
            message: "must be greater than 0".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
