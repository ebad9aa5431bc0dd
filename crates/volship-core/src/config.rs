//! Run configuration, read once from the environment.
//!
//! `Config` is immutable and passed by reference into the orchestrator and the
//! clients. Nothing in the crate reads the environment after startup.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use log::warn;

use crate::domain::ConfigError;

pub const BOT_TOKEN: &str = "BOT_TOKEN";
pub const BOT_DEST: &str = "BOT_DEST";
pub const BOT_API_URL: &str = "BOT_API_URL";
pub const ROOT_DIR: &str = "ROOT_DIR";
pub const TMP_DIR: &str = "TMP_DIR";
pub const CUSTOM_MESSAGE: &str = "CUSTOM_MESSAGE";
pub const DELIVERY_TIMEOUT_SECS: &str = "DELIVERY_TIMEOUT_SECS";
pub const EXT_BACKUP_API_URL: &str = "EXT_BACKUP_API_URL";
pub const EXT_BACKUP_API_KEY: &str = "EXT_BACKUP_API_KEY";
pub const EXT_BACKUP_VERIFY_TLS: &str = "EXT_BACKUP_VERIFY_TLS";
pub const EXT_BACKUP_TIMEOUT_SECS: &str = "EXT_BACKUP_TIMEOUT_SECS";

/// Common volume locations, used when `ROOT_DIR` is unset.
pub const DEFAULT_ROOT_PATHS: &[&str] = &[
    "/var/snap/docker/common/var-lib-docker/volumes/",
    "/var/lib/docker/volumes",
    "/root/backup",
];

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_START_MESSAGE: &str = "Backup started";
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Destination chat credentials.
#[derive(Clone)]
pub struct SinkConfig {
    pub bot_token: String,
    pub chat_id: i64,
    pub api_url: String,
    pub timeout: Duration,
}

// The token is a credential; keep it out of logs.
impl fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// External backup endpoint. Present only when `EXT_BACKUP_API_URL` is set.
#[derive(Clone)]
pub struct ExternalBackupConfig {
    pub url: String,
    pub api_key: String,
    pub verify_tls: bool,
    pub timeout: Duration,
}

impl fmt::Debug for ExternalBackupConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalBackupConfig")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("verify_tls", &self.verify_tls)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Settings the orchestrator itself needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub root_paths: Vec<PathBuf>,
    pub temp_root: PathBuf,
    pub custom_message: Option<String>,
}

impl RunSettings {
    pub fn start_message_prefix(&self) -> &str {
        self.custom_message.as_deref().unwrap_or(DEFAULT_START_MESSAGE)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub sink: SinkConfig,
    pub run: RunSettings,
    pub external: Option<ExternalBackupConfig>,
}

impl Config {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = get(BOT_TOKEN).ok_or(ConfigError::Missing(BOT_TOKEN))?;
        let chat_id = parse_chat_id(&get(BOT_DEST).ok_or(ConfigError::Missing(BOT_DEST))?)?;

        let root_paths = match get(ROOT_DIR) {
            Some(raw) => parse_root_paths(&raw),
            None => {
                warn!(
                    "{} is empty, falling back to default path(s): {:?}",
                    ROOT_DIR, DEFAULT_ROOT_PATHS
                );
                DEFAULT_ROOT_PATHS.iter().map(PathBuf::from).collect()
            }
        };

        let temp_root = match get(TMP_DIR) {
            Some(raw) => PathBuf::from(raw.trim()),
            None => {
                let fallback = std::env::temp_dir();
                warn!(
                    "{} is empty, falling back to default path: [{}]",
                    TMP_DIR,
                    fallback.display()
                );
                fallback
            }
        };

        let sink = SinkConfig {
            bot_token,
            chat_id,
            api_url: get(BOT_API_URL)
                .map(|u| u.trim().trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            timeout: parse_secs(DELIVERY_TIMEOUT_SECS, get(DELIVERY_TIMEOUT_SECS))?
                .unwrap_or(DEFAULT_DELIVERY_TIMEOUT),
        };

        let external = match get(EXT_BACKUP_API_URL) {
            Some(url) => Some(ExternalBackupConfig {
                url: url.trim().to_string(),
                api_key: get(EXT_BACKUP_API_KEY).ok_or(ConfigError::Missing(EXT_BACKUP_API_KEY))?,
                verify_tls: match get(EXT_BACKUP_VERIFY_TLS) {
                    Some(raw) => parse_bool(EXT_BACKUP_VERIFY_TLS, &raw)?,
                    None => true,
                },
                timeout: parse_secs(EXT_BACKUP_TIMEOUT_SECS, get(EXT_BACKUP_TIMEOUT_SECS))?
                    .unwrap_or(DEFAULT_FETCH_TIMEOUT),
            }),
            None => None,
        };

        Ok(Self {
            sink,
            run: RunSettings {
                root_paths,
                temp_root,
                custom_message: get(CUSTOM_MESSAGE),
            },
            external,
        })
    }
}

fn parse_chat_id(raw: &str) -> Result<i64, ConfigError> {
    raw.trim().parse::<i64>().map_err(|e| ConfigError::Invalid {
        var: BOT_DEST,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Comma-separated list; entries are trimmed and empty ones dropped.
fn parse_root_paths(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

fn parse_secs(var: &'static str, raw: Option<String>) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            var,
            value: raw,
            reason: "timeout must be at least one second".to_string(),
        }),
        Ok(secs) => Ok(Some(Duration::from_secs(secs))),
        Err(e) => Err(ConfigError::Invalid {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}
