// src/config/mod.rs
//! Startup configuration: `.env` → optional TOML file → environment overrides.
//! Secrets (API key, mail password) are read from the environment only.

use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::analyze::classifier::{is_mock_mode, ClassifierConfig, TEST_MODE_VAR};
use crate::fetch::browser::BrowserConfig;
use crate::fetch::DEFAULT_USER_AGENT;
use crate::notify::email::EmailConfig;

pub const ENV_CONFIG_PATH: &str = "MONITOR_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/monitor.toml";

pub const DEFAULT_TARGET_URL: &str = "https://truthsocial.com/api/v1/accounts/114311127114777163/statuses?exclude_replies=true&with_muted=true";
pub const DEFAULT_INTERVAL_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0} (set it in the environment or .env)")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Browser,
    Http,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Non-secret settings that may live in `config/monitor.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub target_url: Option<String>,
    pub check_interval_secs: Option<u64>,
    pub fetch_mode: Option<String>,
    pub browser_headless: Option<bool>,
    pub user_agent: Option<String>,
    pub openai_model: Option<String>,
    pub openai_base_url: Option<String>,
    pub email_recipient: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub market_focus: Option<String>,
    pub notify_all_posts: Option<bool>,
    pub metrics_addr: Option<String>,
    pub log_format: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub target_url: String,
    pub interval: Duration,
    pub fetch_mode: FetchMode,
    pub browser: BrowserConfig,
    pub classifier: ClassifierConfig,
    pub email: EmailConfig,
    pub notify_all: bool,
    pub metrics_addr: Option<SocketAddr>,
    pub log_format: LogFormat,
}

/// Key/value view used by the resolver; the process environment in
/// production, a plain map in tests.
pub trait Vars {
    fn get(&self, key: &str) -> Option<String>;
}

pub struct ProcessEnv;

impl Vars for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

impl Vars for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key)
            .cloned()
            .filter(|v| !v.trim().is_empty())
    }
}

impl MonitorConfig {
    /// Load `.env`, the optional TOML file and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let file = load_file_default()?;
        Self::resolve(&file, &ProcessEnv)
    }

    pub fn resolve(file: &FileConfig, vars: &dyn Vars) -> Result<Self, ConfigError> {
        let pick = |key: &str, from_file: &Option<String>| vars.get(key).or_else(|| from_file.clone());

        let target_url =
            pick("TARGET_URL", &file.target_url).unwrap_or_else(|| DEFAULT_TARGET_URL.to_string());

        let interval_secs = match vars.get("CHECK_INTERVAL_SECS") {
            Some(v) => parse_u64("CHECK_INTERVAL_SECS", &v)?,
            None => file.check_interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS),
        };
        if interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "CHECK_INTERVAL_SECS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        let interval = Duration::from_secs(interval_secs);

        let fetch_mode = match pick("FETCH_MODE", &file.fetch_mode) {
            None => FetchMode::Browser,
            Some(v) => match v.trim().to_ascii_lowercase().as_str() {
                "browser" => FetchMode::Browser,
                "http" => FetchMode::Http,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "FETCH_MODE",
                        value: v,
                        reason: "expected `browser` or `http`".into(),
                    })
                }
            },
        };

        let headless = match vars.get("BROWSER_HEADLESS") {
            Some(v) => parse_bool("BROWSER_HEADLESS", &v)?,
            None => file.browser_headless.unwrap_or(false),
        };
        let user_agent =
            pick("USER_AGENT", &file.user_agent).unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let browser = BrowserConfig {
            headless,
            user_agent,
            // Keep the DevTools connection alive across the idle sleep.
            idle_timeout: interval.saturating_add(Duration::from_secs(60)),
            ..BrowserConfig::default()
        };

        let mock = is_mock_mode(vars.get(TEST_MODE_VAR).as_deref());
        let api_key = match vars.get("OPENAI_API_KEY") {
            Some(k) => k,
            None if mock => String::new(),
            None => return Err(ConfigError::Missing("OPENAI_API_KEY")),
        };
        let defaults = ClassifierConfig::default();
        let classifier = ClassifierConfig {
            api_key,
            model: pick("OPENAI_MODEL", &file.openai_model).unwrap_or(defaults.model),
            base_url: pick("OPENAI_BASE_URL", &file.openai_base_url).unwrap_or(defaults.base_url),
            focus: pick("MARKET_FOCUS", &file.market_focus),
            mock,
        };

        let sender = vars
            .get("EMAIL_SENDER")
            .ok_or(ConfigError::Missing("EMAIL_SENDER"))?;
        let password = vars
            .get("EMAIL_PASSWORD")
            .ok_or(ConfigError::Missing("EMAIL_PASSWORD"))?;
        let recipient = pick("EMAIL_RECIPIENT", &file.email_recipient).unwrap_or_else(|| sender.clone());
        let smtp_port = match vars.get("SMTP_PORT") {
            Some(v) => v.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                key: "SMTP_PORT",
                value: v.clone(),
                reason: e.to_string(),
            })?,
            None => file.smtp_port.unwrap_or(465),
        };
        let email = EmailConfig {
            smtp_host: pick("SMTP_HOST", &file.smtp_host)
                .unwrap_or_else(|| "smtp.gmail.com".to_string()),
            smtp_port,
            sender,
            password,
            recipient,
        };

        let notify_all = match vars.get("NOTIFY_ALL_POSTS") {
            Some(v) => parse_bool("NOTIFY_ALL_POSTS", &v)?,
            None => file.notify_all_posts.unwrap_or(false),
        };

        let metrics_addr = match pick("METRICS_ADDR", &file.metrics_addr) {
            None => None,
            Some(v) => Some(v.trim().parse::<SocketAddr>().map_err(|e| {
                ConfigError::Invalid {
                    key: "METRICS_ADDR",
                    value: v.clone(),
                    reason: e.to_string(),
                }
            })?),
        };

        let log_format = match pick("LOG_FORMAT", &file.log_format)
            .map(|v| v.trim().to_ascii_lowercase())
            .as_deref()
        {
            None | Some("compact") => LogFormat::Compact,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "LOG_FORMAT",
                    value: other.to_string(),
                    reason: "expected `compact` or `json`".into(),
                })
            }
        };

        Ok(Self {
            target_url,
            interval,
            fetch_mode,
            browser,
            classifier,
            email,
            notify_all,
            metrics_addr,
            log_format,
        })
    }
}

/// Load the TOML file from an explicit path.
pub fn load_file_from(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// 1) $MONITOR_CONFIG_PATH (must exist)
/// 2) config/monitor.toml if present
/// 3) empty
pub fn load_file_default() -> Result<FileConfig, ConfigError> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        return load_file_from(&PathBuf::from(p));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_PATH);
    if default.exists() {
        return load_file_from(&default);
    }
    Ok(FileConfig::default())
}

fn parse_u64(key: &'static str, v: &str) -> Result<u64, ConfigError> {
    v.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
        key,
        value: v.to_string(),
        reason: e.to_string(),
    })
}

pub fn parse_bool(key: &'static str, v: &str) -> Result<bool, ConfigError> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: v.to_string(),
            reason: "expected a boolean (true/false)".into(),
        }),
    }
}
