//! Process settings read from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `LABEL_DELAY_LISTEN_ADDR` | `0.0.0.0:3000` |
//! | `LABEL_DELAY_WEBHOOK_SECRET` | required |
//! | `GITHUB_TOKEN` | required |
//! | `LABEL_DELAY_CONFIG_PATH` | `.github/label-delay.yml` |
//! | `LABEL_DELAY_BOT_LOGIN` | `label-delay[bot]` |
//! | `LABEL_DELAY_POLL_INTERVAL_MS` | `1000` |
//! | `LABEL_DELAY_ALLOWED_OWNERS` | empty (every owner allowed) |

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use super::DEFAULT_CONFIG_PATH;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_BOT_LOGIN: &str = "label-delay[bot]";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Errors from reading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Settings for the running process.
#[derive(Debug, Clone)]
pub struct Settings {
    pub listen_addr: SocketAddr,

    /// Shared secret used to verify webhook signatures.
    pub webhook_secret: String,

    /// Token used for all GitHub API calls.
    pub github_token: String,

    /// Repository path of the per-repository configuration document.
    pub config_path: String,

    /// Login of the bot account; used to recognise its own comments.
    pub bot_login: String,

    /// How often the queue runner checks for due jobs.
    pub poll_interval: Duration,

    /// Owners allowed to use the bot. Empty means everyone.
    pub allowed_owners: Vec<String>,
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through an arbitrary lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let listen_addr = get("LABEL_DELAY_LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_addr
            .parse::<SocketAddr>()
            .map_err(|_| SettingsError::Invalid {
                name: "LABEL_DELAY_LISTEN_ADDR",
                value: listen_addr.clone(),
            })?;

        let webhook_secret =
            get("LABEL_DELAY_WEBHOOK_SECRET").ok_or(SettingsError::Missing("LABEL_DELAY_WEBHOOK_SECRET"))?;
        let github_token = get("GITHUB_TOKEN").ok_or(SettingsError::Missing("GITHUB_TOKEN"))?;

        let poll_interval = match get("LABEL_DELAY_POLL_INTERVAL_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(SettingsError::Invalid {
                    name: "LABEL_DELAY_POLL_INTERVAL_MS",
                    value: raw,
                })?,
            None => DEFAULT_POLL_INTERVAL_MS,
        };

        let allowed_owners = get("LABEL_DELAY_ALLOWED_OWNERS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Settings {
            listen_addr,
            webhook_secret,
            github_token,
            config_path: get("LABEL_DELAY_CONFIG_PATH")
                .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string()),
            bot_login: get("LABEL_DELAY_BOT_LOGIN").unwrap_or_else(|| DEFAULT_BOT_LOGIN.to_string()),
            poll_interval: Duration::from_millis(poll_interval),
            allowed_owners,
        })
    }
}
