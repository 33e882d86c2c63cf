use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;

use indexmap::IndexMap;
use reqpool_core::TransportConfig;
use serde::{Deserialize, Serialize};

use crate::default_config::DEFAULT_CONFIG;
use crate::{APP_NAME, CONFIG_ENV_VAR, CONFIG_FILE, XDG_DEFAULTS, XDG_ENV_VARS};

fn default_poll_interval() -> u64 {
    reqpool_core::DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub base_target: Option<String>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// zero or absent means polls never give up
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// headers sent with every request unless a request overrides them
    #[serde(default)]
    pub headers: IndexMap<String, String>,
}

impl Config {
    pub fn transport_config(&self) -> TransportConfig {
        let mut transport: TransportConfig = self.headers.iter().collect();
        if let Some(timeout_ms) = self.timeout_ms {
            transport = transport.with_timeout(Duration::from_millis(timeout_ms));
        }
        transport.with_invalid_certs(self.accept_invalid_certs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

pub fn load_config_from_file<P>(path: P) -> anyhow::Result<Config>
where
    P: AsRef<Path>,
{
    let config_file = std::fs::read_to_string(path.as_ref())?;
    Ok(toml::from_str::<Config>(&config_file)?)
}

/// try to get the configuration path from `REQPOOL_CONFIG`, then from
/// `XDG_CONFIG_HOME` on unix or `LOCALAPPDATA` on windows, and finally from
/// `$HOME/.config`. when none of them is available we return None and the
/// default configuration is used
pub fn get_config_dir_path() -> Option<PathBuf> {
    let config_path = std::env::var(CONFIG_ENV_VAR).ok().map(|config_path| {
        tracing::debug!("loading config file from $REQPOOL_CONFIG: {config_path:?}");
        PathBuf::from(config_path).join(CONFIG_FILE)
    });

    if config_path.is_some() {
        return config_path;
    }

    let xdg_config_path = std::env::var(XDG_ENV_VARS[0]).ok().map(|config_path| {
        tracing::debug!(
            "loading config file from $XDG_CONFIG_HOME: {config_path}/reqpool/reqpool.toml"
        );
        Path::new(&config_path).join(APP_NAME).join(CONFIG_FILE)
    });

    if xdg_config_path.is_some() {
        return xdg_config_path;
    }

    let home_config_path = dirs::home_dir().map(|home_path| {
        tracing::debug!(
            "loading config file from $HOME: {home_path:?}/.config/reqpool/reqpool.toml"
        );
        Path::new(&home_path)
            .join(XDG_DEFAULTS[0])
            .join(APP_NAME)
            .join(CONFIG_FILE)
    });

    if home_config_path.is_some() {
        return home_config_path;
    }

    tracing::debug!("no config file found, loading default");
    None
}

pub fn load_default_config() -> Config {
    toml::from_str::<Config>(DEFAULT_CONFIG).expect("failed to parse default config string")
}

pub fn default_as_str() -> &'static str {
    DEFAULT_CONFIG
}

/// loads the config file at `path`. a missing path or file yields the
/// default config, a file that exists but cannot be read or parsed is an error
pub fn try_load_config_from(path: Option<PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) if path.exists() => load_config_from_file(&path)
            .with_context(|| format!("could not load config file {path:?}")),
        _ => Ok(load_default_config()),
    }
}

pub fn try_load_config() -> anyhow::Result<Config> {
    try_load_config_from(get_config_dir_path())
}

pub fn get_usual_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(XDG_DEFAULTS[0])
        .join(APP_NAME)
}
