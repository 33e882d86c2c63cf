pub mod config;
mod default_config;

pub use config::{
    default_as_str, get_config_dir_path, get_usual_path, load_config_from_file, load_default_config,
    try_load_config, try_load_config_from, Config,
};

pub static APP_NAME: &str = "reqpool";
pub static LOGFILE: &str = "reqpool.log";
pub static CONFIG_FILE: &str = "reqpool.toml";
pub static CONFIG_ENV_VAR: &str = "REQPOOL_CONFIG";

#[cfg(unix)]
pub static XDG_ENV_VARS: [&str; 2] = ["XDG_CONFIG_HOME", "XDG_DATA_HOME"];

#[cfg(windows)]
pub static XDG_ENV_VARS: [&str; 2] = ["LOCALAPPDATA", "LOCALAPPDATA"];

#[cfg(unix)]
pub static XDG_DEFAULTS: [&str; 2] = [".config", ".local/share"];

#[cfg(windows)]
pub static XDG_DEFAULTS: [&str; 2] = ["AppData\\Local", "AppData\\Local"];
