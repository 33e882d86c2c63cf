pub mod batch_loader;

use std::path::PathBuf;

use reqpool_config::{APP_NAME, XDG_DEFAULTS, XDG_ENV_VARS};

/// where logs are written. `XDG_DATA_HOME` (or `LOCALAPPDATA`) wins over the
/// usual `$HOME/.local/share`
pub fn data_dir() -> PathBuf {
    match std::env::var(XDG_ENV_VARS[1]) {
        Ok(path) => PathBuf::from(path).join(APP_NAME),
        Err(_) => dirs::home_dir()
            .unwrap_or_default()
            .join(XDG_DEFAULTS[1])
            .join(APP_NAME),
    }
}

pub fn get_or_create_data_dir() -> anyhow::Result<PathBuf> {
    let data_dir = data_dir();
    if !data_dir.is_dir() {
        tracing::debug!("creating data dir at {data_dir:?}");
        std::fs::create_dir_all(&data_dir)?;
    }

    Ok(data_dir)
}
