use super::Config;
use crate::error::ConfigError;
use directories::UserDirs;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = ".seattle-simulator";
const CONFIG_FILE: &str = "config.toml";
pub(crate) const CONFIG_PATH_ENV: &str = "SEATTLE_SIMULATOR_CONFIG";

impl Config {
    /// Load from `explicit` path, `$SEATTLE_SIMULATOR_CONFIG`, or
    /// `~/.seattle-simulator/config.toml`, then apply env overrides, normalize
    /// and validate. A missing file yields defaults; nothing is written back.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match explicit {
            Some(path) => expand_path(path),
            None => default_config_path()?,
        };

        let mut config = Self::load_from_path(&config_path)?;
        config.apply_env_overrides();
        config.normalize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without env overrides or validation.
    pub fn load_from_path(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "no config file; using defaults");
            return Ok(Self {
                config_path: config_path.to_path_buf(),
                ..Self::default()
            });
        }

        let contents = fs::read_to_string(config_path)?;
        let mut config: Self = toml::from_str(&contents).map_err(|e| {
            ConfigError::Load(format!("{}: {e}", config_path.display()))
        })?;
        config.config_path = config_path.to_path_buf();
        Ok(config)
    }
}

fn default_config_path() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV)
        && !path.is_empty()
    {
        return Ok(expand_path(Path::new(&path)));
    }

    let home = UserDirs::new()
        .map(|u| u.home_dir().to_path_buf())
        .ok_or_else(|| ConfigError::Load("could not find home directory".into()))?;
    Ok(home.join(CONFIG_DIR).join(CONFIG_FILE))
}

fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}
