use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rivconfig::RivvonConfig;

use crate::paths::AppPaths;

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: RivvonConfig,
    /// File the configuration came from; `None` when running on defaults.
    pub source: Option<PathBuf>,
}

/// Loads the explicit file when given, else the default file if it exists.
pub fn load(explicit: Option<&Path>, paths: &AppPaths) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        return Ok(LoadedConfig {
            config: read_config(path)?,
            source: Some(path.to_path_buf()),
        });
    }

    let default_file = paths.config_file();
    if default_file.is_file() {
        return Ok(LoadedConfig {
            config: read_config(&default_file)?,
            source: Some(default_file),
        });
    }

    tracing::debug!(path = %default_file.display(), "no configuration file; using defaults");
    Ok(LoadedConfig {
        config: RivvonConfig::default(),
        source: None,
    })
}

pub fn read_config(path: &Path) -> Result<RivvonConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration at {}", path.display()))?;
    RivvonConfig::from_toml_str(&contents)
        .with_context(|| format!("failed to load configuration at {}", path.display()))
}
