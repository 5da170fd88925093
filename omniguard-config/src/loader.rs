use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::core::GuardConfig;
use crate::paths::DataPaths;

/// Load configuration from a specific TOML file.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<GuardConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: GuardConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok(config)
}

/// Load the configuration for a data directory.
///
/// A hook must always answer, so a missing file yields defaults and an
/// invalid one is reported and replaced by defaults.
pub fn load_config(paths: &DataPaths) -> GuardConfig {
    let path = paths.config_file();
    if !path.exists() {
        return GuardConfig::default();
    }

    match load_from_file(&path) {
        Ok(config) => config,
        Err(error) => {
            warn!(path = %path.display(), error = %format!("{error:#}"), "ignoring invalid omniguard config");
            GuardConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path());
        assert_eq!(load_config(&paths), GuardConfig::default());
    }

    #[test]
    fn reads_overrides_from_data_dir() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path());
        fs::write(
            paths.config_file(),
            "[registry]\nmax_entries = 42\n\n[maintenance]\nsweep_one_in = 1\n",
        )
        .unwrap();

        let config = load_config(&paths);
        assert_eq!(config.registry.max_entries, 42);
        assert_eq!(config.maintenance.sweep_one_in, 1);
        assert_eq!(config.risk, crate::RiskConfig::default());
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path());
        fs::write(paths.config_file(), "[risk]\nescalation_threshold = \"high\"\n").unwrap();

        assert_eq!(load_config(&paths), GuardConfig::default());
        assert!(load_from_file(paths.config_file()).is_err());
    }
}
