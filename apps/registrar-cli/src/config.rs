use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Resolved runtime settings.
///
/// Precedence: command-line flags, then the YAML file, then built-in
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub data_file: PathBuf,
    pub backup_dir: PathBuf,
    pub seed_demo: bool,
    pub save_on_exit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("university.dat"),
            backup_dir: PathBuf::from("."),
            seed_demo: true,
            save_on_exit: true,
        }
    }
}

/// Values given on the command line. `None` leaves the lower layer alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data_file: Option<PathBuf>,
    pub backup_dir: Option<PathBuf>,
    pub no_seed: bool,
    pub save_on_exit: Option<bool>,
}

impl Config {
    /// Parse a YAML document. Missing keys take their defaults.
    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        // An empty document deserializes as unit, not as a map
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("invalid config")
    }

    /// Read and parse a YAML config file.
    pub fn from_yaml_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Build the effective config from an optional file plus overrides.
    pub fn resolve(file: Option<&Path>, overrides: Overrides) -> anyhow::Result<Self> {
        let mut config = match file {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        if let Some(data_file) = overrides.data_file {
            config.data_file = data_file;
        }
        if let Some(backup_dir) = overrides.backup_dir {
            config.backup_dir = backup_dir;
        }
        if overrides.no_seed {
            config.seed_demo = false;
        }
        if let Some(save_on_exit) = overrides.save_on_exit {
            config.save_on_exit = save_on_exit;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let config = Config::resolve(None, Overrides::default()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.data_file, PathBuf::from("university.dat"));
        assert!(config.seed_demo);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = Config::from_yaml_str("data_file: /var/lib/reg.dat\n").unwrap();
        assert_eq!(config.data_file, PathBuf::from("/var/lib/reg.dat"));
        assert_eq!(config.backup_dir, PathBuf::from("."));
        assert!(config.save_on_exit);
        assert_eq!(Config::from_yaml_str("").unwrap(), Config::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_yaml_str("data_fiel: x.dat\n").is_err());
    }

    #[test]
    fn flags_override_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("registrar.yaml");
        std::fs::write(&path, "data_file: from_file.dat\nbackup_dir: backups\nseed_demo: true\n").unwrap();

        let config = Config::resolve(
            Some(&path),
            Overrides {
                data_file: Some("from_flag.dat".into()),
                no_seed: true,
                ..Overrides::default()
            },
        )
        .unwrap();
        assert_eq!(config.data_file, PathBuf::from("from_flag.dat"));
        assert_eq!(config.backup_dir, PathBuf::from("backups"));
        assert!(!config.seed_demo);
    }

    #[test]
    fn missing_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Config::resolve(Some(&tmp.path().join("nope.yaml")), Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("nope.yaml"));
    }
}
