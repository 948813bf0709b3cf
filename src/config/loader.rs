//! Configuration Loader
//!
//! Environment-aware layering of dataset settings: an optional file followed by
//! prefixed environment variables, validated before it is handed out.

use ::config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::DatasetConfig;
use crate::constants::env as env_names;
use crate::error::Result;

/// Builds a [`DatasetConfig`] from layered sources
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            file: None,
            env_prefix: env_names::CONFIG_PREFIX.to_string(),
        }
    }

    /// Read settings from this file; the format is picked by extension
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Override the environment prefix (`IMDB` by default)
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Merge all sources and validate the result
    pub fn load(&self) -> Result<DatasetConfig> {
        let environment = detect_environment();
        debug!(
            environment = %environment,
            file = ?self.file,
            env_prefix = %self.env_prefix,
            "Loading dataset configuration"
        );

        let mut builder = Config::builder();
        if let Some(path) = &self.file {
            builder = builder.add_source(File::from(path.as_path()).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .try_parsing(true),
        );

        let config: DatasetConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        debug!(
            name = %config.name,
            data_dir = %config.data_dir.display(),
            batch_size = config.batch_size,
            processes = config.processes,
            shuffle = config.shuffle,
            "Dataset configuration loaded"
        );
        Ok(config)
    }
}

/// Current environment name, lowercased
pub fn detect_environment() -> String {
    env::var(env_names::ENVIRONMENT)
        .or_else(|_| env::var(env_names::APP_ENVIRONMENT))
        .unwrap_or_else(|_| env_names::DEFAULT_ENVIRONMENT.to_string())
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DatasetError;
    use std::io::Write;

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "name = \"voc_2007_test\"\ndata_dir = \"/data/voc\"\nbatch_size = 16\nshuffle = false"
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_env_prefix("IMDB_LOADER_TOML_TEST")
            .with_file(&path)
            .load()
            .unwrap();

        assert_eq!(config.name, "voc_2007_test");
        assert_eq!(config.data_dir, PathBuf::from("/data/voc"));
        assert_eq!(config.batch_size, 16);
        assert!(!config.shuffle);
        assert_eq!(config.processes, 3);
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.json");
        std::fs::write(
            &path,
            r#"{"name": "kitti", "data_dir": "/data/kitti", "batch_size": 2}"#,
        )
        .unwrap();

        env::set_var("IMDB_LOADER_ENV_TEST_BATCH_SIZE", "32");
        env::set_var("IMDB_LOADER_ENV_TEST_SEED", "7");
        let config = ConfigLoader::new()
            .with_env_prefix("IMDB_LOADER_ENV_TEST")
            .with_file(&path)
            .load()
            .unwrap();
        env::remove_var("IMDB_LOADER_ENV_TEST_BATCH_SIZE");
        env::remove_var("IMDB_LOADER_ENV_TEST_SEED");

        assert_eq!(config.name, "kitti");
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_missing_required_fields_fail() {
        let err = ConfigLoader::new()
            .with_env_prefix("IMDB_LOADER_EMPTY_TEST")
            .load()
            .unwrap_err();
        assert!(matches!(err, DatasetError::Config(_)));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.toml");
        std::fs::write(&path, "name = \"voc\"\ndata_dir = \"/data\"\nprocesses = 0\n").unwrap();

        let err = ConfigLoader::new()
            .with_env_prefix("IMDB_LOADER_INVALID_TEST")
            .with_file(&path)
            .load()
            .unwrap_err();
        assert!(matches!(err, DatasetError::Configuration(_)));
    }
}
