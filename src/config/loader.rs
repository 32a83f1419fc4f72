//! Configuration Loader
//!
//! Environment-aware configuration loading. Discovers the base file and the
//! environment override file, layers environment variables on top, and validates the
//! merged result.

use super::error::{ConfigResult, ConfigurationError};
use super::ReliabilityConfig;
use config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Base name of configuration files in the configuration directory
const CONFIG_FILE_STEM: &str = "reliability";

/// Extensions probed for each configuration layer, in order
const CONFIG_EXTENSIONS: [&str; 4] = ["yaml", "yml", "toml", "json"];

/// Loaded, validated configuration plus where it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: ReliabilityConfig,
    environment: String,
    config_directory: PathBuf,
    loaded_files: Vec<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        if config_directory.exists() && !config_directory.is_dir() {
            return Err(ConfigurationError::file_read_error(
                config_directory.display().to_string(),
                "configuration path is not a directory",
            ));
        }

        let mut loaded_files = Vec::new();
        let mut builder = Config::builder();

        if let Some(base) = Self::find_config_file(&config_directory, CONFIG_FILE_STEM) {
            debug!("Found configuration file: {}", base.display());
            builder = builder.add_source(File::from(base.clone()));
            loaded_files.push(base);
        }

        let override_stem = format!("{CONFIG_FILE_STEM}.{environment}");
        if let Some(overrides) = Self::find_config_file(&config_directory, &override_stem) {
            debug!(
                "Applying environment-specific overrides for {}: {}",
                environment,
                overrides.display()
            );
            builder = builder.add_source(File::from(overrides.clone()));
            loaded_files.push(overrides);
        }

        builder = builder.add_source(
            Environment::with_prefix("RELIABILITY")
                .separator("__")
                .try_parsing(true),
        );

        let config: ReliabilityConfig = builder
            .build()
            .map_err(|e| ConfigurationError::environment_config_error(environment, e))?
            .try_deserialize()?;

        // Validate the loaded configuration
        config.validate()?;

        info!(
            environment = %environment,
            config_directory = %config_directory.display(),
            files = loaded_files.len(),
            telemetry_enabled = config.telemetry.enabled,
            fault_injection_enabled = config.fault_injection.enabled,
            "⚙️ Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
            loaded_files,
        }))
    }

    /// Wrap an already-built configuration, validating it first
    pub fn from_config(
        config: ReliabilityConfig,
        environment: impl Into<String>,
    ) -> ConfigResult<ConfigManager> {
        config.validate()?;
        Ok(ConfigManager {
            config,
            environment: environment.into(),
            config_directory: PathBuf::from("config"),
            loaded_files: Vec::new(),
        })
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &ReliabilityConfig {
        &self.config
    }

    /// Loaded configuration as JSON, for debugging
    pub fn debug_config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null)
    }

    /// Get the current environment
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Get the configuration directory
    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Files that contributed to this configuration, base first
    pub fn loaded_files(&self) -> &[PathBuf] {
        &self.loaded_files
    }

    /// Resolve a path relative to the configuration directory
    pub fn resolve_config_path<P: AsRef<Path>>(&self, relative_path: P) -> PathBuf {
        self.config_directory.join(relative_path)
    }

    /// Detect current environment from environment variables
    pub fn detect_environment() -> String {
        crate::logging::get_environment().to_lowercase()
    }

    /// Default configuration directory: `RELIABILITY_CONFIG_DIR`, else `./config`
    fn default_config_directory() -> PathBuf {
        env::var("RELIABILITY_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }

    /// Find `{stem}.{ext}` for the first supported extension present
    fn find_config_file(config_directory: &Path, stem: &str) -> Option<PathBuf> {
        CONFIG_EXTENSIONS
            .iter()
            .map(|ext| config_directory.join(format!("{stem}.{ext}")))
            .find(|path| path.is_file())
    }
}
