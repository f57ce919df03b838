//! Configuration loading from multiple sources

use crate::{AppConfig, ConfigError, Result};
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use std::path::Path;

/// Default environment variable prefix
pub const ENV_PREFIX: &str = "SCARLET";

fn env_source(prefix: &str) -> Environment {
    // Field names contain underscores, so sections are split on a double underscore:
    // SCARLET_EXECUTION__DEFAULT_RETRY_COUNT=-1
    Environment::with_prefix(prefix)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn format_for(path: &Path) -> Option<FileFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Some(FileFormat::Toml),
        Some("yaml") | Some("yml") => Some(FileFormat::Yaml),
        Some("json") => Some(FileFormat::Json),
        _ => None,
    }
}

/// Configuration loader with support for multiple formats and sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    ///
    /// Supports TOML, YAML, and JSON formats based on file extension
    pub fn from_file(path: &Path) -> Result<AppConfig> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::LoadError("No file extension found".to_string()))?;

        let content = std::fs::read_to_string(path)?;

        match extension {
            "toml" => Self::from_toml(&content),
            "yaml" | "yml" => Self::from_yaml(&content),
            "json" => Self::from_json(&content),
            _ => Err(ConfigError::LoadError(format!(
                "Unsupported file extension: {}",
                extension
            ))),
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<AppConfig> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration from YAML string
    pub fn from_yaml(content: &str) -> Result<AppConfig> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration from JSON string
    pub fn from_json(content: &str) -> Result<AppConfig> {
        serde_json::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration from environment variables with the `SCARLET` prefix
    pub fn from_env() -> Result<AppConfig> {
        Self::from_env_with_prefix(ENV_PREFIX)
    }

    /// Load configuration from environment variables with custom prefix
    ///
    /// Variables are named PREFIX_SECTION__KEY, for example
    /// `SCARLET_NETWORK__RPC_URL=http://localhost:8899`. Unset keys take their defaults.
    pub fn from_env_with_prefix(prefix: &str) -> Result<AppConfig> {
        let config = Config::builder().add_source(env_source(prefix)).build()?;

        config.try_deserialize().map_err(ConfigError::from)
    }

    /// Merge two configurations, with overlay taking precedence section by section
    ///
    /// A section equal to its default in the overlay does not replace the base.
    pub fn merge(base: AppConfig, overlay: AppConfig) -> AppConfig {
        fn pick<T: PartialEq + Default>(base: T, overlay: T) -> T {
            if overlay == T::default() {
                base
            } else {
                overlay
            }
        }

        AppConfig {
            network: pick(base.network, overlay.network),
            gateway: pick(base.gateway, overlay.gateway),
            fees: pick(base.fees, overlay.fees),
            priority_fee: pick(base.priority_fee, overlay.priority_fee),
            execution: pick(base.execution, overlay.execution),
            wallet: pick(base.wallet, overlay.wallet),
            storage: pick(base.storage, overlay.storage),
            logging: pick(base.logging, overlay.logging),
        }
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment keys override individual file keys; everything else keeps
    /// the file's value.
    pub fn from_file_with_env(path: &Path, env_prefix: &str) -> Result<AppConfig> {
        if format_for(path).is_none() {
            return Err(ConfigError::LoadError(format!(
                "Unsupported config file: {}",
                path.display()
            )));
        }

        Self::builder().add_file(path, true).add_env(env_prefix).build()
    }

    /// Build configuration using the config crate's builder pattern
    ///
    /// This allows for more complex configuration scenarios with multiple sources
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder {
            builder: Config::builder(),
            error: None,
        }
    }
}

/// Builder for complex configuration loading scenarios
pub struct ConfigLoaderBuilder {
    builder: ConfigBuilder<config::builder::DefaultState>,
    error: Option<ConfigError>,
}

impl ConfigLoaderBuilder {
    /// Add a configuration file source
    pub fn add_file(mut self, path: &Path, required: bool) -> Self {
        let format = format_for(path).unwrap_or(FileFormat::Toml);

        self.builder = self
            .builder
            .add_source(File::from(path).format(format).required(required));
        self
    }

    /// Add environment variable source with prefix
    pub fn add_env(mut self, prefix: &str) -> Self {
        self.builder = self.builder.add_source(env_source(prefix));
        self
    }

    /// Set a default value for a dotted key such as `execution.default_retry_count`
    ///
    /// An invalid key is reported by `build`.
    pub fn set_default(mut self, key: &str, value: &str) -> Self {
        if self.error.is_some() {
            return self;
        }

        match self.builder.clone().set_default(key, value) {
            Ok(builder) => self.builder = builder,
            Err(e) => self.error = Some(ConfigError::from(e)),
        }
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Result<AppConfig> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let config = self.builder.build()?;
        config.try_deserialize().map_err(ConfigError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageBackend;
    use std::io::Write;

    #[test]
    fn test_load_from_toml() {
        let toml = r#"
            [network]
            rpc_url = "http://localhost:8899"
            commitment = "finalized"

            [fees]
            platform_fee_bps = 30
            aggregator_share = "0.05"

            [execution]
            default_retry_count = -1
            rent_safety_margin = "0.01"

            [storage]
            backend = "sqlite"
            path = "/tmp/scarlet.db"
        "#;

        let config = ConfigLoader::from_toml(toml).unwrap();
        assert_eq!(config.network.rpc_url, "http://localhost:8899");
        assert_eq!(config.network.commitment, "finalized");
        assert_eq!(config.network.confirm_poll_initial_ms, 250);
        assert_eq!(config.fees.platform_fee_bps, 30);
        assert_eq!(config.fees.aggregator_share.to_string(), "0.05");
        assert_eq!(config.execution.default_retry_count, -1);
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.priority_fee.compute_unit_limit, 200_000);
    }

    #[test]
    fn test_load_from_yaml() {
        let yaml = r#"
gateway:
  base_url: "http://localhost:8080"
  timeout_ms: 5000

priority_fee:
  micro_lamports: 100000

logging:
  filter: debug
  json: true
        "#;

        let config = ConfigLoader::from_yaml(yaml).unwrap();
        assert_eq!(config.gateway.base_url, "http://localhost:8080");
        assert_eq!(config.gateway.timeout_ms, 5000);
        assert_eq!(config.priority_fee.micro_lamports, 100_000);
        assert!(config.logging.json);
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"
{
  "execution": {
    "default_retry_count": 5,
    "transient_delay_ms": 10,
    "bounded_delay_ms": 250,
    "portfolio_refresh_secs": 30
  },
  "wallet": {
    "secret_label": "main",
    "keypair_path": "/etc/scarlet/id.json"
  }
}
        "#;

        let config = ConfigLoader::from_json(json).unwrap();
        assert_eq!(config.execution.default_retry_count, 5);
        assert_eq!(config.execution.bounded_delay_ms, 250);
        assert_eq!(config.wallet.secret_label, "main");
        assert!(config.wallet.keypair_path.is_some());
        assert_eq!(config.network.commitment, "confirmed");
    }

    #[test]
    fn test_load_from_file() {
        let toml = r#"
[storage]
backend = "json"
path = "scarlet.json"
        "#;

        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(toml.as_bytes()).unwrap();

        let config = ConfigLoader::from_file(file.path()).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Json);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new()
            .suffix(".ini")
            .tempfile()
            .unwrap();
        assert!(matches!(
            ConfigLoader::from_file(file.path()),
            Err(ConfigError::LoadError(_))
        ));
    }

    #[test]
    fn test_merge_configs() {
        let mut base = AppConfig::default();
        base.network.rpc_url = "http://base:8899".to_string();
        base.logging.json = true;

        let mut overlay = AppConfig::default();
        overlay.network.rpc_url = "http://overlay:8899".to_string();

        let merged = ConfigLoader::merge(base, overlay);
        assert_eq!(merged.network.rpc_url, "http://overlay:8899");
        assert!(merged.logging.json);
    }

    #[test]
    fn test_builder_defaults_and_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .unwrap();
        file.write_all(br#"{"gateway": {"timeout_ms": 1000}}"#).unwrap();

        let config = ConfigLoader::builder()
            .set_default("execution.bounded_delay_ms", "500")
            .add_file(file.path(), true)
            .build()
            .unwrap();

        assert_eq!(config.gateway.timeout_ms, 1000);
        assert_eq!(config.execution.bounded_delay_ms, 500);
    }

    #[test]
    fn test_builder_missing_required_file() {
        let result = ConfigLoader::builder()
            .add_file(Path::new("/nonexistent/scarlet.toml"), true)
            .build();
        assert!(result.is_err());
    }
}
