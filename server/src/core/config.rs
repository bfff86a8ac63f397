use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_GRPC_PORT, DEFAULT_HOST, DEFAULT_MAX_MESSAGE_BYTES,
    DEFAULT_RECEIVER_NAME,
};
use crate::domain::metrics::Verbosity;

// =============================================================================
// Log Format Enum
// =============================================================================

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single line
    #[default]
    Compact,
    /// Structured JSON lines
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Compact => write!(f, "compact"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
}

/// Receiver configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ReceiverFileConfig {
    pub name: Option<String>,
    pub grpc_port: Option<u16>,
    pub max_message_bytes: Option<usize>,
}

/// Consumer configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ConsumerFileConfig {
    pub verbosity: Option<Verbosity>,
}

/// Self-instrumentation configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ObservabilityFileConfig {
    pub metrics_port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub receiver: Option<ReceiverFileConfig>,
    pub consumer: Option<ConsumerFileConfig>,
    pub observability: Option<ObservabilityFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            if server.host.is_some() {
                tracing::trace!(host = ?server.host, "Merging server.host");
                current.host = server.host;
            }
        }

        if let Some(receiver) = other.receiver {
            let current = self
                .receiver
                .get_or_insert_with(ReceiverFileConfig::default);
            if receiver.name.is_some() {
                tracing::trace!(name = ?receiver.name, "Merging receiver.name");
                current.name = receiver.name;
            }
            if receiver.grpc_port.is_some() {
                tracing::trace!(port = ?receiver.grpc_port, "Merging receiver.grpc_port");
                current.grpc_port = receiver.grpc_port;
            }
            if receiver.max_message_bytes.is_some() {
                current.max_message_bytes = receiver.max_message_bytes;
            }
        }

        if let Some(consumer) = other.consumer {
            let current = self
                .consumer
                .get_or_insert_with(ConsumerFileConfig::default);
            if consumer.verbosity.is_some() {
                current.verbosity = consumer.verbosity;
            }
        }

        if let Some(observability) = other.observability {
            let current = self
                .observability
                .get_or_insert_with(ObservabilityFileConfig::default);
            if observability.metrics_port.is_some() {
                current.metrics_port = observability.metrics_port;
            }
        }
    }
}

// =============================================================================
// Runtime Config Structs (final merged configuration)
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
}

/// Receiver configuration
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    pub name: String,
    pub grpc_port: u16,
    pub max_message_bytes: usize,
}

/// Consumer configuration
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub verbosity: Verbosity,
}

/// Self-instrumentation configuration
#[derive(Debug, Clone, Default)]
pub struct ObservabilityConfig {
    /// Prometheus exposition port; `None` disables the endpoint
    pub metrics_port: Option<u16>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub receiver: ReceiverConfig,
    pub consumer: ConsumerConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.otelbridge/otelbridge.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        let overlay_path = if let Some(ref path) = cli.config {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Some(path.clone())
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        Self::from_layers(cli, file_config)
    }

    /// Layer configs: defaults -> file config -> CLI/env overrides
    fn from_layers(cli: &CliConfig, file_config: FileConfig) -> Result<Self> {
        let file_server = file_config.server.unwrap_or_default();
        let file_receiver = file_config.receiver.unwrap_or_default();
        let file_consumer = file_config.consumer.unwrap_or_default();
        let file_observability = file_config.observability.unwrap_or_default();

        let config = Self {
            server: ServerConfig {
                host: cli
                    .host
                    .clone()
                    .or(file_server.host)
                    .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            },
            receiver: ReceiverConfig {
                name: cli
                    .receiver_name
                    .clone()
                    .or(file_receiver.name)
                    .unwrap_or_else(|| DEFAULT_RECEIVER_NAME.to_string()),
                grpc_port: cli
                    .grpc_port
                    .or(file_receiver.grpc_port)
                    .unwrap_or(DEFAULT_GRPC_PORT),
                max_message_bytes: cli
                    .max_message_bytes
                    .or(file_receiver.max_message_bytes)
                    .unwrap_or(DEFAULT_MAX_MESSAGE_BYTES),
            },
            consumer: ConsumerConfig {
                verbosity: cli
                    .verbosity
                    .or(file_consumer.verbosity)
                    .unwrap_or_default(),
            },
            observability: ObservabilityConfig {
                metrics_port: cli.metrics_port.or(file_observability.metrics_port),
            },
        };

        config.validate()?;
        tracing::debug!(config = ?config, "Configuration loaded");
        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }
        if self.receiver.name.is_empty() {
            anyhow::bail!("Configuration error: receiver.name must not be empty");
        }
        if self.receiver.grpc_port == 0 {
            anyhow::bail!("Configuration error: receiver.grpc_port must be greater than 0");
        }
        if self.receiver.max_message_bytes == 0 {
            anyhow::bail!(
                "Configuration error: receiver.max_message_bytes must be greater than 0"
            );
        }
        if let Some(port) = self.observability.metrics_port {
            if port == 0 {
                anyhow::bail!(
                    "Configuration error: observability.metrics_port must be greater than 0"
                );
            }
            if port == self.receiver.grpc_port {
                anyhow::bail!(
                    "Configuration error: receiver.grpc_port ({}) and observability.metrics_port ({}) cannot be the same",
                    self.receiver.grpc_port,
                    port
                );
            }
        }
        Ok(())
    }
}

/// Get the profile config path (~/.otelbridge/otelbridge.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> FileConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_log_format_serde() {
        let format: LogFormat = serde_json::from_str(r#""json""#).unwrap();
        assert_eq!(format, LogFormat::Json);
        assert_eq!(LogFormat::Compact.to_string(), "compact");
    }

    #[test]
    fn test_file_config_parse_full() {
        let config = parse(
            r#"{
                "server": { "host": "0.0.0.0" },
                "receiver": { "name": "edge", "grpc_port": 4400, "max_message_bytes": 1024 },
                "consumer": { "verbosity": "detailed" },
                "observability": { "metrics_port": 9464 }
            }"#,
        );

        assert_eq!(
            config.server.as_ref().unwrap().host,
            Some("0.0.0.0".to_string())
        );
        let receiver = config.receiver.as_ref().unwrap();
        assert_eq!(receiver.name.as_deref(), Some("edge"));
        assert_eq!(receiver.grpc_port, Some(4400));
        assert_eq!(receiver.max_message_bytes, Some(1024));
        assert_eq!(
            config.consumer.as_ref().unwrap().verbosity,
            Some(Verbosity::Detailed)
        );
        assert_eq!(
            config.observability.as_ref().unwrap().metrics_port,
            Some(9464)
        );
    }

    #[test]
    fn test_file_config_parse_empty() {
        let config = parse("{}");
        assert!(config.server.is_none());
        assert!(config.receiver.is_none());
    }

    #[test]
    fn test_file_config_parse_extra_fields() {
        let config = parse(r#"{ "recever": { "name": "typo" } }"#);
        let extra = config.extra.as_object().unwrap();
        assert!(extra.contains_key("recever"));
    }

    #[test]
    fn test_file_config_merge() {
        let mut base = parse(r#"{ "receiver": { "name": "base", "grpc_port": 4400 } }"#);
        base.merge(parse(
            r#"{ "receiver": { "grpc_port": 4500 }, "server": { "host": "0.0.0.0" } }"#,
        ));

        let receiver = base.receiver.unwrap();
        assert_eq!(receiver.name.as_deref(), Some("base"));
        assert_eq!(receiver.grpc_port, Some(4500));
        assert_eq!(base.server.unwrap().host.as_deref(), Some("0.0.0.0"));
    }

    #[test]
    fn test_app_config_defaults() {
        let config = AppConfig::from_layers(&CliConfig::default(), FileConfig::default()).unwrap();

        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.receiver.name, DEFAULT_RECEIVER_NAME);
        assert_eq!(config.receiver.grpc_port, DEFAULT_GRPC_PORT);
        assert_eq!(config.receiver.max_message_bytes, DEFAULT_MAX_MESSAGE_BYTES);
        assert_eq!(config.consumer.verbosity, Verbosity::Basic);
        assert_eq!(config.observability.metrics_port, None);
    }

    #[test]
    fn test_app_config_cli_overrides_file() {
        let cli = CliConfig {
            grpc_port: Some(5000),
            verbosity: Some(Verbosity::Detailed),
            ..Default::default()
        };
        let file = parse(r#"{ "receiver": { "name": "edge", "grpc_port": 4400 } }"#);
        let config = AppConfig::from_layers(&cli, file).unwrap();

        assert_eq!(config.receiver.name, "edge");
        assert_eq!(config.receiver.grpc_port, 5000);
        assert_eq!(config.consumer.verbosity, Verbosity::Detailed);
    }

    #[test]
    fn test_file_config_load_and_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(
            &path,
            r#"{ "receiver": { "name": "from-file", "grpc_port": 4400 } }"#,
        )
        .unwrap();

        let file = FileConfig::load_from_file(&path).unwrap();
        let cli = CliConfig {
            grpc_port: Some(4500),
            ..Default::default()
        };
        let config = AppConfig::from_layers(&cli, file).unwrap();

        assert_eq!(config.receiver.name, "from-file");
        assert_eq!(config.receiver.grpc_port, 4500);
    }

    #[test]
    fn test_app_config_load_missing_path() {
        let cli = CliConfig {
            config: Some(PathBuf::from("/nonexistent/otelbridge.json")),
            ..Default::default()
        };
        let err = AppConfig::load(&cli).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_file_config_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = FileConfig::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_app_config_validation_grpc_port_zero() {
        let cli = CliConfig {
            grpc_port: Some(0),
            ..Default::default()
        };
        let err = AppConfig::from_layers(&cli, FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("receiver.grpc_port"));
    }

    #[test]
    fn test_app_config_validation_empty_name() {
        let cli = CliConfig {
            receiver_name: Some(String::new()),
            ..Default::default()
        };
        assert!(AppConfig::from_layers(&cli, FileConfig::default()).is_err());
    }

    #[test]
    fn test_app_config_validation_empty_host() {
        let cli = CliConfig {
            host: Some(String::new()),
            ..Default::default()
        };
        let err = AppConfig::from_layers(&cli, FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("server.host"));
    }

    #[test]
    fn test_app_config_validation_port_collision() {
        let cli = CliConfig {
            grpc_port: Some(4317),
            metrics_port: Some(4317),
            ..Default::default()
        };
        let err = AppConfig::from_layers(&cli, FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("cannot be the same"));
    }

    #[test]
    fn test_app_config_validation_zero_message_size() {
        let cli = CliConfig {
            max_message_bytes: Some(0),
            ..Default::default()
        };
        assert!(AppConfig::from_layers(&cli, FileConfig::default()).is_err());
    }
}
