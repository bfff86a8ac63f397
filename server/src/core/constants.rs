// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "otelbridge";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".otelbridge";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "otelbridge.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "OTELBRIDGE_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "OTELBRIDGE_HOST";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "OTELBRIDGE_LOG";

/// Environment variable for log output format (compact or json)
pub const ENV_LOG_FORMAT: &str = "OTELBRIDGE_LOG_FORMAT";

// =============================================================================
// Environment Variables - Receiver
// =============================================================================

/// Environment variable for the receiver instance name
pub const ENV_RECEIVER_NAME: &str = "OTELBRIDGE_RECEIVER_NAME";

/// Environment variable for the OTLP gRPC port
pub const ENV_GRPC_PORT: &str = "OTELBRIDGE_GRPC_PORT";

/// Environment variable for the maximum accepted gRPC message size
pub const ENV_MAX_MESSAGE_BYTES: &str = "OTELBRIDGE_MAX_MESSAGE_BYTES";

/// Environment variable for logging consumer verbosity
pub const ENV_VERBOSITY: &str = "OTELBRIDGE_VERBOSITY";

/// Environment variable for the Prometheus exposition port
pub const ENV_METRICS_PORT: &str = "OTELBRIDGE_METRICS_PORT";

// =============================================================================
// Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default receiver instance name
pub const DEFAULT_RECEIVER_NAME: &str = "otlp";

/// Default OTLP gRPC port
pub const DEFAULT_GRPC_PORT: u16 = 4317;

/// Default maximum decoded gRPC message size (4 MiB)
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;

// =============================================================================
// Shutdown
// =============================================================================

/// Maximum time to wait for background tasks during shutdown
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;
