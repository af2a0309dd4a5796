//! Configuration for the QRM service: loaded from a YAML file and overlaid
//! with `QRM__*` environment variables.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Helps serde default a bool to false
fn default_false() -> bool {
    false
}

/// Helps serde default the redis connection pool size
fn default_pool_size() -> u32 {
    10
}

/// Helps serde default the qrm namespace
fn default_namespace() -> String {
    "qrm".to_owned()
}

/// Helps serde default the bind interface
fn default_interface() -> String {
    "0.0.0.0".to_owned()
}

/// Helps serde default the bind port
fn default_port() -> u16 {
    8080
}

/// Helps serde default the readiness/pub-sub polling interval
fn default_poll_interval_ms() -> u64 {
    100
}

/// The log level to use
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema)]
pub enum LogLevel {
    /// Do not log any info
    Off,
    /// Log at the error level
    Error,
    /// Log at the warning level
    Warn,
    /// Only setup and up info
    Setup,
    /// Log at the info level
    Info,
    /// Log at the debug level
    Debug,
    /// Log at the tracing level
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl LogLevel {
    /// Cast this log level to a tracing filter
    #[must_use]
    pub fn to_filter(self) -> tracing::metadata::LevelFilter {
        match self {
            LogLevel::Off => tracing_subscriber::filter::LevelFilter::OFF,
            LogLevel::Error => tracing_subscriber::filter::LevelFilter::ERROR,
            LogLevel::Warn | LogLevel::Setup => tracing_subscriber::filter::LevelFilter::WARN,
            LogLevel::Info => tracing_subscriber::filter::LevelFilter::INFO,
            LogLevel::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
            LogLevel::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Setup => "setup",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        write!(f, "{name}")
    }
}

/// Settings for sending traces to stdout
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct TracingLocal {
    /// The log level to use for stdout
    #[serde(default)]
    pub level: LogLevel,
}

impl Default for TracingLocal {
    fn default() -> Self {
        TracingLocal {
            level: LogLevel::Info,
        }
    }
}

/// The different settings for external tracing services
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
pub enum TracingServices {
    /// send traces to a gRPC/OTLP collector
    #[serde(alias = "grpc")]
    Grpc { endpoint: String, level: LogLevel },
}

/// The tracing settings to use
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema, Default)]
pub struct Tracing {
    /// The settings for sending traces to an external service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<TracingServices>,
    /// The settings for sending traces to stdout
    #[serde(default)]
    pub local: TracingLocal,
}

/// Cors settings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct Cors {
    /// Whether to allow CORS requests from any domain
    #[serde(default = "default_false")]
    pub insecure: bool,
    /// The domains to allow cross origin requests from
    #[serde(default)]
    pub domains: Vec<String>,
}

impl Default for Cors {
    fn default() -> Self {
        Cors {
            insecure: false,
            domains: Vec::new(),
        }
    }
}

/// Redis connection settings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct Redis {
    /// The host redis is reachable at
    pub host: String,
    /// The port redis is bound to
    #[serde(default = "default_redis_port")]
    pub port: u16,
    /// The number of connections to keep in the pool
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    /// A username to use if redis has authentication enabled
    #[serde(default)]
    pub username: Option<String>,
    /// A password to use if redis has authentication enabled
    #[serde(default)]
    pub password: Option<String>,
}

fn default_redis_port() -> u16 {
    6379
}

/// Settings for the optional background reaper that cancels stale
/// auto-managed tokens
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct AutoManagedTokenReaper {
    /// Whether the reaper task is spawned at startup
    #[serde(default = "default_false")]
    pub enabled: bool,
    /// How often to scan for stale tokens
    #[serde(default = "default_reaper_interval")]
    pub interval_secs: u64,
    /// How long a token may go without a last-seen update before it is
    /// considered stale and canceled
    #[serde(default = "default_reaper_stale")]
    pub stale_secs: u64,
}

fn default_reaper_interval() -> u64 {
    60
}

fn default_reaper_stale() -> u64 {
    600
}

impl Default for AutoManagedTokenReaper {
    fn default() -> Self {
        AutoManagedTokenReaper {
            enabled: false,
            interval_secs: default_reaper_interval(),
            stale_secs: default_reaper_stale(),
        }
    }
}

/// The QRM specific settings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct Qrm {
    /// The interface to bind our HTTP server to
    #[serde(default = "default_interface")]
    pub interface: String,
    /// The port to bind our HTTP server to
    #[serde(default = "default_port")]
    pub port: u16,
    /// The namespace to prefix all of our redis keys with
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Whether resources move to `pending` when a new token takes them over
    #[serde(default = "default_false")]
    pub use_pending_logic: bool,
    /// How often the readiness/pub-sub loop polls, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Settings for the background auto-managed-token reaper
    #[serde(default)]
    pub auto_managed_token_reaper: AutoManagedTokenReaper,
    /// Our cors settings
    #[serde(default)]
    pub cors: Cors,
    /// Our tracing settings
    #[serde(default)]
    pub tracing: Tracing,
}

impl Default for Qrm {
    fn default() -> Self {
        Qrm {
            interface: default_interface(),
            port: default_port(),
            namespace: default_namespace(),
            use_pending_logic: false,
            poll_interval_ms: default_poll_interval_ms(),
            auto_managed_token_reaper: AutoManagedTokenReaper::default(),
            cors: Cors::default(),
            tracing: Tracing::default(),
        }
    }
}

/// The top level QRM configuration
#[derive(Serialize, Deserialize, Debug, Clone, JsonSchema)]
pub struct Conf {
    /// The QRM specific settings
    #[serde(default)]
    pub qrm: Qrm,
    /// Redis settings
    pub redis: Redis,
}

impl Conf {
    /// Creates a new [`Conf`] object
    ///
    /// # Arguments
    ///
    /// * `path` - The path to use when reading the config file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            // load from a file first
            .add_source(config::File::from(path.as_ref()).format(config::FileFormat::Yaml))
            // then overlay any environment args ontop
            .add_source(
                config::Environment::with_prefix("qrm")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    /// Override the redis key namespace this config will use
    #[must_use]
    pub fn namespace<T: Into<String>>(mut self, namespace: T) -> Self {
        self.qrm.namespace = namespace.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_to_filter_orders_sensibly() {
        assert_eq!(LogLevel::Off.to_filter(), tracing::metadata::LevelFilter::OFF);
        assert_eq!(LogLevel::Trace.to_filter(), tracing::metadata::LevelFilter::TRACE);
    }

    #[test]
    fn qrm_defaults_are_sane() {
        let qrm = Qrm::default();
        assert_eq!(qrm.port, 8080);
        assert_eq!(qrm.namespace, "qrm");
        assert!(!qrm.use_pending_logic);
    }
}
