//! Node configuration loading from file and environment variables.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use orb_observer::{MemPubSubConfig, ObserverConfig};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Top-level node configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub observer: ObserverSettings,

    #[serde(default)]
    pub pubsub: PubSubSettings,

    #[serde(default)]
    pub cas: CasConfig,

    #[serde(default)]
    pub outbox: OutboxConfig,

    #[serde(default)]
    pub protocol: ProtocolConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "orb_observer=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObserverSettings {
    /// Adds `https:<domain>:<canonical-reference>` to every anchored
    /// transaction's equivalent references.
    #[serde(default)]
    pub discovery_domain: Option<String>,
}

/// Broker tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct PubSubSettings {
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    #[serde(default = "default_redelivery_delay_ms")]
    pub redelivery_delay_ms: u64,

    #[serde(default = "default_max_redeliveries")]
    pub max_redeliveries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CasConfig {
    /// Base URL anchors are read from (`<url>/<cid>`).
    #[serde(default = "default_cas_url")]
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutboxConfig {
    /// ActivityPub outbox endpoint. Without one, acknowledgements are only
    /// logged.
    #[serde(default)]
    pub url: Option<String>,
}

/// Protocol versions per namespace.
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolConfig {
    #[serde(default = "default_namespaces")]
    pub namespaces: Vec<NamespaceConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NamespaceConfig {
    pub namespace: String,
    /// Genesis times of the protocol versions.
    pub versions: Vec<u64>,
}

/// DID resolution settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_resolver_namespace")]
    pub namespace: String,

    #[serde(default)]
    pub aliases: Vec<String>,

    /// Suffix prefix marking DIDs that were never published.
    #[serde(default = "default_unpublished_label")]
    pub unpublished_label: String,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "orb.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_buffer_size() -> usize {
    100
}

fn default_redelivery_delay_ms() -> u64 {
    1_000
}

fn default_max_redeliveries() -> u32 {
    10
}

fn default_cas_url() -> String {
    "http://127.0.0.1:3001/cas".to_string()
}

fn default_namespaces() -> Vec<NamespaceConfig> {
    vec![NamespaceConfig {
        namespace: "did:orb".to_string(),
        versions: vec![0],
    }]
}

fn default_resolver_namespace() -> String {
    "did:orb".to_string()
}

fn default_unpublished_label() -> String {
    "uAAA".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for PubSubSettings {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            redelivery_delay_ms: default_redelivery_delay_ms(),
            max_redeliveries: default_max_redeliveries(),
        }
    }
}

impl Default for CasConfig {
    fn default() -> Self {
        Self {
            url: default_cas_url(),
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            namespaces: default_namespaces(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            namespace: default_resolver_namespace(),
            aliases: Vec::new(),
            unpublished_label: default_unpublished_label(),
        }
    }
}

impl PubSubSettings {
    pub fn broker_config(&self) -> MemPubSubConfig {
        MemPubSubConfig {
            buffer_size: self.buffer_size,
            redelivery_delay: Duration::from_millis(self.redelivery_delay_ms),
            max_redeliveries: self.max_redeliveries,
        }
    }
}

impl ObserverSettings {
    pub fn observer_config(&self) -> ObserverConfig {
        ObserverConfig {
            discovery_domain: self.discovery_domain.clone(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `ORB_HOST` overrides `server.host`
/// - `ORB_PORT` overrides `server.port`
/// - `ORB_DB_PATH` overrides `database.path`
/// - `ORB_LOG_LEVEL` overrides `logging.level`
/// - `ORB_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `ORB_DISCOVERY_DOMAIN` overrides `observer.discovery_domain`
/// - `ORB_CAS_URL` overrides `cas.url`
/// - `ORB_OUTBOX_URL` overrides `outbox.url`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed, or
/// if an override or the merged result is invalid.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    if let Ok(host) = std::env::var("ORB_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("ORB_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(db_path) = std::env::var("ORB_DB_PATH") {
        config.database.path = db_path;
    }
    if let Ok(level) = std::env::var("ORB_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("ORB_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Ok(domain) = std::env::var("ORB_DISCOVERY_DOMAIN") {
        config.observer.discovery_domain = Some(domain).filter(|d| !d.is_empty());
    }
    if let Ok(url) = std::env::var("ORB_CAS_URL") {
        config.cas.url = url;
    }
    if let Ok(url) = std::env::var("ORB_OUTBOX_URL") {
        config.outbox.url = Some(url).filter(|u| !u.is_empty());
    }

    validate(&config)?;

    Ok(config)
}

impl CasConfig {
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        parse_url("cas.url", &self.url)
    }
}

impl OutboxConfig {
    pub fn endpoint(&self) -> Result<Option<Url>, ConfigError> {
        self.url
            .as_deref()
            .map(|url| parse_url("outbox.url", url))
            .transpose()
    }
}

fn parse_url(key: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::Invalid {
        key,
        reason: format!("{raw}: {e}"),
    })
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    config.cas.base_url()?;
    config.outbox.endpoint()?;

    config
        .observer
        .observer_config()
        .validate()
        .map_err(|e| ConfigError::Invalid {
            key: "observer.discovery_domain",
            reason: e.to_string(),
        })?;

    for ns in &config.protocol.namespaces {
        if ns.namespace.is_empty() || ns.versions.is_empty() {
            return Err(ConfigError::Invalid {
                key: "protocol.namespaces",
                reason: format!("namespace [{}] needs a name and at least one version", ns.namespace),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Some("/nonexistent/orb-config.toml")).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.path, "orb.db");
        assert_eq!(config.pubsub.buffer_size, 100);
        assert_eq!(config.protocol.namespaces, default_namespaces());
        assert_eq!(config.cas.base_url().unwrap().as_str(), "http://127.0.0.1:3001/cas");
        assert!(config.outbox.url.is_none());
    }

    #[test]
    fn parses_file_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 4000

[observer]
discovery_domain = "orb.domain1.com"

[pubsub]
redelivery_delay_ms = 50

[outbox]
url = "https://orb.domain1.com/services/orb/outbox"

[[protocol.namespaces]]
namespace = "did:orb"
versions = [0, 1000]

[resolver]
aliases = ["did:orb:orb.domain1.com"]
"#
        )
        .unwrap();

        let config = load_config(file.path().to_str()).unwrap();

        assert_eq!(config.server.port, 4000);
        assert_eq!(
            config.observer.discovery_domain.as_deref(),
            Some("orb.domain1.com")
        );
        assert_eq!(
            config.pubsub.broker_config().redelivery_delay,
            Duration::from_millis(50)
        );
        assert_eq!(config.pubsub.max_redeliveries, 10);
        assert_eq!(
            config.outbox.endpoint().unwrap().unwrap().path(),
            "/services/orb/outbox"
        );
        assert_eq!(config.protocol.namespaces[0].versions, [0, 1000]);
        assert_eq!(config.resolver.aliases, ["did:orb:orb.domain1.com"]);
        assert_eq!(config.resolver.unpublished_label, "uAAA");
    }

    #[test]
    fn rejects_blank_discovery_domain_and_empty_versions() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[observer]\ndiscovery_domain = \"orb domain\"").unwrap();
        assert!(matches!(
            load_config(file.path().to_str()),
            Err(ConfigError::Invalid { .. })
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[[protocol.namespaces]]\nnamespace = \"did:orb\"\nversions = []"
        )
        .unwrap();
        assert!(matches!(
            load_config(file.path().to_str()),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_unparseable_urls() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[outbox]\nurl = \"not a url\"").unwrap();

        match load_config(file.path().to_str()) {
            Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, "outbox.url"),
            other => panic!("expected invalid outbox url, got {other:?}"),
        }
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();

        assert!(matches!(
            load_config(file.path().to_str()),
            Err(ConfigError::Parse(_))
        ));
    }
}
