//! Configuration types for page-relay

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, time::Duration};
use utoipa::ToSchema;

/// Outbound fetch behavior (client identity, timeouts, accepted documents)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct FetchConfig {
    /// User-Agent sent with every outbound request (default: "ContentDownloader/1.0")
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum time to establish the outbound connection, in seconds (default: 10)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub connect_timeout: Duration,

    /// Upper bound on the whole request including the body, in seconds (default: none)
    #[serde(default, with = "optional_duration_serde")]
    #[schema(value_type = Option<u64>)]
    pub request_timeout: Option<Duration>,

    /// Maximum wait for the next body chunk, in seconds (default: 30)
    ///
    /// Exceeding it fails the relay with a transfer error instead of hanging.
    #[serde(
        default = "default_idle_timeout",
        with = "optional_duration_serde"
    )]
    #[schema(value_type = Option<u64>)]
    pub idle_timeout: Option<Duration>,

    /// Maximum accepted body size in bytes (None = unlimited)
    ///
    /// The whole body is buffered before decoding, so this is the only bound on
    /// per-relay memory.
    #[serde(default)]
    pub max_body_bytes: Option<u64>,

    /// Media types accepted as hypertext (default: text/html, application/xhtml+xml)
    #[serde(default = "default_accepted_media_types")]
    pub accepted_media_types: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout: default_connect_timeout(),
            request_timeout: None,
            idle_timeout: default_idle_timeout(),
            max_body_bytes: None,
            accepted_media_types: default_accepted_media_types(),
        }
    }
}

/// Relay pipeline behavior
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RelayConfig {
    /// Capacity of each relay's event channel (default: 64)
    ///
    /// A full channel suspends the relay until the subscriber catches up; events
    /// are never dropped or merged.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Fail the relay when the body has invalid byte sequences (default: false)
    ///
    /// When disabled, invalid sequences are replaced with U+FFFD.
    #[serde(default)]
    pub strict_decoding: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            event_buffer: default_event_buffer(),
            strict_decoding: false,
        }
    }
}

/// One keyword with the pages it points at
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CatalogEntry {
    /// Lower-case keyword
    pub keyword: String,
    /// Page addresses for the keyword, in display order
    pub urls: Vec<String>,
}

/// Keyword → URL catalog served by `GET /api/urls`
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CatalogConfig {
    /// Catalog entries, searched in order (default: built-in table)
    #[serde(default = "default_catalog_entries")]
    pub entries: Vec<CatalogEntry>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            entries: default_catalog_entries(),
        }
    }
}

/// API and external server integration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:5000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Main configuration for [`PageRelay`](crate::PageRelay)
///
/// Fields are organized into logical sub-configs:
/// - [`fetch`](FetchConfig) - outbound request behavior
/// - [`relay`](RelayConfig) - event channel and decoding policy
/// - [`catalog`](CatalogConfig) - keyword lookup table
/// - [`server`](ServerIntegrationConfig) - REST API
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Outbound fetch settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Relay pipeline settings
    #[serde(default)]
    pub relay: RelayConfig,

    /// Keyword catalog
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// API and external server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Load a configuration from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file '{}': {}", path.display(), e),
            ))
        })?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the relay cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.relay.event_buffer == 0 {
            return Err(Error::Config {
                message: "event buffer must hold at least one event".into(),
                key: Some("relay.event_buffer".into()),
            });
        }
        if self.fetch.user_agent.trim().is_empty() {
            return Err(Error::Config {
                message: "user agent must not be empty".into(),
                key: Some("fetch.user_agent".into()),
            });
        }
        if self.fetch.accepted_media_types.is_empty() {
            return Err(Error::Config {
                message: "at least one accepted media type is required".into(),
                key: Some("fetch.accepted_media_types".into()),
            });
        }
        Ok(())
    }
}

// Default value functions
fn default_user_agent() -> String {
    "ContentDownloader/1.0".into()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_idle_timeout() -> Option<Duration> {
    Some(Duration::from_secs(30))
}

fn default_accepted_media_types() -> Vec<String> {
    vec!["text/html".into(), "application/xhtml+xml".into()]
}

fn default_event_buffer() -> usize {
    64
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

fn default_catalog_entries() -> Vec<CatalogEntry> {
    let entry = |keyword: &str, urls: &[&str]| CatalogEntry {
        keyword: keyword.into(),
        urls: urls.iter().map(|u| (*u).to_string()).collect(),
    };
    vec![
        entry(
            "авто",
            &[
                "https://www.autonews.ru/",
                "https://www.zr.ru/",
                "https://auto.ru/",
            ],
        ),
        entry(
            "игры",
            &[
                "https://store.steampowered.com/?l=russian",
                "https://stopgame.ru/",
            ],
        ),
        entry(
            "спорт",
            &[
                "https://www.sports.ru/",
                "https://www.championat.com/",
                "https://www.sport-express.ru/",
            ],
        ),
        entry(
            "кино",
            &[
                "https://www.kinopoisk.ru/",
                "https://www.imdb.com/",
                "https://www.film.ru/",
            ],
        ),
        entry(
            "музыка",
            &[
                "https://www.spotify.com/",
                "https://music.yandex.ru/",
                "https://www.apple.com/ru/apple-music/",
                "https://www.billboard.com/",
            ],
        ),
    ]
}

// Duration serialization helper (as seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
