//! Presenter configuration.
//!
//! Every setting has a default and can be overridden through a `WHISKERS_*`
//! environment variable. The binary loads `.env` first via dotenvy.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;
use whiskers_domain::{ChapterId, START_CHAPTER};
use whiskers_protocol::FeaturesEnabled;

pub const DEFAULT_BROKER_HOST: &str = "broker.emqx.io";
pub const DEFAULT_BROKER_PORT: u16 = 8083;
pub const DEFAULT_BROKER_SECURE_PORT: u16 = 8084;
pub const DEFAULT_BROKER_PATH: &str = "/mqtt";
pub const DEFAULT_SUBSCRIBE_TOPIC: &str = "catstory/orchestrator/to/presenter";
pub const DEFAULT_PUBLISH_TOPIC: &str = "catstory/presenter/to/orchestrator";
pub const DEFAULT_CLIENT_ID_PREFIX: &str = "CatStory_Presenter";

// Reconnection defaults
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3_000;
pub const DEFAULT_RECONNECT_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_MAX_RECONNECT_DELAY_MS: u64 = 30_000;
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_SUBSCRIBE_RETRY_DELAY_MS: u64 = 2_000;
pub const DEFAULT_SUBSCRIBE_MAX_RETRIES: u32 = 5;

// Media defaults
pub const DEFAULT_STOP_SETTLE_MS: u64 = 300;
pub const DEFAULT_PLACEHOLDER_AUDIO_MS: u64 = 30_000;
pub const DEFAULT_PLACEHOLDER_MINIGAME_MS: u64 = 20_000;
pub const DEFAULT_MINIGAME_LOAD_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MINIGAME_RETURN_DELAY_MS: u64 = 2_000;
pub const DEFAULT_CACHE_CAPACITY: usize = 16;
pub const DEFAULT_RESET_SETTLE_MS: u64 = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid broker URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Exponential reconnect policy.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            multiplier: DEFAULT_RECONNECT_MULTIPLIER,
            max_delay: Duration::from_millis(DEFAULT_MAX_RECONNECT_DELAY_MS),
            max_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    pub primary_url: String,
    /// Only set when it differs from the primary endpoint.
    pub fallback_url: Option<String>,
    pub subscribe_topic: String,
    pub publish_topic: String,
    pub client_id_prefix: String,
    pub connect_timeout: Duration,
    pub backoff: BackoffConfig,
    pub subscribe_retry_delay: Duration,
    pub subscribe_max_retries: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            primary_url: broker_url(DEFAULT_BROKER_HOST, DEFAULT_BROKER_PORT, false),
            fallback_url: None,
            subscribe_topic: DEFAULT_SUBSCRIBE_TOPIC.to_string(),
            publish_topic: DEFAULT_PUBLISH_TOPIC.to_string(),
            client_id_prefix: DEFAULT_CLIENT_ID_PREFIX.to_string(),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            backoff: BackoffConfig::default(),
            subscribe_retry_delay: Duration::from_millis(DEFAULT_SUBSCRIBE_RETRY_DELAY_MS),
            subscribe_max_retries: DEFAULT_SUBSCRIBE_MAX_RETRIES,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaConfig {
    pub audio_enabled: bool,
    pub minigames_enabled: bool,
    /// Pause after a full stop before the next session may load.
    pub stop_settle: Duration,
    pub placeholder_audio: Duration,
    pub placeholder_minigame: Duration,
    pub minigame_load_timeout: Duration,
    /// Delay between a minigame finishing and the story moving on.
    pub minigame_return_delay: Duration,
    pub cache_capacity: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            audio_enabled: false,
            minigames_enabled: true,
            stop_settle: Duration::from_millis(DEFAULT_STOP_SETTLE_MS),
            placeholder_audio: Duration::from_millis(DEFAULT_PLACEHOLDER_AUDIO_MS),
            placeholder_minigame: Duration::from_millis(DEFAULT_PLACEHOLDER_MINIGAME_MS),
            minigame_load_timeout: Duration::from_millis(DEFAULT_MINIGAME_LOAD_TIMEOUT_MS),
            minigame_return_delay: Duration::from_millis(DEFAULT_MINIGAME_RETURN_DELAY_MS),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PresenterConfig {
    pub channel: ChannelConfig,
    pub media: MediaConfig,
    pub start_chapter: ChapterId,
    pub development_mode: bool,
    pub reset_settle: Duration,
    pub story_path: PathBuf,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            channel: ChannelConfig::default(),
            media: MediaConfig::default(),
            start_chapter: ChapterId::from(START_CHAPTER),
            development_mode: true,
            reset_settle: Duration::from_millis(DEFAULT_RESET_SETTLE_MS),
            story_path: PathBuf::from("story.json"),
        }
    }
}

/// `ws[s]://<host>:<port>/mqtt`
pub fn broker_url(host: &str, port: u16, use_tls: bool) -> String {
    let scheme = if use_tls { "wss" } else { "ws" };
    format!("{scheme}://{host}:{port}{DEFAULT_BROKER_PATH}")
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Ignoring unparseable setting, using default");
                default
            }
        },
        None => default,
    }
}

fn millis(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Duration {
    Duration::from_millis(parsed(lookup, key, default))
}

impl PresenterConfig {
    /// Reads the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let use_tls = parsed(&lookup, "WHISKERS_USE_TLS", false);
        let port = if use_tls {
            parsed(&lookup, "WHISKERS_BROKER_SECURE_PORT", DEFAULT_BROKER_SECURE_PORT)
        } else {
            parsed(&lookup, "WHISKERS_BROKER_PORT", DEFAULT_BROKER_PORT)
        };
        let primary_host = text("WHISKERS_BROKER_HOST", DEFAULT_BROKER_HOST);
        let fallback_host = text("WHISKERS_FALLBACK_BROKER_HOST", &primary_host);

        let primary_url = broker_url(&primary_host, port, use_tls);
        let fallback_url = broker_url(&fallback_host, port, use_tls);
        let fallback_url = (fallback_url != primary_url).then_some(fallback_url);

        let channel = ChannelConfig {
            primary_url,
            fallback_url,
            subscribe_topic: text("WHISKERS_SUBSCRIBE_TOPIC", DEFAULT_SUBSCRIBE_TOPIC),
            publish_topic: text("WHISKERS_PUBLISH_TOPIC", DEFAULT_PUBLISH_TOPIC),
            client_id_prefix: text("WHISKERS_CLIENT_ID_PREFIX", DEFAULT_CLIENT_ID_PREFIX),
            connect_timeout: millis(&lookup, "WHISKERS_CONNECT_TIMEOUT_MS", DEFAULT_CONNECT_TIMEOUT_MS),
            backoff: BackoffConfig {
                max_attempts: parsed(
                    &lookup,
                    "WHISKERS_MAX_RECONNECT_ATTEMPTS",
                    DEFAULT_MAX_RECONNECT_ATTEMPTS,
                ),
                ..BackoffConfig::default()
            },
            ..defaults.channel
        };

        let media = MediaConfig {
            audio_enabled: parsed(&lookup, "WHISKERS_AUDIO_ENABLED", defaults.media.audio_enabled),
            minigames_enabled: parsed(
                &lookup,
                "WHISKERS_MINIGAMES_ENABLED",
                defaults.media.minigames_enabled,
            ),
            ..defaults.media
        };

        Self {
            channel,
            media,
            start_chapter: ChapterId::from(text("WHISKERS_START_CHAPTER", START_CHAPTER)),
            development_mode: parsed(&lookup, "WHISKERS_DEVELOPMENT_MODE", defaults.development_mode),
            reset_settle: defaults.reset_settle,
            story_path: lookup("WHISKERS_STORY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.story_path),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let channel = &self.channel;
        for url in std::iter::once(&channel.primary_url).chain(channel.fallback_url.iter()) {
            let parsed = Url::parse(url).map_err(|e| ConfigError::InvalidUrl {
                url: url.clone(),
                reason: e.to_string(),
            })?;
            if !matches!(parsed.scheme(), "ws" | "wss") {
                return Err(ConfigError::InvalidUrl {
                    url: url.clone(),
                    reason: "scheme must be ws or wss".to_string(),
                });
            }
            if parsed.host_str().map_or(true, str::is_empty) {
                return Err(ConfigError::Missing("WHISKERS_BROKER_HOST"));
            }
            if parsed.port() == Some(0) {
                return Err(ConfigError::InvalidValue {
                    key: "WHISKERS_BROKER_PORT",
                    reason: "port cannot be 0".to_string(),
                });
            }
        }
        if channel.subscribe_topic.trim().is_empty() {
            return Err(ConfigError::Missing("WHISKERS_SUBSCRIBE_TOPIC"));
        }
        if channel.publish_topic.trim().is_empty() {
            return Err(ConfigError::Missing("WHISKERS_PUBLISH_TOPIC"));
        }
        if self.start_chapter.as_str().trim().is_empty() {
            return Err(ConfigError::Missing("WHISKERS_START_CHAPTER"));
        }
        if channel.backoff.multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                key: "backoff multiplier",
                reason: "must be at least 1.0".to_string(),
            });
        }
        Ok(())
    }

    pub fn features(&self) -> FeaturesEnabled {
        FeaturesEnabled {
            audio: self.media.audio_enabled,
            minigames: self.media.minigames_enabled,
            story_engine: true,
        }
    }
}
