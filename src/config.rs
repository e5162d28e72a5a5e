//! Application configuration.
//!
//! Host names and topics use fixed-capacity `heapless::String`s so the config
//! tree stays `Clone` without heap churn and has a hard upper bound on sizes.
//! The `with_*` builders truncate oversize values; [`Config::from_env`]
//! rejects them instead, since a silently shortened topic would subscribe to
//! the wrong channel.
//!
//! # Example
//!
//! ```rust
//! use parking_signal::config::{Config, MqttConfig, WebConfig};
//!
//! let config = Config::default()
//!     .with_mqtt(MqttConfig::default().with_host("10.0.0.5"))
//!     .with_web(WebConfig::default().with_port(8080).with_secret("hunter2"));
//!
//! assert_eq!(config.mqtt.host.as_str(), "10.0.0.5");
//! ```
//!
//! # Environment
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `MQTT_BROKER` | broker host | required |
//! | `MQTT_PORT` | broker port | `1883` |
//! | `MQTT_CLIENT_ID` | client id | `parking-signal` |
//! | `MQTT_USERNAME` / `MQTT_PASSWORD` | broker credentials | none |
//! | `EVENT_TOPIC` | detector event topic | `deepstream/car_count` |
//! | `COMMAND_TOPIC` | dashboard command topic | event topic |
//! | `TOTAL_TOPIC` | outbound total topic | `estacionamiento/total` |
//! | `ANNOUNCE_INTERVAL_MS` | periodic announce period | `5000` |
//! | `RECONNECT_BASE_MS` / `RECONNECT_MAX_MS` | reconnect backoff | `5000` / `60000` |
//! | `WARN_THRESHOLD` / `FULL_THRESHOLD` | signal thresholds | `30` / `35` |
//! | `WEB_PORT` | dashboard port | `5000` |
//! | `WEB_PASSWORD` | dashboard shared secret | required |

use core::str::FromStr;
use std::time::Duration;

use heapless::String as HString;
use thiserror::Error;

use crate::occupancy::{Thresholds, FULL_THRESHOLD, WARN_THRESHOLD};

/// Maximum length for short config strings (hostnames, client IDs)
pub const MAX_SHORT_STRING: usize = 64;

/// Maximum length for topic strings
pub const MAX_TOPIC_STRING: usize = 128;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

/// Type alias for topic strings
pub type TopicString = HString<MAX_TOPIC_STRING>;

/// Default detector event topic.
pub const DEFAULT_EVENT_TOPIC: &str = "deepstream/car_count";

/// Default outbound total topic.
pub const DEFAULT_TOTAL_TOPIC: &str = "estacionamiento/total";

// ============================================================================
// Errors
// ============================================================================

/// Configuration problems. All of them are fatal at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is absent or empty.
    #[error("{0} must be set")]
    Missing(&'static str),
    /// A variable could not be parsed or failed validation.
    #[error("invalid {var}={value:?}: {reason}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
        /// What was wrong.
        reason: &'static str,
    },
    /// A string value exceeds its fixed capacity.
    #[error("{var} is longer than {max} bytes")]
    TooLong {
        /// Variable name.
        var: &'static str,
        /// Capacity in bytes.
        max: usize,
    },
}

// ============================================================================
// Helpers for creating heapless strings
// ============================================================================

fn truncated<const N: usize>(s: &str) -> HString<N> {
    let mut hs = HString::new();
    for c in s.chars() {
        if hs.push(c).is_err() {
            break;
        }
    }
    hs
}

/// Create a ShortString from a &str, truncating at a char boundary if too long
pub fn short_string(s: &str) -> ShortString {
    truncated(s)
}

/// Create a TopicString from a &str, truncating at a char boundary if too long
pub fn topic_string(s: &str) -> TopicString {
    truncated(s)
}

fn bounded<const N: usize>(var: &'static str, s: &str) -> Result<HString<N>, ConfigError> {
    HString::try_from(s).map_err(|_| ConfigError::TooLong { var, max: N })
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Broker connection
    pub mqtt: MqttConfig,
    /// Topic names
    pub topics: TopicConfig,
    /// Reconnect backoff
    pub reconnect: ReconnectConfig,
    /// Thresholds and announce period
    pub signal: SignalConfig,
    /// Dashboard server
    pub web: WebConfig,
}

impl Config {
    /// Set MQTT configuration
    pub fn with_mqtt(mut self, mqtt: MqttConfig) -> Self {
        self.mqtt = mqtt;
        self
    }

    /// Set topic configuration
    pub fn with_topics(mut self, topics: TopicConfig) -> Self {
        self.topics = topics;
        self
    }

    /// Set reconnect configuration
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Set signal configuration
    pub fn with_signal(mut self, signal: SignalConfig) -> Self {
        self.signal = signal;
        self
    }

    /// Set web configuration
    pub fn with_web(mut self, web: WebConfig) -> Self {
        self.web = web;
        self
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup.
    ///
    /// Empty values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = get("MQTT_BROKER").ok_or(ConfigError::Missing("MQTT_BROKER"))?;
        let secret = get("WEB_PASSWORD").ok_or(ConfigError::Missing("WEB_PASSWORD"))?;

        let defaults = Config::default();

        let mut mqtt = MqttConfig {
            host: bounded("MQTT_BROKER", host.trim())?,
            port: parse_or("MQTT_PORT", get("MQTT_PORT"), defaults.mqtt.port)?,
            ..defaults.mqtt
        };
        if let Some(id) = get("MQTT_CLIENT_ID") {
            mqtt.client_id = bounded("MQTT_CLIENT_ID", &id)?;
        }
        if let Some(user) = get("MQTT_USERNAME") {
            mqtt.username = bounded("MQTT_USERNAME", &user)?;
            mqtt.password = bounded("MQTT_PASSWORD", &get("MQTT_PASSWORD").unwrap_or_default())?;
        }

        let events = match get("EVENT_TOPIC") {
            Some(t) => bounded("EVENT_TOPIC", &t)?,
            None => defaults.topics.events,
        };
        let commands = match get("COMMAND_TOPIC") {
            Some(t) => bounded("COMMAND_TOPIC", &t)?,
            None => events.clone(),
        };
        let total = match get("TOTAL_TOPIC") {
            Some(t) => bounded("TOTAL_TOPIC", &t)?,
            None => defaults.topics.total,
        };

        let reconnect = ReconnectConfig {
            base_ms: parse_or("RECONNECT_BASE_MS", get("RECONNECT_BASE_MS"), defaults.reconnect.base_ms)?,
            max_ms: parse_or("RECONNECT_MAX_MS", get("RECONNECT_MAX_MS"), defaults.reconnect.max_ms)?,
        };
        if reconnect.base_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "RECONNECT_BASE_MS",
                value: "0".into(),
                reason: "must be greater than zero",
            });
        }

        let signal = SignalConfig {
            warn_threshold: parse_or("WARN_THRESHOLD", get("WARN_THRESHOLD"), defaults.signal.warn_threshold)?,
            full_threshold: parse_or("FULL_THRESHOLD", get("FULL_THRESHOLD"), defaults.signal.full_threshold)?,
            announce_interval_ms: parse_or(
                "ANNOUNCE_INTERVAL_MS",
                get("ANNOUNCE_INTERVAL_MS"),
                defaults.signal.announce_interval_ms,
            )?,
        };
        if signal.warn_threshold > signal.full_threshold {
            return Err(ConfigError::Invalid {
                var: "WARN_THRESHOLD",
                value: signal.warn_threshold.to_string(),
                reason: "must not exceed FULL_THRESHOLD",
            });
        }
        if signal.announce_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "ANNOUNCE_INTERVAL_MS",
                value: "0".into(),
                reason: "must be greater than zero",
            });
        }

        let web = WebConfig {
            port: parse_or("WEB_PORT", get("WEB_PORT"), defaults.web.port)?,
            secret,
            ..defaults.web
        };

        Ok(Config {
            mqtt,
            topics: TopicConfig {
                events,
                commands,
                total,
            },
            reconnect,
            signal,
            web,
        })
    }
}

fn parse_or<T: FromStr>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            value,
            reason: "not a valid number",
        }),
    }
}

// ============================================================================
// MQTT Config
// ============================================================================

/// Broker connection configuration
#[derive(Clone, Debug)]
pub struct MqttConfig {
    /// Broker hostname or IP
    pub host: ShortString,
    /// Broker port
    pub port: u16,
    /// Client ID (should be unique per device)
    pub client_id: ShortString,
    /// Username for authentication (empty = no auth)
    pub username: ShortString,
    /// Password for authentication
    pub password: ShortString,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
    /// Upper bound on a single connection attempt, in seconds
    pub connect_timeout_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: short_string("localhost"),
            port: 1883,
            client_id: short_string("parking-signal"),
            username: ShortString::new(),
            password: ShortString::new(),
            keep_alive_secs: 60,
            connect_timeout_secs: 5,
        }
    }
}

impl MqttConfig {
    /// Set the broker host
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = short_string(host);
        self
    }

    /// Set the broker port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the client ID
    pub fn with_client_id(mut self, id: &str) -> Self {
        self.client_id = short_string(id);
        self
    }

    /// Set authentication credentials
    pub fn with_auth(mut self, username: &str, password: &str) -> Self {
        self.username = short_string(username);
        self.password = short_string(password);
        self
    }

    /// Set the keep-alive interval
    pub fn with_keep_alive_secs(mut self, secs: u16) -> Self {
        self.keep_alive_secs = secs;
        self
    }

    /// Check if authentication is configured
    pub fn has_auth(&self) -> bool {
        !self.username.is_empty()
    }
}

// ============================================================================
// Topic Config
// ============================================================================

/// Topic names for inbound events, dashboard commands and the outbound total
#[derive(Clone, Debug)]
pub struct TopicConfig {
    /// Detector events (free-form text)
    pub events: TopicString,
    /// Dashboard actions (`Entry`, `Exit`, `Reset`, `SetFull`)
    pub commands: TopicString,
    /// Outbound decimal count
    pub total: TopicString,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            events: topic_string(DEFAULT_EVENT_TOPIC),
            commands: topic_string(DEFAULT_EVENT_TOPIC),
            total: topic_string(DEFAULT_TOTAL_TOPIC),
        }
    }
}

impl TopicConfig {
    /// Set the event topic
    pub fn with_events(mut self, topic: &str) -> Self {
        self.events = topic_string(topic);
        self
    }

    /// Set the command topic
    pub fn with_commands(mut self, topic: &str) -> Self {
        self.commands = topic_string(topic);
        self
    }

    /// Set the total topic
    pub fn with_total(mut self, topic: &str) -> Self {
        self.total = topic_string(topic);
        self
    }

    /// Topics that must be subscribed on every (re)connect, deduplicated.
    pub fn subscriptions(&self) -> Vec<&str> {
        let mut topics = vec![self.events.as_str()];
        if self.commands != self.events {
            topics.push(self.commands.as_str());
        }
        topics
    }
}

// ============================================================================
// Reconnect Config
// ============================================================================

/// Reconnect backoff configuration
#[derive(Clone, Debug)]
pub struct ReconnectConfig {
    /// First delay after a drop, in milliseconds
    pub base_ms: u64,
    /// Delay cap, in milliseconds
    pub max_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_ms: 5_000,
            max_ms: 60_000,
        }
    }
}

impl ReconnectConfig {
    /// Set the base delay
    pub fn with_base_ms(mut self, ms: u64) -> Self {
        self.base_ms = ms;
        self
    }

    /// Set the delay cap
    pub fn with_max_ms(mut self, ms: u64) -> Self {
        self.max_ms = ms;
        self
    }

    /// Base delay as a `Duration`
    pub fn base(&self) -> Duration {
        Duration::from_millis(self.base_ms)
    }

    /// Delay cap as a `Duration`
    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}

// ============================================================================
// Signal Config
// ============================================================================

/// Occupancy thresholds and announce period
#[derive(Clone, Debug)]
pub struct SignalConfig {
    /// First count shown as yellow
    pub warn_threshold: u32,
    /// First count shown as red, and the value `SetFull` writes
    pub full_threshold: u32,
    /// Periodic total announce interval in milliseconds
    pub announce_interval_ms: u64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            warn_threshold: WARN_THRESHOLD,
            full_threshold: FULL_THRESHOLD,
            announce_interval_ms: 5_000,
        }
    }
}

impl SignalConfig {
    /// Set both thresholds
    pub fn with_thresholds(mut self, warn: u32, full: u32) -> Self {
        self.warn_threshold = warn;
        self.full_threshold = full;
        self
    }

    /// Set the announce interval
    pub fn with_announce_interval_ms(mut self, ms: u64) -> Self {
        self.announce_interval_ms = ms;
        self
    }

    /// Thresholds for the occupancy state
    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.warn_threshold, self.full_threshold)
    }

    /// Announce interval as a `Duration`
    pub fn announce_interval(&self) -> Duration {
        Duration::from_millis(self.announce_interval_ms)
    }
}

// ============================================================================
// Web Config
// ============================================================================

/// Dashboard server configuration
#[derive(Clone, Debug)]
pub struct WebConfig {
    /// Port to listen on
    pub port: u16,
    /// Shared secret required on API and viewer requests
    pub secret: String,
    /// Whether to enable CORS for all origins
    pub cors_permissive: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            secret: String::new(),
            cors_permissive: true,
        }
    }
}

impl WebConfig {
    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the shared secret
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }

    /// Set CORS mode
    pub fn with_cors(mut self, permissive: bool) -> Self {
        self.cors_permissive = permissive;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![("MQTT_BROKER", "mosquitto-broker"), ("WEB_PASSWORD", "s3cret")]
    }

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.keep_alive_secs, 60);
        assert_eq!(config.web.port, 5000);
        assert_eq!(config.topics.events.as_str(), "deepstream/car_count");
        assert_eq!(config.topics.total.as_str(), "estacionamiento/total");
        assert_eq!(config.reconnect.base(), Duration::from_secs(5));
        assert_eq!(config.reconnect.max(), Duration::from_secs(60));
        assert_eq!(config.signal.announce_interval(), Duration::from_secs(5));
        assert_eq!(config.signal.thresholds(), Thresholds::new(30, 35));
    }

    #[test]
    fn from_lookup_minimal() {
        let config = Config::from_lookup(lookup(&required())).unwrap();
        assert_eq!(config.mqtt.host.as_str(), "mosquitto-broker");
        assert_eq!(config.web.secret, "s3cret");
        assert_eq!(config.topics.commands, config.topics.events);
        assert_eq!(config.topics.subscriptions(), vec!["deepstream/car_count"]);
    }

    #[test]
    fn missing_broker_is_fatal() {
        let err = Config::from_lookup(lookup(&[("WEB_PASSWORD", "x")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("MQTT_BROKER"));
    }

    #[test]
    fn missing_secret_is_fatal() {
        let err = Config::from_lookup(lookup(&[("MQTT_BROKER", "h")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("WEB_PASSWORD"));
    }

    #[test]
    fn empty_secret_counts_as_missing() {
        let err =
            Config::from_lookup(lookup(&[("MQTT_BROKER", "h"), ("WEB_PASSWORD", "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("WEB_PASSWORD"));
    }

    #[test]
    fn invalid_port_rejected() {
        let mut vars = required();
        vars.push(("MQTT_PORT", "not-a-port"));
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "MQTT_PORT", .. }));
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let mut vars = required();
        vars.push(("WARN_THRESHOLD", "40"));
        vars.push(("FULL_THRESHOLD", "35"));
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "WARN_THRESHOLD", .. }));
    }

    #[test]
    fn overlong_topic_rejected_not_truncated() {
        let long = "t".repeat(MAX_TOPIC_STRING + 1);
        let mut vars = required();
        vars.push(("EVENT_TOPIC", long.as_str()));
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert_eq!(
            err,
            ConfigError::TooLong {
                var: "EVENT_TOPIC",
                max: MAX_TOPIC_STRING
            }
        );
    }

    #[test]
    fn separate_command_topic_is_subscribed() {
        let mut vars = required();
        vars.push(("COMMAND_TOPIC", "parking/commands"));
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(
            config.topics.subscriptions(),
            vec!["deepstream/car_count", "parking/commands"]
        );
    }

    #[test]
    fn overrides_applied() {
        let mut vars = required();
        vars.extend([
            ("MQTT_PORT", "8883"),
            ("TOTAL_TOPIC", "lot/total"),
            ("RECONNECT_BASE_MS", "1000"),
            ("RECONNECT_MAX_MS", "8000"),
            ("ANNOUNCE_INTERVAL_MS", "2500"),
            ("WEB_PORT", "8080"),
            ("MQTT_USERNAME", "lot"),
            ("MQTT_PASSWORD", "pw"),
        ]);
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.mqtt.port, 8883);
        assert!(config.mqtt.has_auth());
        assert_eq!(config.mqtt.password.as_str(), "pw");
        assert_eq!(config.topics.total.as_str(), "lot/total");
        assert_eq!(config.reconnect.base_ms, 1000);
        assert_eq!(config.reconnect.max_ms, 8000);
        assert_eq!(config.signal.announce_interval_ms, 2500);
        assert_eq!(config.web.port, 8080);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::default()
            .with_mqtt(MqttConfig::default().with_host("broker.local").with_port(8883))
            .with_topics(TopicConfig::default().with_total("lot/total"))
            .with_signal(SignalConfig::default().with_thresholds(8, 10))
            .with_web(WebConfig::default().with_port(3000).with_secret("pw"));

        assert_eq!(config.mqtt.host.as_str(), "broker.local");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.topics.total.as_str(), "lot/total");
        assert_eq!(config.signal.thresholds(), Thresholds::new(8, 10));
        assert_eq!(config.web.port, 3000);
        assert_eq!(config.web.secret, "pw");
    }

    #[test]
    fn short_string_truncation() {
        let long_input = "a".repeat(100);
        let s = short_string(&long_input);
        assert_eq!(s.len(), MAX_SHORT_STRING);
    }

    #[test]
    fn string_helpers_utf8_boundary() {
        let input = "ü".repeat(40); // 2 bytes each
        let s = short_string(&input);
        assert!(s.len() <= MAX_SHORT_STRING);
        assert!(core::str::from_utf8(s.as_bytes()).is_ok());
    }
}
