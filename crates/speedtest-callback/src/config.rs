//! Callback service configuration
//!
//! Hosts usually embed [`CallbackConfig`] in their own config file (it is
//! `Deserialize`); the standalone binary reads it from `SPEEDTEST_*`
//! environment variables.

use serde::Deserialize;
use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;

use speedtest_core::{InvitationTemplates, SigningKey};

use crate::error::ConfigError;
use crate::router::CorsPolicy;

pub const ENV_BIND: &str = "SPEEDTEST_BIND";
pub const ENV_PORT: &str = "SPEEDTEST_PORT";
pub const ENV_ALLOW_ORIGIN: &str = "SPEEDTEST_ALLOW_ORIGIN";
pub const ENV_KEY_WEB: &str = "SPEEDTEST_KEY_WEB";
pub const ENV_KEY_PLUGIN: &str = "SPEEDTEST_KEY_PLUGIN";
pub const ENV_ENTRY_POINT: &str = "SPEEDTEST_ENTRY_POINT";
pub const ENV_CALLBACK_POINT: &str = "SPEEDTEST_CALLBACK_POINT";
pub const ENV_INVITATION_TTL: &str = "SPEEDTEST_INVITATION_TTL_SECS";

/// Settings for the callback listener and invitation issuer
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackConfig {
    /// Address to bind (default: all IPv4 interfaces)
    #[serde(default = "default_bind")]
    pub bind: IpAddr,

    /// Port to bind; 0 picks an ephemeral port
    #[serde(default)]
    pub port: u16,

    /// Value of `Access-Control-Allow-Origin`
    #[serde(default = "default_allow_origin")]
    pub allow_origin: String,

    /// Verifies results posted by the web front-end
    pub key_web: SigningKey,

    /// Signs invitations and verifies them when they come back
    pub key_plugin: SigningKey,

    /// Speed-test front-end URL
    pub entry_point: String,

    /// Callback URL with a `{port}` placeholder
    pub callback_point: String,

    /// Invitation lifetime; invitations never expire when unset
    #[serde(default)]
    pub invitation_ttl_secs: Option<u64>,
}

fn default_bind() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_allow_origin() -> String {
    "*".to_string()
}

impl CallbackConfig {
    /// Minimal configuration with defaults for everything optional
    pub fn new(
        key_web: impl Into<SigningKey>,
        key_plugin: impl Into<SigningKey>,
        templates: InvitationTemplates,
    ) -> Self {
        Self {
            bind: default_bind(),
            port: 0,
            allow_origin: default_allow_origin(),
            key_web: key_web.into(),
            key_plugin: key_plugin.into(),
            entry_point: templates.entry_point,
            callback_point: templates.callback_point,
            invitation_ttl_secs: None,
        }
    }

    /// Read `SPEEDTEST_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any name → value lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let config = Self {
            bind: parse_or(&lookup, ENV_BIND, default_bind())?,
            port: parse_or(&lookup, ENV_PORT, 0)?,
            allow_origin: lookup(ENV_ALLOW_ORIGIN).unwrap_or_else(default_allow_origin),
            key_web: SigningKey::from(required(ENV_KEY_WEB)?),
            key_plugin: SigningKey::from(required(ENV_KEY_PLUGIN)?),
            entry_point: required(ENV_ENTRY_POINT)?,
            callback_point: required(ENV_CALLBACK_POINT)?,
            invitation_ttl_secs: lookup(ENV_INVITATION_TTL)
                .map(|v| parse(ENV_INVITATION_TTL, &v))
                .transpose()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key_web.is_empty() {
            return Err(ConfigError::EmptyKey(ENV_KEY_WEB));
        }
        if self.key_plugin.is_empty() {
            return Err(ConfigError::EmptyKey(ENV_KEY_PLUGIN));
        }
        self.cors()?;
        self.templates().validate()?;
        Ok(())
    }

    /// Response headers built from `allow_origin`
    pub fn cors(&self) -> Result<CorsPolicy, ConfigError> {
        CorsPolicy::new(&self.allow_origin).map_err(|e| ConfigError::Invalid {
            name: ENV_ALLOW_ORIGIN,
            message: e.to_string(),
        })
    }

    pub fn templates(&self) -> InvitationTemplates {
        InvitationTemplates::new(&self.entry_point, &self.callback_point)
    }

    pub fn invitation_ttl(&self) -> Option<chrono::Duration> {
        self.invitation_ttl_secs
            .and_then(|secs| chrono::Duration::from_std(Duration::from_secs(secs)).ok())
    }
}

fn parse<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        message: e.to_string(),
    })
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(value) => parse(name, &value),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            (ENV_KEY_WEB, "web"),
            (ENV_KEY_PLUGIN, "plugin"),
            (ENV_ENTRY_POINT, "https://speedtest.example.com/"),
            (ENV_CALLBACK_POINT, "http://play.example.com:{port}/"),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = CallbackConfig::from_lookup(lookup_from(&minimal())).unwrap();

        assert_eq!(config.bind, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.port, 0);
        assert_eq!(config.allow_origin, "*");
        assert!(config.invitation_ttl().is_none());
        assert_eq!(config.templates().callback_url(25565), "http://play.example.com:25565/");
    }

    #[test]
    fn test_overrides() {
        let mut pairs = minimal();
        pairs.push((ENV_PORT, "8123"));
        pairs.push((ENV_BIND, "127.0.0.1"));
        pairs.push((ENV_ALLOW_ORIGIN, "https://speedtest.example.com"));
        pairs.push((ENV_INVITATION_TTL, "600"));

        let config = CallbackConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.port, 8123);
        assert_eq!(config.bind, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.allow_origin, "https://speedtest.example.com");
        assert_eq!(config.invitation_ttl(), Some(chrono::Duration::minutes(10)));
    }

    #[test]
    fn test_missing_key() {
        let pairs: Vec<_> = minimal().into_iter().filter(|(k, _)| *k != ENV_KEY_WEB).collect();
        let err = CallbackConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ENV_KEY_WEB)));
    }

    #[test]
    fn test_empty_key() {
        let mut pairs = minimal();
        pairs[1] = (ENV_KEY_PLUGIN, "");
        let err = CallbackConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyKey(ENV_KEY_PLUGIN)));
    }

    #[test]
    fn test_bad_allow_origin() {
        let mut pairs = minimal();
        pairs.push((ENV_ALLOW_ORIGIN, "https://a.example.com\nX-Injected: 1"));
        let err = CallbackConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: ENV_ALLOW_ORIGIN, .. }));
    }

    #[test]
    fn test_bad_port() {
        let mut pairs = minimal();
        pairs.push((ENV_PORT, "70000"));
        let err = CallbackConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: ENV_PORT, .. }));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: CallbackConfig = serde_json::from_value(serde_json::json!({
            "key_web": "web",
            "key_plugin": "plugin",
            "entry_point": "https://speedtest.example.com/",
            "callback_point": "http://play.example.com:{port}/",
        }))
        .unwrap();

        assert_eq!(config.port, 0);
        assert_eq!(config.allow_origin, "*");
        assert_eq!(config.key_web, SigningKey::from("web"));
        config.validate().unwrap();
    }
}
