use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hashed NSEC3 owner names need 1 + 32 octets in front of the apex, which
/// leaves 222 octets of the 255 octet name limit for the apex itself
pub const DEFAULT_NSEC3_MAX_APEX_WIRE_LENGTH: usize = 222;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Whether the backend serves DNSKEY records straight from the zone data
    pub direct_dnskey: bool,

    /// Longest apex name (wire format) an NSEC3 zone may have
    pub nsec3_max_apex_wire_length: usize,

    /// Whether a missing TLSA target may be satisfied by a wildcard
    pub tlsa_wildcard_fallback: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            direct_dnskey: false,
            nsec3_max_apex_wire_length: DEFAULT_NSEC3_MAX_APEX_WIRE_LENGTH,
            tlsa_wildcard_fallback: true,
        }
    }
}

impl CheckConfig {
    /// Create a CheckConfig from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup, falling back to defaults
    /// for absent keys
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("CHECKZONE_DIRECT_DNSKEY") {
            config.direct_dnskey = parse_bool(&value, config.direct_dnskey);
        }

        if let Some(value) = lookup("CHECKZONE_NSEC3_MAX_APEX_WIRE_LENGTH") {
            config.nsec3_max_apex_wire_length =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: "CHECKZONE_NSEC3_MAX_APEX_WIRE_LENGTH".to_string(),
                        value: value.clone(),
                    })?;
        }

        if let Some(value) = lookup("CHECKZONE_TLSA_WILDCARD_FALLBACK") {
            config.tlsa_wildcard_fallback = parse_bool(&value, config.tlsa_wildcard_fallback);
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nsec3_max_apex_wire_length == 0 || self.nsec3_max_apex_wire_length > 255 {
            return Err(ConfigError::InvalidNsec3Limit(
                self.nsec3_max_apex_wire_length,
            ));
        }
        Ok(())
    }
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = CheckConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.direct_dnskey);
        assert!(config.tlsa_wildcard_fallback);
        assert_eq!(config.nsec3_max_apex_wire_length, 222);
    }

    #[test]
    fn test_invalid_nsec3_limit() {
        for limit in [0, 256] {
            let config = CheckConfig {
                nsec3_max_apex_wire_length: limit,
                ..Default::default()
            };
            assert_eq!(
                config.validate(),
                Err(ConfigError::InvalidNsec3Limit(limit))
            );
        }
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("YES", false));
        assert!(parse_bool("on", false));
        assert!(!parse_bool("0", true));
        assert!(parse_bool("maybe", true));
        assert!(!parse_bool("maybe", false));
    }

    #[test]
    fn test_from_lookup() {
        let config = CheckConfig::from_lookup(lookup(&[
            ("CHECKZONE_DIRECT_DNSKEY", "true"),
            ("CHECKZONE_NSEC3_MAX_APEX_WIRE_LENGTH", "100"),
            ("CHECKZONE_TLSA_WILDCARD_FALLBACK", "off"),
        ]))
        .unwrap();
        assert!(config.direct_dnskey);
        assert_eq!(config.nsec3_max_apex_wire_length, 100);
        assert!(!config.tlsa_wildcard_fallback);

        assert_eq!(CheckConfig::from_lookup(lookup(&[])).unwrap(), CheckConfig::default());
    }

    #[test]
    fn test_from_lookup_rejects_bad_limit() {
        let result = CheckConfig::from_lookup(lookup(&[(
            "CHECKZONE_NSEC3_MAX_APEX_WIRE_LENGTH",
            "lots",
        )]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

        let result =
            CheckConfig::from_lookup(lookup(&[("CHECKZONE_NSEC3_MAX_APEX_WIRE_LENGTH", "300")]));
        assert_eq!(result, Err(ConfigError::InvalidNsec3Limit(300)));
    }

    #[test]
    fn test_from_toml_str() {
        let config = CheckConfig::from_toml_str("direct_dnskey = true\n").unwrap();
        assert!(config.direct_dnskey);
        assert_eq!(config.nsec3_max_apex_wire_length, 222);

        assert!(matches!(
            CheckConfig::from_toml_str("direct_dnskey = \"sometimes\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
