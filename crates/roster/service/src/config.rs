//! Roster configuration.
//!
//! ```toml
//! [authority]
//! holders = ["0x1111111111111111111111111111111111111111"]
//!
//! [registry]
//! initial_season = 1
//!
//! [access]
//! gate_address = "0x9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a"
//! enrollment = "single_use"
//! ```

use std::collections::HashSet;
use std::path::Path;

use roster_access::EnrollmentPolicy;
use roster_types::{Address, SeasonId};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Complete roster configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterConfig {
    pub authority: AuthorityConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    pub access: AccessConfig,
}

/// Genesis authority holders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityConfig {
    pub holders: Vec<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Season that is current at startup.
    #[serde(default = "default_initial_season")]
    pub initial_season: SeasonId,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            initial_season: default_initial_season(),
        }
    }
}

fn default_initial_season() -> SeasonId {
    SeasonId(1)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Identity the access gate uses for delegated issuance. The registry
    /// accepts it for issuance only; it must not be an authority holder.
    pub gate_address: Address,

    #[serde(default)]
    pub enrollment: EnrollmentPolicy,
}

impl RosterConfig {
    /// Minimal configuration with one holder and the default gate policy.
    pub fn new(holder: Address, gate_address: Address) -> Self {
        Self {
            authority: AuthorityConfig {
                holders: vec![holder],
            },
            registry: RegistryConfig::default(),
            access: AccessConfig {
                gate_address,
                enrollment: EnrollmentPolicy::default(),
            },
        }
    }

    /// Load configuration from TOML
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: RosterConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.authority.holders.is_empty() {
            return Err(ConfigError::Invalid(
                "authority.holders must name at least one holder".into(),
            ));
        }

        let mut seen = HashSet::new();
        for holder in &self.authority.holders {
            if holder.is_zero() {
                return Err(ConfigError::Invalid(
                    "authority.holders must not contain the zero address".into(),
                ));
            }
            if !seen.insert(holder) {
                return Err(ConfigError::Invalid(format!(
                    "authority.holders lists {} more than once",
                    holder
                )));
            }
        }

        if self.access.gate_address.is_zero() {
            return Err(ConfigError::Invalid(
                "access.gate_address must not be the zero address".into(),
            ));
        }
        if seen.contains(&self.access.gate_address) {
            return Err(ConfigError::Invalid(
                "access.gate_address must not be an authority holder".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [authority]
        holders = ["0x1111111111111111111111111111111111111111"]

        [registry]
        initial_season = 3

        [access]
        gate_address = "0x9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a"
        enrollment = "single_use"
    "#;

    #[test]
    fn parses_full_config() {
        let config = RosterConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.authority.holders, vec![Address::repeat_byte(0x11)]);
        assert_eq!(config.registry.initial_season, SeasonId(3));
        assert_eq!(config.access.gate_address, Address::repeat_byte(0x9a));
        assert_eq!(config.access.enrollment, EnrollmentPolicy::SingleUse);
    }

    #[test]
    fn registry_and_enrollment_have_defaults() {
        let config = RosterConfig::from_toml(
            r#"
            [authority]
            holders = ["0x1111111111111111111111111111111111111111"]

            [access]
            gate_address = "0x9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a"
            "#,
        )
        .unwrap();
        assert_eq!(config.registry.initial_season, SeasonId(1));
        assert_eq!(config.access.enrollment, EnrollmentPolicy::Repeatable);
    }

    #[test]
    fn rejects_empty_or_duplicate_holders() {
        let mut config = RosterConfig::new(Address::repeat_byte(1), Address::repeat_byte(2));
        config.authority.holders.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.authority.holders = vec![Address::repeat_byte(1), Address::repeat_byte(1)];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_zero_gate_address() {
        let config = RosterConfig::new(Address::repeat_byte(1), Address::ZERO);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_gate_listed_as_holder() {
        let mut config = RosterConfig::new(Address::repeat_byte(1), Address::repeat_byte(2));
        config.authority.holders.push(Address::repeat_byte(2));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_malformed_address() {
        let err = RosterConfig::from_toml(
            r#"
            [authority]
            holders = ["0x12"]

            [access]
            gate_address = "0x9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn toml_roundtrip_and_file_loading() {
        let config = RosterConfig::from_toml(SAMPLE).unwrap();
        let rendered = config.to_toml().unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(rendered.as_bytes()).unwrap();

        let loaded = RosterConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = RosterConfig::from_file("/nonexistent/roster.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
