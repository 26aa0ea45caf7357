//! Router connection configuration.
//!
//! `RouterConfig` is constructed once, validated at the boundary, and never
//! mutated afterward.

use serde::Deserialize;
use std::fmt;
use zeroize::Zeroize;

/// Password wrapper that zeroizes its backing buffer on drop.
///
/// The wire protocol treats the password as UTF-16; this type stores the
/// UTF-8 form supplied by the caller and re-encodes to UTF-16LE only at the
/// codec boundary (see [`crate::codec::encode_utf16`]).
#[derive(Clone, Deserialize)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(***)")
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Router connection configuration. Immutable after construction.
#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    pub address: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

/// Errors produced while loading a [`RouterConfig`] from a file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("port must be nonzero")]
    InvalidPort,
    #[error("address must not be empty")]
    EmptyAddress,
}

impl RouterConfig {
    pub fn new(
        address: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<SecretString>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            address: address.into(),
            port,
            username: username.into(),
            password: password.into(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads a [`RouterConfig`] from a TOML file on disk.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: RouterConfig = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.address.is_empty() {
            return Err(ConfigError::EmptyAddress);
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_address() {
        let err = RouterConfig::new("", 8080, "alice", "pw").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyAddress));
    }

    #[test]
    fn rejects_zero_port() {
        let err = RouterConfig::new("router.example.com", 0, "alice", "pw").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort));
    }

    #[test]
    fn parses_from_toml() {
        let toml_text = r#"
            address = "router.example.com"
            port = 8060
            username = "alice"
            password = "pw"
        "#;
        let parsed: RouterConfig = toml::from_str(toml_text).unwrap();
        assert_eq!(parsed.address, "router.example.com");
        assert_eq!(parsed.port, 8060);
    }
}
