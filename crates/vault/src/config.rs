use crate::error::VaultError;
use crate::generator::DEFAULT_PASSWORD_LENGTH;
use passio_crypto::{BackendPreference, DEFAULT_ITERATIONS};
use serde::{Deserialize, Serialize};

/// Per-vault settings.
///
/// Every field has a default, so a partial TOML table or an empty one deserializes.
///
/// ```toml
/// [vault]
/// iterations = 1000
/// password_length = 15
/// backend = "auto"   # or "provider", "portable"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// PBKDF2 iteration count. Changing it makes existing vaults undecryptable.
    pub iterations: u32,
    /// Length of passwords generated for entries saved without one.
    pub password_length: usize,
    pub backend: BackendPreference,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            password_length: DEFAULT_PASSWORD_LENGTH,
            backend: BackendPreference::Auto,
        }
    }
}

impl VaultConfig {
    /// # Errors
    /// Returns [`VaultError::InvalidConfiguration`] for a zero iteration count or password
    /// length.
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.iterations == 0 {
            return Err(VaultError::invalid("iterations must be at least 1"));
        }
        if self.password_length == 0 {
            return Err(VaultError::invalid("password_length must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_tables_fill_in_defaults() {
        let config: VaultConfig = serde_json::from_str(r#"{"backend":"portable"}"#).unwrap();
        assert_eq!(config.backend, BackendPreference::Portable);
        assert_eq!(config.iterations, 1000);
        assert_eq!(config.password_length, 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_values_are_rejected() {
        let config = VaultConfig { password_length: 0, ..VaultConfig::default() };
        assert_eq!(config.validate().unwrap_err().kind(), "InvalidConfiguration");

        let config = VaultConfig { iterations: 0, ..VaultConfig::default() };
        assert!(config.validate().is_err());
    }
}
