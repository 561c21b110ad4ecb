use secrecy::SecretString;
use serde::Deserialize;

use crate::utils::get_env_with_prefix;

/// Main configuration for a Linkdeck service
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub billing: BillingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

/// Payment gateway and pricing configuration.
///
/// The key secret signs gateway callbacks and is held in a [`SecretString`]
/// so it never appears in debug output or serialized config dumps.
#[derive(Clone, Deserialize)]
pub struct BillingConfig {
    /// Razorpay key id (`rzp_test_*` or `rzp_live_*`). Public, returned to
    /// clients so they can open the checkout widget.
    pub key_id: String,
    /// Razorpay key secret, shared-secret for order signatures.
    pub key_secret: SecretString,
    /// ISO currency code for all orders.
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl std::fmt::Debug for BillingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .field("currency", &self.currency)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Recognized variables (each also checked without the `LINKDECK_`
    /// prefix): `LINKDECK_HOST`, `LINKDECK_PORT`, `LINKDECK_LOG_LEVEL`,
    /// `LINKDECK_LOG_JSON`, `LINKDECK_RAZORPAY_KEY_ID`,
    /// `LINKDECK_RAZORPAY_KEY_SECRET`, `LINKDECK_CURRENCY`.
    pub fn from_env() -> crate::error::Result<Self> {
        let key_id = get_env_with_prefix("RAZORPAY_KEY_ID").ok_or_else(|| {
            crate::error::LinkdeckError::internal("RAZORPAY_KEY_ID is not set")
        })?;
        let key_secret = get_env_with_prefix("RAZORPAY_KEY_SECRET").ok_or_else(|| {
            crate::error::LinkdeckError::internal("RAZORPAY_KEY_SECRET is not set")
        })?;

        let mut server = ServerConfig::default();
        if let Some(host) = get_env_with_prefix("HOST") {
            server.host = host;
        }
        if let Some(port) = get_env_with_prefix("PORT") {
            server.port = port.parse().map_err(|_| {
                crate::error::LinkdeckError::internal(format!("Invalid PORT value: {}", port))
            })?;
        }

        let mut logging = LoggingConfig::default();
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            logging.level = level;
        }
        if let Some(json) = get_env_with_prefix("LOG_JSON") {
            logging.json = json.parse().unwrap_or(false);
        }

        Ok(Self {
            server,
            logging,
            billing: BillingConfig {
                key_id,
                key_secret: SecretString::new(key_secret),
                currency: get_env_with_prefix("CURRENCY").unwrap_or_else(default_currency),
            },
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
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

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_currency() -> String {
    "INR".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let server = ServerConfig::default();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 8000);

        let logging = LoggingConfig::default();
        assert_eq!(logging.level, "info");
        assert!(!logging.json);
    }

    #[test]
    fn test_from_env() {
        unsafe {
            std::env::set_var("LINKDECK_RAZORPAY_KEY_ID", "rzp_test_env");
            std::env::set_var("LINKDECK_RAZORPAY_KEY_SECRET", "env_secret");
            std::env::set_var("LINKDECK_CURRENCY", "INR");
            std::env::set_var("LINKDECK_PORT", "9001");
        }

        let config = Config::from_env().unwrap();
        assert_eq!(config.billing.key_id, "rzp_test_env");
        assert_eq!(config.billing.currency, "INR");
        assert_eq!(config.server.port, 9001);

        unsafe {
            std::env::remove_var("LINKDECK_RAZORPAY_KEY_ID");
            std::env::remove_var("LINKDECK_RAZORPAY_KEY_SECRET");
            std::env::remove_var("LINKDECK_CURRENCY");
            std::env::remove_var("LINKDECK_PORT");
        }
    }

    #[test]
    fn test_billing_config_debug_redacts_secret() {
        let config = BillingConfig {
            key_id: "rzp_test_abc".to_string(),
            key_secret: SecretString::new("super_secret".to_string()),
            currency: "INR".to_string(),
        };
        let debug = format!("{:?}", config);
        assert!(debug.contains("rzp_test_abc"));
        assert!(!debug.contains("super_secret"));
    }
}
