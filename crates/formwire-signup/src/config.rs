use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid validation config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

/// Thresholds and timings shared by the rules, the username service and the
/// submit handler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub min_username_length: usize,
    pub min_password_length: usize,
    #[serde(rename = "quiet_period_ms", with = "millis")]
    pub quiet_period: Duration,
    #[serde(rename = "request_timeout_ms", with = "millis")]
    pub request_timeout: Duration,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_username_length: 3,
            min_password_length: 5,
            quiet_period: Duration::from_millis(300),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ValidationConfig {
    /// Parses a JSON object; missing fields keep their defaults.
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use formwire_signup::ValidationConfig;
    ///
    /// let cfg = ValidationConfig::from_json(r#"{ "quiet_period_ms": 0 }"#).unwrap();
    /// assert_eq!(cfg.quiet_period, Duration::ZERO);
    /// assert_eq!(cfg.min_password_length, 5);
    /// ```
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json)?;
        if cfg.request_timeout.is_zero() {
            return Err(ConfigError::Zero {
                field: "request_timeout_ms",
            });
        }
        Ok(cfg)
    }

    pub fn to_json(&self) -> String {
        // Plain integers and durations always serialize.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn with_min_username_length(mut self, n: usize) -> Self {
        self.min_username_length = n;
        self
    }

    pub fn with_min_password_length(mut self, n: usize) -> Self {
        self.min_password_length = n;
        self
    }

    pub fn with_quiet_period(mut self, quiet: Duration) -> Self {
        self.quiet_period = quiet;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
