//! Simulator configuration, loadable from TOML.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::{OrderType, TimeInForce};
use crate::error::ConfigError;

/// Default time-in-force per resting order type, applied when the caller
/// does not choose one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultTimeInForce {
    pub limit: TimeInForce,
    pub stop_loss: TimeInForce,
    pub stop_limit: TimeInForce,
    pub trailing_stop: TimeInForce,
}

impl Default for DefaultTimeInForce {
    fn default() -> Self {
        Self {
            limit: TimeInForce::Day,
            stop_loss: TimeInForce::Gtc,
            stop_limit: TimeInForce::Gtc,
            trailing_stop: TimeInForce::Gtc,
        }
    }
}

impl DefaultTimeInForce {
    /// Market orders resolve at submission; report them as Day.
    pub fn for_type(&self, order_type: OrderType) -> TimeInForce {
        match order_type {
            OrderType::Market => TimeInForce::Day,
            OrderType::Limit => self.limit,
            OrderType::StopLoss => self.stop_loss,
            OrderType::StopLimit => self.stop_limit,
            OrderType::TrailingStop => self.trailing_stop,
        }
    }
}

/// Simulator settings.
///
/// ```toml
/// market_close_hour = 16
/// market_timezone = "America/New_York"
/// enforce_fill_guard = true
///
/// [default_time_in_force]
/// limit = "day"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Local hour (0-23) at which Day orders expire.
    pub market_close_hour: u32,
    /// IANA zone the close hour is read in; daylight saving applies.
    pub market_timezone: Tz,
    /// Re-check cash/shares when a resting order fires. When false, fills
    /// apply unconditionally.
    pub enforce_fill_guard: bool,
    /// Let a Stop-Limit fill on the same tick that crosses its stop.
    pub stop_limit_fill_on_trigger: bool,
    pub default_time_in_force: DefaultTimeInForce,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            market_close_hour: 16,
            market_timezone: chrono_tz::America::New_York,
            enforce_fill_guard: true,
            stop_limit_fill_on_trigger: false,
            default_time_in_force: DefaultTimeInForce::default(),
        }
    }
}

impl SimulatorConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.market_close_hour > 23 {
            return Err(ConfigError::Invalid(format!(
                "market_close_hour must be 0-23, got {}",
                self.market_close_hour
            )));
        }
        Ok(())
    }

    /// Render as a TOML document.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = SimulatorConfig::from_toml_str("").unwrap();
        assert_eq!(config, SimulatorConfig::default());
        assert_eq!(config.market_close_hour, 16);
        assert!(config.enforce_fill_guard);
    }

    #[test]
    fn partial_override() {
        let config = SimulatorConfig::from_toml_str(
            r#"
            market_timezone = "Europe/London"
            enforce_fill_guard = false

            [default_time_in_force]
            stop_loss = "day"
            "#,
        )
        .unwrap();
        assert_eq!(config.market_timezone, chrono_tz::Europe::London);
        assert!(!config.enforce_fill_guard);
        assert_eq!(config.default_time_in_force.stop_loss, TimeInForce::Day);
        // untouched keys keep their defaults
        assert_eq!(config.default_time_in_force.limit, TimeInForce::Day);
        assert_eq!(config.default_time_in_force.trailing_stop, TimeInForce::Gtc);
    }

    #[test]
    fn close_hour_out_of_range() {
        let err = SimulatorConfig::from_toml_str("market_close_hour = 24").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_timezone_is_a_parse_error() {
        let err =
            SimulatorConfig::from_toml_str("market_timezone = \"Mars/Olympus\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = SimulatorConfig::from_toml_str("market_close_hour = \"four\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn defaults_per_order_type() {
        let tif = DefaultTimeInForce::default();
        assert_eq!(tif.for_type(OrderType::Limit), TimeInForce::Day);
        assert_eq!(tif.for_type(OrderType::StopLoss), TimeInForce::Gtc);
        assert_eq!(tif.for_type(OrderType::StopLimit), TimeInForce::Gtc);
        assert_eq!(tif.for_type(OrderType::TrailingStop), TimeInForce::Gtc);
    }

    #[test]
    fn toml_roundtrip() {
        let config = SimulatorConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(SimulatorConfig::from_toml_str(&text).unwrap(), config);
    }
}
