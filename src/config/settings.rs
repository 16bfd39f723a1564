use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::utils::error::FixtureError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Fixture identification
    pub fixture_uuid: String,
    pub fixture_name: String,
    pub fixture_version: String,

    pub network: NetworkConfig,
    pub registers: RegisterLayout,
    pub sensing: SensingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub bind_address: String,
    pub port: u16,
}

/// Geometry of the holding register map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterLayout {
    /// Total number of holding registers (N).
    pub register_count: u16,
    /// Presence bits occupy indices 0..sensor_count (S).
    pub sensor_count: u16,
    /// Index of the actuator command register.
    pub actuator_register: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensingConfig {
    /// Presence is distance < threshold.
    pub threshold_mm: u16,
    pub poll_interval_ms: u64,
    /// Consecutive cycles a new presence state must hold before it is
    /// committed. 1 disables debouncing (the reference behavior).
    pub debounce_samples: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fixture_uuid: Uuid::new_v4().to_string(),
            fixture_name: "Proximity Fixture".to_string(),
            fixture_version: crate::VERSION.to_string(),
            network: NetworkConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 502,
            },
            registers: RegisterLayout {
                register_count: 8,
                sensor_count: 7,
                actuator_register: 7,
            },
            sensing: SensingConfig {
                threshold_mm: 70,
                poll_interval_ms: 250,
                debounce_samples: 1,
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FixtureError> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            FixtureError::ConfigError(format!(
                "Failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let mut config: Config = toml::from_str(&content)?;

        // Backward compatibility with configs written before identity fields
        if config.fixture_uuid.is_empty() {
            config.fixture_uuid = Uuid::new_v4().to_string();
        }
        if config.fixture_version.is_empty() {
            config.fixture_version = crate::VERSION.to_string();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), FixtureError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| FixtureError::ConfigError(format!("Create dir failed: {}", e)))?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content).map_err(|e| {
            FixtureError::ConfigError(format!(
                "Failed to write {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// Apply command line overrides on top of the loaded/default config.
    pub fn apply_matches(&mut self, matches: &ArgMatches) -> Result<(), FixtureError> {
        if let Some(bind) = matches.get_one::<String>("bind") {
            self.network.bind_address = bind.clone();
        }
        if let Some(port) = matches.get_one::<String>("port") {
            self.network.port = port
                .parse()
                .map_err(|_| FixtureError::ConfigError(format!("Invalid port: {}", port)))?;
        }
        if let Some(interval) = matches.get_one::<String>("interval") {
            self.sensing.poll_interval_ms = interval.parse().map_err(|_| {
                FixtureError::ConfigError(format!("Invalid poll interval: {}", interval))
            })?;
        }
        if let Some(threshold) = matches.get_one::<String>("threshold") {
            self.sensing.threshold_mm = threshold.parse().map_err(|_| {
                FixtureError::ConfigError(format!("Invalid threshold: {}", threshold))
            })?;
        }
        if let Some(sensors) = matches.get_one::<String>("sensors") {
            self.registers.sensor_count = sensors.parse().map_err(|_| {
                FixtureError::ConfigError(format!("Invalid sensor count: {}", sensors))
            })?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), FixtureError> {
        let layout = &self.registers;
        if layout.register_count == 0 {
            return Err(FixtureError::ConfigError(
                "register_count must be at least 1".to_string(),
            ));
        }
        if layout.sensor_count >= layout.register_count {
            return Err(FixtureError::ConfigError(format!(
                "sensor_count {} leaves no room in {} registers",
                layout.sensor_count, layout.register_count
            )));
        }
        if layout.actuator_register >= layout.register_count {
            return Err(FixtureError::ConfigError(format!(
                "actuator_register {} is outside the {}-register map",
                layout.actuator_register, layout.register_count
            )));
        }
        if layout.actuator_register < layout.sensor_count {
            return Err(FixtureError::ConfigError(format!(
                "actuator_register {} overlaps the presence block 0..{}",
                layout.actuator_register, layout.sensor_count
            )));
        }
        if self.sensing.poll_interval_ms == 0 {
            return Err(FixtureError::ConfigError(
                "poll_interval_ms must be nonzero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_reference_fixture() {
        let config = Config::default();
        assert_eq!(config.network.port, 502);
        assert_eq!(config.registers.register_count, 8);
        assert_eq!(config.registers.sensor_count, 7);
        assert_eq!(config.registers.actuator_register, 7);
        assert_eq!(config.sensing.threshold_mm, 70);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_actuator_register_inside_presence_block() {
        let mut config = Config::default();
        config.registers.actuator_register = 3;
        assert!(matches!(
            config.validate(),
            Err(FixtureError::ConfigError(_))
        ));
    }

    #[test]
    fn rejects_sensor_count_filling_the_whole_map() {
        let mut config = Config::default();
        config.registers.sensor_count = 8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_round_trip_preserves_layout() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.registers.register_count, config.registers.register_count);
        assert_eq!(parsed.sensing.threshold_mm, config.sensing.threshold_mm);
        assert_eq!(parsed.fixture_uuid, config.fixture_uuid);
    }
}
