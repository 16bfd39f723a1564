use thiserror::Error;

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Communication error: {0}")]
    CommunicationError(String),

    #[error("Malformed frame: {0}")]
    FrameMalformed(String),

    #[error("Sensor {0} did not respond")]
    SensorUnavailable(usize),

    #[error("Actuator fault: {0}")]
    ActuatorFault(String),

    #[error("Peer disconnected")]
    Disconnected,

    #[error("Lock acquisition failed")]
    LockError,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for FixtureError {
    fn from(err: std::io::Error) -> Self {
        FixtureError::CommunicationError(format!("IO error: {}", err))
    }
}

impl From<toml::de::Error> for FixtureError {
    fn from(err: toml::de::Error) -> Self {
        FixtureError::ConfigError(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for FixtureError {
    fn from(err: toml::ser::Error) -> Self {
        FixtureError::ConfigError(format!("TOML serialize error: {}", err))
    }
}
