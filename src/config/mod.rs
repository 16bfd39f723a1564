pub mod settings;

pub use settings::{Config, NetworkConfig, RegisterLayout, SensingConfig};
