//! Modbus TCP Presence Fixture
//!
//! This library implements the slave side of a proximity-sensing assembly
//! fixture: ranging sensors are aggregated into presence bits in a holding
//! register map, an actuator is driven from a command register, and the map
//! is served to a supervisory controller over Modbus TCP.

pub mod cli;
pub mod config;
pub mod devices;
pub mod modbus;
pub mod registers;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use devices::{
    Actuator, ActuatorBridge, RangeSensor, SensorAggregator, SimulatedActuator,
    SimulatedSensorBank,
};
pub use modbus::{ExceptionCode, ModbusRequest, RequestPdu, ResponsePdu};
pub use registers::{RegisterMap, SharedRegisters};
pub use services::{ModbusServer, PollService};
pub use utils::error::FixtureError;

pub const VERSION: &str = "1.0.0";
