pub mod actuator;
pub mod aggregator;
pub mod simulated;
pub mod traits;

pub use actuator::ActuatorBridge;
pub use aggregator::SensorAggregator;
pub use simulated::{SimulatedActuator, SimulatedSensorBank};
pub use traits::{Actuator, RangeSensor};
