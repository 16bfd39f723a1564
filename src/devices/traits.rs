use async_trait::async_trait;

use crate::utils::error::FixtureError;

/// Ranging-sensor collaborator. Bus bring-up and per-sensor addressing live
/// behind this seam; the fixture only ever asks for the current sample of an
/// opaque sensor index.
#[async_trait]
pub trait RangeSensor: Send + Sync {
    /// Current distance sample in millimeters. Fails with
    /// `SensorUnavailable` if the device did not respond; the sampling call
    /// is bounded by the collaborator's own timeout.
    async fn read_distance_mm(&self, index: usize) -> Result<u16, FixtureError>;
}

/// Actuator output collaborator.
#[async_trait]
pub trait Actuator: Send + Sync {
    async fn set_output(&self, engaged: bool) -> Result<(), FixtureError>;
}
