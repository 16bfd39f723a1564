//! Simulated collaborators for bench runs and tests.
//!
//! Real deployments replace these with drivers for the ranging bus and the
//! output stage; the fixture core only ever talks to the traits.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;

use super::traits::{Actuator, RangeSensor};
use crate::utils::error::FixtureError;

/// A bank of fake ranging sensors with settable per-index distances.
/// `None` simulates a sensor that stopped answering on the bus.
pub struct SimulatedSensorBank {
    distances: Mutex<Vec<Option<u16>>>,
}

impl SimulatedSensorBank {
    pub fn new(sensor_count: usize, default_distance_mm: u16) -> Self {
        Self {
            distances: Mutex::new(vec![Some(default_distance_mm); sensor_count]),
        }
    }

    pub fn shared(sensor_count: usize, default_distance_mm: u16) -> Arc<Self> {
        Arc::new(Self::new(sensor_count, default_distance_mm))
    }

    pub fn set_distance(&self, index: usize, distance_mm: Option<u16>) {
        let mut distances = self.distances.lock().unwrap();
        if let Some(slot) = distances.get_mut(index) {
            *slot = distance_mm;
        }
    }
}

#[async_trait]
impl RangeSensor for SimulatedSensorBank {
    async fn read_distance_mm(&self, index: usize) -> Result<u16, FixtureError> {
        let distances = self.distances.lock().map_err(|_| FixtureError::LockError)?;
        match distances.get(index) {
            Some(Some(distance)) => Ok(*distance),
            _ => Err(FixtureError::SensorUnavailable(index)),
        }
    }
}

/// Records the last driven output state instead of toggling a GPIO.
pub struct SimulatedActuator {
    state: Mutex<ActuatorState>,
}

#[derive(Default)]
struct ActuatorState {
    last: Option<bool>,
    changed_at: Option<DateTime<Utc>>,
    drive_count: u64,
}

impl SimulatedActuator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ActuatorState::default()),
        }
    }

    pub fn last_state(&self) -> Option<bool> {
        self.state.lock().unwrap().last
    }

    pub fn last_changed(&self) -> Option<DateTime<Utc>> {
        self.state.lock().unwrap().changed_at
    }

    pub fn drive_count(&self) -> u64 {
        self.state.lock().unwrap().drive_count
    }
}

impl Default for SimulatedActuator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Actuator for SimulatedActuator {
    async fn set_output(&self, engaged: bool) -> Result<(), FixtureError> {
        let mut state = self.state.lock().map_err(|_| FixtureError::LockError)?;
        state.drive_count += 1;
        if state.last != Some(engaged) {
            info!(
                "🔩 Actuator output -> {}",
                if engaged { "ENGAGED" } else { "RELEASED" }
            );
            state.last = Some(engaged);
            state.changed_at = Some(Utc::now());
        }
        Ok(())
    }
}
