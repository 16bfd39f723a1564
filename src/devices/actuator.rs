//! Actuator bridge: command register to output drive.

use std::sync::Arc;

use log::debug;

use super::traits::Actuator;
use crate::registers::SharedRegisters;
use crate::utils::error::FixtureError;

/// Drives the actuator from its command register, once per poll cycle.
///
/// Purely level-driven: the commanded state is re-asserted every cycle
/// whether or not it changed, so a missed write heals on the next cycle.
pub struct ActuatorBridge {
    actuator: Arc<dyn Actuator>,
    registers: SharedRegisters,
    command_register: u16,
}

impl ActuatorBridge {
    pub fn new(actuator: Arc<dyn Actuator>, registers: SharedRegisters, command_register: u16) -> Self {
        Self {
            actuator,
            registers,
            command_register,
        }
    }

    /// Read the command register and drive the output. Returns the state
    /// that was driven.
    pub async fn drive_once(&self) -> Result<bool, FixtureError> {
        let engaged = {
            let registers = self.registers.lock().map_err(|_| FixtureError::LockError)?;
            registers.read(self.command_register).unwrap_or(0) != 0
        };
        self.actuator.set_output(engaged).await?;
        debug!(
            "Actuator register {} -> {}",
            self.command_register,
            if engaged { "engaged" } else { "released" }
        );
        Ok(engaged)
    }
}
