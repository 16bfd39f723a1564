//! Poll cycle: sample sensors, publish presence bits, drive the actuator.

use log::{info, warn};
use tokio::time::{interval, Duration};

use crate::devices::{ActuatorBridge, SensorAggregator};

pub struct PollService {
    aggregator: SensorAggregator,
    bridge: ActuatorBridge,
    poll_interval: Duration,
    cycles: u64,
    degraded_samples: u64,
    sensor_count: usize,
}

impl PollService {
    pub fn new(
        aggregator: SensorAggregator,
        bridge: ActuatorBridge,
        poll_interval_ms: u64,
        sensor_count: usize,
    ) -> Self {
        Self {
            aggregator,
            bridge,
            poll_interval: Duration::from_millis(poll_interval_ms),
            cycles: 0,
            degraded_samples: 0,
            sensor_count,
        }
    }

    /// Run poll cycles forever. No single failure is fatal: a dead sensor
    /// degrades, an actuator fault is logged and retried next cycle.
    pub async fn run(mut self) {
        info!(
            "🔄 Poll service started: {} sensors every {:?}",
            self.sensor_count, self.poll_interval
        );
        let mut ticker = interval(self.poll_interval);
        loop {
            ticker.tick().await;
            self.run_cycle().await;
        }
    }

    /// One full cycle: aggregate sensors first, then re-assert the actuator
    /// so a command written since the last cycle takes effect now.
    pub async fn run_cycle(&mut self) {
        match self.aggregator.poll_once().await {
            Ok(healthy) => {
                self.degraded_samples += (self.sensor_count - healthy) as u64;
            }
            Err(e) => warn!("Sensor poll cycle failed: {}", e),
        }

        if let Err(e) = self.bridge.drive_once().await {
            warn!("Actuator drive failed, retrying next cycle: {}", e);
        }

        self.cycles += 1;
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn degraded_samples(&self) -> u64 {
        self.degraded_samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{SimulatedActuator, SimulatedSensorBank};
    use crate::registers::{RegisterMap, SharedRegisters};
    use std::sync::Arc;

    fn service(
    ) -> (Arc<SimulatedSensorBank>, Arc<SimulatedActuator>, SharedRegisters, PollService) {
        let bank = SimulatedSensorBank::shared(7, 200);
        let actuator = Arc::new(SimulatedActuator::new());
        let registers = RegisterMap::shared(8);
        let aggregator =
            SensorAggregator::new(bank.clone(), registers.clone(), 7, 70, 1);
        let bridge = ActuatorBridge::new(actuator.clone(), registers.clone(), 7);
        let service = PollService::new(aggregator, bridge, 100, 7);
        (bank, actuator, registers, service)
    }

    #[tokio::test]
    async fn commanded_actuator_state_is_applied_on_next_cycle() {
        let (_bank, actuator, registers, mut service) = service();

        registers.lock().unwrap().write(7, 1);
        service.run_cycle().await;
        assert_eq!(actuator.last_state(), Some(true));

        registers.lock().unwrap().write(7, 0);
        service.run_cycle().await;
        assert_eq!(actuator.last_state(), Some(false));
    }

    #[tokio::test]
    async fn cycle_updates_presence_and_counts_degraded_samples() {
        let (bank, _actuator, registers, mut service) = service();

        bank.set_distance(0, Some(40));
        bank.set_distance(6, None);
        service.run_cycle().await;

        let map = registers.lock().unwrap();
        assert_eq!(map.read(0), Some(1));
        assert_eq!(map.read(6), Some(0));
        drop(map);

        assert_eq!(service.cycles(), 1);
        assert_eq!(service.degraded_samples(), 1);
    }
}
