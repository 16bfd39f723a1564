//! Sensor aggregation: raw distance samples to presence bits.

use std::sync::Arc;

use log::{debug, warn};

use super::traits::RangeSensor;
use crate::registers::SharedRegisters;
use crate::utils::error::FixtureError;

/// Converts distance samples into boolean presence bits and writes them into
/// the register map, one fixed index per sensor.
///
/// Presence is `distance_mm < threshold_mm`. A failed sample degrades to "not
/// present" - it never errors out of the poll loop and never leaves a stale
/// bit behind. With `debounce_samples > 1` a presence transition is only
/// committed after the new state has been observed that many cycles in a row;
/// sensor failure bypasses the debounce and forces the bit low immediately.
pub struct SensorAggregator {
    sensors: Arc<dyn RangeSensor>,
    registers: SharedRegisters,
    sensor_count: usize,
    threshold_mm: u16,
    debounce_samples: u8,
    committed: Vec<bool>,
    /// Consecutive observations of a state differing from the committed one.
    streaks: Vec<u8>,
}

impl SensorAggregator {
    pub fn new(
        sensors: Arc<dyn RangeSensor>,
        registers: SharedRegisters,
        sensor_count: usize,
        threshold_mm: u16,
        debounce_samples: u8,
    ) -> Self {
        Self {
            sensors,
            registers,
            sensor_count,
            threshold_mm,
            debounce_samples: debounce_samples.max(1),
            committed: vec![false; sensor_count],
            streaks: vec![0; sensor_count],
        }
    }

    /// Sample every sensor once and publish the resulting presence bits.
    /// Returns the number of sensors that answered.
    pub async fn poll_once(&mut self) -> Result<usize, FixtureError> {
        let mut healthy = 0;
        let sensors = Arc::clone(&self.sensors);

        for index in 0..self.sensor_count {
            match sensors.read_distance_mm(index).await {
                Ok(distance_mm) => {
                    healthy += 1;
                    let observed = distance_mm < self.threshold_mm;
                    debug!(
                        "Sensor {}: {} mm -> {}",
                        index,
                        distance_mm,
                        if observed { "present" } else { "absent" }
                    );
                    self.observe(index, observed);
                }
                Err(e) => {
                    warn!("Sensor {} unavailable, degrading to absent: {}", index, e);
                    self.committed[index] = false;
                    self.streaks[index] = 0;
                }
            }
        }

        // One lock acquisition for the whole presence block; the protocol
        // path never sees a half-updated cycle.
        let mut registers = self.registers.lock().map_err(|_| FixtureError::LockError)?;
        for (index, present) in self.committed.iter().enumerate() {
            registers.set_presence(index, *present);
        }

        Ok(healthy)
    }

    fn observe(&mut self, index: usize, observed: bool) {
        if observed == self.committed[index] {
            self.streaks[index] = 0;
            return;
        }
        self.streaks[index] = self.streaks[index].saturating_add(1);
        if self.streaks[index] >= self.debounce_samples {
            self.committed[index] = observed;
            self.streaks[index] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::simulated::SimulatedSensorBank;
    use crate::registers::RegisterMap;

    fn setup(debounce: u8) -> (Arc<SimulatedSensorBank>, SharedRegisters, SensorAggregator) {
        let bank = Arc::new(SimulatedSensorBank::new(7, 200));
        let registers = RegisterMap::shared(8);
        let aggregator = SensorAggregator::new(
            bank.clone(),
            registers.clone(),
            7,
            70,
            debounce,
        );
        (bank, registers, aggregator)
    }

    #[tokio::test]
    async fn near_sample_sets_presence_far_sample_clears_it() {
        let (bank, registers, mut aggregator) = setup(1);

        bank.set_distance(0, Some(40));
        aggregator.poll_once().await.unwrap();
        assert_eq!(registers.lock().unwrap().read(0), Some(1));

        bank.set_distance(0, Some(200));
        aggregator.poll_once().await.unwrap();
        assert_eq!(registers.lock().unwrap().read(0), Some(0));
    }

    #[tokio::test]
    async fn threshold_is_strictly_less_than() {
        let (bank, registers, mut aggregator) = setup(1);

        bank.set_distance(2, Some(70));
        aggregator.poll_once().await.unwrap();
        assert_eq!(registers.lock().unwrap().read(2), Some(0));

        bank.set_distance(2, Some(69));
        aggregator.poll_once().await.unwrap();
        assert_eq!(registers.lock().unwrap().read(2), Some(1));
    }

    #[tokio::test]
    async fn failed_sensor_degrades_to_absent() {
        let (bank, registers, mut aggregator) = setup(1);

        bank.set_distance(3, Some(10));
        aggregator.poll_once().await.unwrap();
        assert_eq!(registers.lock().unwrap().read(3), Some(1));

        // Dead sensor must clear the bit, not keep it stale
        bank.set_distance(3, None);
        let healthy = aggregator.poll_once().await.unwrap();
        assert_eq!(healthy, 6);
        assert_eq!(registers.lock().unwrap().read(3), Some(0));
    }

    #[tokio::test]
    async fn debounce_delays_transition_until_stable() {
        let (bank, registers, mut aggregator) = setup(3);

        bank.set_distance(1, Some(30));
        aggregator.poll_once().await.unwrap();
        aggregator.poll_once().await.unwrap();
        assert_eq!(registers.lock().unwrap().read(1), Some(0));

        aggregator.poll_once().await.unwrap();
        assert_eq!(registers.lock().unwrap().read(1), Some(1));

        // A single far sample is not enough to clear the bit again
        bank.set_distance(1, Some(500));
        aggregator.poll_once().await.unwrap();
        assert_eq!(registers.lock().unwrap().read(1), Some(1));
    }

    #[tokio::test]
    async fn failure_bypasses_debounce() {
        let (bank, registers, mut aggregator) = setup(5);

        bank.set_distance(4, Some(20));
        for _ in 0..5 {
            aggregator.poll_once().await.unwrap();
        }
        assert_eq!(registers.lock().unwrap().read(4), Some(1));

        bank.set_distance(4, None);
        aggregator.poll_once().await.unwrap();
        assert_eq!(registers.lock().unwrap().read(4), Some(0));
    }

    #[tokio::test]
    async fn does_not_touch_registers_beyond_the_presence_block() {
        let (_bank, registers, mut aggregator) = setup(1);

        registers.lock().unwrap().write(7, 1);
        aggregator.poll_once().await.unwrap();
        assert_eq!(registers.lock().unwrap().read(7), Some(1));
    }
}
