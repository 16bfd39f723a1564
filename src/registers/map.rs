use std::sync::{Arc, Mutex};

/// Shared handle to the holding register store. The poll path and the
/// protocol path both hold one of these; no register access happens outside
/// the lock.
pub type SharedRegisters = Arc<Mutex<RegisterMap>>;

/// Fixed-length holding register store.
///
/// Layout in the reference configuration (8 registers):
/// indices 0..=6 carry one presence bit per sensor, index 7 is the actuator
/// command register, and anything beyond that is reserved but still
/// readable/writable. All registers start at zero and nothing is persisted
/// across restarts.
#[derive(Debug)]
pub struct RegisterMap {
    holding: Vec<u16>,
}

impl RegisterMap {
    pub fn new(count: u16) -> Self {
        Self {
            holding: vec![0; count as usize],
        }
    }

    pub fn shared(count: u16) -> SharedRegisters {
        Arc::new(Mutex::new(Self::new(count)))
    }

    pub fn len(&self) -> u16 {
        self.holding.len() as u16
    }

    pub fn is_empty(&self) -> bool {
        self.holding.is_empty()
    }

    /// Read a single register. `None` if the address is out of bounds.
    pub fn read(&self, address: u16) -> Option<u16> {
        self.holding.get(address as usize).copied()
    }

    /// Copy `quantity` registers starting at `start`. `None` if any part of
    /// the range falls outside the map; addresses are never clamped.
    pub fn read_range(&self, start: u16, quantity: u16) -> Option<Vec<u16>> {
        let start = start as usize;
        let end = start.checked_add(quantity as usize)?;
        self.holding.get(start..end).map(|slice| slice.to_vec())
    }

    /// Write a single register. Returns false if the address is out of bounds.
    pub fn write(&mut self, address: u16, value: u16) -> bool {
        match self.holding.get_mut(address as usize) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Write a contiguous block of registers. The whole block is validated
    /// before anything is written, so a failed call leaves the map untouched.
    pub fn write_range(&mut self, start: u16, values: &[u16]) -> bool {
        let start = start as usize;
        let end = match start.checked_add(values.len()) {
            Some(end) if end <= self.holding.len() => end,
            _ => return false,
        };
        self.holding[start..end].copy_from_slice(values);
        true
    }

    /// Store a presence bit at its fixed sensor index.
    pub fn set_presence(&mut self, sensor_index: usize, present: bool) -> bool {
        match self.holding.get_mut(sensor_index) {
            Some(slot) => {
                *slot = present as u16;
                true
            }
            None => false,
        }
    }
}
