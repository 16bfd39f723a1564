pub mod map;

pub use map::{RegisterMap, SharedRegisters};
