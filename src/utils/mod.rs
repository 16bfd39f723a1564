pub mod error;

pub use error::FixtureError;
