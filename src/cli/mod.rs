pub mod commands;

pub use commands::{build_cli, load_config};
