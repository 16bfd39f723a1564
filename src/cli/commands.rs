use clap::{Arg, ArgMatches, Command};
use log::info;

use crate::config::Config;
use crate::utils::error::FixtureError;

pub fn build_cli() -> Command {
    Command::new("modbus-fixture")
        .about("Modbus TCP slave for a proximity-sensing assembly fixture")
        .version(crate::VERSION)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("Path to TOML configuration file"),
        )
        .arg(
            Arg::new("bind")
                .long("bind")
                .value_name("ADDR")
                .help("Bind address override"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .value_name("PORT")
                .help("Modbus TCP port override (default 502)"),
        )
        .arg(
            Arg::new("interval")
                .long("interval")
                .short('i')
                .value_name("MS")
                .help("Sensor poll interval in milliseconds"),
        )
        .arg(
            Arg::new("threshold")
                .long("threshold")
                .short('t')
                .value_name("MM")
                .help("Presence threshold in millimeters"),
        )
        .arg(
            Arg::new("sensors")
                .long("sensors")
                .short('s')
                .value_name("COUNT")
                .help("Number of proximity sensors"),
        )
        .subcommand(Command::new("serve").about("Run the slave and poll loop (default)"))
        .subcommand(
            Command::new("init-config")
                .about("Write a default configuration file")
                .arg(
                    Arg::new("path")
                        .value_name("FILE")
                        .default_value("config/fixture.toml")
                        .help("Where to write the config"),
                ),
        )
        .subcommand(
            Command::new("probe")
                .about("Run one poll cycle against the simulated bank and print the register map"),
        )
}

/// Load the config (file if given, defaults otherwise) and apply CLI overrides.
pub fn load_config(matches: &ArgMatches) -> Result<Config, FixtureError> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => {
            info!("📄 Loading configuration from {}", path);
            Config::from_file(path)?
        }
        None => Config::default(),
    };
    config.apply_matches(matches)?;
    Ok(config)
}
