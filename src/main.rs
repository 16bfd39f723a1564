use anyhow::Result;
use chrono::Utc;
use log::info;
use std::sync::Arc;

use modbus_fixture::cli::{build_cli, load_config};
use modbus_fixture::devices::{
    ActuatorBridge, SensorAggregator, SimulatedActuator, SimulatedSensorBank,
};
use modbus_fixture::registers::RegisterMap;
use modbus_fixture::services::{ModbusServer, PollService};
use modbus_fixture::Config;

/// Default distance reported by the simulated bank before anything is set:
/// far enough that every presence bit starts at 0.
const SIMULATED_DEFAULT_DISTANCE_MM: u16 = 1000;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = build_cli().get_matches();

    if let Some(sub) = matches.subcommand_matches("init-config") {
        let path = sub.get_one::<String>("path").unwrap();
        Config::default().save_to_file(path)?;
        println!("✅ Default configuration written to {}", path);
        return Ok(());
    }

    let config = load_config(&matches)?;
    info!("🏭 Fixture: {} [{}]", config.fixture_name, config.fixture_uuid);
    info!("📦 Version: {}", config.fixture_version);
    info!(
        "📡 {} sensors, threshold {} mm, actuator on register {}",
        config.registers.sensor_count, config.sensing.threshold_mm, config.registers.actuator_register
    );

    if matches.subcommand_matches("probe").is_some() {
        return probe(&config).await;
    }

    serve(config).await
}

async fn serve(config: Config) -> Result<()> {
    let registers = RegisterMap::shared(config.registers.register_count);
    let sensor_count = config.registers.sensor_count as usize;

    // Hardware drivers live behind the collaborator traits; this binary runs
    // against the simulated bank until a real driver is wired in.
    let sensors = SimulatedSensorBank::shared(sensor_count, SIMULATED_DEFAULT_DISTANCE_MM);
    let actuator = Arc::new(SimulatedActuator::new());

    let aggregator = SensorAggregator::new(
        sensors,
        registers.clone(),
        sensor_count,
        config.sensing.threshold_mm,
        config.sensing.debounce_samples,
    );
    let bridge = ActuatorBridge::new(
        actuator,
        registers.clone(),
        config.registers.actuator_register,
    );
    let poll = PollService::new(
        aggregator,
        bridge,
        config.sensing.poll_interval_ms,
        sensor_count,
    );
    let server = ModbusServer::new(
        config.network.bind_address.clone(),
        config.network.port,
        registers,
    );

    tokio::select! {
        result = server.start() => {
            result?;
        }
        _ = poll.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("🛑 Shutting down");
        }
    }

    Ok(())
}

/// One poll cycle against the simulated bank, then dump the register map.
async fn probe(config: &Config) -> Result<()> {
    let registers = RegisterMap::shared(config.registers.register_count);
    let sensor_count = config.registers.sensor_count as usize;

    let sensors = SimulatedSensorBank::shared(sensor_count, SIMULATED_DEFAULT_DISTANCE_MM);
    let actuator = Arc::new(SimulatedActuator::new());
    let aggregator = SensorAggregator::new(
        sensors,
        registers.clone(),
        sensor_count,
        config.sensing.threshold_mm,
        config.sensing.debounce_samples,
    );
    let bridge = ActuatorBridge::new(
        actuator,
        registers.clone(),
        config.registers.actuator_register,
    );
    let mut poll = PollService::new(aggregator, bridge, config.sensing.poll_interval_ms, sensor_count);

    poll.run_cycle().await;

    println!("⏰ {} - register map after one poll cycle", Utc::now().format("%Y-%m-%d %H:%M:%S"));
    let map = registers
        .lock()
        .map_err(|_| anyhow::anyhow!("register lock poisoned"))?;
    for address in 0..map.len() {
        let value = map.read(address).unwrap_or(0);
        let role = if (address as usize) < sensor_count {
            "presence"
        } else if address == config.registers.actuator_register {
            "actuator"
        } else {
            "reserved"
        };
        println!("   [{}] {} = {}", address, role, value);
    }

    Ok(())
}
