pub mod poll_service;
pub mod slave_server;

pub use poll_service::PollService;
pub use slave_server::ModbusServer;
