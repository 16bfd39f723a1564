pub mod dispatcher;
pub mod frame;
pub mod protocol;

pub use dispatcher::dispatch;
pub use protocol::{ExceptionCode, ModbusRequest, RequestPdu, ResponsePdu};
