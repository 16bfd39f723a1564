//! Typed Modbus TCP request/response model.
//!
//! One `ModbusRequest` is decoded per inbound frame and exactly one
//! `ResponsePdu` (success or exception) is produced per request.

pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;
pub const FC_WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// High bit set on the function code marks an exception response.
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Protocol ceiling for FC3 quantity (Modbus Application Protocol v1.1b).
pub const MAX_READ_QUANTITY: u16 = 125;
/// Protocol ceiling for FC16 quantity.
pub const MAX_WRITE_QUANTITY: u16 = 123;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModbusRequest {
    /// Opaque echo token, returned unchanged in the response.
    pub transaction_id: u16,
    /// Echoed unchanged; the reference configuration accepts any unit id.
    pub unit_id: u8,
    pub pdu: RequestPdu,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPdu {
    ReadHoldingRegisters {
        start: u16,
        quantity: u16,
    },
    WriteSingleRegister {
        address: u16,
        value: u16,
    },
    WriteMultipleRegisters {
        start: u16,
        quantity: u16,
        values: Vec<u16>,
    },
    /// Function codes this slave does not implement. Decoded successfully so
    /// dispatch can answer with a proper Modbus exception instead of the
    /// frame being dropped.
    Unsupported {
        function: u8,
    },
}

impl RequestPdu {
    pub fn function_code(&self) -> u8 {
        match self {
            RequestPdu::ReadHoldingRegisters { .. } => FC_READ_HOLDING_REGISTERS,
            RequestPdu::WriteSingleRegister { .. } => FC_WRITE_SINGLE_REGISTER,
            RequestPdu::WriteMultipleRegisters { .. } => FC_WRITE_MULTIPLE_REGISTERS,
            RequestPdu::Unsupported { function } => *function,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePdu {
    ReadHoldingRegisters {
        values: Vec<u16>,
    },
    /// FC6 echoes the request verbatim per Modbus convention.
    WriteSingleRegister {
        address: u16,
        value: u16,
    },
    WriteMultipleRegisters {
        start: u16,
        quantity: u16,
    },
    Exception {
        /// Original function code, without the exception flag.
        function: u8,
        code: ExceptionCode,
    },
}

impl ResponsePdu {
    pub fn exception(function: u8, code: ExceptionCode) -> Self {
        ResponsePdu::Exception { function, code }
    }

    pub fn is_exception(&self) -> bool {
        matches!(self, ResponsePdu::Exception { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExceptionCode {
    IllegalFunction = 0x01,
    IllegalDataAddress = 0x02,
    IllegalDataValue = 0x03,
    SlaveDeviceFailure = 0x04,
}
