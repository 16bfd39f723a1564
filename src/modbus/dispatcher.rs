//! Request dispatch against the register map.
//!
//! Pure transformation from a decoded PDU to a response PDU. The caller holds
//! the register lock for the duration of the call, which is what makes FC16
//! writes and FC3 reads atomic with respect to each other and to sensor
//! updates.

use super::protocol::{
    ExceptionCode, RequestPdu, ResponsePdu, MAX_READ_QUANTITY, MAX_WRITE_QUANTITY,
};
use crate::registers::RegisterMap;

pub fn dispatch(pdu: &RequestPdu, registers: &mut RegisterMap) -> ResponsePdu {
    let function = pdu.function_code();

    match pdu {
        RequestPdu::ReadHoldingRegisters { start, quantity } => {
            // A quantity outside the protocol's legal range is a data-value
            // violation, distinct from an address-range violation; conformant
            // masters can observe the difference.
            if *quantity == 0 || *quantity > MAX_READ_QUANTITY {
                return ResponsePdu::exception(function, ExceptionCode::IllegalDataValue);
            }
            match registers.read_range(*start, *quantity) {
                Some(values) => ResponsePdu::ReadHoldingRegisters { values },
                None => ResponsePdu::exception(function, ExceptionCode::IllegalDataAddress),
            }
        }
        RequestPdu::WriteSingleRegister { address, value } => {
            if registers.write(*address, *value) {
                ResponsePdu::WriteSingleRegister {
                    address: *address,
                    value: *value,
                }
            } else {
                ResponsePdu::exception(function, ExceptionCode::IllegalDataAddress)
            }
        }
        RequestPdu::WriteMultipleRegisters {
            start,
            quantity,
            values,
        } => {
            if *quantity == 0 || *quantity > MAX_WRITE_QUANTITY {
                return ResponsePdu::exception(function, ExceptionCode::IllegalDataValue);
            }
            if registers.write_range(*start, values) {
                ResponsePdu::WriteMultipleRegisters {
                    start: *start,
                    quantity: *quantity,
                }
            } else {
                ResponsePdu::exception(function, ExceptionCode::IllegalDataAddress)
            }
        }
        RequestPdu::Unsupported { .. } => {
            ResponsePdu::exception(function, ExceptionCode::IllegalFunction)
        }
    }
}
