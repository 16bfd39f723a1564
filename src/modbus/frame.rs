//! Modbus TCP frame codec.
//!
//! Decodes one complete ADU (MBAP header + PDU) into a typed request and
//! encodes a typed response back into bytes with the MBAP length field
//! recomputed. All multi-byte integers are big-endian; this is the wire
//! contract and must be reproduced bit-for-bit.

use bytes::{BufMut, Bytes, BytesMut};

use super::protocol::{
    ModbusRequest, RequestPdu, ResponsePdu, EXCEPTION_FLAG, FC_READ_HOLDING_REGISTERS,
    FC_WRITE_MULTIPLE_REGISTERS, FC_WRITE_SINGLE_REGISTER,
};
use crate::utils::error::FixtureError;

/// MBAP header: transaction id (2) + protocol id (2) + length (2) + unit id (1).
pub const MBAP_HEADER_LEN: usize = 7;

/// Largest legal PDU (function code + payload) in Modbus TCP.
pub const MAX_PDU_LEN: usize = 253;

fn be_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buf[offset], buf[offset + 1]])
}

/// Decode one complete frame into a typed request.
///
/// Any framing violation fails with `FrameMalformed`: the sender broke the
/// wire contract, so no response is owed and the frame is simply dropped.
/// An unknown function code is NOT a framing violation and decodes as
/// `Unsupported`.
pub fn decode(frame: &[u8]) -> Result<ModbusRequest, FixtureError> {
    if frame.len() < MBAP_HEADER_LEN + 1 {
        return Err(FixtureError::FrameMalformed(format!(
            "frame too short: {} bytes",
            frame.len()
        )));
    }

    let transaction_id = be_u16(frame, 0);
    let protocol_id = be_u16(frame, 2);
    let length = be_u16(frame, 4) as usize;
    let unit_id = frame[6];

    if protocol_id != 0 {
        return Err(FixtureError::FrameMalformed(format!(
            "protocol id {} is not Modbus",
            protocol_id
        )));
    }

    // Length counts the unit id plus the PDU
    if length != frame.len() - 6 {
        return Err(FixtureError::FrameMalformed(format!(
            "declared length {} but {} bytes follow the length field",
            length,
            frame.len() - 6
        )));
    }
    if length > MAX_PDU_LEN + 1 {
        return Err(FixtureError::FrameMalformed(format!(
            "declared length {} exceeds the Modbus TCP maximum",
            length
        )));
    }

    let function = frame[7];
    let body = &frame[8..];

    let pdu = match function {
        FC_READ_HOLDING_REGISTERS => {
            if body.len() != 4 {
                return Err(FixtureError::FrameMalformed(format!(
                    "FC3 payload is {} bytes, expected 4",
                    body.len()
                )));
            }
            RequestPdu::ReadHoldingRegisters {
                start: be_u16(body, 0),
                quantity: be_u16(body, 2),
            }
        }
        FC_WRITE_SINGLE_REGISTER => {
            if body.len() != 4 {
                return Err(FixtureError::FrameMalformed(format!(
                    "FC6 payload is {} bytes, expected 4",
                    body.len()
                )));
            }
            RequestPdu::WriteSingleRegister {
                address: be_u16(body, 0),
                value: be_u16(body, 2),
            }
        }
        FC_WRITE_MULTIPLE_REGISTERS => {
            if body.len() < 5 {
                return Err(FixtureError::FrameMalformed(format!(
                    "FC16 payload is {} bytes, expected at least 5",
                    body.len()
                )));
            }
            let start = be_u16(body, 0);
            let quantity = be_u16(body, 2);
            let byte_count = body[4] as usize;
            // The byte count duplicates the quantity field; both must agree
            // with the bytes actually present.
            if byte_count != quantity as usize * 2 || body.len() != 5 + byte_count {
                return Err(FixtureError::FrameMalformed(format!(
                    "FC16 quantity {} / byte count {} / payload {} disagree",
                    quantity,
                    byte_count,
                    body.len()
                )));
            }
            let values = body[5..]
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            RequestPdu::WriteMultipleRegisters {
                start,
                quantity,
                values,
            }
        }
        other => RequestPdu::Unsupported { function: other },
    };

    Ok(ModbusRequest {
        transaction_id,
        unit_id,
        pdu,
    })
}

/// Encode a response, echoing the request's transaction id and unit id.
/// The MBAP length field is recomputed from the actual PDU size.
pub fn encode(transaction_id: u16, unit_id: u8, response: &ResponsePdu) -> Bytes {
    let mut pdu = BytesMut::with_capacity(MAX_PDU_LEN);

    match response {
        ResponsePdu::ReadHoldingRegisters { values } => {
            pdu.put_u8(FC_READ_HOLDING_REGISTERS);
            pdu.put_u8((values.len() * 2) as u8);
            for value in values {
                pdu.put_u16(*value);
            }
        }
        ResponsePdu::WriteSingleRegister { address, value } => {
            pdu.put_u8(FC_WRITE_SINGLE_REGISTER);
            pdu.put_u16(*address);
            pdu.put_u16(*value);
        }
        ResponsePdu::WriteMultipleRegisters { start, quantity } => {
            pdu.put_u8(FC_WRITE_MULTIPLE_REGISTERS);
            pdu.put_u16(*start);
            pdu.put_u16(*quantity);
        }
        ResponsePdu::Exception { function, code } => {
            pdu.put_u8(function | EXCEPTION_FLAG);
            pdu.put_u8(*code as u8);
        }
    }

    let mut frame = BytesMut::with_capacity(MBAP_HEADER_LEN + pdu.len());
    frame.put_u16(transaction_id);
    frame.put_u16(0); // protocol id
    frame.put_u16((pdu.len() + 1) as u16); // unit id + PDU
    frame.put_u8(unit_id);
    frame.extend_from_slice(&pdu);
    frame.freeze()
}
