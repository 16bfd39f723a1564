//! Modbus TCP slave session loop.
//!
//! One client is served at a time: accept, serve the connection until the
//! peer disconnects or the stream fails, then go back to accepting. Nothing
//! about a request survives past its own iteration - the function handled is
//! always the one decoded from the frame just read.

use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::modbus::dispatch;
use crate::modbus::frame::{self, MAX_PDU_LEN, MBAP_HEADER_LEN};
use crate::registers::SharedRegisters;
use crate::utils::error::FixtureError;

pub struct ModbusServer {
    bind_address: String,
    port: u16,
    registers: SharedRegisters,
}

impl ModbusServer {
    pub fn new(bind_address: String, port: u16, registers: SharedRegisters) -> Self {
        Self {
            bind_address,
            port,
            registers,
        }
    }

    /// Accept/serve loop. Only returns if the listener itself cannot be
    /// bound; per-session failures are logged and the loop keeps accepting.
    pub async fn start(&self) -> Result<(), FixtureError> {
        let bind = format!("{}:{}", self.bind_address, self.port);
        let listener = TcpListener::bind(&bind).await.map_err(|e| {
            FixtureError::ConnectionError(format!("Failed to bind {}: {}", bind, e))
        })?;

        info!("🔌 Modbus TCP slave listening on {}", bind);

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    info!("🔗 Client connected: {}", peer);
                    match self.serve_connection(stream).await {
                        Ok(()) => info!("✅ Client {} disconnected", peer),
                        Err(e) => warn!("❌ Session with {} ended: {}", peer, e),
                    }
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }

    /// Serve one established connection until it closes.
    ///
    /// PDU-level malformations drop the frame and keep the session alive.
    /// Header-level violations (wrong protocol id, impossible length) end the
    /// session instead: the byte stream cannot be resynchronized after them.
    async fn serve_connection<S>(&self, mut stream: S) -> Result<(), FixtureError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut header = [0u8; MBAP_HEADER_LEN];

        loop {
            match stream.read_exact(&mut header).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(e.into()),
            }

            let protocol_id = u16::from_be_bytes([header[2], header[3]]);
            let declared_len = u16::from_be_bytes([header[4], header[5]]) as usize;

            if protocol_id != 0 {
                return Err(FixtureError::FrameMalformed(format!(
                    "protocol id {} is not Modbus",
                    protocol_id
                )));
            }
            // declared_len counts unit id + PDU; the buffer is sized from it
            // only after this check.
            if declared_len < 2 || declared_len > MAX_PDU_LEN + 1 {
                return Err(FixtureError::FrameMalformed(format!(
                    "declared length {} outside [2, {}]",
                    declared_len,
                    MAX_PDU_LEN + 1
                )));
            }

            let mut adu = vec![0u8; MBAP_HEADER_LEN + declared_len - 1];
            adu[..MBAP_HEADER_LEN].copy_from_slice(&header);
            match stream.read_exact(&mut adu[MBAP_HEADER_LEN..]).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(e.into()),
            }

            debug!("📥 Frame: {}", hex::encode(&adu));

            let request = match frame::decode(&adu) {
                Ok(request) => request,
                Err(e) => {
                    // Framing violated: drop the frame, send nothing, await
                    // the next one.
                    warn!("Dropping malformed frame: {}", e);
                    continue;
                }
            };

            let response = {
                let mut registers = self
                    .registers
                    .lock()
                    .map_err(|_| FixtureError::LockError)?;
                dispatch(&request.pdu, &mut registers)
            };
            if response.is_exception() {
                debug!(
                    "Request FC {} answered with exception {:?}",
                    request.pdu.function_code(),
                    response
                );
            }

            let out = frame::encode(request.transaction_id, request.unit_id, &response);
            debug!("📤 Frame: {}", hex::encode(&out));
            stream
                .write_all(&out)
                .await
                .map_err(|e| FixtureError::CommunicationError(format!("Send failed: {}", e)))?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::RegisterMap;
    use tokio::io::duplex;

    fn server_with_registers() -> (ModbusServer, SharedRegisters) {
        let registers = RegisterMap::shared(8);
        let server = ModbusServer::new("127.0.0.1".to_string(), 0, registers.clone());
        (server, registers)
    }

    async fn exchange(server: &ModbusServer, frames: &[Vec<u8>]) -> Vec<u8> {
        let (mut client, service) = duplex(1024);
        let serve = server.serve_connection(service);

        let drive = async {
            for frame in frames {
                client.write_all(frame).await.unwrap();
            }
            // Half-close so the serve loop sees EOF after the last response
            client.shutdown().await.unwrap();
            let mut responses = Vec::new();
            client.read_to_end(&mut responses).await.unwrap();
            responses
        };

        let (result, responses) = tokio::join!(serve, drive);
        result.unwrap();
        responses
    }

    #[tokio::test]
    async fn read_presence_block_matches_register_contents() {
        let (server, registers) = server_with_registers();
        {
            let mut map = registers.lock().unwrap();
            for (i, v) in [1u16, 0, 1, 1, 0, 0, 1].iter().enumerate() {
                map.write(i as u16, *v);
            }
        }

        let request = vec![
            0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0xFF, 0x03, 0x00, 0x00, 0x00, 0x07,
        ];
        let response = exchange(&server, &[request]).await;

        // byteCount = 14, then 7 register pairs
        assert_eq!(
            response,
            vec![
                0x00, 0x01, 0x00, 0x00, 0x00, 0x11, 0xFF, 0x03, 0x0E, 0x00, 0x01, 0x00, 0x00,
                0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
            ]
        );
    }

    #[tokio::test]
    async fn write_single_register_updates_map_and_echoes() {
        let (server, registers) = server_with_registers();

        let request = vec![
            0x00, 0x05, 0x00, 0x00, 0x00, 0x06, 0x01, 0x06, 0x00, 0x07, 0x00, 0x01,
        ];
        let response = exchange(&server, &[request.clone()]).await;

        assert_eq!(response, request);
        assert_eq!(registers.lock().unwrap().read(7), Some(1));
    }

    #[tokio::test]
    async fn out_of_bounds_read_gets_exception_not_disconnect() {
        let (server, _registers) = server_with_registers();

        let bad = vec![
            0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x08, 0x00, 0x01,
        ];
        let good = vec![
            0x00, 0x02, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x01,
        ];
        let responses = exchange(&server, &[bad, good]).await;

        assert_eq!(
            responses,
            vec![
                // exception: FC3 | 0x80, IllegalDataAddress
                0x00, 0x01, 0x00, 0x00, 0x00, 0x03, 0x01, 0x83, 0x02,
                // then the in-bounds read is served normally
                0x00, 0x02, 0x00, 0x00, 0x00, 0x05, 0x01, 0x03, 0x02, 0x00, 0x00,
            ]
        );
    }

    #[tokio::test]
    async fn malformed_frame_is_dropped_and_session_continues() {
        let (server, _registers) = server_with_registers();

        // Declared length says 7 but the FC3 payload carries an extra byte
        let malformed = vec![
            0x00, 0x01, 0x00, 0x00, 0x00, 0x07, 0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0xAA,
        ];
        let wellformed = vec![
            0x00, 0x02, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x01,
        ];
        let responses = exchange(&server, &[malformed, wellformed]).await;

        // No bytes for the malformed frame; the next one is served normally
        assert_eq!(
            responses,
            vec![0x00, 0x02, 0x00, 0x00, 0x00, 0x05, 0x01, 0x03, 0x02, 0x00, 0x00]
        );
    }

    #[tokio::test]
    async fn unsupported_function_gets_illegal_function_exception() {
        let (server, _registers) = server_with_registers();

        let request = vec![
            0x00, 0x09, 0x00, 0x00, 0x00, 0x06, 0x01, 0x2B, 0x00, 0x00, 0x00, 0x01,
        ];
        let response = exchange(&server, &[request]).await;

        assert_eq!(
            response,
            vec![0x00, 0x09, 0x00, 0x00, 0x00, 0x03, 0x01, 0xAB, 0x01]
        );
    }

    #[tokio::test]
    async fn nonzero_protocol_id_ends_the_session() {
        let (server, _registers) = server_with_registers();
        let (mut client, service) = duplex(1024);

        let serve = server.serve_connection(service);
        let drive = async {
            client
                .write_all(&[
                    0x00, 0x01, 0x00, 0x05, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x01,
                ])
                .await
                .unwrap();
            let mut buf = Vec::new();
            client.read_to_end(&mut buf).await.unwrap();
            buf
        };

        let (result, responses) = tokio::join!(serve, drive);
        assert!(matches!(result, Err(FixtureError::FrameMalformed(_))));
        assert!(responses.is_empty());
    }

    #[tokio::test]
    async fn write_multiple_registers_round_trip() {
        let (server, registers) = server_with_registers();

        let request = vec![
            0x00, 0x03, 0x00, 0x00, 0x00, 0x0B, 0x01, 0x10, 0x00, 0x05, 0x00, 0x02, 0x04, 0x00,
            0x0A, 0x00, 0x0B,
        ];
        let response = exchange(&server, &[request]).await;

        assert_eq!(
            response,
            vec![0x00, 0x03, 0x00, 0x00, 0x00, 0x06, 0x01, 0x10, 0x00, 0x05, 0x00, 0x02]
        );
        let map = registers.lock().unwrap();
        assert_eq!(map.read(5), Some(0x000A));
        assert_eq!(map.read(6), Some(0x000B));
    }
}
