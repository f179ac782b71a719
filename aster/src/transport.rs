//! Serial transport over a host UART device.
//!
//! Synchronous `serialport` I/O with a 1 ms internal read timeout so
//! the main loop's drain never stalls. `write` hands the whole frame
//! to the OS driver, which is the DMA hand-off of this platform —
//! by the time it returns the transmitter owns the bytes, so
//! `tx_busy` never reports busy.

use std::io::{Read, Write};
use std::time::Duration;

use serialport::{DataBits, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use aster_link::engine::{Transport, TransportError};

/// 8N1 serial transport.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open `device` at `baud`, 8 data bits, no parity, 1 stop bit.
    pub fn open(device: &str, baud: u32) -> Result<Self, TransportError> {
        let port = serialport::new(device, baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(Duration::from_millis(1))
            .open()
            .map_err(|e| TransportError::Io(format!("open {device} at {baud} baud: {e}")))?;
        info!(device, baud, "serial link open");
        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn read_byte(&mut self) -> Option<u8> {
        let mut buf = [0u8; 1];
        match self.port.read(&mut buf) {
            Ok(1) => Some(buf[0]),
            Ok(_) => None,
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => None,
            Err(e) => {
                debug!("serial read error: {e}");
                None
            }
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.port
            .write_all(bytes)
            .and_then(|()| self.port.flush())
            .map_err(|e| TransportError::Io(format!("serial write: {e}")))
    }
}
