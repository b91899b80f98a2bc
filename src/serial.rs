//! Serial port backend for the prober.

use crate::reader::ResponseSource;
use crate::{ProbeConfig, ProbeError};
use log::info;
use serialport::{ClearBuffer, SerialPort};
use std::io::{self, Read};
use std::thread;

/// Opens the configured port and discards anything already buffered.
pub fn open(config: &ProbeConfig) -> Result<Box<dyn SerialPort>, ProbeError> {
    let port = serialport::new(config.port.as_str(), config.baud)
        .timeout(config.port_timeout)
        .open()
        .map_err(|e| ProbeError::Open {
            port: config.port.clone(),
            source: e.into(),
        })?;
    info!("opened {} at {} baud", config.port, config.baud);

    // Some modules print a boot banner when the line opens.
    thread::sleep(config.open_delay);
    port.clear(ClearBuffer::All).map_err(io::Error::from)?;

    Ok(port)
}

impl ResponseSource for Box<dyn SerialPort> {
    fn bytes_waiting(&mut self) -> io::Result<usize> {
        Ok(self.bytes_to_read()? as usize)
    }

    fn read_waiting(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.read(buf) {
            Ok(n) => Ok(n),
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }
}
