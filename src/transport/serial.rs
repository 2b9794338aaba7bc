// Copyright 2026 blehr-uart contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Serial device access.

use std::io::{Read, Write};
use std::time::Duration;

use tracing::{error, info};

use crate::config::{FlowControl, Parity, SerialConfig};
use crate::error::{Result, TransportError};

/// A byte-oriented link. Reads may return fewer bytes than asked for (or
/// time out), writes may accept only part of the buffer.
pub trait SerialLink: Read + Write + Send {}
impl<T: Read + Write + Send> SerialLink for T {}

/// Independent receive and transmit handles onto the same device.
pub struct LinkHalves {
    pub rx: Box<dyn SerialLink>,
    pub tx: Box<dyn SerialLink>,
}

/// Open and configure the serial device described by `config`.
pub fn open(config: &SerialConfig) -> Result<LinkHalves> {
    let port = serialport::new(&config.port, config.baud_rate)
        .data_bits(data_bits(config.data_bits))
        .stop_bits(stop_bits(config.stop_bits))
        .parity(match config.parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        })
        .flow_control(match config.flow_control {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::RtsCts => serialport::FlowControl::Hardware,
        })
        .timeout(Duration::from_millis(config.read_timeout_ms))
        .open()
        .map_err(|e| {
            error!("Failed to open {}: {}", config.port, e);
            classify_open_error(&config.port, e)
        })?;

    let rx = port.try_clone()?;
    info!(
        "Opened {} at {} baud ({}{}{})",
        config.port,
        config.baud_rate,
        config.data_bits,
        config.parity.as_char(),
        config.stop_bits
    );

    Ok(LinkHalves {
        rx: Box::new(rx),
        tx: Box::new(port),
    })
}

fn data_bits(bits: u8) -> serialport::DataBits {
    match bits {
        5 => serialport::DataBits::Five,
        6 => serialport::DataBits::Six,
        7 => serialport::DataBits::Seven,
        _ => serialport::DataBits::Eight,
    }
}

fn stop_bits(bits: u8) -> serialport::StopBits {
    match bits {
        2 => serialport::StopBits::Two,
        _ => serialport::StopBits::One,
    }
}

fn classify_open_error(port: &str, e: serialport::Error) -> TransportError {
    match e.kind() {
        serialport::ErrorKind::NoDevice
        | serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
            TransportError::DeviceUnavailable(port.to_string())
        }
        // EBUSY (errno 16) has no kind of its own in serialport; it arrives
        // as `Unknown` carrying strerror's "Device or resource busy".
        _ if e.description.to_lowercase().contains("busy") => {
            TransportError::DeviceBusy(port.to_string())
        }
        _ => TransportError::Serial(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_device_is_unavailable() {
        let config = SerialConfig {
            port: "/dev/blehr-uart-does-not-exist".to_string(),
            ..Default::default()
        };

        match open(&config) {
            Err(TransportError::DeviceUnavailable(port)) => {
                assert_eq!(port, "/dev/blehr-uart-does-not-exist")
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("opened a device that does not exist"),
        }
    }

    #[test]
    fn test_classify_busy() {
        let e = serialport::Error::new(
            serialport::ErrorKind::Unknown,
            "Device or resource busy",
        );
        assert!(matches!(
            classify_open_error("/dev/ttyS0", e),
            TransportError::DeviceBusy(_)
        ));
    }
}
