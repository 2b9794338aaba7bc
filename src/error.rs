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

//! Error types shared by the transport and the peripheral.

/// Errors raised by the serial transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Serial device not found: {0}")]
    DeviceUnavailable(String),

    #[error("Serial device busy: {0}")]
    DeviceBusy(String),

    #[error("Serial write stalled with {remaining} bytes left ({written} written)")]
    WriteStall { written: usize, remaining: usize },

    #[error("Command buffer holds {actual} bytes, header announces {expected}")]
    InvalidCommand { expected: usize, actual: usize },

    #[error("ACL chain holds {actual} bytes, header announces {expected}")]
    InvalidAcl { expected: usize, actual: usize },

    #[error("{packet_type} packet holds {actual} bytes, header announces {expected}")]
    InvalidPacket {
        packet_type: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A previous frame was cut off on the wire; the controller must be
    /// reset before the link carries frames again.
    #[error("Transmit side out of sync after a partial frame")]
    Desynchronized,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialport error: {0}")]
    Serial(#[from] serialport::Error),
}

/// Protocol violations found while decoding the inbound byte stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("Packet type ({value:#04X}) is invalid, {discarded} bytes discarded")]
    UnknownPacketType { value: u8, discarded: usize },
}

/// Failures reported by the host stack for outbound calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("Connection handle {0} is no longer valid")]
    StaleConnection(u16),

    #[error("{op} rejected by host stack (rc={code})")]
    Rejected { op: &'static str, code: i32 },
}

pub type Result<T> = std::result::Result<T, TransportError>;
