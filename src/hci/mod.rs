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

//! HCI packets as they travel over a UART (H4 framing).
//!
//! Every packet on the wire is preceded by a single packet type octet. The
//! packet bodies themselves are opaque here: only the header fields needed
//! to find the end of a packet are interpreted.

mod h4;

pub use h4::H4Decoder;

/// HCI_Reset opcode (OGF 0x03, OCF 0x0003).
pub const OPCODE_RESET: u16 = 0x0C03;

/// H4 packet type indicator, prepended to every packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    Command = 0x01,
    Acl = 0x02,
    Sco = 0x03,
    Event = 0x04,
    Iso = 0x05,
}

impl PacketType {
    /// Number of header bytes that follow the indicator.
    pub fn header_len(&self) -> usize {
        match self {
            Self::Command => 3,
            Self::Acl => 4,
            Self::Sco => 3,
            Self::Event => 2,
            Self::Iso => 4,
        }
    }

    /// Payload length announced by a complete header.
    ///
    /// `header` must hold at least [`header_len`](Self::header_len) bytes.
    pub fn payload_len(&self, header: &[u8]) -> usize {
        match self {
            Self::Command | Self::Sco => header[2] as usize,
            Self::Event => header[1] as usize,
            Self::Acl => u16::from_le_bytes([header[2], header[3]]) as usize,
            Self::Iso => (u16::from_le_bytes([header[2], header[3]]) & 0x3fff) as usize,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "CMD",
            Self::Acl => "ACL",
            Self::Sco => "SCO",
            Self::Event => "EVT",
            Self::Iso => "ISO",
        }
    }
}

impl TryFrom<u8> for PacketType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Command),
            0x02 => Ok(Self::Acl),
            0x03 => Ok(Self::Sco),
            0x04 => Ok(Self::Event),
            0x05 => Ok(Self::Iso),
            other => Err(other),
        }
    }
}

impl From<PacketType> for u8 {
    fn from(packet_type: PacketType) -> Self {
        packet_type as u8
    }
}

/// A single HCI packet: header plus payload, without the type indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub packet_type: PacketType,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(packet_type: PacketType, data: Vec<u8>) -> Self {
        Self { packet_type, data }
    }

    /// Build a command packet from an opcode and its parameters.
    ///
    /// `params` holds at most 255 bytes; the length field is one octet.
    pub fn command(opcode: u16, params: &[u8]) -> Self {
        debug_assert!(params.len() <= u8::MAX as usize, "command parameters exceed 255 bytes");
        let mut data = Vec::with_capacity(3 + params.len());
        data.extend_from_slice(&opcode.to_le_bytes());
        data.push(params.len() as u8);
        data.extend_from_slice(params);
        Self::new(PacketType::Command, data)
    }

    /// Build an event packet from an event code and its parameters.
    ///
    /// `params` holds at most 255 bytes; the length field is one octet.
    pub fn event(code: u8, params: &[u8]) -> Self {
        debug_assert!(params.len() <= u8::MAX as usize, "event parameters exceed 255 bytes");
        let mut data = Vec::with_capacity(2 + params.len());
        data.push(code);
        data.push(params.len() as u8);
        data.extend_from_slice(params);
        Self::new(PacketType::Event, data)
    }

    /// Build an ACL data packet. `handle_flags` carries the 12-bit
    /// connection handle together with the PB/BC flags. `payload` holds at
    /// most 65535 bytes.
    pub fn acl(handle_flags: u16, payload: &[u8]) -> Self {
        debug_assert!(payload.len() <= u16::MAX as usize, "ACL payload exceeds 65535 bytes");
        let mut data = Vec::with_capacity(4 + payload.len());
        data.extend_from_slice(&handle_flags.to_le_bytes());
        data.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        data.extend_from_slice(payload);
        Self::new(PacketType::Acl, data)
    }

    /// Serialize to wire format: type indicator followed by the packet.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + self.data.len());
        bytes.push(self.packet_type.into());
        bytes.extend_from_slice(&self.data);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_type_roundtrip() {
        for value in 0x01..=0x05u8 {
            let packet_type = PacketType::try_from(value).unwrap();
            assert_eq!(u8::from(packet_type), value);
        }
        assert_eq!(PacketType::try_from(0x00), Err(0x00));
        assert_eq!(PacketType::try_from(0xFF), Err(0xFF));
    }

    #[test]
    fn test_payload_len() {
        assert_eq!(PacketType::Command.payload_len(&[0x03, 0x0C, 0x07]), 7);
        assert_eq!(PacketType::Event.payload_len(&[0x0E, 0x04]), 4);
        assert_eq!(PacketType::Acl.payload_len(&[0x40, 0x20, 0x1B, 0x01]), 0x011B);
        // ISO length field is 14 bits wide.
        assert_eq!(PacketType::Iso.payload_len(&[0x00, 0x00, 0x10, 0xC0]), 0x10);
    }

    #[test]
    fn test_encode_command() {
        let frame = Frame::command(OPCODE_RESET, &[]);
        assert_eq!(frame.encode(), vec![0x01, 0x03, 0x0C, 0x00]);
    }

    #[test]
    fn test_encode_acl() {
        let frame = Frame::acl(0x2001, &[0xAA, 0xBB]);
        assert_eq!(
            frame.encode(),
            vec![0x02, 0x01, 0x20, 0x02, 0x00, 0xAA, 0xBB]
        );
    }

    #[test]
    fn test_max_command_parameters() {
        let frame = Frame::command(0xFC01, &[0x55; 255]);
        assert_eq!(frame.data[2], 0xFF);
        assert_eq!(frame.data.len(), 3 + 255);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "command parameters exceed 255 bytes")]
    fn test_oversized_command_parameters() {
        Frame::command(0xFC01, &[0x55; 256]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "ACL payload exceeds 65535 bytes")]
    fn test_oversized_acl_payload() {
        Frame::acl(0x0001, &vec![0u8; 0x1_0000]);
    }
}
