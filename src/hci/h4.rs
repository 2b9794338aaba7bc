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

//! Incremental H4 packet reassembly.

use tracing::{debug, warn};

use super::{Frame, PacketType};
use crate::error::FrameError;

/// Rebuilds HCI packets from arbitrarily chunked UART bytes.
///
/// Only one packet is assembled at a time; the H4 format has no
/// interleaving.
pub struct H4Decoder {
    packet_type: Option<PacketType>,
    buffer: Vec<u8>,
    expected_length: Option<usize>,
}

impl H4Decoder {
    /// Create a new decoder in the idle state.
    pub fn new() -> Self {
        Self {
            packet_type: None,
            buffer: Vec::with_capacity(260),
            expected_length: None,
        }
    }

    /// Consume a chunk of received bytes.
    ///
    /// `on_frame` is called once for every packet completed by this chunk, in
    /// wire order. Bytes that cannot start a packet are skipped until the next
    /// valid type indicator; if any were skipped the first offender is
    /// reported after the whole chunk has been processed.
    pub fn feed<F>(&mut self, chunk: &[u8], mut on_frame: F) -> Result<(), FrameError>
    where
        F: FnMut(Frame),
    {
        let mut offset = 0;
        let mut first_invalid = None;
        let mut discarded = 0;

        while offset < chunk.len() {
            let Some(packet_type) = self.packet_type else {
                let byte = chunk[offset];
                offset += 1;
                match PacketType::try_from(byte) {
                    Ok(packet_type) => self.start(packet_type),
                    Err(value) => {
                        warn!("Dropping byte with unknown packet type {:#04X}", value);
                        first_invalid.get_or_insert(value);
                        discarded += 1;
                    }
                }
                continue;
            };

            let target = self.expected_length.unwrap_or(packet_type.header_len());
            let take = (target - self.buffer.len()).min(chunk.len() - offset);
            self.buffer.extend_from_slice(&chunk[offset..offset + take]);
            offset += take;

            if self.buffer.len() < target {
                break;
            }

            let total = match self.expected_length {
                Some(total) => total,
                None => {
                    let total = packet_type.header_len() + packet_type.payload_len(&self.buffer);
                    self.expected_length = Some(total);
                    total
                }
            };

            if self.buffer.len() == total {
                let data = std::mem::take(&mut self.buffer);
                self.reset();
                debug!("{} packet complete: {} bytes", packet_type.as_str(), data.len());
                on_frame(Frame::new(packet_type, data));
            }
        }

        match first_invalid {
            Some(value) => Err(FrameError::UnknownPacketType { value, discarded }),
            None => Ok(()),
        }
    }

    fn start(&mut self, packet_type: PacketType) {
        self.packet_type = Some(packet_type);
        self.buffer.clear();
        self.expected_length = None;
    }

    /// Drop any partially assembled packet.
    pub fn reset(&mut self) {
        self.packet_type = None;
        self.buffer.clear();
        self.expected_length = None;
    }

    /// Check if a packet is partially assembled.
    pub fn is_in_progress(&self) -> bool {
        self.packet_type.is_some()
    }

    /// Get the number of bytes collected for the current packet.
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for H4Decoder {
    fn default() -> Self {
        Self::new()
    }
}
