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

//! HCI UART transport driver.
//!
//! Owns the serial device. A dedicated reader thread turns received bytes
//! into packets for the host stack; outbound packets are written
//! synchronously by whichever thread calls the send methods.

use parking_lot::Mutex;
use std::io::{self, ErrorKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::serial::{self, LinkHalves, SerialLink};
use crate::config::SerialConfig;
use crate::error::{Result, TransportError};
use crate::hci::{Frame, H4Decoder, PacketType};

/// Inbound side of the host stack.
///
/// Both methods are called on the reader thread and must not block for long.
pub trait HostSink: Send + Sync {
    /// A complete Command or Event packet arrived.
    fn on_event(&self, frame: Frame);

    /// A complete ACL data packet arrived.
    fn on_acl(&self, frame: Frame);
}

/// Transmit half of the link.
struct TxSide {
    link: Box<dyn SerialLink>,
    /// A frame was cut off on the wire.
    desynced: bool,
}

/// Consecutive failed reads; only the first of a run is logged at `warn`.
#[derive(Default)]
struct ReadFailures {
    count: u32,
}

impl ReadFailures {
    /// Log a failed read. Returns true when it starts a new run.
    fn record(&mut self, e: &io::Error) -> bool {
        self.count = self.count.saturating_add(1);
        if self.count == 1 {
            warn!("Serial read failed: {}", e);
            true
        } else {
            debug!("Serial read failed ({} in a row): {}", self.count, e);
            false
        }
    }

    fn clear(&mut self) {
        if self.count > 0 {
            info!("Serial reads recovered after {} failures", self.count);
            self.count = 0;
        }
    }
}

/// HCI transport over a serial link.
pub struct TransportDriver {
    tx: Mutex<TxSide>,
    max_stalled_writes: u32,
    running: Arc<AtomicBool>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl TransportDriver {
    /// Open the configured device and start the reader thread.
    pub fn initialize(config: &SerialConfig, sink: Arc<dyn HostSink>) -> Result<Self> {
        let halves = serial::open(config)?;
        Self::start(halves, sink, config)
    }

    /// Start the driver on an already opened link.
    pub fn start(halves: LinkHalves, sink: Arc<dyn HostSink>, config: &SerialConfig) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let buffer_size = config.rx_buffer_size.max(1);
        let idle = Duration::from_millis(config.idle_sleep_ms);

        let reader = {
            let running = running.clone();
            let rx = halves.rx;
            thread::Builder::new()
                .name("hci-rx".to_string())
                .spawn(move || Self::reader_loop(rx, sink, running, buffer_size, idle))?
        };

        info!("HCI transport started");

        Ok(Self {
            tx: Mutex::new(TxSide {
                link: halves.tx,
                desynced: false,
            }),
            max_stalled_writes: config.max_stalled_writes.max(1),
            running,
            reader: Mutex::new(Some(reader)),
        })
    }

    /// Send an HCI command packet.
    ///
    /// The packet length is taken from the parameter length field of the
    /// command header; trailing bytes beyond it are not sent. The buffer is
    /// consumed.
    pub fn send_command(&self, command: Vec<u8>) -> Result<()> {
        if command.len() < 3 {
            return Err(TransportError::InvalidCommand {
                expected: 3,
                actual: command.len(),
            });
        }

        let len = 3 + command[2] as usize;
        if command.len() < len {
            return Err(TransportError::InvalidCommand {
                expected: len,
                actual: command.len(),
            });
        }

        let indicator = [u8::from(PacketType::Command)];
        self.write_frame(&[&indicator[..], &command[..len]])?;
        debug!("Sent command {:#06X} ({} bytes)", u16::from_le_bytes([command[0], command[1]]), len);

        Ok(())
    }

    /// Send an ACL data packet supplied as a chain of segments.
    ///
    /// The segments together must hold exactly the 4 byte ACL header plus
    /// the data length it announces; the header may span segments. They
    /// are written back to back while holding the writer lock, so packets
    /// from concurrent callers never interleave. The chain is consumed.
    pub fn send_acl(&self, chain: Vec<Vec<u8>>) -> Result<()> {
        let total: usize = chain.iter().map(Vec::len).sum();
        let header: Vec<u8> = chain.iter().flatten().take(4).copied().collect();
        if header.len() < 4 {
            return Err(TransportError::InvalidAcl {
                expected: 4,
                actual: total,
            });
        }

        let expected = 4 + u16::from_le_bytes([header[2], header[3]]) as usize;
        if total != expected {
            return Err(TransportError::InvalidAcl {
                expected,
                actual: total,
            });
        }

        let indicator = [u8::from(PacketType::Acl)];
        let mut parts: Vec<&[u8]> = Vec::with_capacity(chain.len() + 1);
        parts.push(&indicator);
        parts.extend(chain.iter().map(Vec::as_slice));
        self.write_frame(&parts)?;
        debug!("Sent ACL packet ({} bytes in {} segments)", total, chain.len());

        Ok(())
    }

    /// Send a complete packet of any type.
    pub fn send_frame(&self, frame: Frame) -> Result<()> {
        match frame.packet_type {
            PacketType::Command => self.send_command(frame.data),
            PacketType::Acl => self.send_acl(vec![frame.data]),
            packet_type => {
                let header_len = packet_type.header_len();
                let expected = if frame.data.len() < header_len {
                    header_len
                } else {
                    header_len + packet_type.payload_len(&frame.data)
                };
                if frame.data.len() != expected {
                    return Err(TransportError::InvalidPacket {
                        packet_type: packet_type.as_str(),
                        expected,
                        actual: frame.data.len(),
                    });
                }

                let indicator = [u8::from(packet_type)];
                self.write_frame(&[&indicator[..], &frame.data[..]])
            }
        }
    }

    /// Check if a cut-off frame has left the transmit side out of sync.
    pub fn is_desynchronized(&self) -> bool {
        self.tx.lock().desynced
    }

    /// Accept sends again after the controller was reset out of band
    /// (reset line or power cycle) and waits for a fresh type byte.
    pub fn clear_desync(&self) {
        let mut tx = self.tx.lock();
        if tx.desynced {
            tx.desynced = false;
            info!("HCI transmit side back in sync");
        }
    }

    /// Stop the reader thread and wait for it to exit.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Release);
        if let Some(reader) = self.reader.lock().take() {
            if reader.join().is_err() {
                error!("HCI reader thread panicked");
            }
            info!("HCI transport stopped");
        }
    }

    /// Check if the reader thread is still running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Write one frame, given as consecutive parts, under the writer lock.
    ///
    /// Once a failure leaves part of a frame on the wire every later send
    /// fails with [`TransportError::Desynchronized`] until
    /// [`Self::clear_desync`] is called.
    fn write_frame(&self, parts: &[&[u8]]) -> Result<()> {
        let mut tx = self.tx.lock();
        if tx.desynced {
            return Err(TransportError::Desynchronized);
        }

        let total: usize = parts.iter().map(|part| part.len()).sum();
        let mut sent = 0;
        for part in parts {
            if let Err(e) = self.write_all(tx.link.as_mut(), part, &mut sent) {
                if sent > 0 {
                    tx.desynced = true;
                    error!("Frame cut off after {} of {} bytes, transmit side out of sync", sent, total);
                }
                return Err(match e {
                    TransportError::WriteStall { .. } => TransportError::WriteStall {
                        written: sent,
                        remaining: total - sent,
                    },
                    e => e,
                });
            }
        }

        Ok(())
    }

    /// Write the whole buffer, retrying partial writes. `sent` counts every
    /// byte that reached the link.
    fn write_all(&self, link: &mut dyn SerialLink, mut buf: &[u8], sent: &mut usize) -> Result<()> {
        let total = buf.len();
        let mut stalls = 0;

        while !buf.is_empty() {
            match link.write(buf) {
                Ok(0) => stalls += 1,
                Ok(n) => {
                    buf = &buf[n..];
                    *sent += n;
                    stalls = 0;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                    stalls += 1
                }
                Err(e) => {
                    error!("Serial write failed: {}", e);
                    return Err(e.into());
                }
            }

            if stalls >= self.max_stalled_writes {
                error!("Serial write stalled with {} of {} bytes left", buf.len(), total);
                return Err(TransportError::WriteStall {
                    written: total - buf.len(),
                    remaining: buf.len(),
                });
            }
        }

        Ok(())
    }

    fn reader_loop(
        mut rx: Box<dyn SerialLink>,
        sink: Arc<dyn HostSink>,
        running: Arc<AtomicBool>,
        buffer_size: usize,
        idle: Duration,
    ) {
        debug!("HCI reader loop started");

        let mut decoder = H4Decoder::new();
        let mut buf = vec![0u8; buffer_size];
        let mut failures = ReadFailures::default();

        while running.load(Ordering::Acquire) {
            let received = match rx.read(&mut buf) {
                Ok(n) => n,
                Err(e) if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) => 0,
                Err(e) => {
                    failures.record(&e);
                    thread::sleep(idle);
                    continue;
                }
            };
            failures.clear();

            if received == 0 {
                thread::sleep(idle);
                continue;
            }

            let result = decoder.feed(&buf[..received], |frame| Self::dispatch(sink.as_ref(), frame));
            if let Err(e) = result {
                warn!("Protocol error on HCI link: {}", e);
            }
        }

        debug!("HCI reader loop exited");
    }

    fn dispatch(sink: &dyn HostSink, frame: Frame) {
        match frame.packet_type {
            PacketType::Command | PacketType::Event => sink.on_event(frame),
            PacketType::Acl => sink.on_acl(frame),
            PacketType::Sco | PacketType::Iso => {
                warn!(
                    "Dropping unsupported {} packet ({} bytes)",
                    frame.packet_type.as_str(),
                    frame.data.len()
                );
            }
        }
    }
}

impl Drop for TransportDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}
