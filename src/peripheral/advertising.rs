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

//! Device address and advertising parameters.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Advertising data flags.
pub mod flags {
    pub const LE_GENERAL_DISCOVERABLE: u8 = 0x02;
    pub const BR_EDR_NOT_SUPPORTED: u8 = 0x04;
}

/// A 48-bit Bluetooth device address, held in display order (MSB first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceAddress([u8; 6]);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid device address '{0}', expected AA:BB:CC:DD:EE:FF")]
pub struct AddressParseError(String);

impl DeviceAddress {
    pub fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Generate a static random address (two most significant bits set).
    pub fn random_static() -> Self {
        let mut bytes: [u8; 6] = rand::random();
        bytes[0] |= 0xC0;
        Self(bytes)
    }

    pub fn is_static_random(&self) -> bool {
        self.0[0] & 0xC0 == 0xC0
    }

    /// Address in HCI wire order (LSB first).
    pub fn to_le_bytes(&self) -> [u8; 6] {
        let mut bytes = self.0;
        bytes.reverse();
        bytes
    }

    pub fn from_le_bytes(mut bytes: [u8; 6]) -> Self {
        bytes.reverse();
        Self(bytes)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for DeviceAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AddressParseError(s.to_string());
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 6 {
            return Err(invalid());
        }

        let mut bytes = [0u8; 6];
        for (byte, part) in bytes.iter_mut().zip(parts) {
            if part.len() != 2 {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }

        Ok(Self(bytes))
    }
}

/// Advertised TX power level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxPower {
    /// Filled in by the host stack from the controller's setting.
    Auto,
    Dbm(i8),
}

/// What to advertise and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingParams {
    pub flags: u8,
    pub tx_power: TxPower,
    pub name: String,
    pub name_complete: bool,
    /// Undirected connectable.
    pub connectable: bool,
    /// General discoverable.
    pub discoverable: bool,
    /// `None` advertises until connected or stopped.
    pub duration: Option<Duration>,
}

impl AdvertisingParams {
    /// General discoverable, LE only, connectable advertising carrying the
    /// complete device name and the TX power level.
    pub fn general(name: impl Into<String>) -> Self {
        Self {
            flags: flags::LE_GENERAL_DISCOVERABLE | flags::BR_EDR_NOT_SUPPORTED,
            tx_power: TxPower::Auto,
            name: name.into(),
            name_complete: true,
            connectable: true,
            discoverable: true,
            duration: None,
        }
    }
}
