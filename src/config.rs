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

//! Configuration module.
//!
//! Handles loading and saving the serial line and peripheral settings.

use anyhow::{bail, ensure, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::peripheral::DeviceAddress;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial line settings.
    pub serial: SerialConfig,

    /// Peripheral settings.
    pub peripheral: PeripheralConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl Parity {
    pub fn as_char(&self) -> char {
        match self {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    None,
    RtsCts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Serial device the controller is attached to.
    pub port: String,

    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
    pub flow_control: FlowControl,

    /// Upper bound on a single blocking read, in milliseconds.
    pub read_timeout_ms: u64,

    /// Bytes requested from the device per read.
    pub rx_buffer_size: usize,

    /// Pause after a read that returned nothing, in milliseconds.
    pub idle_sleep_ms: u64,

    /// Consecutive zero-length writes tolerated before giving up.
    pub max_stalled_writes: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
            flow_control: FlowControl::None,
            read_timeout_ms: 10,
            rx_buffer_size: 64,
            idle_sleep_ms: 1,
            max_stalled_writes: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeripheralConfig {
    /// Device name placed in the advertising data.
    pub device_name: String,

    /// Static random address, e.g. "C0:11:22:33:44:55".
    /// A fresh one is generated at startup when unset.
    pub address: Option<String>,

    /// Interval between measurement notifications in milliseconds.
    pub notify_interval_ms: u64,
}

impl Default for PeripheralConfig {
    fn default() -> Self {
        Self {
            device_name: "blehr_sensor".to_string(),
            address: None,
            notify_interval_ms: 1000,
        }
    }
}

impl PeripheralConfig {
    pub fn notify_interval(&self) -> Duration {
        Duration::from_millis(self.notify_interval_ms)
    }

    /// Configured address, or a newly generated static random one.
    pub fn device_address(&self) -> Result<DeviceAddress> {
        match &self.address {
            Some(address) => Ok(address.parse()?),
            None => Ok(DeviceAddress::random_static()),
        }
    }
}

impl Config {
    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("blehr-uart")
            .join("config.toml")
    }

    /// Load configuration from file or create default.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Check values the serial layer and the peripheral cannot work with.
    pub fn validate(&self) -> Result<()> {
        let serial = &self.serial;
        ensure!(!serial.port.is_empty(), "serial.port must not be empty");
        ensure!(serial.baud_rate > 0, "serial.baud_rate must be positive");
        ensure!(
            (5..=8).contains(&serial.data_bits),
            "serial.data_bits must be 5..=8, got {}",
            serial.data_bits
        );
        ensure!(
            (1..=2).contains(&serial.stop_bits),
            "serial.stop_bits must be 1 or 2, got {}",
            serial.stop_bits
        );
        ensure!(serial.rx_buffer_size > 0, "serial.rx_buffer_size must be positive");

        let peripheral = &self.peripheral;
        ensure!(
            !peripheral.device_name.is_empty(),
            "peripheral.device_name must not be empty"
        );
        ensure!(
            peripheral.notify_interval_ms > 0,
            "peripheral.notify_interval_ms must be positive"
        );
        if let Some(address) = &peripheral.address {
            if let Err(e) = address.parse::<DeviceAddress>() {
                bail!("peripheral.address: {}", e);
            }
        }

        Ok(())
    }
}
