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

//! Host stack boundary for the peripheral.

use super::advertising::{AdvertisingParams, DeviceAddress};
use crate::error::HostError;

/// Lifecycle events delivered by the host stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// Host and controller are in sync; the peripheral may start.
    Synced,
    /// A connection was established (`status == 0`) or the attempt failed.
    Connect { status: u8, conn_handle: u16 },
    /// Connection terminated.
    Disconnect { conn_handle: u16, reason: u8 },
    /// Advertising stopped without a connection.
    AdvComplete { reason: u8 },
    /// The central changed its notification state for a characteristic.
    Subscribe {
        conn_handle: u16,
        attr_handle: u16,
        cur_notify: bool,
    },
    /// ATT MTU negotiated.
    MtuUpdate { conn_handle: u16, mtu: u16 },
}

/// Outbound calls the peripheral makes into the host stack.
pub trait HostStack: Send + 'static {
    /// Configure the random address used as own address.
    fn set_random_address(&mut self, address: DeviceAddress) -> Result<(), HostError>;

    /// Set advertising data and start undirected advertising.
    fn start_advertising(&mut self, params: &AdvertisingParams) -> Result<(), HostError>;

    /// Send a notification. The payload is consumed.
    fn notify(&mut self, conn_handle: u16, attr_handle: u16, payload: Vec<u8>) -> Result<(), HostError>;
}
