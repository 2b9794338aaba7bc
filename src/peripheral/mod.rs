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

//! Heart rate peripheral.
//!
//! Advertises, accepts a single central and streams simulated heart rate
//! measurements while the central is subscribed.

mod advertising;
mod events;
mod runtime;
mod sensor;
mod state;
mod timer;

pub use advertising::{flags, AddressParseError, AdvertisingParams, DeviceAddress, TxPower};
pub use events::{HostEvent, HostStack};
pub use runtime::{spawn, PeripheralHandle};
pub use sensor::{measurement_payload, HeartRateSimulator, BASELINE_BPM, SENSOR_CONTACT_DETECTED, UPPER_BPM};
pub use state::{ConnectionContext, Peripheral, PeripheralState};
pub use timer::PeriodicTimer;
