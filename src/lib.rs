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

//! HCI-over-UART transport and heart rate peripheral lifecycle.
//!
//! [`transport`] moves H4 framed packets between a serial device and the
//! host stack, [`peripheral`] decides when to advertise and when to stream
//! measurements, and [`SensorNode`] wires the two together.

pub mod config;
pub mod error;
pub mod hci;
pub mod node;
pub mod peripheral;
pub mod transport;

pub use node::{NodeHandle, SensorNode};
