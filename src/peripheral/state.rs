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

//! Advertising, connection and notification lifecycle of the peripheral.

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::advertising::{AdvertisingParams, DeviceAddress};
use super::events::{HostEvent, HostStack};
use super::sensor::{measurement_payload, HeartRateSimulator};
use super::timer::PeriodicTimer;
use crate::error::HostError;

/// Default ATT MTU before any exchange.
const DEFAULT_MTU: u16 = 23;

/// Externally visible state of the peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralState {
    /// Not advertising.
    Idle,
    Advertising,
    Connected { subscribed: bool },
}

/// The single active connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionContext {
    pub conn_handle: u16,
    /// Notifications on the measurement characteristic are enabled.
    pub subscribed: bool,
    /// Characteristic the central last enabled notifications on.
    pub characteristic: Option<u16>,
    pub mtu: u16,
}

impl ConnectionContext {
    fn new(conn_handle: u16) -> Self {
        Self {
            conn_handle,
            subscribed: false,
            characteristic: None,
            mtu: DEFAULT_MTU,
        }
    }
}

enum Link {
    Idle,
    Advertising,
    Connected(ConnectionContext),
}

/// Heart rate peripheral driven by host stack events and timer ticks.
///
/// All methods must be called from one serialized context; the runtime
/// task started by [`crate::peripheral::spawn`] provides that.
pub struct Peripheral<H: HostStack> {
    host: H,
    measurement_handle: u16,
    address: DeviceAddress,
    advertising: AdvertisingParams,
    link: Link,
    timer: PeriodicTimer,
    sensor: HeartRateSimulator,
}

impl<H: HostStack> Peripheral<H> {
    /// Create a new peripheral.
    ///
    /// `measurement_handle` is the value handle of the Heart Rate
    /// Measurement characteristic in the host's attribute table.
    pub fn new(
        host: H,
        measurement_handle: u16,
        address: DeviceAddress,
        advertising: AdvertisingParams,
        notify_interval: Duration,
    ) -> Self {
        Self {
            host,
            measurement_handle,
            address,
            advertising,
            link: Link::Idle,
            timer: PeriodicTimer::new(notify_interval),
            sensor: HeartRateSimulator::new(),
        }
    }

    /// Get the current state.
    pub fn state(&self) -> PeripheralState {
        match &self.link {
            Link::Idle => PeripheralState::Idle,
            Link::Advertising => PeripheralState::Advertising,
            Link::Connected(ctx) => PeripheralState::Connected {
                subscribed: ctx.subscribed,
            },
        }
    }

    pub fn connection(&self) -> Option<&ConnectionContext> {
        match &self.link {
            Link::Connected(ctx) => Some(ctx),
            _ => None,
        }
    }

    pub fn is_timer_armed(&self) -> bool {
        self.timer.is_armed()
    }

    /// When the next notification is due, if any.
    pub fn next_tick(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Value the next notification will carry.
    pub fn current_bpm(&self) -> u8 {
        self.sensor.current()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Handle one host stack event.
    pub fn handle_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::Synced => self.start(),
            HostEvent::Connect {
                status,
                conn_handle,
            } => self.on_connect(status, conn_handle),
            HostEvent::Disconnect {
                conn_handle,
                reason,
            } => self.on_disconnect(conn_handle, reason),
            HostEvent::AdvComplete { reason } => {
                info!("Advertising complete; reason={}", reason);
                if matches!(self.link, Link::Advertising) {
                    self.advertise();
                } else {
                    debug!("Ignoring advertising complete while {:?}", self.state());
                }
            }
            HostEvent::Subscribe {
                conn_handle,
                attr_handle,
                cur_notify,
            } => self.on_subscribe(conn_handle, attr_handle, cur_notify),
            HostEvent::MtuUpdate { conn_handle, mtu } => {
                info!("MTU update; conn_handle={} mtu={}", conn_handle, mtu);
                if let Link::Connected(ctx) = &mut self.link {
                    if ctx.conn_handle == conn_handle {
                        ctx.mtu = mtu;
                    }
                }
            }
        }
    }

    /// Configure the own address and begin advertising.
    ///
    /// Only acts from `Idle`; the host reports sync once per start-up.
    pub fn start(&mut self) {
        if !matches!(self.link, Link::Idle) {
            debug!("Host sync while {:?}, ignoring", self.state());
            return;
        }

        if let Err(e) = self.host.set_random_address(self.address) {
            error!("Failed to set random address {}: {}", self.address, e);
            return;
        }
        info!("Using random address {}", self.address);

        self.advertise();
    }

    fn advertise(&mut self) {
        match self.host.start_advertising(&self.advertising) {
            Ok(()) => {
                self.link = Link::Advertising;
                info!("Advertising as '{}'", self.advertising.name);
            }
            Err(e) => {
                error!("Failed to enable advertising: {}", e);
                self.link = Link::Idle;
            }
        }
    }

    fn on_connect(&mut self, status: u8, conn_handle: u16) {
        info!(
            "Connection {}; status={} conn_handle={}",
            if status == 0 { "established" } else { "failed" },
            status,
            conn_handle
        );

        if !matches!(self.link, Link::Advertising) {
            warn!("Connect event while {:?}, ignoring", self.state());
            return;
        }

        if status == 0 {
            self.link = Link::Connected(ConnectionContext::new(conn_handle));
        } else {
            self.advertise();
        }
    }

    fn on_disconnect(&mut self, conn_handle: u16, reason: u8) {
        info!("Disconnect; conn_handle={} reason={:#04X}", conn_handle, reason);

        if !matches!(self.link, Link::Connected(_)) {
            warn!("Disconnect event while {:?}, ignoring", self.state());
            return;
        }

        self.stop_stream();
        self.advertise();
    }

    fn on_subscribe(&mut self, conn_handle: u16, attr_handle: u16, cur_notify: bool) {
        info!(
            "Subscribe event; conn_handle={} attr_handle={} cur_notify={}",
            conn_handle, attr_handle, cur_notify
        );

        let Link::Connected(ctx) = &mut self.link else {
            warn!("Subscribe event without a connection, ignoring");
            return;
        };

        ctx.characteristic = cur_notify.then_some(attr_handle);

        if attr_handle == self.measurement_handle && cur_notify {
            ctx.conn_handle = conn_handle;
            ctx.subscribed = true;
            self.timer.arm();
            debug!("Measurement notifications every {:?}", self.timer.period());
        } else {
            ctx.subscribed = false;
            self.stop_stream();
        }
    }

    /// Send the next measurement and rearm.
    ///
    /// A tick that arrives after the subscription went away only tidies up.
    pub fn on_tick(&mut self) {
        let target = match &self.link {
            Link::Connected(ctx) if ctx.subscribed => Some(ctx.conn_handle),
            _ => None,
        };
        let Some(conn_handle) = target.filter(|_| self.timer.is_armed()) else {
            debug!("Stale notification tick, no active subscription");
            self.stop_stream();
            return;
        };

        let bpm = self.sensor.next_sample();
        let payload = measurement_payload(bpm).to_vec();

        match self.host.notify(conn_handle, self.measurement_handle, payload) {
            Ok(()) => debug!("Notified heart rate {} bpm to {}", bpm, conn_handle),
            Err(HostError::StaleConnection(handle)) => {
                debug!("Connection {} gone, notification skipped", handle)
            }
            Err(e) => warn!("Failed to send notification: {}", e),
        }

        self.timer.arm();
    }

    fn stop_stream(&mut self) {
        self.timer.disarm();
        self.sensor.reset();
    }
}
