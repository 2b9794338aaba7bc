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

//! Start-up wiring of transport and peripheral.

use anyhow::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::Config;
use crate::peripheral::{self, AdvertisingParams, HostStack, Peripheral, PeripheralHandle};
use crate::transport::{self, HostSink, LinkHalves, TransportDriver};

/// Handles given to the host stack once the node runs.
#[derive(Clone)]
pub struct NodeHandle {
    /// Outbound HCI packets go here.
    pub transport: Arc<TransportDriver>,
    /// Lifecycle events for the peripheral go here.
    pub peripheral: PeripheralHandle,
}

struct Running {
    handle: NodeHandle,
    task: JoinHandle<()>,
}

/// One heart rate sensor on one HCI UART.
///
/// Owns everything the sensor needs, so several nodes can coexist in one
/// process. Must be started from within a tokio runtime.
pub struct SensorNode {
    config: Config,
    running: Option<Running>,
}

impl SensorNode {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            running: None,
        }
    }

    /// Open the configured serial device and start the node.
    ///
    /// Calling this again after a successful start returns the existing
    /// handles and changes nothing.
    pub fn start<H: HostStack>(
        &mut self,
        sink: Arc<dyn HostSink>,
        host: H,
        measurement_handle: u16,
    ) -> Result<NodeHandle> {
        if let Some(running) = &self.running {
            info!("Sensor node already running");
            return Ok(running.handle.clone());
        }

        let link = transport::open(&self.config.serial)?;
        self.start_with_link(link, sink, host, measurement_handle)
    }

    /// Start the node on an already opened link.
    pub fn start_with_link<H: HostStack>(
        &mut self,
        link: LinkHalves,
        sink: Arc<dyn HostSink>,
        host: H,
        measurement_handle: u16,
    ) -> Result<NodeHandle> {
        if let Some(running) = &self.running {
            info!("Sensor node already running");
            return Ok(running.handle.clone());
        }

        let settings = &self.config.peripheral;
        let address = settings.device_address()?;
        let transport = Arc::new(TransportDriver::start(link, sink, &self.config.serial)?);

        let peripheral = Peripheral::new(
            host,
            measurement_handle,
            address,
            AdvertisingParams::general(settings.device_name.clone()),
            settings.notify_interval(),
        );
        let (peripheral, task) = peripheral::spawn(peripheral);

        let handle = NodeHandle {
            transport,
            peripheral,
        };
        self.running = Some(Running {
            handle: handle.clone(),
            task,
        });

        info!("Sensor node '{}' started", settings.device_name);
        Ok(handle)
    }

    pub fn handle(&self) -> Option<NodeHandle> {
        self.running.as_ref().map(|running| running.handle.clone())
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Stop the event loop and the reader thread.
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.task.abort();
            running.handle.transport.shutdown();
            info!("Sensor node stopped");
        }
    }
}

impl Drop for SensorNode {
    fn drop(&mut self) {
        self.stop();
    }
}
