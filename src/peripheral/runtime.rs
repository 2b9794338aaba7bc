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

//! Event loop that owns the peripheral.
//!
//! Host events and timer ticks are handled on one task, one at a time. Events
//! are polled first, so an unsubscribe or disconnect that is already queued
//! disarms the timer before a tick due at the same moment can run.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::events::{HostEvent, HostStack};
use super::state::Peripheral;
use super::timer;

/// Sender side used by the host stack to deliver events.
#[derive(Debug, Clone)]
pub struct PeripheralHandle {
    event_tx: mpsc::Sender<HostEvent>,
}

impl PeripheralHandle {
    /// Deliver an event from async code.
    pub async fn send(&self, event: HostEvent) -> Result<(), mpsc::error::SendError<HostEvent>> {
        self.event_tx.send(event).await
    }

    /// Deliver an event from a host thread outside the runtime.
    pub fn blocking_send(&self, event: HostEvent) -> Result<(), mpsc::error::SendError<HostEvent>> {
        self.event_tx.blocking_send(event)
    }

    /// Check if the event loop has stopped.
    pub fn is_closed(&self) -> bool {
        self.event_tx.is_closed()
    }
}

/// Spawn the event loop for `peripheral` on the current tokio runtime.
///
/// The loop ends once every [`PeripheralHandle`] has been dropped.
pub fn spawn<H: HostStack>(peripheral: Peripheral<H>) -> (PeripheralHandle, JoinHandle<()>) {
    let (event_tx, event_rx) = mpsc::channel::<HostEvent>(32);
    let task = tokio::spawn(run(peripheral, event_rx));
    (PeripheralHandle { event_tx }, task)
}

async fn run<H: HostStack>(mut peripheral: Peripheral<H>, mut event_rx: mpsc::Receiver<HostEvent>) {
    debug!("Peripheral event loop started");

    loop {
        let deadline = peripheral.next_tick();

        tokio::select! {
            biased;

            event = event_rx.recv() => match event {
                Some(event) => peripheral.handle_event(event),
                None => break,
            },
            _ = timer::expired(deadline) => peripheral.on_tick(),
        }
    }

    info!("Peripheral event loop stopped");
}
