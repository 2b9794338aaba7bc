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

//! HCI UART link check.
//!
//! Opens the configured controller port, resets the controller and logs
//! every packet it sends back until interrupted.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blehr_uart::config::Config;
use blehr_uart::hci::{Frame, OPCODE_RESET};
use blehr_uart::transport::{HostSink, TransportDriver};

/// Sink that only logs what the controller sends.
struct LoggingSink;

impl HostSink for LoggingSink {
    fn on_event(&self, frame: Frame) {
        info!("HCI {} <- {}", frame.packet_type.as_str(), hex::encode(&frame.data));
    }

    fn on_acl(&self, frame: Frame) {
        info!("HCI ACL <- {} bytes: {}", frame.data.len(), hex::encode(&frame.data));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("blehr_uart=info".parse()?),
        )
        .init();

    info!("Starting blehr-uart v{}...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load()?;
    info!("Configuration loaded");

    let transport = TransportDriver::initialize(&config.serial, Arc::new(LoggingSink))?;

    let reset = Frame::command(OPCODE_RESET, &[]);
    info!("HCI CMD -> {}", hex::encode(&reset.data));
    transport.send_frame(reset)?;

    info!("Ready. Logging HCI traffic on {}", config.serial.port);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    transport.shutdown();
    info!("blehr-uart stopped");
    Ok(())
}
