//! Integration tests for the full sensor flow.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use blehr_uart::config::Config;
use blehr_uart::error::HostError;
use blehr_uart::hci::{Frame, H4Decoder, OPCODE_RESET};
use blehr_uart::peripheral::{AdvertisingParams, DeviceAddress, HostEvent, HostStack};
use blehr_uart::transport::{HostSink, LinkHalves};
use blehr_uart::SensorNode;

const HRM_HANDLE: u16 = 0x0012;

#[derive(Clone, Default)]
struct RecordingHost {
    advertised: Arc<Mutex<usize>>,
    notifications: Arc<Mutex<Vec<(u16, Vec<u8>)>>>,
}

impl RecordingHost {
    fn advertise_count(&self) -> usize {
        *self.advertised.lock()
    }

    fn payloads(&self) -> Vec<Vec<u8>> {
        self.notifications
            .lock()
            .iter()
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

impl HostStack for RecordingHost {
    fn set_random_address(&mut self, _address: DeviceAddress) -> Result<(), HostError> {
        Ok(())
    }

    fn start_advertising(&mut self, params: &AdvertisingParams) -> Result<(), HostError> {
        assert_eq!(params.name, "blehr_sensor");
        *self.advertised.lock() += 1;
        Ok(())
    }

    fn notify(&mut self, conn_handle: u16, attr_handle: u16, payload: Vec<u8>) -> Result<(), HostError> {
        assert_eq!(attr_handle, HRM_HANDLE);
        self.notifications.lock().push((conn_handle, payload));
        Ok(())
    }
}

#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<Frame>>,
}

impl HostSink for CollectingSink {
    fn on_event(&self, frame: Frame) {
        self.events.lock().push(frame);
    }

    fn on_acl(&self, _frame: Frame) {}
}

struct MockPort {
    inbound: Arc<Mutex<VecDeque<Vec<u8>>>>,
    wire: Arc<Mutex<Vec<u8>>>,
}

impl Read for MockPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inbound.lock().pop_front() {
            Some(data) => {
                buf[..data.len()].copy_from_slice(&data);
                Ok(data.len())
            }
            None => Err(io::Error::new(ErrorKind::TimedOut, "idle")),
        }
    }
}

impl Write for MockPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Accept at most two bytes per call.
        let n = buf.len().min(2);
        self.wire.lock().extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct MockLink {
    inbound: Arc<Mutex<VecDeque<Vec<u8>>>>,
    wire: Arc<Mutex<Vec<u8>>>,
}

impl MockLink {
    fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            wire: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn halves(&self) -> LinkHalves {
        LinkHalves {
            rx: Box::new(MockPort {
                inbound: self.inbound.clone(),
                wire: Arc::new(Mutex::new(Vec::new())),
            }),
            tx: Box::new(MockPort {
                inbound: Arc::new(Mutex::new(VecDeque::new())),
                wire: self.wire.clone(),
            }),
        }
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.peripheral.address = Some("C0:FF:EE:00:00:01".to_string());
    config
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_notification_session() {
    let host = RecordingHost::default();
    let link = MockLink::new();
    let mut node = SensorNode::new(test_config());
    let handle = node
        .start_with_link(link.halves(), Arc::new(CollectingSink::default()), host.clone(), HRM_HANDLE)
        .unwrap();
    let events = handle.peripheral.clone();

    events.send(HostEvent::Synced).await.unwrap();
    events
        .send(HostEvent::Connect { status: 0, conn_handle: 1 })
        .await
        .unwrap();
    events
        .send(HostEvent::Subscribe { conn_handle: 1, attr_handle: HRM_HANDLE, cur_notify: true })
        .await
        .unwrap();
    settle().await;
    assert_eq!(host.advertise_count(), 1);
    assert!(host.payloads().is_empty());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(host.payloads(), vec![vec![0x06, 90]]);

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(host.payloads(), vec![vec![0x06, 90], vec![0x06, 91]]);

    events
        .send(HostEvent::Subscribe { conn_handle: 1, attr_handle: HRM_HANDLE, cur_notify: false })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(host.payloads().len(), 2);

    events
        .send(HostEvent::Disconnect { conn_handle: 1, reason: 0x13 })
        .await
        .unwrap();
    settle().await;
    assert_eq!(host.advertise_count(), 2);

    node.stop();
}

#[tokio::test(start_paused = true)]
async fn test_new_session_restarts_at_baseline() {
    let host = RecordingHost::default();
    let link = MockLink::new();
    let mut node = SensorNode::new(test_config());
    let handle = node
        .start_with_link(link.halves(), Arc::new(CollectingSink::default()), host.clone(), HRM_HANDLE)
        .unwrap();
    let events = handle.peripheral;

    events.send(HostEvent::Synced).await.unwrap();
    events
        .send(HostEvent::Connect { status: 0, conn_handle: 1 })
        .await
        .unwrap();
    events
        .send(HostEvent::Subscribe { conn_handle: 1, attr_handle: HRM_HANDLE, cur_notify: true })
        .await
        .unwrap();
    settle().await;

    tokio::time::sleep(Duration::from_millis(15_500)).await;
    assert_eq!(host.payloads().len(), 15);
    assert_eq!(host.payloads()[14], vec![0x06, 104]);

    events
        .send(HostEvent::Disconnect { conn_handle: 1, reason: 0x08 })
        .await
        .unwrap();
    events
        .send(HostEvent::Connect { status: 0, conn_handle: 2 })
        .await
        .unwrap();
    events
        .send(HostEvent::Subscribe { conn_handle: 2, attr_handle: HRM_HANDLE, cur_notify: true })
        .await
        .unwrap();
    settle().await;

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let notifications = host.notifications.lock().clone();
    assert_eq!(notifications.len(), 16);
    assert_eq!(notifications[15], (2, vec![0x06, 90]));

    node.stop();
}

#[tokio::test]
async fn test_transport_carries_packets_both_ways() {
    let sink = Arc::new(CollectingSink::default());
    let link = MockLink::new();
    let mut node = SensorNode::new(test_config());
    let handle = node
        .start_with_link(link.halves(), sink.clone(), RecordingHost::default(), HRM_HANDLE)
        .unwrap();

    handle
        .transport
        .send_frame(Frame::command(OPCODE_RESET, &[]))
        .unwrap();
    assert_eq!(*link.wire.lock(), vec![0x01, 0x03, 0x0C, 0x00]);

    let complete = Frame::event(0x0E, &[0x01, 0x03, 0x0C, 0x00]);
    let bytes = complete.encode();
    link.inbound.lock().push_back(bytes[..3].to_vec());
    link.inbound.lock().push_back(bytes[3..].to_vec());

    for _ in 0..500 {
        if !sink.events.lock().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(*sink.events.lock(), vec![complete]);

    node.stop();
    assert!(!handle.transport.is_running());
}

#[tokio::test]
async fn test_start_is_idempotent() {
    let link = MockLink::new();
    let mut node = SensorNode::new(test_config());

    let first = node
        .start_with_link(link.halves(), Arc::new(CollectingSink::default()), RecordingHost::default(), HRM_HANDLE)
        .unwrap();
    let second = node
        .start_with_link(link.halves(), Arc::new(CollectingSink::default()), RecordingHost::default(), HRM_HANDLE)
        .unwrap();

    assert!(Arc::ptr_eq(&first.transport, &second.transport));
    assert!(node.is_running());

    node.stop();
    assert!(!node.is_running());
}

#[tokio::test]
async fn test_concurrent_senders_keep_frames_whole() {
    let link = MockLink::new();
    let mut node = SensorNode::new(test_config());
    let handle = node
        .start_with_link(link.halves(), Arc::new(CollectingSink::default()), RecordingHost::default(), HRM_HANDLE)
        .unwrap();

    let commands = {
        let transport = handle.transport.clone();
        std::thread::spawn(move || {
            for i in 0..50u8 {
                transport.send_command(vec![0x01, 0xFC, 0x03, i, i, i]).unwrap();
            }
        })
    };
    let acl = {
        let transport = handle.transport.clone();
        std::thread::spawn(move || {
            for i in 0..50u8 {
                transport
                    .send_acl(vec![vec![0x01, 0x00, 0x03, 0x00], vec![i, i], vec![i]])
                    .unwrap();
            }
        })
    };
    commands.join().unwrap();
    acl.join().unwrap();

    let wire = link.wire.lock().clone();
    let mut frames = Vec::new();
    H4Decoder::new()
        .feed(&wire, |frame| frames.push(frame))
        .unwrap();

    assert_eq!(frames.len(), 100);
    for frame in &frames {
        let i = frame.data[frame.data.len() - 1];
        assert!(frame.data.ends_with(&[i, i, i]), "torn frame {:?}", frame);
    }

    node.stop();
}

#[test]
fn test_missing_device_fails_startup() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async {
        let mut config = test_config();
        config.serial.port = "/dev/blehr-uart-missing".to_string();
        let mut node = SensorNode::new(config);

        let err = node
            .start(Arc::new(CollectingSink::default()), RecordingHost::default(), HRM_HANDLE)
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<blehr_uart::error::TransportError>(),
            Some(blehr_uart::error::TransportError::DeviceUnavailable(_))
        ));
        assert!(!node.is_running());
    });
}
