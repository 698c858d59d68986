//! Test doubles simulating a non-blocking CAN controller during integration
//! tests.
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use canopen_link::transport::can_frame::CanFrame;
use canopen_link::transport::cob_id::CobId;
use canopen_link::transport::link::CanLink;
use embedded_can::{ErrorKind, Frame, Id, StandardId};

//==================================================================================MOCK_FRAME
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(dead_code)]
/// Controller-side frame representation used by [`MockCan`].
pub struct MockFrame {
    id: Id,
    data: [u8; 8],
    len: usize,
    remote: bool,
}

impl Frame for MockFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > 8 {
            return None;
        }
        let mut buf = [0u8; 8];
        buf[..data.len()].copy_from_slice(data);
        Some(Self {
            id: id.into(),
            data: buf,
            len: data.len(),
            remote: false,
        })
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > 8 {
            return None;
        }
        Some(Self {
            id: id.into(),
            data: [0u8; 8],
            len: dlc,
            remote: true,
        })
    }

    fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    fn is_remote_frame(&self) -> bool {
        self.remote
    }

    fn id(&self) -> Id {
        self.id
    }

    fn dlc(&self) -> usize {
        self.len
    }

    fn data(&self) -> &[u8] {
        if self.remote {
            &[]
        } else {
            &self.data[..self.len]
        }
    }
}

//==================================================================================MOCK_CAN
#[derive(Debug)]
/// Error type surfaced by the mock controller.
pub struct MockError;

impl embedded_can::Error for MockError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Clone, Default)]
#[allow(dead_code)]
/// In-memory CAN controller reproducing the `embedded_can::nb::Can`
/// behavior: a receive register fed by the test, a transmit log, and a
/// switchable "transmit buffer busy" condition.
///
/// Handles are `Clone` so the test keeps one while the link owns another.
pub struct MockCan {
    rx_register: Arc<Mutex<VecDeque<MockFrame>>>,
    tx_log: Arc<Mutex<Vec<MockFrame>>>,
    tx_busy: Arc<AtomicBool>,
    displace_next: Arc<Mutex<Option<MockFrame>>>,
}

#[allow(dead_code)]
impl MockCan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `frame` the next frame pending in the receive register, as if
    /// it had just arrived on the bus.
    pub fn inject(&self, frame: MockFrame) {
        self.rx_register.lock().unwrap().push_back(frame);
    }

    /// Simulates a full (or freed) hardware transmit buffer.
    pub fn set_tx_busy(&self, busy: bool) {
        self.tx_busy.store(busy, Ordering::SeqCst);
    }

    /// Makes the next accepted transmit evict `frame`, mimicking a
    /// controller that replaces a lower-priority pending frame.
    pub fn displace_next(&self, frame: MockFrame) {
        *self.displace_next.lock().unwrap() = Some(frame);
    }

    /// Frames the controller has accepted for transmission, in order.
    pub fn sent(&self) -> Vec<MockFrame> {
        self.tx_log.lock().unwrap().clone()
    }

    /// Frames still pending in the receive register.
    pub fn rx_pending(&self) -> usize {
        self.rx_register.lock().unwrap().len()
    }
}

impl embedded_can::nb::Can for MockCan {
    type Frame = MockFrame;
    type Error = MockError;

    fn transmit(&mut self, frame: &Self::Frame) -> nb::Result<Option<Self::Frame>, Self::Error> {
        if self.tx_busy.load(Ordering::SeqCst) {
            return Err(nb::Error::WouldBlock);
        }
        self.tx_log.lock().unwrap().push(*frame);
        Ok(self.displace_next.lock().unwrap().take())
    }

    fn receive(&mut self) -> nb::Result<Self::Frame, Self::Error> {
        self.rx_register
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(nb::Error::WouldBlock)
    }
}

//==================================================================================FIXTURES
#[allow(dead_code)]
/// Initialized link plus the test-side controller handle. Leaked so spawned
/// tasks can borrow it for `'static`, matching the firmware pattern of a
/// link living in a `static`.
pub fn leaked_link<const N: usize>() -> (&'static CanLink<MockCan, N>, MockCan) {
    let controller = MockCan::new();
    let link: &'static CanLink<MockCan, N> = Box::leak(Box::new(CanLink::new()));
    link.init(controller.clone()).expect("first init");
    (link, controller)
}

#[allow(dead_code)]
/// Heartbeat frame (`0x700 + node id`) as it would arrive from the bus.
pub fn heartbeat_frame(node_id: u8) -> MockFrame {
    MockFrame::new(CobId::heartbeat(node_id).unwrap(), &[0x05]).unwrap()
}

#[allow(dead_code)]
/// Generic application frame with the given standard identifier.
pub fn data_frame(raw_id: u16, payload: &[u8]) -> MockFrame {
    MockFrame::new(StandardId::new(raw_id).unwrap(), payload).unwrap()
}

#[allow(dead_code)]
/// The value-type view of a controller frame, for assertions.
pub fn as_value(frame: &MockFrame) -> CanFrame {
    CanFrame::from_controller(frame)
}
