//! CAN link driver: owns the controller handle and exposes two distinct API
//! surfaces.
//!
//! The interrupt-safe surface (`on_receive_interrupt`, `on_transmit_interrupt`)
//! only ever takes short critical sections and never suspends. The task-side
//! surface (`send`, `receive`) may suspend the calling task but never an
//! interrupt. One controller handle serves both contexts; the critical
//! section around it is the only synchronization either surface takes.
use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_can::nb::Can;

use crate::error::{LinkInitError, SendError};
use crate::transport::can_frame::CanFrame;
use crate::transport::mailbox::{FrameMailbox, RxCounters, RxTimeout};
use crate::transport::tx_gate::TxGate;
use crate::transport::DEFAULT_RX_CAPACITY;

/// Outcome of one non-blocking transmit attempt.
enum TxAttempt<E> {
    /// The controller queued the frame.
    Accepted,
    /// The controller queued the frame but evicted a lower-priority one,
    /// which must be put back on the wire by the caller.
    Displaced(CanFrame),
    /// No transmit slot free; wait for the transmit-complete interrupt.
    Busy,
    /// Hardware-level failure.
    Failed(E),
    /// No controller installed yet.
    NotInitialized,
}

//==================================================================================CAN_LINK
/// Link driver over a non-blocking CAN controller.
///
/// Constructed `const`, so firmware owns a single instance in a `static` for
/// the process lifetime and hands it to the interrupt handlers and worker
/// task explicitly (no process-wide mutable handle).
///
/// ```ignore
/// static LINK: CanLink<Controller> = CanLink::new();
/// ```
pub struct CanLink<C: Can, const N: usize = DEFAULT_RX_CAPACITY> {
    controller: Mutex<CriticalSectionRawMutex, RefCell<Option<C>>>,
    mailbox: FrameMailbox<N>,
    tx_gate: TxGate,
}

impl<C: Can, const N: usize> CanLink<C, N> {
    pub const fn new() -> Self {
        Self {
            controller: Mutex::new(RefCell::new(None)),
            mailbox: FrameMailbox::new(),
            tx_gate: TxGate::new(),
        }
    }

    /// Installs the already-configured controller and arms the transmit gate
    /// (the hardware starts out free to send). Bus timing and pin setup
    /// belong to the platform layer; they happen before the controller is
    /// handed over.
    ///
    /// Must be called exactly once before any `send` or `receive`.
    pub fn init(&self, controller: C) -> Result<(), LinkInitError> {
        self.controller.lock(|cell| {
            let mut slot = cell.borrow_mut();
            if slot.is_some() {
                return Err(LinkInitError::AlreadyInitialized);
            }
            *slot = Some(controller);
            Ok(())
        })?;

        self.tx_gate.release();
        Ok(())
    }

    /// Hands `frame` to the controller, suspending the calling task while
    /// the hardware transmit buffer is busy. Outbound backpressure is this
    /// suspension; callers never busy-spin. Task context only.
    pub async fn send(&self, frame: &CanFrame) -> Result<(), SendError<C::Error>> {
        let mut pending = *frame;
        loop {
            match self.try_transmit(&pending) {
                TxAttempt::Accepted => return Ok(()),
                // Keep the evicted frame in flight: it goes out on the next
                // iteration, once the hardware frees a slot.
                TxAttempt::Displaced(evicted) => pending = evicted,
                TxAttempt::Busy => self.tx_gate.acquire().await,
                TxAttempt::Failed(err) => return Err(SendError::Controller(err)),
                TxAttempt::NotInitialized => return Err(SendError::NotInitialized),
            }
        }
    }

    /// Waits for the next received frame, up to `timeout`. Worker task only;
    /// `None` means the timeout elapsed.
    pub async fn receive(&self, timeout: RxTimeout) -> Option<CanFrame> {
        self.mailbox.receive(timeout).await
    }

    /// Receive interrupt entry point. Reads exactly one frame from the
    /// controller per invocation and deposits it into the mailbox.
    ///
    /// The hardware register is drained before capacity is checked, so a
    /// full mailbox discards the frame without leaving the controller in an
    /// error state. Never suspends; critical sections only.
    pub fn on_receive_interrupt(&self) {
        let frame = self.controller.lock(|cell| {
            let mut slot = cell.borrow_mut();
            let controller = slot.as_mut()?;
            match controller.receive() {
                Ok(raw) => Some(CanFrame::from_controller(&raw)),
                // WouldBlock: spurious interrupt, nothing pending. Other
                // controller errors have nothing to deposit either; the
                // read itself already cleared the interrupt condition.
                Err(_) => None,
            }
        });

        let Some(frame) = frame else { return };
        if let Some(frame_slot) = self.mailbox.try_alloc() {
            frame_slot.commit(frame);
        }
    }

    /// Transmit-complete interrupt entry point: restores the gate permit.
    /// Safe against duplicate invocations; the permit count stays at one.
    pub fn on_transmit_interrupt(&self) {
        self.tx_gate.release();
    }

    /// Snapshot of the receive-side diagnostic counters.
    pub fn counters(&self) -> RxCounters {
        self.mailbox.counters()
    }

    fn try_transmit(&self, frame: &CanFrame) -> TxAttempt<C::Error> {
        self.controller.lock(|cell| {
            let mut slot = cell.borrow_mut();
            let Some(controller) = slot.as_mut() else {
                return TxAttempt::NotInitialized;
            };
            let raw = frame
                .to_controller::<C::Frame>()
                .expect("classic CAN frame is within controller limits");
            match controller.transmit(&raw) {
                Ok(None) => TxAttempt::Accepted,
                Ok(Some(evicted)) => TxAttempt::Displaced(CanFrame::from_controller(&evicted)),
                Err(nb::Error::WouldBlock) => TxAttempt::Busy,
                Err(nb::Error::Other(err)) => TxAttempt::Failed(err),
            }
        })
    }
}

impl<C: Can, const N: usize> Default for CanLink<C, N> {
    fn default() -> Self {
        Self::new()
    }
}
