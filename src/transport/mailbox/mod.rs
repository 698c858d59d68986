//! Bounded mailbox carrying received frames from interrupt context to the
//! worker task.
//!
//! The mailbox is strictly single-producer/single-consumer: the receive
//! interrupt deposits, one designated worker task drains. The producer side
//! never suspends; a full mailbox drops the newly arrived frame rather than
//! blocking the interrupt or overwriting a queued frame. The consumer side
//! suspends cooperatively until a frame is available or a timeout elapses.
use core::cell::RefCell;
use core::future::poll_fn;
use core::task::Poll;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::waitqueue::WakerRegistration;
use embassy_time::{Duration, Timer};
use futures_util::future::{select, Either};
use futures_util::pin_mut;
use heapless::Deque;

use crate::transport::can_frame::CanFrame;
use crate::transport::DEFAULT_RX_CAPACITY;

//==================================================================================RX_TIMEOUT
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// How long `receive` may suspend the calling task. An explicit value at
/// every call site, so the blocking contract is visible where it matters.
pub enum RxTimeout {
    /// Suspend until a frame arrives.
    Forever,
    /// Give up once the duration elapses.
    After(Duration),
}

//==================================================================================RX_COUNTERS
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Monotonic diagnostic counters kept by the producer side. Best-effort
/// telemetry, never consulted for control decisions.
pub struct RxCounters {
    /// Frames whose publication failed after a successful allocation.
    pub rx_put_fail_count: u32,
    /// Frames dropped because the mailbox was at capacity on arrival.
    pub rx_buffer_full_count: u32,
}

//==================================================================================FRAME_MAILBOX
struct Inner<const N: usize> {
    slots: Deque<CanFrame, N>,
    consumer: WakerRegistration,
    rx_put_fail_count: u32,
    rx_buffer_full_count: u32,
}

/// Fixed-capacity frame mailbox. Allocated once, lives for the process
/// lifetime, never resized.
pub struct FrameMailbox<const N: usize = DEFAULT_RX_CAPACITY> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Inner<N>>>,
}

/// Witness for a reserved mailbox slot, handed out by [`FrameMailbox::try_alloc`].
pub struct FrameSlot<'a, const N: usize> {
    mailbox: &'a FrameMailbox<N>,
}

impl<'a, const N: usize> FrameSlot<'a, N> {
    /// Publishes `frame` into the reserved slot and wakes the consumer.
    ///
    /// Interrupt context only. A publication failure here means the
    /// single-producer contract was violated; the event is counted and
    /// execution continues, because the interrupt handler must never halt.
    pub fn commit(self, frame: CanFrame) {
        self.mailbox.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            match inner.slots.push_back(frame) {
                Ok(()) => inner.consumer.wake(),
                Err(_) => {
                    inner.rx_put_fail_count += 1;
                    #[cfg(feature = "defmt")]
                    defmt::warn!("RX slot publication failed, frame lost");
                }
            }
        });
    }
}

impl<const N: usize> FrameMailbox<N> {
    /// Creates an empty mailbox. `const`, so the mailbox can live in a
    /// `static` and exist before any runtime initialization.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                slots: Deque::new(),
                consumer: WakerRegistration::new(),
                rx_put_fail_count: 0,
                rx_buffer_full_count: 0,
            })),
        }
    }

    /// Reserves a slot for one frame. Interrupt context only; never blocks.
    ///
    /// Returns `None` when the mailbox is at capacity, counting the arrival
    /// as dropped. The caller is expected to have drained the hardware
    /// receive register already, so declining here discards the frame
    /// without wedging the controller.
    pub fn try_alloc(&self) -> Option<FrameSlot<'_, N>> {
        let has_room = self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            if inner.slots.is_full() {
                inner.rx_buffer_full_count += 1;
                false
            } else {
                true
            }
        });

        if has_room {
            Some(FrameSlot { mailbox: self })
        } else {
            #[cfg(feature = "defmt")]
            defmt::warn!("RX mailbox full, dropping frame");
            None
        }
    }

    /// Waits for the next frame, up to `timeout`. Worker task only.
    ///
    /// `None` means the timeout elapsed without a frame, a normal outcome of
    /// a bounded wait. The frame is copied out and its slot released before
    /// returning, restoring producer-side capacity immediately.
    pub async fn receive(&self, timeout: RxTimeout) -> Option<CanFrame> {
        match timeout {
            RxTimeout::Forever => Some(self.next_frame().await),
            RxTimeout::After(delay) => {
                let deadline = Timer::after(delay);
                let frame = self.next_frame();
                pin_mut!(deadline);
                pin_mut!(frame);

                match select(deadline, frame).await {
                    Either::Left(_) => None,
                    Either::Right((frame, _)) => Some(frame),
                }
            }
        }
    }

    /// Snapshot of the producer-side diagnostic counters.
    pub fn counters(&self) -> RxCounters {
        self.inner.lock(|cell| {
            let inner = cell.borrow();
            RxCounters {
                rx_put_fail_count: inner.rx_put_fail_count,
                rx_buffer_full_count: inner.rx_buffer_full_count,
            }
        })
    }

    /// Number of frames currently queued.
    pub fn len(&self) -> usize {
        self.inner.lock(|cell| cell.borrow().slots.len())
    }

    /// True when no frame is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn next_frame(&self) -> CanFrame {
        poll_fn(|cx| {
            self.inner.lock(|cell| {
                let mut inner = cell.borrow_mut();
                match inner.slots.pop_front() {
                    Some(frame) => Poll::Ready(frame),
                    None => {
                        // Registration happens under the same lock as the
                        // producer's push, so a deposit between the empty
                        // check and the registration is impossible.
                        inner.consumer.register(cx.waker());
                        Poll::Pending
                    }
                }
            })
        })
        .await
    }
}

impl<const N: usize> Default for FrameMailbox<N> {
    fn default() -> Self {
        Self::new()
    }
}
