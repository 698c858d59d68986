//! Local NMT (Network ManagemenT) state tracking with transition
//! notification.
//!
//! The state lives in a single guarded cell, readable from any task and
//! mutated only by the worker task interpreting inbound frames, plus the
//! forced transition to `Stopped` issued by the device owner. Waiters
//! suspend until the state they ask for is reached.
use core::cell::RefCell;
use core::future::poll_fn;
use core::task::{Poll, Waker};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

//==================================================================================NMT_STATE
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// CANopen NMT node states.
pub enum NmtState {
    /// Boot state. Left automatically for `PreOperational` on the first
    /// heartbeat observed on the bus.
    Initialization,
    /// Node configurable over SDO; emergency objects and NMT transitions
    /// available, no PDO process data yet.
    PreOperational,
    /// Full service set: SDO, PDO, EMCY, NMT.
    Operational,
    /// Halted by an explicit stop request. Terminal for this core; only the
    /// device owner decides to stop.
    Stopped,
}

//==================================================================================NMT_SYNC
/// Number of registration slots for tasks suspended in [`NmtSync::wait_for`].
const WAITER_SLOTS: usize = 4;

struct Inner {
    state: NmtState,
    waiters: [Option<Waker>; WAITER_SLOTS],
}

impl Inner {
    fn register(&mut self, waker: &Waker) {
        // A task re-polling after a spurious wake reuses its slot.
        if self
            .waiters
            .iter()
            .flatten()
            .any(|registered| registered.will_wake(waker))
        {
            return;
        }
        if let Some(free) = self.waiters.iter_mut().find(|slot| slot.is_none()) {
            *free = Some(waker.clone());
            return;
        }
        // Table exhausted: displace the oldest entry, waking it so the
        // displaced task re-polls and queues again.
        if let Some(displaced) = self.waiters[0].replace(waker.clone()) {
            displaced.wake();
        }
    }

    fn wake_all(&mut self) {
        for waker in self.waiters.iter_mut().filter_map(Option::take) {
            waker.wake();
        }
    }
}

/// Guarded NMT state cell with condition-style notification.
pub struct NmtSync {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Inner>>,
}

impl NmtSync {
    /// Starts in `Initialization`, with no waiters. `const`, so the cell can
    /// live in a `static` next to the link.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                state: NmtState::Initialization,
                waiters: [None, None, None, None],
            })),
        }
    }

    /// Current state, readable from any task.
    pub fn current(&self) -> NmtState {
        self.inner.lock(|cell| cell.borrow().state)
    }

    /// Records a heartbeat observed from `node_id`.
    ///
    /// The boot transition `Initialization -> PreOperational` fires on the
    /// first heartbeat and wakes all waiters; every later heartbeat is a
    /// no-op. All other transitions are driven by explicit NMT protocol
    /// frames handled above this core.
    pub fn on_heartbeat(&self, node_id: u8) {
        #[cfg(feature = "defmt")]
        defmt::trace!("heartbeat from node {}", node_id);
        #[cfg(not(feature = "defmt"))]
        let _ = node_id;

        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            if inner.state == NmtState::Initialization {
                inner.state = NmtState::PreOperational;
                inner.wake_all();
                #[cfg(feature = "defmt")]
                defmt::info!("NMT boot transition: Initialization -> PreOperational");
            }
        });
    }

    /// Forces the state to `Stopped` and wakes all waiters unconditionally.
    /// Issued by the device owner's shutdown path.
    pub fn stop(&self) {
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            inner.state = NmtState::Stopped;
            inner.wake_all();
        });
        #[cfg(feature = "defmt")]
        defmt::info!("NMT stopped");
    }

    /// Suspends the calling task until the state equals `target`, or until
    /// `stop()` forces `Stopped`, so shutdown unblocks every waiter. Returns
    /// the state actually observed; callers distinguish the two outcomes by
    /// inspecting it.
    ///
    /// The predicate is re-checked after every wake; a wake is a hint, not a
    /// guarantee.
    pub async fn wait_for(&self, target: NmtState) -> NmtState {
        poll_fn(|cx| {
            self.inner.lock(|cell| {
                let mut inner = cell.borrow_mut();
                if inner.state == target || inner.state == NmtState::Stopped {
                    Poll::Ready(inner.state)
                } else {
                    inner.register(cx.waker());
                    Poll::Pending
                }
            })
        })
        .await
    }
}

impl Default for NmtSync {
    fn default() -> Self {
        Self::new()
    }
}
