//! Single-permit gate pacing transmission against the hardware buffer.
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

/// Binary availability token for the hardware transmit buffer.
///
/// Exactly one "ready to accept the next frame" permit exists at a time:
/// a sender consumes it before writing, the transmit-complete interrupt
/// restores it. Signal semantics clamp the count: releasing an already
/// released gate leaves a single permit, so a duplicate interrupt can never
/// let two senders race the one hardware slot.
///
/// The gate starts with no permit; the link driver grants the first one
/// during initialization, when the hardware is known to be idle.
pub struct TxGate {
    permit: Signal<CriticalSectionRawMutex, ()>,
}

impl TxGate {
    pub const fn new() -> Self {
        Self {
            permit: Signal::new(),
        }
    }

    /// Restores the permit. Interrupt context safe; never blocks.
    pub fn release(&self) {
        self.permit.signal(());
    }

    /// Consumes the permit, suspending the calling task until one is
    /// available. A single task is expected to own the transmit path;
    /// ordering between concurrent acquirers is not guaranteed.
    pub async fn acquire(&self) {
        self.permit.wait().await;
    }
}

impl Default for TxGate {
    fn default() -> Self {
        Self::new()
    }
}
