//! In-memory representation of a classic CAN frame.
//!
//! Frames are plain values: they are copied across the interrupt/task
//! boundary rather than shared, so a hardware buffer slot can be reused the
//! moment the copy is made.
use embedded_can::{Frame, Id};

use crate::error::FrameError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Classic CAN frame as exchanged with the controller.
pub struct CanFrame {
    /// Standard (11-bit) or extended (29-bit) arbitration identifier.
    pub id: Id,
    /// Payload buffer. Only the first `len` bytes are meaningful.
    pub data: [u8; 8],
    /// Number of valid payload bytes (0 to 8).
    pub len: usize,
}

impl CanFrame {
    /// Builds a frame from an identifier and a payload of at most 8 bytes.
    pub fn new(id: impl Into<Id>, payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() > 8 {
            return Err(FrameError::PayloadTooLong { len: payload.len() });
        }
        let mut data = [0u8; 8];
        data[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            id: id.into(),
            data,
            len: payload.len(),
        })
    }

    /// The meaningful slice of the payload buffer.
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Copies a controller-owned frame into a value. Remote frames carry no
    /// payload, so `len` tracks the data bytes actually present.
    pub fn from_controller<F: Frame>(raw: &F) -> Self {
        let payload = raw.data();
        let mut data = [0u8; 8];
        data[..payload.len()].copy_from_slice(payload);
        Self {
            id: raw.id(),
            data,
            len: payload.len(),
        }
    }

    /// Re-materializes the frame in the controller's own representation.
    /// `None` only if the controller rejects a frame within classic limits.
    pub fn to_controller<F: Frame>(&self) -> Option<F> {
        F::new(self.id, self.payload())
    }
}
