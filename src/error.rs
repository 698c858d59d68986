//! Error definitions shared across library modules.
//! Each type models a specific failure scenario (COB identifier construction,
//! frame limits, link lifecycle, transmission).
use thiserror_no_std::Error;

#[derive(Error, Debug, PartialEq, Eq)]
/// Errors that can occur while building an 11-bit COB identifier.
pub enum CobIdError {
    /// Raw value does not fit in the 11-bit standard identifier space.
    #[error("identifier does not fit in 11 bits")]
    OutOfRange,
    /// CANopen node identifiers occupy the 1..=127 range.
    #[error("node id out of the 1..=127 range")]
    InvalidNodeId,
}

#[derive(Error, Debug, PartialEq, Eq)]
/// Failures while constructing a classic CAN frame.
pub enum FrameError {
    /// Classic CAN payloads carry at most eight bytes.
    #[error("payload length {len} exceeds the 8-byte limit")]
    PayloadTooLong { len: usize },
}

#[derive(Error, Debug, PartialEq, Eq)]
/// Lifecycle errors of the link driver.
pub enum LinkInitError {
    /// `init` was called a second time; the controller is installed once for
    /// the process lifetime.
    #[error("link already initialized")]
    AlreadyInitialized,
}

#[derive(Error, Debug)]
/// Errors encountered while handing a frame to the CAN controller.
pub enum SendError<E: core::fmt::Debug> {
    /// `send` was called before `init` installed a controller.
    #[error("link not initialized")]
    NotInitialized,
    /// The controller rejected the frame with a hardware-level error.
    #[error("CAN controller error: {0:?}")]
    Controller(E),
}
