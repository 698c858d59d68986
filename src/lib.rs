//! `canopen-link` library: real-time CAN link layer for CANopen nodes in a
//! `no_std` environment. The crate bridges the receive/transmit interrupt
//! context to a cooperating worker task through a bounded mailbox and a
//! single-permit transmit gate, and tracks the local NMT state driven by
//! heartbeat frames observed on the bus.
#![no_std]
//==================================================================================
/// Domain errors (COB identifier construction, frame limits, link lifecycle,
/// and transmission failures).
pub mod error;
/// CANopen protocol logic: the NMT state machine and the worker-side
/// classification of inbound frames.
pub mod protocol;
/// Link transport: value-type CAN frames, 11-bit COB identifiers, the
/// interrupt-to-task mailbox, the transmit gate, and the link driver.
pub mod transport;
//==================================================================================
