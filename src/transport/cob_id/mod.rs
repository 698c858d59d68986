//! Creation and extraction of the 11-bit COB identifiers used by CANopen.
//!
//! A COB-ID (Communication OBject identifier) packs a 4-bit function code and
//! a 7-bit node identifier into the standard CAN arbitration field.
use embedded_can::{Id, StandardId};

use crate::error::CobIdError;

//==================================================================================FUNCTION_CODES
/// NMT module control (master to slaves, node id 0 addresses every node).
pub const FUNC_NMT: u16 = 0x000;
/// SYNC object.
pub const FUNC_SYNC: u16 = 0x080;
/// Server-to-client SDO responses (`FUNC_SDO_TX + node id`).
pub const FUNC_SDO_TX: u16 = 0x580;
/// Client-to-server SDO requests (`FUNC_SDO_RX + node id`).
pub const FUNC_SDO_RX: u16 = 0x600;
/// NMT error control / heartbeat (`FUNC_HEARTBEAT + node id`).
pub const FUNC_HEARTBEAT: u16 = 0x700;

/// Highest CANopen node identifier.
pub const MAX_NODE_ID: u8 = 0x7F;

//==================================================================================COB_ID
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Encapsulates a validated 11-bit CANopen identifier and exposes accessors
/// for the function code and node id halves.
pub struct CobId(StandardId);

impl CobId {
    /// Wraps a raw identifier, rejecting values above the 11-bit limit.
    pub fn new(raw: u16) -> Result<Self, CobIdError> {
        StandardId::new(raw).map(Self).ok_or(CobIdError::OutOfRange)
    }

    /// Heartbeat identifier for the given node (`0x700 + node id`).
    pub fn heartbeat(node_id: u8) -> Result<Self, CobIdError> {
        if node_id == 0 || node_id > MAX_NODE_ID {
            return Err(CobIdError::InvalidNodeId);
        }
        Self::new(FUNC_HEARTBEAT + node_id as u16)
    }

    /// NMT module control identifier (highest bus priority).
    pub fn nmt() -> Self {
        // COB-ID 0x000 is always a valid standard identifier.
        Self(StandardId::ZERO)
    }

    // Getters used to deconstruct the identifier
    /// Upper four bits: the communication object's function code.
    pub fn function_code(&self) -> u16 {
        self.0.as_raw() & 0x780
    }

    /// Lower seven bits: the node identifier.
    pub fn node_id(&self) -> u8 {
        (self.0.as_raw() & 0x7F) as u8
    }

    /// Raw 11-bit value.
    pub fn as_raw(&self) -> u16 {
        self.0.as_raw()
    }
}

impl From<CobId> for StandardId {
    fn from(cob_id: CobId) -> Self {
        cob_id.0
    }
}

impl From<CobId> for Id {
    fn from(cob_id: CobId) -> Self {
        Id::Standard(cob_id.0)
    }
}
