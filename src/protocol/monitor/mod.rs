//! Worker-side monitor loop: drain the link, classify each frame, drive the
//! NMT cell, and hand everything else to the application.
use core::convert::Infallible;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embedded_can::nb::Can;
use embedded_can::Id;

use crate::protocol::nmt::NmtSync;
use crate::transport::can_frame::CanFrame;
use crate::transport::cob_id::FUNC_HEARTBEAT;
use crate::transport::link::CanLink;
use crate::transport::mailbox::RxTimeout;

/// Extracts the sender's node id if `frame` is a heartbeat.
///
/// Heartbeats occupy the identifier range strictly above the heartbeat base
/// COB-ID; the node id is the offset into that range. Extended identifiers
/// never carry CANopen heartbeats.
pub fn heartbeat_node_id(frame: &CanFrame) -> Option<u8> {
    match frame.id {
        Id::Standard(id) if id.as_raw() > FUNC_HEARTBEAT => {
            Some((id.as_raw() - FUNC_HEARTBEAT) as u8)
        }
        _ => None,
    }
}

//==================================================================================NMT_MONITOR
/// Steady-state frame consumer owning the link's receive side.
///
/// Heartbeats are absorbed into the NMT cell; application frames are
/// forwarded through the optional channel, pre-allocated by the firmware
/// (no channel: the monitor acts as a pure NMT listener and discards
/// non-heartbeat traffic).
pub struct NmtMonitor<'a, C: Can, const N: usize, const APP_CAP: usize> {
    link: &'a CanLink<C, N>,
    nmt: &'a NmtSync,
    app_frames: Option<&'a Channel<CriticalSectionRawMutex, CanFrame, APP_CAP>>,
}

impl<'a, C: Can, const N: usize, const APP_CAP: usize> NmtMonitor<'a, C, N, APP_CAP> {
    pub fn new(
        link: &'a CanLink<C, N>,
        nmt: &'a NmtSync,
        app_frames: Option<&'a Channel<CriticalSectionRawMutex, CanFrame, APP_CAP>>,
    ) -> Self {
        Self {
            link,
            nmt,
            app_frames,
        }
    }

    /// Classifies one frame. Heartbeats are consumed (`None`); anything else
    /// comes back for the application layer.
    pub fn handle_frame(&self, frame: CanFrame) -> Option<CanFrame> {
        match heartbeat_node_id(&frame) {
            Some(node_id) => {
                self.nmt.on_heartbeat(node_id);
                None
            }
            None => Some(frame),
        }
    }

    /// Drives the monitor forever: wait for a frame, classify, forward.
    ///
    /// The wait is unbounded and the mailbox receive path is infallible, so
    /// the loop has no error arm; shutdown is observed by the application
    /// through the NMT cell, not by this loop terminating.
    pub async fn run(&self) -> Infallible {
        loop {
            let Some(frame) = self.link.receive(RxTimeout::Forever).await else {
                // Unreachable with an unbounded wait; retry regardless.
                continue;
            };

            if let Some(app_frame) = self.handle_frame(frame) {
                if let Some(channel) = self.app_frames {
                    channel.send(app_frame).await;
                }
            }
        }
    }
}
