//! Outbound application events.
//!
//! [`ImuModule`](super::module::ImuModule) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, forward to the
//! pub/sub layer, etc.

use crate::bus::{BusOperationStatus, PresenceState};
use crate::decode::DecodedRecord;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The module finished setup.
    Started { source: String, buses: usize },

    /// A device came online, went offline, or was identified.
    Presence {
        bus: String,
        address: u32,
        state: PresenceState,
        newly_identified: bool,
        device_type: Option<&'static str>,
    },

    /// A bus as a whole started or stopped failing.
    BusStatus {
        bus: String,
        status: BusOperationStatus,
    },

    /// Every record decoded for one device during a report, oldest first.
    Samples {
        bus: String,
        address: u32,
        records: Vec<DecodedRecord>,
    },

    /// The decoder dropped its carry for one device.
    Resync {
        bus: String,
        address: u32,
        total: u32,
    },
}
