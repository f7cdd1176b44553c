//! Buses and the devices on them.
//!
//! ```text
//!  BusRegistry ──create_from_config──▶ BusSystem ──owns──▶ Box<dyn Bus>
//!                                          │                   │
//!                                          │ service()         │ DeviceRecord × n
//!                                          ▼                   ▼
//!                                   BusObserver ◀── ServiceReport (PresenceEvent…)
//! ```
//!
//! A [`Bus`] owns its device table and does all transport work inside
//! [`Bus::service`].  Device data is read back through the [`BusDevices`]
//! interface, which every bus also implements.

pub mod device;
pub mod i2c;
pub mod presence;
pub mod registry;
pub mod system;

use crate::decode::{DecodeState, DecodedRecord};

pub use presence::{PresenceEvent, PresenceState};
pub use registry::{BusFactory, BusRegistry};
pub use system::BusSystem;

/// Position of a bus in the system, in configuration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BusId(pub usize);

/// Whether the bus as a whole is carrying transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOperationStatus {
    Ok,
    Failing,
}

impl BusOperationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "Ok",
            Self::Failing => "Failing",
        }
    }
}

/// Everything one `service()` call observed, for the caller to route.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceReport {
    /// Presence transitions, ascending by address.
    pub presence: Vec<PresenceEvent>,
    /// Set when the bus operation status changed during this call.
    pub bus_status: Option<BusOperationStatus>,
    /// Transactions issued during this call.
    pub transactions: usize,
}

impl ServiceReport {
    pub fn is_empty(&self) -> bool {
        self.presence.is_empty() && self.bus_status.is_none()
    }
}

/// Per-bus view of device data (the device-interface contract).
pub trait BusDevices {
    /// Known device addresses, ascending.  With `only_with_pending_data`,
    /// only those whose poll-response buffer is non-empty.
    fn get_device_addresses(&self, only_with_pending_data: bool) -> Vec<u32>;

    /// Decode up to `max_records` buffered poll responses of `address`
    /// into `out`, threading `state` between calls.  Returns the number
    /// of records appended.
    fn get_decoded_poll_responses(
        &mut self,
        address: u32,
        out: &mut Vec<DecodedRecord>,
        max_records: usize,
        state: &mut DecodeState,
    ) -> usize;

    /// Hand every buffered poll response over as a JSON object keyed by
    /// device address.  Drains the buffers.
    fn get_poll_responses_json(&mut self) -> String;
}

/// A bus instance.
pub trait Bus: BusDevices {
    fn name(&self) -> &str;

    /// Driver type name this bus was created from.
    fn type_name(&self) -> &str;

    /// Run one round of scheduled transactions within the time budget.
    fn service(&mut self) -> ServiceReport;

    /// Most recent identification and/or data activity (ms).  A change
    /// signal only.
    fn get_last_status_update_ms(&self, include_ident: bool, include_data: bool) -> u32;

    fn operation_status(&self) -> BusOperationStatus;

    /// Human-readable form of a device address.
    fn addr_to_string(&self, address: u32) -> String {
        format!("0x{address:02x}")
    }
}
