//! Port traits: the hexagonal boundary between the polling engine and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ImuModule / BusSystem (domain)
//! ```
//!
//! Driven adapters (clock, event sinks, pub/sub transport) implement these
//! traits.  Bus transports are `embedded_hal::i2c::I2c` implementations and
//! need no port of their own.

use crate::bus::{BusOperationStatus, PresenceEvent};
use crate::fingerprint::Fingerprint;

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock.  Wraps at `u32::MAX`; every consumer
/// compares with [`crate::timing`] helpers.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Bus observer (presence + bus status notifications)
// ───────────────────────────────────────────────────────────────

/// Receives a bus's service-cycle notifications.  At most one observer is
/// registered per bus.
///
/// Called synchronously from [`BusSystem::service`](crate::bus::BusSystem::service):
/// implementations must not block, and a panic here is not caught.
pub trait BusObserver {
    /// Presence transitions of one service cycle, ascending by address.
    fn on_presence_changes(&mut self, bus_name: &str, events: &[PresenceEvent]);

    /// The bus as a whole started or stopped failing.
    fn on_bus_status(&mut self, bus_name: &str, status: BusOperationStatus) {
        let _ = (bus_name, status);
    }
}

// ───────────────────────────────────────────────────────────────
// Pub/sub data source (domain → host messaging layer)
// ───────────────────────────────────────────────────────────────

/// A named producer the host messaging layer publishes from.
pub trait DataSource {
    /// Data-source identifier subscribers ask for.
    fn name(&self) -> &str;

    /// Build the current status document.
    fn snapshot(&mut self) -> Vec<u8>;

    /// Cheap change-detection hash; equal values mean "probably unchanged".
    fn fingerprint(&self) -> Fingerprint;
}

/// Host side of the messaging layer: transmits a built snapshot.
pub trait PublishPort {
    fn publish(&mut self, source: &str, payload: &[u8]);
}
