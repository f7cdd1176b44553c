//! Device presence tracking.
//!
//! The tracker watches transaction outcomes during a `service()` call and
//! turns state changes into [`PresenceEvent`]s.  A device only goes
//! offline after `fail_threshold` consecutive failures, so single misses
//! from bus noise never reach an observer.
//!
//! ```text
//!            success                    failures == threshold
//!  Unknown ──────────▶ Online ──────────────────────────────▶ Offline
//!                        ▲                                      │
//!                        └───────────── success ────────────────┘
//! ```

use super::device::DeviceRecord;
use super::BusId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    /// Never responded.
    Unknown,
    Online,
    Offline,
}

/// One online/offline transition.  Built, delivered, discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceEvent {
    pub bus: BusId,
    pub address: u32,
    pub previous: PresenceState,
    pub state: PresenceState,
    /// First successful identification of this address.
    pub newly_identified: bool,
    /// Device type index, set when `newly_identified`.
    pub device_type: Option<usize>,
}

impl PresenceEvent {
    pub fn is_change_to_online(&self) -> bool {
        self.state == PresenceState::Online && self.previous != PresenceState::Online
    }

    pub fn is_change_to_offline(&self) -> bool {
        self.state == PresenceState::Offline
    }
}

/// Collects the presence events of one service cycle.
#[derive(Debug)]
pub struct PresenceTracker {
    bus: BusId,
    fail_threshold: u8,
    events: Vec<PresenceEvent>,
}

impl PresenceTracker {
    pub fn new(bus: BusId, fail_threshold: u8) -> Self {
        Self {
            bus,
            fail_threshold: fail_threshold.max(1),
            events: Vec::new(),
        }
    }

    /// The device answered.  `identified` carries the type index when this
    /// transaction identified it.  Returns `true` if an event was raised.
    pub fn record_success(
        &mut self,
        dev: &mut DeviceRecord,
        now_ms: u32,
        identified: Option<usize>,
    ) -> bool {
        dev.consecutive_failures = 0;
        dev.last_seen_ms = Some(now_ms);

        let newly_identified = identified.is_some() && !dev.ever_identified;
        if let Some(t) = identified {
            dev.device_type = Some(t);
            dev.ever_identified = true;
        }

        let previous = dev.state;
        dev.state = PresenceState::Online;
        if previous == PresenceState::Online && !newly_identified {
            return false;
        }

        self.events.push(PresenceEvent {
            bus: self.bus,
            address: dev.address,
            previous,
            state: PresenceState::Online,
            newly_identified,
            device_type: if newly_identified { identified } else { None },
        });
        true
    }

    /// The device failed a transaction.  Only online devices are debounced;
    /// silence from an absent address is not news.
    pub fn record_failure(&mut self, dev: &mut DeviceRecord) -> bool {
        if dev.state != PresenceState::Online {
            return false;
        }
        dev.consecutive_failures = dev.consecutive_failures.saturating_add(1);
        if dev.consecutive_failures < self.fail_threshold {
            return false;
        }

        dev.state = PresenceState::Offline;
        // Offline devices are probed by identification, starting next round.
        dev.last_ident_attempt_ms = None;
        self.events.push(PresenceEvent {
            bus: self.bus,
            address: dev.address,
            previous: PresenceState::Online,
            state: PresenceState::Offline,
            newly_identified: false,
            device_type: None,
        });
        true
    }

    /// This cycle's events in ascending address order.
    pub fn take_events(&mut self) -> Vec<PresenceEvent> {
        let mut events = core::mem::take(&mut self.events);
        events.sort_by_key(|e| e.address);
        events
    }
}
