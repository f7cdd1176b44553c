//! Per-address device record.

use heapless::Deque;

use super::presence::PresenceState;
use crate::sensors;

/// Raw poll-response buffer capacity (bytes) per device.
pub const RAW_BUF_CAP: usize = 256;

/// Everything a bus knows about one address.
#[derive(Debug)]
pub struct DeviceRecord {
    pub(crate) address: u32,
    pub(crate) state: PresenceState,
    /// Index into [`sensors::DEVICE_TYPES`] once identified.
    pub(crate) device_type: Option<usize>,
    /// Type named in configuration; restricts identification to it.
    pub(crate) type_hint: Option<usize>,
    pub(crate) ever_identified: bool,
    pub(crate) consecutive_failures: u8,
    pub(crate) last_seen_ms: Option<u32>,
    pub(crate) last_ident_attempt_ms: Option<u32>,
    pub(crate) last_poll_ms: Option<u32>,
    /// Poll records not yet handed to a consumer.
    pending: Deque<u8, RAW_BUF_CAP>,
    dropped_records: u32,
}

impl DeviceRecord {
    pub fn new(address: u32, type_hint: Option<usize>) -> Self {
        Self {
            address,
            state: PresenceState::Unknown,
            device_type: None,
            type_hint,
            ever_identified: false,
            consecutive_failures: 0,
            last_seen_ms: None,
            last_ident_attempt_ms: None,
            last_poll_ms: None,
            pending: Deque::new(),
            dropped_records: 0,
        }
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn state(&self) -> PresenceState {
        self.state
    }

    pub fn device_type(&self) -> Option<usize> {
        self.device_type
    }

    pub fn last_seen_ms(&self) -> Option<u32> {
        self.last_seen_ms
    }

    /// Responded at least once.
    pub fn is_known(&self) -> bool {
        self.last_seen_ms.is_some()
    }

    /// Online with a known type: data polls apply.
    pub fn is_pollable(&self) -> bool {
        self.state == PresenceState::Online && self.device_type.is_some()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Records discarded because the consumer fell behind.
    pub fn dropped_records(&self) -> u32 {
        self.dropped_records
    }

    /// Append one poll record: 16-bit BE poll time followed by `data`.
    /// Drops the oldest whole record(s) if the buffer is full.
    pub(crate) fn push_record(&mut self, now_ms: u32, data: &[u8]) {
        let record_size = 2 + data.len();
        if record_size > RAW_BUF_CAP {
            return;
        }
        while RAW_BUF_CAP - self.pending.len() < record_size {
            for _ in 0..record_size {
                self.pending.pop_front();
            }
            self.dropped_records = self.dropped_records.saturating_add(1);
        }

        let ts = (now_ms as u16).to_be_bytes();
        for &b in ts.iter().chain(data) {
            // Space was made above.
            let _ = self.pending.push_back(b);
        }
    }

    /// Remove up to `max` bytes from the front of the buffer.
    pub(crate) fn drain_pending(&mut self, max: usize) -> Vec<u8> {
        let n = max.min(self.pending.len());
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            if let Some(b) = self.pending.pop_front() {
                out.push(b);
            }
        }
        out
    }

    /// Record size of this device's type, if identified.
    pub fn record_size(&self) -> Option<usize> {
        self.device_type
            .and_then(sensors::device_type)
            .map(|t| t.decoder.record_size())
    }
}
