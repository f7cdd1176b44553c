//! Poll response decoding.
//!
//! A [`PollDecoder`] turns the raw byte stream a device accumulates between
//! decode calls into [`DecodedRecord`]s.  Records have a fixed per-type size
//! but raw buffers are never assumed to be record-aligned, so the bytes of an
//! incomplete trailing record are kept in a [`DecodeState`] carry and
//! completed by the next call.
//!
//! ```text
//!   raw chunk 1            raw chunk 2
//!  ┌────────┬─────┐       ┌──────┬────────┬───┐
//!  │ rec 0  │ r1a │  ──▶  │ r1b  │ rec 2  │r3a│
//!  └────────┴──┬──┘       └──┬───┴────────┴─┬─┘
//!              └── carry ────┘              └── carry
//! ```

use log::warn;

use crate::error::DecodeResyncError;

/// Maximum numeric fields in one decoded record.
pub const MAX_RECORD_FIELDS: usize = 8;

/// Default carry capacity (bytes).  Must be at least the largest record.
pub const DEFAULT_CARRY_CAP: usize = 32;

// ───────────────────────────────────────────────────────────────
// Decoded record
// ───────────────────────────────────────────────────────────────

/// One typed measurement: a timestamp and up to [`MAX_RECORD_FIELDS`]
/// scaled values whose meaning is defined by the device type.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DecodedRecord {
    /// Unwrapped device-side timestamp (milliseconds).
    pub time_ms: u64,
    values: [f32; MAX_RECORD_FIELDS],
    count: u8,
}

impl DecodedRecord {
    pub fn new(time_ms: u64, fields: &[f32]) -> Self {
        let count = fields.len().min(MAX_RECORD_FIELDS);
        let mut values = [0.0; MAX_RECORD_FIELDS];
        values[..count].copy_from_slice(&fields[..count]);
        Self {
            time_ms,
            values,
            count: count as u8,
        }
    }

    pub fn fields(&self) -> &[f32] {
        &self.values[..self.count as usize]
    }
}

// ───────────────────────────────────────────────────────────────
// Decode state (carry)
// ───────────────────────────────────────────────────────────────

/// Unwraps the 16-bit millisecond timestamps embedded in poll records
/// into a monotonic 64-bit time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimestampUnwrap {
    last_raw: Option<u16>,
    offset_ms: u64,
}

impl TimestampUnwrap {
    pub fn unwrap(&mut self, raw: u16) -> u64 {
        if let Some(last) = self.last_raw {
            if raw < last {
                self.offset_ms += 1 << 16;
            }
        }
        self.last_raw = Some(raw);
        self.offset_ms + raw as u64
    }
}

/// Per-device decode cursor threaded through successive decode calls.
///
/// Holds the bytes of a partially received record, the timestamp unwrap
/// state, and a count of stream resyncs.  `N` bounds the carry.
#[derive(Debug, Clone, Default)]
pub struct DecodeState<const N: usize = DEFAULT_CARRY_CAP> {
    carry: heapless::Vec<u8, N>,
    timestamps: TimestampUnwrap,
    resyncs: u32,
}

impl<const N: usize> DecodeState<N> {
    pub fn new() -> Self {
        Self {
            carry: heapless::Vec::new(),
            timestamps: TimestampUnwrap::default(),
            resyncs: 0,
        }
    }

    /// Bytes of an incomplete record waiting for the next call.
    pub fn carry_len(&self) -> usize {
        self.carry.len()
    }

    /// Number of times the carry overflowed and was discarded.
    pub fn resync_count(&self) -> u32 {
        self.resyncs
    }

    /// Forget the carry and timestamp history (device re-identified).
    pub fn reset(&mut self) {
        self.carry.clear();
        self.timestamps = TimestampUnwrap::default();
    }
}

// ───────────────────────────────────────────────────────────────
// Decoder
// ───────────────────────────────────────────────────────────────

/// Converts one complete record into its typed form.
pub type RecordFn = fn(&[u8], &mut TimestampUnwrap) -> DecodedRecord;

/// Fixed-record-size stream decoder for one device type.
#[derive(Clone, Copy)]
pub struct PollDecoder {
    record_size: usize,
    decode_record: RecordFn,
}

impl core::fmt::Debug for PollDecoder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PollDecoder")
            .field("record_size", &self.record_size)
            .finish_non_exhaustive()
    }
}

impl PollDecoder {
    pub const fn new(record_size: usize, decode_record: RecordFn) -> Self {
        assert!(record_size > 0, "record size must be non-zero");
        Self {
            record_size,
            decode_record,
        }
    }

    pub const fn record_size(&self) -> usize {
        self.record_size
    }

    /// Append `raw` to the carry and push every completed record to `out`.
    ///
    /// Returns the number of records pushed.  A carry overflow discards the
    /// carry and the rest of `raw`; records completed before it are kept.
    pub fn decode<const N: usize>(
        &self,
        raw: &[u8],
        state: &mut DecodeState<N>,
        out: &mut Vec<DecodedRecord>,
    ) -> usize {
        match self.feed(raw, state, out) {
            Ok(produced) => produced,
            Err((produced, e)) => {
                state.carry.clear();
                state.resyncs = state.resyncs.saturating_add(1);
                warn!("decode: {} (resync #{})", e, state.resyncs);
                produced
            }
        }
    }

    fn feed<const N: usize>(
        &self,
        raw: &[u8],
        state: &mut DecodeState<N>,
        out: &mut Vec<DecodedRecord>,
    ) -> Result<usize, (usize, DecodeResyncError)> {
        let mut produced = 0;
        let mut rest = raw;

        while !rest.is_empty() {
            let take = (self.record_size - state.carry.len()).min(rest.len());
            if state.carry.extend_from_slice(&rest[..take]).is_err() {
                let discarded = state.carry.len() + rest.len();
                return Err((produced, DecodeResyncError { discarded }));
            }
            rest = &rest[take..];

            if state.carry.len() == self.record_size {
                out.push((self.decode_record)(&state.carry, &mut state.timestamps));
                state.carry.clear();
                produced += 1;
            }
        }

        Ok(produced)
    }
}
