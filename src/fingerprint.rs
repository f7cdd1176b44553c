//! Change-detection fingerprint.
//!
//! Two bytes per bus: the low 16 bits (little-endian) of the bus's most
//! recent status update, identification and data combined.  The publisher
//! only rebuilds a snapshot when this differs from the last one it sent.
//!
//! Two timestamps exactly a multiple of 65536 ms apart alias to the same
//! bytes.  A bus that changes at that exact spacing and at no point in
//! between would be missed; the keep-alive publish covers it.

use crate::bus::Bus;

/// Buses the fingerprint (and the bus system) can hold.
pub const MAX_BUSES: usize = 8;

pub const FINGERPRINT_LEN: usize = MAX_BUSES * 2;

pub type Fingerprint = heapless::Vec<u8, FINGERPRINT_LEN>;

/// Fingerprint over `buses` in registration order.  Pure: the same bus
/// state always gives the same bytes.
pub fn compute_fingerprint(buses: &[Box<dyn Bus>]) -> Fingerprint {
    let mut fp = Fingerprint::new();
    for bus in buses.iter().take(MAX_BUSES) {
        let ms = bus.get_last_status_update_ms(true, true);
        let [lo, hi, ..] = ms.to_le_bytes();
        // Capacity is MAX_BUSES * 2, so neither push can fail.
        let _ = fp.push(lo);
        let _ = fp.push(hi);
    }
    fp
}
