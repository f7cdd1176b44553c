//! Status snapshot builder.
//!
//! ```text
//!  {"I2CA":{"0x6a":{"_t":"LSM6DS3","x":"<hex records>"}}, "I2CB":{...}}
//! ```
//!
//! One section per bus with buffered data, in bus order.  Building the
//! snapshot hands the raw records to the remote consumer, so the bus
//! buffers are drained.

use log::debug;

use crate::bus::{Bus, BusDevices};

/// Document published when no bus has data.
pub const EMPTY_SNAPSHOT: &str = "{}";

pub fn build_snapshot(buses: &mut [Box<dyn Bus>]) -> String {
    let mut doc = String::from("{");
    for bus in buses.iter_mut() {
        if bus.get_device_addresses(true).is_empty() {
            continue;
        }
        let section = bus.get_poll_responses_json();
        if section == EMPTY_SNAPSHOT {
            continue;
        }
        if doc.len() > 1 {
            doc.push(',');
        }
        let key = serde_json::to_string(bus.name()).unwrap_or_else(|_| String::from("\"?\""));
        doc.push_str(&key);
        doc.push(':');
        doc.push_str(&section);
    }
    doc.push('}');
    debug!("snapshot: {} bytes", doc.len());
    doc
}
