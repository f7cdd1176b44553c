//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing application events to the log
//! (UART / USB-CDC in production).  Presence changes arrive here as
//! [`AppEvent::Presence`] forwarded by the module.

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, PublishPort};
use crate::bus::{BusOperationStatus, PresenceState};

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn state_str(state: PresenceState) -> &'static str {
    match state {
        PresenceState::Online => "Online",
        PresenceState::Offline => "Offline (was online)",
        PresenceState::Unknown => "Unknown",
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { source, buses } => {
                info!("START | source={} buses={}", source, buses);
            }
            AppEvent::Presence {
                bus,
                address,
                state,
                newly_identified,
                device_type,
            } => {
                if *newly_identified {
                    info!(
                        "busElemStatus {} 0x{:02x} {} type={}",
                        bus,
                        address,
                        state_str(*state),
                        device_type.unwrap_or("?")
                    );
                } else {
                    info!("busElemStatus {} 0x{:02x} {}", bus, address, state_str(*state));
                }
            }
            AppEvent::BusStatus { bus, status } => match status {
                BusOperationStatus::Ok => info!("busStatus {} {}", bus, status.as_str()),
                BusOperationStatus::Failing => warn!("busStatus {} {}", bus, status.as_str()),
            },
            AppEvent::Samples {
                bus,
                address,
                records,
            } => {
                for (i, r) in records.iter().enumerate() {
                    debug!(
                        "DATA | {} 0x{:02x} {}/{} t={}ms {:?}",
                        bus,
                        address,
                        i + 1,
                        records.len(),
                        r.time_ms,
                        r.fields()
                    );
                }
            }
            AppEvent::Resync {
                bus,
                address,
                total,
            } => {
                warn!("DATA | {} 0x{:02x} decoder resync (total {})", bus, address, total);
            }
        }
    }
}

/// Publish port that writes snapshots to the log.  Stands in for the
/// pub/sub transport when none is attached.
#[derive(Debug, Default)]
pub struct LogPublisher;

impl PublishPort for LogPublisher {
    fn publish(&mut self, source: &str, payload: &[u8]) {
        match core::str::from_utf8(payload) {
            Ok(text) => info!("PUB | {} {}", source, text),
            Err(_) => warn!("PUB | {} {} bytes (not UTF-8)", source, payload.len()),
        }
    }
}
