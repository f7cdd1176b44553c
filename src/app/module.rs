//! IMU module: drives the bus system and decodes what it collects.
//!
//! ```text
//!   tick(now)
//!     │
//!     ├─▶ BusSystem::service() ──▶ PresenceEvent / BusStatus ──▶ EventSink
//!     │
//!     └─▶ every report_interval_ms (decode_mode = local)
//!           for each bus, for each device with pending data:
//!             get_decoded_poll_responses(.., DecodeState) ──▶ Samples
//! ```
//!
//! In `remote` mode nothing is decoded here; the raw records stay buffered
//! until the pub/sub layer builds a snapshot.

use std::collections::BTreeMap;

use log::{info, warn};

use super::events::AppEvent;
use super::host::SysModule;
use super::ports::{DataSource, EventSink};
use crate::bus::{Bus, BusDevices, BusId, BusRegistry, BusSystem, PresenceEvent};
use crate::config::{DecodeMode, SystemConfig};
use crate::decode::{DecodeState, DecodedRecord};
use crate::error::Result;
use crate::fingerprint::{compute_fingerprint, Fingerprint};
use crate::sensors;
use crate::snapshot::build_snapshot;
use crate::timing::is_timeout;

pub struct ImuModule {
    name: String,
    registry: BusRegistry,
    buses: BusSystem,
    decode_mode: DecodeMode,
    report_interval_ms: u32,
    max_records: usize,
    last_report_ms: Option<u32>,
    /// One carry per (bus, address), created on first decode.
    decode_states: BTreeMap<(BusId, u32), DecodeState>,
    scratch: Vec<DecodedRecord>,
    initialized: bool,
}

impl ImuModule {
    /// `registry` must already hold a factory for every bus type the
    /// configuration will name.
    pub fn new(registry: BusRegistry) -> Self {
        let defaults = SystemConfig::default();
        Self {
            name: defaults.data_source,
            registry,
            buses: BusSystem::new(),
            decode_mode: defaults.decode_mode,
            report_interval_ms: defaults.report_interval_ms,
            max_records: defaults.max_records_per_report,
            last_report_ms: None,
            decode_states: BTreeMap::new(),
            scratch: Vec::new(),
            initialized: false,
        }
    }

    pub fn bus_system(&self) -> &BusSystem {
        &self.buses
    }

    /// Used to register observers after initialization.
    pub fn bus_system_mut(&mut self) -> &mut BusSystem {
        &mut self.buses
    }

    pub fn decode_mode(&self) -> DecodeMode {
        self.decode_mode
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn forward_presence(bus: &str, events: &[PresenceEvent], sink: &mut dyn EventSink) {
        for e in events {
            sink.emit(&AppEvent::Presence {
                bus: bus.to_owned(),
                address: e.address,
                state: e.state,
                newly_identified: e.newly_identified,
                device_type: e.device_type.and_then(sensors::device_type).map(|t| t.name),
            });
        }
    }

    /// Decode up to `max_records` per device with pending data.
    fn decode_pending(&mut self, sink: &mut dyn EventSink) {
        for (i, bus) in self.buses.buses_mut().iter_mut().enumerate() {
            let id = BusId(i);
            for address in bus.get_device_addresses(true) {
                let state = self.decode_states.entry((id, address)).or_default();
                let resyncs_before = state.resync_count();

                self.scratch.clear();
                bus.get_decoded_poll_responses(address, &mut self.scratch, self.max_records, state);

                if state.resync_count() != resyncs_before {
                    sink.emit(&AppEvent::Resync {
                        bus: bus.name().to_owned(),
                        address,
                        total: state.resync_count(),
                    });
                }
                if !self.scratch.is_empty() {
                    sink.emit(&AppEvent::Samples {
                        bus: bus.name().to_owned(),
                        address,
                        records: self.scratch.clone(),
                    });
                }
            }
        }
    }
}

impl SysModule for ImuModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, config: &SystemConfig) -> Result<()> {
        self.buses.setup(&self.registry, &config.buses)?;

        self.name = config.data_source.clone();
        self.decode_mode = config.decode_mode;
        self.report_interval_ms = config.report_interval_ms;
        self.max_records = config.max_records_per_report.max(1);
        self.last_report_ms = None;
        self.decode_states.clear();
        self.initialized = true;

        info!(
            "{}: {} bus(es), decode {:?}, report every {}ms",
            self.name,
            self.buses.len(),
            self.decode_mode,
            self.report_interval_ms
        );
        Ok(())
    }

    fn tick(&mut self, now_ms: u32, sink: &mut dyn EventSink) {
        if !self.initialized {
            return;
        }
        if self.last_report_ms.is_none() {
            sink.emit(&AppEvent::Started {
                source: self.name.clone(),
                buses: self.buses.len(),
            });
        }

        for (id, report) in self.buses.service() {
            let Some(bus) = self.buses.bus_by_id(id) else {
                warn!("{}: report for unknown bus {:?}", self.name, id);
                continue;
            };
            Self::forward_presence(bus.name(), &report.presence, sink);
            if let Some(status) = report.bus_status {
                sink.emit(&AppEvent::BusStatus {
                    bus: bus.name().to_owned(),
                    status,
                });
            }
        }

        let due = self
            .last_report_ms
            .is_none_or(|last| is_timeout(now_ms, last, self.report_interval_ms));
        if !due {
            return;
        }
        self.last_report_ms = Some(now_ms);
        if self.decode_mode == DecodeMode::Local {
            self.decode_pending(sink);
        }
    }

    fn status_snapshot(&mut self) -> String {
        build_snapshot(self.buses.buses_mut())
    }

    fn data_source(&mut self) -> Option<&mut dyn DataSource> {
        Some(self)
    }
}

impl DataSource for ImuModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn snapshot(&mut self) -> Vec<u8> {
        build_snapshot(self.buses.buses_mut()).into_bytes()
    }

    fn fingerprint(&self) -> Fingerprint {
        compute_fingerprint(self.buses.buses())
    }
}
