//! I²C bus instance.
//!
//! Generic over any `embedded_hal::i2c::I2c` transport, so the same code
//! drives the ESP-IDF `I2cDriver` on target and scripted mocks on host.
//!
//! ## Service round
//!
//! Each round visits the device table in ascending address order and issues
//! one transaction per device, or two when identification succeeds and the
//! first data poll follows in the same visit:
//!
//! | Device state                   | Transaction                        |
//! |--------------------------------|------------------------------------|
//! | not online, or type unknown    | identification (every ident interval) |
//! | online with known type         | data poll (every poll interval)    |
//!
//! A round may span several `service()` calls: once the call's time budget
//! is used up the cursor is kept and the next call resumes from it.

use embedded_hal::i2c::{ErrorKind, I2c};
use log::{debug, info, warn};
use serde_json::{json, Map, Value};

use super::device::DeviceRecord;
use super::presence::{PresenceState, PresenceTracker};
use super::{Bus, BusDevices, BusId, BusOperationStatus, ServiceReport};
use crate::app::ports::Clock;
use crate::config::BusDescriptor;
use crate::decode::{DecodeState, DecodedRecord};
use crate::error::{ConfigError, TransientBusError};
use crate::sensors::{self, DeviceType};
use crate::timing::{has_elapsed, later_of};

/// Largest data poll any device type issues.
const MAX_POLL_LEN: usize = 32;

/// Highest 7-bit address.
const MAX_I2C_ADDR: u32 = 0x7F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transaction {
    Ident,
    Data(usize),
}

/// Outcome counters for the current round, used for the bus status.
#[derive(Debug, Default, Clone, Copy)]
struct RoundStats {
    attempts: u32,
    successes: u32,
    bus_faults: u32,
}

pub struct I2cBus<I, C> {
    id: BusId,
    name: String,
    type_name: String,
    i2c: I,
    clock: C,
    service_budget_ms: u32,
    ident_interval_ms: u32,
    fail_threshold: u8,
    /// Ascending by address.
    devices: Vec<DeviceRecord>,
    /// Next device to visit in the current round.
    cursor: usize,
    tracker: PresenceTracker,
    last_ident_update_ms: u32,
    last_data_update_ms: u32,
    status: BusOperationStatus,
    /// Status change not yet reported by `service()`.
    pending_status: Option<BusOperationStatus>,
    round: RoundStats,
    failing_rounds: u8,
}

impl<I: I2c, C: Clock> I2cBus<I, C> {
    /// Build the bus and its device table from a descriptor.
    pub fn new(id: BusId, desc: &BusDescriptor, i2c: I, clock: C) -> Result<Self, ConfigError> {
        let devices = build_device_table(desc)?;
        info!(
            "{}: {} bus, {} address(es) to poll, budget {}ms",
            desc.name,
            desc.bus_type,
            devices.len(),
            desc.service_budget_ms
        );

        Ok(Self {
            id,
            name: desc.name.clone(),
            type_name: desc.bus_type.clone(),
            i2c,
            clock,
            service_budget_ms: desc.service_budget_ms,
            ident_interval_ms: desc.ident_interval_ms,
            fail_threshold: desc.fail_threshold.max(1),
            devices,
            cursor: 0,
            tracker: PresenceTracker::new(id, desc.fail_threshold),
            last_ident_update_ms: 0,
            last_data_update_ms: 0,
            status: BusOperationStatus::Ok,
            pending_status: None,
            round: RoundStats::default(),
            failing_rounds: 0,
        })
    }

    pub fn id(&self) -> BusId {
        self.id
    }

    /// Device record for `address`, if it is in the table.
    pub fn device(&self, address: u32) -> Option<&DeviceRecord> {
        self.devices.iter().find(|d| d.address == address)
    }

    /// `true` while a round is partially done.
    pub fn round_in_progress(&self) -> bool {
        self.cursor != 0
    }

    fn due_transaction(&self, dev: &DeviceRecord, now: u32) -> Option<Transaction> {
        match (dev.state, dev.device_type) {
            (PresenceState::Online, Some(t)) => {
                let interval = sensors::device_type(t)?.poll.interval_ms;
                let due = dev
                    .last_poll_ms
                    .is_none_or(|last| has_elapsed(now, last, interval));
                due.then_some(Transaction::Data(t))
            }
            _ => {
                let due = dev
                    .last_ident_attempt_ms
                    .is_none_or(|last| has_elapsed(now, last, self.ident_interval_ms));
                due.then_some(Transaction::Ident)
            }
        }
    }

    fn run(&mut self, idx: usize, tx: Transaction, now: u32) {
        let addr = self.devices[idx].address as u8;
        let result = match tx {
            Transaction::Ident => {
                self.devices[idx].last_ident_attempt_ms = Some(now);
                let hint = self.devices[idx].type_hint;
                identify(&mut self.i2c, addr, hint).map(Some)
            }
            Transaction::Data(t) => {
                self.devices[idx].last_poll_ms = Some(now);
                poll(&mut self.i2c, addr, t).map(|data| {
                    self.devices[idx].push_record(now, &data);
                    self.last_data_update_ms = now;
                    None
                })
            }
        };

        self.round.attempts += 1;
        let dev = &mut self.devices[idx];
        match result {
            Ok(identified) => {
                self.round.successes += 1;
                if let Some(t) = identified {
                    if dev.device_type != Some(t) || dev.state != PresenceState::Online {
                        info!(
                            "{}: 0x{:02x} identified as {}",
                            self.name,
                            addr,
                            sensors::device_type(t).map_or("?", |d| d.name)
                        );
                    }
                }
                if self.tracker.record_success(dev, now, identified) {
                    self.last_ident_update_ms = now;
                }
                self.set_status(BusOperationStatus::Ok);
            }
            Err(TransientBusError::UnknownIdentity) => {
                // The address answered, so the device is present.
                self.round.successes += 1;
                if self.tracker.record_success(dev, now, None) {
                    self.last_ident_update_ms = now;
                }
                self.set_status(BusOperationStatus::Ok);
            }
            Err(e) => {
                if e.is_bus_fault() {
                    self.round.bus_faults += 1;
                }
                if dev.state == PresenceState::Online {
                    debug!("{}: 0x{:02x} {:?} failed: {}", self.name, addr, tx, e);
                }
                if self.tracker.record_failure(dev) {
                    self.last_ident_update_ms = now;
                }
            }
        }
    }

    fn finish_round(&mut self) {
        let r = core::mem::take(&mut self.round);
        if r.attempts > 0 && r.successes == 0 && r.bus_faults == r.attempts {
            self.failing_rounds = self.failing_rounds.saturating_add(1);
            if self.failing_rounds >= self.fail_threshold {
                self.set_status(BusOperationStatus::Failing);
            }
        } else if r.successes > 0 {
            self.failing_rounds = 0;
        }
    }

    fn set_status(&mut self, status: BusOperationStatus) {
        if status == BusOperationStatus::Ok {
            self.failing_rounds = 0;
        }
        if self.status != status {
            warn!("{}: bus operation {}", self.name, status.as_str());
            self.status = status;
            self.pending_status = Some(status);
        }
    }
}

impl<I: I2c, C: Clock> Bus for I2cBus<I, C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn service(&mut self) -> ServiceReport {
        let start = self.clock.now_ms();
        let mut transactions = 0;

        while self.cursor < self.devices.len() {
            let now = self.clock.now_ms();
            if transactions > 0 && has_elapsed(now, start, self.service_budget_ms) {
                // Out of budget: resume from the cursor next call.
                break;
            }
            let idx = self.cursor;
            self.cursor += 1;
            let Some(tx) = self.due_transaction(&self.devices[idx], now) else {
                continue;
            };
            self.run(idx, tx, now);
            transactions += 1;

            // A device identified on this visit gets its first data poll
            // straight away, budget permitting.
            if tx == Transaction::Ident {
                let now = self.clock.now_ms();
                if has_elapsed(now, start, self.service_budget_ms) {
                    continue;
                }
                if let Some(data @ Transaction::Data(_)) =
                    self.due_transaction(&self.devices[idx], now)
                {
                    self.run(idx, data, now);
                    transactions += 1;
                }
            }
        }

        if self.cursor >= self.devices.len() {
            self.cursor = 0;
            self.finish_round();
        }

        ServiceReport {
            presence: self.tracker.take_events(),
            bus_status: self.pending_status.take(),
            transactions,
        }
    }

    fn get_last_status_update_ms(&self, include_ident: bool, include_data: bool) -> u32 {
        match (include_ident, include_data) {
            (true, true) => later_of(self.last_ident_update_ms, self.last_data_update_ms),
            (true, false) => self.last_ident_update_ms,
            (false, true) => self.last_data_update_ms,
            (false, false) => 0,
        }
    }

    fn operation_status(&self) -> BusOperationStatus {
        self.status
    }
}

impl<I: I2c, C: Clock> BusDevices for I2cBus<I, C> {
    fn get_device_addresses(&self, only_with_pending_data: bool) -> Vec<u32> {
        self.devices
            .iter()
            .filter(|d| d.is_known() && (!only_with_pending_data || d.has_pending()))
            .map(DeviceRecord::address)
            .collect()
    }

    fn get_decoded_poll_responses(
        &mut self,
        address: u32,
        out: &mut Vec<DecodedRecord>,
        max_records: usize,
        state: &mut DecodeState,
    ) -> usize {
        let Some(dev) = self.devices.iter_mut().find(|d| d.address == address) else {
            return 0;
        };
        let Some(decoder) = dev
            .device_type
            .and_then(sensors::device_type)
            .map(|t| t.decoder)
        else {
            return 0;
        };

        // Only take what completes at most `max_records`; the rest stays
        // buffered on the device.
        let budget = max_records
            .saturating_mul(decoder.record_size())
            .saturating_sub(state.carry_len());
        let raw = dev.drain_pending(budget);
        decoder.decode(&raw, state, out)
    }

    fn get_poll_responses_json(&mut self) -> String {
        let mut doc = Map::new();
        for dev in self.devices.iter_mut().filter(|d| d.has_pending()) {
            let raw = dev.drain_pending(usize::MAX);
            let type_name = dev
                .device_type
                .and_then(sensors::device_type)
                .map_or("", |t| t.name);
            doc.insert(
                format!("0x{:02x}", dev.address),
                json!({ "_t": type_name, "x": to_hex(&raw) }),
            );
        }
        Value::Object(doc).to_string()
    }
}

// ───────────────────────────────────────────────────────────────
// Transactions
// ───────────────────────────────────────────────────────────────

fn classify<E: embedded_hal::i2c::Error>(e: &E) -> TransientBusError {
    match e.kind() {
        ErrorKind::NoAcknowledge(_) => TransientBusError::NoAcknowledge,
        _ => TransientBusError::BusFault,
    }
}

/// Probe `addr` against its candidate types and configure the first match.
fn identify<I: I2c>(
    i2c: &mut I,
    addr: u8,
    hint: Option<usize>,
) -> Result<usize, TransientBusError> {
    let candidates: Vec<usize> = match hint {
        Some(t) => vec![t],
        None => sensors::candidates_for(addr as u32).collect(),
    };

    let mut result = Err(TransientBusError::NoAcknowledge);
    for t in candidates {
        let Some(dt) = sensors::device_type(t) else {
            continue;
        };
        let mut id = [0u8; 1];
        i2c.write_read(addr, &[dt.detect.register], &mut id)
            .map_err(|e| classify(&e))?;
        if dt.detect.expected.contains(&id[0]) {
            init_device(i2c, addr, dt)?;
            return Ok(t);
        }
        result = Err(TransientBusError::UnknownIdentity);
    }
    result
}

fn init_device<I: I2c>(i2c: &mut I, addr: u8, dt: &DeviceType) -> Result<(), TransientBusError> {
    for &(reg, value) in dt.init {
        i2c.write(addr, &[reg, value]).map_err(|e| classify(&e))?;
    }
    Ok(())
}

fn poll<I: I2c>(
    i2c: &mut I,
    addr: u8,
    t: usize,
) -> Result<heapless::Vec<u8, MAX_POLL_LEN>, TransientBusError> {
    let dt = sensors::device_type(t).ok_or(TransientBusError::UnknownIdentity)?;
    let mut buf = [0u8; MAX_POLL_LEN];
    let len = dt.poll.len.min(MAX_POLL_LEN);
    i2c.write_read(addr, &[dt.poll.register], &mut buf[..len])
        .map_err(|e| classify(&e))?;
    heapless::Vec::from_slice(&buf[..len]).map_err(|_| TransientBusError::BusFault)
}

fn to_hex(bytes: &[u8]) -> String {
    use core::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

// ───────────────────────────────────────────────────────────────
// Device table
// ───────────────────────────────────────────────────────────────

fn build_device_table(desc: &BusDescriptor) -> Result<Vec<DeviceRecord>, ConfigError> {
    let mut devices = Vec::new();

    if desc.devices.is_empty() {
        for addr in sensors::default_scan_addresses() {
            devices.push(DeviceRecord::new(addr, None));
        }
        return Ok(devices);
    }

    for d in &desc.devices {
        if d.address > MAX_I2C_ADDR {
            return Err(ConfigError::InvalidAddress {
                bus: desc.name.clone(),
                address: d.address,
            });
        }
        let hint = match &d.device_type {
            Some(name) => Some(sensors::find_device_type(name).ok_or_else(|| {
                ConfigError::UnknownDeviceType {
                    bus: desc.name.clone(),
                    device_type: name.clone(),
                }
            })?),
            None => {
                if sensors::candidates_for(d.address).next().is_none() {
                    return Err(ConfigError::UnknownDeviceType {
                        bus: desc.name.clone(),
                        device_type: format!("(none at 0x{:02x})", d.address),
                    });
                }
                None
            }
        };
        if devices.iter().any(|r: &DeviceRecord| r.address == d.address) {
            return Err(ConfigError::AddressConflict {
                address: d.address,
                bus: desc.name.clone(),
                other: desc.name.clone(),
            });
        }
        devices.push(DeviceRecord::new(d.address, hint));
    }

    devices.sort_by_key(|r| r.address);
    Ok(devices)
}
