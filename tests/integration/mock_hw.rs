//! Mock hardware for integration tests.
//!
//! `MockI2c` is a register-file simulation of an I²C bus: each attached
//! device is 256 bytes of registers behind an auto-incrementing pointer.
//! Handles are cheap clones sharing one bus, so a test keeps a handle
//! after moving another into an `I2cBus` and can pull devices off the bus
//! or inject bus faults mid-run.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use imubus::app::events::AppEvent;
use imubus::app::ports::{BusObserver, Clock, EventSink, PublishPort};
use imubus::bus::i2c::I2cBus;
use imubus::bus::{Bus, BusId, BusOperationStatus, BusRegistry, PresenceEvent};
use imubus::config::BusDescriptor;
use imubus::error::ConfigError;

pub const LSM6DS3_WHO_AM_I: u8 = 0x69;
pub const REG_WHO_AM_I: u8 = 0x0F;
pub const REG_OUTX_L_G: u8 = 0x22;

// ── Mock clock ────────────────────────────────────────────────

/// Shared millisecond clock.  `step` is added after every read, which lets
/// tests make time pass inside a single `service()` call.
#[derive(Clone, Default)]
pub struct MockClock {
    now: Rc<Cell<u32>>,
    step: Rc<Cell<u32>>,
}

#[allow(dead_code)]
impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ms: u32) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    pub fn set_step(&self, ms: u32) {
        self.step.set(ms);
    }

    pub fn get(&self) -> u32 {
        self.now.get()
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u32 {
        let now = self.now.get();
        self.now.set(now.wrapping_add(self.step.get()));
        now
    }
}

// ── Mock I²C bus ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockI2cError(pub ErrorKind);

impl embedded_hal::i2c::Error for MockI2cError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

struct MockDevice {
    regs: [u8; 256],
    present: bool,
}

#[derive(Default)]
struct MockBusState {
    devices: BTreeMap<u8, MockDevice>,
    /// Every transaction fails with a bus-level error.
    fault: bool,
    /// Address of every transaction attempted, in order.
    log: Vec<u8>,
    /// `(address, register, value)` of every register write.
    writes: Vec<(u8, u8, u8)>,
}

#[derive(Clone, Default)]
pub struct MockI2c {
    state: Rc<RefCell<MockBusState>>,
}

#[allow(dead_code)]
impl MockI2c {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a device whose register `reg` reads `value`.
    pub fn attach(&self, address: u8, reg: u8, value: u8) {
        let mut regs = [0u8; 256];
        regs[reg as usize] = value;
        self.state
            .borrow_mut()
            .devices
            .insert(address, MockDevice { regs, present: true });
    }

    /// Attach an LSM6DS3 with its identity register set.
    pub fn attach_lsm6ds3(&self, address: u8) {
        self.attach(address, REG_WHO_AM_I, LSM6DS3_WHO_AM_I);
    }

    pub fn set_present(&self, address: u8, present: bool) {
        if let Some(dev) = self.state.borrow_mut().devices.get_mut(&address) {
            dev.present = present;
        }
    }

    pub fn set_regs(&self, address: u8, start: u8, bytes: &[u8]) {
        if let Some(dev) = self.state.borrow_mut().devices.get_mut(&address) {
            for (i, b) in bytes.iter().enumerate() {
                dev.regs[(start as usize + i) % 256] = *b;
            }
        }
    }

    pub fn set_fault(&self, fault: bool) {
        self.state.borrow_mut().fault = fault;
    }

    pub fn take_log(&self) -> Vec<u8> {
        core::mem::take(&mut self.state.borrow_mut().log)
    }

    pub fn writes(&self) -> Vec<(u8, u8, u8)> {
        self.state.borrow().writes.clone()
    }
}

impl ErrorType for MockI2c {
    type Error = MockI2cError;
}

impl I2c for MockI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut st = self.state.borrow_mut();
        st.log.push(address);
        if st.fault {
            return Err(MockI2cError(ErrorKind::ArbitrationLoss));
        }

        let mut writes = Vec::new();
        {
            let Some(dev) = st.devices.get_mut(&address).filter(|d| d.present) else {
                return Err(MockI2cError(ErrorKind::NoAcknowledge(
                    NoAcknowledgeSource::Address,
                )));
            };

            let mut ptr = 0usize;
            for op in operations.iter_mut() {
                match op {
                    Operation::Write(bytes) => {
                        if let Some((&reg, values)) = bytes.split_first() {
                            ptr = reg as usize;
                            for v in values {
                                dev.regs[ptr % 256] = *v;
                                writes.push((address, (ptr % 256) as u8, *v));
                                ptr += 1;
                            }
                        }
                    }
                    Operation::Read(buf) => {
                        for b in buf.iter_mut() {
                            *b = dev.regs[ptr % 256];
                            ptr += 1;
                        }
                    }
                }
            }
        }
        st.writes.extend(writes);
        Ok(())
    }
}

// ── Bus construction helpers ──────────────────────────────────

pub type MockBus = I2cBus<MockI2c, MockClock>;

pub fn new_bus(desc: &BusDescriptor, i2c: &MockI2c, clock: &MockClock) -> MockBus {
    I2cBus::new(BusId(0), desc, i2c.clone(), clock.clone()).expect("valid descriptor")
}

/// Registry whose `"I2C"` driver opens the mock bus named like the
/// descriptor.  Unknown names fail like a controller that will not open.
pub fn mock_registry(board: &[(&str, MockI2c)], clock: &MockClock) -> BusRegistry {
    let board: Vec<(String, MockI2c)> = board
        .iter()
        .map(|(name, i2c)| ((*name).to_owned(), i2c.clone()))
        .collect();
    let clock = clock.clone();

    let mut registry = BusRegistry::new();
    registry.register("I2C", move |id: BusId, desc: &BusDescriptor| {
        let i2c = board
            .iter()
            .find(|(name, _)| *name == desc.name)
            .map(|(_, i2c)| i2c.clone())
            .ok_or_else(|| ConfigError::Driver {
                bus: desc.name.clone(),
                reason: "no such mock bus".into(),
            })?;
        let bus = I2cBus::new(id, desc, i2c, clock.clone())?;
        Ok(Box::new(bus) as Box<dyn Bus>)
    });
    registry
}

/// An LSM6DS3 data block: six raw little-endian `i16` values.
pub fn lsm6ds3_block(values: [i16; 6]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

// ── Recording ports ───────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

/// Observer whose log outlives the `Box` handed to the bus system.
#[derive(Clone, Default)]
pub struct RecordingObserver {
    pub presence: Rc<RefCell<Vec<(String, PresenceEvent)>>>,
    pub status: Rc<RefCell<Vec<(String, BusOperationStatus)>>>,
}

impl BusObserver for RecordingObserver {
    fn on_presence_changes(&mut self, bus_name: &str, events: &[PresenceEvent]) {
        self.presence
            .borrow_mut()
            .extend(events.iter().map(|e| (bus_name.to_owned(), *e)));
    }

    fn on_bus_status(&mut self, bus_name: &str, status: BusOperationStatus) {
        self.status.borrow_mut().push((bus_name.to_owned(), status));
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    pub sent: Vec<(String, String)>,
}

impl PublishPort for RecordingPublisher {
    fn publish(&mut self, source: &str, payload: &[u8]) {
        self.sent
            .push((source.to_owned(), String::from_utf8_lossy(payload).into_owned()));
    }
}
