//! IMU module end to end: setup, service, decode, snapshot, publish.

use imubus::app::events::AppEvent;
use imubus::app::host::{ModuleHost, SysModule};
use imubus::app::module::ImuModule;
use imubus::app::ports::DataSource;
use imubus::bus::{BusDevices, BusOperationStatus, PresenceState};
use imubus::config::{BusDescriptor, DecodeMode, DeviceDescriptor, SystemConfig};
use imubus::decode::DecodedRecord;
use imubus::error::{ConfigError, Error};
use imubus::fingerprint::compute_fingerprint;
use imubus::publish::ChangePublisher;
use imubus::snapshot::build_snapshot;

use crate::mock_hw::{
    lsm6ds3_block, mock_registry, MockClock, MockI2c, RecordingPublisher, RecordingSink,
    REG_OUTX_L_G,
};

/// Bus "A" with an LSM6DS3 configured at 0x10, bus "B" with nothing.
fn two_bus_config(mode: DecodeMode) -> SystemConfig {
    let mut a = BusDescriptor::new("A", "I2C");
    a.devices = vec![DeviceDescriptor {
        address: 0x10,
        device_type: Some("lsm6ds3".into()),
    }];
    let b = BusDescriptor {
        port: 1,
        sda_pin: 8,
        scl_pin: 9,
        ..BusDescriptor::new("B", "I2C")
    };
    SystemConfig {
        decode_mode: mode,
        buses: vec![a, b],
        ..SystemConfig::default()
    }
}

struct Rig {
    module: ImuModule,
    a: MockI2c,
    clock: MockClock,
    sink: RecordingSink,
}

impl Rig {
    fn new(mode: DecodeMode) -> Self {
        let a = MockI2c::new();
        let b = MockI2c::new();
        a.attach_lsm6ds3(0x10);
        a.set_regs(0x10, REG_OUTX_L_G, &lsm6ds3_block([0, 0, 0, 0, 0, 8192]));
        let clock = MockClock::new();
        let registry = mock_registry(&[("A", a.clone()), ("B", b)], &clock);

        let mut module = ImuModule::new(registry);
        module.initialize(&two_bus_config(mode)).unwrap();
        Self {
            module,
            a,
            clock,
            sink: RecordingSink::default(),
        }
    }

    fn tick(&mut self, now: u32) {
        self.clock.set(now);
        self.module.tick(now, &mut self.sink);
    }

    fn pending(&self, bus: &str) -> Vec<u32> {
        self.module
            .bus_system()
            .bus(bus)
            .map(|b| b.get_device_addresses(true))
            .unwrap_or_default()
    }
}

#[test]
fn one_cycle_leaves_data_only_on_bus_a() {
    let mut rig = Rig::new(DecodeMode::Remote);
    rig.tick(0);

    assert_eq!(rig.pending("A"), vec![0x10]);
    assert!(rig.pending("B").is_empty());

    let snapshot = build_snapshot(rig.module.bus_system_mut().buses_mut());
    let doc: serde_json::Value = serde_json::from_str(&snapshot).unwrap();
    let sections = doc.as_object().unwrap();
    assert_eq!(sections.len(), 1);
    assert_eq!(sections["A"]["0x10"]["_t"], "LSM6DS3");
    let hex = sections["A"]["0x10"]["x"].as_str().unwrap();
    // 2-byte timestamp (0 ms) + 12 data bytes.
    assert_eq!(hex.len(), 28);
    assert!(hex.starts_with("0000"));

    assert!(rig.pending("A").is_empty());
    assert_eq!(build_snapshot(rig.module.bus_system_mut().buses_mut()), "{}");
}

#[test]
fn presence_and_start_are_forwarded() {
    let mut rig = Rig::new(DecodeMode::Remote);
    rig.tick(0);

    assert_eq!(
        rig.sink.events[0],
        AppEvent::Started {
            source: "IMU".into(),
            buses: 2
        }
    );
    assert_eq!(
        rig.sink.events[1],
        AppEvent::Presence {
            bus: "A".into(),
            address: 0x10,
            state: PresenceState::Online,
            newly_identified: true,
            device_type: Some("LSM6DS3"),
        }
    );
    assert_eq!(rig.sink.events.len(), 2);
}

#[test]
fn bus_failure_is_forwarded() {
    let mut rig = Rig::new(DecodeMode::Remote);
    rig.tick(0);
    rig.a.set_fault(true);
    for t in [10, 20, 30] {
        rig.tick(t);
    }
    assert!(rig.sink.events.contains(&AppEvent::BusStatus {
        bus: "A".into(),
        status: BusOperationStatus::Failing,
    }));
}

/// `(bus, address, record times)` of every `Samples` event so far.
fn sample_times(sink: &RecordingSink) -> Vec<(String, u32, Vec<u64>)> {
    sink.events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Samples {
                bus,
                address,
                records,
            } => Some((
                bus.clone(),
                *address,
                records.iter().map(|r| r.time_ms).collect(),
            )),
            _ => None,
        })
        .collect()
}

#[test]
fn local_mode_decodes_every_report_interval() {
    let mut rig = Rig::new(DecodeMode::Local);
    rig.tick(0);
    // The first report runs at once and sees the poll that followed
    // identification.
    assert_eq!(sample_times(&rig.sink), vec![("A".into(), 0x10, vec![0])]);

    // The next report is due after strictly more than 100 ms.
    for t in (10..=100).step_by(10) {
        rig.tick(t);
    }
    assert_eq!(sample_times(&rig.sink).len(), 1);

    rig.tick(101);
    let samples = sample_times(&rig.sink);
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[1], ("A".into(), 0x10, vec![10, 20]));

    // The rest stays buffered for the next report.
    assert_eq!(rig.pending("A"), vec![0x10]);
}

#[test]
fn every_decoded_record_reaches_the_sink() {
    let mut rig = Rig::new(DecodeMode::Local);
    rig.tick(0);
    for t in (10..=100).step_by(10) {
        rig.tick(t);
    }
    rig.tick(101);

    let records: Vec<DecodedRecord> = rig
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Samples { records, .. } => Some(records.clone()),
            _ => None,
        })
        .flatten()
        .collect();
    let times: Vec<u64> = records.iter().map(|r| r.time_ms).collect();
    assert_eq!(times, vec![0, 10, 20]);
    assert!(records.iter().all(|r| r.fields()[5] == 1.0));
}

#[test]
fn remote_mode_never_decodes() {
    let mut rig = Rig::new(DecodeMode::Remote);
    for t in (0..=300).step_by(10) {
        rig.tick(t);
    }
    assert!(!rig.sink.events.iter().any(|e| matches!(e, AppEvent::Samples { .. })));
    assert_eq!(rig.pending("A"), vec![0x10]);
}

#[test]
fn fingerprint_follows_bus_activity() {
    let mut rig = Rig::new(DecodeMode::Remote);
    rig.tick(0);
    let before = rig.module.fingerprint();
    assert_eq!(before.len(), 4);
    assert_eq!(before, compute_fingerprint(rig.module.bus_system().buses()));

    rig.tick(10);
    let after = rig.module.fingerprint();
    assert_ne!(before, after);
    assert_eq!(&after[..2], &[10, 0]);
}

#[test]
fn publisher_sends_only_on_change() {
    let mut rig = Rig::new(DecodeMode::Remote);
    let mut publisher = ChangePublisher::new(10, 1000);
    let mut port = RecordingPublisher::default();

    rig.tick(0);
    assert!(publisher.poll(0, &mut rig.module, &mut port));
    assert_eq!(port.sent[0].0, "IMU");

    // Data arrives at t=10 and changes the fingerprint.
    rig.tick(10);
    assert!(publisher.poll(10, &mut rig.module, &mut port));
    assert!(port.sent[1].1.contains("\"A\""));

    // Device removed: nothing changes after the failures settle.
    rig.a.set_present(0x10, false);
    for t in [20, 30, 40] {
        rig.tick(t);
    }
    publisher.poll(40, &mut rig.module, &mut port);
    let sent = port.sent.len();
    rig.tick(50);
    assert!(!publisher.poll(50, &mut rig.module, &mut port));
    assert_eq!(port.sent.len(), sent);
}

#[test]
fn host_drives_modules_uniformly() {
    let a = MockI2c::new();
    a.attach_lsm6ds3(0x10);
    let clock = MockClock::new();
    let registry = mock_registry(&[("A", a), ("B", MockI2c::new())], &clock);

    let mut host = ModuleHost::new();
    host.add(Box::new(ImuModule::new(registry)));
    host.initialize_all(&two_bus_config(DecodeMode::Remote)).unwrap();

    let mut sink = RecordingSink::default();
    host.tick_all(0, &mut sink);
    clock.set(10);
    host.tick_all(10, &mut sink);

    assert!(host.module_mut("IMU").is_some());
    let source = host.data_source("IMU").expect("IMU publishes");
    let doc = String::from_utf8(source.snapshot()).unwrap();
    assert!(doc.starts_with("{\"A\":{\"0x10\":"));
    assert!(host.data_source("other").is_none());
}

#[test]
fn bad_configuration_fails_initialization() {
    let clock = MockClock::new();
    let registry = mock_registry(&[("A", MockI2c::new())], &clock);
    let mut host = ModuleHost::new();
    host.add(Box::new(ImuModule::new(registry)));

    let mut config = two_bus_config(DecodeMode::Local);
    config.buses[1].bus_type = "CAN".into();
    assert_eq!(
        host.initialize_all(&config),
        Err(Error::Config(ConfigError::UnknownBusType("CAN".into())))
    );
}
