//! Bus registry validation and bus system routing.

use imubus::bus::{Bus, BusId, BusOperationStatus, BusSystem, PresenceState};
use imubus::config::{BusDescriptor, DeviceDescriptor, SystemConfig};
use imubus::error::ConfigError;

use crate::mock_hw::{mock_registry, MockClock, MockI2c, RecordingObserver};

fn bus(name: &str, port: u8, sda: i32, scl: i32) -> BusDescriptor {
    BusDescriptor {
        port,
        sda_pin: sda,
        scl_pin: scl,
        ..BusDescriptor::new(name, "I2C")
    }
}

fn with_devices(mut desc: BusDescriptor, addresses: &[u32]) -> BusDescriptor {
    desc.devices = addresses
        .iter()
        .map(|&address| DeviceDescriptor {
            address,
            device_type: Some("LSM6DS3".into()),
        })
        .collect();
    desc
}

fn board() -> (Vec<(&'static str, MockI2c)>, MockClock) {
    (
        vec![("A", MockI2c::new()), ("B", MockI2c::new())],
        MockClock::new(),
    )
}

#[test]
fn creates_one_bus_per_entry_in_order() {
    let (board, clock) = board();
    let registry = mock_registry(&board, &clock);
    let buses = registry
        .create_from_config(&[
            with_devices(bus("B", 0, 1, 2), &[0x10]),
            bus("A", 1, 3, 4),
        ])
        .unwrap();
    let names: Vec<&str> = buses.iter().map(|b| b.name()).collect();
    assert_eq!(names, vec!["B", "A"]);
}

#[test]
fn type_lookup_ignores_case() {
    let (board, clock) = board();
    let registry = mock_registry(&board, &clock);
    assert!(registry.is_registered("i2c"));
    let desc = BusDescriptor {
        bus_type: "i2c".into(),
        ..bus("A", 0, 1, 2)
    };
    assert!(registry.create_from_config(&[desc]).is_ok());
}

#[test]
fn unknown_type_is_rejected() {
    let (board, clock) = board();
    let registry = mock_registry(&board, &clock);
    let desc = BusDescriptor {
        bus_type: "SPI".into(),
        ..bus("A", 0, 1, 2)
    };
    assert_eq!(
        registry.create_from_config(&[desc]).err(),
        Some(ConfigError::UnknownBusType("SPI".into()))
    );
}

#[test]
fn duplicate_names_are_rejected() {
    let (board, clock) = board();
    let registry = mock_registry(&board, &clock);
    let result = registry.create_from_config(&[
        with_devices(bus("A", 0, 1, 2), &[0x10]),
        with_devices(bus("A", 1, 3, 4), &[0x11]),
    ]);
    assert_eq!(result.err(), Some(ConfigError::DuplicateBusName("A".into())));
}

#[test]
fn shared_controller_or_pin_is_rejected() {
    let (board, clock) = board();
    let registry = mock_registry(&board, &clock);

    let same_port = registry.create_from_config(&[
        with_devices(bus("A", 0, 1, 2), &[0x10]),
        with_devices(bus("B", 0, 3, 4), &[0x11]),
    ]);
    assert!(matches!(
        same_port,
        Err(ConfigError::ResourceConflict { resource: "controller", .. })
    ));

    let same_pin = registry.create_from_config(&[
        with_devices(bus("A", 0, 1, 2), &[0x10]),
        with_devices(bus("B", 1, 3, 1), &[0x11]),
    ]);
    assert!(matches!(
        same_pin,
        Err(ConfigError::ResourceConflict { resource: "pin", .. })
    ));
}

#[test]
fn address_on_two_buses_is_rejected() {
    let (board, clock) = board();
    let registry = mock_registry(&board, &clock);
    let result = registry.create_from_config(&[
        with_devices(bus("A", 0, 1, 2), &[0x10, 0x6a]),
        with_devices(bus("B", 1, 3, 4), &[0x6a]),
    ]);
    assert_eq!(
        result.err(),
        Some(ConfigError::AddressConflict {
            address: 0x6a,
            bus: "B".into(),
            other: "A".into(),
        })
    );
}

#[test]
fn invalid_device_configuration_is_surfaced() {
    let (board, clock) = board();
    let registry = mock_registry(&board, &clock);
    let result = registry.create_from_config(&[with_devices(bus("A", 0, 1, 2), &[0x80])]);
    assert!(matches!(result, Err(ConfigError::InvalidAddress { address: 0x80, .. })));
}

#[test]
fn failed_setup_keeps_previous_buses() {
    let (board, clock) = board();
    let registry = mock_registry(&board, &clock);
    let mut system = BusSystem::new();
    system.setup(&registry, &[bus("A", 0, 1, 2)]).unwrap();

    let bad = [bus("A", 0, 1, 2), bus("A", 1, 3, 4)];
    assert!(system.setup(&registry, &bad).is_err());
    assert_eq!(system.len(), 1);
    assert!(system.bus("A").is_some());
}

#[test]
fn too_many_buses_are_rejected() {
    let clock = MockClock::new();
    let registry = mock_registry(&[], &clock);
    let descs: Vec<BusDescriptor> = (0..9)
        .map(|i| with_devices(bus(&format!("B{i}"), i, -1, -1), &[0x10 + u32::from(i)]))
        .collect();
    assert!(matches!(
        registry.create_from_config(&descs),
        Err(ConfigError::TooManyBuses { count: 9, .. })
    ));
}

#[test]
fn observer_receives_presence_and_can_be_replaced() {
    let (board, clock) = board();
    board[0].1.attach_lsm6ds3(0x10);
    let registry = mock_registry(&board, &clock);

    let mut system = BusSystem::new();
    system
        .setup(
            &registry,
            &[with_devices(bus("A", 0, 1, 2), &[0x10]), bus("B", 1, 3, 4)],
        )
        .unwrap();

    let first = RecordingObserver::default();
    let second = RecordingObserver::default();
    assert!(system.set_observer("A", Box::new(first.clone())));
    assert!(system.set_observer("A", Box::new(second.clone())));
    assert!(!system.set_observer("C", Box::new(RecordingObserver::default())));

    let reports = system.service();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].0, BusId(0));
    assert_eq!(reports[0].1.presence.len(), 1);
    assert!(reports[1].1.presence.is_empty());

    assert!(first.presence.borrow().is_empty());
    let seen = second.presence.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "A");
    assert_eq!(seen[0].1.address, 0x10);
    assert_eq!(seen[0].1.state, PresenceState::Online);
}

#[test]
fn observer_receives_bus_status() {
    let (board, clock) = board();
    let a = board[0].1.clone();
    a.attach_lsm6ds3(0x10);
    let registry = mock_registry(&board, &clock);

    let mut system = BusSystem::new();
    system
        .setup(&registry, &[with_devices(bus("A", 0, 1, 2), &[0x10])])
        .unwrap();
    let observer = RecordingObserver::default();
    system.set_observer("A", Box::new(observer.clone()));

    system.service();
    a.set_fault(true);
    for t in [10, 20, 30] {
        clock.set(t);
        system.service();
    }
    assert_eq!(
        *observer.status.borrow(),
        vec![("A".to_owned(), BusOperationStatus::Failing)]
    );

    system.clear_observer("A");
    a.set_fault(false);
    clock.set(40);
    system.service();
    assert_eq!(observer.status.borrow().len(), 1);
}

#[test]
fn default_systype_sets_up() {
    let clock = MockClock::new();
    let registry = mock_registry(&[("I2CA", MockI2c::new())], &clock);
    let config = SystemConfig::from_json(include_str!("../../systypes/imu.json")).unwrap();
    let mut system = BusSystem::new();
    system.setup(&registry, &config.buses).unwrap();
    assert_eq!(system.len(), 1);
    assert_eq!(system.bus("I2CA").map(|b| b.type_name()), Some("I2C"));
}
