//! Bus driver registry.
//!
//! Maps a bus type name to the factory that builds it.  Constructed once at
//! start-up and passed by reference to whatever creates buses; there is no
//! global instance.

use log::info;

use super::{Bus, BusId};
use crate::config::BusDescriptor;
use crate::error::ConfigError;
use crate::fingerprint::MAX_BUSES;
use crate::sensors;

/// Builds one bus from its descriptor.
pub type BusFactory = Box<dyn Fn(BusId, &BusDescriptor) -> Result<Box<dyn Bus>, ConfigError>>;

#[derive(Default)]
pub struct BusRegistry {
    factories: Vec<(String, BusFactory)>,
}

impl BusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` for `type_name`, replacing any previous one.
    pub fn register<F>(&mut self, type_name: &str, factory: F)
    where
        F: Fn(BusId, &BusDescriptor) -> Result<Box<dyn Bus>, ConfigError> + 'static,
    {
        self.factories
            .retain(|(name, _)| !name.eq_ignore_ascii_case(type_name));
        self.factories.push((type_name.to_owned(), Box::new(factory)));
        info!("BusRegistry: registered '{}'", type_name);
    }

    pub fn is_registered(&self, type_name: &str) -> bool {
        self.factory(type_name).is_some()
    }

    fn factory(&self, type_name: &str) -> Option<&BusFactory> {
        self.factories
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(type_name))
            .map(|(_, f)| f)
    }

    /// Create one bus per descriptor, in order.
    ///
    /// The whole configuration is validated before any factory runs, so a
    /// bad entry never leaves half-built buses behind.
    pub fn create_from_config(
        &self,
        descriptors: &[BusDescriptor],
    ) -> Result<Vec<Box<dyn Bus>>, ConfigError> {
        validate(self, descriptors)?;

        descriptors
            .iter()
            .enumerate()
            .map(|(i, desc)| {
                let factory = self
                    .factory(&desc.bus_type)
                    .ok_or_else(|| ConfigError::UnknownBusType(desc.bus_type.clone()))?;
                factory(BusId(i), desc)
            })
            .collect()
    }
}

fn validate(registry: &BusRegistry, descriptors: &[BusDescriptor]) -> Result<(), ConfigError> {
    if descriptors.len() > MAX_BUSES {
        return Err(ConfigError::TooManyBuses {
            count: descriptors.len(),
            max: MAX_BUSES,
        });
    }

    for (i, desc) in descriptors.iter().enumerate() {
        if !registry.is_registered(&desc.bus_type) {
            return Err(ConfigError::UnknownBusType(desc.bus_type.clone()));
        }

        for other in &descriptors[..i] {
            if other.name == desc.name {
                return Err(ConfigError::DuplicateBusName(desc.name.clone()));
            }
            if let Some(resource) = shared_resource(desc, other) {
                return Err(ConfigError::ResourceConflict {
                    bus: desc.name.clone(),
                    other: other.name.clone(),
                    resource,
                });
            }
            let theirs = effective_addresses(other);
            if let Some(&address) = effective_addresses(desc).iter().find(|a| theirs.contains(a)) {
                return Err(ConfigError::AddressConflict {
                    address,
                    bus: desc.name.clone(),
                    other: other.name.clone(),
                });
            }
        }
    }
    Ok(())
}

/// The physical resource two buses would both drive, if any.
fn shared_resource(a: &BusDescriptor, b: &BusDescriptor) -> Option<&'static str> {
    if a.bus_type.eq_ignore_ascii_case(&b.bus_type) && a.port == b.port {
        return Some("controller");
    }
    let a_pins = [a.sda_pin, a.scl_pin];
    let b_pins = [b.sda_pin, b.scl_pin];
    a_pins
        .iter()
        .any(|p| *p >= 0 && b_pins.contains(p))
        .then_some("pin")
}

/// Addresses a bus will hold in its device table.
fn effective_addresses(desc: &BusDescriptor) -> Vec<u32> {
    if desc.devices.is_empty() {
        sensors::default_scan_addresses()
    } else {
        desc.devices.iter().map(|d| d.address).collect()
    }
}
