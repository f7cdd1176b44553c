//! The set of configured buses and their observers.
//!
//! `BusSystem` owns every bus for its lifetime.  [`BusSystem::service`]
//! services each bus in configuration order, hands each bus's events to the
//! observer registered for it, and returns the same events to the caller
//! so it can route them too.

use log::{info, warn};

use super::{Bus, BusId, BusRegistry, ServiceReport};
use crate::app::ports::BusObserver;
use crate::config::BusDescriptor;
use crate::error::ConfigError;

#[derive(Default)]
pub struct BusSystem {
    buses: Vec<Box<dyn Bus>>,
    observers: Vec<Option<Box<dyn BusObserver>>>,
}

impl BusSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the buses named in `descriptors`, replacing any existing set.
    /// On error the previous buses are kept.
    pub fn setup(
        &mut self,
        registry: &BusRegistry,
        descriptors: &[BusDescriptor],
    ) -> Result<(), ConfigError> {
        let buses = registry.create_from_config(descriptors).inspect_err(|e| {
            warn!("BusSystem: setup failed: {}", e);
        })?;
        info!("BusSystem: {} bus(es) configured", buses.len());
        self.observers = buses.iter().map(|_| None).collect();
        self.buses = buses;
        Ok(())
    }

    /// Register the observer for `bus_name`, replacing any previous one.
    /// Returns `false` if there is no such bus.
    pub fn set_observer(&mut self, bus_name: &str, observer: Box<dyn BusObserver>) -> bool {
        match self.index_of(bus_name) {
            Some(i) => {
                self.observers[i] = Some(observer);
                true
            }
            None => false,
        }
    }

    pub fn clear_observer(&mut self, bus_name: &str) {
        if let Some(i) = self.index_of(bus_name) {
            self.observers[i] = None;
        }
    }

    /// Service every bus once.  Observers are called before this returns.
    pub fn service(&mut self) -> Vec<(BusId, ServiceReport)> {
        let mut reports = Vec::with_capacity(self.buses.len());
        for (i, (bus, observer)) in self.buses.iter_mut().zip(&mut self.observers).enumerate() {
            let report = bus.service();
            if let Some(obs) = observer.as_deref_mut() {
                if !report.presence.is_empty() {
                    obs.on_presence_changes(bus.name(), &report.presence);
                }
                if let Some(status) = report.bus_status {
                    obs.on_bus_status(bus.name(), status);
                }
            }
            reports.push((BusId(i), report));
        }
        reports
    }

    pub fn buses(&self) -> &[Box<dyn Bus>] {
        &self.buses
    }

    pub fn buses_mut(&mut self) -> &mut [Box<dyn Bus>] {
        &mut self.buses
    }

    pub fn bus(&self, name: &str) -> Option<&dyn Bus> {
        self.index_of(name).map(|i| self.buses[i].as_ref())
    }

    pub fn bus_mut(&mut self, name: &str) -> Option<&mut (dyn Bus + 'static)> {
        let i = self.index_of(name)?;
        Some(self.buses[i].as_mut())
    }

    pub fn bus_by_id(&self, id: BusId) -> Option<&dyn Bus> {
        self.buses.get(id.0).map(AsRef::as_ref)
    }

    pub fn len(&self) -> usize {
        self.buses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.buses.iter().position(|b| b.name() == name)
    }
}
