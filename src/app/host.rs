//! System modules and the host that drives them.
//!
//! ```text
//!  main loop ──tick(now)──▶ ModuleHost ──▶ Box<dyn SysModule> × n
//! ```
//!
//! The host is deliberately thin: it owns the modules, initializes them in
//! insertion order, and forwards ticks.  Scheduling policy stays in the
//! caller's loop.

use log::{info, warn};

use super::ports::{DataSource, EventSink};
use crate::config::SystemConfig;
use crate::error::Result;

/// A unit of firmware functionality with a uniform lifecycle.
pub trait SysModule {
    fn name(&self) -> &str;

    /// (Re)configure the module.  May be called again to reconfigure.
    fn initialize(&mut self, config: &SystemConfig) -> Result<()>;

    /// Periodic work.  Must return promptly.
    fn tick(&mut self, now_ms: u32, sink: &mut dyn EventSink);

    /// Current status document (JSON).
    fn status_snapshot(&mut self) -> String;

    /// The module's pub/sub producer, if it has one.
    fn data_source(&mut self) -> Option<&mut dyn DataSource> {
        None
    }
}

#[derive(Default)]
pub struct ModuleHost {
    modules: Vec<Box<dyn SysModule>>,
}

impl ModuleHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, module: Box<dyn SysModule>) {
        info!("ModuleHost: added '{}'", module.name());
        self.modules.push(module);
    }

    /// Initialize every module.  Stops at, and returns, the first error.
    pub fn initialize_all(&mut self, config: &SystemConfig) -> Result<()> {
        for module in &mut self.modules {
            if let Err(e) = module.initialize(config) {
                warn!("ModuleHost: '{}' failed to initialize: {}", module.name(), e);
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn tick_all(&mut self, now_ms: u32, sink: &mut dyn EventSink) {
        for module in &mut self.modules {
            module.tick(now_ms, sink);
        }
    }

    pub fn module_mut(&mut self, name: &str) -> Option<&mut (dyn SysModule + 'static)> {
        self.modules
            .iter_mut()
            .find(|m| m.name() == name)
            .map(|m| m.as_mut())
    }

    /// Data source published under `name`.
    pub fn data_source(&mut self, name: &str) -> Option<&mut dyn DataSource> {
        self.modules
            .iter_mut()
            .filter_map(|m| m.data_source())
            .find(|s| s.name() == name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
