//! Fuzz target: `SystemConfig::from_json`
//!
//! Arbitrary documents must parse or fail with `ConfigError::Parse`, never
//! panic.  Whatever parses is then handed to a registry with no drivers,
//! which must reject it cleanly.
//!
//! cargo fuzz run fuzz_systype_config

#![no_main]

use imubus::bus::BusRegistry;
use imubus::config::SystemConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = SystemConfig::from_json(text) {
        let registry = BusRegistry::new();
        let result = registry.create_from_config(&config.buses);
        assert_eq!(result.is_ok(), config.buses.is_empty());
    }
});
