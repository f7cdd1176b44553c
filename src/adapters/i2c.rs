//! ESP-IDF I²C bus driver registration.
//!
//! Registers the `"I2C"` bus type: each descriptor opens an `I2cDriver` on
//! its controller and pins and wraps it in an [`I2cBus`].
//!
//! The peripherals are taken by number rather than through
//! `Peripherals::take()`, because the bus layout is only known from the
//! configuration.  The registry has already rejected any two buses sharing
//! a controller or pin before a factory runs.

use esp_idf_hal::{
    gpio::AnyIOPin,
    i2c::{I2C0, I2C1, I2cConfig, I2cDriver},
    units::Hertz,
};

use super::time::MonotonicClock;
use crate::bus::i2c::I2cBus;
use crate::bus::{Bus, BusId, BusRegistry};
use crate::config::BusDescriptor;
use crate::error::ConfigError;

/// Bus type name the I²C driver is registered under.
pub const I2C_BUS_TYPE: &str = "I2C";

/// Register the on-chip I²C controllers with `registry`.
pub fn register(registry: &mut BusRegistry) {
    registry.register(I2C_BUS_TYPE, |id: BusId, desc: &BusDescriptor| {
        let driver = open_driver(desc)?;
        let bus = I2cBus::new(id, desc, driver, MonotonicClock::new())?;
        Ok(Box::new(bus) as Box<dyn Bus>)
    });
}

fn open_driver(desc: &BusDescriptor) -> Result<I2cDriver<'static>, ConfigError> {
    let fail = |reason: String| ConfigError::Driver {
        bus: desc.name.clone(),
        reason,
    };
    if desc.sda_pin < 0 || desc.scl_pin < 0 {
        return Err(fail("SDA and SCL pins must be set".into()));
    }

    let config = I2cConfig::new().baudrate(Hertz(desc.freq_hz));
    // SAFETY: pin and controller exclusivity was checked by the registry.
    let sda = unsafe { AnyIOPin::new(desc.sda_pin) };
    let scl = unsafe { AnyIOPin::new(desc.scl_pin) };
    let driver = match desc.port {
        0 => I2cDriver::new(unsafe { I2C0::new() }, sda, scl, &config),
        1 => I2cDriver::new(unsafe { I2C1::new() }, sda, scl, &config),
        p => return Err(fail(format!("no I2C controller {p}"))),
    };
    driver.map_err(|e| fail(format!("{e}")))
}
