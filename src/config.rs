//! System configuration parameters
//!
//! The IMU module and its buses are described by a systype document
//! (`systypes/imu.json`) compiled into the firmware.  Every field has a
//! default so a partial document only overrides what it names.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pins;

/// How buffered poll data is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeMode {
    /// Decode on the device every report interval and emit samples.
    Local,
    /// Leave raw records buffered for the published snapshot.
    Remote,
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Data-source name the snapshot is published under.
    pub data_source: String,
    pub decode_mode: DecodeMode,
    /// Decode/report cadence (milliseconds)
    pub report_interval_ms: u32,
    /// Upper bound on records decoded per device per report.
    pub max_records_per_report: usize,
    /// Buses in setup order.
    pub buses: Vec<BusDescriptor>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            data_source: "IMU".into(),
            decode_mode: DecodeMode::Local,
            report_interval_ms: 100,
            max_records_per_report: 2,
            buses: vec![BusDescriptor::default()],
        }
    }
}

impl SystemConfig {
    /// Parse a systype document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(format!("{e}")))
    }
}

/// One configured bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusDescriptor {
    pub name: String,
    /// Driver type name, looked up in the bus registry.
    #[serde(rename = "type")]
    pub bus_type: String,
    /// Controller index.
    pub port: u8,
    pub sda_pin: i32,
    pub scl_pin: i32,
    pub freq_hz: u32,
    /// Per-`service()` time budget (milliseconds).
    pub service_budget_ms: u32,
    /// Interval between identification probes of absent addresses.
    pub ident_interval_ms: u32,
    /// Consecutive failures before a device is marked offline.
    pub fail_threshold: u8,
    /// Devices to poll.  Empty = scan every known type's default addresses.
    pub devices: Vec<DeviceDescriptor>,
}

impl Default for BusDescriptor {
    fn default() -> Self {
        Self {
            name: "I2CA".into(),
            bus_type: "I2C".into(),
            port: pins::I2C_PORT,
            sda_pin: pins::I2C_SDA_GPIO,
            scl_pin: pins::I2C_SCL_GPIO,
            freq_hz: pins::I2C_FREQ_HZ,
            service_budget_ms: 5,
            ident_interval_ms: 1000,
            fail_threshold: 3,
            devices: Vec::new(),
        }
    }
}

impl BusDescriptor {
    pub fn new(name: &str, bus_type: &str) -> Self {
        Self {
            name: name.into(),
            bus_type: bus_type.into(),
            ..Self::default()
        }
    }
}

/// A device expected on a bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub address: u32,
    /// Device type name; `None` tries every type listing this address.
    #[serde(default, rename = "type")]
    pub device_type: Option<String>,
}
