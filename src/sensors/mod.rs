//! Device type table: every sensor the buses know how to identify and poll.
//!
//! A [`DeviceType`] is pure data: how to recognise the device, the register
//! writes that configure it, what to read on each data poll, and the
//! decoder for the records those polls produce.  Buses look types up by
//! index, which is what presence events carry.

pub mod lsm6ds3;

use crate::decode::PollDecoder;

/// Identity check: write `register`, read one byte, expect one of `expected`.
#[derive(Debug, Clone, Copy)]
pub struct DetectSpec {
    pub register: u8,
    pub expected: &'static [u8],
}

/// Data poll: write `register`, read `len` bytes, every `interval_ms`.
#[derive(Debug, Clone, Copy)]
pub struct PollSpec {
    pub register: u8,
    pub len: usize,
    pub interval_ms: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct DeviceType {
    pub name: &'static str,
    /// Addresses the device can strap to.
    pub addresses: &'static [u8],
    pub detect: DetectSpec,
    /// `(register, value)` writes issued once after identification.
    pub init: &'static [(u8, u8)],
    pub poll: PollSpec,
    pub decoder: PollDecoder,
    /// Names of the decoded record fields, in order.
    pub field_names: &'static [&'static str],
}

/// All supported device types.  Indices are stable for the firmware build.
pub static DEVICE_TYPES: &[DeviceType] = &[lsm6ds3::DEVICE_TYPE];

/// Look up a device type by index.
pub fn device_type(index: usize) -> Option<&'static DeviceType> {
    DEVICE_TYPES.get(index)
}

/// Find a device type index by name (case-insensitive).
pub fn find_device_type(name: &str) -> Option<usize> {
    DEVICE_TYPES
        .iter()
        .position(|t| t.name.eq_ignore_ascii_case(name))
}

/// Indices of every type that may appear at `address`, in table order.
pub fn candidates_for(address: u32) -> impl Iterator<Item = usize> {
    DEVICE_TYPES
        .iter()
        .enumerate()
        .filter(move |(_, t)| t.addresses.iter().any(|&a| a as u32 == address))
        .map(|(i, _)| i)
}

/// Default scan list: every address any known type can appear at.
pub fn default_scan_addresses() -> Vec<u32> {
    let mut addrs: Vec<u32> = DEVICE_TYPES
        .iter()
        .flat_map(|t| t.addresses.iter().map(|&a| a as u32))
        .collect();
    addrs.sort_unstable();
    addrs.dedup();
    addrs
}
