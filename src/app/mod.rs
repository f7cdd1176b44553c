//! Application core: module lifecycle and the IMU module.
//!
//! Everything here talks to the outside world through the **port traits**
//! in [`ports`], so the whole polling pipeline runs on host with mock
//! transports and clocks.

pub mod events;
pub mod host;
pub mod module;
pub mod ports;
