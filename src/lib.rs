//! imubus firmware library.
//!
//! Exposes the bus polling engine and the IMU module for integration
//! testing and host-side simulation.  ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.
//!
//! ```text
//!  BusRegistry ─▶ BusSystem ─▶ I2cBus<I2c, Clock> ─▶ DeviceRecord (raw ring)
//!                     │                                   │
//!                     ▼                                   ▼
//!               PresenceEvent                   PollDecoder + DecodeState
//!                     │                                   │
//!                     └────────────▶ ImuModule ◀──────────┘
//!                                       │
//!                     fingerprint ◀─────┴─────▶ snapshot ─▶ ChangePublisher
//! ```

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod bus;
pub mod config;
pub mod decode;
pub mod error;
pub mod fingerprint;
pub mod publish;
pub mod sensors;
pub mod snapshot;
pub mod timing;

mod pins;
