//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements           | Connects to              |
//! |------------|----------------------|--------------------------|
//! | `i2c`      | `"I2C"` bus factory  | ESP-IDF `I2cDriver`      |
//! | `log_sink` | EventSink            | Serial log output        |
//! |            | PublishPort          |                          |
//! | `time`     | Clock                | ESP32 system timer       |

#[cfg(target_os = "espidf")]
pub mod i2c;
pub mod log_sink;
pub mod time;
