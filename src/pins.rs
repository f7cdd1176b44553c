//! GPIO / peripheral pin assignments for the IMU carrier board.
//!
//! Single source of truth for the compiled-in bus defaults.  Buses loaded
//! from the systype document may override any of these.

// ---------------------------------------------------------------------------
// Primary I²C bus (LSM6DS3 IMU at 0x6A)
// ---------------------------------------------------------------------------

/// I²C controller index (I2C0).
pub const I2C_PORT: u8 = 0;
pub const I2C_SDA_GPIO: i32 = 14;
pub const I2C_SCL_GPIO: i32 = 15;
/// Fast-mode clock: the IMU data poll is 12 bytes every 10 ms.
pub const I2C_FREQ_HZ: u32 = 400_000;
