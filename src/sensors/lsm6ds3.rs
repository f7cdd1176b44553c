//! ST LSM6DS3 6-axis IMU (3-axis gyro + 3-axis accelerometer).
//!
//! Configured for 104 Hz output, ±2000 dps gyro and ±4 g accelerometer,
//! and polled every 10 ms for the 12 output bytes starting at OUTX_L_G.
//!
//! ## Poll record (14 bytes)
//!
//! | Offset | Type     | Field                               |
//! |--------|----------|-------------------------------------|
//! | 0      | u16 BE   | poll time, low 16 bits of ms        |
//! | 2      | i16 LE×3 | gx, gy, gz (raw)                    |
//! | 8      | i16 LE×3 | ax, ay, az (raw)                    |

use super::{DetectSpec, DeviceType, PollSpec};
use crate::decode::{DecodedRecord, PollDecoder, TimestampUnwrap};

const REG_WHO_AM_I: u8 = 0x0F;
const REG_CTRL1_XL: u8 = 0x10;
const REG_CTRL2_G: u8 = 0x11;
const REG_OUTX_L_G: u8 = 0x22;

/// WHO_AM_I values: LSM6DS3 and the register-compatible LSM6DSL.
const WHO_AM_I_VALUES: &[u8] = &[0x69, 0x6A];

/// ODR 104 Hz, FS ±4 g.
const CTRL1_XL_104HZ_4G: u8 = 0x48;
/// ODR 104 Hz, FS ±2000 dps.
const CTRL2_G_104HZ_2000DPS: u8 = 0x4C;

const POLL_LEN: usize = 12;
pub const RECORD_SIZE: usize = 2 + POLL_LEN;

/// LSB per dps at ±2000 dps.
pub const GYRO_LSB_PER_DPS: f32 = 16.384;
/// LSB per g at ±4 g.
pub const ACCEL_LSB_PER_G: f32 = 8192.0;

pub const DEVICE_TYPE: DeviceType = DeviceType {
    name: "LSM6DS3",
    addresses: &[0x6A, 0x6B],
    detect: DetectSpec {
        register: REG_WHO_AM_I,
        expected: WHO_AM_I_VALUES,
    },
    init: &[
        (REG_CTRL1_XL, CTRL1_XL_104HZ_4G),
        (REG_CTRL2_G, CTRL2_G_104HZ_2000DPS),
    ],
    poll: PollSpec {
        register: REG_OUTX_L_G,
        len: POLL_LEN,
        interval_ms: 10,
    },
    decoder: PollDecoder::new(RECORD_SIZE, decode_record),
    field_names: &["gx", "gy", "gz", "ax", "ay", "az"],
};

/// A decoded motion sample in physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    pub time_ms: u64,
    /// Angular rate (dps).
    pub gx: f32,
    pub gy: f32,
    pub gz: f32,
    /// Acceleration (g).
    pub ax: f32,
    pub ay: f32,
    pub az: f32,
}

impl MotionSample {
    /// Interpret a record produced by this device type's decoder.
    pub fn from_record(record: &DecodedRecord) -> Option<Self> {
        match *record.fields() {
            [gx, gy, gz, ax, ay, az] => Some(Self {
                time_ms: record.time_ms,
                gx,
                gy,
                gz,
                ax,
                ay,
                az,
            }),
            _ => None,
        }
    }
}

fn decode_record(rec: &[u8], timestamps: &mut TimestampUnwrap) -> DecodedRecord {
    let time_ms = timestamps.unwrap(u16::from_be_bytes([rec[0], rec[1]]));
    let raw = |i: usize| i16::from_le_bytes([rec[2 + 2 * i], rec[3 + 2 * i]]) as f32;

    DecodedRecord::new(
        time_ms,
        &[
            raw(0) / GYRO_LSB_PER_DPS,
            raw(1) / GYRO_LSB_PER_DPS,
            raw(2) / GYRO_LSB_PER_DPS,
            raw(3) / ACCEL_LSB_PER_G,
            raw(4) / ACCEL_LSB_PER_G,
            raw(5) / ACCEL_LSB_PER_G,
        ],
    )
}
