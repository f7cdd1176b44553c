//! Unified error types for the imubus firmware.
//!
//! A single `Error` enum that every subsystem converts into keeps the
//! module host's error handling uniform.  Only configuration errors are
//! ever surfaced to a caller: transient bus failures are debounced inside
//! the bus, and decode resyncs are recovered by the decoder itself.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Bus configuration is invalid.  Fatal at setup, never retried.
    Config(ConfigError),
    /// A single bus transaction failed.
    Bus(TransientBusError),
    /// The decoder dropped its carry to resynchronise the stream.
    Decode(DecodeResyncError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Decode(e) => write!(f, "decode: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No factory is registered for the named bus type.
    UnknownBusType(String),
    /// Two buses claim the same controller or pin.
    ResourceConflict {
        bus: String,
        other: String,
        resource: &'static str,
    },
    /// Two buses share a name.
    DuplicateBusName(String),
    /// A device address is configured on more than one bus.
    AddressConflict { address: u32, bus: String, other: String },
    /// A device address is outside the bus address space.
    InvalidAddress { bus: String, address: u32 },
    /// A device names a type that is not in the device table.
    UnknownDeviceType { bus: String, device_type: String },
    /// The bus driver could not open its hardware.
    Driver { bus: String, reason: String },
    /// More buses than the firmware tracks.
    TooManyBuses { count: usize, max: usize },
    /// The configuration document could not be parsed.
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownBusType(name) => write!(f, "no driver registered for bus type '{name}'"),
            Self::ResourceConflict {
                bus,
                other,
                resource,
            } => write!(f, "bus '{bus}' uses the same {resource} as bus '{other}'"),
            Self::DuplicateBusName(name) => write!(f, "bus name '{name}' used twice"),
            Self::AddressConflict {
                address,
                bus,
                other,
            } => write!(
                f,
                "address 0x{address:02x} configured on both '{other}' and '{bus}'"
            ),
            Self::InvalidAddress { bus, address } => {
                write!(f, "address 0x{address:x} on bus '{bus}' is not a 7-bit address")
            }
            Self::UnknownDeviceType { bus, device_type } => {
                write!(f, "bus '{bus}' names unknown device type '{device_type}'")
            }
            Self::Driver { bus, reason } => write!(f, "bus '{bus}' failed to open: {reason}"),
            Self::TooManyBuses { count, max } => {
                write!(f, "{count} buses configured, at most {max} supported")
            }
            Self::Parse(msg) => write!(f, "parse failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Bus transaction errors
// ---------------------------------------------------------------------------

/// A single failed transaction.  Classified from the transport's error so
/// the bus can tell an absent device apart from a faulty bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientBusError {
    /// The addressed device did not acknowledge.
    NoAcknowledge,
    /// Bus-level fault: arbitration loss, stuck line, overrun.
    BusFault,
    /// The device answered with an identity no known type matches.
    UnknownIdentity,
}

impl TransientBusError {
    /// Bus faults count towards the bus operation status; NACKs do not.
    pub const fn is_bus_fault(self) -> bool {
        matches!(self, Self::BusFault)
    }
}

impl fmt::Display for TransientBusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAcknowledge => write!(f, "no acknowledge"),
            Self::BusFault => write!(f, "bus fault"),
            Self::UnknownIdentity => write!(f, "unknown device identity"),
        }
    }
}

impl From<TransientBusError> for Error {
    fn from(e: TransientBusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Decode errors
// ---------------------------------------------------------------------------

/// The carry filled up without completing a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeResyncError {
    /// Bytes thrown away (carry plus the rest of the raw buffer).
    pub discarded: usize,
}

impl fmt::Display for DecodeResyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "carry overflow, resync discarded {} bytes", self.discarded)
    }
}

impl From<DecodeResyncError> for Error {
    fn from(e: DecodeResyncError) -> Self {
        Self::Decode(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
