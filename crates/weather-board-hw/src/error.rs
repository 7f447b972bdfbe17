//! Error types for the weather board hardware library.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when interacting with the hardware.
#[derive(Error, Debug)]
pub enum Error {
    /// I2C bus device could not be opened.
    #[error("I2C bus {path} could not be opened: {source}")]
    BusOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Slave address could not be selected on the bus.
    #[error("I2C address 0x{address:02X} not selectable on {path}: {source}")]
    AddressSelect {
        path: String,
        address: u16,
        #[source]
        source: std::io::Error,
    },

    /// Chip answered with an unexpected identity register.
    #[error("{chip} identity mismatch (expected 0x{expected:02X}, read 0x{actual:02X})")]
    IdentityMismatch {
        chip: &'static str,
        expected: u8,
        actual: u8,
    },

    /// Register transfer failed.
    #[error("I2C I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raw value could not be compensated into a physical reading.
    #[error("{chip} produced an invalid reading: {reason}")]
    InvalidReading {
        chip: &'static str,
        reason: &'static str,
    },
}
