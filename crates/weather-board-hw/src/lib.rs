//! Weather Board Hardware Library
//!
//! Provides hardware abstraction for the Si1132 light sensor and the
//! BME280 (or Si7020 + BMP180) climate sensors found on the weather board,
//! accessed through Linux i2c-dev nodes.

pub mod board;
pub mod bus;
pub mod chips;
pub mod error;
pub mod source;

pub use board::{detect, BoardOptions, BoardV1, BoardV2};
pub use bus::{I2cBus, I2cDevice};
pub use error::{Error, Result};
pub use source::{altitude_m, BoardVariant, SensorSource, SEA_LEVEL_HPA};

/// Default I2C bus node.
pub const DEFAULT_DEVICE: &str = "/dev/i2c-1";
