//! Chip drivers for the weather board.
//!
//! Each driver is generic over [`I2cBus`](crate::bus::I2cBus) and defaults to
//! the Linux i2c-dev binding.

pub mod bme280;
pub mod bmp180;
pub mod si1132;
pub mod si702x;

pub use bme280::Bme280;
pub use bmp180::Bmp180;
pub use si1132::Si1132;
pub use si702x::Si702x;
