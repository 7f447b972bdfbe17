//! Si7020 relative humidity and temperature sensor.

use crate::bus::{I2cBus, I2cDevice};
use crate::Result;
use std::thread::sleep;
use std::time::Duration;
use tracing::debug;

/// Fixed bus address.
pub const ADDRESS: u16 = 0x40;

mod cmd {
    pub const MEASURE_HUMIDITY_HOLD: u8 = 0xE5;
    pub const MEASURE_TEMPERATURE_HOLD: u8 = 0xE3;
    pub const RESET: u8 = 0xFE;
}

/// Si7020 sensor.
pub struct Si702x<B = I2cDevice> {
    bus: B,
}

impl Si702x<I2cDevice> {
    /// Opens the sensor on the given bus node.
    pub fn open(path: &str) -> Result<Self> {
        Self::begin(I2cDevice::open(path, ADDRESS)?)
    }
}

impl<B: I2cBus> Si702x<B> {
    /// Soft-resets the sensor.
    pub fn begin(mut bus: B) -> Result<Self> {
        bus.write(&[cmd::RESET])?;
        sleep(Duration::from_millis(15));
        debug!("Si7020 initialized");
        Ok(Self { bus })
    }

    fn measure(&mut self, command: u8) -> Result<u16> {
        self.bus.write(&[command])?;
        sleep(Duration::from_millis(10));
        let mut buf = [0u8; 2];
        self.bus.read(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Returns temperature in °C.
    pub fn read_temperature(&mut self) -> Result<f64> {
        let raw = self.measure(cmd::MEASURE_TEMPERATURE_HOLD)?;
        Ok(temperature_from_raw(raw))
    }

    /// Returns relative humidity in %.
    pub fn read_humidity(&mut self) -> Result<f64> {
        let raw = self.measure(cmd::MEASURE_HUMIDITY_HOLD)?;
        Ok(humidity_from_raw(raw))
    }
}

fn temperature_from_raw(raw: u16) -> f64 {
    raw as f64 * 175.72 / 65536.0 - 46.85
}

fn humidity_from_raw(raw: u16) -> f64 {
    raw as f64 * 125.0 / 65536.0 - 6.0
}
