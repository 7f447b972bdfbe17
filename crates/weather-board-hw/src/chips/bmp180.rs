//! BMP180 barometric pressure and temperature sensor.

use crate::bus::{I2cBus, I2cDevice};
use crate::{Error, Result};
use std::thread::sleep;
use std::time::Duration;
use tracing::debug;

/// Fixed bus address.
pub const ADDRESS: u16 = 0x77;

/// Expected content of the chip id register.
const CHIP_ID: u8 = 0x55;

mod reg {
    pub const CALIBRATION: u8 = 0xAA;
    pub const CHIP_ID: u8 = 0xD0;
    pub const CONTROL: u8 = 0xF4;
    pub const DATA: u8 = 0xF6;
}

mod cmd {
    pub const READ_TEMPERATURE: u8 = 0x2E;
    pub const READ_PRESSURE: u8 = 0x34;
}

/// Pressure oversampling setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Oversampling {
    UltraLowPower = 0,
    #[default]
    Standard = 1,
    HighResolution = 2,
    UltraHighResolution = 3,
}

impl Oversampling {
    fn conversion_time(self) -> Duration {
        Duration::from_micros(match self {
            Oversampling::UltraLowPower => 4_500,
            Oversampling::Standard => 7_500,
            Oversampling::HighResolution => 13_500,
            Oversampling::UltraHighResolution => 25_500,
        })
    }
}

/// Factory calibration coefficients.
#[derive(Debug, Clone, Copy, Default)]
pub struct Calibration {
    pub ac1: i16,
    pub ac2: i16,
    pub ac3: i16,
    pub ac4: u16,
    pub ac5: u16,
    pub ac6: u16,
    pub b1: i16,
    pub b2: i16,
    pub mb: i16,
    pub mc: i16,
    pub md: i16,
}

impl Calibration {
    /// Decodes the 22-byte big-endian block at `0xAA`.
    pub fn from_registers(raw: &[u8; 22]) -> Self {
        let i16_at = |i: usize| i16::from_be_bytes([raw[i], raw[i + 1]]);
        let u16_at = |i: usize| u16::from_be_bytes([raw[i], raw[i + 1]]);

        Self {
            ac1: i16_at(0),
            ac2: i16_at(2),
            ac3: i16_at(4),
            ac4: u16_at(6),
            ac5: u16_at(8),
            ac6: u16_at(10),
            b1: i16_at(12),
            b2: i16_at(14),
            mb: i16_at(16),
            mc: i16_at(18),
            md: i16_at(20),
        }
    }

    /// Intermediate B5 term shared by temperature and pressure.
    pub fn b5(&self, ut: i32) -> Option<i32> {
        let x1 = ((ut as i64 - self.ac6 as i64) * self.ac5 as i64) >> 15;
        let denominator = x1 + self.md as i64;
        if denominator == 0 {
            return None;
        }
        let x2 = ((self.mc as i64) << 11) / denominator;
        i32::try_from(x1 + x2).ok()
    }

    /// Temperature in 0.1 °C.
    pub fn temperature_deci(&self, b5: i32) -> i32 {
        (b5 + 8) >> 4
    }

    /// Pressure in Pa.
    pub fn pressure_pa(&self, up: i32, b5: i32, oss: Oversampling) -> Option<i32> {
        let oss = oss as u8 as i64;
        let up = up as i64;
        let b6 = b5 as i64 - 4000;

        let x1 = (self.b2 as i64 * ((b6 * b6) >> 12)) >> 11;
        let x2 = (self.ac2 as i64 * b6) >> 11;
        let x3 = x1 + x2;
        let b3 = ((((self.ac1 as i64) * 4 + x3) << oss) + 2) / 4;

        let x1 = (self.ac3 as i64 * b6) >> 13;
        let x2 = (self.b1 as i64 * ((b6 * b6) >> 12)) >> 16;
        let x3 = ((x1 + x2) + 2) >> 2;
        let b4 = (self.ac4 as i64 * (x3 + 32_768)) >> 15;
        let b7 = (up - b3) * (50_000 >> oss);
        if b4 == 0 || b7 < 0 {
            return None;
        }

        let mut p = if b7 < 0x8000_0000 {
            (b7 * 2) / b4
        } else {
            (b7 / b4) * 2
        };
        let x1 = ((p >> 8) * (p >> 8) * 3038) >> 16;
        let x2 = (-7357 * p) >> 16;
        p += (x1 + x2 + 3791) >> 4;
        Some(p as i32)
    }
}

/// BMP180 sensor.
pub struct Bmp180<B = I2cDevice> {
    bus: B,
    calibration: Calibration,
    oversampling: Oversampling,
}

impl Bmp180<I2cDevice> {
    /// Opens the sensor on the given bus node.
    pub fn open(path: &str) -> Result<Self> {
        Self::begin(I2cDevice::open(path, ADDRESS)?, Oversampling::default())
    }
}

impl<B: I2cBus> Bmp180<B> {
    /// Verifies the chip id and loads calibration.
    pub fn begin(mut bus: B, oversampling: Oversampling) -> Result<Self> {
        let chip_id = bus.read_u8(reg::CHIP_ID)?;
        if chip_id != CHIP_ID {
            return Err(Error::IdentityMismatch {
                chip: "bmp180",
                expected: CHIP_ID,
                actual: chip_id,
            });
        }

        let mut raw = [0u8; 22];
        bus.read_registers(reg::CALIBRATION, &mut raw)?;
        let calibration = Calibration::from_registers(&raw);
        debug!("BMP180 initialized: {:?}", calibration);

        Ok(Self {
            bus,
            calibration,
            oversampling,
        })
    }

    fn read_raw_temperature(&mut self) -> Result<i32> {
        self.bus.write_u8(reg::CONTROL, cmd::READ_TEMPERATURE)?;
        sleep(Duration::from_micros(4_500));
        let mut buf = [0u8; 2];
        self.bus.read_registers(reg::DATA, &mut buf)?;
        Ok(u16::from_be_bytes(buf) as i32)
    }

    fn read_raw_pressure(&mut self) -> Result<i32> {
        let oss = self.oversampling as u8;
        self.bus
            .write_u8(reg::CONTROL, cmd::READ_PRESSURE + (oss << 6))?;
        sleep(self.oversampling.conversion_time());
        let mut buf = [0u8; 3];
        self.bus.read_registers(reg::DATA, &mut buf)?;
        let raw = ((buf[0] as i32) << 16) | ((buf[1] as i32) << 8) | buf[2] as i32;
        Ok(raw >> (8 - oss))
    }

    fn b5(&mut self) -> Result<i32> {
        let ut = self.read_raw_temperature()?;
        self.calibration.b5(ut).ok_or(Error::InvalidReading {
            chip: "bmp180",
            reason: "temperature compensation divisor is zero",
        })
    }

    /// Returns temperature in °C.
    pub fn read_temperature(&mut self) -> Result<f64> {
        let b5 = self.b5()?;
        Ok(self.calibration.temperature_deci(b5) as f64 / 10.0)
    }

    /// Returns pressure in Pa.
    pub fn read_pressure(&mut self) -> Result<f64> {
        let b5 = self.b5()?;
        let up = self.read_raw_pressure()?;
        let pa = self
            .calibration
            .pressure_pa(up, b5, self.oversampling)
            .ok_or(Error::InvalidReading {
                chip: "bmp180",
                reason: "pressure out of range",
            })?;
        Ok(pa as f64)
    }
}
