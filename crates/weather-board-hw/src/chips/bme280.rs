//! BME280 combined pressure, temperature and humidity sensor.
//!
//! Compensation follows the fixed-point formulas from the Bosch datasheet.
//! Humidity comes out in Q22.10 format and is scaled by 1024.

use crate::bus::{I2cBus, I2cDevice};
use crate::{Error, Result};
use std::thread::sleep;
use std::time::Duration;
use tracing::debug;

/// Primary bus address (SDO tied low).
pub const ADDRESS: u16 = 0x76;

/// Expected content of the chip id register.
const CHIP_ID: u8 = 0x60;

mod reg {
    pub const CALIB_00: u8 = 0x88;
    pub const CHIP_ID: u8 = 0xD0;
    pub const CALIB_26: u8 = 0xE1;
    pub const CTRL_HUM: u8 = 0xF2;
    pub const CTRL_MEAS: u8 = 0xF4;
    pub const CONFIG: u8 = 0xF5;
    pub const DATA: u8 = 0xF7;
}

/// 2x oversampling on every channel.
const OVERSAMPLING_2X: u8 = 0b010;
const MODE_NORMAL: u8 = 0b11;

/// Factory trimming parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Calibration {
    pub t1: u16,
    pub t2: i16,
    pub t3: i16,
    pub p1: u16,
    pub p2: i16,
    pub p3: i16,
    pub p4: i16,
    pub p5: i16,
    pub p6: i16,
    pub p7: i16,
    pub p8: i16,
    pub p9: i16,
    pub h1: u8,
    pub h2: i16,
    pub h3: u8,
    pub h4: i16,
    pub h5: i16,
    pub h6: i8,
}

impl Calibration {
    /// Decodes the `0x88..=0xA1` and `0xE1..=0xE7` register blocks.
    pub fn from_registers(tp: &[u8; 26], h: &[u8; 7]) -> Self {
        let u16_at = |i: usize| u16::from_le_bytes([tp[i], tp[i + 1]]);
        let i16_at = |i: usize| i16::from_le_bytes([tp[i], tp[i + 1]]);

        Self {
            t1: u16_at(0),
            t2: i16_at(2),
            t3: i16_at(4),
            p1: u16_at(6),
            p2: i16_at(8),
            p3: i16_at(10),
            p4: i16_at(12),
            p5: i16_at(14),
            p6: i16_at(16),
            p7: i16_at(18),
            p8: i16_at(20),
            p9: i16_at(22),
            h1: tp[25],
            h2: i16::from_le_bytes([h[0], h[1]]),
            h3: h[2],
            h4: ((h[3] as i8 as i16) << 4) | (h[4] & 0x0F) as i16,
            h5: ((h[5] as i8 as i16) << 4) | (h[4] >> 4) as i16,
            h6: h[6] as i8,
        }
    }

    /// Fine temperature shared by the pressure and humidity formulas.
    pub fn t_fine(&self, adc_t: i32) -> i32 {
        let adc_t = adc_t as i64;
        let t1 = self.t1 as i64;
        let var1 = (((adc_t >> 3) - (t1 << 1)) * self.t2 as i64) >> 11;
        let var2 = (((((adc_t >> 4) - t1) * ((adc_t >> 4) - t1)) >> 12) * self.t3 as i64) >> 14;
        (var1 + var2) as i32
    }

    /// Temperature in 0.01 °C.
    pub fn temperature_centi(&self, t_fine: i32) -> i32 {
        (t_fine * 5 + 128) >> 8
    }

    /// Pressure in Pa as unsigned Q24.8, or `None` when the divisor vanishes.
    pub fn pressure_q24_8(&self, adc_p: i32, t_fine: i32) -> Option<u32> {
        let mut var1 = t_fine as i64 - 128_000;
        let mut var2 = var1 * var1 * self.p6 as i64;
        var2 += (var1 * self.p5 as i64) << 17;
        var2 += (self.p4 as i64) << 35;
        var1 = ((var1 * var1 * self.p3 as i64) >> 8) + ((var1 * self.p2 as i64) << 12);
        var1 = (((1i64 << 47) + var1) * self.p1 as i64) >> 33;
        if var1 == 0 {
            return None;
        }

        let mut p = 1_048_576 - adc_p as i64;
        p = (((p << 31) - var2) * 3125) / var1;
        let var1 = (self.p9 as i64 * (p >> 13) * (p >> 13)) >> 25;
        let var2 = (self.p8 as i64 * p) >> 19;
        p = ((p + var1 + var2) >> 8) + ((self.p7 as i64) << 4);
        Some(p as u32)
    }

    /// Relative humidity as unsigned Q22.10.
    pub fn humidity_q22_10(&self, adc_h: i32, t_fine: i32) -> u32 {
        let v = t_fine as i64 - 76_800;
        let adc_h = adc_h as i64;
        let mut v = ((((adc_h << 14) - ((self.h4 as i64) << 20) - (self.h5 as i64 * v)) + 16_384)
            >> 15)
            * (((((((v * self.h6 as i64) >> 10) * (((v * self.h3 as i64) >> 11) + 32_768))
                >> 10)
                + 2_097_152)
                * self.h2 as i64
                + 8192)
                >> 14);
        v -= ((((v >> 15) * (v >> 15)) >> 7) * self.h1 as i64) >> 4;
        let v = v.clamp(0, 419_430_400);
        (v >> 12) as u32
    }
}

/// One compensated measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Temperature in °C.
    pub temperature_c: f64,
    /// Relative humidity in %.
    pub humidity_pct: f64,
    /// Pressure in hPa, board offset applied.
    pub pressure_hpa: f64,
}

/// BME280 sensor.
pub struct Bme280<B = I2cDevice> {
    bus: B,
    calibration: Calibration,
    pressure_offset_hpa: f64,
}

impl Bme280<I2cDevice> {
    /// Opens the sensor on the given bus node.
    pub fn open(path: &str, pressure_offset_hpa: f64) -> Result<Self> {
        Self::begin(I2cDevice::open(path, ADDRESS)?, pressure_offset_hpa)
    }
}

impl<B: I2cBus> Bme280<B> {
    /// Verifies the chip id, loads calibration and enters normal mode.
    pub fn begin(mut bus: B, pressure_offset_hpa: f64) -> Result<Self> {
        let chip_id = bus.read_u8(reg::CHIP_ID)?;
        if chip_id != CHIP_ID {
            return Err(Error::IdentityMismatch {
                chip: "bme280",
                expected: CHIP_ID,
                actual: chip_id,
            });
        }

        let mut tp = [0u8; 26];
        bus.read_registers(reg::CALIB_00, &mut tp)?;
        let mut h = [0u8; 7];
        bus.read_registers(reg::CALIB_26, &mut h)?;
        let calibration = Calibration::from_registers(&tp, &h);

        // ctrl_hum only takes effect after a ctrl_meas write.
        bus.write_u8(reg::CTRL_HUM, OVERSAMPLING_2X)?;
        bus.write_u8(
            reg::CTRL_MEAS,
            (OVERSAMPLING_2X << 5) | (OVERSAMPLING_2X << 2) | MODE_NORMAL,
        )?;
        bus.write_u8(reg::CONFIG, 0)?;
        sleep(Duration::from_millis(100));

        debug!("BME280 initialized: {:?}", calibration);

        Ok(Self {
            bus,
            calibration,
            pressure_offset_hpa,
        })
    }

    #[cfg(test)]
    pub(crate) fn bus(&self) -> &B {
        &self.bus
    }

    /// Burst-reads and compensates all three channels.
    pub fn read(&mut self) -> Result<Measurement> {
        let mut raw = [0u8; 8];
        self.bus.read_registers(reg::DATA, &mut raw)?;

        let adc_p = ((raw[0] as i32) << 12) | ((raw[1] as i32) << 4) | ((raw[2] as i32) >> 4);
        let adc_t = ((raw[3] as i32) << 12) | ((raw[4] as i32) << 4) | ((raw[5] as i32) >> 4);
        let adc_h = ((raw[6] as i32) << 8) | raw[7] as i32;

        let cal = &self.calibration;
        let t_fine = cal.t_fine(adc_t);
        let pressure = cal
            .pressure_q24_8(adc_p, t_fine)
            .ok_or(Error::InvalidReading {
                chip: "bme280",
                reason: "pressure compensation divisor is zero",
            })?;

        Ok(Measurement {
            temperature_c: cal.temperature_centi(t_fine) as f64 / 100.0,
            humidity_pct: cal.humidity_q22_10(adc_h, t_fine) as f64 / 1024.0,
            pressure_hpa: pressure as f64 / 256.0 / 100.0 + self.pressure_offset_hpa,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mock::MockBus;

    fn datasheet_calibration() -> Calibration {
        Calibration {
            t1: 27504,
            t2: 26435,
            t3: -1000,
            p1: 36477,
            p2: -10685,
            p3: 3024,
            p4: 2855,
            p5: 140,
            p6: -7,
            p7: 15500,
            p8: -14600,
            p9: 6000,
            ..Default::default()
        }
    }

    #[test]
    fn test_temperature_compensation() {
        let cal = datasheet_calibration();
        let t_fine = cal.t_fine(519_888);
        assert_eq!(t_fine, 128_422);
        assert_eq!(cal.temperature_centi(t_fine), 2508);
    }

    #[test]
    fn test_pressure_compensation() {
        let cal = datasheet_calibration();
        let t_fine = cal.t_fine(519_888);
        let pa = cal.pressure_q24_8(415_148, t_fine).unwrap() as f64 / 256.0;
        assert!((pa - 100_653.25).abs() < 1.0, "got {pa}");
    }

    #[test]
    fn test_pressure_zero_divisor() {
        let cal = Calibration::default();
        assert_eq!(cal.pressure_q24_8(415_148, 0), None);
    }

    #[test]
    fn test_humidity_clamps_to_full_scale() {
        let cal = Calibration {
            h2: 370,
            h3: 0,
            h6: 30,
            ..datasheet_calibration()
        };
        let q = cal.humidity_q22_10(0xFFFF, 128_422);
        assert_eq!(q as f64 / 1024.0, 100.0);
        assert_eq!(cal.humidity_q22_10(0, 128_422), 0);
    }

    #[test]
    fn test_calibration_decoding() {
        let mut tp = [0u8; 26];
        tp[0..2].copy_from_slice(&27504u16.to_le_bytes());
        tp[2..4].copy_from_slice(&26435i16.to_le_bytes());
        tp[4..6].copy_from_slice(&(-1000i16).to_le_bytes());
        tp[25] = 75;
        let h = [0x6A, 0x01, 0x00, 0x13, 0x25, 0x03, 0x1E];
        let cal = Calibration::from_registers(&tp, &h);

        assert_eq!(cal.t1, 27504);
        assert_eq!(cal.t2, 26435);
        assert_eq!(cal.t3, -1000);
        assert_eq!(cal.h1, 75);
        assert_eq!(cal.h2, 362);
        assert_eq!(cal.h4, (0x13 << 4) | 0x5);
        assert_eq!(cal.h5, (0x03 << 4) | 0x2);
        assert_eq!(cal.h6, 30);
    }

    #[test]
    fn test_identity_mismatch() {
        let bus = MockBus::new().with(reg::CHIP_ID, &[0x58]);
        let err = Bme280::begin(bus, 0.0).err().unwrap();
        assert!(matches!(err, Error::IdentityMismatch { chip: "bme280", .. }));
    }

    #[test]
    fn test_read_fails_on_bus_error() {
        let bus = MockBus::new().with(reg::CHIP_ID, &[CHIP_ID]);
        let mut sensor = Bme280::begin(bus, 10.0).unwrap();
        sensor.bus.set_failing(true);
        assert!(matches!(sensor.read(), Err(Error::Io(_))));
    }
}
