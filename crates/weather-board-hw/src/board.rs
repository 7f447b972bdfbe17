//! Board variants and start-up detection.

use crate::bus::{I2cBus, I2cDevice};
use crate::chips::{Bme280, Bmp180, Si1132, Si702x};
use crate::source::{BoardVariant, SensorSource};
use crate::Result;
use tracing::{debug, info};

/// Options applied while bringing up the board.
#[derive(Debug, Clone, Copy)]
pub struct BoardOptions {
    /// Offset added to BME280 pressure readings, in hPa.
    pub pressure_offset_hpa: f64,
}

impl Default for BoardOptions {
    fn default() -> Self {
        Self {
            pressure_offset_hpa: 10.0,
        }
    }
}

/// Second-generation board: Si1132 + BME280.
pub struct BoardV2<B = I2cDevice> {
    light: Si1132<B>,
    climate: Bme280<B>,
}

impl<B: I2cBus> BoardV2<B> {
    pub fn new(light: Si1132<B>, climate: Bme280<B>) -> Self {
        Self { light, climate }
    }
}

impl<B: I2cBus> SensorSource for BoardV2<B> {
    fn variant(&self) -> BoardVariant {
        BoardVariant::V2
    }

    fn read_uv_index(&mut self) -> Result<f64> {
        self.light.read_uv_index()
    }

    fn read_visible(&mut self) -> Result<f64> {
        self.light.read_visible()
    }

    fn read_ir(&mut self) -> Result<f64> {
        self.light.read_ir()
    }

    fn read_temperature(&mut self) -> Result<f64> {
        Ok(self.climate.read()?.temperature_c)
    }

    fn read_humidity(&mut self) -> Result<f64> {
        Ok(self.climate.read()?.humidity_pct)
    }

    fn read_pressure(&mut self) -> Result<f64> {
        Ok(self.climate.read()?.pressure_hpa)
    }

    fn read_climate(&mut self) -> Result<(f64, f64, f64)> {
        let m = self.climate.read()?;
        Ok((m.temperature_c, m.humidity_pct, m.pressure_hpa))
    }
}

/// First-generation board: Si1132 + Si7020 + BMP180.
pub struct BoardV1<B = I2cDevice> {
    light: Si1132<B>,
    humidity: Si702x<B>,
    barometer: Bmp180<B>,
}

impl<B: I2cBus> BoardV1<B> {
    pub fn new(light: Si1132<B>, humidity: Si702x<B>, barometer: Bmp180<B>) -> Self {
        Self {
            light,
            humidity,
            barometer,
        }
    }
}

impl<B: I2cBus> SensorSource for BoardV1<B> {
    fn variant(&self) -> BoardVariant {
        BoardVariant::V1
    }

    fn read_uv_index(&mut self) -> Result<f64> {
        self.light.read_uv_index()
    }

    fn read_visible(&mut self) -> Result<f64> {
        self.light.read_visible()
    }

    fn read_ir(&mut self) -> Result<f64> {
        self.light.read_ir()
    }

    /// Mean of the BMP180 and Si7020 temperatures.
    fn read_temperature(&mut self) -> Result<f64> {
        let a = self.barometer.read_temperature()?;
        let b = self.humidity.read_temperature()?;
        Ok((a + b) / 2.0)
    }

    fn read_humidity(&mut self) -> Result<f64> {
        self.humidity.read_humidity()
    }

    fn read_pressure(&mut self) -> Result<f64> {
        Ok(self.barometer.read_pressure()? / 100.0)
    }
}

/// Brings up the light sensor and probes for the climate chips.
///
/// The Si1132 must be present on both revisions. A BME280 selects the
/// second-generation board; otherwise the Si7020 + BMP180 pair must answer.
pub fn detect(device: &str, options: BoardOptions) -> Result<Box<dyn SensorSource>> {
    let light = Si1132::open(device)?;

    match Bme280::open(device, options.pressure_offset_hpa) {
        Ok(climate) => {
            info!("BME280 found on {}", device);
            Ok(Box::new(BoardV2::new(light, climate)))
        }
        Err(e) => {
            debug!("BME280 probe failed ({}), trying Si7020 + BMP180", e);
            let humidity = Si702x::open(device)?;
            let barometer = Bmp180::open(device)?;
            info!("Si7020 + BMP180 found on {}", device);
            Ok(Box::new(BoardV1::new(light, humidity, barometer)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mock::MockBus;

    fn light() -> Si1132<MockBus> {
        let bus = MockBus::new()
            .with(0x00, &[0x32])
            .with(0x2C, &250u16.to_le_bytes());
        Si1132::begin(bus).unwrap()
    }

    #[test]
    fn test_v2_reads_through_to_chips() {
        let climate = Bme280::begin(MockBus::new().with(0xD0, &[0x60]), 10.0).unwrap();
        let mut board = BoardV2::new(light(), climate);

        assert_eq!(board.variant(), BoardVariant::V2);
        let (uv, visible, ir) = board.read_light().unwrap();
        assert!((uv - 2.5).abs() < 1e-9);
        assert_eq!(visible, 0.0);
        assert_eq!(ir, 0.0);
    }

    /// BME280 with datasheet trimming and one pending conversion.
    fn climate() -> Bme280<MockBus> {
        let mut trimming = Vec::new();
        for word in [27504u16.to_le_bytes(), 26435i16.to_le_bytes(), (-1000i16).to_le_bytes()] {
            trimming.extend_from_slice(&word);
        }
        trimming.extend_from_slice(&36477u16.to_le_bytes());
        for word in [-10685i16, 3024, 2855, 140, -7, 15500, -14600, 6000] {
            trimming.extend_from_slice(&word.to_le_bytes());
        }

        let adc_p: u32 = 415_148;
        let adc_t: u32 = 519_888;
        let data = [
            (adc_p >> 12) as u8,
            (adc_p >> 4) as u8,
            (adc_p << 4) as u8,
            (adc_t >> 12) as u8,
            (adc_t >> 4) as u8,
            (adc_t << 4) as u8,
            0,
            0,
        ];
        let bus = MockBus::new()
            .with(0xD0, &[0x60])
            .with(0x88, &trimming)
            .with(0xF7, &data);
        Bme280::begin(bus, 10.0).unwrap()
    }

    #[test]
    fn test_v2_climate_from_one_burst() {
        let mut board = BoardV2::new(light(), climate());

        let (t, _h, p) = board.read_climate().unwrap();
        let bursts = board
            .climate
            .bus()
            .writes
            .iter()
            .filter(|w| **w == [0xF7])
            .count();
        assert_eq!(bursts, 1);
        assert!((t - 25.08).abs() < 1e-9, "got {t}");
        assert!((p - 1016.5325).abs() < 0.01, "got {p}");
    }

    #[test]
    fn test_v1_averages_temperature() {
        let humidity = Si702x::begin(MockBus::new().with(0xE3, &[0x80, 0x00])).unwrap();

        let mut calibration = Vec::new();
        for word in [408i16, -72, -14383] {
            calibration.extend_from_slice(&word.to_be_bytes());
        }
        for word in [32741u16, 32757, 23153] {
            calibration.extend_from_slice(&word.to_be_bytes());
        }
        for word in [6190i16, 4, -32768, -8711, 2868] {
            calibration.extend_from_slice(&word.to_be_bytes());
        }
        let bus = MockBus::new()
            .with(0xD0, &[0x55])
            .with(0xAA, &calibration)
            .with(0xF6, &27898u16.to_be_bytes());
        let barometer = Bmp180::begin(bus, Default::default()).unwrap();
        let mut board = BoardV1::new(light(), humidity, barometer);

        assert_eq!(board.variant(), BoardVariant::V1);
        // 15.0 from the BMP180 and 41.01 from the Si7020.
        let t = board.read_temperature().unwrap();
        assert!((t - 28.005).abs() < 1e-6, "got {t}");
    }

    #[test]
    fn test_detect_missing_bus() {
        assert!(detect("/nonexistent/i2c-7", BoardOptions::default()).is_err());
    }
}
