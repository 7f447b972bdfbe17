//! The sensor capability consumed by the acquisition loop.

use crate::Result;

/// Reference sea-level pressure used for altitude estimates.
pub const SEA_LEVEL_HPA: f64 = 1024.25;

/// Hardware revision of the weather board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardVariant {
    /// Si1132 + Si7020 + BMP180.
    V1,
    /// Si1132 + BME280.
    V2,
}

impl BoardVariant {
    /// Names of the chips providing temperature, humidity and pressure.
    pub fn climate_chips(&self) -> &'static str {
        match self {
            BoardVariant::V1 => "bmp180/si7020",
            BoardVariant::V2 => "bme280",
        }
    }
}

impl std::fmt::Display for BoardVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoardVariant::V1 => write!(f, "weather board 1"),
            BoardVariant::V2 => write!(f, "weather board 2"),
        }
    }
}

/// Typed readings from a weather board.
///
/// All values are physical units: UV index, lux, °C, %RH and hPa. Each
/// quantity is read independently so a single failing channel does not
/// spoil the others.
pub trait SensorSource: Send {
    /// Returns the detected board revision.
    fn variant(&self) -> BoardVariant;

    /// UV index.
    fn read_uv_index(&mut self) -> Result<f64>;

    /// Visible light in lux.
    fn read_visible(&mut self) -> Result<f64>;

    /// Infrared light in lux.
    fn read_ir(&mut self) -> Result<f64>;

    /// Temperature in °C.
    fn read_temperature(&mut self) -> Result<f64>;

    /// Relative humidity in %.
    fn read_humidity(&mut self) -> Result<f64>;

    /// Barometric pressure in hPa.
    fn read_pressure(&mut self) -> Result<f64>;

    /// Reads `(uv_index, visible_lux, ir_lux)` in one call.
    fn read_light(&mut self) -> Result<(f64, f64, f64)> {
        Ok((self.read_uv_index()?, self.read_visible()?, self.read_ir()?))
    }

    /// Reads `(temperature_c, humidity_pct, pressure_hpa)` in one call.
    ///
    /// Boards with a combined climate chip take all three from a single
    /// conversion.
    fn read_climate(&mut self) -> Result<(f64, f64, f64)> {
        Ok((
            self.read_temperature()?,
            self.read_humidity()?,
            self.read_pressure()?,
        ))
    }

    /// Altitude in metres relative to `reference_hpa`.
    fn read_altitude(&mut self, reference_hpa: f64) -> Result<f64> {
        Ok(altitude_m(self.read_pressure()?, reference_hpa))
    }
}

/// Barometric altitude estimate in metres.
pub fn altitude_m(pressure_hpa: f64, reference_hpa: f64) -> f64 {
    44330.0 * (1.0 - (pressure_hpa / reference_hpa).powf(0.1903))
}
