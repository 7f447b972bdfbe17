//! Samples: one consistent snapshot of every reading.

use chrono::{DateTime, Local};
use weather_board_hw::altitude_m;

/// Acquisition instant with the string renderings used by the outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp(DateTime<Local>);

impl Timestamp {
    pub fn new(at: DateTime<Local>) -> Self {
        Self(at)
    }

    /// Abridged date, e.g. "18.Oct".
    pub fn date(&self) -> String {
        self.0.format("%-d.%b").to_string()
    }

    /// Time of day, e.g. "14:03:22".
    pub fn time(&self) -> String {
        self.0.format("%H:%M:%S").to_string()
    }

    /// Fully qualified date-time, e.g. "Sun.Oct.18-14:03:22.481".
    pub fn datetime(&self) -> String {
        self.0.format("%a.%b.%-d-%H:%M:%S%.3f").to_string()
    }
}

/// Raw physical readings from one acquisition cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Readings {
    pub uv_index: f64,
    pub visible_lux: f64,
    pub ir_lux: f64,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub pressure_hpa: f64,
}

/// A fully populated sample including derived values.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp: Timestamp,
    pub uv_index: f64,
    pub visible_lux: f64,
    pub ir_lux: f64,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub pressure_hpa: f64,
    pub dew_point_c: f64,
    pub altitude_m: f64,
}

impl Sample {
    /// Builds a sample, deriving dew point and altitude from `readings`.
    pub fn new(timestamp: Timestamp, readings: Readings, sea_level_hpa: f64) -> Self {
        Self {
            timestamp,
            uv_index: readings.uv_index,
            visible_lux: readings.visible_lux,
            ir_lux: readings.ir_lux,
            temperature_c: readings.temperature_c,
            humidity_pct: readings.humidity_pct,
            pressure_hpa: readings.pressure_hpa,
            dew_point_c: dew_point(readings.temperature_c, readings.humidity_pct),
            altitude_m: altitude_m(readings.pressure_hpa, sea_level_hpa),
        }
    }

    /// Single-line rendering shared by the logfile, stdout and pipe outputs.
    pub fn log_line(&self) -> String {
        format!(
            "{}  uvi: {:4.2}  vis: {:6.2} lux  ir: {:6.2} lux  t: {:6.2} C  humidity: {:4.2} %  dew point {:6.2} C  pressure: {:6.2} hpa",
            self.timestamp.datetime(),
            self.uv_index,
            self.visible_lux,
            self.ir_lux,
            self.temperature_c,
            self.humidity_pct,
            self.dew_point_c,
            self.pressure_hpa,
        )
    }
}

/// Dew point approximation (Lawrence 2005).
pub fn dew_point(temperature_c: f64, humidity_pct: f64) -> f64 {
    temperature_c - ((100.0 - humidity_pct) / 5.0)
}
