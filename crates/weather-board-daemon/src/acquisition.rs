//! Sensor acquisition with last-known-value fallback.

use chrono::{DateTime, Local};
use tracing::{debug, warn};
use weather_board_hw::SensorSource;

use crate::sample::{Readings, Sample, Timestamp};

/// Reads every channel once per cycle and assembles a complete Sample.
pub struct Acquirer {
    source: Box<dyn SensorSource>,
    last: Readings,
    sea_level_hpa: f64,
}

impl Acquirer {
    pub fn new(source: Box<dyn SensorSource>, sea_level_hpa: f64) -> Self {
        Self {
            source,
            last: Readings::default(),
            sea_level_hpa,
        }
    }

    /// Acquires a Sample stamped with `at`.
    ///
    /// A failing channel keeps its previous value (0.0 before the first
    /// successful read) so that the Sample is always fully populated.
    /// Temperature, humidity and pressure come from one climate read and
    /// fall back together.
    pub fn acquire(&mut self, at: DateTime<Local>) -> Sample {
        let last = self.last;
        let source = &mut self.source;
        let (temperature_c, humidity_pct, pressure_hpa) = match source.read_climate() {
            Ok(climate) => climate,
            Err(e) => {
                warn!(
                    "Failed to read climate sensors ({}), reusing {:.2} C, {:.2} %, {:.2} hPa",
                    e, last.temperature_c, last.humidity_pct, last.pressure_hpa
                );
                (last.temperature_c, last.humidity_pct, last.pressure_hpa)
            }
        };
        let readings = Readings {
            uv_index: fallback("uv index", source.read_uv_index(), last.uv_index),
            visible_lux: fallback("visible light", source.read_visible(), last.visible_lux),
            ir_lux: fallback("ir light", source.read_ir(), last.ir_lux),
            temperature_c,
            humidity_pct,
            pressure_hpa,
        };
        self.last = readings;

        let sample = Sample::new(Timestamp::new(at), readings, self.sea_level_hpa);
        debug!("Acquired {}", sample.log_line());
        sample
    }
}

fn fallback(channel: &str, result: weather_board_hw::Result<f64>, last: f64) -> f64 {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to read {} ({}), reusing {:.2}", channel, e, last);
            last
        }
    }
}
