//! Test doubles shared by the daemon's unit tests.

use chrono::{DateTime, Local, NaiveDate, TimeDelta, TimeZone};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use weather_board_hw::{BoardVariant, Error, Result, SensorSource};

use crate::clock::Clock;

/// 2026-10-18 12:00:00 local time.
pub fn noon() -> DateTime<Local> {
    let naive = NaiveDate::from_ymd_opt(2026, 10, 18)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    Local.from_local_datetime(&naive).unwrap()
}

/// Sensor source with fixed readings and a switchable pressure fault.
pub struct FakeSource {
    fail_pressure: Arc<AtomicBool>,
    climate_reads: Arc<AtomicUsize>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            fail_pressure: Arc::new(AtomicBool::new(false)),
            climate_reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn pressure_failures(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.fail_pressure)
    }

    pub fn climate_reads(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.climate_reads)
    }
}

impl SensorSource for FakeSource {
    fn variant(&self) -> BoardVariant {
        BoardVariant::V2
    }

    fn read_uv_index(&mut self) -> Result<f64> {
        Ok(3.5)
    }

    fn read_visible(&mut self) -> Result<f64> {
        Ok(145.0)
    }

    fn read_ir(&mut self) -> Result<f64> {
        Ok(14.5)
    }

    fn read_temperature(&mut self) -> Result<f64> {
        Ok(21.5)
    }

    fn read_humidity(&mut self) -> Result<f64> {
        Ok(50.0)
    }

    fn read_pressure(&mut self) -> Result<f64> {
        if self.fail_pressure.load(Ordering::SeqCst) {
            return Err(Error::Io(io::Error::new(io::ErrorKind::TimedOut, "bus timeout")));
        }
        Ok(1013.25)
    }

    fn read_climate(&mut self) -> Result<(f64, f64, f64)> {
        self.climate_reads.fetch_add(1, Ordering::SeqCst);
        Ok((
            self.read_temperature()?,
            self.read_humidity()?,
            self.read_pressure()?,
        ))
    }
}

/// Clock that only moves when told to.
pub struct ManualClock(Mutex<DateTime<Local>>);

impl ManualClock {
    pub fn new(at: DateTime<Local>) -> Self {
        Self(Mutex::new(at))
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.0.lock().unwrap()
    }
}

/// Writer whose contents stay readable after being boxed into a sink.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
