//! Si1132 UV index and ambient light sensor.
//!
//! The chip runs in autonomous ALS mode; each read fetches the most recent
//! conversion from the result registers.

use crate::bus::{I2cBus, I2cDevice};
use crate::{Error, Result};
use std::thread::sleep;
use std::time::Duration;
use tracing::debug;

/// Fixed bus address.
pub const ADDRESS: u16 = 0x60;

/// Expected content of the PART_ID register.
const PART_ID: u8 = 0x32;

/// Dark offsets subtracted from the raw ADC counts.
const VISIBLE_DARK: f64 = 256.0;
const IR_DARK: f64 = 250.0;

/// Delay before fetching a conversion result.
const SETTLE: Duration = Duration::from_millis(10);

mod reg {
    pub const PART_ID: u8 = 0x00;
    pub const INTCFG: u8 = 0x03;
    pub const IRQEN: u8 = 0x04;
    pub const IRQMODE1: u8 = 0x05;
    pub const IRQMODE2: u8 = 0x06;
    pub const HWKEY: u8 = 0x07;
    pub const MEASRATE0: u8 = 0x08;
    pub const MEASRATE1: u8 = 0x09;
    pub const UCOEF0: u8 = 0x13;
    pub const UCOEF1: u8 = 0x14;
    pub const UCOEF2: u8 = 0x15;
    pub const UCOEF3: u8 = 0x16;
    pub const PARAMWR: u8 = 0x17;
    pub const COMMAND: u8 = 0x18;
    pub const IRQSTAT: u8 = 0x21;
    pub const ALS_VIS_DATA: u8 = 0x22;
    pub const ALS_IR_DATA: u8 = 0x24;
    pub const UV_INDEX: u8 = 0x2C;
}

mod param {
    pub const CHLIST: u8 = 0x01;
    pub const CHLIST_ENUV: u8 = 0x80;
    pub const CHLIST_ENALSIR: u8 = 0x20;
    pub const CHLIST_ENALSVIS: u8 = 0x10;
    pub const ALS_VIS_ADC_COUNTER: u8 = 0x10;
    pub const ALS_VIS_ADC_GAIN: u8 = 0x11;
    pub const ALS_VIS_ADC_MISC: u8 = 0x12;
    pub const ALS_IR_ADC_MUX: u8 = 0x0E;
    pub const ALS_IR_ADC_COUNTER: u8 = 0x1D;
    pub const ALS_IR_ADC_GAIN: u8 = 0x1E;
    pub const ALS_IR_ADC_MISC: u8 = 0x1F;
    pub const ADC_MUX_SMALL_IR: u8 = 0x00;
    pub const ADC_COUNTER_511CLK: u8 = 0x70;
    pub const ALS_IR_RANGE_HIGH: u8 = 0x20;
    pub const ALS_VIS_RANGE_HIGH: u8 = 0x20;
}

mod cmd {
    pub const RESET: u8 = 0x01;
    pub const ALS_AUTO: u8 = 0x0E;
    pub const PARAM_SET: u8 = 0xA0;
}

/// Si1132 light sensor.
pub struct Si1132<B = I2cDevice> {
    bus: B,
}

impl Si1132<I2cDevice> {
    /// Opens the sensor on the given bus node.
    pub fn open(path: &str) -> Result<Self> {
        Self::begin(I2cDevice::open(path, ADDRESS)?)
    }
}

impl<B: I2cBus> Si1132<B> {
    /// Verifies the part id and starts autonomous measurements.
    pub fn begin(mut bus: B) -> Result<Self> {
        let part_id = bus.read_u8(reg::PART_ID)?;
        if part_id != PART_ID {
            return Err(Error::IdentityMismatch {
                chip: "si1132",
                expected: PART_ID,
                actual: part_id,
            });
        }

        let mut sensor = Self { bus };
        sensor.reset()?;
        sensor.configure()?;
        debug!("Si1132 initialized");
        Ok(sensor)
    }

    fn reset(&mut self) -> Result<()> {
        for reg in [
            reg::MEASRATE0,
            reg::MEASRATE1,
            reg::IRQEN,
            reg::IRQMODE1,
            reg::IRQMODE2,
            reg::INTCFG,
        ] {
            self.bus.write_u8(reg, 0)?;
        }
        self.bus.write_u8(reg::IRQSTAT, 0xFF)?;

        self.bus.write_u8(reg::COMMAND, cmd::RESET)?;
        sleep(SETTLE);
        self.bus.write_u8(reg::HWKEY, 0x17)?;
        sleep(SETTLE);
        Ok(())
    }

    fn configure(&mut self) -> Result<()> {
        // UV index coefficients from the application note.
        self.bus.write_u8(reg::UCOEF0, 0x7B)?;
        self.bus.write_u8(reg::UCOEF1, 0x6B)?;
        self.bus.write_u8(reg::UCOEF2, 0x01)?;
        self.bus.write_u8(reg::UCOEF3, 0x00)?;

        self.write_param(
            param::CHLIST,
            param::CHLIST_ENUV | param::CHLIST_ENALSIR | param::CHLIST_ENALSVIS,
        )?;
        self.bus.write_u8(reg::INTCFG, 0x01)?;
        self.bus.write_u8(reg::IRQEN, 0x01)?;

        self.write_param(param::ALS_IR_ADC_MUX, param::ADC_MUX_SMALL_IR)?;
        sleep(SETTLE);
        self.write_param(param::ALS_IR_ADC_GAIN, 0)?;
        sleep(SETTLE);
        self.write_param(param::ALS_IR_ADC_COUNTER, param::ADC_COUNTER_511CLK)?;
        self.write_param(param::ALS_IR_ADC_MISC, param::ALS_IR_RANGE_HIGH)?;
        sleep(SETTLE);

        self.write_param(param::ALS_VIS_ADC_GAIN, 0)?;
        sleep(SETTLE);
        self.write_param(param::ALS_VIS_ADC_COUNTER, param::ADC_COUNTER_511CLK)?;
        self.write_param(param::ALS_VIS_ADC_MISC, param::ALS_VIS_RANGE_HIGH)?;
        sleep(SETTLE);

        self.bus.write_u8(reg::MEASRATE0, 0xFF)?;
        self.bus.write_u8(reg::COMMAND, cmd::ALS_AUTO)?;
        Ok(())
    }

    fn write_param(&mut self, param: u8, value: u8) -> Result<()> {
        self.bus.write_u8(reg::PARAMWR, value)?;
        self.bus.write_u8(reg::COMMAND, param | cmd::PARAM_SET)?;
        Ok(())
    }

    fn read_u16(&mut self, reg: u8) -> Result<u16> {
        sleep(SETTLE);
        let mut buf = [0u8; 2];
        self.bus.read_registers(reg, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Returns the UV index.
    pub fn read_uv_index(&mut self) -> Result<f64> {
        Ok(self.read_u16(reg::UV_INDEX)? as f64 / 100.0)
    }

    /// Returns visible light in lux.
    pub fn read_visible(&mut self) -> Result<f64> {
        let raw = self.read_u16(reg::ALS_VIS_DATA)?;
        Ok(visible_lux(raw))
    }

    /// Returns infrared light in lux.
    pub fn read_ir(&mut self) -> Result<f64> {
        let raw = self.read_u16(reg::ALS_IR_DATA)?;
        Ok(ir_lux(raw))
    }
}

fn visible_lux(raw: u16) -> f64 {
    ((raw as f64 - VISIBLE_DARK) / 0.282 * 14.5).max(0.0) / 100.0
}

fn ir_lux(raw: u16) -> f64 {
    ((raw as f64 - IR_DARK) / 2.44 * 14.5).max(0.0) / 100.0
}
