//! Linux I2C bus access through `/dev/i2c-*` character devices.

use crate::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::io::AsRawFd;
use tracing::debug;

/// `ioctl` request selecting the slave address for subsequent transfers.
const I2C_SLAVE: u64 = 0x0703;

/// Register-level access to a single chip on the bus.
pub trait I2cBus: Send {
    /// Writes raw bytes to the chip.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Reads exactly `buf.len()` bytes from the chip.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<()>;

    /// Selects `reg` then reads `buf.len()` consecutive bytes.
    fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> io::Result<()> {
        self.write(&[reg])?;
        self.read(buf)
    }

    /// Reads a single register.
    fn read_u8(&mut self, reg: u8) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.read_registers(reg, &mut buf)?;
        Ok(buf[0])
    }

    /// Writes a single register.
    fn write_u8(&mut self, reg: u8, value: u8) -> io::Result<()> {
        self.write(&[reg, value])
    }
}

/// A chip behind a Linux i2c-dev node.
pub struct I2cDevice {
    file: File,
    path: String,
    address: u16,
}

impl I2cDevice {
    /// Opens the bus node and binds it to `address`.
    pub fn open(path: &str, address: u16) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| Error::BusOpen {
                path: path.to_string(),
                source,
            })?;

        // SAFETY: the descriptor is owned by `file` and stays open for the call.
        let status =
            unsafe { libc::ioctl(file.as_raw_fd(), I2C_SLAVE as _, address as libc::c_ulong) };
        if status < 0 {
            return Err(Error::AddressSelect {
                path: path.to_string(),
                address,
                source: io::Error::last_os_error(),
            });
        }

        debug!("Opened {} at address 0x{:02X}", path, address);

        Ok(Self {
            file,
            path: path.to_string(),
            address,
        })
    }

    /// Returns the bus node path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the bound slave address.
    pub fn address(&self) -> u16 {
        self.address
    }
}

impl I2cBus for I2cDevice {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.file.write_all(bytes)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.file.read_exact(buf)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::I2cBus;
    use std::io;

    /// Register-file stand-in for a chip with an auto-incrementing pointer.
    pub(crate) struct MockBus {
        registers: [u8; 256],
        pointer: u8,
        failing: bool,
        pub(crate) writes: Vec<Vec<u8>>,
    }

    impl MockBus {
        pub(crate) fn new() -> Self {
            Self {
                registers: [0; 256],
                pointer: 0,
                failing: false,
                writes: Vec::new(),
            }
        }

        /// Presets consecutive registers starting at `reg`.
        pub(crate) fn with(mut self, reg: u8, bytes: &[u8]) -> Self {
            for (i, b) in bytes.iter().enumerate() {
                self.registers[reg as usize + i] = *b;
            }
            self
        }

        pub(crate) fn set_failing(&mut self, failing: bool) {
            self.failing = failing;
        }
    }

    impl I2cBus for MockBus {
        fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
            if self.failing {
                return Err(io::Error::new(io::ErrorKind::Other, "bus nack"));
            }
            self.writes.push(bytes.to_vec());
            if let Some((&reg, values)) = bytes.split_first() {
                self.pointer = reg;
                for (i, v) in values.iter().enumerate() {
                    self.registers[reg.wrapping_add(i as u8) as usize] = *v;
                }
            }
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> io::Result<()> {
            if self.failing {
                return Err(io::Error::new(io::ErrorKind::Other, "bus nack"));
            }
            for b in buf.iter_mut() {
                *b = self.registers[self.pointer as usize];
                self.pointer = self.pointer.wrapping_add(1);
            }
            Ok(())
        }
    }
}
