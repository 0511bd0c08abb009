//! HD44780 character LCD behind a PCF8574 I2C backpack.
//!
//! The backpack maps its eight output pins to the LCD control lines and the
//! upper data nibble, so every byte is sent as two 4-bit transfers, each
//! latched by pulsing the enable pin.

use std::thread;
use std::time::Duration;

use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;
use tracing::info;

use crate::{HardwareError, Result, traits::DisplayDevice};

const PIN_RS: u8 = 0x01;
const PIN_EN: u8 = 0x04;
const PIN_BACKLIGHT: u8 = 0x08;

const CMD_CLEAR: u8 = 0x01;
const CMD_ENTRY_MODE_INCREMENT: u8 = 0x06;
const CMD_DISPLAY_ON: u8 = 0x0C;
const CMD_FUNCTION_4BIT_2LINE: u8 = 0x28;
const CMD_SET_DDRAM: u8 = 0x80;

/// DDRAM start address of each row.
const ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

/// Character LCD on `/dev/i2c-{bus}`.
pub struct Hd44780Lcd {
    device: LinuxI2CDevice,
    columns: usize,
    rows: usize,
}

impl std::fmt::Debug for Hd44780Lcd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hd44780Lcd")
            .field("columns", &self.columns)
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}

impl Hd44780Lcd {
    /// Open the bus device and run the 4-bit initialization sequence.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::OpenFailed`] if the bus cannot be
    /// opened or the controller does not acknowledge.
    pub fn open(bus: u8, address: u16, columns: usize, rows: usize) -> Result<Self> {
        if rows == 0 || rows > ROW_OFFSETS.len() {
            return Err(HardwareError::invalid_config(format!(
                "unsupported row count {rows}"
            )));
        }

        let path = format!("/dev/i2c-{bus}");
        let device = LinuxI2CDevice::new(&path, address).map_err(|e| {
            HardwareError::open_failed(format!("{path} @ {address:#04x}: {e}"))
        })?;

        let mut lcd = Self {
            device,
            columns,
            rows,
        };
        lcd.initialize()
            .map_err(|e| HardwareError::open_failed(e.to_string()))?;

        info!(bus, address = %format!("{address:#04x}"), columns, rows, "LCD initialized");
        Ok(lcd)
    }

    fn initialize(&mut self) -> Result<()> {
        thread::sleep(Duration::from_millis(50));
        // Force 8-bit mode three times, then switch to 4-bit.
        for _ in 0..3 {
            self.write_nibble(0x30, 0)?;
            thread::sleep(Duration::from_millis(5));
        }
        self.write_nibble(0x20, 0)?;

        self.command(CMD_FUNCTION_4BIT_2LINE)?;
        self.command(CMD_DISPLAY_ON)?;
        self.command(CMD_CLEAR)?;
        thread::sleep(Duration::from_millis(2));
        self.command(CMD_ENTRY_MODE_INCREMENT)
    }

    fn command(&mut self, byte: u8) -> Result<()> {
        self.write_byte(byte, 0)
    }

    fn write_byte(&mut self, byte: u8, mode: u8) -> Result<()> {
        self.write_nibble(byte & 0xF0, mode)?;
        self.write_nibble((byte << 4) & 0xF0, mode)
    }

    fn write_nibble(&mut self, nibble: u8, mode: u8) -> Result<()> {
        let data = nibble | mode | PIN_BACKLIGHT;
        self.bus_write(data)?;
        self.bus_write(data | PIN_EN)?;
        thread::sleep(Duration::from_micros(1));
        self.bus_write(data & !PIN_EN)?;
        thread::sleep(Duration::from_micros(50));
        Ok(())
    }

    fn bus_write(&mut self, value: u8) -> Result<()> {
        self.device
            .smbus_write_byte(value)
            .map_err(|e| HardwareError::display_write(e.to_string()))
    }
}

impl DisplayDevice for Hd44780Lcd {
    fn columns(&self) -> usize {
        self.columns
    }

    fn rows(&self) -> usize {
        self.rows
    }

    fn clear(&mut self) -> Result<()> {
        self.command(CMD_CLEAR)?;
        thread::sleep(Duration::from_millis(2));
        Ok(())
    }

    fn write_line(&mut self, row: usize, text: &str) -> Result<()> {
        let offset = ROW_OFFSETS
            .get(row)
            .filter(|_| row < self.rows)
            .ok_or_else(|| HardwareError::invalid_config(format!("row {row} out of range")))?;
        self.command(CMD_SET_DDRAM | offset)?;

        let mut written = 0;
        for c in text.chars().take(self.columns) {
            let byte = if c.is_ascii() && !c.is_ascii_control() {
                c as u8
            } else {
                b'?'
            };
            self.write_byte(byte, PIN_RS)?;
            written += 1;
        }
        for _ in written..self.columns {
            self.write_byte(b' ', PIN_RS)?;
        }
        Ok(())
    }
}
