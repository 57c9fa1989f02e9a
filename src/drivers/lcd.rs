//! HD44780 character LCD behind a PCF8574 I²C backpack.
//!
//! The expander drives the controller in 4-bit mode:
//!
//! | PCF8574 bit | LCD pin   |
//! |-------------|-----------|
//! | P0          | RS        |
//! | P1          | RW (tied) |
//! | P2          | EN        |
//! | P3          | Backlight |
//! | P4–P7       | D4–D7     |

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::error::DisplayError;

pub const LCD_COLS: usize = 20;
pub const LCD_ROWS: usize = 4;
pub const DEFAULT_ADDRESS: u8 = 0x27;

const ROW_OFFSETS: [u8; LCD_ROWS] = [0x00, 0x40, 0x14, 0x54];

const RS: u8 = 0x01;
const EN: u8 = 0x04;
const BACKLIGHT: u8 = 0x08;

const CMD_CLEAR: u8 = 0x01;
const CMD_ENTRY_MODE: u8 = 0x06; // increment, no shift
const CMD_DISPLAY_ON: u8 = 0x0C; // display on, cursor off, blink off
const CMD_FUNCTION_SET: u8 = 0x28; // 4-bit, 2 lines, 5x8
const CMD_SET_DDRAM: u8 = 0x80;

/// Row-oriented character display.  Rows are always rewritten in full.
pub trait LcdBackend {
    fn init(&mut self) -> Result<(), DisplayError>;
    fn clear(&mut self) -> Result<(), DisplayError>;
    /// Write `text` at column 0 of `row`, space-padded to the full width.
    fn write_line(&mut self, row: usize, text: &str) -> Result<(), DisplayError>;
    fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError>;
}

pub struct Pcf8574Lcd<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    backlight: u8,
}

impl<I2C: I2c, D: DelayNs> Pcf8574Lcd<I2C, D> {
    pub fn new(i2c: I2C, delay: D, address: u8) -> Self {
        Self {
            i2c,
            delay,
            address,
            backlight: BACKLIGHT,
        }
    }

    fn expander_write(&mut self, data: u8) -> Result<(), DisplayError> {
        self.i2c
            .write(self.address, &[data | self.backlight])
            .map_err(|_| DisplayError::BusWriteFailed)
    }

    fn write_nibble(&mut self, data: u8) -> Result<(), DisplayError> {
        self.expander_write(data | EN)?;
        self.delay.delay_us(1);
        self.expander_write(data & !EN)?;
        self.delay.delay_us(50);
        Ok(())
    }

    fn send(&mut self, value: u8, mode: u8) -> Result<(), DisplayError> {
        self.write_nibble((value & 0xF0) | mode)?;
        self.write_nibble(((value << 4) & 0xF0) | mode)
    }

    fn command(&mut self, value: u8) -> Result<(), DisplayError> {
        self.send(value, 0)
    }

    fn set_cursor(&mut self, col: u8, row: usize) -> Result<(), DisplayError> {
        let offset = ROW_OFFSETS[row.min(LCD_ROWS - 1)];
        self.command(CMD_SET_DDRAM | (col + offset))
    }
}

impl<I2C: I2c, D: DelayNs> LcdBackend for Pcf8574Lcd<I2C, D> {
    fn init(&mut self) -> Result<(), DisplayError> {
        self.delay.delay_ms(50);
        self.expander_write(0)?;
        self.delay.delay_ms(1);

        // Three 8-bit function sets, then drop to 4-bit.
        for wait_us in [4_500, 4_500, 150] {
            self.write_nibble(0x30)?;
            self.delay.delay_us(wait_us);
        }
        self.write_nibble(0x20)?;

        self.command(CMD_FUNCTION_SET)?;
        self.command(CMD_DISPLAY_ON)?;
        self.clear()?;
        self.command(CMD_ENTRY_MODE)
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.command(CMD_CLEAR)?;
        self.delay.delay_ms(2);
        Ok(())
    }

    fn write_line(&mut self, row: usize, text: &str) -> Result<(), DisplayError> {
        self.set_cursor(0, row)?;
        let mut chars = text.chars();
        for _ in 0..LCD_COLS {
            let byte = match chars.next() {
                Some(c) if c.is_ascii() && !c.is_ascii_control() => c as u8,
                Some(_) => b'?',
                None => b' ',
            };
            self.send(byte, RS)?;
        }
        Ok(())
    }

    fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError> {
        self.backlight = if on { BACKLIGHT } else { 0 };
        self.expander_write(0)
    }
}
