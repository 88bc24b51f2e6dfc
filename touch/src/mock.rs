//! Hand-rolled test doubles for the bus, timing and drawing collaborators.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::vec::Vec;

use embedded_graphics::pixelcolor::{Rgb565, RgbColor};
use embedded_graphics::prelude::{DrawTarget, OriginDimensions, Pixel, Size};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{self, I2c};
use embedded_hal::spi::{self, Operation, SpiDevice};

use crate::port::RegisterPort;
use crate::regs::ra8875::{INTC2, INT_TP, TPXH, TPXYL, TPYH};
use crate::signals::TouchSignals;
use crate::RawSample;

/// SPI device that records every written buffer and answers reads from a queue
pub struct MockSpi {
    pub reads: VecDeque<u8>,
    /// Returned once `reads` runs dry
    pub default_read: u8,
    pub written: Vec<Vec<u8>>,
}

impl MockSpi {
    pub fn new() -> Self {
        Self {
            reads: VecDeque::new(),
            default_read: 0,
            written: Vec::new(),
        }
    }
}

impl spi::ErrorType for MockSpi {
    type Error = Infallible;
}

impl SpiDevice for MockSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
        for op in operations.iter_mut() {
            match op {
                Operation::Write(data) => self.written.push(data.to_vec()),
                Operation::Read(buf) => {
                    for b in buf.iter_mut() {
                        *b = self.reads.pop_front().unwrap_or(self.default_read);
                    }
                }
                Operation::Transfer(read, write) => {
                    self.written.push(write.to_vec());
                    for b in read.iter_mut() {
                        *b = self.reads.pop_front().unwrap_or(self.default_read);
                    }
                }
                Operation::TransferInPlace(buf) => {
                    self.written.push(buf.to_vec());
                    for b in buf.iter_mut() {
                        *b = self.reads.pop_front().unwrap_or(self.default_read);
                    }
                }
                Operation::DelayNs(_) => {}
            }
        }
        Ok(())
    }
}

/// Delay that only counts, optionally advancing the watchdog tick as simulated time passes
pub struct MockDelay<'a> {
    elapsed_ns: u64,
    signals: Option<&'a TouchSignals>,
}

impl<'a> MockDelay<'a> {
    pub fn new() -> Self {
        Self {
            elapsed_ns: 0,
            signals: None,
        }
    }

    /// Call `signals.tick()` for every simulated millisecond
    pub fn ticking(signals: &'a TouchSignals) -> Self {
        Self {
            elapsed_ns: 0,
            signals: Some(signals),
        }
    }

    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_ns / 1_000
    }

    fn advance(&mut self, ns: u64) {
        let before = self.elapsed_ns / 1_000_000;
        self.elapsed_ns += ns;
        let after = self.elapsed_ns / 1_000_000;
        if let Some(signals) = self.signals {
            for _ in before..after {
                signals.tick();
            }
        }
    }
}

impl<'a> DelayNs for MockDelay<'a> {
    fn delay_ns(&mut self, ns: u32) {
        self.advance(ns as u64);
    }

    fn delay_us(&mut self, us: u32) {
        self.advance(us as u64 * 1_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance(ms as u64 * 1_000_000);
    }
}

/// RA8875 register file with a scripted touch ADC.
///
/// Each entry of `script` is one poll cycle: `Some(sample)` raises the touch flag until it is
/// acknowledged through INTC2, `None` is a cycle where the flag reads clear.
pub struct MockPort {
    pub regs: [u8; 256],
    pub script: VecDeque<Option<RawSample>>,
    pub written: Vec<(u8, u8)>,
}

impl MockPort {
    pub fn new() -> Self {
        Self {
            regs: [0; 256],
            script: VecDeque::new(),
            written: Vec::new(),
        }
    }

    /// Queue `count` cycles of the same sample
    pub fn press(&mut self, sample: RawSample, count: usize) {
        for _ in 0..count {
            self.script.push_back(Some(sample));
        }
    }

    /// Queue `count` cycles with the flag clear
    pub fn lift(&mut self, count: usize) {
        for _ in 0..count {
            self.script.push_back(None);
        }
    }

    fn current(&self) -> RawSample {
        match self.script.front() {
            Some(Some(s)) => *s,
            _ => RawSample::default(),
        }
    }
}

impl RegisterPort for MockPort {
    type Error = Infallible;

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Infallible> {
        self.written.push((reg, value));
        if reg == INTC2 && value & INT_TP != 0 {
            if let Some(Some(_)) = self.script.front() {
                self.script.pop_front();
            }
            return Ok(());
        }
        self.regs[reg as usize] = value;
        Ok(())
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, Infallible> {
        let s = self.current();
        Ok(match reg {
            INTC2 => match self.script.front() {
                Some(Some(_)) => INT_TP,
                Some(None) => {
                    self.script.pop_front();
                    0
                }
                None => 0,
            },
            TPXH => (s.x >> 2) as u8,
            TPYH => (s.y >> 2) as u8,
            TPXYL => ((s.x & 0x3) | (s.y & 0x3) << 2) as u8,
            _ => self.regs[reg as usize],
        })
    }
}

/// I2C target with a flat register image and an auto-incrementing register pointer
pub struct MockI2c {
    pub regs: [u8; 256],
    /// Register writes, one entry per write carrying data beyond the register pointer
    pub writes: Vec<(u8, Vec<u8>)>,
    /// Read operations performed
    pub reads: usize,
    pointer: usize,
}

impl MockI2c {
    pub fn new() -> Self {
        Self {
            regs: [0; 256],
            writes: Vec::new(),
            reads: 0,
            pointer: 0,
        }
    }
}

impl i2c::ErrorType for MockI2c {
    type Error = Infallible;
}

impl I2c for MockI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [i2c::Operation<'_>],
    ) -> Result<(), Infallible> {
        for op in operations.iter_mut() {
            match op {
                i2c::Operation::Write(data) => {
                    if let Some((reg, rest)) = data.split_first() {
                        self.pointer = *reg as usize;
                        if !rest.is_empty() {
                            self.writes.push((address, data.to_vec()));
                        }
                        for b in rest {
                            self.regs[self.pointer % 256] = *b;
                            self.pointer += 1;
                        }
                    }
                }
                i2c::Operation::Read(buf) => {
                    self.reads += 1;
                    for b in buf.iter_mut() {
                        *b = self.regs[self.pointer % 256];
                        self.pointer += 1;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Draw target that tallies pixels by colour
pub struct MockCanvas {
    pub size: Size,
    pub white: usize,
    pub black: usize,
    pub other: usize,
    /// Reject every draw call
    pub fail: bool,
}

impl MockCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Size::new(width, height),
            white: 0,
            black: 0,
            other: 0,
            fail: false,
        }
    }
}

impl OriginDimensions for MockCanvas {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for MockCanvas {
    type Color = Rgb565;
    type Error = ();

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), ()>
    where
        I: IntoIterator<Item = Pixel<Rgb565>>,
    {
        if self.fail {
            return Err(());
        }
        for Pixel(_, color) in pixels {
            if color == Rgb565::WHITE {
                self.white += 1;
            } else if color == Rgb565::BLACK {
                self.black += 1;
            } else {
                self.other += 1;
            }
        }
        Ok(())
    }
}
