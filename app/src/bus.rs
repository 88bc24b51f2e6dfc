//! Glue between the HAL's embedded-hal 0.2 peripherals and the 1.0 traits the touch driver uses.

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{self, ErrorKind, Operation, SpiDevice};
use embedded_hal_02::blocking::spi::{Transfer, Write};
use embedded_hal_02::digital::v2::OutputPin;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    Spi,
    ChipSelect,
}

impl spi::Error for BusError {
    fn kind(&self) -> ErrorKind {
        match self {
            BusError::Spi => ErrorKind::Other,
            BusError::ChipSelect => ErrorKind::ChipSelectFault,
        }
    }
}

/// An exclusive SPI bus plus its chip select, presented as one device
pub struct ExclusiveSpi<SPI, CS> {
    spi: SPI,
    cs: CS,
    sysclk_hz: u32,
}

impl<SPI, CS> ExclusiveSpi<SPI, CS> {
    pub fn new(spi: SPI, cs: CS, sysclk_hz: u32) -> Self {
        Self { spi, cs, sysclk_hz }
    }
}

impl<SPI, CS> spi::ErrorType for ExclusiveSpi<SPI, CS> {
    type Error = BusError;
}

impl<SPI, CS, E> SpiDevice for ExclusiveSpi<SPI, CS>
where
    SPI: Write<u8, Error = E> + Transfer<u8, Error = E>,
    CS: OutputPin,
{
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), BusError> {
        self.cs.set_low().map_err(|_| BusError::ChipSelect)?;

        let mut result = Ok(());
        for op in operations.iter_mut() {
            result = match op {
                Operation::Write(data) => self.spi.write(data).map_err(|_| BusError::Spi),
                Operation::Read(buf) => {
                    buf.fill(0);
                    self.spi.transfer(buf).map(|_| ()).map_err(|_| BusError::Spi)
                }
                Operation::Transfer(read, write) => {
                    let n = read.len().min(write.len());
                    read[..n].copy_from_slice(&write[..n]);
                    self.spi.transfer(read).map(|_| ()).map_err(|_| BusError::Spi)
                }
                Operation::TransferInPlace(buf) => {
                    self.spi.transfer(buf).map(|_| ()).map_err(|_| BusError::Spi)
                }
                Operation::DelayNs(ns) => {
                    CycleDelay::new(self.sysclk_hz).delay_ns(*ns);
                    Ok(())
                }
            };
            if result.is_err() {
                break;
            }
        }

        // Always release the bus, even after a failed transfer
        self.cs.set_high().map_err(|_| BusError::ChipSelect)?;
        result
    }
}

/// Busy-wait delay counted in core clock cycles
#[derive(Clone, Copy)]
pub struct CycleDelay {
    sysclk_hz: u32,
}

impl CycleDelay {
    pub const fn new(sysclk_hz: u32) -> Self {
        Self { sysclk_hz }
    }
}

impl DelayNs for CycleDelay {
    fn delay_ns(&mut self, ns: u32) {
        let cycles = ns as u64 * self.sysclk_hz as u64 / 1_000_000_000;
        cortex_m::asm::delay(cycles.min(u32::MAX as u64) as u32);
    }

    fn delay_us(&mut self, us: u32) {
        let cycles = us as u64 * self.sysclk_hz as u64 / 1_000_000;
        cortex_m::asm::delay(cycles.min(u32::MAX as u64) as u32);
    }

    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            self.delay_us(1_000);
        }
    }
}
