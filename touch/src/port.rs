//! Register access port for the RA8875.
//!
//! The controller is driven over a 4-wire serial bus. Every transfer starts with a prefix byte
//! that selects command/status (RS=1) or data (RS=0) and write or read:
//!
//! - command write: `0x80, reg`
//! - data write:    `0x00, value`
//! - data read:     `0x40`, then one byte is clocked back
//! - status read:   `0xC0`, then one byte is clocked back
//!
//! Reading a register is a command write followed by a data read.

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{Operation, SpiDevice};

use crate::idle::{self, IdleAction, IdleHandler, IdleReason};
use crate::regs::ra8875::{CMD_WRITE, DATA_READ, DATA_WRITE, STATUS_READ};

/// Longest the busy flag may stay set
const BUSY_TIMEOUT_US: u32 = 20_000;
const BUSY_POLL_US: u32 = 10;

/// Synchronous access to the controller's 8-bit registers
pub trait RegisterPort {
    type Error;

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Self::Error>;

    fn read_register(&mut self, reg: u8) -> Result<u8, Self::Error>;

    /// Block while any bit of `mask` is set in the status register.
    ///
    /// Ports without a status register are never busy.
    fn wait_while_busy(
        &mut self,
        _mask: u8,
        _idle: &mut Option<&mut dyn IdleHandler>,
    ) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortError<E> {
    Spi(E),
    /// The busy flag did not clear within 20 ms
    Busy,
    /// The idle handler aborted a busy wait
    Aborted,
}

/// RA8875 register port on an SPI device
pub struct Ra8875Spi<SPI, D> {
    spi: SPI,
    delay: D,
}

impl<SPI, D> Ra8875Spi<SPI, D>
where
    SPI: SpiDevice,
    D: DelayNs,
{
    pub fn new(spi: SPI, delay: D) -> Self {
        Self { spi, delay }
    }

    pub fn release(self) -> (SPI, D) {
        (self.spi, self.delay)
    }

    fn select_register(&mut self, reg: u8) -> Result<(), PortError<SPI::Error>> {
        self.spi.write(&[CMD_WRITE, reg]).map_err(PortError::Spi)
    }

    fn read_data(&mut self) -> Result<u8, PortError<SPI::Error>> {
        let mut buf = [0u8; 1];
        self.spi
            .transaction(&mut [Operation::Write(&[DATA_READ]), Operation::Read(&mut buf)])
            .map_err(PortError::Spi)?;
        Ok(buf[0])
    }

    /// Block while any bit of `mask` is set in register `reg`, for commands that report
    /// completion through their own register rather than the status register
    pub fn wait_while_register(
        &mut self,
        reg: u8,
        mask: u8,
        idle: &mut Option<&mut dyn IdleHandler>,
    ) -> Result<(), PortError<SPI::Error>> {
        let mut remaining = BUSY_TIMEOUT_US / BUSY_POLL_US;
        while self.read_register(reg)? & mask != 0 {
            if remaining == 0 {
                log::warn!("ra8875 register {:#04x} busy bits {:#04x} stuck", reg, mask);
                return Err(PortError::Busy);
            }
            remaining -= 1;
            self.delay.delay_us(BUSY_POLL_US);
            if idle::run(idle, IdleReason::CommandWait) == IdleAction::Abort {
                return Err(PortError::Aborted);
            }
        }
        Ok(())
    }

    pub fn read_status(&mut self) -> Result<u8, PortError<SPI::Error>> {
        let mut buf = [0u8; 1];
        self.spi
            .transaction(&mut [Operation::Write(&[STATUS_READ]), Operation::Read(&mut buf)])
            .map_err(PortError::Spi)?;
        Ok(buf[0])
    }
}

impl<SPI, D> RegisterPort for Ra8875Spi<SPI, D>
where
    SPI: SpiDevice,
    D: DelayNs,
{
    type Error = PortError<SPI::Error>;

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Self::Error> {
        // Command and data go out under one chip select
        self.spi
            .write(&[CMD_WRITE, reg, DATA_WRITE, value])
            .map_err(PortError::Spi)
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, Self::Error> {
        self.select_register(reg)?;
        self.read_data()
    }

    fn wait_while_busy(
        &mut self,
        mask: u8,
        idle: &mut Option<&mut dyn IdleHandler>,
    ) -> Result<(), Self::Error> {
        let mut remaining = BUSY_TIMEOUT_US / BUSY_POLL_US;
        while self.read_status()? & mask != 0 {
            if remaining == 0 {
                log::warn!("ra8875 busy flag {:#04x} stuck", mask);
                return Err(PortError::Busy);
            }
            remaining -= 1;
            self.delay.delay_us(BUSY_POLL_US);
            if idle::run(idle, IdleReason::StatusWait) == IdleAction::Abort {
                return Err(PortError::Aborted);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::mock::{MockDelay, MockSpi};

    #[test]
    fn test_register_framing() {
        let mut spi = MockSpi::new();
        spi.reads.push_back(0x5A);
        let mut port = Ra8875Spi::new(spi, MockDelay::new());

        port.write_register(0x70, 0xB3).unwrap();
        assert_eq!(port.read_register(0x74).unwrap(), 0x5A);

        let (spi, _) = port.release();
        assert_eq!(
            spi.written,
            vec![vec![0x80, 0x70, 0x00, 0xB3], vec![0x80, 0x74], vec![0x40]]
        );
    }

    #[test]
    fn test_busy_flag_times_out() {
        let mut spi = MockSpi::new();
        spi.default_read = 0x80;
        let mut port = Ra8875Spi::new(spi, MockDelay::new());

        let mut idle = None;
        assert_eq!(port.wait_while_busy(0x80, &mut idle), Err(PortError::Busy));

        let (_, delay) = port.release();
        assert_eq!(delay.elapsed_us(), BUSY_TIMEOUT_US as u64);
    }

    #[test]
    fn test_busy_wait_abort() {
        let mut spi = MockSpi::new();
        spi.default_read = 0x80;
        let mut port = Ra8875Spi::new(spi, MockDelay::new());

        let mut handler = |reason: IdleReason| {
            assert_eq!(reason, IdleReason::StatusWait);
            IdleAction::Abort
        };
        let mut idle: Option<&mut dyn IdleHandler> = Some(&mut handler);
        assert_eq!(port.wait_while_busy(0x80, &mut idle), Err(PortError::Aborted));
    }

    #[test]
    fn test_command_register_wait() {
        let mut spi = MockSpi::new();
        spi.reads.extend([0x80, 0x80, 0x00]);
        let mut port = Ra8875Spi::new(spi, MockDelay::new());

        let mut reasons = Vec::new();
        let mut handler = |reason: IdleReason| {
            reasons.push(reason);
            IdleAction::Continue
        };
        let mut idle: Option<&mut dyn IdleHandler> = Some(&mut handler);
        assert_eq!(port.wait_while_register(0x70, 0x80, &mut idle), Ok(()));
        assert_eq!(reasons, vec![IdleReason::CommandWait, IdleReason::CommandWait]);
    }

    #[test]
    fn test_not_busy() {
        let mut spi = MockSpi::new();
        spi.reads.push_back(0x80);
        spi.reads.push_back(0x00);
        let mut port = Ra8875Spi::new(spi, MockDelay::new());

        let mut idle = None;
        assert_eq!(port.wait_while_busy(0x80, &mut idle), Ok(()));
    }
}
