//! Resistive touch panel on the RA8875's built-in 10-bit touch ADC.
//!
//! The controller converts a sample whenever the panel is pressed and latches it in
//! TPXH/TPYH/TPXYL, setting the touch flag in INTC2. Nothing else tells us the panel was
//! released: the flag just stops being set, and the panel's watchdog turns that silence into a
//! release.

use crate::filter::NoiseFilter;
use crate::idle::IdleHandler;
use crate::port::RegisterPort;
use crate::regs::ra8875::*;
use crate::source::{Contact, Report, TouchSource};
use crate::{RawSample, FILTER_DEPTH};

/// ADC sample time, in system clocks (TPCR0[6:4])
#[derive(Clone, Copy, Debug)]
pub enum AdcSampleTime {
    Clk512 = 0b000,
    Clk1024 = 0b001,
    Clk2048 = 0b010,
    Clk4096 = 0b011,
    Clk8192 = 0b100,
    Clk16384 = 0b101,
    Clk32768 = 0b110,
    Clk65536 = 0b111,
}

/// ADC clock, as a division of the system clock (TPCR0[2:0])
#[derive(Clone, Copy, Debug)]
pub enum AdcClockDivider {
    SysClk = 0b000,
    Div2 = 0b001,
    Div4 = 0b010,
    Div8 = 0b011,
    Div16 = 0b100,
    Div32 = 0b101,
    Div64 = 0b110,
    Div128 = 0b111,
}

/// TPCR1[6]
#[derive(Clone, Copy, Debug)]
pub enum DetectMode {
    /// The controller samples both axes on its own
    Auto = 0,
    /// Sampling is sequenced through `ManualMode`
    Manual = 1,
}

/// TPCR1[1:0], only meaningful in manual mode
#[derive(Clone, Copy, Debug)]
pub enum ManualMode {
    Idle = 0b00,
    WaitEvent = 0b01,
    LatchX = 0b10,
    LatchY = 0b11,
}

#[derive(Clone, Copy, Debug)]
pub struct ResistiveConfig {
    pub enabled: bool,
    pub sample_time: AdcSampleTime,
    pub clock_divider: AdcClockDivider,
    pub mode: DetectMode,
    pub debounce: bool,
    pub manual_mode: ManualMode,
}

impl ResistiveConfig {
    const fn default() -> Self {
        Self {
            enabled: true,
            sample_time: AdcSampleTime::Clk8192,
            clock_divider: AdcClockDivider::Div8,
            mode: DetectMode::Auto,
            debounce: true,
            manual_mode: ManualMode::Idle,
        }
    }

    pub fn tpcr0(&self) -> u8 {
        let enable = if self.enabled { TP_ENABLE } else { 0 };
        enable | (self.sample_time as u8) << 4 | self.clock_divider as u8
    }

    pub fn tpcr1(&self) -> u8 {
        let debounce = if self.debounce { 1 << 2 } else { 0 };
        (self.mode as u8) << 6 | debounce | self.manual_mode as u8
    }
}

pub const DEFAULT_RESISTIVE_CONFIG: ResistiveConfig = ResistiveConfig::default();

/// Polled resistive backend. `N` is the filter batch size.
pub struct PolledResistive<P, const N: usize = FILTER_DEPTH> {
    port: P,
    filter: NoiseFilter<N>,
    config: ResistiveConfig,
    /// A filtered coordinate was produced since the last restart
    active: bool,
}

impl<P, const N: usize> PolledResistive<P, N>
where
    P: RegisterPort,
{
    pub fn new(port: P, config: ResistiveConfig) -> Self {
        Self {
            port,
            filter: NoiseFilter::new(),
            config,
            active: false,
        }
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn release(self) -> P {
        self.port
    }

    /// Read and acknowledge the latched sample, if the touch flag is set
    fn take_sample(&mut self) -> Result<Option<RawSample>, P::Error> {
        if self.port.read_register(INTC2)? & INT_TP == 0 {
            return Ok(None);
        }

        let xh = self.port.read_register(TPXH)? as u16;
        let yh = self.port.read_register(TPYH)? as u16;
        let xyl = self.port.read_register(TPXYL)? as u16;
        // Write-one-to-clear, or the next poll sees the same sample again
        self.port.write_register(INTC2, INT_TP)?;

        Ok(Some(RawSample::new(
            xh << 2 | (xyl & 0x3),
            yh << 2 | (xyl & 0xC) >> 2,
        )))
    }
}

impl<P, const N: usize> TouchSource for PolledResistive<P, N>
where
    P: RegisterPort,
{
    type Error = P::Error;

    fn channels(&self) -> usize {
        1
    }

    fn requires_calibration(&self) -> bool {
        true
    }

    fn init(&mut self, idle: &mut Option<&mut dyn IdleHandler>) -> Result<(), Self::Error> {
        self.port.wait_while_busy(STATUS_BUSY, idle)?;
        self.port.write_register(TPCR0, self.config.tpcr0())?;
        self.port.write_register(TPCR1, self.config.tpcr1())?;

        let intc1 = self.port.read_register(INTC1)?;
        self.port.write_register(INTC1, intc1 | INT_TP)?;
        self.port.write_register(INTC2, INT_TP)?;

        self.filter.reset();
        self.active = false;
        log::debug!(
            "resistive touch enabled, TPCR0={:#04x} TPCR1={:#04x}",
            self.config.tpcr0(),
            self.config.tpcr1()
        );
        Ok(())
    }

    fn poll(&mut self) -> Result<Report, Self::Error> {
        let sample = match self.take_sample()? {
            Some(s) => s,
            None => return Ok(Report::Nothing),
        };

        Ok(match self.filter.push(sample) {
            Some(filtered) => {
                self.active = true;
                Report::Contact(filtered)
            }
            None => Report::Pending,
        })
    }

    fn read_raw(&mut self) -> Result<Option<RawSample>, Self::Error> {
        self.take_sample()
    }

    fn restart(&mut self) {
        if self.filter.pending() != 0 {
            log::trace!("dropping {} buffered touch samples", self.filter.pending());
        }
        self.filter.reset();
        self.active = false;
    }

    fn contact(&self, _ch: usize) -> Option<Contact> {
        None
    }

    fn touch_count(&self) -> u8 {
        self.active as u8
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::mock::MockPort;

    fn new_source(port: MockPort) -> PolledResistive<MockPort, 4> {
        PolledResistive::new(port, DEFAULT_RESISTIVE_CONFIG)
    }

    #[test]
    fn test_default_register_values() {
        assert_eq!(DEFAULT_RESISTIVE_CONFIG.tpcr0(), 0xC3);
        assert_eq!(DEFAULT_RESISTIVE_CONFIG.tpcr1(), 0x04);

        let manual = ResistiveConfig {
            mode: DetectMode::Manual,
            debounce: false,
            manual_mode: ManualMode::LatchY,
            ..DEFAULT_RESISTIVE_CONFIG
        };
        assert_eq!(manual.tpcr1(), 0x43);
    }

    #[test]
    fn test_init_sequence() {
        let mut port = MockPort::new();
        port.regs[INTC1 as usize] = 0x01;
        let mut source = new_source(port);

        let mut idle = None;
        source.init(&mut idle).unwrap();

        let port = source.release();
        assert_eq!(
            port.written,
            vec![(TPCR0, 0xC3), (TPCR1, 0x04), (INTC1, 0x05), (INTC2, INT_TP)]
        );
    }

    #[test]
    fn test_raw_decode_and_flag_clear() {
        let mut port = MockPort::new();
        port.script.push_back(Some(RawSample::new(0x3FF, 0x155)));
        let mut source = new_source(port);

        assert_eq!(source.read_raw(), Ok(Some(RawSample::new(0x3FF, 0x155))));
        // The flag was acknowledged, so the same sample is not seen twice
        assert_eq!(source.read_raw(), Ok(None));
        assert_eq!(source.port_mut().written, vec![(INTC2, INT_TP)]);
    }

    #[test]
    fn test_poll_batches_through_filter() {
        let mut port = MockPort::new();
        for x in [100, 900, 110, 120] {
            port.script.push_back(Some(RawSample::new(x, 200)));
        }
        let mut source = new_source(port);

        assert_eq!(source.touch_count(), 0);
        assert_eq!(source.poll(), Ok(Report::Pending));
        assert_eq!(source.poll(), Ok(Report::Pending));
        assert_eq!(source.poll(), Ok(Report::Pending));
        assert_eq!(
            source.poll(),
            Ok(Report::Contact(RawSample::new(115, 200)))
        );
        assert_eq!(source.touch_count(), 1);
        assert_eq!(source.poll(), Ok(Report::Nothing));
    }

    #[test]
    fn test_restart_drops_partial_batch() {
        let mut port = MockPort::new();
        for _ in 0..2 {
            port.script.push_back(Some(RawSample::new(1000, 1000)));
        }
        for _ in 0..4 {
            port.script.push_back(Some(RawSample::new(10, 20)));
        }
        let mut source = new_source(port);

        source.poll().unwrap();
        source.poll().unwrap();
        source.restart();

        for _ in 0..3 {
            assert_eq!(source.poll(), Ok(Report::Pending));
        }
        assert_eq!(source.poll(), Ok(Report::Contact(RawSample::new(10, 20))));
    }
}
