#![no_main]
#![no_std]

use cortex_m;
use cortex_m_rt::{entry, exception};
use panic_halt as _;

use stm32f0xx_hal as hal;

use ra8875_touch::calibration::{CalibrationMatrix, MATRIX_BYTES};
use ra8875_touch::idle::{IdleAction, IdleReason};
use ra8875_touch::port::Ra8875Spi;
use ra8875_touch::resistive::{PolledResistive, DEFAULT_RESISTIVE_CONFIG};
use ra8875_touch::signals::TouchSignals;
use ra8875_touch::{TouchCode, TouchPanel, DEFAULT_TOUCH_CONFIG};

use crate::hal::pac;
use crate::hal::pac::interrupt;
use crate::hal::prelude::*;

mod bus;
mod serial;

const SYSCLK_HZ: u32 = 48_000_000;

/// Factory calibration for a 480x272 panel, in the persisted layout. Roughly x = 15/32 raw,
/// y = 17/64 raw.
static FACTORY_CALIBRATION: [u8; MATRIX_BYTES] = [
    30, 0, 0, 0, // a
    0, 0, 0, 0, // b
    0, 0, 0, 0, // c
    0, 0, 0, 0, // d
    17, 0, 0, 0, // e
    0, 0, 0, 0, // f
    64, 0, 0, 0, // divider
];

static SIGNALS: TouchSignals = TouchSignals::new();

#[entry]
fn main() -> ! {
    let dp = pac::Peripherals::take().unwrap();
    let cp = cortex_m::Peripherals::take().unwrap();

    let mut flash = dp.FLASH;
    let mut rcc = dp.RCC.configure().sysclk(48.mhz()).freeze(&mut flash);
    let gpioa = dp.GPIOA.split(&mut rcc);
    let gpiob = dp.GPIOB.split(&mut rcc);

    // A library requiring a critical section to set a gpio AF register is bad and I just won't.
    let fake_cs = unsafe { cortex_m::interrupt::CriticalSection::new() };

    let tx_pin = gpiob.pb6.into_alternate_af0(&fake_cs);
    let rx_pin = gpiob.pb7.into_alternate_af0(&fake_cs);
    let uart = hal::serial::Serial::usart1(dp.USART1, (tx_pin, rx_pin), 115200.bps(), &mut rcc);
    serial::uart1::init(uart, 4, log::LevelFilter::Debug);

    // RA8875 on SPI1
    let sck = gpioa.pa5.into_alternate_af0(&fake_cs);
    let miso = gpioa.pa6.into_alternate_af0(&fake_cs);
    let mosi = gpioa.pa7.into_alternate_af0(&fake_cs);
    let mut cs = gpioa.pa4.into_push_pull_output(&fake_cs);
    cs.set_high().ok();
    let spi = hal::spi::Spi::spi1(
        dp.SPI1,
        (sck, miso, mosi),
        embedded_hal_02::spi::MODE_3,
        4.mhz(),
        &mut rcc,
    );

    // Sleep between polls; SysTick wakes us every millisecond
    let mut idle = |_reason: IdleReason| {
        cortex_m::asm::wfi();
        IdleAction::Continue
    };

    let port = Ra8875Spi::new(
        bus::ExclusiveSpi::new(spi, cs, SYSCLK_HZ),
        bus::CycleDelay::new(SYSCLK_HZ),
    );
    let source: PolledResistive<_> = PolledResistive::new(port, DEFAULT_RESISTIVE_CONFIG);
    let mut panel = TouchPanel::new(
        source,
        bus::CycleDelay::new(SYSCLK_HZ),
        &SIGNALS,
        DEFAULT_TOUCH_CONFIG,
    );

    panel.attach_idle_handler(&mut idle);

    // The watchdog tick
    let mut syst = hal::timers::Timer::syst(cp.SYST, 1.khz(), &mut rcc);
    syst.listen(&hal::timers::Event::TimeOut);

    if let Err(e) = panel.init() {
        log::error!("touch init failed: {}", e);
    }
    if let Err(e) = panel.set_matrix(CalibrationMatrix::from_bytes(&FACTORY_CALIBRATION)) {
        log::error!("factory calibration rejected: {}", e);
    }
    log::info!("touch ready, {} channel(s)", panel.channels());

    loop {
        match panel.get() {
            Ok((TouchCode::NoCal, _)) => {
                log::warn!("touch panel not calibrated");
            }
            Ok((code, Some(point))) => {
                log::info!("{:?} at ({}, {})", code, point.x, point.y);
            }
            Ok((code, None)) => {
                log::debug!("{:?}", code);
            }
            Err(e) => {
                log::warn!("touch error: {}", e);
            }
        }
    }
}

#[exception]
fn SysTick() {
    SIGNALS.tick();
}
