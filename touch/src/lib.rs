//! Touch pipeline for RA8875 based displays.
//!
//! Two interchangeable backends feed one query API:
//!
//! - [`resistive::PolledResistive`]: the RA8875's own 10-bit touch ADC, read over the register
//!   port and smoothed by a trimmed-mean [`filter::NoiseFilter`].
//! - [`capacitive::InterruptCapacitive`]: an FT5206 controller on the I2C side channel, serviced
//!   when its interrupt line fires.
//!
//! Both are driven through [`panel::TouchPanel`], which runs the touch state machine, applies the
//! affine [`calibration::CalibrationMatrix`] and exposes the `readable`/`get` style queries. The
//! interrupt and timer contexts never touch the panel directly; they only bump the counters in
//! [`signals::TouchSignals`].
#![cfg_attr(not(test), no_std)]

pub mod calibration;
pub mod capacitive;
pub mod error;
pub mod filter;
pub mod idle;
pub mod panel;
pub mod port;
pub mod regs;
pub mod resistive;
pub mod session;
pub mod signals;
pub mod source;
pub mod state;

#[cfg(test)]
mod mock;

pub use calibration::CalibrationMatrix;
pub use error::Error;
pub use panel::TouchPanel;

/// Most contacts any backend tracks at once (FT5206 hardware limit)
pub const MAX_CHANNELS: usize = 5;

/// Period of the watchdog tick the application is expected to deliver
pub const TICK_PERIOD_US: u32 = 1_000;

/// Depth of the resistive averaging buffers
pub const FILTER_DEPTH: usize = 16;

/// Touch activity reported by every query
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchCode {
    /// No contact
    NoTouch,
    /// A new contact was detected
    Touch,
    /// The contact persists
    Held,
    /// The contact was lifted
    Release,
    /// No calibration matrix is installed, so no coordinate can be reported
    NoCal,
}

impl TouchCode {
    /// True for the two codes that mark a contact edge
    pub fn is_edge(&self) -> bool {
        matches!(self, TouchCode::Touch | TouchCode::Release)
    }

    /// True while a finger is on the panel
    pub fn is_active(&self) -> bool {
        matches!(self, TouchCode::Touch | TouchCode::Held)
    }
}

/// Uncalibrated transducer reading
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawSample {
    pub x: u16,
    pub y: u16,
}

impl RawSample {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// Location in screen pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DisplayPoint {
    pub x: i16,
    pub y: i16,
}

impl DisplayPoint {
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }
}

impl From<DisplayPoint> for embedded_graphics::geometry::Point {
    fn from(p: DisplayPoint) -> Self {
        embedded_graphics::geometry::Point::new(p.x as i32, p.y as i32)
    }
}

/// The state of one logical touch channel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TouchRecord {
    /// Tracking id, stable for the lifetime of one contact
    pub id: u8,
    pub code: TouchCode,
    pub point: DisplayPoint,
}

impl TouchRecord {
    pub const fn idle() -> Self {
        Self {
            id: 0,
            code: TouchCode::NoTouch,
            point: DisplayPoint::new(0, 0),
        }
    }
}

/// Configuration shared by all touch backends
#[derive(Clone, Copy, Debug)]
pub struct TouchConfig {
    /// A contact with no new sample for this long is forced through `Release` to `NoTouch`
    pub release_timeout_us: u32,
    /// Sleep between iterations of every blocking wait
    pub poll_interval_ms: u32,
    /// Pause between calibration targets, so one press cannot satisfy two of them
    pub calibration_settle_ms: u32,
    /// Half-length of the calibration crosshair arms, in pixels
    pub crosshair_size: i32,
}

impl TouchConfig {
    const fn default() -> Self {
        Self {
            release_timeout_us: 100_000,
            poll_interval_ms: 20,
            calibration_settle_ms: 2_000,
            crosshair_size: 10,
        }
    }
}

pub const DEFAULT_TOUCH_CONFIG: TouchConfig = TouchConfig::default();
