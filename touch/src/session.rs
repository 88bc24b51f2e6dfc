//! Interactive three point calibration.
//!
//! The session draws a crosshair at each target, waits for the user to press it, records the
//! filtered raw sample and waits for the press to end before moving on. Targets sit near the
//! top-left, right-middle and bottom-centre of the draw target:
//!
//! ```text
//! +--------------------------------+
//! |  1                             |
//! |                                |
//! |                              2 |
//! |                                |
//! |               3                |
//! +--------------------------------+
//! ```
//!
//! Time is measured by summing the sleeps between polls, so the budget holds even without a
//! wall clock.

use core::fmt::Write;

use embedded_graphics::draw_target::DrawTarget;
use embedded_graphics::geometry::Point;
use embedded_graphics::mono_font::{ascii::FONT_6X10, MonoTextStyle};
use embedded_graphics::pixelcolor::RgbColor;
use embedded_graphics::primitives::{Line, Primitive, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};
use embedded_graphics::Drawable;
use embedded_hal::delay::DelayNs;
use heapless::String;

use crate::calibration::{saturate, CalibrationMatrix};
use crate::error::Error;
use crate::idle::{IdleAction, IdleReason};
use crate::panel::TouchPanel;
use crate::source::TouchSource;
use crate::{DisplayPoint, RawSample, TouchCode};

pub const DEFAULT_MAX_WAIT_S: u32 = 15;

/// Distance of the targets from the display edges
const TARGET_INSET: i64 = 50;
const LINE_HEIGHT: i32 = 10;

pub struct CalibrationSession<'m> {
    message: Option<&'m str>,
    max_wait_s: u32,
    install: bool,
}

impl<'m> Default for CalibrationSession<'m> {
    fn default() -> Self {
        Self::new()
    }
}

/// Time spent waiting, against the session budget
struct Budget {
    elapsed_ms: u32,
    limit_ms: u32,
}

impl Budget {
    fn expired(&self) -> bool {
        self.elapsed_ms >= self.limit_ms
    }
}

impl<'m> CalibrationSession<'m> {
    pub fn new() -> Self {
        Self {
            message: None,
            max_wait_s: DEFAULT_MAX_WAIT_S,
            install: true,
        }
    }

    /// Text shown at the top of the screen during calibration
    pub fn message(mut self, message: &'m str) -> Self {
        self.message = Some(message);
        self
    }

    /// Budget for the whole session, in seconds
    pub fn max_wait_s(mut self, seconds: u32) -> Self {
        self.max_wait_s = seconds;
        self
    }

    /// Whether a successful result replaces the panel's active matrix
    pub fn install(mut self, install: bool) -> Self {
        self.install = install;
        self
    }

    /// Target positions for a draw area
    pub fn targets(area: &Rectangle) -> [DisplayPoint; 3] {
        let origin = area.top_left;
        let (w, h) = (area.size.width as i64, area.size.height as i64);
        let at = |x: i64, y: i64| {
            DisplayPoint::new(
                saturate(origin.x as i64 + x),
                saturate(origin.y as i64 + y),
            )
        };
        [
            at(TARGET_INSET, TARGET_INSET),
            at(w - TARGET_INSET, h / 2),
            at(w / 2, h - TARGET_INSET),
        ]
    }

    /// Run the session on `canvas`.
    ///
    /// Fails with [`Error::CalibrationTimeout`] when the budget runs out and
    /// [`Error::ExternalAbort`] when the idle handler aborts. In both cases the panel keeps
    /// whatever matrix it had.
    pub fn run<S, D, C>(
        &self,
        panel: &mut TouchPanel<'_, S, D>,
        canvas: &mut C,
    ) -> Result<CalibrationMatrix, Error<S::Error>>
    where
        S: TouchSource,
        D: DelayNs,
        C: DrawTarget,
        C::Color: RgbColor,
    {
        let mut budget = Budget {
            elapsed_ms: 0,
            limit_ms: self.max_wait_s.saturating_mul(1_000),
        };

        // A press still in progress must not become the first sample
        wait_for(panel, &mut budget, |code| code == TouchCode::NoTouch)?;

        canvas.clear(C::Color::BLACK).map_err(|_| Error::Draw)?;
        if let Some(message) = self.message {
            let style = MonoTextStyle::new(&FONT_6X10, C::Color::WHITE);
            Text::with_baseline(message, Point::zero(), style, Baseline::Top)
                .draw(canvas)
                .map_err(|_| Error::Draw)?;
        }

        let area = canvas.bounding_box();
        let targets = Self::targets(&area);
        let arm = panel.config().crosshair_size;
        let label_style = MonoTextStyle::new(&FONT_6X10, C::Color::BLUE);
        let mut cursor = area.top_left + Point::new(0, area.size.height as i32 / 2);
        let mut samples = [RawSample::default(); 3];

        for (i, target) in targets.iter().enumerate() {
            if i > 0 {
                settle(panel, &mut budget)?;
            }

            let mut text: String<32> = String::new();
            let _ = write!(text, " ({:3},{:3}) => ", target.x, target.y);
            let next = Text::with_baseline(&text, cursor, label_style, Baseline::Top)
                .draw(canvas)
                .map_err(|_| Error::Draw)?;

            crosshair(canvas, (*target).into(), arm, C::Color::WHITE).map_err(|_| Error::Draw)?;
            samples[i] = wait_for(panel, &mut budget, |code| code.is_active())?;
            crosshair(canvas, (*target).into(), arm, C::Color::BLACK).map_err(|_| Error::Draw)?;

            text.clear();
            let _ = write!(text, " ({:4},{:4})", samples[i].x, samples[i].y);
            Text::with_baseline(&text, next, label_style, Baseline::Top)
                .draw(canvas)
                .map_err(|_| Error::Draw)?;
            cursor.y += LINE_HEIGHT;
            log::debug!("calibration target {:?} sampled at {:?}", target, samples[i]);

            // One press must not satisfy two targets
            wait_for(panel, &mut budget, |code| code == TouchCode::NoTouch)?;
        }

        if self.install {
            panel.compute_calibration(&targets, &samples)
        } else {
            CalibrationMatrix::compute(&targets, &samples).map_err(|_| Error::BadParameter)
        }
    }
}

/// Poll until `done` accepts the touch state, returning the raw coordinate that satisfied it
fn wait_for<S, D, F>(
    panel: &mut TouchPanel<'_, S, D>,
    budget: &mut Budget,
    done: F,
) -> Result<RawSample, Error<S::Error>>
where
    S: TouchSource,
    D: DelayNs,
    F: Fn(TouchCode) -> bool,
{
    loop {
        let (code, raw) = panel.a2d_filtered()?;
        if done(code) {
            return Ok(raw);
        }
        pause(panel, budget)?;
    }
}

/// Idle for the settle period between targets
fn settle<S, D>(
    panel: &mut TouchPanel<'_, S, D>,
    budget: &mut Budget,
) -> Result<(), Error<S::Error>>
where
    S: TouchSource,
    D: DelayNs,
{
    let interval = panel.config().poll_interval_ms.max(1);
    for _ in 0..panel.config().calibration_settle_ms / interval {
        pause(panel, budget)?;
    }
    Ok(())
}

/// One wait iteration: check the budget, sleep, then give the idle handler its turn
fn pause<S, D>(
    panel: &mut TouchPanel<'_, S, D>,
    budget: &mut Budget,
) -> Result<(), Error<S::Error>>
where
    S: TouchSource,
    D: DelayNs,
{
    if budget.expired() {
        log::warn!("touch calibration timed out after {} ms", budget.elapsed_ms);
        return Err(Error::CalibrationTimeout);
    }
    let interval = panel.config().poll_interval_ms;
    panel.sleep_ms(interval);
    budget.elapsed_ms = budget.elapsed_ms.saturating_add(interval);
    if panel.run_idle(IdleReason::TouchCalWait) == IdleAction::Abort {
        return Err(Error::ExternalAbort);
    }
    Ok(())
}

fn crosshair<C>(canvas: &mut C, center: Point, arm: i32, color: C::Color) -> Result<(), C::Error>
where
    C: DrawTarget,
{
    let style = PrimitiveStyle::with_stroke(color, 1);
    Line::new(center - Point::new(arm, 0), center + Point::new(arm, 0))
        .into_styled(style)
        .draw(canvas)?;
    Line::new(center - Point::new(0, arm), center + Point::new(0, arm))
        .into_styled(style)
        .draw(canvas)?;
    Ok(())
}
