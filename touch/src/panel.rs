//! The touch query API shared by every backend.
//!
//! A `TouchPanel` owns one [`TouchSource`], a touch state machine per channel and the active
//! calibration matrix. Every query first catches up on watchdog ticks delivered through
//! [`TouchSignals`], then polls the source once.

use embedded_hal::delay::DelayNs;

use crate::calibration::CalibrationMatrix;
use crate::error::Error;
use crate::idle::{self, IdleAction, IdleHandler, IdleReason};
use crate::signals::{Cursor, TouchSignals};
use crate::source::{Gesture, Report, TouchSource};
use crate::state::TouchStateMachine;
use crate::{
    DisplayPoint, RawSample, TouchCode, TouchConfig, TouchRecord, MAX_CHANNELS, TICK_PERIOD_US,
};

pub struct TouchPanel<'a, S, D> {
    source: S,
    delay: D,
    signals: &'a TouchSignals,
    ticks: Cursor,
    /// Channel 0 follows the filtered source reports, the others the per-slot contacts
    states: [TouchStateMachine; MAX_CHANNELS],
    matrix: CalibrationMatrix,
    /// Most recent coordinate from the source, reused while a batch is pending
    last_raw: RawSample,
    records: [TouchRecord; MAX_CHANNELS],
    idle: Option<&'a mut dyn IdleHandler>,
    config: TouchConfig,
}

impl<'a, S, D> TouchPanel<'a, S, D>
where
    S: TouchSource,
    D: DelayNs,
{
    pub fn new(source: S, delay: D, signals: &'a TouchSignals, config: TouchConfig) -> Self {
        Self {
            source,
            delay,
            signals,
            ticks: Cursor::new(signals.ticks()),
            states: [TouchStateMachine::new(config.release_timeout_us); MAX_CHANNELS],
            matrix: CalibrationMatrix::UNCALIBRATED,
            last_raw: RawSample::default(),
            records: [TouchRecord::idle(); MAX_CHANNELS],
            idle: None,
            config,
        }
    }

    /// Configure the touch hardware and start from idle
    pub fn init(&mut self) -> Result<(), Error<S::Error>> {
        self.source.init(&mut self.idle).map_err(Error::Bus)?;
        self.ticks = Cursor::new(self.signals.ticks());
        self.states.iter_mut().for_each(TouchStateMachine::reset);
        self.records = [TouchRecord::idle(); MAX_CHANNELS];
        Ok(())
    }

    /// Install the callback run on every iteration of a blocking wait
    pub fn attach_idle_handler(&mut self, handler: &'a mut dyn IdleHandler) {
        self.idle = Some(handler);
    }

    pub fn detach_idle_handler(&mut self) {
        self.idle = None;
    }

    pub fn channels(&self) -> usize {
        self.source.channels()
    }

    pub fn config(&self) -> &TouchConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn release(self) -> (S, D) {
        (self.source, self.delay)
    }

    /// Apply watchdog ticks delivered since the last query
    fn service(&mut self) {
        let n = self.ticks.take(self.signals.ticks());
        if n == 0 {
            return;
        }
        if self.states[0].tick(n.saturating_mul(TICK_PERIOD_US)) {
            self.source.restart();
        }
    }

    /// Read one unfiltered sample, bypassing the filter and the state machine.
    ///
    /// Returns `Touch` with the new sample, or `NoTouch` with the last known one.
    pub fn a2d_raw(&mut self) -> Result<(TouchCode, RawSample), Error<S::Error>> {
        self.service();
        match self.source.read_raw().map_err(Error::Bus)? {
            Some(raw) => {
                self.last_raw = raw;
                Ok((TouchCode::Touch, raw))
            }
            None => Ok((TouchCode::NoTouch, self.last_raw)),
        }
    }

    /// Advance the state machine by one poll and return its code with the latest uncalibrated
    /// coordinate.
    ///
    /// While a resistive batch is still filling, the previous batch's coordinate is repeated with
    /// `Held`. Calibration is not consulted, so this never reports `NoCal`.
    pub fn a2d_filtered(&mut self) -> Result<(TouchCode, RawSample), Error<S::Error>> {
        self.service();
        let report = self.source.poll().map_err(Error::Bus)?;
        if let Report::Contact(raw) = report {
            self.last_raw = raw;
        }
        let code = self.states[0].advance(report);
        Ok((code, self.last_raw))
    }

    /// Map a source coordinate to the screen
    fn to_display(&self, raw: RawSample) -> Option<DisplayPoint> {
        match self.matrix.transform(raw) {
            Some(p) => Some(p),
            None if !self.source.requires_calibration() => Some(DisplayPoint::new(
                raw.x.min(i16::MAX as u16) as i16,
                raw.y.min(i16::MAX as u16) as i16,
            )),
            None => None,
        }
    }

    fn uncalibrated(&self) -> bool {
        self.source.requires_calibration() && !self.matrix.is_calibrated()
    }

    /// Poll once and refresh every channel record.
    ///
    /// Unlike [`readable`](Self::readable) this reports every state, including `Held`, so it
    /// suits drag tracking.
    pub fn poll(&mut self) -> Result<TouchRecord, Error<S::Error>> {
        let (code, raw) = self.a2d_filtered()?;

        let id = self.source.contact(0).map(|c| c.id).unwrap_or(0);
        let point = match code {
            TouchCode::NoTouch => None,
            _ => self.to_display(raw),
        };
        let uncalibrated = self.uncalibrated();

        let primary = &mut self.records[0];
        primary.id = id;
        if uncalibrated {
            primary.code = TouchCode::NoCal;
        } else {
            primary.code = code;
            if let Some(p) = point {
                primary.point = p;
            }
        }

        let count = self.source.touch_count() as usize;
        for ch in 1..self.source.channels().min(MAX_CHANNELS) {
            let contact = self.source.contact(ch).unwrap_or_default();
            let report = if ch < count && contact.code.is_active() {
                Report::Contact(contact.raw)
            } else {
                Report::Lifted
            };
            let code = self.states[ch].advance(report);
            let point = match report {
                Report::Contact(raw) => self.to_display(raw),
                _ => None,
            };

            let record = &mut self.records[ch];
            if code != TouchCode::NoTouch {
                record.id = contact.id;
            }
            record.code = if uncalibrated { TouchCode::NoCal } else { code };
            if let Some(p) = point {
                record.point = p;
            }
        }

        if code.is_edge() {
            log::debug!("touch {:?} at {:?}", self.records[0].code, self.records[0].point);
        }
        Ok(self.records[0])
    }

    /// Non-blocking query for a touch edge.
    ///
    /// Returns `NoTouch` unless a `Touch` or `Release` happened since the previous call; the
    /// point is only present with an edge. Without a calibration matrix every call returns
    /// `NoCal` and no point.
    pub fn readable(&mut self) -> Result<(TouchCode, Option<DisplayPoint>), Error<S::Error>> {
        let record = self.poll()?;
        Ok(match record.code {
            TouchCode::NoCal => (TouchCode::NoCal, None),
            code if code.is_edge() => (code, Some(record.point)),
            _ => (TouchCode::NoTouch, None),
        })
    }

    /// Block until [`readable`](Self::readable) reports something other than `NoTouch`.
    ///
    /// The idle handler runs between polls with [`IdleReason::TouchWait`]; returning abort ends
    /// the wait with [`Error::ExternalAbort`].
    pub fn get(&mut self) -> Result<(TouchCode, Option<DisplayPoint>), Error<S::Error>> {
        loop {
            let result = self.readable()?;
            if result.0 != TouchCode::NoTouch {
                return Ok(result);
            }
            if self.run_idle(IdleReason::TouchWait) == IdleAction::Abort {
                return Err(Error::ExternalAbort);
            }
            self.sleep_ms(self.config.poll_interval_ms);
        }
    }

    /// Contacts currently on the panel
    pub fn touch_count(&self) -> u8 {
        self.source.touch_count()
    }

    pub fn record(&self, ch: usize) -> Option<TouchRecord> {
        if ch < self.channels() {
            self.records.get(ch).copied()
        } else {
            None
        }
    }

    pub fn touch_id(&self, ch: usize) -> Option<u8> {
        self.record(ch).map(|r| r.id)
    }

    pub fn touch_code(&self, ch: usize) -> Option<TouchCode> {
        self.record(ch).map(|r| r.code)
    }

    /// Last known point of channel `ch`, or `None` while the panel still needs calibrating
    pub fn coordinates(&self, ch: usize) -> Option<DisplayPoint> {
        self.record(ch)
            .filter(|r| r.code != TouchCode::NoCal)
            .map(|r| r.point)
    }

    pub fn gesture(&self) -> Gesture {
        self.source.gesture()
    }

    pub fn matrix(&self) -> CalibrationMatrix {
        self.matrix
    }

    /// Install a previously computed or persisted matrix
    pub fn set_matrix(&mut self, matrix: CalibrationMatrix) -> Result<(), Error<S::Error>> {
        if !matrix.is_calibrated() {
            return Err(Error::BadParameter);
        }
        self.matrix = matrix;
        self.states.iter_mut().for_each(TouchStateMachine::reset);
        Ok(())
    }

    /// Solve a matrix from three anchor pairs and install it.
    ///
    /// On failure the active matrix is left unchanged.
    pub fn compute_calibration(
        &mut self,
        display: &[DisplayPoint; 3],
        raw: &[RawSample; 3],
    ) -> Result<CalibrationMatrix, Error<S::Error>> {
        let matrix = CalibrationMatrix::compute(display, raw).map_err(|e| {
            log::warn!("calibration rejected: {:?}", e);
            Error::BadParameter
        })?;
        self.set_matrix(matrix)?;
        log::info!("touch calibration installed: {:?}", matrix);
        Ok(matrix)
    }

    pub(crate) fn sleep_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    pub(crate) fn run_idle(&mut self, reason: IdleReason) -> IdleAction {
        idle::run(&mut self.idle, reason)
    }
}
