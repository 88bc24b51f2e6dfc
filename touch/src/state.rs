use crate::source::Report;
use crate::TouchCode;

/// Touch state of one channel, plus the watchdog that recovers a contact that vanished without
/// a clean lift.
///
/// Every report from a touch source is fed to [`advance`](Self::advance), and the elapsed time
/// from the periodic timer to [`tick`](Self::tick). Within a channel the reported sequence is
/// always `Touch, Held*, Release, NoTouch`; no two edges collapse into one report.
#[derive(Clone, Copy, Debug)]
pub struct TouchStateMachine {
    code: TouchCode,
    /// A release was just surfaced; the next report is `NoTouch` whatever arrives
    settling: bool,
    /// Time since the last fresh sample
    elapsed_us: u32,
    timeout_us: u32,
}

impl TouchStateMachine {
    pub const fn new(timeout_us: u32) -> Self {
        Self {
            code: TouchCode::NoTouch,
            settling: false,
            elapsed_us: 0,
            timeout_us,
        }
    }

    pub fn code(&self) -> TouchCode {
        self.code
    }

    /// Forget any contact in progress
    pub fn reset(&mut self) {
        self.code = TouchCode::NoTouch;
        self.settling = false;
        self.elapsed_us = 0;
    }

    /// Process one report and return the code to surface for it
    pub fn advance(&mut self, report: Report) -> TouchCode {
        if !matches!(report, Report::Nothing) {
            self.elapsed_us = 0;
        }

        // A pending release is always reported on its own, then one idle cycle follows
        if self.code == TouchCode::Release {
            self.code = TouchCode::NoTouch;
            self.settling = true;
            return TouchCode::Release;
        }
        if self.settling {
            self.settling = false;
            return TouchCode::NoTouch;
        }

        self.code = match (self.code, report) {
            (TouchCode::Touch | TouchCode::Held, Report::Contact(_)) => TouchCode::Held,
            (_, Report::Contact(_)) => TouchCode::Touch,
            (TouchCode::Touch | TouchCode::Held, Report::Lifted) => TouchCode::Release,
            (TouchCode::Touch | TouchCode::Held, _) => TouchCode::Held,
            (code, _) => code,
        };

        let reported = self.code;
        if reported == TouchCode::Release {
            self.code = TouchCode::NoTouch;
            self.settling = true;
        }
        reported
    }

    /// Account for time passing with no fresh sample.
    ///
    /// Returns true when the watchdog fired, in which case any partially collected sample batch
    /// should be discarded.
    pub fn tick(&mut self, elapsed_us: u32) -> bool {
        self.elapsed_us = self.elapsed_us.saturating_add(elapsed_us);
        if self.elapsed_us < self.timeout_us {
            return false;
        }

        self.elapsed_us = 0;
        self.code = match self.code {
            TouchCode::Touch | TouchCode::Held => TouchCode::Release,
            _ => TouchCode::NoTouch,
        };
        log::trace!("touch watchdog expired, now {:?}", self.code);
        true
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::RawSample;

    const TIMEOUT: u32 = 100_000;
    const CONTACT: Report = Report::Contact(RawSample::new(500, 500));

    #[test]
    fn test_contact_held_lift() {
        let mut sm = TouchStateMachine::new(TIMEOUT);
        let mut codes = Vec::new();

        codes.push(sm.advance(CONTACT));
        for _ in 0..3 {
            codes.push(sm.advance(CONTACT));
        }
        codes.push(sm.advance(Report::Lifted));
        codes.push(sm.advance(Report::Nothing));
        codes.push(sm.advance(Report::Nothing));

        assert_eq!(
            codes,
            vec![
                TouchCode::Touch,
                TouchCode::Held,
                TouchCode::Held,
                TouchCode::Held,
                TouchCode::Release,
                TouchCode::NoTouch,
                TouchCode::NoTouch,
            ]
        );
    }

    #[test]
    fn test_held_repeats_without_new_data() {
        let mut sm = TouchStateMachine::new(TIMEOUT);
        assert_eq!(sm.advance(CONTACT), TouchCode::Touch);
        assert_eq!(sm.advance(Report::Nothing), TouchCode::Held);
        assert_eq!(sm.advance(Report::Pending), TouchCode::Held);
    }

    #[test]
    fn test_pending_does_not_start_touch() {
        let mut sm = TouchStateMachine::new(TIMEOUT);
        assert_eq!(sm.advance(Report::Pending), TouchCode::NoTouch);
        assert_eq!(sm.advance(Report::Lifted), TouchCode::NoTouch);
    }

    #[test]
    fn test_watchdog_releases_held_contact() {
        let mut sm = TouchStateMachine::new(TIMEOUT);
        sm.advance(CONTACT);
        sm.advance(CONTACT);

        for _ in 0..99 {
            assert!(!sm.tick(1_000));
        }
        assert_eq!(sm.code(), TouchCode::Held);
        assert!(sm.tick(1_000));
        assert_eq!(sm.code(), TouchCode::Release);

        // Reported once, with no further hardware activity
        assert_eq!(sm.advance(Report::Nothing), TouchCode::Release);
        assert_eq!(sm.advance(Report::Nothing), TouchCode::NoTouch);
    }

    #[test]
    fn test_watchdog_second_expiry_goes_idle() {
        let mut sm = TouchStateMachine::new(TIMEOUT);
        sm.advance(CONTACT);
        assert!(sm.tick(TIMEOUT));
        assert_eq!(sm.code(), TouchCode::Release);
        assert!(sm.tick(TIMEOUT));
        assert_eq!(sm.code(), TouchCode::NoTouch);
    }

    #[test]
    fn test_fresh_samples_hold_off_watchdog() {
        let mut sm = TouchStateMachine::new(TIMEOUT);
        sm.advance(CONTACT);
        for _ in 0..10 {
            assert!(!sm.tick(60_000));
            sm.advance(Report::Pending);
        }
        assert_eq!(sm.code(), TouchCode::Held);
    }

    #[test]
    fn test_release_never_merges_with_new_touch() {
        let mut sm = TouchStateMachine::new(TIMEOUT);
        sm.advance(CONTACT);
        sm.tick(TIMEOUT);

        assert_eq!(sm.advance(CONTACT), TouchCode::Release);
        assert_eq!(sm.advance(CONTACT), TouchCode::NoTouch);
        assert_eq!(sm.advance(CONTACT), TouchCode::Touch);
    }
}
