//! Idle callback invoked from every blocking wait.
//!
//! The handler is the only way to cancel a blocking wait. Returning [`IdleAction::Abort`] unwinds
//! the nearest wait with [`crate::Error::ExternalAbort`] and leaves the hardware as it is.

/// Why the driver is waiting
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdleReason {
    /// Polling the status register while the controller is busy
    StatusWait,
    /// Polling a command register while the controller is busy
    CommandWait,
    /// A caller is blocked in [`crate::TouchPanel::get`]
    TouchWait,
    /// A calibration session is waiting on the user
    TouchCalWait,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdleAction {
    Continue,
    Abort,
}

pub trait IdleHandler {
    fn idle(&mut self, reason: IdleReason) -> IdleAction;
}

impl<F> IdleHandler for F
where
    F: FnMut(IdleReason) -> IdleAction,
{
    fn idle(&mut self, reason: IdleReason) -> IdleAction {
        self(reason)
    }
}

/// Run an optional handler; no handler never aborts
pub(crate) fn run(handler: &mut Option<&mut dyn IdleHandler>, reason: IdleReason) -> IdleAction {
    match handler {
        Some(h) => h.idle(reason),
        None => IdleAction::Continue,
    }
}
