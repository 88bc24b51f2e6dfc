//! Event cells shared between interrupt context and the touch API.
//!
//! The watchdog timer and the capacitive interrupt line only bump free-running counters here.
//! The main thread notices them the next time it queries the panel. Each counter has exactly one
//! writer and is updated with a plain load/store, so this works on cores without atomic
//! read-modify-write (Cortex-M0).

use core::sync::atomic::{AtomicU32, Ordering};

pub struct TouchSignals {
    ticks: AtomicU32,
    interrupts: AtomicU32,
}

impl TouchSignals {
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU32::new(0),
            interrupts: AtomicU32::new(0),
        }
    }

    /// Call from the periodic timer, once every [`crate::TICK_PERIOD_US`]
    pub fn tick(&self) {
        let t = self.ticks.load(Ordering::Relaxed);
        self.ticks.store(t.wrapping_add(1), Ordering::Release);
    }

    /// Call from the touch controller's interrupt handler
    pub fn interrupt(&self) {
        let n = self.interrupts.load(Ordering::Relaxed);
        self.interrupts.store(n.wrapping_add(1), Ordering::Release);
    }

    pub(crate) fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::Acquire)
    }

    pub(crate) fn interrupts(&self) -> u32 {
        self.interrupts.load(Ordering::Acquire)
    }
}

impl Default for TouchSignals {
    fn default() -> Self {
        Self::new()
    }
}

/// Main-thread position in one of the counters
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Cursor {
    seen: u32,
}

impl Cursor {
    pub const fn new(start: u32) -> Self {
        Self { seen: start }
    }

    /// Number of events since the last call
    pub fn take(&mut self, current: u32) -> u32 {
        let n = current.wrapping_sub(self.seen);
        self.seen = current;
        n
    }
}
