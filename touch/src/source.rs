use crate::idle::IdleHandler;
use crate::{RawSample, TouchCode};

/// What a touch source saw on one poll
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Report {
    /// No new data
    Nothing,
    /// New data arrived but no coordinate is ready yet (partial filter batch)
    Pending,
    /// A fresh coordinate for the primary contact
    Contact(RawSample),
    /// The hardware reported the contact lifted
    Lifted,
}

/// One contact as decoded by a multi-touch source
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Contact {
    pub id: u8,
    pub code: TouchCode,
    pub raw: RawSample,
}

impl Contact {
    pub const fn none() -> Self {
        Self {
            id: 0,
            code: TouchCode::NoTouch,
            raw: RawSample::new(0, 0),
        }
    }
}

impl Default for Contact {
    fn default() -> Self {
        Self::none()
    }
}

/// Swipe and zoom gestures decoded by the capacitive controller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gesture {
    None,
    MoveUp,
    MoveLeft,
    MoveDown,
    MoveRight,
    ZoomIn,
    ZoomOut,
    /// An id the controller reported that is not in the table above
    Unknown(u8),
}

impl Gesture {
    pub fn from_id(id: u8) -> Self {
        use crate::regs::ft5206::*;
        match id {
            GEST_ID_NO_GESTURE => Gesture::None,
            GEST_ID_MOVE_UP => Gesture::MoveUp,
            GEST_ID_MOVE_LEFT => Gesture::MoveLeft,
            GEST_ID_MOVE_DOWN => Gesture::MoveDown,
            GEST_ID_MOVE_RIGHT => Gesture::MoveRight,
            GEST_ID_ZOOM_IN => Gesture::ZoomIn,
            GEST_ID_ZOOM_OUT => Gesture::ZoomOut,
            other => Gesture::Unknown(other),
        }
    }
}

/// A backend that produces raw touch reports.
///
/// The panel owns exactly one source and drives it from the main thread only. Sources that
/// depend on an interrupt line learn about it through [`crate::signals::TouchSignals`].
pub trait TouchSource {
    type Error;

    /// Number of contacts the source can track
    fn channels(&self) -> usize;

    /// True when reported coordinates are transducer units that must go through a calibration
    /// matrix before they mean anything on screen
    fn requires_calibration(&self) -> bool;

    /// Configure the hardware
    fn init(&mut self, idle: &mut Option<&mut dyn IdleHandler>) -> Result<(), Self::Error>;

    /// Collect whatever the hardware has for the primary contact
    fn poll(&mut self) -> Result<Report, Self::Error>;

    /// One unfiltered sample, if the hardware has a new one
    fn read_raw(&mut self) -> Result<Option<RawSample>, Self::Error>;

    /// Drop partially collected data; called when the watchdog expires
    fn restart(&mut self);

    /// Latest decoded state of channel `ch`. Single-channel sources return `None`, the panel's
    /// own record for channel 0 is authoritative there.
    fn contact(&self, ch: usize) -> Option<Contact>;

    /// Contacts currently on the panel
    fn touch_count(&self) -> u8;

    fn gesture(&self) -> Gesture {
        Gesture::None
    }
}
