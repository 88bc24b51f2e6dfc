use core::fmt;

/// Failures reported by the touch API
///
/// `E` is the bus error of the touch source in use. "No calibration" is not an error; it is
/// reported in place of a touch code as [`crate::TouchCode::NoCal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// Error originating from the register port or side-channel bus
    Bus(E),
    /// Invalid calibration input: collinear points, a zero divider or coefficient overflow
    BadParameter,
    /// A calibration session ran out of its time budget
    CalibrationTimeout,
    /// The idle handler asked to abort
    ExternalAbort,
    /// The draw target rejected a calibration marker
    Draw,
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bus(e) => write!(f, "bus error: {:?}", e),
            Error::BadParameter => f.write_str("bad parameter"),
            Error::CalibrationTimeout => f.write_str("touch calibration timed out"),
            Error::ExternalAbort => f.write_str("aborted by idle handler"),
            Error::Draw => f.write_str("draw target error"),
        }
    }
}
