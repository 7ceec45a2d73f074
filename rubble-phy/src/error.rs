use core::fmt;

/// Errors returned by the PHY's scheduling and configuration calls.
///
/// All of these are recoverable per-operation conditions: the PHY has already disabled itself (or,
/// for [`Error::RxLate`], started receiving as soon as possible) and the caller is expected to
/// reschedule.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A transmission could not be armed in time.
    ///
    /// Either the requested start time raced the coarse counter, or the automatic transition that
    /// was supposed to start this transmission was already missed.
    TxLate,

    /// A reception could not be armed at the requested time.
    ///
    /// The receiver has been enabled anyway, as soon as possible.
    RxLate,

    /// The radio was in a state that does not permit the requested operation.
    RadioState,

    /// Invalid value supplied for a parameter (eg. a channel index out of range).
    InvalidParam,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Error::TxLate => "transmission scheduled too late",
            Error::RxLate => "reception scheduled too late",
            Error::RadioState => "radio in unexpected state",
            Error::InvalidParam => "invalid parameter",
        })
    }
}
