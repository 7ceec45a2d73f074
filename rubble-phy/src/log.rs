//! Logging shims.
//!
//! With the `log` feature enabled, these forward to the `log` crate. Without it, the arguments are
//! still type-checked but nothing is emitted, so the interrupt handler pays nothing for its trace
//! points.

#[cfg(feature = "log")]
macro_rules! error {
    ($($t:tt)*) => {{ log::error!($($t)*); }};
}

#[cfg(feature = "log")]
macro_rules! warn {
    ($($t:tt)*) => {{ log::warn!($($t)*); }};
}

#[cfg(feature = "log")]
macro_rules! debug {
    ($($t:tt)*) => {{ log::debug!($($t)*); }};
}

#[cfg(feature = "log")]
macro_rules! trace {
    ($($t:tt)*) => {{ log::trace!($($t)*); }};
}

#[cfg(not(feature = "log"))]
macro_rules! error {
    ($($t:tt)*) => {{ let _ = format_args!($($t)*); }};
}

#[cfg(not(feature = "log"))]
macro_rules! warn {
    ($($t:tt)*) => {{ let _ = format_args!($($t)*); }};
}

#[cfg(not(feature = "log"))]
macro_rules! debug {
    ($($t:tt)*) => {{ let _ = format_args!($($t)*); }};
}

#[cfg(not(feature = "log"))]
macro_rules! trace {
    ($($t:tt)*) => {{ let _ = format_args!($($t)*); }};
}
