//! Bounded busy-waiting.
//!
//! The PHY only spins on hardware conditions that settle within a few microseconds: the radio
//! finishing a disable (at most 6 µs), the first payload Byte arriving after the access address,
//! and the cipher finishing a packet that has already been received completely. Each of these is
//! bounded by [`SPIN_LIMIT`] iterations so a wedged peripheral cannot hang the interrupt handler.

/// Maximum number of polls before a wait is given up.
///
/// At 64 MHz this is several milliseconds, orders of magnitude above the longest legitimate wait.
pub const SPIN_LIMIT: u32 = 20_000;

/// Polls `cond` until it returns `false`.
///
/// Returns `true` if the condition cleared, or `false` if the wait was abandoned after
/// [`SPIN_LIMIT`] polls.
pub(crate) fn wait_while(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..SPIN_LIMIT {
        if !cond() {
            return true;
        }
        core::hint::spin_loop();
    }

    warn!("spin wait abandoned after {} polls", SPIN_LIMIT);
    false
}
