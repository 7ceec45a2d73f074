//! PHY statistics.

use core::fmt;

/// Event counters maintained by the PHY.
///
/// The PHY only ever increments these (wrapping on overflow). They are informational; nothing in
/// the PHY reads them back.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PhyStats {
    /// Radio interrupts handled.
    pub isrs: u32,
    /// Transmissions started.
    pub tx_good: u32,
    /// Transmissions that failed.
    pub tx_fail: u32,
    /// Transmissions that could not be armed in time.
    pub tx_late: u32,
    /// Bytes transmitted (PDU header and payload).
    pub tx_bytes: u32,
    /// Packets whose access address was received.
    pub rx_starts: u32,
    /// Receptions aborted by the Link-Layer.
    pub rx_aborts: u32,
    /// Packets received with a valid CRC.
    pub rx_valid: u32,
    /// Packets received with an invalid CRC.
    pub rx_crc_err: u32,
    /// Receptions that could not be armed in time.
    pub rx_late: u32,
    /// Operations rejected because the radio was in an unexpected state.
    pub radio_state_errs: u32,
    /// Cipher errors during reception.
    pub rx_hw_err: u32,
    /// Cipher errors during transmission.
    pub tx_hw_err: u32,
}

pub(crate) fn inc(counter: &mut u32) {
    add(counter, 1);
}

pub(crate) fn add(counter: &mut u32, n: u32) {
    *counter = counter.wrapping_add(n);
}

impl fmt::Display for PhyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "isrs={} tx={}/{}B late={} fail={} hw_err={} rx={} valid={} crc_err={} aborts={} late={} hw_err={} state_errs={}",
            self.isrs,
            self.tx_good,
            self.tx_bytes,
            self.tx_late,
            self.tx_fail,
            self.tx_hw_err,
            self.rx_starts,
            self.rx_valid,
            self.rx_crc_err,
            self.rx_aborts,
            self.rx_late,
            self.rx_hw_err,
            self.radio_state_errs,
        )
    }
}
