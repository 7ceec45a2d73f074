//! The interface between the PHY and the Link-Layer above it.
//!
//! The PHY calls back into the Link-Layer from its interrupt handler through the [`LinkLayer`]
//! trait. Every callback receives the PHY itself, so the Link-Layer can react immediately (eg. by
//! queueing a response with [`Phy::tx`] from `rx_end`, or by calling [`Phy::disable`]).
//!
//! [`Phy::tx`]: ../phy/struct.Phy.html#method.tx
//! [`Phy::disable`]: ../phy/struct.Phy.html#method.disable

use crate::{
    config::Config,
    hw::ResolverOutcome,
    mode::{Phy as PhyKind, PhyMode},
    phy::Phy,
    time::{Duration, TimeTarget},
};
use bitflags::bitflags;

/// What the PHY should do with an operation after a Link-Layer callback.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Keep going.
    Continue,

    /// Disable the PHY.
    Abort,
}

/// What the PHY does once the current transmission has ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Stop and go idle.
    None,

    /// Start receiving T_IFS after the transmission ended.
    TxToRx,

    /// Transmit again, at a fixed spacing from this transmission.
    TxToTx(TxTxSpacing),
}

impl Default for Transition {
    fn default() -> Self {
        Transition::None
    }
}

/// Timing of a transmit-to-transmit transition.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TxTxSpacing {
    /// Time from the anchor to the start of the next transmission.
    pub spacing: Duration,

    /// Which point of the current transmission `spacing` counts from.
    pub anchor: Anchor,
}

/// Reference point of a transmit-to-transmit transition.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// The first bit of the current transmission.
    TxStart,

    /// The last bit of the current transmission.
    TxEnd,
}

/// PDU header information returned by a transmit payload producer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TxPdu {
    /// First header Byte (PDU type and flags).
    pub header: u8,

    /// Payload length in Bytes.
    pub len: u8,
}

bitflags! {
    /// Status flags of a received packet.
    pub struct RxFlags: u8 {
        /// The CRC was valid, and decryption (if enabled) did not fail in hardware.
        const CRC_OK = 1 << 0;

        /// The packet was decrypted, had a non-empty payload, and failed its integrity check.
        const MIC_FAILURE = 1 << 1;
    }
}

/// Metadata of a received packet.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RxHeader {
    /// Channel index the packet was received on.
    pub channel: u8,

    pub phy: PhyKind,

    /// The PHY mode, including the coding scheme of Coded PHY packets.
    pub phy_mode: PhyMode,

    /// When the first bit of the packet (after preamble and access address) was on air.
    pub start: TimeTarget,

    /// Received signal strength in dBm.
    pub rssi: i8,

    pub flags: RxFlags,

    /// Advertiser address resolution result.
    pub resolved: ResolverOutcome,
}

impl RxHeader {
    pub(crate) fn new() -> Self {
        Self {
            channel: 0,
            phy: PhyKind::Le1M,
            phy_mode: PhyMode::Le1M,
            start: TimeTarget::default(),
            rssi: 0,
            flags: RxFlags::empty(),
            resolved: ResolverOutcome::NotAttempted,
        }
    }

    /// Returns whether the packet's CRC was valid.
    pub fn crc_ok(&self) -> bool {
        self.flags.contains(RxFlags::CRC_OK)
    }
}

/// Link-Layer callbacks invoked from [`Phy::isr`].
///
/// [`Phy::isr`]: ../phy/struct.Phy.html#method.isr
pub trait LinkLayer<C: Config> {
    /// A packet's access address was received and its first header Byte is available.
    ///
    /// `pdu` starts at the PDU header in the radio's RAM layout (header, length, S1). `header` is
    /// already filled in except for RSSI and flags; the Link-Layer may annotate it. Returning
    /// [`Verdict::Abort`] stops reception.
    fn rx_start(&mut self, phy: &mut Phy<C>, pdu: &[u8], header: &mut RxHeader) -> Verdict;

    /// A packet was received completely.
    ///
    /// `pdu` holds the 2-Byte PDU header followed by the payload. A transmission at T_IFS after
    /// this packet is already armed; call [`Phy::tx`] to fill it, or return [`Verdict::Abort`] to
    /// disable the PHY.
    ///
    /// [`Phy::tx`]: ../phy/struct.Phy.html#method.tx
    fn rx_end(&mut self, phy: &mut Phy<C>, pdu: &[u8], header: &RxHeader) -> Verdict;

    /// A transmission ended. Its follow-up transition has already been armed.
    fn tx_end(&mut self, phy: &mut Phy<C>);

    /// The receiver was disabled before a packet started (wait-for-response timeout).
    fn wfr_expired(&mut self, phy: &mut Phy<C>);
}
