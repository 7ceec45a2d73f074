//! RF channel selection.
//!
//! BLE data is transmitted on 40 different RF channels numbered from 0 to 39 with ascending
//! frequencies. BLE internally uses so-called "Channel Indices" which reorder the RF channels so
//! that indices 0..=36 refer to data channels and 37..=39 refer to the advertising channels. The
//! PHY is only handed channel indices.

/// Number of channel indices.
pub const NUM_CHANNELS: u8 = 40;

/// Frequency offset from 2400 MHz for each channel index.
const FREQ_OFFSETS: [u8; NUM_CHANNELS as usize] = [
    4, 6, 8, 10, 12, 14, 16, 18, 20, 22, // 0-9
    24, 28, 30, 32, 34, 36, 38, 40, 42, 44, // 10-19
    46, 48, 50, 52, 54, 56, 58, 60, 62, 64, // 20-29
    66, 68, 70, 72, 74, 76, 78, 2, 26, 80, // 30-39
];

/// Everything the radio needs to know to tune to a channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ChannelDescriptor {
    /// Channel index (0..=39).
    pub index: u8,

    /// The access address identifying the link.
    pub access_address: u32,

    /// Initial CRC register value (24 bits).
    pub crc_init: u32,
}

/// Returns the frequency offset from 2400 MHz of channel index `index`, or `None` when the index is
/// out of range.
pub fn freq_offset(index: u8) -> Option<u8> {
    FREQ_OFFSETS.get(usize::from(index)).cloned()
}

/// Returns the center frequency of channel index `index` in MHz.
pub fn freq(index: u8) -> Option<u16> {
    freq_offset(index).map(|off| 2400 + u16::from(off))
}

/// Returns the data whitening IV for a channel index.
///
/// The radio takes the index itself; it fills in the fixed bit of the LFSR.
pub fn whitening_iv(index: u8) -> u8 {
    debug_assert!(index < NUM_CHANNELS);
    index
}
