//! PHY modes and their timing characteristics.
//!
//! Each mode has a fixed set of pipeline delays between what the radio signals (READY, ADDRESS,
//! END) and what actually happens on air. The timing chain subtracts or adds these to land
//! transmissions and receive windows on the exact microsecond.

use core::fmt;

/// Radio ramp-up time in fast mode, from TXEN/RXEN to READY, in µs.
pub const RAMP_UP_US: u32 = 40;

/// Maximum PDU length in Bytes (2-Byte header plus 255 Bytes of payload).
pub const MAX_PDU_LEN: usize = 257;

/// Maximum data channel PDU payload length.
pub const MAX_DATA_PDU_PAYLOAD: u8 = 251;

/// The physical layer configurations supported by the radio.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PhyMode {
    /// LE 1M, 1 Mbit/s uncoded.
    Le1M = 0,

    /// LE 2M, 2 Mbit/s uncoded.
    Le2M = 1,

    /// LE Coded with S=8 coding, 125 kbit/s.
    Coded125k = 2,

    /// LE Coded with S=2 coding, 500 kbit/s.
    Coded500k = 3,
}

/// The PHY, as seen by the Link-Layer (the coding scheme of the Coded PHY is a per-packet detail).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phy {
    Le1M,
    Le2M,
    Coded,
}

/// Per-mode pipeline delays in µs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ModeTiming {
    /// From READY to the first bit on air.
    pub tx_delay: u32,

    /// From the first bit on air to the ADDRESS event on the transmitter.
    pub tx_addr_delay: u32,

    /// From the last bit on air to the END event on the transmitter.
    pub tx_end_delay: u32,

    /// From the end of the access address on air to the ADDRESS event on the receiver.
    pub rx_addr_delay: u32,

    /// From the last bit on air to the END event on the receiver.
    pub rx_end_delay: u32,

    /// Air time of the preamble and access address (plus CI and TERM1 on Coded PHY).
    pub pdu_start_offset: u32,
}

impl PhyMode {
    /// Returns the pipeline delays of this mode.
    pub fn timing(self) -> ModeTiming {
        const TIMINGS: [ModeTiming; 4] = [
            ModeTiming {
                tx_delay: 6,
                tx_addr_delay: 7,
                tx_end_delay: 6,
                rx_addr_delay: 6,
                rx_end_delay: 4,
                pdu_start_offset: 40,
            },
            ModeTiming {
                tx_delay: 5,
                tx_addr_delay: 5,
                tx_end_delay: 4,
                rx_addr_delay: 2,
                rx_end_delay: 1,
                pdu_start_offset: 24,
            },
            ModeTiming {
                tx_delay: 5,
                tx_addr_delay: 17,
                tx_end_delay: 9,
                rx_addr_delay: 17,
                rx_end_delay: 27,
                pdu_start_offset: 376,
            },
            ModeTiming {
                tx_delay: 5,
                tx_addr_delay: 17,
                tx_end_delay: 3,
                rx_addr_delay: 17,
                rx_end_delay: 22,
                pdu_start_offset: 376,
            },
        ];

        TIMINGS[self as usize]
    }

    /// Returns the PHY this mode belongs to.
    pub fn phy(self) -> Phy {
        match self {
            PhyMode::Le1M => Phy::Le1M,
            PhyMode::Le2M => Phy::Le2M,
            PhyMode::Coded125k | PhyMode::Coded500k => Phy::Coded,
        }
    }

    /// Returns whether this mode uses the Coded PHY.
    pub fn is_coded(self) -> bool {
        self.phy() == Phy::Coded
    }

    /// Returns the number of bits on air before the PDU header that the radio counts towards its
    /// bit counter (the coding indicator and first terminator on Coded PHY).
    pub fn bit_counter_offset(self) -> u32 {
        if self.is_coded() {
            5
        } else {
            0
        }
    }
}

impl fmt::Display for PhyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PhyMode::Le1M => "1M",
            PhyMode::Le2M => "2M",
            PhyMode::Coded125k => "Coded S8",
            PhyMode::Coded500k => "Coded S2",
        })
    }
}
