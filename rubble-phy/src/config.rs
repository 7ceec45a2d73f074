//! PHY configuration.
//!
//! Two layers: the [`Config`] trait binds the hardware types at compile time, and a [`PhyConfig`]
//! value describes what the selected silicon can do at runtime.

use crate::{
    hw::{
        BulkCopy, Cipher, CoarseCounter, CriticalSection, FineTimer, FrontEnd, Interconnect, Radio,
        Resolver,
    },
    time::Duration,
};
use bitflags::bitflags;

/// Trait for PHY hardware configurations.
///
/// This trait defines the peripheral types the PHY programs. Every platform defines a type
/// implementing this trait and hands matching peripheral instances to [`Phy::new`].
///
/// [`Phy::new`]: ../phy/struct.Phy.html#method.new
pub trait Config {
    /// The radio transceiver.
    type Radio: Radio;

    /// The 1 MHz, 32-bit fine counter that times radio enables to the microsecond.
    type Timer: FineTimer;

    /// The 32.768 kHz, 24-bit coarse counter that starts the fine counter.
    type Rtc: CoarseCounter;

    /// The programmable event interconnect between the other peripherals.
    type Ppi: Interconnect;

    /// The inline AES-CCM engine.
    type Cipher: Cipher;

    /// The resolvable private address resolver.
    type Resolver: Resolver;

    /// Optional external RF front-end (power amplifier / low-noise amplifier).
    type FrontEnd: FrontEnd;

    /// Word-wise copy used to hand received PDUs to the Link-Layer.
    type Copy: BulkCopy;

    /// Masks the radio interrupt while thread-context calls reprogram the hardware.
    type Critical: CriticalSection;
}

/// How a non-default encryption header mask is applied.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HeaderMask {
    /// The header mask cannot be changed. Only the data channel mask is ever used.
    None,

    /// The cipher has a header mask register.
    Hardware,

    /// The cipher has no header mask register. The PHY masks the header itself before key-stream
    /// generation and restores it from the cipher's key-stream interrupt (see
    /// [`Phy::cipher_isr`]).
    ///
    /// [`Phy::cipher_isr`]: ../phy/struct.Phy.html#method.cipher_isr
    Workaround,
}

/// Optional hardware capabilities of the PHY.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Capabilities {
    /// LE encryption through the inline cipher.
    pub encryption: bool,

    /// Resolvable private address resolution.
    pub privacy: bool,

    /// LE 2M PHY.
    pub two_megabit: bool,

    /// LE Coded PHY (S=2 and S=8).
    pub coded: bool,

    /// Strategy for non-default encryption header masks.
    pub header_mask: HeaderMask,
}

impl Capabilities {
    /// Capabilities of a radio supporting everything but the Coded PHY (eg. the nRF52832).
    pub const fn nrf52832() -> Self {
        Self {
            encryption: true,
            privacy: true,
            two_megabit: true,
            coded: false,
            header_mask: HeaderMask::Workaround,
        }
    }

    /// Capabilities of a radio supporting every PHY (eg. the nRF52840).
    pub const fn nrf52840() -> Self {
        Self {
            coded: true,
            ..Self::nrf52832()
        }
    }
}

bitflags! {
    /// Silicon errata workarounds to apply.
    pub struct Errata: u8 {
        /// The coded PHY needs an undocumented radio register patched whenever the PHY switches
        /// between coded and uncoded modes (nRF52840 erratum 191).
        const CODED_MODE_SWITCH = 1 << 0;

        /// Address matching needs an undocumented radio register patched once after reset
        /// (nRF52832 errata 102, 106 and 107).
        const ADDRESS_MATCH = 1 << 1;
    }
}

/// Runtime configuration of a [`Phy`].
///
/// [`Phy`]: ../phy/struct.Phy.html
#[derive(Debug, Copy, Clone)]
pub struct PhyConfig {
    /// What the hardware supports.
    pub capabilities: Capabilities,

    /// Which silicon errata need to be worked around.
    pub errata: Errata,

    /// Extra time added to the wait-for-response deadline after a transmission, on top of the
    /// interframe spacing.
    pub extended_tifs: Duration,
}

impl PhyConfig {
    /// Creates a configuration with no errata and no extended interframe spacing.
    pub const fn new(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            errata: Errata::empty(),
            extended_tifs: Duration::from_micros(0),
        }
    }

    /// Sets the errata workarounds to apply.
    pub const fn with_errata(self, errata: Errata) -> Self {
        Self { errata, ..self }
    }

    /// Sets the extended interframe spacing margin.
    pub const fn with_extended_tifs(self, extended_tifs: Duration) -> Self {
        Self {
            extended_tifs,
            ..self
        }
    }
}
