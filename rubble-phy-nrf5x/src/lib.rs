//! `rubble-phy` support for the nRF52-series radios.
//!
//! The PHY is driven by the following peripherals, all of which are owned by it:
//!
//! * `RADIO`
//! * `TIMER0` as the 1 MHz fine counter
//! * `RTC0` as the 32.768 kHz coarse counter (which must be running off the LFCLK)
//! * `PPI` channels 4, 5, 20, 21, 23, 25, 26, 27 and 31
//! * `CCM` and `AAR`
//!
//! The application has to forward three interrupts: `RADIO` to [`Phy::isr`], `RTC0` to
//! [`Rtc0::overflow`] and, when using a non-default encryption header mask, `CCM_AAR` to
//! [`Phy::cipher_isr`]. The `CCM_AAR` interrupt must have a lower priority than `RADIO`.
//!
//! [`Phy::isr`]: ../rubble_phy/phy/struct.Phy.html#method.isr
//! [`Phy::cipher_isr`]: ../rubble_phy/phy/struct.Phy.html#method.cipher_isr
//! [`Rtc0::overflow`]: timer/struct.Rtc0.html#method.overflow

#![no_std]
#![warn(rust_2018_idioms)]

#[cfg(not(any(feature = "52832", feature = "52840")))]
compile_error!("no device selected; enable the `52832` or `52840` feature");

#[cfg(all(feature = "52832", feature = "52840"))]
compile_error!("`52832` and `52840` are mutually exclusive; use `default-features = false`");

#[cfg(feature = "52832")]
pub(crate) use nrf52832_pac as pac;

#[cfg(feature = "52840")]
pub(crate) use nrf52840_pac as pac;

pub mod crypto;
pub mod ppi;
pub mod radio;
pub mod timer;

use self::{
    crypto::{Aar, Ccm},
    ppi::Ppi,
    radio::BleRadio,
    timer::{Rtc0, Timer0},
};
use core::marker::PhantomData;
use rubble_phy::{
    config::{Capabilities, Config, Errata, PhyConfig},
    hw::{CriticalSection, FrontEnd, SliceCopy},
    phy::Hardware,
};

/// `rubble-phy` configuration for the nRF52, with an external front-end module `F`.
///
/// Use [`NoFrontEnd`] when the board has none.
///
/// [`NoFrontEnd`]: ../rubble_phy/hw/struct.NoFrontEnd.html
pub struct Nrf5x<F: FrontEnd> {
    _p: PhantomData<F>,
}

impl<F: FrontEnd> Config for Nrf5x<F> {
    type Radio = BleRadio;
    type Timer = Timer0;
    type Rtc = Rtc0;
    type Ppi = Ppi;
    type Cipher = Ccm;
    type Resolver = Aar;
    type FrontEnd = F;
    type Copy = SliceCopy;
    type Critical = InterruptFree;
}

/// Masks all interrupts.
pub struct InterruptFree;

impl CriticalSection for InterruptFree {
    fn enter<R>(f: impl FnOnce() -> R) -> R {
        cortex_m::interrupt::free(|_| f())
    }
}

/// Bundles the peripherals the PHY needs.
pub fn hardware<F: FrontEnd>(
    radio: pac::RADIO,
    timer: pac::TIMER0,
    rtc: pac::RTC0,
    ppi: pac::PPI,
    ccm: pac::CCM,
    aar: pac::AAR,
    fem: F,
) -> Hardware<Nrf5x<F>> {
    Hardware {
        radio: BleRadio::new(radio),
        timer: Timer0::new(timer),
        rtc: Rtc0::new(rtc),
        ppi: Ppi::new(ppi),
        cipher: Ccm::new(ccm),
        resolver: Aar::new(aar),
        fem,
    }
}

/// Returns the runtime configuration for the selected device, with its errata workarounds.
pub fn phy_config() -> PhyConfig {
    #[cfg(feature = "52832")]
    let config = PhyConfig::new(Capabilities::nrf52832()).with_errata(Errata::ADDRESS_MATCH);

    #[cfg(feature = "52840")]
    let config = PhyConfig::new(Capabilities::nrf52840()).with_errata(Errata::CODED_MODE_SWITCH);

    config
}
