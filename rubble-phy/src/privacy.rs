//! Resolvable private address resolution.
//!
//! With a key table installed, the PHY lets the resolver check the advertiser address of every
//! received advertising PDU that carries a random address. The resolver starts as soon as the
//! radio has received the last bit of the address, so the result is usually ready when the packet
//! ends. It is reported in [`RxHeader::resolved`]; the PHY does not act on it.
//!
//! [`RxHeader::resolved`]: ../link/struct.RxHeader.html#structfield.resolved

use crate::{
    buffers::{Buf, RX_OFFSET},
    config::Config,
    hw::{Interconnect, Links, Radio, RadioEvent, Resolver},
    phy::Phy,
};

/// Maximum number of keys the resolver can check.
pub const MAX_IRKS: usize = 16;

/// An Identity Resolving Key, in the byte order the resolver expects.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct Irk(pub [u8; 16]);

/// TxAdd bit in the advertising PDU header: the advertiser address is random.
const TX_ADD: u8 = 0x40;

const PDU_TYPE_MASK: u8 = 0x0f;
const ADV_EXT_IND: u8 = 0x07;

/// Extended advertising PDUs carry the extended header length and flags before AdvA.
const EXT_HEADER_LEN: usize = 2;

const PDU_HEADER_LEN: usize = 2;
const DEV_ADDR_LEN: usize = 6;

impl<C: Config> Phy<C> {
    /// Enables address resolution against `irks`.
    ///
    /// The keys must stay untouched while resolution is enabled, since the resolver reads them by
    /// DMA. Resolution is suspended while encryption is enabled.
    ///
    /// # Panics
    ///
    /// Panics if the hardware has no resolver, or if more than [`MAX_IRKS`] keys are passed.
    pub fn resolver_enable(&mut self, irks: &'static [Irk]) {
        assert!(self.config.capabilities.privacy, "no address resolver");
        assert!(irks.len() <= MAX_IRKS, "too many IRKs ({})", irks.len());

        self.irks = irks;
        self.privacy = true;
        debug!("resolver on, {} IRKs", irks.len());
    }

    /// Disables address resolution.
    pub fn resolver_disable(&mut self) {
        self.privacy = false;
        self.irks = &[];
        debug!("resolver off");
    }

    /// Arms the resolver for the packet being received, if its header asks for it.
    ///
    /// Moves the bit counter compare to the end of the advertiser address and lets its match start
    /// the resolver. Returns whether the resolver was armed.
    pub(crate) fn arm_resolver(&mut self, pdu_header: u8) -> bool {
        if !self.privacy || self.encrypted || pdu_header & TX_ADD == 0 {
            return false;
        }

        let adva_offset = if pdu_header & PDU_TYPE_MASK == ADV_EXT_IND {
            EXT_HEADER_LEN
        } else {
            0
        };

        let ptr = self
            .buffers
            .ptr(Buf::Rx)
            .wrapping_add(RX_OFFSET + adva_offset);
        self.hw.resolver.set_address_ptr(ptr);

        self.hw.radio.clear_event(RadioEvent::BcMatch);
        self.hw.ppi.enable(Links::BCMATCH_RESOLVER);
        let bits = (PDU_HEADER_LEN + adva_offset + DEV_ADDR_LEN) as u32 * 8;
        self.hw.radio.set_bit_counter(bits + self.bcc_offset);

        self.resolver_armed = true;
        true
    }
}
