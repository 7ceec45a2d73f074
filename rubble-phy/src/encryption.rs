//! Inline link-layer encryption.
//!
//! When encryption is enabled, packets take a detour through the cipher block: plaintext to send
//! is staged in [`Buf::Enc`] and encrypted into [`Buf::Tx`] before the radio reads it, and
//! received ciphertext lands in [`Buf::Enc`] and is decrypted into [`Buf::Rx`] while it is still
//! being received. The CPU is not involved in either direction.
//!
//! The cipher reads its key, IV, packet counter and direction from a configuration block in
//! [`PhyBuffers`]. Each field can be updated independently and stays in effect until changed.
//!
//! [`Buf::Enc`]: ../buffers/enum.Buf.html#variant.Enc
//! [`Buf::Tx`]: ../buffers/enum.Buf.html#variant.Tx
//! [`Buf::Rx`]: ../buffers/enum.Buf.html#variant.Rx
//! [`PhyBuffers`]: ../buffers/struct.PhyBuffers.html

use crate::{
    buffers::Buf,
    config::{Config, HeaderMask},
    hw::{Cipher, Interconnect, Links, Resolver},
    phy::Phy,
    spin,
};
use byteorder::{ByteOrder, LittleEndian};

/// Header mask of data channel PDUs: NESN, SN and MD are excluded from authentication.
pub const HEADER_MASK_DATA: u8 = 0xe3;

/// The packet counter is 39 bits wide.
const COUNTER_MASK: u64 = (1 << 39) - 1;

const KEY: core::ops::Range<usize> = 0..16;
const COUNTER: core::ops::Range<usize> = 16..24;
const DIRECTION: usize = 24;
const IV: core::ops::Range<usize> = 25..33;

impl<C: Config> Phy<C> {
    /// Enables encryption with the given session key.
    ///
    /// The address resolver is unavailable while encryption is on. The header mask is reset to the
    /// one for data channel PDUs.
    ///
    /// # Panics
    ///
    /// Panics if the hardware does not support encryption.
    pub fn encrypt_enable(&mut self, key: &[u8; 16]) {
        assert!(
            self.config.capabilities.encryption,
            "encryption not supported"
        );

        self.buffers.with_ccm(|block| block[KEY].copy_from_slice(key));
        self.encrypted = true;
        if self.config.capabilities.privacy {
            self.hw.resolver.disable();
        }
        self.hw.cipher.enable();
        self.encrypt_header_mask_set(HEADER_MASK_DATA);
        debug!("encryption on");
    }

    /// Sets the initialization vector.
    pub fn encrypt_iv_set(&mut self, iv: &[u8; 8]) {
        self.buffers.with_ccm(|block| block[IV].copy_from_slice(iv));
    }

    /// Sets the packet counter and direction bit for the next packet.
    ///
    /// Only the low 39 bits of `counter` are used.
    pub fn encrypt_counter_set(&mut self, counter: u64, dir: bool) {
        self.buffers.with_ccm(|block| {
            LittleEndian::write_u64(&mut block[COUNTER], counter & COUNTER_MASK);
            block[DIRECTION] = dir as u8;
        });
    }

    /// Sets which bits of the PDU header are authenticated.
    ///
    /// Radios without a way to apply a non-default mask keep using [`HEADER_MASK_DATA`].
    pub fn encrypt_header_mask_set(&mut self, mask: u8) {
        match self.config.capabilities.header_mask {
            HeaderMask::None => {
                if mask != HEADER_MASK_DATA {
                    warn!("header mask {:#04x} not supported", mask);
                }
            }
            HeaderMask::Hardware => {
                self.hw.cipher.set_header_mask(mask);
                self.header_mask = mask;
            }
            HeaderMask::Workaround => self.header_mask = mask,
        }
    }

    /// Disables encryption.
    ///
    /// The address resolver becomes available again, as if encryption had never been enabled.
    pub fn encrypt_disable(&mut self) {
        self.hw.ppi.disable(Links::ADDRESS_CRYPT);
        self.hw.cipher.disable();
        self.encrypted = false;
        debug!("encryption off");
    }

    /// Cipher interrupt handler.
    ///
    /// Only needed on radios using [`HeaderMask::Workaround`]: once the key stream for a
    /// transmission with a non-default header mask is ready, this puts the real PDU header into
    /// the ciphertext. Must run at a lower priority than the radio interrupt.
    ///
    /// This relies on the cipher overwriting a sentinel in the transmit buffer shortly after the
    /// key stream is done, which has only been validated on nRF52832 silicon.
    ///
    /// [`HeaderMask::Workaround`]: ../config/enum.HeaderMask.html#variant.Workaround
    pub fn cipher_isr(&mut self) {
        if !self.hw.cipher.keystream_done() {
            return;
        }

        let bufs = self.buffers;
        spin::wait_while(|| bufs.read_volatile(Buf::Tx, 0) == 0xff);
        bufs.write_volatile(Buf::Tx, 0, self.header_byte);
        self.hw.cipher.disable_keystream_interrupt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{Capabilities, PhyConfig},
        link::{Transition, TxPdu},
        sim::{Sim, SimConfig},
    };

    fn phy(sim: &Sim, caps: Capabilities) -> Phy<SimConfig> {
        sim.phy(PhyConfig::new(caps))
    }

    #[test]
    fn config_block_layout() {
        let sim = Sim::new();
        let mut phy = phy(&sim, Capabilities::nrf52840());

        let key = [
            0x0f, 0x0e, 0x0d, 0x0c, 0x0b, 0x0a, 0x09, 0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02,
            0x01, 0x00,
        ];
        phy.encrypt_enable(&key);
        phy.encrypt_iv_set(&[0x24, 0xab, 0xdc, 0xba, 0xbe, 0xba, 0xaf, 0xde]);
        phy.encrypt_counter_set(0xff_8000_0001, true);

        phy.buffers.with_ccm(|block| {
            assert_eq!(&block[KEY], &key);
            // Bit 39 and above are dropped.
            assert_eq!(&block[COUNTER], &[1, 0, 0, 0x80, 0x7f, 0, 0, 0]);
            assert_eq!(block[DIRECTION], 1);
            assert_eq!(&block[IV], &[0x24, 0xab, 0xdc, 0xba, 0xbe, 0xba, 0xaf, 0xde]);
        });

        // Updating one field leaves the others alone.
        phy.encrypt_counter_set(2, false);
        phy.buffers.with_ccm(|block| {
            assert_eq!(&block[KEY], &key);
            assert_eq!(block[COUNTER.start], 2);
            assert_eq!(block[DIRECTION], 0);
            assert_eq!(block[IV.start], 0x24);
        });
    }

    #[test]
    fn enable_and_disable() {
        let sim = Sim::new();
        let mut phy = phy(&sim, Capabilities::nrf52840());

        phy.encrypt_enable(&[0; 16]);
        assert!(sim.cipher_enabled());
        assert!(!sim.resolver_enabled());

        phy.rx().unwrap();
        assert!(sim.links().contains(Links::ADDRESS_CRYPT));

        phy.encrypt_disable();
        assert!(!sim.cipher_enabled());
        assert!(!sim.links().contains(Links::ADDRESS_CRYPT));
        assert!(!phy.encrypted);
    }

    #[test]
    fn resolver_restored_after_disable() {
        static IRKS: [crate::privacy::Irk; 1] = [crate::privacy::Irk([7; 16])];

        let sim = Sim::new();
        let mut phy = phy(&sim, Capabilities::nrf52840());
        phy.resolver_enable(&IRKS);

        phy.encrypt_enable(&[0; 16]);
        phy.rx().unwrap();
        assert!(!sim.resolver_enabled());

        phy.encrypt_disable();
        phy.rx().unwrap();
        assert!(sim.resolver_enabled());
        assert_eq!(sim.resolver_irks(), 1);
        assert_eq!(sim.packet_ptr(), phy.buffers.ptr(Buf::Rx) as usize + 3);
    }

    #[test]
    fn hardware_header_mask() {
        let sim = Sim::new();
        let caps = Capabilities {
            header_mask: HeaderMask::Hardware,
            ..Capabilities::nrf52840()
        };
        let mut phy = phy(&sim, caps);

        phy.encrypt_enable(&[0; 16]);
        assert_eq!(sim.header_mask(), Some(HEADER_MASK_DATA));
        phy.encrypt_header_mask_set(0xff);
        assert_eq!(sim.header_mask(), Some(0xff));
    }

    #[test]
    fn header_mask_workaround() {
        let sim = Sim::new();
        let mut phy = phy(&sim, Capabilities::nrf52832());
        phy.encrypt_enable(&[0; 16]);
        phy.encrypt_header_mask_set(0xe7);

        phy.tx(
            |_| TxPdu {
                header: 0x1c,
                len: 0,
            },
            Transition::None,
        )
        .unwrap();

        assert_eq!(phy.buffers.read_volatile(Buf::Enc, 0), 0x1c & 0xe7);
        assert_eq!(phy.buffers.read_volatile(Buf::Tx, 0), 0xff);
        assert!(sim.keystream_interrupt());

        // Not our event.
        phy.cipher_isr();
        assert!(sim.keystream_interrupt());

        // Cipher done: output overwrote the sentinel.
        sim.set_keystream_done();
        phy.buffers.write_volatile(Buf::Tx, 0, 0x04);
        phy.cipher_isr();
        assert_eq!(phy.buffers.read_volatile(Buf::Tx, 0), 0x1c);
        assert!(!sim.keystream_interrupt());
    }

    #[test]
    fn data_mask_needs_no_workaround() {
        let sim = Sim::new();
        let mut phy = phy(&sim, Capabilities::nrf52832());
        phy.encrypt_enable(&[0; 16]);

        phy.tx(
            |_| TxPdu {
                header: 0x1c,
                len: 0,
            },
            Transition::None,
        )
        .unwrap();
        assert_eq!(phy.buffers.read_volatile(Buf::Enc, 0), 0x1c);
        assert!(!sim.keystream_interrupt());
    }

    #[test]
    #[should_panic]
    fn unsupported() {
        let sim = Sim::new();
        let caps = Capabilities {
            encryption: false,
            ..Capabilities::nrf52840()
        };
        phy(&sim, caps).encrypt_enable(&[0; 16]);
    }
}
