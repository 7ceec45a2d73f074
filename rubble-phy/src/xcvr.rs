//! Transmit and receive setup.

use crate::{
    buffers::{Buf, RX_OFFSET},
    config::{Config, HeaderMask},
    encryption::HEADER_MASK_DATA,
    hw::{
        Cipher, CipherJob, CipherOp, CriticalSection, FrontEnd, Interconnect, Interrupts, Links,
        Radio, RadioEvent, RadioState, RadioTask, Resolver, Shorts,
    },
    link::{Transition, TxPdu},
    phy::{Phy, PhyState},
    spin, stats, Error,
};

/// Length of the radio's RAM header in front of the payload: S0 (the PDU header), LENGTH and S1.
const RAM_HEADER_LEN: usize = 3;

impl<C: Config> Phy<C> {
    /// Transmits a packet.
    ///
    /// `producer` writes the PDU payload into the buffer it is passed and returns the PDU header
    /// Byte and the payload length. The packet is sent when the transmission scheduled by
    /// [`Phy::tx_set_start_time`] (or the one armed by the previous operation) starts.
    ///
    /// `transition` determines what happens once the packet was sent.
    ///
    /// Returns `Error::TxLate` if the transmission this packet was meant for could not be armed in
    /// time, and `Error::RadioState` if the radio is already transmitting. In both cases the PHY
    /// is disabled.
    pub fn tx<F>(&mut self, producer: F, transition: Transition) -> Result<(), Error>
    where
        F: FnOnce(&mut [u8]) -> TxPdu,
    {
        C::Critical::enter(|| self.tx_locked(producer, transition))
    }

    fn tx_locked<F>(&mut self, producer: F, transition: Transition) -> Result<(), Error>
    where
        F: FnOnce(&mut [u8]) -> TxPdu,
    {
        if self.transition_late {
            warn!("tx: transition missed");
            self.disable();
            stats::inc(&mut self.stats.tx_late);
            return Err(Error::TxLate);
        }

        self.wait_disabled();

        // None of these may fire into a transmission.
        self.hw
            .ppi
            .disable(Links::WFR | Links::BCMATCH_RESOLVER | Links::ADDRESS_CRYPT);

        let bufs = self.buffers;
        let plain = if self.encrypted {
            self.hw.cipher.configure(
                CipherOp::Encrypt,
                self.cur_mode,
                CipherJob {
                    config: bufs.ccm_ptr(),
                    input: bufs.ptr(Buf::Enc),
                    output: bufs.ptr(Buf::Tx),
                    scratch: bufs.scratch_ptr(),
                },
            );
            Buf::Enc
        } else {
            Buf::Tx
        };

        let pdu = bufs.with(plain, |buf| {
            let pdu = producer(&mut buf[RAM_HEADER_LEN..]);
            buf[0] = pdu.header;
            buf[1] = pdu.len;
            buf[2] = 0;
            pdu
        });

        if self.encrypted {
            if self.config.capabilities.header_mask == HeaderMask::Workaround
                && self.header_mask != HEADER_MASK_DATA
            {
                // Hide the header bits from the cipher, then put the real header back into the
                // ciphertext once the key stream is ready (see `cipher_isr`). The sentinel tells
                // `cipher_isr` when the cipher has written its output.
                self.header_byte = pdu.header;
                let mask = self.header_mask;
                bufs.with(Buf::Enc, |buf| buf[0] &= mask);
                for i in 0..4 {
                    bufs.write_volatile(Buf::Tx, i, 0xff);
                }
                self.hw.cipher.clear_keystream_done();
                self.hw.cipher.enable_keystream_interrupt();
            }
            self.hw.cipher.start_keystream();
        }

        self.hw.radio.set_packet_ptr(bufs.ptr(Buf::Tx));
        self.hw.radio.clear_event(RadioEvent::Ready);
        self.hw.radio.clear_event(RadioEvent::End);
        self.hw.radio.clear_event(RadioEvent::Disabled);
        self.hw
            .radio
            .set_shorts(Shorts::END_DISABLE | Shorts::READY_START);
        self.hw.radio.enable_interrupts(Interrupts::DISABLED);

        self.transition = transition;

        if self.hw.radio.state() == RadioState::Tx {
            error!("tx: radio already transmitting");
            self.disable();
            stats::inc(&mut self.stats.tx_fail);
            return Err(Error::RadioState);
        }

        self.state = PhyState::Tx;
        stats::inc(&mut self.stats.tx_good);
        stats::add(&mut self.stats.tx_bytes, u32::from(pdu.len) + 2);
        trace!("tx {:#04x} len={} {:?}", pdu.header, pdu.len, transition);
        Ok(())
    }

    /// Starts receiving again right away, after the previous reception ended.
    pub fn restart_rx(&mut self) -> Result<(), Error> {
        trace!("restart_rx");

        C::Critical::enter(|| {
            self.stop_fine_timer();
            self.disable_irq_and_links();

            self.set_start_now();
            self.hw.ppi.enable(Links::TIMER_RXEN);
            self.rx()
        })
    }

    /// Stops whatever the PHY is doing and returns to idle.
    ///
    /// This stops the fine counter, disables the radio, its interrupts and all interconnect links
    /// and drops any pending transition. Calling this while idle is harmless.
    pub fn disable(&mut self) {
        trace!("disable");

        C::Critical::enter(|| {
            if self.config.capabilities.header_mask == HeaderMask::Workaround {
                self.hw.cipher.disable_keystream_interrupt();
            }

            self.stop_fine_timer();
            self.disable_irq_and_links();

            self.transition_late = false;
            self.transition = Transition::None;
            self.hw.fem.disable();
        });
    }

    /// Prepares the radio for receiving, once it has been disabled.
    ///
    /// Fails with `Error::RadioState` if the radio is busy doing something else.
    pub(crate) fn rx(&mut self) -> Result<(), Error> {
        self.wait_disabled();

        // The radio can also ramp up for RX from both idle states.
        let state = self.hw.radio.state();
        if state != RadioState::Disabled && !state.is_idle() {
            error!("rx: radio busy ({:?})", state);
            self.disable();
            stats::inc(&mut self.stats.radio_state_errs);
            return Err(Error::RadioState);
        }

        self.hw.radio.disable_interrupts(Interrupts::all());
        self.hw.radio.clear_event(RadioEvent::End);
        self.hw.radio.clear_event(RadioEvent::Disabled);

        self.rx_xcvr_setup();
        Ok(())
    }

    /// Points the radio at the receive buffer and enables the receive shortcuts and interrupts.
    pub(crate) fn rx_xcvr_setup(&mut self) {
        let bufs = self.buffers;
        let rx_ptr = bufs.ptr(Buf::Rx).wrapping_add(RX_OFFSET);

        if self.encrypted {
            // Received ciphertext goes to the staging buffer and is decrypted into the receive
            // buffer as it arrives. The radio starts decryption on ADDRESS.
            self.hw.radio.set_packet_ptr(bufs.ptr(Buf::Enc));
            self.hw.cipher.configure(
                CipherOp::Decrypt,
                self.cur_mode,
                CipherJob {
                    config: bufs.ccm_ptr(),
                    input: bufs.ptr(Buf::Enc),
                    output: rx_ptr,
                    scratch: bufs.scratch_ptr(),
                },
            );
            self.hw.cipher.start_keystream();
            self.hw.ppi.enable(Links::ADDRESS_CRYPT);
        } else {
            self.hw.radio.set_packet_ptr(rx_ptr);
        }

        // Cipher and resolver share hardware, so the resolver only runs on plaintext links.
        if self.privacy && !self.encrypted {
            self.hw.resolver.enable();
            self.hw
                .resolver
                .prepare(self.irks, bufs.resolver_ptr());
        } else if !self.encrypted && self.config.capabilities.privacy {
            self.hw.resolver.disable();
        }
        self.resolver_armed = false;

        self.hw
            .ppi
            .disable(Links::TIMER_TXEN | Links::BCMATCH_RESOLVER);

        self.rx_started = false;
        self.state = PhyState::Rx;

        // Fire BCMATCH once the first PDU header Byte is in.
        self.bcc_offset = self.cur_mode.bit_counter_offset();
        self.hw.radio.set_bit_counter(8 + self.bcc_offset);

        for &event in &[
            RadioEvent::Address,
            RadioEvent::DevMatch,
            RadioEvent::BcMatch,
            RadioEvent::RssiEnd,
            RadioEvent::CrcOk,
        ] {
            self.hw.radio.clear_event(event);
        }
        self.hw.radio.set_shorts(
            Shorts::END_DISABLE
                | Shorts::READY_START
                | Shorts::ADDRESS_BCSTART
                | Shorts::ADDRESS_RSSISTART
                | Shorts::DISABLED_RSSISTOP,
        );
        self.hw
            .radio
            .enable_interrupts(Interrupts::ADDRESS | Interrupts::DISABLED);
    }

    /// Turns off the radio and everything that could turn it back on.
    pub(crate) fn disable_irq_and_links(&mut self) {
        self.hw.radio.disable_interrupts(Interrupts::all());
        self.hw.radio.set_shorts(Shorts::empty());
        self.hw.radio.trigger(RadioTask::Disable);
        self.hw.ppi.disable(Links::all());
        self.hw.radio.unpend_interrupt();
        self.state = PhyState::Idle;
    }

    /// Waits for a radio that is currently disabling to reach the `Disabled` state.
    pub(crate) fn wait_disabled(&self) {
        let radio = &self.hw.radio;
        if radio.state().is_disabling() {
            spin::wait_while(|| radio.state() != RadioState::Disabled);
        }
    }
}
