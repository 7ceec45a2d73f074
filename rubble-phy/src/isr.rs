//! The radio interrupt handler.
//!
//! Everything time-critical happens here. The handler reacts to two radio events:
//!
//! * **ADDRESS**: a packet's access address was received. The PHY timestamps the packet, waits
//!   for its header Byte, arms the address resolver if needed and asks the Link-Layer whether to
//!   keep receiving.
//! * **DISABLED**: the radio finished an operation. After a reception, the packet is checked and
//!   handed to the Link-Layer, with a response already armed. After a transmission, the
//!   transition requested with the packet is armed. A receiver disabled before any packet started
//!   means the wait-for-response deadline expired.
//!
//! Follow-up operations are always timed from counter values captured by hardware at the end (or
//! start) of the previous packet, so interrupt latency does not matter as long as the handler
//! finishes before the follow-up's start time.

use crate::{
    buffers::{Buf, RX_OFFSET},
    config::Config,
    hw::{
        Cc, Cipher, FineTimer, FrontEnd, Interconnect, Interrupts, Links, Radio, RadioEvent,
        RadioState, RadioTask, Resolver, ResolverOutcome, Shorts,
    },
    link::{Anchor, LinkLayer, RxFlags, RxHeader, Transition, Verdict},
    mode::{PhyMode, RAMP_UP_US},
    phy::{rx_pdu, Phy, PhyState},
    spin, stats,
    time::{micros_to_ticks, ticks_to_micros, TimeTarget, TICK_MICROS},
    timing::Dir,
    wfr::Wfr,
};
use core::mem;

/// Allowed active clock drift on a turnaround, in µs. The receiver is enabled this much early.
const CLOCK_ACCURACY_US: u32 = 2;

impl<C: Config> Phy<C> {
    /// Radio interrupt handler.
    ///
    /// Must be called from the radio interrupt. All [`LinkLayer`] callbacks are made from here.
    ///
    /// [`LinkLayer`]: ../link/trait.LinkLayer.html
    pub fn isr<L: LinkLayer<C>>(&mut self, ll: &mut L) {
        let mut irqs = self.hw.radio.enabled_interrupts();

        // ADDRESS first: the wait-for-response deadline may disable the radio right as a packet
        // starts, latching both events.
        if irqs.contains(Interrupts::ADDRESS) && self.hw.radio.event(RadioEvent::Address) {
            if self.rx_start_isr(ll) {
                irqs.remove(Interrupts::DISABLED);
            }
        }

        if irqs.contains(Interrupts::DISABLED) && self.hw.radio.event(RadioEvent::Disabled) {
            debug_assert!(
                self.hw.radio.event(RadioEvent::End)
                    || (self.state == PhyState::Rx && !self.rx_started),
                "radio disabled mid-packet"
            );

            self.hw.radio.clear_event(RadioEvent::End);
            self.hw.radio.clear_event(RadioEvent::Disabled);
            self.hw.radio.disable_interrupts(Interrupts::DISABLED);

            match self.state {
                PhyState::Rx => {
                    self.hw.fem.disable();
                    if self.rx_started {
                        self.rx_end_isr(ll);
                    } else {
                        debug!("wfr expired");
                        self.disable();
                        ll.wfr_expired(self);
                    }
                }
                PhyState::Tx => {
                    self.hw.fem.disable();
                    self.tx_end_isr(ll);
                }
                PhyState::Idle => debug_assert!(false, "radio disabled while PHY idle"),
            }
        }

        self.transition_late = false;
        stats::inc(&mut self.stats.isrs);
    }

    /// Handles the start of a received packet.
    ///
    /// Returns `false` if the radio was disabled before the PDU header arrived, in which case the
    /// DISABLED event has to be handled as a timeout.
    fn rx_start_isr<L: LinkLayer<C>>(&mut self, ll: &mut L) -> bool {
        self.hw.radio.clear_event(RadioEvent::Address);
        self.hw.radio.disable_interrupts(Interrupts::ADDRESS);
        self.hw.ppi.disable(Links::WFR);

        let phy_mode = self.rx_phy_mode();
        let mut header = RxHeader {
            channel: self.channel,
            phy: phy_mode.phy(),
            phy_mode,
            start: self.rx_start_time(phy_mode),
            rssi: 0,
            flags: RxFlags::empty(),
            resolved: ResolverOutcome::NotAttempted,
        };

        // The header Byte arrives within a few µs of ADDRESS (up to 18 µs on Coded PHY).
        let radio = &self.hw.radio;
        let settled = spin::wait_while(|| {
            !radio.event(RadioEvent::BcMatch) && radio.state() != RadioState::Disabled
        });
        if !self.hw.radio.event(RadioEvent::BcMatch) {
            if settled {
                // Disabled by the wfr deadline in the meantime.
                self.hw.radio.disable_interrupts(Interrupts::all());
                self.hw.radio.set_shorts(Shorts::empty());
                return false;
            }

            warn!("rx start: header never arrived");
            self.disable();
            ll.wfr_expired(self);
            return true;
        }

        let bufs = self.buffers;
        let pdu_header = bufs.read_volatile(Buf::Rx, RX_OFFSET);
        if self.arm_resolver(pdu_header) {
            header.resolved = ResolverOutcome::Pending;
        }

        let verdict = bufs.read(Buf::Rx, |buf| {
            ll.rx_start(self, &buf[RX_OFFSET..], &mut header)
        });
        self.rx_header = header;

        match verdict {
            Verdict::Continue => self.rx_started = true,
            Verdict::Abort => {
                debug!("rx aborted by link layer");
                self.disable();
                stats::inc(&mut self.stats.rx_aborts);
            }
        }
        stats::inc(&mut self.stats.rx_starts);
        true
    }

    /// Handles the end of a received packet.
    fn rx_end_isr<L: LinkLayer<C>>(&mut self, ll: &mut L) {
        self.hw.ppi.disable(Links::TIMER_RXEN);

        let mut header = self.rx_header;
        debug_assert!(self.hw.radio.event(RadioEvent::RssiEnd));
        header.rssi = -(self.hw.radio.rssi_sample().min(127) as i8);

        let bufs = self.buffers;
        if self.hw.radio.event(RadioEvent::CrcOk) {
            stats::inc(&mut self.stats.rx_valid);
            header.flags.insert(RxFlags::CRC_OK);

            if self.encrypted {
                let cipher = &self.hw.cipher;
                let finished = spin::wait_while(|| !cipher.crypt_done());

                let len = bufs.read_volatile(Buf::Rx, RX_OFFSET + 1);
                if finished && len != 0 && !self.hw.cipher.mic_ok() {
                    header.flags.insert(RxFlags::MIC_FAILURE);
                }
                if !finished || self.hw.cipher.error() {
                    warn!("rx: cipher error");
                    stats::inc(&mut self.stats.rx_hw_err);
                    header.flags.remove(RxFlags::CRC_OK);
                }
            }
        } else {
            stats::inc(&mut self.stats.rx_crc_err);
        }

        if self.resolver_armed {
            header.resolved = self.hw.resolver.outcome();
        }
        self.rx_header = header;

        // Arm the response now and let the Link-Layer cancel it. On Coded PHY, processing the
        // packet can take about as long as the whole turnaround.
        self.mode_apply(self.tx_mode);
        let tifs = self.take_tifs();
        let tx_time = self
            .hw
            .timer
            .cc(Cc::END)
            .wrapping_add(tifs.as_micros())
            .wrapping_sub(header.phy_mode.timing().rx_end_delay);
        if self.arm_turnaround(Dir::Tx, tx_time) {
            warn!("rx end: response missed");
            self.hw.ppi.disable(Links::TIMER_TXEN);
            self.transition_late = true;
        }

        // Move the PDU header over S1, so header, length and payload are contiguous.
        bufs.with(Buf::Rx, |buf| {
            buf[RX_OFFSET + 2] = buf[RX_OFFSET + 1];
            buf[RX_OFFSET + 1] = buf[RX_OFFSET];
        });

        trace!("rx end {:?}", header);
        let verdict = bufs.read(Buf::Rx, |buf| ll.rx_end(self, rx_pdu(buf), &header));
        match verdict {
            Verdict::Abort => self.disable(),
            Verdict::Continue => {
                // Neither a response nor a new reception was set up.
                if self.state == PhyState::Rx && self.rx_started {
                    debug!("rx end: nothing queued, going idle");
                    self.disable();
                }
            }
        }
    }

    /// Handles the end of a transmission by arming its transition.
    fn tx_end_isr<L: LinkLayer<C>>(&mut self, ll: &mut L) {
        debug_assert_eq!(self.state, PhyState::Tx);

        let tx_mode = self.cur_mode;
        let timing = tx_mode.timing();

        if self.encrypted && self.hw.cipher.error() {
            warn!("tx: cipher error");
            stats::inc(&mut self.stats.tx_hw_err);
            self.hw.cipher.clear_error();
        }

        let tifs = self.take_tifs();
        let end = self.hw.timer.cc(Cc::END);

        match mem::take(&mut self.transition) {
            Transition::TxToRx => {
                self.mode_apply(self.rx_mode);
                self.rx_xcvr_setup();
                self.wfr_enable(Wfr::TxRx { tx_mode, tifs });

                let rx_time = end
                    .wrapping_add(tifs.as_micros())
                    .wrapping_add(timing.tx_end_delay)
                    .wrapping_sub(CLOCK_ACCURACY_US);
                if self.arm_turnaround(Dir::Rx, rx_time) {
                    // Enable the receiver by hand; the wfr deadline still closes the window.
                    warn!("tx end: rx turnaround missed");
                    self.hw.ppi.disable(Links::TIMER_RXEN);
                    self.transition_late = true;
                    stats::inc(&mut self.stats.rx_late);
                    self.hw.radio.trigger(RadioTask::RxEn);
                }
            }
            Transition::TxToTx(spacing) => {
                let anchor = match spacing.anchor {
                    Anchor::TxEnd => end.wrapping_add(timing.tx_end_delay),
                    Anchor::TxStart => self
                        .hw
                        .timer
                        .cc(Cc::ADDRESS)
                        .wrapping_add(timing.tx_addr_delay)
                        .wrapping_sub(timing.pdu_start_offset),
                };

                if self.arm_turnaround(Dir::Tx, anchor.wrapping_add(spacing.spacing.as_micros())) {
                    warn!("tx end: tx turnaround missed");
                    self.hw.ppi.disable(Links::TIMER_TXEN);
                    self.transition_late = true;
                }
            }
            Transition::None => {
                self.stop_fine_timer();
                self.hw.ppi.disable(Links::all());
                self.state = PhyState::Idle;
            }
        }

        ll.tx_end(self);
    }

    /// Arms a radio enable on the running fine counter, for a packet to start on air at
    /// `air_time` (µs).
    ///
    /// Returns whether the counter has already passed the enable (or front-end) compare value.
    fn arm_turnaround(&mut self, dir: Dir, air_time: u32) -> bool {
        let (link, radio_time, fem_on, scratch) = match dir {
            Dir::Tx => (
                Links::TIMER_TXEN,
                air_time.wrapping_sub(self.cur_mode.timing().tx_delay + RAMP_UP_US),
                self.hw.fem.pa_turn_on_us(),
                Cc::WFR,
            ),
            // The wfr deadline is armed in compare 3, so capture into compare 1 instead.
            Dir::Rx => (
                Links::TIMER_RXEN,
                air_time.wrapping_sub(RAMP_UP_US),
                self.hw.fem.lna_turn_on_us(),
                Cc::ADDRESS,
            ),
        };

        self.safely_reset(Cc::START);
        self.hw.ppi.enable(link);
        self.hw.timer.set_cc(Cc::START, radio_time);

        let mut missed = false;
        if let Some(on) = fem_on {
            self.safely_reset(Cc::FEM);
            match dir {
                Dir::Tx => self.hw.fem.enable_pa(),
                Dir::Rx => self.hw.fem.enable_lna(),
            }
            self.hw.timer.set_cc(Cc::FEM, air_time.wrapping_sub(on));
            missed = self.did_miss(Cc::FEM, scratch);
        }

        missed || self.did_miss(Cc::START, scratch)
    }

    /// Returns the mode of the packet being received, including its coding on Coded PHY.
    fn rx_phy_mode(&self) -> PhyMode {
        if !self.cur_mode.is_coded() {
            self.cur_mode
        } else if self.hw.radio.coded_s2() {
            PhyMode::Coded500k
        } else {
            PhyMode::Coded125k
        }
    }

    /// Computes when the first bit of the packet being received was on air.
    ///
    /// The ADDRESS capture counts from the start of the fine counter, which was started at
    /// `start_ticks`. The packet may have started before the counter did, in which case the
    /// reference is moved back a tick.
    fn rx_start_time(&self, phy_mode: PhyMode) -> TimeTarget {
        let timing = phy_mode.timing();
        let pdu_us = timing.pdu_start_offset + timing.rx_addr_delay;

        let mut ticks = self.start_ticks;
        let mut us = self.hw.timer.cc(Cc::ADDRESS);
        if us < pdu_us {
            ticks = ticks.wrapping_sub(1);
            us += TICK_MICROS;
        }
        let us = us.saturating_sub(pdu_us);

        let mut whole = micros_to_ticks(us);
        let mut rem = us - ticks_to_micros(whole);
        if rem > TICK_MICROS {
            rem = 0;
            whole += 1;
        }

        TimeTarget::new(ticks.wrapping_add(whole), rem as u8)
    }
}
