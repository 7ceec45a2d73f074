//! The PHY context.
//!
//! A [`Phy`] owns the radio and its auxiliary peripherals and holds all of the driver's runtime
//! state. Its operations are spread over several modules by concern:
//!
//! * [`timing`](../timing/index.html): scheduling radio enables on the coarse and fine counters.
//! * [`xcvr`](../xcvr/index.html): transmit and receive setup, disable.
//! * [`encryption`](../encryption/index.html) and [`privacy`](../privacy/index.html): wiring the
//!   cipher and resolver into the data path.
//! * [`wfr`](../wfr/index.html): the wait-for-response deadline.
//! * [`isr`](../isr/index.html): the radio interrupt handler that drives everything.

use crate::{
    buffers::{Buf, PhyBuffers, RX_OFFSET},
    channel::{self, ChannelDescriptor, NUM_CHANNELS},
    config::{Config, PhyConfig},
    errata::{self, Hook},
    hw::{
        BulkCopy, Cipher, CriticalSection, FineTimer, FrontEnd, Interconnect, Interrupts, Radio,
        RadioState, Resolver,
    },
    link::{RxHeader, Transition},
    mode::{PhyMode, MAX_DATA_PDU_PAYLOAD},
    privacy::Irk,
    stats::PhyStats,
    time::Duration,
    Error,
};
use core::mem;

/// What the PHY is doing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PhyState {
    Idle,
    Rx,
    Tx,
}

/// The peripherals a [`Phy`] programs.
pub struct Hardware<C: Config> {
    pub radio: C::Radio,
    pub timer: C::Timer,
    pub rtc: C::Rtc,
    pub ppi: C::Ppi,
    pub cipher: C::Cipher,
    pub resolver: C::Resolver,
    pub fem: C::FrontEnd,
}

/// The BLE PHY driver.
pub struct Phy<C: Config> {
    pub(crate) hw: Hardware<C>,
    pub(crate) buffers: &'static PhyBuffers,
    pub(crate) config: PhyConfig,
    pub(crate) stats: PhyStats,

    pub(crate) state: PhyState,
    pub(crate) rx_started: bool,

    /// Follow-up of the transmission in progress.
    pub(crate) transition: Transition,

    /// The transition armed in this interrupt could not be scheduled in time.
    pub(crate) transition_late: bool,

    pub(crate) cur_mode: PhyMode,
    pub(crate) tx_mode: PhyMode,
    pub(crate) rx_mode: PhyMode,

    /// Coarse tick at which the fine counter was (or will be) started.
    pub(crate) start_ticks: u32,

    /// Interframe spacing for the next turnaround, in µs.
    pub(crate) tifs: Duration,

    /// Bits between the access address and the PDU header in the current mode.
    pub(crate) bcc_offset: u32,

    pub(crate) rx_header: RxHeader,

    pub(crate) encrypted: bool,
    pub(crate) header_mask: u8,

    /// Header Byte withheld from the cipher by the header mask workaround.
    pub(crate) header_byte: u8,

    pub(crate) privacy: bool,
    pub(crate) irks: &'static [Irk],
    pub(crate) resolver_armed: bool,

    pub(crate) channel: u8,
    access_address: u32,
    tx_power_dbm: i8,
}

impl<C: Config> Phy<C> {
    /// Takes ownership of the peripherals and brings them into a known, idle state.
    ///
    /// The platform is responsible for enabling the radio interrupt (and the cipher interrupt,
    /// when the header mask workaround is in use) and routing them to [`Phy::isr`] and
    /// [`Phy::cipher_isr`].
    pub fn new(mut hw: Hardware<C>, buffers: &'static PhyBuffers, config: PhyConfig) -> Self {
        hw.radio.disable_interrupts(Interrupts::all());
        hw.radio.init();
        hw.radio.set_mode(PhyMode::Le1M);
        errata::apply(config.errata, &mut hw.radio, Hook::Init);

        if config.capabilities.encryption {
            hw.cipher.init();
        }
        if config.capabilities.privacy {
            hw.resolver.init();
            hw.resolver.prepare(&[], buffers.resolver_ptr());
        }

        hw.timer.init();
        hw.ppi.init();
        hw.fem.disable();

        debug!("PHY init: {:?}", config);

        Self {
            hw,
            buffers,
            config,
            stats: PhyStats::default(),
            state: PhyState::Idle,
            rx_started: false,
            transition: Transition::None,
            transition_late: false,
            cur_mode: PhyMode::Le1M,
            tx_mode: PhyMode::Le1M,
            rx_mode: PhyMode::Le1M,
            start_ticks: 0,
            tifs: Duration::T_IFS,
            bcc_offset: 0,
            rx_header: RxHeader::new(),
            encrypted: false,
            header_mask: crate::encryption::HEADER_MASK_DATA,
            header_byte: 0,
            privacy: false,
            irks: &[],
            resolver_armed: false,
            channel: NUM_CHANNELS,
            access_address: 0,
            tx_power_dbm: 0,
        }
    }

    /// Returns a reference to the peripherals.
    pub fn hardware(&self) -> &Hardware<C> {
        &self.hw
    }

    pub fn state(&self) -> PhyState {
        self.state
    }

    /// Returns whether a packet's access address has been received in the current receive window.
    pub fn rx_started(&self) -> bool {
        self.rx_started
    }

    /// Returns the state of the radio itself.
    pub fn xcvr_state(&self) -> RadioState {
        self.hw.radio.state()
    }

    /// Returns the current channel index, or `None` if no channel was set yet.
    pub fn channel(&self) -> Option<u8> {
        if self.channel < NUM_CHANNELS {
            Some(self.channel)
        } else {
            None
        }
    }

    pub fn access_address(&self) -> u32 {
        self.access_address
    }

    /// Returns the largest data channel PDU payload the PHY can handle.
    pub fn max_data_pdu_payload(&self) -> u8 {
        MAX_DATA_PDU_PAYLOAD
    }

    pub fn stats(&self) -> &PhyStats {
        &self.stats
    }

    pub fn config(&self) -> &PhyConfig {
        &self.config
    }

    /// Tunes the radio to a channel.
    ///
    /// Returns `Error::InvalidParam` if the channel index is out of range.
    pub fn set_channel(&mut self, desc: ChannelDescriptor) -> Result<(), Error> {
        let offset = channel::freq_offset(desc.index).ok_or(Error::InvalidParam)?;

        C::Critical::enter(|| {
            self.hw.radio.set_access_address(desc.access_address);
            self.hw.radio.set_crc_init(desc.crc_init);
            self.hw
                .radio
                .set_channel(offset, channel::whitening_iv(desc.index));
        });
        self.access_address = desc.access_address;
        self.channel = desc.index;

        trace!("channel {} aa={:#010x}", desc.index, desc.access_address);
        Ok(())
    }

    /// Sets the modes used for the next transmissions and receptions.
    ///
    /// The radio is switched over lazily, when the next operation is scheduled.
    pub fn mode_set(&mut self, tx: PhyMode, rx: PhyMode) {
        self.tx_mode = tx;
        self.rx_mode = rx;
    }

    /// Returns the mode the radio is currently configured for.
    pub fn mode(&self) -> PhyMode {
        self.cur_mode
    }

    /// Switches the radio to `mode`, if it isn't already.
    ///
    /// # Panics
    ///
    /// Panics if the hardware does not support `mode`.
    pub(crate) fn mode_apply(&mut self, mode: PhyMode) {
        if mode == self.cur_mode {
            return;
        }

        let caps = &self.config.capabilities;
        let supported = match mode {
            PhyMode::Le1M => true,
            PhyMode::Le2M => caps.two_megabit,
            PhyMode::Coded125k | PhyMode::Coded500k => caps.coded,
        };
        assert!(supported, "PHY mode {} not supported", mode);

        errata::apply(
            self.config.errata,
            &mut self.hw.radio,
            Hook::ModeSwitch {
                from: self.cur_mode,
                to: mode,
            },
        );
        self.hw.radio.set_mode(mode);
        self.cur_mode = mode;
        debug!("mode {}", mode);
    }

    /// Overrides the interframe spacing of the next turnaround.
    ///
    /// The override is consumed by the next end of reception or transmission, after which the
    /// spacing reverts to the standard 150 µs.
    pub fn tifs_set(&mut self, tifs: Duration) {
        self.tifs = tifs;
    }

    pub(crate) fn take_tifs(&mut self) -> Duration {
        mem::replace(&mut self.tifs, Duration::T_IFS)
    }

    /// Returns the transmit power level the radio would use for `dbm`.
    ///
    /// This is the highest supported level not above `dbm`, or the lowest supported level.
    pub fn tx_power_round(&self, dbm: i8) -> i8 {
        let levels = self.hw.radio.tx_power_levels();
        levels
            .iter()
            .cloned()
            .find(|&level| level <= dbm)
            .or_else(|| levels.last().cloned())
            .unwrap_or(dbm)
    }

    /// Sets the transmit power, rounded by [`Phy::tx_power_round`]. Returns the level in use.
    pub fn tx_power_set(&mut self, dbm: i8) -> i8 {
        let dbm = self.tx_power_round(dbm);
        self.hw.radio.set_tx_power(dbm);
        self.tx_power_dbm = dbm;
        dbm
    }

    /// Returns the transmit power in dBm.
    pub fn tx_power(&self) -> i8 {
        self.tx_power_dbm
    }

    /// Enters Direct Test Mode, which transmits and receives without data whitening.
    pub fn dtm_enable(&mut self) {
        self.hw.radio.set_whitening(false);
    }

    /// Leaves Direct Test Mode.
    pub fn dtm_disable(&mut self) {
        self.hw.radio.set_whitening(true);
    }

    /// Copies the last received PDU (header and payload) to `dst`.
    ///
    /// Only valid from [`LinkLayer::rx_end`] until the next reception is set up. Returns the number
    /// of Bytes copied.
    ///
    /// # Panics
    ///
    /// Panics if `dst` is too short for the PDU.
    ///
    /// [`LinkLayer::rx_end`]: ../link/trait.LinkLayer.html#tymethod.rx_end
    pub fn rxpdu_copy(&self, dst: &mut [u8]) -> usize {
        self.buffers.read(Buf::Rx, |buf| {
            let pdu = rx_pdu(buf);
            C::Copy::copy(dst, pdu);
            pdu.len()
        })
    }
}

/// Returns the PDU in a receive buffer whose RAM header has been shifted out of the way.
pub(crate) fn rx_pdu(buf: &[u8]) -> &[u8] {
    let start = RX_OFFSET + 1;
    let len = usize::from(buf[start + 1]);
    let end = start + 2 + len;
    debug_assert!(end <= buf.len());
    &buf[start..end]
}
