//! Integrated 2.4 GHz radio in BLE mode.
//!
//! The radio works with a flexible frame layout that looks like this on air:
//!
//! (B = Byte = Octet; b = bit = symbol)
//!
//! ```notrust
//! +----------+---------+--------+---------+----------+----------+--------------+---------+
//! | Preamble |  Base   | Prefix |   S0    |  Length  |    S1    |   Payload    |   CRC   |
//! | (1-10 B) | (2-4 B) | (1 B)  | (0-1 B) | (0-15 b) | (0-15 b) | (`Length` B) | (0-3 B) |
//! +----------+---------+--------+---------+----------+----------+--------------+---------+
//!             \                / \                                            /
//!              \------+-------/   \---------------------+--------------------/
//!                     |                                 |
//!                  Address                             PDU
//! ```
//!
//! The PHY uses an 8-bit S0 holding the first header Byte, an 8-bit Length, and a 0-bit S1 that is
//! still included in RAM. Every packet in RAM thus starts with a 3-Byte header (S0, Length, S1)
//! and the payload follows at offset 3.

use crate::pac::{Interrupt, RADIO};
use core::ptr;
use cortex_m::peripheral::NVIC;
use rubble_phy::{
    hw::{Interrupts, Radio, RadioEvent, RadioState, RadioTask, Shorts},
    mode::PhyMode,
    time::Duration,
};

/// CRC polynomial used by BLE: x^24 + x^10 + x^9 + x^6 + x^4 + x^3 + x + 1.
const CRC_POLY: u32 = 0x0000_065b;

// PCNF0
const LFLEN_8: u32 = 8;
const S0LEN_1: u32 = 1 << 8;
const S1INCL: u32 = 1 << 20;
const CILEN_2: u32 = 2 << 22;
const PLEN_8BIT: u32 = 0 << 24;
const PLEN_16BIT: u32 = 1 << 24;
const PLEN_LONG_RANGE: u32 = 3 << 24;
const TERMLEN_3: u32 = 3 << 29;

// PCNF1
const MAXLEN_255: u32 = 255;
const BALEN_3: u32 = 3 << 16;
const WHITEEN: u32 = 1 << 25;

// CRCCNF: 3-Byte CRC over the PDU only.
const CRCCNF_BLE: u32 = 3 | (1 << 8);

// MODECNF0: fast ramp-up, center bit on idle.
const MODECNF0_BLE: u32 = 1 | (2 << 8);

#[cfg(feature = "52840")]
const TX_POWER_LEVELS: &[i8] = &[8, 7, 6, 5, 4, 3, 2, 0, -4, -8, -12, -16, -20, -40];

#[cfg(feature = "52832")]
const TX_POWER_LEVELS: &[i8] = &[4, 3, 0, -4, -8, -12, -16, -20, -40];

/// The nRF52 radio.
pub struct BleRadio {
    radio: RADIO,
}

impl BleRadio {
    pub fn new(radio: RADIO) -> Self {
        Self { radio }
    }

    fn base(&self) -> *mut u8 {
        RADIO::ptr() as *mut u8
    }
}

impl Radio for BleRadio {
    fn init(&mut self) {
        let r = &self.radio;
        unsafe {
            r.pcnf0.write(|w| w.bits(pcnf0(PhyMode::Le1M)));
            r.pcnf1.write(|w| w.bits(MAXLEN_255 | BALEN_3 | WHITEEN));
            r.crccnf.write(|w| w.bits(CRCCNF_BLE));
            r.crcpoly.write(|w| w.bits(CRC_POLY));
            r.modecnf0.write(|w| w.bits(MODECNF0_BLE));
            r.tifs.write(|w| w.bits(Duration::T_IFS.as_micros()));

            // Logical address 0 (BASE0 + PREFIX0.AP0) for both directions
            r.txaddress.write(|w| w.bits(0));
            r.rxaddresses.write(|w| w.bits(1));
        }
    }

    fn trigger(&mut self, task: RadioTask) {
        let r = &self.radio;
        unsafe {
            match task {
                RadioTask::TxEn => r.tasks_txen.write(|w| w.bits(1)),
                RadioTask::RxEn => r.tasks_rxen.write(|w| w.bits(1)),
                RadioTask::Start => r.tasks_start.write(|w| w.bits(1)),
                RadioTask::Disable => r.tasks_disable.write(|w| w.bits(1)),
            }
        }
    }

    fn event(&self, event: RadioEvent) -> bool {
        let r = &self.radio;
        let bits = match event {
            RadioEvent::Ready => r.events_ready.read().bits(),
            RadioEvent::Address => r.events_address.read().bits(),
            RadioEvent::End => r.events_end.read().bits(),
            RadioEvent::Disabled => r.events_disabled.read().bits(),
            RadioEvent::DevMatch => r.events_devmatch.read().bits(),
            RadioEvent::BcMatch => r.events_bcmatch.read().bits(),
            RadioEvent::RssiEnd => r.events_rssiend.read().bits(),
            RadioEvent::CrcOk => r.events_crcok.read().bits(),
        };
        bits != 0
    }

    fn clear_event(&mut self, event: RadioEvent) {
        let r = &self.radio;
        match event {
            RadioEvent::Ready => r.events_ready.reset(),
            RadioEvent::Address => r.events_address.reset(),
            RadioEvent::End => r.events_end.reset(),
            RadioEvent::Disabled => r.events_disabled.reset(),
            RadioEvent::DevMatch => r.events_devmatch.reset(),
            RadioEvent::BcMatch => r.events_bcmatch.reset(),
            RadioEvent::RssiEnd => r.events_rssiend.reset(),
            RadioEvent::CrcOk => r.events_crcok.reset(),
        }
    }

    fn set_shorts(&mut self, shorts: Shorts) {
        self.radio.shorts.write(|w| unsafe { w.bits(shorts.bits()) });
    }

    fn enable_interrupts(&mut self, irqs: Interrupts) {
        self.radio.intenset.write(|w| unsafe { w.bits(irqs.bits()) });
    }

    fn disable_interrupts(&mut self, irqs: Interrupts) {
        self.radio.intenclr.write(|w| unsafe { w.bits(irqs.bits()) });
    }

    fn enabled_interrupts(&self) -> Interrupts {
        Interrupts::from_bits_truncate(self.radio.intenset.read().bits())
    }

    fn unpend_interrupt(&mut self) {
        NVIC::unpend(Interrupt::RADIO);
    }

    fn state(&self) -> RadioState {
        RadioState::from_raw(self.radio.state.read().bits() as u8)
    }

    fn set_packet_ptr(&mut self, ptr: *const u8) {
        self.radio.packetptr.write(|w| unsafe { w.bits(ptr as u32) });
    }

    fn set_bit_counter(&mut self, bits: u32) {
        self.radio.bcc.write(|w| unsafe { w.bits(bits) });
    }

    fn set_channel(&mut self, freq_offset: u8, whitening_iv: u8) {
        unsafe {
            self.radio
                .frequency
                .write(|w| w.bits(u32::from(freq_offset)));
            self.radio
                .datawhiteiv
                .write(|w| w.bits(u32::from(whitening_iv)));
        }
    }

    fn set_access_address(&mut self, access_address: u32) {
        // BASE0 ignores its lowest 8 bits and sends the upper 24 as the low 24 bits of the access
        // address. The prefix supplies the top Byte.
        unsafe {
            self.radio.base0.write(|w| w.bits(access_address << 8));
            self.radio
                .prefix0
                .modify(|r, w| w.bits((r.bits() & !0xff) | (access_address >> 24)));
        }
    }

    fn set_crc_init(&mut self, crc_init: u32) {
        self.radio
            .crcinit
            .write(|w| unsafe { w.bits(crc_init & 0x00ff_ffff) });
    }

    fn set_mode(&mut self, mode: PhyMode) {
        let raw = match mode {
            PhyMode::Le1M => 3,
            PhyMode::Le2M => 4,
            PhyMode::Coded125k => 5,
            PhyMode::Coded500k => 6,
        };
        unsafe {
            self.radio.mode.write(|w| w.bits(raw));
            self.radio.pcnf0.write(|w| w.bits(pcnf0(mode)));
        }
    }

    fn set_whitening(&mut self, enabled: bool) {
        self.radio.pcnf1.modify(|r, w| unsafe {
            if enabled {
                w.bits(r.bits() | WHITEEN)
            } else {
                w.bits(r.bits() & !WHITEEN)
            }
        });
    }

    fn set_tx_power(&mut self, dbm: i8) {
        // TXPOWER takes the two's complement dBm value.
        self.radio
            .txpower
            .write(|w| unsafe { w.bits(u32::from(dbm as u8)) });
    }

    fn tx_power_levels(&self) -> &'static [i8] {
        TX_POWER_LEVELS
    }

    fn rssi_sample(&self) -> u8 {
        (self.radio.rssisample.read().bits() & 0x7f) as u8
    }

    #[cfg(feature = "52840")]
    fn coded_s2(&self) -> bool {
        // PDUSTAT.CISTAT: 0 = S8, 1 = S2
        (self.radio.pdustat.read().bits() >> 1) & 0b11 == 1
    }

    #[cfg(feature = "52832")]
    fn coded_s2(&self) -> bool {
        false
    }

    fn read_raw(&self, offset: usize) -> u32 {
        unsafe { ptr::read_volatile(self.base().add(offset) as *const u32) }
    }

    fn write_raw(&mut self, offset: usize, value: u32) {
        unsafe { ptr::write_volatile(self.base().add(offset) as *mut u32, value) }
    }
}

fn pcnf0(mode: PhyMode) -> u32 {
    let framing = match mode {
        PhyMode::Le1M => PLEN_8BIT,
        PhyMode::Le2M => PLEN_16BIT,
        PhyMode::Coded125k | PhyMode::Coded500k => PLEN_LONG_RANGE | CILEN_2 | TERMLEN_3,
    };
    LFLEN_8 | S0LEN_1 | S1INCL | framing
}
