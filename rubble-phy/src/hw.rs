//! Hardware interfaces the PHY programs.
//!
//! These traits model a radio peripheral plus the timers, event interconnect and crypto blocks
//! around it at the register level: each method corresponds to one register access or task
//! trigger. The PHY does all sequencing itself; implementations should not add any.
//!
//! Bit positions of [`Shorts`] and [`Interrupts`] match the nRF5x register layout, so platform
//! implementations can write them straight through.
//!
//! Methods that hand out buffer addresses take raw pointers. The peripherals access those buffers
//! by DMA behind the compiler's back, which is why the PHY keeps them in [`PhyBuffers`].
//!
//! [`PhyBuffers`]: ../buffers/struct.PhyBuffers.html

use crate::{mode::PhyMode, privacy::Irk};
use bitflags::bitflags;

/// Radio events the PHY inspects.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RadioEvent {
    /// Ramp-up done.
    Ready,
    /// Access address sent or received.
    Address,
    /// Packet sent or received.
    End,
    /// Radio has been disabled.
    Disabled,
    /// Device address match.
    DevMatch,
    /// Bit counter reached its compare value.
    BcMatch,
    /// RSSI sample ready.
    RssiEnd,
    /// Received packet had a valid CRC.
    CrcOk,
}

/// Radio tasks the PHY triggers directly.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RadioTask {
    TxEn,
    RxEn,
    Start,
    Disable,
}

/// Radio state machine states.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RadioState {
    Disabled = 0,
    RxRu = 1,
    RxIdle = 2,
    Rx = 3,
    RxDisable = 4,
    TxRu = 9,
    TxIdle = 10,
    Tx = 11,
    TxDisable = 12,
}

impl RadioState {
    /// Decodes the raw state register value.
    ///
    /// Unknown values map to `Disabled`.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => RadioState::RxRu,
            2 => RadioState::RxIdle,
            3 => RadioState::Rx,
            4 => RadioState::RxDisable,
            9 => RadioState::TxRu,
            10 => RadioState::TxIdle,
            11 => RadioState::Tx,
            12 => RadioState::TxDisable,
            _ => RadioState::Disabled,
        }
    }

    /// Returns whether the radio is idling after ramp-up, in either direction.
    ///
    /// The radio can be switched to receive from both idle states.
    pub fn is_idle(self) -> bool {
        self == RadioState::RxIdle || self == RadioState::TxIdle
    }

    /// Returns whether the radio is on its way to `Disabled`.
    pub fn is_disabling(self) -> bool {
        self == RadioState::RxDisable || self == RadioState::TxDisable
    }
}

bitflags! {
    /// Radio shortcuts (hardware task-on-event links inside the radio).
    pub struct Shorts: u32 {
        const READY_START = 1 << 0;
        const END_DISABLE = 1 << 1;
        const ADDRESS_RSSISTART = 1 << 4;
        const ADDRESS_BCSTART = 1 << 6;
        const DISABLED_RSSISTOP = 1 << 8;
    }
}

bitflags! {
    /// Radio interrupt sources.
    pub struct Interrupts: u32 {
        const READY = 1 << 0;
        const ADDRESS = 1 << 1;
        const END = 1 << 3;
        const DISABLED = 1 << 4;
        const BCMATCH = 1 << 10;
    }
}

bitflags! {
    /// Interconnect links between peripherals, owned by the PHY.
    ///
    /// The links "ADDRESS captures fine counter channel 1" and "END captures fine counter
    /// channel 2" are always on and not part of this set.
    pub struct Links: u32 {
        /// Fine counter compare 0 triggers radio TXEN.
        const TIMER_TXEN = 1 << 0;
        /// Fine counter compare 0 triggers radio RXEN.
        const TIMER_RXEN = 1 << 1;
        /// Radio BCMATCH starts the address resolver.
        const BCMATCH_RESOLVER = 1 << 2;
        /// Radio ADDRESS starts the cipher.
        const ADDRESS_CRYPT = 1 << 3;
        /// Coarse counter compare starts the fine counter.
        const RTC_TIMER_START = 1 << 4;
        /// Wait-for-response: radio ADDRESS captures fine counter channel 3, and a compare match
        /// on channel 3 disables the radio.
        const WFR = 1 << 5;
    }
}

/// A fine counter capture/compare channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Cc(pub u8);

impl Cc {
    /// Radio enable time.
    pub const START: Self = Cc(0);
    /// Captured on radio ADDRESS.
    pub const ADDRESS: Self = Cc(1);
    /// Captured on radio END.
    pub const END: Self = Cc(2);
    /// Front-end enable time. Shares the END channel, which is only captured after it fired.
    pub const FEM: Self = Cc(2);
    /// Wait-for-response deadline, and capture of ADDRESS while that deadline is armed.
    pub const WFR: Self = Cc(3);
}

/// The radio transceiver.
pub trait Radio {
    /// Applies the fixed configuration: little-endian packet layout with an 8-bit length field,
    /// 3-Byte CRC skipping the address with the BLE polynomial, whitening, fast ramp-up, T_IFS
    /// and logical address 0 for TX and RX.
    fn init(&mut self);

    fn trigger(&mut self, task: RadioTask);
    fn event(&self, event: RadioEvent) -> bool;
    fn clear_event(&mut self, event: RadioEvent);

    fn set_shorts(&mut self, shorts: Shorts);
    fn enable_interrupts(&mut self, irqs: Interrupts);
    fn disable_interrupts(&mut self, irqs: Interrupts);
    fn enabled_interrupts(&self) -> Interrupts;

    /// Clears a pending radio interrupt at the interrupt controller.
    fn unpend_interrupt(&mut self);

    fn state(&self) -> RadioState;

    /// Sets the address the radio reads from (TX) or writes to (RX) via DMA.
    fn set_packet_ptr(&mut self, ptr: *const u8);

    /// Sets the bit counter compare value, counted from the end of the access address.
    fn set_bit_counter(&mut self, bits: u32);

    /// Tunes to `freq_offset` MHz above 2400 MHz and sets the whitening IV.
    fn set_channel(&mut self, freq_offset: u8, whitening_iv: u8);
    fn set_access_address(&mut self, access_address: u32);
    fn set_crc_init(&mut self, crc_init: u32);

    /// Switches the data rate and packet framing for `mode`.
    fn set_mode(&mut self, mode: PhyMode);
    fn set_whitening(&mut self, enabled: bool);

    /// Sets output power. `dbm` is always one of [`Radio::tx_power_levels`].
    fn set_tx_power(&mut self, dbm: i8);

    /// Output power levels supported by the radio, in descending order.
    fn tx_power_levels(&self) -> &'static [i8];

    /// Last RSSI sample, as a positive number of dB below 0 dBm.
    fn rssi_sample(&self) -> u8;

    /// Whether the last received Coded PHY packet used S=2 coding.
    fn coded_s2(&self) -> bool;

    /// Reads a radio register by its offset from the peripheral base.
    fn read_raw(&self, offset: usize) -> u32;

    /// Writes a radio register by its offset from the peripheral base.
    fn write_raw(&mut self, offset: usize, value: u32);
}

/// The 1 MHz, 32-bit fine counter.
pub trait FineTimer {
    /// Configures 32-bit timer mode at 1 MHz and stops the timer.
    fn init(&mut self);

    fn clear(&mut self);

    /// Stops the counter and powers it down.
    fn stop(&mut self);

    /// Triggers a capture of the current count into `cc`.
    fn capture(&mut self, cc: Cc);

    fn cc(&self, cc: Cc) -> u32;
    fn set_cc(&mut self, cc: Cc, value: u32);
    fn event(&self, cc: Cc) -> bool;
    fn clear_event(&mut self, cc: Cc);
}

/// The 32.768 kHz, 24-bit coarse counter.
pub trait CoarseCounter {
    /// Raw 24-bit counter value.
    fn counter(&self) -> u32;

    /// Current time in ticks, extended to 32 bits by the platform.
    fn now(&self) -> u32;

    fn compare(&self) -> u32;
    fn set_compare(&mut self, value: u32);
    fn clear_compare_event(&mut self);

    /// Routes the compare event to the interconnect.
    fn enable_compare_event(&mut self);
    fn disable_compare_event(&mut self);
}

/// The programmable event interconnect.
pub trait Interconnect {
    /// Assigns all channels, enables the always-on capture links and disables everything in
    /// [`Links`].
    fn init(&mut self);

    fn enable(&mut self, links: Links);
    fn disable(&mut self, links: Links);
}

/// Direction of a cipher operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CipherOp {
    Encrypt,
    Decrypt,
}

/// Buffers handed to the cipher for one packet.
#[derive(Debug, Copy, Clone)]
pub struct CipherJob {
    pub config: *const u8,
    pub input: *const u8,
    pub output: *mut u8,
    pub scratch: *mut u32,
}

/// The inline AES-CCM engine.
pub trait Cipher {
    /// Disables all cipher interrupts and shortcuts, then clears the error latch.
    fn init(&mut self);

    fn enable(&mut self);

    /// Stops any running operation, clears the error latch and disables the block.
    fn disable(&mut self);

    /// Sets up one packet. Clears the error and ENDCRYPT latches.
    ///
    /// Encryption chains key-stream generation into encryption with the ENDKSGEN→CRYPT shortcut.
    /// Decryption clears that shortcut: it is started by the radio through
    /// [`Links::ADDRESS_CRYPT`] once the ciphertext starts arriving.
    fn configure(&mut self, op: CipherOp, mode: PhyMode, job: CipherJob);

    /// Starts key-stream generation.
    fn start_keystream(&mut self);

    fn set_header_mask(&mut self, mask: u8);

    fn keystream_done(&self) -> bool;
    fn clear_keystream_done(&mut self);
    fn enable_keystream_interrupt(&mut self);
    fn disable_keystream_interrupt(&mut self);

    fn crypt_done(&self) -> bool;
    fn mic_ok(&self) -> bool;
    fn error(&self) -> bool;
    fn clear_error(&mut self);
}

/// Result of resolving the advertiser address of a received packet.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResolverOutcome {
    /// Resolution was not started for this packet.
    NotAttempted,
    /// Resolution was started but had not finished when the packet ended.
    Pending,
    /// The address was generated from the identity resolving key at this index.
    Resolved(u8),
    /// None of the keys matched.
    NotResolved,
}

/// The resolvable private address resolver.
pub trait Resolver {
    /// Disables resolver interrupts and clears its events.
    fn init(&mut self);

    fn enable(&mut self);
    fn disable(&mut self);

    /// Installs the key table and scratch area, and clears the result events.
    fn prepare(&mut self, irks: &'static [Irk], scratch: *mut u32);

    /// Sets the address of the packet holding the device address to resolve.
    ///
    /// `ptr` points at the 3-Byte RAM header (S0, LENGTH, S1) that precedes the address, as laid
    /// out by the radio.
    fn set_address_ptr(&mut self, ptr: *const u8);

    fn outcome(&self) -> ResolverOutcome;
}

/// An external RF front-end module.
pub trait FrontEnd {
    /// Power amplifier turn-on time in µs, if there is one.
    fn pa_turn_on_us(&self) -> Option<u32>;

    /// Low-noise amplifier turn-on time in µs, if there is one.
    fn lna_turn_on_us(&self) -> Option<u32>;

    /// Links fine counter channel [`Cc::FEM`] to the PA enable.
    fn enable_pa(&mut self);

    /// Links fine counter channel [`Cc::FEM`] to the LNA enable.
    fn enable_lna(&mut self);

    /// Turns both amplifiers off and unlinks them.
    fn disable(&mut self);
}

/// A platform without a front-end module.
#[derive(Debug, Default)]
pub struct NoFrontEnd;

impl FrontEnd for NoFrontEnd {
    fn pa_turn_on_us(&self) -> Option<u32> {
        None
    }

    fn lna_turn_on_us(&self) -> Option<u32> {
        None
    }

    fn enable_pa(&mut self) {}
    fn enable_lna(&mut self) {}
    fn disable(&mut self) {}
}

/// Bulk memory copy.
pub trait BulkCopy {
    /// Copies `src` into the start of `dst`.
    ///
    /// # Panics
    ///
    /// Panics when `dst` is shorter than `src`.
    fn copy(dst: &mut [u8], src: &[u8]) {
        dst[..src.len()].copy_from_slice(src);
    }
}

/// Copies through `copy_from_slice`.
#[derive(Debug)]
pub struct SliceCopy;

impl BulkCopy for SliceCopy {}

/// Runs code with the radio interrupt masked.
pub trait CriticalSection {
    fn enter<R>(f: impl FnOnce() -> R) -> R;
}
