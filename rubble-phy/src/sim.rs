//! A register-level model of the PHY's peripherals, for unit tests.
//!
//! The model does not run on its own: tests drive it by moving the counters and latching the
//! events the real hardware would produce, then call into the PHY and inspect the resulting
//! register state.

use crate::{
    buffers::PhyBuffers,
    config::{Config, PhyConfig},
    hw::*,
    mode::PhyMode,
    phy::{Hardware, Phy},
    privacy::Irk,
    time::COARSE_MASK,
};
use core::cell::{Cell, RefCell};
use heapless::Vec;

std::thread_local! {
    static MASK_DEPTH: Cell<u32> = Cell::new(0);
    static UNMASKED_WRITES: Cell<u32> = Cell::new(0);
}

/// Counts a timing-relevant register write made with the radio interrupt unmasked.
fn note_write() {
    if MASK_DEPTH.with(Cell::get) == 0 {
        UNMASKED_WRITES.with(|w| w.set(w.get() + 1));
    }
}

const RADIO_EVENTS: usize = 8;
const RAW_REGS: usize = 0x1000 / 4;

const NRF52840_TX_POWER: &[i8] = &[8, 7, 6, 5, 4, 3, 2, 0, -4, -8, -12, -16, -20, -40];

struct RadioModel {
    events: [bool; RADIO_EVENTS],
    tasks: Vec<RadioTask, 64>,
    state: RadioState,
    shorts: Shorts,
    interrupts: Interrupts,
    packet_ptr: usize,
    bit_counter: u32,
    frequency: (u8, u8),
    mode: PhyMode,
    whitening: bool,
    tx_power: i8,
    rssi: u8,
    coded_s2: bool,
    raw: [u32; RAW_REGS],
}

struct TimerModel {
    now: u32,
    cc: [u32; 4],
    events: [bool; 4],
    stopped: bool,
}

struct RtcModel {
    now: u32,
    compare: u32,
    event_enabled: bool,
}

struct CipherModel {
    enabled: bool,
    job: Option<(CipherOp, CipherJob)>,
    keystream_started: bool,
    keystream_chained: bool,
    keystream_done: bool,
    keystream_irq: bool,
    header_mask: Option<u8>,
    crypt_done: bool,
    mic_ok: bool,
    error: bool,
}

struct ResolverModel {
    enabled: bool,
    irks: usize,
    address_ptr: usize,
    outcome: ResolverOutcome,
}

struct FrontEndModel {
    pa_turn_on: Option<u32>,
    lna_turn_on: Option<u32>,
    pa: bool,
    lna: bool,
}

struct State {
    radio: RadioModel,
    timer: TimerModel,
    rtc: RtcModel,
    links: Links,
    cipher: CipherModel,
    resolver: ResolverModel,
    fem: FrontEndModel,
}

type Bus = RefCell<State>;

/// Handle to one simulated set of peripherals.
#[derive(Copy, Clone)]
pub struct Sim {
    bus: &'static Bus,
}

/// Binds the simulated peripherals to the PHY.
pub enum SimConfig {}

impl Config for SimConfig {
    type Radio = SimRadio;
    type Timer = SimTimer;
    type Rtc = SimRtc;
    type Ppi = SimPpi;
    type Cipher = SimCipher;
    type Resolver = SimResolver;
    type FrontEnd = SimFrontEnd;
    type Copy = SliceCopy;
    type Critical = SimCritical;
}

impl Sim {
    pub fn new() -> Self {
        let state = State {
            radio: RadioModel {
                events: [false; RADIO_EVENTS],
                tasks: Vec::new(),
                state: RadioState::Disabled,
                shorts: Shorts::empty(),
                interrupts: Interrupts::empty(),
                packet_ptr: 0,
                bit_counter: 0,
                frequency: (0, 0),
                mode: PhyMode::Le1M,
                whitening: false,
                tx_power: 0,
                rssi: 0,
                coded_s2: false,
                raw: [0; RAW_REGS],
            },
            timer: TimerModel {
                now: 0,
                cc: [0; 4],
                events: [false; 4],
                stopped: false,
            },
            rtc: RtcModel {
                now: 0,
                compare: 0,
                event_enabled: false,
            },
            links: Links::empty(),
            cipher: CipherModel {
                enabled: false,
                job: None,
                keystream_started: false,
                keystream_chained: false,
                keystream_done: false,
                keystream_irq: false,
                header_mask: None,
                crypt_done: false,
                mic_ok: true,
                error: false,
            },
            resolver: ResolverModel {
                enabled: false,
                irks: 0,
                address_ptr: 0,
                outcome: ResolverOutcome::Pending,
            },
            fem: FrontEndModel {
                pa_turn_on: None,
                lna_turn_on: None,
                pa: false,
                lna: false,
            },
        };

        Self {
            bus: Box::leak(Box::new(RefCell::new(state))),
        }
    }

    /// Creates a PHY driving this simulation, with its own buffers.
    pub fn phy(&self, config: PhyConfig) -> Phy<SimConfig> {
        let buffers: &'static PhyBuffers = Box::leak(Box::new(PhyBuffers::new()));
        let hw = Hardware {
            radio: self.radio(),
            timer: SimTimer { bus: self.bus },
            rtc: SimRtc { bus: self.bus },
            ppi: SimPpi { bus: self.bus },
            cipher: SimCipher { bus: self.bus },
            resolver: SimResolver { bus: self.bus },
            fem: SimFrontEnd { bus: self.bus },
        };
        Phy::new(hw, buffers, config)
    }

    pub fn radio(&self) -> SimRadio {
        SimRadio { bus: self.bus }
    }

    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.bus.borrow_mut())
    }

    // Radio

    pub fn set_radio_state(&self, state: RadioState) {
        self.with(|s| s.radio.state = state);
    }

    pub fn took(&self, task: RadioTask) -> bool {
        self.with(|s| s.radio.tasks.contains(&task))
    }

    pub fn radio_mode(&self) -> PhyMode {
        self.with(|s| s.radio.mode)
    }

    /// Frequency offset and whitening IV.
    pub fn frequency(&self) -> (u8, u8) {
        self.with(|s| s.radio.frequency)
    }

    pub fn tx_power(&self) -> i8 {
        self.with(|s| s.radio.tx_power)
    }

    pub fn whitening(&self) -> bool {
        self.with(|s| s.radio.whitening)
    }

    pub fn packet_ptr(&self) -> usize {
        self.with(|s| s.radio.packet_ptr)
    }

    pub fn shorts(&self) -> Shorts {
        self.with(|s| s.radio.shorts)
    }

    pub fn interrupts(&self) -> Interrupts {
        self.with(|s| s.radio.interrupts)
    }

    pub fn bit_counter(&self) -> u32 {
        self.with(|s| s.radio.bit_counter)
    }

    pub fn set_rssi(&self, rssi: u8) {
        self.with(|s| s.radio.rssi = rssi);
    }

    pub fn set_coded_s2(&self, s2: bool) {
        self.with(|s| s.radio.coded_s2 = s2);
    }

    /// Puts a packet on air: writes its RAM image where the radio points and latches the bit
    /// counter match for its header Byte. With decryption configured, the plaintext appears in the
    /// cipher's output buffer as well.
    pub fn deliver(&self, packet: &[u8]) {
        self.with(|s| {
            assert_ne!(s.radio.packet_ptr, 0, "no packet pointer set");
            unsafe {
                copy(s.radio.packet_ptr, packet);
            }
            s.radio.events[RadioEvent::BcMatch as usize] = true;

            if let Some((CipherOp::Decrypt, job)) = s.cipher.job {
                if s.cipher.enabled {
                    unsafe {
                        copy(job.output as usize, packet);
                    }
                    s.cipher.crypt_done = true;
                }
            }
        });
    }

    /// The radio received an access address; ADDRESS was captured at `at`.
    pub fn receive_address(&self, at: u32) {
        self.with(|s| {
            s.timer.cc[Cc::ADDRESS.0 as usize] = at;
            s.radio.events[RadioEvent::Address as usize] = true;
        });
    }

    /// A packet ended at fine counter value `at` and the radio disabled itself.
    pub fn receive_end(&self, at: u32, crc_ok: bool) {
        self.with(|s| {
            s.timer.cc[Cc::END.0 as usize] = at;
            s.radio.events[RadioEvent::End as usize] = true;
            s.radio.events[RadioEvent::RssiEnd as usize] = true;
            s.radio.events[RadioEvent::CrcOk as usize] = crc_ok;
            s.radio.events[RadioEvent::Disabled as usize] = true;
            s.radio.state = RadioState::Disabled;
        });
    }

    /// A transmission with ADDRESS captured at `address` and END captured at `end` finished.
    pub fn transmit_end(&self, address: u32, end: u32) {
        self.with(|s| {
            s.timer.cc[Cc::ADDRESS.0 as usize] = address;
            s.timer.cc[Cc::END.0 as usize] = end;
            s.radio.events[RadioEvent::End as usize] = true;
            s.radio.events[RadioEvent::Disabled as usize] = true;
            s.radio.state = RadioState::Disabled;
        });
    }

    /// The radio was disabled without receiving a packet.
    pub fn radio_disabled(&self) {
        self.with(|s| {
            s.radio.events[RadioEvent::Disabled as usize] = true;
            s.radio.state = RadioState::Disabled;
        });
    }

    // Fine counter

    pub fn set_timer(&self, now: u32) {
        self.with(|s| {
            s.timer.now = now;
            s.timer.stopped = false;
        });
    }

    /// Returns how many compare, packet pointer and link writes happened outside a critical
    /// section since the last call, and resets the count.
    pub fn take_unmasked_writes(&self) -> u32 {
        UNMASKED_WRITES.with(|w| w.replace(0))
    }

    pub fn timer_cc(&self, cc: Cc) -> u32 {
        self.with(|s| s.timer.cc[cc.0 as usize])
    }

    pub fn capture_at(&self, cc: Cc, value: u32) {
        self.with(|s| s.timer.cc[cc.0 as usize] = value);
    }

    pub fn fire_compare(&self, cc: Cc) {
        self.with(|s| s.timer.events[cc.0 as usize] = true);
    }

    pub fn timer_stopped(&self) -> bool {
        self.with(|s| s.timer.stopped)
    }

    // Coarse counter

    pub fn set_rtc(&self, now: u32) {
        self.with(|s| s.rtc.now = now);
    }

    pub fn set_rtc_compare(&self, compare: u32) {
        self.with(|s| s.rtc.compare = compare);
    }

    pub fn rtc_compare(&self) -> u32 {
        self.with(|s| s.rtc.compare)
    }

    pub fn rtc_event_enabled(&self) -> bool {
        self.with(|s| s.rtc.event_enabled)
    }

    // Interconnect

    pub fn links(&self) -> Links {
        self.with(|s| s.links)
    }

    // Cipher

    pub fn cipher_enabled(&self) -> bool {
        self.with(|s| s.cipher.enabled)
    }

    pub fn cipher_job(&self) -> Option<(CipherOp, CipherJob)> {
        self.with(|s| s.cipher.job)
    }

    pub fn keystream_started(&self) -> bool {
        self.with(|s| s.cipher.keystream_started)
    }

    /// Whether the end of key-stream generation starts the cipher by itself.
    pub fn keystream_chained(&self) -> bool {
        self.with(|s| s.cipher.keystream_chained)
    }

    pub fn keystream_interrupt(&self) -> bool {
        self.with(|s| s.cipher.keystream_irq)
    }

    pub fn set_keystream_done(&self) {
        self.with(|s| s.cipher.keystream_done = true);
    }

    pub fn header_mask(&self) -> Option<u8> {
        self.with(|s| s.cipher.header_mask)
    }

    pub fn set_mic_ok(&self, ok: bool) {
        self.with(|s| s.cipher.mic_ok = ok);
    }

    pub fn set_cipher_error(&self) {
        self.with(|s| s.cipher.error = true);
    }

    // Resolver

    pub fn resolver_enabled(&self) -> bool {
        self.with(|s| s.resolver.enabled)
    }

    pub fn resolver_irks(&self) -> usize {
        self.with(|s| s.resolver.irks)
    }

    pub fn resolver_address_ptr(&self) -> usize {
        self.with(|s| s.resolver.address_ptr)
    }

    pub fn set_resolver_outcome(&self, outcome: ResolverOutcome) {
        self.with(|s| s.resolver.outcome = outcome);
    }

    // Front-end

    pub fn set_front_end(&self, pa_turn_on: Option<u32>, lna_turn_on: Option<u32>) {
        self.with(|s| {
            s.fem.pa_turn_on = pa_turn_on;
            s.fem.lna_turn_on = lna_turn_on;
        });
    }

    pub fn pa_enabled(&self) -> bool {
        self.with(|s| s.fem.pa)
    }
}

/// Writes `data` to the simulated DMA address `addr`.
///
/// # Safety
///
/// `addr` must point into a live packet buffer with room for `data`.
unsafe fn copy(addr: usize, data: &[u8]) {
    core::ptr::copy_nonoverlapping(data.as_ptr(), addr as *mut u8, data.len());
}

pub struct SimRadio {
    bus: &'static Bus,
}

impl SimRadio {
    fn with<R>(&self, f: impl FnOnce(&mut RadioModel) -> R) -> R {
        f(&mut self.bus.borrow_mut().radio)
    }
}

impl Radio for SimRadio {
    fn init(&mut self) {
        self.with(|r| r.whitening = true);
    }

    fn trigger(&mut self, task: RadioTask) {
        self.with(|r| {
            let _ = r.tasks.push(task);
            if task == RadioTask::Disable {
                r.state = RadioState::Disabled;
            }
        });
    }

    fn event(&self, event: RadioEvent) -> bool {
        self.with(|r| r.events[event as usize])
    }

    fn clear_event(&mut self, event: RadioEvent) {
        self.with(|r| r.events[event as usize] = false);
    }

    fn set_shorts(&mut self, shorts: Shorts) {
        self.with(|r| r.shorts = shorts);
    }

    fn enable_interrupts(&mut self, irqs: Interrupts) {
        self.with(|r| r.interrupts.insert(irqs));
    }

    fn disable_interrupts(&mut self, irqs: Interrupts) {
        self.with(|r| r.interrupts.remove(irqs));
    }

    fn enabled_interrupts(&self) -> Interrupts {
        self.with(|r| r.interrupts)
    }

    fn unpend_interrupt(&mut self) {}

    fn state(&self) -> RadioState {
        self.with(|r| r.state)
    }

    fn set_packet_ptr(&mut self, ptr: *const u8) {
        note_write();
        self.with(|r| r.packet_ptr = ptr as usize);
    }

    fn set_bit_counter(&mut self, bits: u32) {
        self.with(|r| r.bit_counter = bits);
    }

    fn set_channel(&mut self, freq_offset: u8, whitening_iv: u8) {
        self.with(|r| r.frequency = (freq_offset, whitening_iv));
    }

    fn set_access_address(&mut self, _access_address: u32) {}

    fn set_crc_init(&mut self, _crc_init: u32) {}

    fn set_mode(&mut self, mode: PhyMode) {
        self.with(|r| r.mode = mode);
    }

    fn set_whitening(&mut self, enabled: bool) {
        self.with(|r| r.whitening = enabled);
    }

    fn set_tx_power(&mut self, dbm: i8) {
        self.with(|r| r.tx_power = dbm);
    }

    fn tx_power_levels(&self) -> &'static [i8] {
        NRF52840_TX_POWER
    }

    fn rssi_sample(&self) -> u8 {
        self.with(|r| r.rssi)
    }

    fn coded_s2(&self) -> bool {
        self.with(|r| r.coded_s2)
    }

    fn read_raw(&self, offset: usize) -> u32 {
        self.with(|r| r.raw[offset / 4])
    }

    fn write_raw(&mut self, offset: usize, value: u32) {
        self.with(|r| r.raw[offset / 4] = value);
    }
}

pub struct SimTimer {
    bus: &'static Bus,
}

impl SimTimer {
    fn with<R>(&self, f: impl FnOnce(&mut TimerModel) -> R) -> R {
        f(&mut self.bus.borrow_mut().timer)
    }
}

impl FineTimer for SimTimer {
    fn init(&mut self) {}

    fn clear(&mut self) {
        self.with(|t| t.now = 0);
    }

    fn stop(&mut self) {
        self.with(|t| t.stopped = true);
    }

    fn capture(&mut self, cc: Cc) {
        self.with(|t| t.cc[cc.0 as usize] = t.now);
    }

    fn cc(&self, cc: Cc) -> u32 {
        self.with(|t| t.cc[cc.0 as usize])
    }

    fn set_cc(&mut self, cc: Cc, value: u32) {
        note_write();
        self.with(|t| t.cc[cc.0 as usize] = value);
    }

    fn event(&self, cc: Cc) -> bool {
        self.with(|t| t.events[cc.0 as usize])
    }

    fn clear_event(&mut self, cc: Cc) {
        self.with(|t| t.events[cc.0 as usize] = false);
    }
}

pub struct SimRtc {
    bus: &'static Bus,
}

impl SimRtc {
    fn with<R>(&self, f: impl FnOnce(&mut RtcModel) -> R) -> R {
        f(&mut self.bus.borrow_mut().rtc)
    }
}

impl CoarseCounter for SimRtc {
    fn counter(&self) -> u32 {
        self.with(|r| r.now & COARSE_MASK)
    }

    fn now(&self) -> u32 {
        self.with(|r| r.now)
    }

    fn compare(&self) -> u32 {
        self.with(|r| r.compare)
    }

    fn set_compare(&mut self, value: u32) {
        self.with(|r| r.compare = value & COARSE_MASK);
    }

    fn clear_compare_event(&mut self) {}

    fn enable_compare_event(&mut self) {
        self.with(|r| r.event_enabled = true);
    }

    fn disable_compare_event(&mut self) {
        self.with(|r| r.event_enabled = false);
    }
}

pub struct SimPpi {
    bus: &'static Bus,
}

impl Interconnect for SimPpi {
    fn init(&mut self) {
        self.bus.borrow_mut().links = Links::empty();
    }

    fn enable(&mut self, links: Links) {
        note_write();
        self.bus.borrow_mut().links.insert(links);
    }

    fn disable(&mut self, links: Links) {
        self.bus.borrow_mut().links.remove(links);
    }
}

pub struct SimCipher {
    bus: &'static Bus,
}

impl SimCipher {
    fn with<R>(&self, f: impl FnOnce(&mut CipherModel) -> R) -> R {
        f(&mut self.bus.borrow_mut().cipher)
    }
}

impl Cipher for SimCipher {
    fn init(&mut self) {
        self.with(|c| {
            c.keystream_irq = false;
            c.keystream_chained = false;
            c.error = false;
        });
    }

    fn enable(&mut self) {
        self.with(|c| c.enabled = true);
    }

    fn disable(&mut self) {
        self.with(|c| {
            c.enabled = false;
            c.error = false;
        });
    }

    fn configure(&mut self, op: CipherOp, _mode: PhyMode, job: CipherJob) {
        self.with(|c| {
            c.job = Some((op, job));
            c.keystream_chained = op == CipherOp::Encrypt;
            c.error = false;
            c.crypt_done = false;
        });
    }

    fn start_keystream(&mut self) {
        self.with(|c| c.keystream_started = true);
    }

    fn set_header_mask(&mut self, mask: u8) {
        self.with(|c| c.header_mask = Some(mask));
    }

    fn keystream_done(&self) -> bool {
        self.with(|c| c.keystream_done)
    }

    fn clear_keystream_done(&mut self) {
        self.with(|c| c.keystream_done = false);
    }

    fn enable_keystream_interrupt(&mut self) {
        self.with(|c| c.keystream_irq = true);
    }

    fn disable_keystream_interrupt(&mut self) {
        self.with(|c| c.keystream_irq = false);
    }

    fn crypt_done(&self) -> bool {
        self.with(|c| c.crypt_done)
    }

    fn mic_ok(&self) -> bool {
        self.with(|c| c.mic_ok)
    }

    fn error(&self) -> bool {
        self.with(|c| c.error)
    }

    fn clear_error(&mut self) {
        self.with(|c| c.error = false);
    }
}

pub struct SimResolver {
    bus: &'static Bus,
}

impl SimResolver {
    fn with<R>(&self, f: impl FnOnce(&mut ResolverModel) -> R) -> R {
        f(&mut self.bus.borrow_mut().resolver)
    }
}

impl Resolver for SimResolver {
    fn init(&mut self) {}

    fn enable(&mut self) {
        self.with(|r| r.enabled = true);
    }

    fn disable(&mut self) {
        self.with(|r| r.enabled = false);
    }

    fn prepare(&mut self, irks: &'static [Irk], _scratch: *mut u32) {
        self.with(|r| {
            r.irks = irks.len();
            r.outcome = ResolverOutcome::Pending;
        });
    }

    fn set_address_ptr(&mut self, ptr: *const u8) {
        self.with(|r| r.address_ptr = ptr as usize);
    }

    fn outcome(&self) -> ResolverOutcome {
        self.with(|r| r.outcome)
    }
}

pub struct SimFrontEnd {
    bus: &'static Bus,
}

impl SimFrontEnd {
    fn with<R>(&self, f: impl FnOnce(&mut FrontEndModel) -> R) -> R {
        f(&mut self.bus.borrow_mut().fem)
    }
}

impl FrontEnd for SimFrontEnd {
    fn pa_turn_on_us(&self) -> Option<u32> {
        self.with(|f| f.pa_turn_on)
    }

    fn lna_turn_on_us(&self) -> Option<u32> {
        self.with(|f| f.lna_turn_on)
    }

    fn enable_pa(&mut self) {
        self.with(|f| f.pa = true);
    }

    fn enable_lna(&mut self) {
        self.with(|f| f.lna = true);
    }

    fn disable(&mut self) {
        self.with(|f| {
            f.pa = false;
            f.lna = false;
        });
    }
}

/// Tracks whether the interrupt would be masked. There is nothing to actually mask.
pub struct SimCritical;

impl CriticalSection for SimCritical {
    fn enter<R>(f: impl FnOnce() -> R) -> R {
        MASK_DEPTH.with(|d| d.set(d.get() + 1));
        let r = f();
        MASK_DEPTH.with(|d| d.set(d.get() - 1));
        r
    }
}
