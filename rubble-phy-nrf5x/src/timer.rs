//! The fine (`TIMER0`) and coarse (`RTC0`) counters.

use crate::pac::{RTC0, TIMER0};
use core::sync::atomic::{AtomicU32, Ordering};
use rubble_phy::{
    hw::{Cc, CoarseCounter, FineTimer},
    time::COARSE_MASK,
};

/// `TIMER0` running as a 32-bit counter at 1 MHz.
pub struct Timer0 {
    timer: TIMER0,
}

impl Timer0 {
    pub fn new(timer: TIMER0) -> Self {
        Self { timer }
    }
}

impl FineTimer for Timer0 {
    fn init(&mut self) {
        let t = &self.timer;
        unsafe {
            t.tasks_stop.write(|w| w.bits(1));
            t.tasks_shutdown.write(|w| w.bits(1));
            t.mode.write(|w| w.bits(0)); // Timer
            t.bitmode.write(|w| w.bits(3)); // 32 bit
            t.prescaler.write(|w| w.bits(4)); // 16 MHz / 2^4
            t.intenclr.write(|w| w.bits(0xffff_ffff));
            t.shorts.write(|w| w.bits(0));
        }
    }

    fn clear(&mut self) {
        self.timer.tasks_clear.write(|w| unsafe { w.bits(1) });
    }

    fn stop(&mut self) {
        unsafe {
            self.timer.tasks_stop.write(|w| w.bits(1));
            self.timer.tasks_shutdown.write(|w| w.bits(1));
        }
    }

    fn capture(&mut self, cc: Cc) {
        self.timer.tasks_capture[usize::from(cc.0)].write(|w| unsafe { w.bits(1) });
    }

    fn cc(&self, cc: Cc) -> u32 {
        self.timer.cc[usize::from(cc.0)].read().bits()
    }

    fn set_cc(&mut self, cc: Cc, value: u32) {
        self.timer.cc[usize::from(cc.0)].write(|w| unsafe { w.bits(value) });
    }

    fn event(&self, cc: Cc) -> bool {
        self.timer.events_compare[usize::from(cc.0)].read().bits() != 0
    }

    fn clear_event(&mut self, cc: Cc) {
        self.timer.events_compare[usize::from(cc.0)].reset();
    }
}

const EVTEN_COMPARE0: u32 = 1 << 16;
const INTEN_OVRFLW: u32 = 1 << 1;

/// `RTC0`, extended to 32 bits by counting overflows.
///
/// The counter must already be running off the LFCLK without a prescaler. Overflows are counted
/// by [`Rtc0::overflow`], which the `RTC0` interrupt handler has to call.
pub struct Rtc0 {
    rtc: RTC0,
    epoch: AtomicU32,
}

impl Rtc0 {
    /// Takes ownership of `RTC0` and enables its overflow interrupt.
    pub fn new(rtc: RTC0) -> Self {
        rtc.events_ovrflw.reset();
        rtc.intenset.write(|w| unsafe { w.bits(INTEN_OVRFLW) });
        Self {
            rtc,
            epoch: AtomicU32::new(0),
        }
    }

    /// Counts an overflow of the 24-bit counter. Call this from the `RTC0` interrupt.
    pub fn overflow(&self) {
        if self.rtc.events_ovrflw.read().bits() != 0 {
            self.epoch.fetch_add(1, Ordering::Relaxed);
            self.rtc.events_ovrflw.reset();
        }
    }
}

impl CoarseCounter for Rtc0 {
    fn counter(&self) -> u32 {
        self.rtc.counter.read().bits() & COARSE_MASK
    }

    fn now(&self) -> u32 {
        loop {
            let epoch = self.epoch.load(Ordering::Relaxed);
            let counter = self.counter();
            // An overflow that has not been counted yet
            let pending = self.rtc.events_ovrflw.read().bits() != 0 && counter & 0x0080_0000 == 0;
            if self.epoch.load(Ordering::Relaxed) == epoch {
                let epoch = if pending { epoch.wrapping_add(1) } else { epoch };
                return epoch.wrapping_shl(24) | counter;
            }
        }
    }

    fn compare(&self) -> u32 {
        self.rtc.cc[0].read().bits() & COARSE_MASK
    }

    fn set_compare(&mut self, value: u32) {
        self.rtc.cc[0].write(|w| unsafe { w.bits(value & COARSE_MASK) });
    }

    fn clear_compare_event(&mut self) {
        self.rtc.events_compare[0].reset();
    }

    fn enable_compare_event(&mut self) {
        self.rtc.evtenset.write(|w| unsafe { w.bits(EVTEN_COMPARE0) });
    }

    fn disable_compare_event(&mut self) {
        self.rtc.evtenclr.write(|w| unsafe { w.bits(EVTEN_COMPARE0) });
    }
}
