//! Scheduling radio enables.
//!
//! A radio operation is started by a chain of hardware events: the coarse counter reaches a
//! compare value and starts the fine counter through the interconnect, the fine counter reaches
//! compare 0 and triggers TXEN or RXEN, and the radio ramps up and starts. Nothing in that chain
//! involves the CPU, so once armed, it is accurate to the microsecond.
//!
//! The chain can only be armed while there is enough time left. If the coarse compare is set too
//! close to (or behind) the counter, it never fires and the operation silently never happens.
//! Scheduling therefore fails with an error instead when the margin is too small.

use crate::{
    config::Config,
    hw::{Cc, CoarseCounter, CriticalSection, FineTimer, FrontEnd, Interconnect, Links},
    mode::RAMP_UP_US,
    phy::Phy,
    time::{coarse_delta, coarse_is_behind, fine_passed, TimeTarget, COARSE_MASK},
    Error,
};

/// Minimum number of ticks the coarse compare must be ahead of the counter to fire reliably.
const MIN_COARSE_MARGIN: u32 = 3;

/// Direction of a scheduled operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Dir {
    Tx,
    Rx,
}

impl<C: Config> Phy<C> {
    /// Schedules a transmission to start on air at `target`.
    ///
    /// The packet itself is set up afterwards with [`Phy::tx`]. If the start time cannot be armed
    /// in time, the PHY is disabled and `Error::TxLate` is returned.
    pub fn tx_set_start_time(&mut self, target: TimeTarget) -> Result<(), Error> {
        trace!("tx_set_start_time {:?}", target);

        C::Critical::enter(|| {
            self.mode_apply(self.tx_mode);
            self.hw.ppi.disable(Links::TIMER_RXEN);

            match self.set_start_time(target, Dir::Tx) {
                Ok(()) => {
                    self.hw.ppi.enable(Links::TIMER_TXEN);
                    Ok(())
                }
                Err(e) => {
                    crate::stats::inc(&mut self.stats.tx_late);
                    self.disable();
                    Err(e)
                }
            }
        })
    }

    /// Schedules the receiver to be listening at `target`.
    ///
    /// If the start time cannot be armed in time, the receiver is started as soon as possible
    /// instead and `Error::RxLate` is returned. The receive window is open either way.
    pub fn rx_set_start_time(&mut self, target: TimeTarget) -> Result<(), Error> {
        trace!("rx_set_start_time {:?}", target);

        C::Critical::enter(|| {
            self.mode_apply(self.rx_mode);
            self.hw.ppi.disable(Links::TIMER_TXEN);

            let late = match self.set_start_time(target, Dir::Rx) {
                Ok(()) => false,
                Err(_) => {
                    crate::stats::inc(&mut self.stats.rx_late);
                    self.set_start_now();
                    true
                }
            };

            self.hw.ppi.enable(Links::TIMER_RXEN);
            self.rx()?;

            if late {
                Err(Error::RxLate)
            } else {
                Ok(())
            }
        })
    }

    /// Arms the coarse and fine counters so that the radio is enabled in time for `target`.
    ///
    /// The fine counter is started at a whole tick shortly before `target`, and its compare 0 is
    /// set to the remaining microseconds minus the radio's ramp-up (and transmit delay). The
    /// compare value is kept at 1 or above by starting 1, 2 or 3 ticks early.
    pub(crate) fn set_start_time(&mut self, target: TimeTarget, dir: Dir) -> Result<(), Error> {
        let rem = i32::from(target.rem_us);
        let (radio_rem, fem_turn_on) = match dir {
            Dir::Tx => {
                let delay = self.cur_mode.timing().tx_delay;
                (
                    rem - (RAMP_UP_US + delay) as i32,
                    self.hw.fem.pa_turn_on_us(),
                )
            }
            Dir::Rx => (rem - RAMP_UP_US as i32, self.hw.fem.lna_turn_on_us()),
        };
        let fem_rem = fem_turn_on.map(|us| rem - us as i32);
        let min_rem = fem_rem.map_or(radio_rem, |fem_rem| fem_rem.min(radio_rem));

        let (early_ticks, correction) = if min_rem <= -61 {
            (3, 91)
        } else if min_rem <= -30 {
            (2, 61)
        } else {
            (1, 30)
        };
        assert!(
            min_rem + correction >= 1,
            "front-end turn-on time exceeds 3 ticks"
        );

        let start = target.ticks.wrapping_sub(early_ticks);
        let next_cc = start & COARSE_MASK;
        let counter = self.hw.rtc.counter();

        // A compare that is about to fire may still fire on its old value once reprogrammed.
        let pending = coarse_delta(counter, self.hw.rtc.compare());
        if pending != 0 && pending <= MIN_COARSE_MARGIN {
            warn!("{:?} start raced pending compare ({} ticks)", dir, pending);
            return Err(late(dir));
        }

        let ahead = coarse_delta(counter, next_cc);
        if coarse_is_behind(ahead) || ahead < MIN_COARSE_MARGIN {
            warn!(
                "{:?} start too late: {:?}, counter {}",
                dir,
                target,
                counter
            );
            return Err(late(dir));
        }

        self.hw.timer.clear();
        self.hw.timer.set_cc(Cc::START, (radio_rem + correction) as u32);
        self.hw.timer.clear_event(Cc::START);
        if let Some(fem_rem) = fem_rem {
            self.hw.timer.set_cc(Cc::FEM, (fem_rem + correction) as u32);
            self.hw.timer.clear_event(Cc::FEM);
        }

        self.hw.rtc.clear_compare_event();
        self.hw.rtc.set_compare(next_cc);
        self.hw.rtc.enable_compare_event();

        if fem_rem.is_some() {
            match dir {
                Dir::Tx => self.hw.fem.enable_pa(),
                Dir::Rx => self.hw.fem.enable_lna(),
            }
        }
        self.hw.ppi.enable(Links::RTC_TIMER_START);

        self.start_ticks = start;
        Ok(())
    }

    /// Arms the counters to enable the receiver as soon as possible.
    ///
    /// The fine counter is started 3 ticks from now. Since the previous coarse compare value may
    /// still fire, the actual start can be up to 2 ticks earlier than recorded.
    pub(crate) fn set_start_now(&mut self) {
        C::Critical::enter(|| {
            // The first event to fire gets compare value 1, the other one its offset from that.
            let (radio_cc, fem_cc) = match self.hw.fem.lna_turn_on_us() {
                Some(on) if on > RAMP_UP_US => (1 + on - RAMP_UP_US, Some(1)),
                Some(on) => (1, Some(1 + RAMP_UP_US - on)),
                None => (1, None),
            };

            self.hw.timer.clear();
            self.hw.timer.set_cc(Cc::START, radio_cc);
            self.hw.timer.clear_event(Cc::START);
            if let Some(fem_cc) = fem_cc {
                self.hw.timer.set_cc(Cc::FEM, fem_cc);
                self.hw.timer.clear_event(Cc::FEM);
            }

            let start = self.hw.rtc.now().wrapping_add(MIN_COARSE_MARGIN);
            self.hw.rtc.clear_compare_event();
            self.hw.rtc.set_compare(start & COARSE_MASK);
            self.hw.rtc.enable_compare_event();

            if fem_cc.is_some() {
                self.hw.fem.enable_lna();
            }
            self.hw.ppi.enable(Links::RTC_TIMER_START);

            self.start_ticks = start;
        });
    }

    /// Returns whether the fine counter has already passed compare `cc` without triggering it.
    ///
    /// The current count is captured into `scratch`, which must not be in use.
    pub(crate) fn did_miss(&mut self, cc: Cc, scratch: Cc) -> bool {
        self.hw.timer.capture(scratch);
        let now = self.hw.timer.cc(scratch);
        fine_passed(self.hw.timer.cc(cc), now) && !self.hw.timer.event(cc)
    }

    /// Makes sure compare `cc` cannot fire before it is reprogrammed.
    ///
    /// Capturing the current count puts the compare value a full counter period away.
    pub(crate) fn safely_reset(&mut self, cc: Cc) {
        self.hw.timer.capture(cc);
        self.hw.timer.clear_event(cc);
    }

    /// Stops the fine counter and detaches it from the coarse counter.
    pub(crate) fn stop_fine_timer(&mut self) {
        self.hw.timer.stop();
        self.hw.rtc.disable_compare_event();
    }
}

fn late(dir: Dir) -> Error {
    match dir {
        Dir::Tx => Error::TxLate,
        Dir::Rx => Error::RxLate,
    }
}
