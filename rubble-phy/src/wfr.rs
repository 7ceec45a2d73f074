//! The wait-for-response timer.
//!
//! A receive window is closed by hardware: fine counter compare 3 disables the radio unless the
//! radio's ADDRESS event captured into compare 3 first (which pushes the deadline a full counter
//! period away). The PHY then sees a DISABLED event without a received packet and reports the
//! timeout through [`LinkLayer::wfr_expired`].
//!
//! [`LinkLayer::wfr_expired`]: ../link/trait.LinkLayer.html#tymethod.wfr_expired

use crate::{
    config::Config,
    hw::{Cc, CriticalSection, FineTimer, Interconnect, Links, Radio, RadioTask},
    mode::{PhyMode, RAMP_UP_US},
    phy::Phy,
    time::Duration,
};

/// Allowed active clock drift on a turnaround, in µs.
const CLOCK_ACCURACY_US: u32 = 2;

/// The END capture may lag the actual end of the packet by up to one counter cycle.
const CAPTURE_JITTER_US: u32 = 1;

/// How long a receive window stays open.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Wfr {
    /// Response to a transmission: the peer has to start sending T_IFS after the end of the
    /// packet that was just sent in `tx_mode`.
    TxRx { tx_mode: PhyMode, tifs: Duration },

    /// A packet has to start within `wait` after the receiver is enabled.
    Rx { wait: Duration },
}

impl<C: Config> Phy<C> {
    /// Arms the wait-for-response deadline for the current receive window.
    ///
    /// The deadline is computed from counter captures and the scheduled receiver enable, never from
    /// the current time. If the fine counter is already past it, the radio is disabled right away.
    pub fn wfr_enable(&mut self, wfr: Wfr) {
        C::Critical::enter(|| {
            let mut end = match wfr {
                Wfr::TxRx { tx_mode, tifs } => self
                    .hw
                    .timer
                    .cc(Cc::END)
                    .wrapping_add(tifs.as_micros())
                    .wrapping_add(tx_mode.timing().tx_end_delay)
                    .wrapping_add(CLOCK_ACCURACY_US + CAPTURE_JITTER_US)
                    .wrapping_add(self.config.extended_tifs.as_micros()),
                Wfr::Rx { wait } => self
                    .hw
                    .timer
                    .cc(Cc::START)
                    .wrapping_add(RAMP_UP_US)
                    .wrapping_add(wait.as_micros()),
            };

            // The deadline is checked against ADDRESS, which fires after the access address (and on
            // Coded PHY, CI and TERM1) has been received.
            let timing = self.cur_mode.timing();
            end = end
                .wrapping_add(timing.pdu_start_offset)
                .wrapping_add(timing.rx_addr_delay);

            self.safely_reset(Cc::WFR);
            self.hw.ppi.enable(Links::WFR);
            self.hw.timer.set_cc(Cc::WFR, end);

            // Compare 1 is only read on RX start, so it is free as scratch here.
            if self.did_miss(Cc::WFR, Cc::ADDRESS) {
                warn!("wfr deadline {} already passed", end);
                self.hw.ppi.disable(Links::WFR);
                self.hw.radio.trigger(RadioTask::Disable);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{Capabilities, PhyConfig},
        sim::{Sim, SimConfig},
    };

    fn phy(sim: &Sim, config: PhyConfig) -> Phy<SimConfig> {
        sim.phy(config)
    }

    #[test]
    fn rx_window() {
        let sim = Sim::new();
        let mut phy = phy(&sim, PhyConfig::new(Capabilities::nrf52840()));
        sim.set_timer(0);
        phy.hw.timer.set_cc(Cc::START, 21);

        phy.wfr_enable(Wfr::Rx {
            wait: Duration::from_micros(500),
        });
        // 21 + 40 + 500 + 40 + 6
        assert_eq!(sim.timer_cc(Cc::WFR), 607);
        assert!(sim.links().contains(Links::WFR));
        assert!(!sim.took(RadioTask::Disable));
    }

    #[test]
    fn armed_masked() {
        let sim = Sim::new();
        let mut phy = phy(&sim, PhyConfig::new(Capabilities::nrf52840()));
        phy.hw.timer.set_cc(Cc::START, 21);
        sim.take_unmasked_writes();

        phy.wfr_enable(Wfr::Rx {
            wait: Duration::from_micros(500),
        });
        assert_eq!(sim.take_unmasked_writes(), 0);
        assert_eq!(sim.timer_cc(Cc::WFR), 607);
    }

    #[test]
    fn turnaround() {
        let sim = Sim::new();
        let config = PhyConfig::new(Capabilities::nrf52840())
            .with_extended_tifs(Duration::from_micros(10));
        let mut phy = phy(&sim, config);
        sim.set_timer(1000);
        sim.capture_at(Cc::END, 1000);
        phy.mode_apply(PhyMode::Le2M);

        phy.wfr_enable(Wfr::TxRx {
            tx_mode: PhyMode::Le1M,
            tifs: Duration::T_IFS,
        });
        // 1000 + 150 + 6 + 3 + 10, then 24 + 2 for receiving on 2M.
        assert_eq!(sim.timer_cc(Cc::WFR), 1195);
        assert!(sim.links().contains(Links::WFR));
    }

    #[test]
    fn already_missed() {
        let sim = Sim::new();
        let mut phy = phy(&sim, PhyConfig::new(Capabilities::nrf52840()));
        sim.set_timer(5000);
        phy.hw.timer.set_cc(Cc::START, 100);

        phy.wfr_enable(Wfr::Rx {
            wait: Duration::from_micros(100),
        });
        assert!(sim.took(RadioTask::Disable));
        assert!(!sim.links().contains(Links::WFR));
    }

    #[test]
    fn counter_wraps() {
        let sim = Sim::new();
        let mut phy = phy(&sim, PhyConfig::new(Capabilities::nrf52840()));
        sim.set_timer(0xffff_ff00);
        phy.hw.timer.set_cc(Cc::START, 0xffff_ff80);

        phy.wfr_enable(Wfr::Rx {
            wait: Duration::from_micros(1000),
        });
        assert_eq!(sim.timer_cc(Cc::WFR), 0xffff_ff80u32.wrapping_add(1086));
        assert!(!sim.took(RadioTask::Disable));
    }
}
