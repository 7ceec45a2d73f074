//! PPI channel assignment.
//!
//! Most links use the pre-programmed channels of the nRF52:
//!
//! | Channel | Event                  | Task                   |
//! |---------|------------------------|------------------------|
//! | 20      | `TIMER0` COMPARE\[0\]  | `RADIO` TXEN           |
//! | 21      | `TIMER0` COMPARE\[0\]  | `RADIO` RXEN           |
//! | 23      | `RADIO` BCMATCH        | `AAR` START            |
//! | 25      | `RADIO` ADDRESS        | `CCM` CRYPT            |
//! | 26      | `RADIO` ADDRESS        | `TIMER0` CAPTURE\[1\]  |
//! | 27      | `RADIO` END            | `TIMER0` CAPTURE\[2\]  |
//! | 31      | `RTC0` COMPARE\[0\]    | `TIMER0` START         |
//!
//! The wait-for-response timer needs two programmable channels:
//!
//! | Channel | Event                  | Task                   |
//! |---------|------------------------|------------------------|
//! | 4       | `TIMER0` COMPARE\[3\]  | `RADIO` DISABLE        |
//! | 5       | `RADIO` ADDRESS        | `TIMER0` CAPTURE\[3\]  |

use crate::pac::{PPI, RADIO, TIMER0};
use rubble_phy::hw::{Interconnect, Links};

const CH_WFR_DISABLE: u32 = 4;
const CH_WFR_CAPTURE: u32 = 5;
const CH_TIMER0_CC0_TXEN: u32 = 20;
const CH_TIMER0_CC0_RXEN: u32 = 21;
const CH_BCMATCH_AAR: u32 = 23;
const CH_ADDRESS_CCM: u32 = 25;
const CH_ADDRESS_CAPTURE: u32 = 26;
const CH_END_CAPTURE: u32 = 27;
const CH_RTC0_TIMER0_START: u32 = 31;

/// The channels owned by the PHY.
const OWNED: u32 = (1 << CH_WFR_DISABLE)
    | (1 << CH_WFR_CAPTURE)
    | (1 << CH_TIMER0_CC0_TXEN)
    | (1 << CH_TIMER0_CC0_RXEN)
    | (1 << CH_BCMATCH_AAR)
    | (1 << CH_ADDRESS_CCM)
    | (1 << CH_ADDRESS_CAPTURE)
    | (1 << CH_END_CAPTURE)
    | (1 << CH_RTC0_TIMER0_START);

/// The PPI, restricted to the channels listed in the module docs.
pub struct Ppi {
    ppi: PPI,
}

impl Ppi {
    pub fn new(ppi: PPI) -> Self {
        Self { ppi }
    }
}

/// Maps links to the channel mask implementing them.
fn channels(links: Links) -> u32 {
    let mut mask = 0;
    if links.contains(Links::TIMER_TXEN) {
        mask |= 1 << CH_TIMER0_CC0_TXEN;
    }
    if links.contains(Links::TIMER_RXEN) {
        mask |= 1 << CH_TIMER0_CC0_RXEN;
    }
    if links.contains(Links::BCMATCH_RESOLVER) {
        mask |= 1 << CH_BCMATCH_AAR;
    }
    if links.contains(Links::ADDRESS_CRYPT) {
        mask |= 1 << CH_ADDRESS_CCM;
    }
    if links.contains(Links::RTC_TIMER_START) {
        mask |= 1 << CH_RTC0_TIMER0_START;
    }
    if links.contains(Links::WFR) {
        mask |= (1 << CH_WFR_DISABLE) | (1 << CH_WFR_CAPTURE);
    }
    mask
}

impl Interconnect for Ppi {
    fn init(&mut self) {
        let radio = RADIO::ptr();
        let timer = TIMER0::ptr();

        unsafe {
            let wfr_disable = &self.ppi.ch[CH_WFR_DISABLE as usize];
            wfr_disable
                .eep
                .write(|w| w.bits(&(*timer).events_compare[3] as *const _ as u32));
            wfr_disable
                .tep
                .write(|w| w.bits(&(*radio).tasks_disable as *const _ as u32));

            let wfr_capture = &self.ppi.ch[CH_WFR_CAPTURE as usize];
            wfr_capture
                .eep
                .write(|w| w.bits(&(*radio).events_address as *const _ as u32));
            wfr_capture
                .tep
                .write(|w| w.bits(&(*timer).tasks_capture[3] as *const _ as u32));

            self.ppi.chenclr.write(|w| w.bits(OWNED));
            self.ppi
                .chenset
                .write(|w| w.bits((1 << CH_ADDRESS_CAPTURE) | (1 << CH_END_CAPTURE)));
        }
    }

    fn enable(&mut self, links: Links) {
        self.ppi.chenset.write(|w| unsafe { w.bits(channels(links)) });
    }

    fn disable(&mut self, links: Links) {
        self.ppi.chenclr.write(|w| unsafe { w.bits(channels(links)) });
    }
}

