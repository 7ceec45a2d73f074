//! Silicon errata workarounds.
//!
//! Each workaround is a patch to undocumented radio registers, applied at a fixed point of the
//! PHY's life cycle when the corresponding [`Errata`] flag is set.

use crate::{config::Errata, hw::Radio, mode::PhyMode};

/// When an erratum patch runs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Hook {
    /// Once, after the radio has been configured at startup.
    Init,

    /// Whenever the radio mode changes, before the new mode is programmed.
    ModeSwitch { from: PhyMode, to: PhyMode },
}

struct Erratum<R: Radio> {
    flag: Errata,
    patch: fn(&mut R, Hook),
}

fn table<R: Radio>() -> [Erratum<R>; 2] {
    [
        Erratum {
            flag: Errata::CODED_MODE_SWITCH,
            patch: coded_mode_switch,
        },
        Erratum {
            flag: Errata::ADDRESS_MATCH,
            patch: address_match,
        },
    ]
}

/// Applies all enabled patches registered for `hook`.
pub(crate) fn apply<R: Radio>(errata: Errata, radio: &mut R, hook: Hook) {
    for erratum in table::<R>().iter() {
        if errata.contains(erratum.flag) {
            (erratum.patch)(radio, hook);
        }
    }
}

const CODED_SWITCH_REG: usize = 0x740;
const ADDRESS_MATCH_REG: usize = 0x774;

fn coded_mode_switch<R: Radio>(radio: &mut R, hook: Hook) {
    let (from, to) = match hook {
        Hook::ModeSwitch { from, to } => (from, to),
        Hook::Init => return,
    };

    if from.is_coded() == to.is_coded() {
        return;
    }

    let reg = radio.read_raw(CODED_SWITCH_REG);
    let patched = if to.is_coded() {
        (reg & 0x7fff_00ff) | 0x8000_0000 | (196 << 8)
    } else {
        reg & 0x7fff_ffff
    };
    radio.write_raw(CODED_SWITCH_REG, patched);
}

fn address_match<R: Radio>(radio: &mut R, hook: Hook) {
    if hook != Hook::Init {
        return;
    }

    let reg = radio.read_raw(ADDRESS_MATCH_REG);
    radio.write_raw(ADDRESS_MATCH_REG, (reg & 0xffff_fffe) | 0x0100_0000);
}
