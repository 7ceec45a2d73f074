//! The AES-CCM engine (`CCM`) and the address resolver (`AAR`).

use crate::pac::{AAR, CCM};
use rubble_phy::{
    hw::{Cipher, CipherJob, CipherOp, Resolver, ResolverOutcome},
    mode::PhyMode,
    privacy::Irk,
};

const CCM_ENABLED: u32 = 2;
const CCM_SHORTS_ENDKSGEN_CRYPT: u32 = 1;
const CCM_INT_ENDKSGEN: u32 = 1 << 0;
const CCM_MODE_DECRYPT: u32 = 1;
const CCM_MODE_EXTENDED_LENGTH: u32 = 1 << 24;

/// The `CCM` peripheral.
pub struct Ccm {
    ccm: CCM,
}

impl Ccm {
    pub fn new(ccm: CCM) -> Self {
        Self { ccm }
    }
}

#[cfg(feature = "52840")]
fn datarate(mode: PhyMode) -> u32 {
    let raw = match mode {
        PhyMode::Le1M => 0,
        PhyMode::Le2M => 1,
        PhyMode::Coded125k => 2,
        PhyMode::Coded500k => 3,
    };
    raw << 16
}

#[cfg(feature = "52832")]
fn datarate(mode: PhyMode) -> u32 {
    match mode {
        PhyMode::Le2M => 1 << 16,
        _ => 0,
    }
}

impl Cipher for Ccm {
    fn init(&mut self) {
        self.ccm.intenclr.write(|w| unsafe { w.bits(0xffff_ffff) });
        self.ccm.shorts.reset();
        self.ccm.events_error.reset();
    }

    fn enable(&mut self) {
        self.ccm.enable.write(|w| unsafe { w.bits(CCM_ENABLED) });
    }

    fn disable(&mut self) {
        unsafe {
            self.ccm.tasks_stop.write(|w| w.bits(1));
            self.ccm.enable.write(|w| w.bits(0));
        }
        self.ccm.events_error.reset();
    }

    fn configure(&mut self, op: CipherOp, mode: PhyMode, job: CipherJob) {
        // Decryption must not run ahead of the radio, which starts it on ADDRESS.
        let (op, shorts) = match op {
            CipherOp::Encrypt => (0, CCM_SHORTS_ENDKSGEN_CRYPT),
            CipherOp::Decrypt => (CCM_MODE_DECRYPT, 0),
        };

        let c = &self.ccm;
        unsafe {
            c.shorts.write(|w| w.bits(shorts));
            c.mode
                .write(|w| w.bits(op | datarate(mode) | CCM_MODE_EXTENDED_LENGTH));
            c.cnfptr.write(|w| w.bits(job.config as u32));
            c.inptr.write(|w| w.bits(job.input as u32));
            c.outptr.write(|w| w.bits(job.output as u32));
            c.scratchptr.write(|w| w.bits(job.scratch as u32));
        }
        c.events_error.reset();
        c.events_endcrypt.reset();
        c.events_endksgen.reset();
    }

    fn start_keystream(&mut self) {
        self.ccm.tasks_ksgen.write(|w| unsafe { w.bits(1) });
    }

    fn set_header_mask(&mut self, _mask: u8) {
        // No HEADERMASK register on the nRF52832 and nRF52840. The PHY applies the mask itself.
    }

    fn keystream_done(&self) -> bool {
        self.ccm.events_endksgen.read().bits() != 0
    }

    fn clear_keystream_done(&mut self) {
        self.ccm.events_endksgen.reset();
    }

    fn enable_keystream_interrupt(&mut self) {
        self.ccm.intenset.write(|w| unsafe { w.bits(CCM_INT_ENDKSGEN) });
    }

    fn disable_keystream_interrupt(&mut self) {
        self.ccm.intenclr.write(|w| unsafe { w.bits(CCM_INT_ENDKSGEN) });
    }

    fn crypt_done(&self) -> bool {
        self.ccm.events_endcrypt.read().bits() != 0
    }

    fn mic_ok(&self) -> bool {
        self.ccm.micstatus.read().bits() & 1 != 0
    }

    fn error(&self) -> bool {
        self.ccm.events_error.read().bits() != 0
    }

    fn clear_error(&mut self) {
        self.ccm.events_error.reset();
    }
}

const AAR_ENABLED: u32 = 3;

/// The `AAR` peripheral.
pub struct Aar {
    aar: AAR,
}

impl Aar {
    pub fn new(aar: AAR) -> Self {
        Self { aar }
    }

    fn clear_events(&mut self) {
        self.aar.events_end.reset();
        self.aar.events_resolved.reset();
        self.aar.events_notresolved.reset();
    }
}

impl Resolver for Aar {
    fn init(&mut self) {
        self.aar.intenclr.write(|w| unsafe { w.bits(0xffff_ffff) });
        self.clear_events();
    }

    fn enable(&mut self) {
        self.aar.enable.write(|w| unsafe { w.bits(AAR_ENABLED) });
    }

    fn disable(&mut self) {
        self.aar.enable.write(|w| unsafe { w.bits(0) });
    }

    fn prepare(&mut self, irks: &'static [Irk], scratch: *mut u32) {
        unsafe {
            self.aar.nirk.write(|w| w.bits(irks.len() as u32));
            self.aar.irkptr.write(|w| w.bits(irks.as_ptr() as u32));
            self.aar.scratchptr.write(|w| w.bits(scratch as u32));
        }
        self.clear_events();
    }

    fn set_address_ptr(&mut self, ptr: *const u8) {
        self.aar.addrptr.write(|w| unsafe { w.bits(ptr as u32) });
    }

    fn outcome(&self) -> ResolverOutcome {
        if self.aar.events_resolved.read().bits() != 0 {
            ResolverOutcome::Resolved(self.aar.status.read().bits() as u8)
        } else if self.aar.events_notresolved.read().bits() != 0 {
            ResolverOutcome::NotResolved
        } else {
            ResolverOutcome::Pending
        }
    }
}
