//! Statically allocated packet buffers.
//!
//! The radio, cipher and resolver read and write these by DMA, so they must live at fixed
//! addresses for as long as the PHY runs. Each buffer holds exactly one packet: a new operation
//! overwrites whatever the previous one left there.
//!
//! Packets are stored in the radio's RAM layout: S0 (the PDU header byte), LENGTH, S1 (always 0),
//! then the payload. Every packet buffer reserves 3 Bytes in front of that so a received packet can
//! be shifted to a contiguous header-length-payload form without copying it.

use crate::mode::MAX_PDU_LEN;
use core::cell::UnsafeCell;
use core::ptr;

/// Length of a packet in the radio's RAM layout: S0, LENGTH, S1 and up to 255 payload Bytes.
const RAM_PACKET_LEN: usize = MAX_PDU_LEN + 1;

/// Length of a packet buffer in Bytes.
///
/// Large enough for a maximum length packet written at [`RX_OFFSET`], rounded up to whole words.
pub const BUF_LEN: usize = (RX_OFFSET + RAM_PACKET_LEN + 3) & !3;

const BUF_WORDS: usize = BUF_LEN / 4;

/// Words of scratch memory the cipher needs for a maximum length packet.
const SCRATCH_WORDS: usize = 67;

/// Length of the cipher configuration block: key, packet counter, direction and IV.
pub const CCM_BLOCK_LEN: usize = 33;

/// Offset of the RAM header within packet buffers the radio writes received packets to.
pub const RX_OFFSET: usize = 3;

/// Selects one of the packet buffers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Buf {
    /// Plaintext packets to send.
    Tx,
    /// Received (and decrypted) packets.
    Rx,
    /// Plaintext to encrypt, or ciphertext to decrypt.
    Enc,
}

#[repr(C, align(4))]
struct CcmBlock([u8; CCM_BLOCK_LEN]);

/// The PHY's DMA buffers.
///
/// Create one as a `static` and pass it to [`Phy::new`]:
///
/// ```
/// use rubble_phy::buffers::PhyBuffers;
///
/// static BUFFERS: PhyBuffers = PhyBuffers::new();
/// ```
///
/// [`Phy::new`]: ../phy/struct.Phy.html#method.new
#[repr(C)]
pub struct PhyBuffers {
    tx: UnsafeCell<[u32; BUF_WORDS]>,
    rx: UnsafeCell<[u32; BUF_WORDS]>,
    enc: UnsafeCell<[u32; BUF_WORDS]>,
    scratch: UnsafeCell<[u32; SCRATCH_WORDS]>,
    ccm: UnsafeCell<CcmBlock>,
    resolver: UnsafeCell<u32>,
}

// Only the `Phy` holding the `&'static PhyBuffers` ever touches the contents, and it is driven from
// a single interrupt priority.
unsafe impl Sync for PhyBuffers {}

impl PhyBuffers {
    /// Creates zeroed buffers.
    pub const fn new() -> Self {
        Self {
            tx: UnsafeCell::new([0; BUF_WORDS]),
            rx: UnsafeCell::new([0; BUF_WORDS]),
            enc: UnsafeCell::new([0; BUF_WORDS]),
            scratch: UnsafeCell::new([0; SCRATCH_WORDS]),
            ccm: UnsafeCell::new(CcmBlock([0; CCM_BLOCK_LEN])),
            resolver: UnsafeCell::new(0),
        }
    }

    /// Returns the start address of a packet buffer.
    pub fn ptr(&self, buf: Buf) -> *mut u8 {
        self.cell(buf).get() as *mut u8
    }

    pub fn scratch_ptr(&self) -> *mut u32 {
        self.scratch.get() as *mut u32
    }

    pub fn ccm_ptr(&self) -> *mut u8 {
        self.ccm.get() as *mut u8
    }

    pub fn resolver_ptr(&self) -> *mut u32 {
        self.resolver.get()
    }

    /// Runs `f` with the contents of a packet buffer.
    ///
    /// The caller must make sure no peripheral is currently writing to `buf`.
    pub(crate) fn with<R>(&self, buf: Buf, f: impl FnOnce(&mut [u8; BUF_LEN]) -> R) -> R {
        // SAFETY: `[u32; BUF_WORDS]` and `[u8; BUF_LEN]` have the same size, and the reference
        // does not escape `f`.
        let bytes = unsafe { &mut *(self.cell(buf).get() as *mut [u8; BUF_LEN]) };
        f(bytes)
    }

    /// Runs `f` with a shared view of a packet buffer.
    pub(crate) fn read<R>(&self, buf: Buf, f: impl FnOnce(&[u8; BUF_LEN]) -> R) -> R {
        // SAFETY: as in `with`.
        let bytes = unsafe { &*(self.cell(buf).get() as *const [u8; BUF_LEN]) };
        f(bytes)
    }

    /// Runs `f` with the cipher configuration block.
    pub(crate) fn with_ccm<R>(&self, f: impl FnOnce(&mut [u8; CCM_BLOCK_LEN]) -> R) -> R {
        // SAFETY: the cipher only reads the block while a packet is being processed, and the PHY
        // does not update it then.
        let block = unsafe { &mut (*self.ccm.get()).0 };
        f(block)
    }

    /// Reads one Byte of a packet buffer that a peripheral may be writing concurrently.
    pub(crate) fn read_volatile(&self, buf: Buf, index: usize) -> u8 {
        assert!(index < BUF_LEN);
        // SAFETY: bounds checked above.
        unsafe { ptr::read_volatile(self.ptr(buf).add(index)) }
    }

    /// Writes one Byte of a packet buffer that a peripheral may be accessing concurrently.
    pub(crate) fn write_volatile(&self, buf: Buf, index: usize, value: u8) {
        assert!(index < BUF_LEN);
        // SAFETY: bounds checked above.
        unsafe { ptr::write_volatile(self.ptr(buf).add(index), value) }
    }

    fn cell(&self, buf: Buf) -> &UnsafeCell<[u32; BUF_WORDS]> {
        match buf {
            Buf::Tx => &self.tx,
            Buf::Rx => &self.rx,
            Buf::Enc => &self.enc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_aligned() {
        let bufs = PhyBuffers::new();
        assert_eq!(BUF_LEN % 4, 0);
        assert_eq!(bufs.ptr(Buf::Rx) as usize % 4, 0);
        assert_eq!(bufs.ccm_ptr() as usize % 4, 0);
        // The received PDU ends up word aligned after the header shift.
        assert_eq!((bufs.ptr(Buf::Rx) as usize + RX_OFFSET + 1) % 4, 0);
    }

    #[test]
    fn fits_max_length_packet() {
        assert_eq!(BUF_LEN, 264);
        assert!(RX_OFFSET + 3 + 255 <= BUF_LEN);
        assert!(RAM_PACKET_LEN <= BUF_LEN);
    }

    #[test]
    fn volatile_access() {
        let bufs = PhyBuffers::new();
        bufs.write_volatile(Buf::Tx, 0, 0xff);
        assert_eq!(bufs.read_volatile(Buf::Tx, 0), 0xff);
        assert_eq!(bufs.with(Buf::Tx, |b| b[0]), 0xff);
        assert_eq!(bufs.read_volatile(Buf::Enc, 0), 0);
    }
}
