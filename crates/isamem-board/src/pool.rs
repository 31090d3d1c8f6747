use crate::error::BoardError;
use isamem_constants::{KIB, OPEN_BUS_U8};
use memory::{DenseMemory, GuestMemory};

/// The board's on-card RAM.
///
/// Every region and EMS page is a view into this buffer by offset. Accesses outside the buffer
/// read as open bus and drop writes; the partitioner never hands out such offsets, so this only
/// matters for word accesses straddling the very last byte.
#[derive(Debug)]
pub struct RamPool {
    mem: DenseMemory,
}

impl RamPool {
    /// Allocates `size_kib` KiB of zeroed RAM.
    pub fn new(size_kib: u32) -> Result<Self, BoardError> {
        let size = u64::from(size_kib) * u64::from(KIB);
        Ok(Self {
            mem: DenseMemory::new(size)?,
        })
    }

    pub fn len(&self) -> usize {
        self.mem.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.mem.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        self.mem.as_slice()
    }

    pub fn read_u8(&self, offset: usize) -> u8 {
        self.mem.read_u8_le(offset as u64).unwrap_or(OPEN_BUS_U8)
    }

    pub fn write_u8(&mut self, offset: usize, value: u8) {
        let _ = self.mem.write_u8_le(offset as u64, value);
    }

    pub fn read_u16(&self, offset: usize) -> u16 {
        let lo = self.read_u8(offset);
        let hi = self.read_u8(offset.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    pub fn write_u16(&mut self, offset: usize, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write_u8(offset, lo);
        self.write_u8(offset.wrapping_add(1), hi);
    }
}
