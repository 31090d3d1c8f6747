//! Capabilities a board consumes from the emulator hosting it.
//!
//! The host owns address decoding and I/O dispatch. A board registers handlers with it at
//! construction and removes them at teardown; in between, the host calls back into those handlers
//! for every bus cycle that hits them.

use crate::config::PlatformCaps;
use thiserror::Error;

/// Opaque handle for a memory mapping registered with [`IsaHost::add_mapping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MappingId(pub u32);

/// Access paths a mapping advertises.
///
/// A [`AccessWidth::Byte`] mapping never sees word accesses: the host splits them into two byte
/// cycles, the way an 8-bit ISA card is driven on a 16-bit bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessWidth {
    Byte,
    Word,
}

impl AccessWidth {
    pub fn for_bus(wide: bool) -> Self {
        if wide {
            AccessWidth::Word
        } else {
            AccessWidth::Byte
        }
    }
}

/// Static description of a memory mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingDesc {
    /// First bus address decoded by the mapping.
    pub base: u32,
    pub len: u32,
    pub width: AccessWidth,
    /// Whether the host should route accesses to the mapping right away.
    pub enabled: bool,
    /// Offset into the board RAM pool backing the first byte (the "execution target").
    pub exec: usize,
}

/// Byte/word accessors bound to one mapping.
///
/// `addr` is the absolute bus address; implementations subtract their own base.
pub trait MemoryHandler {
    fn read_u8(&mut self, addr: u32) -> u8;
    fn write_u8(&mut self, addr: u32, value: u8);

    fn read_u16(&mut self, addr: u32) -> u16 {
        let lo = self.read_u8(addr);
        let hi = self.read_u8(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    fn write_u16(&mut self, addr: u32, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write_u8(addr, lo);
        self.write_u8(addr.wrapping_add(1), hi);
    }
}

/// Live control over registered mappings.
///
/// This is split out of [`IsaHost`] so the host can lend it to a [`PortHandler`] while the handler
/// is being dispatched: a register write that retargets a window must have committed the new
/// mapping state before the port write returns.
pub trait MappingControl {
    fn enable_mapping(&mut self, id: MappingId);
    fn disable_mapping(&mut self, id: MappingId);
    /// Point the mapping's execution target at a new pool offset.
    fn set_mapping_exec(&mut self, id: MappingId, exec: usize);
}

/// Handler for a contiguous range of 8-bit I/O ports.
pub trait PortHandler {
    fn read(&mut self, port: u16) -> u8;
    fn write(&mut self, port: u16, value: u8, mappings: &mut dyn MappingControl);
}

/// Why a host refused an I/O port range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IoRangeError {
    #[error("I/O port range wraps past 0xFFFF: start={start:#x} len={len:#x}")]
    Wraps { start: u16, len: u16 },
    #[error(
        "overlapping I/O port ranges: new=[{start:#x}..+{len:#x}) existing=[{other_start:#x}..+{other_len:#x})"
    )]
    Overlap {
        start: u16,
        len: u16,
        other_start: u16,
        other_len: u16,
    },
}

/// Everything a board needs from its host.
pub trait IsaHost: MappingControl {
    /// Platform capabilities, consulted once while a board configuration is resolved.
    fn capabilities(&self) -> PlatformCaps;

    fn add_mapping(&mut self, desc: MappingDesc, handler: Box<dyn MemoryHandler>) -> MappingId;
    fn remove_mapping(&mut self, id: MappingId);

    /// Mark `base..base + len` as served by an expansion card rather than planar RAM.
    fn set_external(&mut self, base: u32, len: u32);
    /// Undo a matching [`IsaHost::set_external`].
    fn clear_external(&mut self, base: u32, len: u32);

    /// Claim `base..base + len`. A host that cannot dispatch the range (already claimed, or it
    /// wraps) returns the handler unused.
    fn set_io_handler(
        &mut self,
        base: u16,
        len: u16,
        handler: Box<dyn PortHandler>,
    ) -> Result<(), IoRangeError>;
    fn remove_io_handler(&mut self, base: u16, len: u16);
}
