//! Reference ISA host: a memory map and an I/O port bus that memory-expansion boards plug into.

#![forbid(unsafe_code)]

pub mod io;
pub mod memory;

pub use self::io::IsaIoBus;
pub use self::memory::{IsaMemoryMap, AT_ADDRESS_MASK, XT_ADDRESS_MASK};

use ::memory::GuestMemoryResult;
use isamem_board::{
    IoRangeError, IsaHost, MappingControl, MappingDesc, MappingId, MemoryHandler, PlatformCaps,
    PortHandler,
};
use tracing::debug;

/// A PC/XT or PC/AT class machine, reduced to what expansion memory needs.
pub struct IsaPlatform {
    pub memory: IsaMemoryMap,
    pub io: IsaIoBus,
    caps: PlatformCaps,
}

impl IsaPlatform {
    pub fn new(caps: PlatformCaps, planar_ram: u32) -> GuestMemoryResult<Self> {
        let mask = if caps.extended_memory {
            AT_ADDRESS_MASK
        } else {
            XT_ADDRESS_MASK
        };
        Ok(Self {
            memory: IsaMemoryMap::new(mask, planar_ram)?,
            io: IsaIoBus::new(),
            caps,
        })
    }

    pub fn xt(planar_ram: u32) -> GuestMemoryResult<Self> {
        Self::new(PlatformCaps::XT, planar_ram)
    }

    pub fn at(planar_ram: u32) -> GuestMemoryResult<Self> {
        Self::new(PlatformCaps::AT, planar_ram)
    }

    /// `IN AL, DX`.
    pub fn io_read(&mut self, port: u16) -> u8 {
        self.io.read_u8(port)
    }

    /// `OUT DX, AL`. Mapping changes made by the handler are visible once this returns.
    pub fn io_write(&mut self, port: u16, value: u8) {
        self.io.write_u8(port, value, &mut self.memory);
    }
}

impl MappingControl for IsaPlatform {
    fn enable_mapping(&mut self, id: MappingId) {
        self.memory.enable_mapping(id);
    }

    fn disable_mapping(&mut self, id: MappingId) {
        self.memory.disable_mapping(id);
    }

    fn set_mapping_exec(&mut self, id: MappingId, exec: usize) {
        self.memory.set_mapping_exec(id, exec);
    }
}

impl IsaHost for IsaPlatform {
    fn capabilities(&self) -> PlatformCaps {
        self.caps
    }

    fn add_mapping(&mut self, desc: MappingDesc, handler: Box<dyn MemoryHandler>) -> MappingId {
        self.memory.add_mapping(desc, handler)
    }

    fn remove_mapping(&mut self, id: MappingId) {
        self.memory.remove_mapping(id);
    }

    fn set_external(&mut self, base: u32, len: u32) {
        self.memory.set_external(base, len);
    }

    fn clear_external(&mut self, base: u32, len: u32) {
        self.memory.clear_external(base, len);
    }

    fn set_io_handler(
        &mut self,
        base: u16,
        len: u16,
        handler: Box<dyn PortHandler>,
    ) -> Result<(), IoRangeError> {
        self.io.try_register_range(base, len, handler)?;
        debug!(base, len, "I/O handler registered");
        Ok(())
    }

    fn remove_io_handler(&mut self, base: u16, len: u16) {
        if self.io.unregister_range_device(base, len).is_none() {
            debug!(base, len, "no I/O handler to remove");
        }
    }
}
