use isamem_board::{AccessWidth, MappingControl, MappingDesc, MappingId, MemoryHandler};
use isamem_constants::{EXTENDED_BASE, ISA_ADDRESS_LIMIT, OPEN_BUS_U8};
use memory::{DenseMemory, GuestMemory, GuestMemoryResult};
use tracing::trace;

/// 20-bit address space of a PC/XT.
pub const XT_ADDRESS_MASK: u32 = EXTENDED_BASE - 1;
/// 24-bit address space of a PC/AT.
pub const AT_ADDRESS_MASK: u32 = ISA_ADDRESS_LIMIT - 1;

struct Mapping {
    id: MappingId,
    desc: MappingDesc,
    handler: Box<dyn MemoryHandler>,
}

impl Mapping {
    fn contains(&self, addr: u32) -> bool {
        addr >= self.desc.base && addr - self.desc.base < self.desc.len
    }
}

/// ISA memory map: planar RAM plus mappings registered by expansion cards.
///
/// Routing rules:
/// - Addresses are masked to the platform's address width first.
/// - Enabled mappings take precedence over planar RAM; when several overlap, the most recently
///   registered one wins.
/// - Planar RAM does not answer inside ranges marked external.
/// - Anything left floats high.
pub struct IsaMemoryMap {
    address_mask: u32,
    ram: DenseMemory,
    mappings: Vec<Mapping>,
    external: Vec<(u32, u32)>,
    next_id: u32,
}

impl IsaMemoryMap {
    pub fn new(address_mask: u32, planar_ram: u32) -> GuestMemoryResult<Self> {
        Ok(Self {
            address_mask,
            ram: DenseMemory::new(u64::from(planar_ram))?,
            mappings: Vec::new(),
            external: Vec::new(),
            next_id: 0,
        })
    }

    pub fn add_mapping(&mut self, desc: MappingDesc, handler: Box<dyn MemoryHandler>) -> MappingId {
        let id = MappingId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        trace!(
            id = id.0,
            base = desc.base,
            len = desc.len,
            enabled = desc.enabled,
            "memory mapping added"
        );
        self.mappings.push(Mapping { id, desc, handler });
        id
    }

    pub fn remove_mapping(&mut self, id: MappingId) {
        self.mappings.retain(|m| m.id != id);
    }

    pub fn set_external(&mut self, base: u32, len: u32) {
        if len != 0 {
            self.external.push((base, len));
        }
    }

    /// Drops one range previously passed to [`IsaMemoryMap::set_external`] with the same bounds.
    pub fn clear_external(&mut self, base: u32, len: u32) {
        if let Some(idx) = self.external.iter().position(|&r| r == (base, len)) {
            self.external.remove(idx);
        }
    }

    pub fn external_count(&self) -> usize {
        self.external.len()
    }

    /// Current description of mapping `id`, including its live enable state and target.
    pub fn mapping(&self, id: MappingId) -> Option<&MappingDesc> {
        self.mappings.iter().find(|m| m.id == id).map(|m| &m.desc)
    }

    pub fn mapping_count(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_external(&self, addr: u32) -> bool {
        self.external
            .iter()
            .any(|&(base, len)| addr >= base && addr - base < len)
    }

    pub fn ram(&self) -> &DenseMemory {
        &self.ram
    }

    fn find(&mut self, addr: u32) -> Option<&mut Mapping> {
        self.mappings
            .iter_mut()
            .rev()
            .find(|m| m.desc.enabled && m.contains(addr))
    }

    fn desc_mut(&mut self, id: MappingId) -> Option<&mut MappingDesc> {
        self.mappings
            .iter_mut()
            .find(|m| m.id == id)
            .map(|m| &mut m.desc)
    }

    pub fn read_u8(&mut self, addr: u32) -> u8 {
        let addr = addr & self.address_mask;
        if let Some(m) = self.find(addr) {
            return m.handler.read_u8(addr);
        }
        if self.is_external(addr) {
            return OPEN_BUS_U8;
        }
        self.ram.read_u8_le(u64::from(addr)).unwrap_or(OPEN_BUS_U8)
    }

    pub fn write_u8(&mut self, addr: u32, value: u8) {
        let addr = addr & self.address_mask;
        if let Some(m) = self.find(addr) {
            m.handler.write_u8(addr, value);
            return;
        }
        if !self.is_external(addr) {
            let _ = self.ram.write_u8_le(u64::from(addr), value);
        }
    }

    /// Word read. Byte-only mappings and words straddling a mapping edge are split into two
    /// byte cycles.
    pub fn read_u16(&mut self, addr: u32) -> u16 {
        let addr = addr & self.address_mask;
        if let Some(m) = self.find(addr) {
            if m.desc.width == AccessWidth::Word && m.contains(addr.wrapping_add(1)) {
                return m.handler.read_u16(addr);
            }
        }
        let lo = self.read_u8(addr);
        let hi = self.read_u8(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    pub fn write_u16(&mut self, addr: u32, value: u16) {
        let addr = addr & self.address_mask;
        if let Some(m) = self.find(addr) {
            if m.desc.width == AccessWidth::Word && m.contains(addr.wrapping_add(1)) {
                m.handler.write_u16(addr, value);
                return;
            }
        }
        let [lo, hi] = value.to_le_bytes();
        self.write_u8(addr, lo);
        self.write_u8(addr.wrapping_add(1), hi);
    }
}

impl MappingControl for IsaMemoryMap {
    fn enable_mapping(&mut self, id: MappingId) {
        if let Some(desc) = self.desc_mut(id) {
            desc.enabled = true;
        }
    }

    fn disable_mapping(&mut self, id: MappingId) {
        if let Some(desc) = self.desc_mut(id) {
            desc.enabled = false;
        }
    }

    fn set_mapping_exec(&mut self, id: MappingId, exec: usize) {
        if let Some(desc) = self.desc_mut(id) {
            desc.exec = exec;
        }
    }
}

impl memory::MemoryBus for IsaMemoryMap {
    fn read_physical(&mut self, paddr: u64, buf: &mut [u8]) {
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = match u32::try_from(paddr.wrapping_add(i as u64)) {
                Ok(addr) => self.read_u8(addr),
                Err(_) => OPEN_BUS_U8,
            };
        }
    }

    fn write_physical(&mut self, paddr: u64, buf: &[u8]) {
        for (i, &byte) in buf.iter().enumerate() {
            if let Ok(addr) = u32::try_from(paddr.wrapping_add(i as u64)) {
                self.write_u8(addr, byte);
            }
        }
    }
}
