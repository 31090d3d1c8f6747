#![allow(dead_code)]

use isamem_board::{
    IoRangeError, IsaHost, MappingControl, MappingDesc, MappingId, MemoryHandler, PlatformCaps,
    PortHandler,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    AddMapping(MappingId, MappingDesc),
    RemoveMapping(MappingId),
    Enable(MappingId),
    Disable(MappingId),
    SetExec(MappingId, usize),
    SetExternal(u32, u32),
    ClearExternal(u32, u32),
    SetIo(u16, u16),
    RemoveIo(u16, u16),
}

pub struct Mapping {
    pub desc: MappingDesc,
    handler: Box<dyn MemoryHandler>,
}

#[derive(Default)]
pub struct MappingTable {
    next_id: u32,
    pub mappings: BTreeMap<MappingId, Mapping>,
    pub events: Vec<HostEvent>,
}

impl MappingControl for MappingTable {
    fn enable_mapping(&mut self, id: MappingId) {
        self.events.push(HostEvent::Enable(id));
        if let Some(m) = self.mappings.get_mut(&id) {
            m.desc.enabled = true;
        }
    }

    fn disable_mapping(&mut self, id: MappingId) {
        self.events.push(HostEvent::Disable(id));
        if let Some(m) = self.mappings.get_mut(&id) {
            m.desc.enabled = false;
        }
    }

    fn set_mapping_exec(&mut self, id: MappingId, exec: usize) {
        self.events.push(HostEvent::SetExec(id, exec));
        if let Some(m) = self.mappings.get_mut(&id) {
            m.desc.exec = exec;
        }
    }
}

struct PortRange {
    base: u16,
    len: u16,
    handler: Box<dyn PortHandler>,
}

impl PortRange {
    fn overlaps(&self, base: u16, len: u16) -> bool {
        let (start, end) = (u32::from(base), u32::from(base) + u32::from(len));
        start < u32::from(self.base) + u32::from(self.len) && u32::from(self.base) < end
    }
}

/// Recording host: keeps every registration, routes accesses the way a real bus would (newest
/// enabled mapping wins, unclaimed cycles float high).
pub struct FakeHost {
    pub caps: PlatformCaps,
    pub table: MappingTable,
    ports: Vec<PortRange>,
}

impl FakeHost {
    pub fn new(caps: PlatformCaps) -> Self {
        Self {
            caps,
            table: MappingTable::default(),
            ports: Vec::new(),
        }
    }

    pub fn events(&self) -> &[HostEvent] {
        &self.table.events
    }

    pub fn clear_events(&mut self) {
        self.table.events.clear();
    }

    pub fn mapping(&self, id: MappingId) -> Option<&MappingDesc> {
        self.table.mappings.get(&id).map(|m| &m.desc)
    }

    pub fn mapping_count(&self) -> usize {
        self.table.mappings.len()
    }

    pub fn port_range_count(&self) -> usize {
        self.ports.len()
    }

    pub fn enabled_mappings(&self) -> Vec<MappingDesc> {
        self.table
            .mappings
            .values()
            .filter(|m| m.desc.enabled)
            .map(|m| m.desc)
            .collect()
    }

    fn route(&mut self, addr: u32) -> Option<&mut Mapping> {
        self.table
            .mappings
            .values_mut()
            .rev()
            .find(|m| m.desc.enabled && addr >= m.desc.base && addr - m.desc.base < m.desc.len)
    }

    pub fn mem_read_u8(&mut self, addr: u32) -> u8 {
        match self.route(addr) {
            Some(m) => m.handler.read_u8(addr),
            None => 0xFF,
        }
    }

    pub fn mem_write_u8(&mut self, addr: u32, value: u8) {
        if let Some(m) = self.route(addr) {
            m.handler.write_u8(addr, value);
        }
    }

    pub fn io_read(&mut self, port: u16) -> u8 {
        self.ports
            .iter_mut()
            .find(|r| port.wrapping_sub(r.base) < r.len)
            .map_or(0xFF, |r| r.handler.read(port))
    }

    pub fn io_write(&mut self, port: u16, value: u8) {
        let table = &mut self.table;
        if let Some(r) = self
            .ports
            .iter_mut()
            .find(|r| port.wrapping_sub(r.base) < r.len)
        {
            r.handler.write(port, value, table);
        }
    }
}

impl MappingControl for FakeHost {
    fn enable_mapping(&mut self, id: MappingId) {
        self.table.enable_mapping(id);
    }

    fn disable_mapping(&mut self, id: MappingId) {
        self.table.disable_mapping(id);
    }

    fn set_mapping_exec(&mut self, id: MappingId, exec: usize) {
        self.table.set_mapping_exec(id, exec);
    }
}

impl IsaHost for FakeHost {
    fn capabilities(&self) -> PlatformCaps {
        self.caps
    }

    fn add_mapping(&mut self, desc: MappingDesc, handler: Box<dyn MemoryHandler>) -> MappingId {
        let id = MappingId(self.table.next_id);
        self.table.next_id += 1;
        self.table.events.push(HostEvent::AddMapping(id, desc));
        self.table.mappings.insert(id, Mapping { desc, handler });
        id
    }

    fn remove_mapping(&mut self, id: MappingId) {
        self.table.events.push(HostEvent::RemoveMapping(id));
        self.table.mappings.remove(&id);
    }

    fn set_external(&mut self, base: u32, len: u32) {
        self.table.events.push(HostEvent::SetExternal(base, len));
    }

    fn clear_external(&mut self, base: u32, len: u32) {
        self.table.events.push(HostEvent::ClearExternal(base, len));
    }

    fn set_io_handler(
        &mut self,
        base: u16,
        len: u16,
        handler: Box<dyn PortHandler>,
    ) -> Result<(), IoRangeError> {
        if u32::from(base) + u32::from(len) > 0x1_0000 {
            return Err(IoRangeError::Wraps { start: base, len });
        }
        if let Some(other) = self.ports.iter().find(|r| r.overlaps(base, len)) {
            return Err(IoRangeError::Overlap {
                start: base,
                len,
                other_start: other.base,
                other_len: other.len,
            });
        }
        self.table.events.push(HostEvent::SetIo(base, len));
        self.ports.push(PortRange { base, len, handler });
        Ok(())
    }

    fn remove_io_handler(&mut self, base: u16, len: u16) {
        self.table.events.push(HostEvent::RemoveIo(base, len));
        self.ports.retain(|r| !(r.base == base && r.len == len));
    }
}
