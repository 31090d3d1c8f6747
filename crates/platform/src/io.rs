use isamem_board::{IoRangeError, MappingControl, PortHandler};
use isamem_constants::OPEN_BUS_U8;

struct RangeDevice {
    start: u16,
    len: u16,
    dev: Box<dyn PortHandler>,
}

impl RangeDevice {
    fn end_exclusive(&self) -> u32 {
        u32::from(self.start) + u32::from(self.len)
    }

    fn contains(&self, port: u16) -> bool {
        let p = u32::from(port);
        p >= u32::from(self.start) && p < self.end_exclusive()
    }
}

/// 8-bit ISA I/O port bus.
///
/// Handlers claim contiguous port ranges. A write is dispatched with mutable access to the
/// memory map so a handler can retarget mappings before the write returns.
pub struct IsaIoBus {
    ranges: Vec<RangeDevice>,
}

impl IsaIoBus {
    pub fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Registers a single handler over a contiguous I/O port range.
    ///
    /// # Panics
    ///
    /// If the range is empty, wraps past `0xFFFF` or overlaps one already registered.
    pub fn register_range(&mut self, start: u16, len: u16, dev: Box<dyn PortHandler>) {
        if let Err(err) = self.try_register_range(start, len, dev) {
            panic!("{err}");
        }
    }

    /// Like [`IsaIoBus::register_range`], but hands conflicts back to the caller. On error the
    /// bus is unchanged and `dev` is dropped.
    pub fn try_register_range(
        &mut self,
        start: u16,
        len: u16,
        dev: Box<dyn PortHandler>,
    ) -> Result<(), IoRangeError> {
        assert!(len != 0, "I/O port range length must be non-zero");

        let end_exclusive = u32::from(start) + u32::from(len);
        if end_exclusive > 0x1_0000 {
            return Err(IoRangeError::Wraps { start, len });
        }

        let idx = self.ranges.partition_point(|r| r.start < start);

        // For deterministic dispatch, disallow overlapping ranges.
        let prev = self
            .ranges
            .get(idx.wrapping_sub(1))
            .filter(|prev| u32::from(start) < prev.end_exclusive());
        let next = self
            .ranges
            .get(idx)
            .filter(|next| end_exclusive > u32::from(next.start));
        if let Some(other) = prev.or(next) {
            return Err(IoRangeError::Overlap {
                start,
                len,
                other_start: other.start,
                other_len: other.len,
            });
        }

        self.ranges.insert(idx, RangeDevice { start, len, dev });
        Ok(())
    }

    /// Unregisters the handler previously registered for exactly `(start, len)`.
    pub fn unregister_range_device(
        &mut self,
        start: u16,
        len: u16,
    ) -> Option<Box<dyn PortHandler>> {
        if len == 0 {
            return None;
        }

        let idx = self.ranges.partition_point(|r| r.start < start);
        let cand = self.ranges.get(idx)?;
        if cand.start != start || cand.len != len {
            return None;
        }
        Some(self.ranges.remove(idx).dev)
    }

    fn find_range_index(&self, port: u16) -> Option<usize> {
        let idx = self.ranges.partition_point(|r| r.start <= port);
        if idx == 0 {
            return None;
        }
        let cand = idx - 1;
        self.ranges
            .get(cand)
            .is_some_and(|r| r.contains(port))
            .then_some(cand)
    }

    pub fn is_claimed(&self, port: u16) -> bool {
        self.find_range_index(port).is_some()
    }

    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn read_u8(&mut self, port: u16) -> u8 {
        match self.find_range_index(port) {
            Some(idx) => self.ranges[idx].dev.read(port),
            None => OPEN_BUS_U8,
        }
    }

    pub fn write_u8(&mut self, port: u16, value: u8, mappings: &mut dyn MappingControl) {
        if let Some(idx) = self.find_range_index(port) {
            self.ranges[idx].dev.write(port, value, mappings);
        }
    }
}

impl Default for IsaIoBus {
    fn default() -> Self {
        Self::new()
    }
}
