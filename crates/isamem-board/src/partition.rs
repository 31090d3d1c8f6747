//! Address-space partitioner.
//!
//! Lays the front of a board's RAM pool into bus regions, greedily and in a fixed order:
//! conventional memory up to 640KiB, then (when the board reaches exactly 640KiB with at least
//! 384KiB left) a parked UMA remap block, then extended memory above 1MiB on platforms that decode
//! it. Whatever the contiguous budget does not cover is the EMS tail.

use crate::host::AccessWidth;
use isamem_constants::{CONVENTIONAL_TOP, EMS_MAX_SIZE, EMS_PAGE_SIZE, KIB, UMA_SIZE};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// Extends conventional memory below 640KiB. Always live.
    Conventional,
    /// The 384KiB that would have shadowed the UMA, parked for a remapping facility. Registered
    /// disabled; the board never enables it.
    UmaRemap,
    /// Memory above 1MiB. Always live.
    Extended,
}

/// One contiguous view of the RAM pool on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRegion {
    pub kind: RegionKind,
    pub base: u32,
    pub len: u32,
    /// Offset of `base` within the RAM pool.
    pub offset: usize,
    pub enabled: bool,
    pub width: AccessWidth,
}

impl AddressRegion {
    pub fn end(&self) -> u32 {
        self.base + self.len
    }

    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.base && addr < self.end()
    }
}

/// The EMS pool: `pages` 16KiB pages starting at `base` within the RAM pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmsLayout {
    pub base: usize,
    pub size_kib: u32,
    pub pages: u16,
}

impl EmsLayout {
    pub fn len(&self) -> usize {
        usize::from(self.pages) * EMS_PAGE_SIZE as usize
    }

    pub fn is_empty(&self) -> bool {
        self.pages == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionRequest {
    pub total_kib: u32,
    /// `0` means "add no regions".
    pub start_addr: u32,
    pub contiguous_kib: u32,
    pub extended_memory: bool,
    /// Width advertised by the conventional region; the others only exist on AT-class layouts
    /// and are always word-capable.
    pub wide: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    pub regions: Vec<AddressRegion>,
    pub ems: EmsLayout,
}

impl Layout {
    pub fn region(&self, kind: RegionKind) -> Option<&AddressRegion> {
        self.regions.iter().find(|r| r.kind == kind)
    }

    /// Total bytes of the pool consumed by regions.
    pub fn region_bytes(&self) -> u64 {
        self.regions.iter().map(|r| u64::from(r.len)).sum()
    }
}

struct Cursor {
    offset: usize,
    remaining: u32,
    addr: u32,
}

impl Cursor {
    fn advance(&mut self, len: u32) {
        self.offset += len as usize;
        self.remaining -= len;
        self.addr += len;
    }
}

pub fn partition(req: &PartitionRequest) -> Layout {
    let total = req.total_kib.saturating_mul(KIB);
    let contiguous = req.contiguous_kib.saturating_mul(KIB).min(total);

    let mut regions = Vec::new();
    let mut ems_eligible = total;
    let mut cur = Cursor {
        offset: 0,
        remaining: contiguous,
        addr: req.start_addr,
    };

    if cur.addr > 0 && cur.remaining > 0 {
        // The contiguous budget belongs to the regions even if the platform can't place all of
        // it; only what lies beyond it funds EMS.
        ems_eligible = total - contiguous;

        let low = CONVENTIONAL_TOP.saturating_sub(cur.addr).min(cur.remaining);
        if low > 0 {
            debug!(
                at_kib = cur.addr >> 10,
                len_kib = low >> 10,
                "conventional RAM"
            );
            regions.push(AddressRegion {
                kind: RegionKind::Conventional,
                base: cur.addr,
                len: low,
                offset: cur.offset,
                enabled: true,
                width: AccessWidth::for_bus(req.wide),
            });
            cur.advance(low);
        }

        if cur.addr == CONVENTIONAL_TOP && cur.remaining >= UMA_SIZE {
            // Parked right above where the extended region will end.
            let base = cur.addr + cur.remaining;
            debug!(
                at_kib = base >> 10,
                len_kib = UMA_SIZE >> 10,
                "UMA remap block (disabled)"
            );
            regions.push(AddressRegion {
                kind: RegionKind::UmaRemap,
                base,
                len: UMA_SIZE,
                offset: cur.offset,
                enabled: false,
                width: AccessWidth::Word,
            });
            cur.advance(UMA_SIZE);
        }

        if req.extended_memory && cur.remaining > 0 {
            debug!(
                at_kib = cur.addr >> 10,
                len_kib = cur.remaining >> 10,
                "extended RAM"
            );
            let len = cur.remaining;
            regions.push(AddressRegion {
                kind: RegionKind::Extended,
                base: cur.addr,
                len,
                offset: cur.offset,
                enabled: true,
                width: AccessWidth::Word,
            });
            cur.advance(len);
        }
    }

    if ems_eligible > EMS_MAX_SIZE {
        warn!(
            eligible_kib = ems_eligible >> 10,
            "EMS 3.2 supports at most 2048KiB per board, clamping"
        );
    }
    let ems_size = ems_eligible.min(EMS_MAX_SIZE);
    let pages = (ems_size / EMS_PAGE_SIZE) as u16;

    Layout {
        regions,
        ems: EmsLayout {
            base: cur.offset,
            size_kib: ems_size >> 10,
            pages,
        },
    }
}
