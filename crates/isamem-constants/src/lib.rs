//! Shared address-map and register-layout constants for ISA memory-expansion boards.
//!
//! This crate exists so the board model (`isamem-board`) and the ISA host wiring
//! (`isamem-platform`) agree on the real-mode memory map and the LIM EMS 3.2 register layout.

#![forbid(unsafe_code)]

/// Bytes per KiB; board parameters are expressed in KiB.
pub const KIB: u32 = 1 << 10;

/// End of conventional (low) memory: 640KiB.
pub const CONVENTIONAL_TOP: u32 = 640 << 10;

/// Size of the upper memory area between [`CONVENTIONAL_TOP`] and [`EXTENDED_BASE`].
pub const UMA_SIZE: u32 = 384 << 10;

/// First byte of extended (high) memory: 1MiB.
pub const EXTENDED_BASE: u32 = 1024 << 10;

/// The ISA bus carries 24 address lines.
pub const ISA_ADDRESS_LIMIT: u32 = 1 << 24;

/// LIM EMS 3.2 page size (16KiB). Viewport windows are exactly one page wide.
pub const EMS_PAGE_SIZE: u32 = 16 << 10;

/// LIM EMS 3.2 caps a single board at 2048KiB of expanded memory.
pub const EMS_MAX_SIZE: u32 = 2048 << 10;

/// Maximum number of EMS pages a board can address (`EMS_MAX_SIZE / EMS_PAGE_SIZE`).
pub const EMS_MAX_PAGES: u16 = (EMS_MAX_SIZE / EMS_PAGE_SIZE) as u16;

/// Number of viewport windows in the page frame.
pub const EMS_WINDOWS: usize = 4;

/// Each window owns a pair of I/O ports: page select (+0) and frame configuration (+1).
pub const EMS_PORTS_PER_WINDOW: u16 = 2;

/// Window register ranges repeat every 16KiB of I/O space (`io_base + window * 0x4000`).
pub const EMS_PORT_STRIDE: u16 = EMS_PAGE_SIZE as u16;

/// Page-select register: bits 0-6 hold the page number.
pub const EMS_PAGE_MASK: u8 = 0x7F;

/// Page-select register: bit 7 enables the window.
pub const EMS_ENABLE_BIT: u8 = 0x80;

/// Value an undriven ISA data bus floats to.
pub const OPEN_BUS_U8: u8 = 0xFF;
