//! ISA memory-expansion board model with a LIM EMS 3.2 page frame.
//!
//! A board owns one flat RAM pool. At construction the [`partition`] step lays the front of the
//! pool into address-space regions (conventional memory up to 640KiB, a parked 384KiB UMA remap
//! block, extended memory above 1MiB) and hands the tail to the [`ems::PageFrameController`].
//! The controller drives four 16KiB viewport windows in the upper memory area; guest software
//! retargets them through the per-window I/O registers decoded by [`regs`].
//!
//! The board never owns the bus. Everything it needs from the emulator is expressed through the
//! [`host::IsaHost`] capability trait: mapping registration, enable/disable/retarget, and I/O
//! port handler registration. Handlers the board installs share its state through `Rc<RefCell<_>>`
//! and are dispatched single-threaded.

#![forbid(unsafe_code)]

pub mod board;
pub mod config;
pub mod ems;
pub mod error;
pub mod host;
pub mod partition;
pub mod pool;
pub mod regs;

pub use board::{install_boards, Board};
pub use config::{BoardConfig, BoardKind, BoardSelection, IsaMemConfig, PlatformCaps, MAX_BOARDS};
pub use ems::{EmsWindow, PageFrameController, WindowUpdate};
pub use error::BoardError;
pub use host::{
    AccessWidth, IoRangeError, IsaHost, MappingControl, MappingDesc, MappingId, MemoryHandler,
    PortHandler,
};
pub use partition::{partition, AddressRegion, EmsLayout, Layout, PartitionRequest, RegionKind};
pub use pool::RamPool;
