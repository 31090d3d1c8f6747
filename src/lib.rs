//! Umbrella crate for the ISA memory-expansion board workspace.
//!
//! The board model lives in [`board`]; [`platform`] is the reference ISA host used to drive it the
//! way a CPU would (memory cycles through the memory map, `IN`/`OUT` through the I/O bus).

#![forbid(unsafe_code)]

pub use isamem_board as board;
pub use isamem_platform as platform;
