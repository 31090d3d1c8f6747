//! Board-local RAM storage and the byte-addressed bus trait shared by ISA hosts.
//!
//! [`DenseMemory`] is the zero-initialized backing store a memory-expansion board owns for its
//! whole lifetime. Allocation is fallible: a board that cannot reserve its RAM must fail
//! construction instead of aborting the process.
//!
//! [`MemoryBus`] is the physical access view a host exposes to the CPU side.

#![forbid(unsafe_code)]

mod bus;
mod phys;

pub use bus::MemoryBus;
pub use phys::{DenseMemory, GuestMemory, GuestMemoryError, GuestMemoryResult};
