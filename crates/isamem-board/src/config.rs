//! Board selection and the resolved, variant-free board configuration.
//!
//! A [`BoardSelection`] is what a configuration file names: a board type plus that board's
//! parameters. [`BoardSelection::resolve`] folds the per-board policy (fixed frame addresses,
//! default widths, whether the frame-configuration quirk applies) and the platform capabilities
//! into a [`BoardConfig`] that the rest of the crate consumes without ever looking at the variant
//! again.

use isamem_constants::{EMS_PORTS_PER_WINDOW, EMS_PORT_STRIDE, KIB};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Highest I/O base the per-window port layout can express (`io_base + 3 * 0x4000` must not wrap
/// into the next window's decode).
const IO_BASE_MASK: u16 = 0x3FFF;

/// Window 3's register pair must end at or below port `0xFFFF`.
const MAX_IO_BASE: u16 = EMS_PORT_STRIDE - EMS_PORTS_PER_WINDOW;

/// Up to this many boards can be installed in one machine.
pub const MAX_BOARDS: usize = 4;

/// Platform capabilities consulted once at board initialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCaps {
    /// The CPU/bus can address memory above 1MiB (80286 and later).
    pub extended_memory: bool,
    /// The slot carries the 16-bit ISA extension.
    pub wide_bus: bool,
}

impl PlatformCaps {
    /// PC/XT class machine: 8-bit slots, 1MiB address space.
    pub const XT: Self = Self {
        extended_memory: false,
        wide_bus: false,
    };

    /// PC/AT class machine: 16-bit slots, 16MiB address space.
    pub const AT: Self = Self {
        extended_memory: true,
        wide_bus: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardKind {
    IbmXt,
    IbmAt,
    P5Pak,
    Ems5150,
    Ev159,
    Rampage,
}

impl BoardKind {
    pub const ALL: [BoardKind; 6] = [
        BoardKind::IbmXt,
        BoardKind::IbmAt,
        BoardKind::P5Pak,
        BoardKind::Ems5150,
        BoardKind::Ev159,
        BoardKind::Rampage,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BoardKind::IbmXt => "IBM PC/XT Memory Expansion",
            BoardKind::IbmAt => "IBM PC/AT Memory Expansion",
            BoardKind::P5Pak => "Paradise Systems 5-PAK",
            BoardKind::Ems5150 => "Micro Mainframe EMS-5150(T)",
            BoardKind::Ev159 => "Everex EV-159 RAM 3000 Deluxe",
            BoardKind::Rampage => "AST RAMpage/XT",
        }
    }

    pub fn internal_name(self) -> &'static str {
        match self {
            BoardKind::IbmXt => "ibmxt",
            BoardKind::IbmAt => "ibmat",
            BoardKind::P5Pak => "p5pak",
            BoardKind::Ems5150 => "ems5150",
            BoardKind::Ev159 => "ev159",
            BoardKind::Rampage => "rampage",
        }
    }

    /// Looks a board up by internal name. `"none"` and unknown names yield `None`.
    pub fn from_internal_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.internal_name() == name)
    }
}

mod defaults {
    pub(super) fn xt_size() -> u32 {
        128
    }
    pub(super) fn xt_start() -> u32 {
        256
    }
    pub(super) fn at_size() -> u32 {
        512
    }
    pub(super) fn at_start() -> u32 {
        512
    }
    pub(super) fn p5pak_size() -> u32 {
        128
    }
    pub(super) fn p5pak_start() -> u32 {
        512
    }
    pub(super) fn ems5150_size() -> u32 {
        256
    }
    pub(super) fn ev159_size() -> u32 {
        512
    }
    pub(super) fn rampage_size() -> u32 {
        128
    }
    pub(super) fn io_base() -> u16 {
        0x0258
    }
}

/// A board type together with its user-facing parameters.
///
/// Sizes and start addresses are in KiB, as on the boards' DIP switches. Missing fields take the
/// board's factory defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "board", rename_all = "lowercase")]
pub enum BoardSelection {
    IbmXt {
        #[serde(default = "defaults::xt_size")]
        size_kib: u32,
        #[serde(default = "defaults::xt_start")]
        start_kib: u32,
    },
    IbmAt {
        #[serde(default = "defaults::at_size")]
        size_kib: u32,
        #[serde(default = "defaults::at_start")]
        start_kib: u32,
    },
    P5Pak {
        #[serde(default = "defaults::p5pak_size")]
        size_kib: u32,
        #[serde(default = "defaults::p5pak_start")]
        start_kib: u32,
    },
    Ems5150 {
        #[serde(default = "defaults::ems5150_size")]
        size_kib: u32,
        /// One of `0x208`, `0x20A`, `0x20C`, `0x20E`; `0` disables the board's EMS registers.
        #[serde(default)]
        io_base: u16,
    },
    Ev159 {
        #[serde(default = "defaults::ev159_size")]
        size_kib: u32,
        #[serde(default)]
        start_kib: u32,
        /// How much of the board is exposed as contiguous memory; the rest funds EMS.
        #[serde(default)]
        length_kib: u32,
        #[serde(default)]
        wide: bool,
        #[serde(default)]
        fast: bool,
        #[serde(default)]
        ems: bool,
        #[serde(default = "defaults::io_base")]
        io_base: u16,
    },
    Rampage {
        #[serde(default = "defaults::rampage_size")]
        size_kib: u32,
        #[serde(default = "defaults::io_base")]
        io_base: u16,
        /// Page frame segment base (`0xC0000`, `0xD0000`, `0xE0000`); `0` disables EMS.
        #[serde(default)]
        frame: u32,
        #[serde(default)]
        wide: bool,
        #[serde(default)]
        fast: bool,
    },
}

impl BoardSelection {
    /// The board with its factory-default parameters.
    pub fn default_for(kind: BoardKind) -> Self {
        match kind {
            BoardKind::IbmXt => BoardSelection::IbmXt {
                size_kib: defaults::xt_size(),
                start_kib: defaults::xt_start(),
            },
            BoardKind::IbmAt => BoardSelection::IbmAt {
                size_kib: defaults::at_size(),
                start_kib: defaults::at_start(),
            },
            BoardKind::P5Pak => BoardSelection::P5Pak {
                size_kib: defaults::p5pak_size(),
                start_kib: defaults::p5pak_start(),
            },
            BoardKind::Ems5150 => BoardSelection::Ems5150 {
                size_kib: defaults::ems5150_size(),
                io_base: 0,
            },
            BoardKind::Ev159 => BoardSelection::Ev159 {
                size_kib: defaults::ev159_size(),
                start_kib: 0,
                length_kib: 0,
                wide: false,
                fast: false,
                ems: false,
                io_base: defaults::io_base(),
            },
            BoardKind::Rampage => BoardSelection::Rampage {
                size_kib: defaults::rampage_size(),
                io_base: defaults::io_base(),
                frame: 0,
                wide: false,
                fast: false,
            },
        }
    }

    pub fn kind(&self) -> BoardKind {
        match self {
            BoardSelection::IbmXt { .. } => BoardKind::IbmXt,
            BoardSelection::IbmAt { .. } => BoardKind::IbmAt,
            BoardSelection::P5Pak { .. } => BoardKind::P5Pak,
            BoardSelection::Ems5150 { .. } => BoardKind::Ems5150,
            BoardSelection::Ev159 { .. } => BoardKind::Ev159,
            BoardSelection::Rampage { .. } => BoardKind::Rampage,
        }
    }

    /// Resolve the selection against the platform into a variant-free configuration.
    ///
    /// Inconsistent requests are narrowed rather than rejected: a 16-bit board in an 8-bit slot
    /// runs 8-bit, a contiguous length larger than the board is clamped, and an I/O base that
    /// would collide with the next window's decode is masked. If window 3's registers would still
    /// run past port `0xFFFF`, EMS is turned off.
    pub fn resolve(&self, caps: PlatformCaps) -> BoardConfig {
        let kind = self.kind();
        let mut cfg = BoardConfig {
            kind,
            name: kind.name(),
            total_kib: 0,
            start_addr: 0,
            contiguous_kib: 0,
            frame_addr: 0,
            io_base: 0,
            wide: false,
            fast: false,
            ems: false,
            frame_config_gate: false,
            extended_memory: caps.extended_memory,
        };

        match *self {
            BoardSelection::IbmXt {
                size_kib,
                start_kib,
            }
            | BoardSelection::P5Pak {
                size_kib,
                start_kib,
            } => {
                cfg.total_kib = size_kib;
                cfg.start_addr = start_kib.saturating_mul(KIB);
                cfg.contiguous_kib = size_kib;
            }
            BoardSelection::IbmAt {
                size_kib,
                start_kib,
            } => {
                cfg.total_kib = size_kib;
                cfg.start_addr = start_kib.saturating_mul(KIB);
                cfg.contiguous_kib = size_kib;
                cfg.wide = true;
            }
            BoardSelection::Ems5150 { size_kib, io_base } => {
                cfg.total_kib = size_kib;
                cfg.io_base = io_base;
                cfg.frame_addr = 0xD0000;
                cfg.ems = io_base != 0;
            }
            BoardSelection::Ev159 {
                size_kib,
                start_kib,
                length_kib,
                wide,
                fast,
                ems,
                io_base,
            } => {
                cfg.total_kib = size_kib;
                cfg.start_addr = start_kib.saturating_mul(KIB);
                cfg.contiguous_kib = length_kib;
                cfg.wide = wide;
                cfg.fast = fast;
                cfg.ems = ems;
                cfg.io_base = io_base;
                cfg.frame_addr = 0xE0000;
                // The EV-159 EMM driver must program a frame register before any page mapping
                // takes effect.
                cfg.frame_config_gate = true;
            }
            BoardSelection::Rampage {
                size_kib,
                io_base,
                frame,
                wide,
                fast,
            } => {
                cfg.total_kib = size_kib;
                cfg.io_base = io_base;
                cfg.frame_addr = frame;
                cfg.wide = wide;
                cfg.fast = fast;
                cfg.ems = frame != 0;
            }
        }

        if cfg.wide && !caps.wide_bus {
            warn!(board = cfg.name, "not an AT+ system, forcing 8-bit mode");
            cfg.wide = false;
        }
        if cfg.contiguous_kib > cfg.total_kib {
            warn!(
                board = cfg.name,
                contiguous_kib = cfg.contiguous_kib,
                total_kib = cfg.total_kib,
                "contiguous size exceeds board size, clamping"
            );
            cfg.contiguous_kib = cfg.total_kib;
        }
        if cfg.io_base & !IO_BASE_MASK != 0 {
            warn!(
                board = cfg.name,
                io_base = cfg.io_base,
                "I/O base outside the window register layout, masking"
            );
            cfg.io_base &= IO_BASE_MASK;
        }
        if cfg.ems && cfg.io_base > MAX_IO_BASE {
            warn!(
                board = cfg.name,
                io_base = cfg.io_base,
                "EMS registers would run past port 0xFFFF, EMS disabled"
            );
            cfg.ems = false;
        }

        cfg
    }
}

/// Fully resolved board configuration. Fixed for the lifetime of a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    pub kind: BoardKind,
    pub name: &'static str,
    pub total_kib: u32,
    /// Bus address where contiguous memory starts (bytes); `0` adds no regions.
    pub start_addr: u32,
    /// Portion of the board laid out as regions starting at `start_addr`.
    pub contiguous_kib: u32,
    /// Base of the EMS page frame in the upper memory area.
    pub frame_addr: u32,
    /// I/O base of window 0's register pair.
    pub io_base: u16,
    /// 16-bit transfers are available (already narrowed to the platform).
    pub wide: bool,
    /// Fast (<= 120ns) chips fitted. Informational only.
    pub fast: bool,
    pub ems: bool,
    /// Page-select writes are inert until a nonzero frame-configuration write.
    pub frame_config_gate: bool,
    /// The platform decodes memory above 1MiB.
    pub extended_memory: bool,
}

/// A machine's full set of memory boards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsaMemConfig {
    #[serde(default)]
    pub boards: Vec<BoardSelection>,
}
