//! Register decode for the per-window EMS I/O ports.
//!
//! Window `w` owns the port pair at `io_base + w * 0x4000`:
//!
//! | offset | read                         | write                         |
//! |--------|------------------------------|-------------------------------|
//! | +0     | bit 7 = enabled, 0-6 = page  | bit 7 = enable, 0-6 = page    |
//! | +1     | not decoded (floats high)    | frame configuration           |
//!
//! The 16KiB port stride is how the boards decode their registers; EMM drivers program
//! exactly these addresses.

use crate::ems::{PageFrameController, WindowUpdate};
use isamem_constants::{EMS_ENABLE_BIT, EMS_PAGE_MASK, EMS_PORT_STRIDE, OPEN_BUS_U8};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmsRegister {
    PageSelect,
    FrameConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedPort {
    pub window: usize,
    pub register: EmsRegister,
}

/// First port of window `window`'s register pair.
pub fn window_port(io_base: u16, window: usize) -> u16 {
    io_base.wrapping_add((window as u16).wrapping_mul(EMS_PORT_STRIDE))
}

/// Decodes `port` the way the board does: the window comes from the port's 16KiB bank, the
/// register from its offset to `io_base` within that bank.
pub fn decode(io_base: u16, port: u16) -> Option<DecodedPort> {
    let window = usize::from(port / EMS_PORT_STRIDE);
    let register = match (port & (EMS_PORT_STRIDE - 1)).wrapping_sub(io_base) {
        0 => EmsRegister::PageSelect,
        1 => EmsRegister::FrameConfig,
        _ => return None,
    };
    Some(DecodedPort { window, register })
}

pub fn read(ctrl: &PageFrameController, io_base: u16, port: u16) -> u8 {
    let value = match decode(io_base, port) {
        Some(DecodedPort {
            window,
            register: EmsRegister::PageSelect,
        }) => ctrl.window(window).map_or(OPEN_BUS_U8, |win| {
            let enabled = if win.is_enabled() { EMS_ENABLE_BIT } else { 0 };
            win.page() | enabled
        }),
        _ => OPEN_BUS_U8,
    };
    trace!(port, value, "EMS register read");
    value
}

/// Applies a register write. Returns the window whose mapping the host must update, if any.
pub fn write(
    ctrl: &mut PageFrameController,
    io_base: u16,
    port: u16,
    value: u8,
) -> Option<(usize, WindowUpdate)> {
    trace!(port, value, "EMS register write");
    let decoded = decode(io_base, port)?;
    match decoded.register {
        EmsRegister::PageSelect => {
            let enable = value & EMS_ENABLE_BIT != 0;
            let update = ctrl.select_page(decoded.window, value & EMS_PAGE_MASK, enable)?;
            Some((decoded.window, update))
        }
        EmsRegister::FrameConfig => {
            ctrl.set_frame(decoded.window, value);
            None
        }
    }
}
