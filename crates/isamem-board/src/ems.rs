//! LIM EMS 3.2 page-frame controller.
//!
//! Four viewport windows sit back to back in the upper memory area, one 16KiB page each. A window
//! is either disabled or points at one page of the EMS pool; the pool offset is resolved when the
//! page is selected, never at access time.

use crate::partition::EmsLayout;
use isamem_constants::{EMS_PAGE_MASK, EMS_PAGE_SIZE, EMS_WINDOWS};
use tracing::trace;

/// State of one viewport window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmsWindow {
    enabled: bool,
    page: u8,
    frame: u8,
    resolved: usize,
    frame_base: u32,
}

impl EmsWindow {
    fn new(frame_base: u32, pool_base: usize) -> Self {
        Self {
            enabled: false,
            page: 0,
            frame: 0,
            resolved: pool_base,
            frame_base,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Last page number written (bits 0-6), whether or not it could be mapped.
    pub fn page(&self) -> u8 {
        self.page
    }

    /// Last value written to the window's frame-configuration register.
    pub fn frame(&self) -> u8 {
        self.frame
    }

    /// First bus address of the window.
    pub fn frame_base(&self) -> u32 {
        self.frame_base
    }

    /// Pool offset backing the window, while it is enabled.
    pub fn resolved_offset(&self) -> Option<usize> {
        self.enabled.then_some(self.resolved)
    }
}

/// What the host has to do after a page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowUpdate {
    /// Retarget the window's mapping at `offset` and enable it.
    Map { offset: usize },
    /// Disable the window's mapping.
    Unmap,
    /// Nothing: the board has not been configured yet.
    Inert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFrameController {
    windows: [EmsWindow; EMS_WINDOWS],
    pool_base: usize,
    pages: u16,
    configured: bool,
}

impl PageFrameController {
    /// Creates the controller with every window disabled.
    ///
    /// With `frame_config_gate` set, page selections stay inert until some window's
    /// frame-configuration register receives a nonzero value.
    pub fn new(ems: &EmsLayout, frame_addr: u32, frame_config_gate: bool) -> Self {
        let windows = std::array::from_fn(|i| {
            EmsWindow::new(frame_addr.wrapping_add(i as u32 * EMS_PAGE_SIZE), ems.base)
        });
        Self {
            windows,
            pool_base: ems.base,
            pages: ems.pages,
            configured: !frame_config_gate,
        }
    }

    pub fn pages(&self) -> u16 {
        self.pages
    }

    pub fn pool_base(&self) -> usize {
        self.pool_base
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn window(&self, index: usize) -> Option<&EmsWindow> {
        self.windows.get(index)
    }

    pub fn windows(&self) -> &[EmsWindow; EMS_WINDOWS] {
        &self.windows
    }

    /// Points window `index` at `page`, or disables it.
    ///
    /// A page beyond the pool is not an error: the window is disabled, the way the hardware
    /// refuses to decode a nonexistent page. Returns `None` for an index outside the frame.
    pub fn select_page(&mut self, index: usize, page: u8, enable: bool) -> Option<WindowUpdate> {
        let pages = self.pages;
        let pool_base = self.pool_base;
        let configured = self.configured;
        let win = self.windows.get_mut(index)?;

        win.page = page & EMS_PAGE_MASK;
        if !configured {
            win.enabled = false;
            trace!(window = index, page = win.page, "page select before frame configuration");
            return Some(WindowUpdate::Inert);
        }

        if enable && u16::from(win.page) < pages {
            win.resolved = pool_base + usize::from(win.page) * EMS_PAGE_SIZE as usize;
            win.enabled = true;
            Some(WindowUpdate::Map {
                offset: win.resolved,
            })
        } else {
            win.enabled = false;
            Some(WindowUpdate::Unmap)
        }
    }

    /// Latches a frame-configuration write. A nonzero value completes board configuration.
    pub fn set_frame(&mut self, index: usize, value: u8) {
        let Some(win) = self.windows.get_mut(index) else {
            return;
        };
        win.frame = value;
        if value != 0 && !self.configured {
            trace!(window = index, value, "frame configuration complete");
            self.configured = true;
        }
    }

    /// Pool offset for window-relative `offset`, or `None` while the window is disabled.
    pub fn translate(&self, index: usize, offset: u32) -> Option<usize> {
        let win = self.windows.get(index)?;
        let base = win.resolved_offset()?;
        Some(base + (offset % EMS_PAGE_SIZE) as usize)
    }
}
