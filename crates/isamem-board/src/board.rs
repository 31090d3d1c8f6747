use crate::config::{BoardConfig, BoardSelection, IsaMemConfig, MAX_BOARDS};
use crate::ems::{EmsWindow, PageFrameController, WindowUpdate};
use crate::error::BoardError;
use crate::host::{
    AccessWidth, IsaHost, MappingControl, MappingDesc, MappingId, MemoryHandler, PortHandler,
};
use crate::partition::{
    partition, AddressRegion, EmsLayout, Layout, PartitionRequest, RegionKind,
};
use crate::pool::RamPool;
use crate::regs;
use isamem_constants::{EMS_PAGE_SIZE, EMS_PORTS_PER_WINDOW, EMS_WINDOWS, OPEN_BUS_U8};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct BoardState {
    pool: RamPool,
    ems: PageFrameController,
}

type SharedBoardState = Rc<RefCell<BoardState>>;

/// Accessors for one address region: the bus address maps linearly onto the pool.
struct RegionAccessor {
    state: SharedBoardState,
    base: u32,
    offset: usize,
}

impl RegionAccessor {
    fn pool_offset(&self, addr: u32) -> usize {
        self.offset + addr.wrapping_sub(self.base) as usize
    }
}

impl MemoryHandler for RegionAccessor {
    fn read_u8(&mut self, addr: u32) -> u8 {
        self.state.borrow().pool.read_u8(self.pool_offset(addr))
    }

    fn write_u8(&mut self, addr: u32, value: u8) {
        let off = self.pool_offset(addr);
        self.state.borrow_mut().pool.write_u8(off, value);
    }

    fn read_u16(&mut self, addr: u32) -> u16 {
        self.state.borrow().pool.read_u16(self.pool_offset(addr))
    }

    fn write_u16(&mut self, addr: u32, value: u16) {
        let off = self.pool_offset(addr);
        self.state.borrow_mut().pool.write_u16(off, value);
    }
}

/// Accessors for one EMS viewport window; the backing page is looked up per access.
struct WindowAccessor {
    state: SharedBoardState,
    window: usize,
    frame_base: u32,
}

impl MemoryHandler for WindowAccessor {
    fn read_u8(&mut self, addr: u32) -> u8 {
        self.state
            .borrow()
            .read_window_u8(self.window, addr.wrapping_sub(self.frame_base))
    }

    fn write_u8(&mut self, addr: u32, value: u8) {
        self.state
            .borrow_mut()
            .write_window_u8(self.window, addr.wrapping_sub(self.frame_base), value);
    }
}

/// Register decode for one window's port pair.
struct EmsPortHandler {
    state: SharedBoardState,
    io_base: u16,
    windows: [MappingId; EMS_WINDOWS],
}

impl PortHandler for EmsPortHandler {
    fn read(&mut self, port: u16) -> u8 {
        regs::read(&self.state.borrow().ems, self.io_base, port)
    }

    fn write(&mut self, port: u16, value: u8, mappings: &mut dyn MappingControl) {
        let update = regs::write(&mut self.state.borrow_mut().ems, self.io_base, port, value);
        if let Some((window, update)) = update {
            apply_window_update(mappings, self.windows[window], update);
        }
    }
}

impl BoardState {
    fn read_window_u8(&self, window: usize, offset: u32) -> u8 {
        match self.ems.translate(window, offset) {
            Some(off) => self.pool.read_u8(off),
            None => OPEN_BUS_U8,
        }
    }

    fn write_window_u8(&mut self, window: usize, offset: u32, value: u8) {
        if let Some(off) = self.ems.translate(window, offset) {
            self.pool.write_u8(off, value);
        }
    }
}

fn apply_window_update(mappings: &mut dyn MappingControl, id: MappingId, update: WindowUpdate) {
    match update {
        WindowUpdate::Map { offset } => {
            mappings.set_mapping_exec(id, offset);
            mappings.enable_mapping(id);
        }
        WindowUpdate::Unmap => mappings.disable_mapping(id),
        WindowUpdate::Inert => {}
    }
}

/// One installed memory-expansion board.
///
/// Created with [`Board::new`], which registers the board's regions, windows and register ports
/// with the host, and torn down with [`Board::remove`].
#[derive(Debug)]
pub struct Board {
    config: BoardConfig,
    layout: Layout,
    state: SharedBoardState,
    regions: Vec<(RegionKind, MappingId)>,
    windows: Option<[MappingId; EMS_WINDOWS]>,
}

impl Board {
    /// Resolves `selection` against the host's capabilities and installs the board.
    pub fn from_selection<H: IsaHost + ?Sized>(
        selection: &BoardSelection,
        host: &mut H,
    ) -> Result<Self, BoardError> {
        let config = selection.resolve(host.capabilities());
        Self::new(config, host)
    }

    pub fn new<H: IsaHost + ?Sized>(
        mut config: BoardConfig,
        host: &mut H,
    ) -> Result<Self, BoardError> {
        // Allocate before touching the host so a failure leaves nothing registered.
        let pool = RamPool::new(config.total_kib)?;

        info!(
            board = config.name,
            size_kib = config.total_kib,
            contiguous_kib = config.contiguous_kib,
            fast = config.fast,
            wide = config.wide,
            "memory expansion board"
        );

        let layout = partition(&PartitionRequest {
            total_kib: config.total_kib,
            start_addr: config.start_addr,
            contiguous_kib: config.contiguous_kib,
            extended_memory: config.extended_memory,
            wide: config.wide,
        });

        let ems = if config.ems {
            layout.ems
        } else {
            EmsLayout::default()
        };
        let state = Rc::new(RefCell::new(BoardState {
            pool,
            ems: PageFrameController::new(&ems, config.frame_addr, config.frame_config_gate),
        }));

        let mut regions = Vec::with_capacity(layout.regions.len());
        for region in &layout.regions {
            let id = host.add_mapping(
                MappingDesc {
                    base: region.base,
                    len: region.len,
                    width: region.width,
                    enabled: region.enabled,
                    exec: region.offset,
                },
                Box::new(RegionAccessor {
                    state: Rc::clone(&state),
                    base: region.base,
                    offset: region.offset,
                }),
            );
            host.set_external(region.base, region.len);
            regions.push((region.kind, id));
        }

        let windows = if config.ems {
            Self::install_ems(&config, &ems, &state, host)
        } else {
            None
        };
        if config.ems && windows.is_none() {
            // The register ports belong to someone else; drop back to a plain memory board.
            state.borrow_mut().ems = PageFrameController::new(
                &EmsLayout::default(),
                config.frame_addr,
                config.frame_config_gate,
            );
            config.ems = false;
        }

        Ok(Self {
            config,
            layout,
            state,
            regions,
            windows,
        })
    }

    /// Registers the page frame and its register ports. Returns `None`, with nothing left
    /// registered, if the host refuses any of the ports.
    fn install_ems<H: IsaHost + ?Sized>(
        config: &BoardConfig,
        ems: &EmsLayout,
        state: &SharedBoardState,
        host: &mut H,
    ) -> Option<[MappingId; EMS_WINDOWS]> {
        if ems.is_empty() {
            warn!(board = config.name, "EMS enabled but no memory left for pages");
        }
        debug!(
            io_base = config.io_base,
            size_kib = ems.size_kib,
            pages = ems.pages,
            frame = config.frame_addr,
            "EMS enabled"
        );

        let width = AccessWidth::for_bus(config.wide);
        let windows: [MappingId; EMS_WINDOWS] = std::array::from_fn(|i| {
            let frame_base = config.frame_addr.wrapping_add(i as u32 * EMS_PAGE_SIZE);
            host.add_mapping(
                MappingDesc {
                    base: frame_base,
                    len: EMS_PAGE_SIZE,
                    width,
                    enabled: false,
                    exec: ems.base,
                },
                Box::new(WindowAccessor {
                    state: Rc::clone(state),
                    window: i,
                    frame_base,
                }),
            )
        });

        for i in 0..EMS_WINDOWS {
            let port = regs::window_port(config.io_base, i);
            let handler = Box::new(EmsPortHandler {
                state: Rc::clone(state),
                io_base: config.io_base,
                windows,
            });
            if let Err(err) = host.set_io_handler(port, EMS_PORTS_PER_WINDOW, handler) {
                warn!(board = config.name, %err, "EMS registers unavailable, EMS disabled");
                for claimed in 0..i {
                    host.remove_io_handler(
                        regs::window_port(config.io_base, claimed),
                        EMS_PORTS_PER_WINDOW,
                    );
                }
                for id in windows {
                    host.remove_mapping(id);
                }
                return None;
            }
        }

        Some(windows)
    }

    /// Unregisters the board from `host`.
    ///
    /// Port handlers go first so no register write can reach the board once its mappings are
    /// gone; the RAM pool is freed when the last handler is dropped.
    pub fn remove<H: IsaHost + ?Sized>(self, host: &mut H) {
        if let Some(windows) = self.windows {
            for i in 0..EMS_WINDOWS {
                host.remove_io_handler(
                    regs::window_port(self.config.io_base, i),
                    EMS_PORTS_PER_WINDOW,
                );
            }
            for id in windows {
                host.remove_mapping(id);
            }
        }
        for (_, id) in self.regions {
            host.remove_mapping(id);
        }
        for region in &self.layout.regions {
            host.clear_external(region.base, region.len);
        }
        debug!(board = self.config.name, "memory expansion board removed");
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn regions(&self) -> &[AddressRegion] {
        &self.layout.regions
    }

    /// Host mapping registered for the region of `kind`, if the layout produced one.
    pub fn region_mapping(&self, kind: RegionKind) -> Option<MappingId> {
        self.regions
            .iter()
            .find_map(|&(k, id)| (k == kind).then_some(id))
    }

    /// Host mapping registered for EMS window `index`, when EMS is enabled.
    pub fn window_mapping(&self, index: usize) -> Option<MappingId> {
        self.windows.and_then(|w| w.get(index).copied())
    }

    /// Pages available to the page frame (0 when EMS is disabled).
    pub fn ems_pages(&self) -> u16 {
        self.state.borrow().ems.pages()
    }

    /// Offset of EMS page 0 within the RAM pool.
    pub fn ems_pool_base(&self) -> usize {
        self.state.borrow().ems.pool_base()
    }

    pub fn is_configured(&self) -> bool {
        self.state.borrow().ems.is_configured()
    }

    pub fn window(&self, index: usize) -> Option<EmsWindow> {
        self.state.borrow().ems.window(index).copied()
    }

    /// Selects `page` into window `index` (or disables it) and commits the host mapping before
    /// returning. Equivalent to a page-register write with the board's quirks applied.
    pub fn select_page(
        &self,
        mappings: &mut dyn MappingControl,
        index: usize,
        page: u8,
        enable: bool,
    ) {
        let update = self.state.borrow_mut().ems.select_page(index, page, enable);
        if let (Some(update), Some(windows)) = (update, self.windows) {
            apply_window_update(mappings, windows[index], update);
        }
    }

    /// Reads one of the board's EMS registers.
    pub fn read_port(&self, port: u16) -> u8 {
        regs::read(&self.state.borrow().ems, self.config.io_base, port)
    }

    /// Writes one of the board's EMS registers.
    pub fn write_port(&self, mappings: &mut dyn MappingControl, port: u16, value: u8) {
        let update = regs::write(
            &mut self.state.borrow_mut().ems,
            self.config.io_base,
            port,
            value,
        );
        if let (Some((window, update)), Some(windows)) = (update, self.windows) {
            apply_window_update(mappings, windows[window], update);
        }
    }

    pub fn read_window_u8(&self, index: usize, offset: u32) -> u8 {
        self.state.borrow().read_window_u8(index, offset)
    }

    pub fn write_window_u8(&self, index: usize, offset: u32, value: u8) {
        self.state.borrow_mut().write_window_u8(index, offset, value);
    }

    /// Little-endian word through a window; each byte wraps within the 16KiB page.
    pub fn read_window_u16(&self, index: usize, offset: u32) -> u16 {
        let state = self.state.borrow();
        let lo = state.read_window_u8(index, offset);
        let hi = state.read_window_u8(index, offset.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    pub fn write_window_u16(&self, index: usize, offset: u32, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        let mut state = self.state.borrow_mut();
        state.write_window_u8(index, offset, lo);
        state.write_window_u8(index, offset.wrapping_add(1), hi);
    }

    /// Reads the RAM pool directly, bypassing every mapping.
    pub fn read_ram(&self, offset: usize, buf: &mut [u8]) {
        let state = self.state.borrow();
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = state.pool.read_u8(offset + i);
        }
    }

    pub fn ram_u8(&self, offset: usize) -> u8 {
        self.state.borrow().pool.read_u8(offset)
    }

    /// Writes the RAM pool directly, bypassing every mapping.
    pub fn write_ram(&self, offset: usize, data: &[u8]) {
        let mut state = self.state.borrow_mut();
        for (i, &byte) in data.iter().enumerate() {
            state.pool.write_u8(offset + i, byte);
        }
    }

    pub fn ram_len(&self) -> usize {
        self.state.borrow().pool.len()
    }
}

/// Installs every board in `config`, up to [`MAX_BOARDS`].
///
/// Boards are independent instances. If one fails to construct, the ones already installed are
/// removed again before the error is returned.
pub fn install_boards<H: IsaHost + ?Sized>(
    config: &IsaMemConfig,
    host: &mut H,
) -> Result<Vec<Board>, BoardError> {
    if config.boards.len() > MAX_BOARDS {
        warn!(
            requested = config.boards.len(),
            max = MAX_BOARDS,
            "too many memory boards configured, ignoring the rest"
        );
    }

    let mut boards = Vec::new();
    for selection in config.boards.iter().take(MAX_BOARDS) {
        match Board::from_selection(selection, &mut *host) {
            Ok(board) => boards.push(board),
            Err(err) => {
                for board in boards.into_iter().rev() {
                    board.remove(&mut *host);
                }
                return Err(err);
            }
        }
    }
    Ok(boards)
}
