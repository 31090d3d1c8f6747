use isamem_board::{Board, BoardKind, BoardSelection, IsaHost};
use isamem_platform::IsaPlatform;
use memory::MemoryBus;

const FRAME: u32 = 0xD0000;

fn ems5150(platform: &mut IsaPlatform) -> Board {
    Board::from_selection(
        &BoardSelection::Ems5150 {
            size_kib: 256,
            io_base: 0x0208,
        },
        platform,
    )
    .unwrap()
}

#[test]
fn out_to_page_register_maps_window_before_next_access() {
    let mut platform = IsaPlatform::xt(256 * 1024).unwrap();
    let board = ems5150(&mut platform);

    assert_eq!(platform.memory.read_u8(FRAME + 0x8010), 0xFF);

    platform.io_write(0x8208, 0x85);
    platform.memory.write_u8(FRAME + 0x8010, 0xAB);
    assert_eq!(board.ram_u8(5 * 16384 + 0x10), 0xAB);
    assert_eq!(platform.io_read(0x8208), 0x85);

    // Same page through another window aliases the same byte.
    platform.io_write(0x0208, 0x85);
    assert_eq!(platform.memory.read_u8(FRAME + 0x10), 0xAB);
}

#[test]
fn disabling_a_window_floats_it_high() {
    let mut platform = IsaPlatform::xt(256 * 1024).unwrap();
    let _board = ems5150(&mut platform);

    platform.io_write(0x4208, 0x80);
    platform.memory.write_u8(FRAME + 0x4000, 0x12);
    assert_eq!(platform.memory.read_u8(FRAME + 0x4000), 0x12);

    platform.io_write(0x4208, 0x00);
    assert_eq!(platform.memory.read_u8(FRAME + 0x4000), 0xFF);
    assert_eq!(platform.io_read(0x4208), 0x00);
}

#[test]
fn bus_block_reads_cross_window_boundary() {
    let mut platform = IsaPlatform::xt(256 * 1024).unwrap();
    let board = ems5150(&mut platform);
    board.write_ram(3 * 16384 + 0x3FFE, &[1, 2]);
    board.write_ram(7 * 16384, &[3, 4]);

    platform.io_write(0x0208, 0x83);
    platform.io_write(0x4208, 0x87);

    let mut buf = [0u8; 4];
    platform
        .memory
        .read_physical(u64::from(FRAME + 0x3FFE), &mut buf);
    assert_eq!(buf, [1, 2, 3, 4]);
}

#[test]
fn xt_memory_board_extends_planar_ram() {
    let mut platform = IsaPlatform::xt(256 * 1024).unwrap();
    let board = Board::from_selection(&BoardSelection::default_for(BoardKind::IbmXt), &mut platform)
        .unwrap();

    platform.memory.write_u8(0x100, 0x01);
    platform.memory.write_u8(256 * 1024, 0x02);
    assert_eq!(platform.memory.ram().as_slice()[0x100], 0x01);
    assert_eq!(board.ram_u8(0), 0x02);
    assert!(platform.memory.is_external(256 * 1024));
}

#[test]
fn at_word_accesses_reach_wide_extended_memory() {
    let mut platform = IsaPlatform::at(640 * 1024).unwrap();
    let board = Board::from_selection(
        &BoardSelection::IbmAt {
            size_kib: 512,
            start_kib: 1024,
        },
        &mut platform,
    )
    .unwrap();

    platform.memory.write_u16(0x10_0000, 0xBEEF);
    assert_eq!(board.ram_u8(0), 0xEF);
    assert_eq!(board.ram_u8(1), 0xBE);
    assert_eq!(platform.memory.read_u16(0x10_0000), 0xBEEF);
}

#[test]
fn gated_board_ignores_page_writes_until_frame_is_programmed() {
    let mut platform = IsaPlatform::at(640 * 1024).unwrap();
    let board = Board::from_selection(
        &BoardSelection::Ev159 {
            size_kib: 512,
            start_kib: 0,
            length_kib: 0,
            wide: true,
            fast: false,
            ems: true,
            io_base: 0x0258,
        },
        &mut platform,
    )
    .unwrap();
    board.write_ram(0x4000, &[0x5A]);

    platform.io_write(0x0258, 0x81);
    assert_eq!(platform.memory.read_u8(0xE0000), 0xFF);

    platform.io_write(0x0259, 0xE0);
    platform.io_write(0x0258, 0x81);
    assert_eq!(platform.memory.read_u8(0xE0000), 0x5A);
}

#[test]
fn removed_board_leaves_no_handlers_behind() {
    let mut platform = IsaPlatform::xt(256 * 1024).unwrap();
    let board = ems5150(&mut platform);
    platform.io_write(0x0208, 0x80);
    assert_eq!(platform.io.range_count(), 4);
    assert_eq!(platform.memory.mapping_count(), 4);

    board.remove(&mut platform);
    assert_eq!(platform.io.range_count(), 0);
    assert_eq!(platform.memory.mapping_count(), 0);
    assert_eq!(platform.io_read(0x0208), 0xFF);
    assert_eq!(platform.memory.read_u8(FRAME), 0xFF);

    // The slot can be reused.
    let _again = ems5150(&mut platform);
    assert!(!platform.capabilities().wide_bus);
}

#[test]
fn io_base_too_high_for_window_three_installs_without_ems() {
    let mut platform = IsaPlatform::xt(256 * 1024).unwrap();
    let board = Board::from_selection(
        &BoardSelection::Ems5150 {
            size_kib: 256,
            io_base: 0x3FFF,
        },
        &mut platform,
    )
    .unwrap();
    assert!(!board.config().ems);
    assert_eq!(platform.io.range_count(), 0);
    assert_eq!(platform.io_read(0xFFFF), 0xFF);
}

#[test]
fn removing_a_board_hands_its_range_back_to_planar_ram() {
    let mut platform = IsaPlatform::xt(640 * 1024).unwrap();
    platform.memory.write_u8(256 * 1024, 0x5A);

    for _ in 0..3 {
        let board =
            Board::from_selection(&BoardSelection::default_for(BoardKind::IbmXt), &mut platform)
                .unwrap();
        assert!(platform.memory.is_external(256 * 1024));
        assert_ne!(platform.memory.read_u8(256 * 1024), 0x5A);

        board.remove(&mut platform);
        assert_eq!(platform.memory.external_count(), 0);
        assert_eq!(platform.memory.read_u8(256 * 1024), 0x5A);
    }
}

