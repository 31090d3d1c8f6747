mod common;

use common::FakeHost;
use isamem_board::{partition, Board, BoardSelection, PartitionRequest, PlatformCaps};
use proptest::prelude::*;

const PAGE: u32 = 16 * 1024;

proptest! {
    #[test]
    fn partition_never_hands_out_more_than_the_pool(
        total_kib in 0u32..16 * 1024,
        start_kib in prop_oneof![Just(0u32), 0u32..640, Just(640u32), Just(1024u32)],
        contiguous_kib in 0u32..20 * 1024,
        at in any::<bool>(),
    ) {
        let layout = partition(&PartitionRequest {
            total_kib,
            start_addr: start_kib * 1024,
            contiguous_kib,
            extended_memory: at,
            wide: at,
        });

        let total = u64::from(total_kib) * 1024;
        let used = layout.region_bytes() + layout.ems.len() as u64;
        prop_assert!(used <= total);

        // Nothing is lost when no contiguous memory is requested and EMS fits whole pages
        // under the ceiling.
        if (start_kib == 0 || contiguous_kib == 0) && total_kib <= 2048 && total_kib % 16 == 0 {
            prop_assert!(layout.regions.is_empty());
            prop_assert_eq!(used, total);
        }
        // An AT board laid out in full places every byte as regions.
        if at && start_kib > 0 && contiguous_kib >= total_kib {
            prop_assert_eq!(layout.region_bytes(), total);
            prop_assert_eq!(used, total);
        }

        // Regions tile the front of the pool without gaps or overlap.
        let mut offset = 0usize;
        for region in &layout.regions {
            prop_assert_eq!(region.offset, offset);
            offset += region.len as usize;
        }
        prop_assert_eq!(layout.ems.base, offset);
        prop_assert!(layout.ems.pages <= 128);
    }

    #[test]
    fn selected_page_reads_through_to_pool(
        page in 0u8..16,
        window in 0usize..4,
        offset in 0u32..PAGE,
        value in any::<u8>(),
    ) {
        let mut host = FakeHost::new(PlatformCaps::XT);
        let board = Board::from_selection(
            &BoardSelection::Ems5150 { size_kib: 256, io_base: 0x020A },
            &mut host,
        )
        .unwrap();
        let pool_offset = board.ems_pool_base() + usize::from(page) * PAGE as usize;
        board.write_ram(pool_offset + offset as usize, &[value]);

        board.select_page(&mut host, window, page, true);
        let addr = 0xD0000 + window as u32 * PAGE + offset;
        prop_assert_eq!(host.mem_read_u8(addr), value);
        prop_assert_eq!(board.read_window_u8(window, offset), value);
    }

    #[test]
    fn page_beyond_pool_leaves_window_disabled(page in 16u8..0x80, window in 0usize..4) {
        let mut host = FakeHost::new(PlatformCaps::XT);
        let board = Board::from_selection(
            &BoardSelection::Ems5150 { size_kib: 256, io_base: 0x020A },
            &mut host,
        )
        .unwrap();
        board.select_page(&mut host, window, 0, true);
        board.select_page(&mut host, window, page, true);

        prop_assert!(!board.window(window).unwrap().is_enabled());
        let id = board.window_mapping(window).unwrap();
        prop_assert!(!host.mapping(id).unwrap().enabled);
    }
}
