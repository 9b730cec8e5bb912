use std::{collections::HashSet, sync::Arc};

use ttx_coords::{
    Arch, ConfigurationError, CoordError, CoordSystem, CoordinateManager, CoreCoord, CoreType,
    HarvestAxis, HarvestingError, HarvestingMask, ManagerOptions, SocLayout, XyPair,
};

#[ctor::ctor]
fn test_init() {
    tracing_subscriber::util::SubscriberInitExt::init(
        tracing_subscriber::layer::SubscriberExt::with(
            tracing_subscriber::layer::SubscriberExt::with(
                tracing_subscriber::registry(),
                tracing_subscriber::fmt::layer(),
            ),
            tracing_subscriber::filter::EnvFilter::from_default_env(),
        ),
    );
}

const SYSTEMS: [CoordSystem; 4] = [
    CoordSystem::Logical,
    CoordSystem::Physical,
    CoordSystem::Virtual,
    CoordSystem::Translated,
];

/// Every worker column on a 10x12 grid.
fn all_worker_layout() -> SocLayout {
    let columns = (0..10).collect::<Vec<_>>();
    let rows = (0..12).collect::<Vec<_>>();
    SocLayout::worker_grid(XyPair::new(10, 12), &columns, &rows)
}

/// Checks that every live core round trips through every system, that no two cores of a
/// type share an address within a system and that no two cores of any type share a
/// translated address.
fn check_bijection(manager: &CoordinateManager) {
    let mut translated = HashSet::new();
    for core_type in CoreType::ADDRESSABLE {
        let logical = manager.cores(core_type, CoordSystem::Logical);
        let (width, height) = manager.grid_size(core_type);
        assert_eq!(logical.len(), width * height, "{core_type} logical grid is dense");

        for system in SYSTEMS {
            let mut seen = HashSet::new();
            for coord in &logical {
                let converted = manager.translate(*coord, system).unwrap();
                assert_eq!(converted.coord_system, system);
                assert!(seen.insert(converted.xy()), "{core_type} {converted:?} is reused");
                if system == CoordSystem::Translated {
                    assert!(
                        translated.insert(converted.xy()),
                        "{core_type} {converted:?} shares a translated address"
                    );
                }

                assert_eq!(manager.to_logical_coords(converted).unwrap(), *coord);
            }
        }
    }
}

#[test]
fn unharvested_custom_layout_is_identity() {
    let manager = CoordinateManager::create(Arch::Blackhole, all_worker_layout(), 0).unwrap();

    assert_eq!(manager.grid_size(CoreType::Worker), (10, 12));
    assert_eq!(manager.cores(CoreType::Worker, CoordSystem::Logical).len(), 120);

    let logical = CoreCoord::logical(0, 0, CoreType::Worker);
    let physical = manager.to_physical_coords(logical).unwrap();
    assert_eq!(physical, CoreCoord::physical(0, 0, CoreType::Worker));
    assert_eq!(manager.to_logical_coords(physical).unwrap(), logical);

    assert!(manager.harvested_cores().is_empty());
    assert_eq!(manager.arc_core(), None);
    check_bijection(&manager);
}

#[test]
fn harvested_column_disappears_from_logical_grid() {
    let manager =
        CoordinateManager::create(Arch::Blackhole, all_worker_layout(), 1 << 3).unwrap();

    assert_eq!(manager.grid_size(CoreType::Worker), (9, 12));
    let physical = manager.cores(CoreType::Worker, CoordSystem::Physical);
    assert_eq!(physical.len(), 108);
    assert!(physical.iter().all(|core| core.x != 3));

    let start = CoreCoord::physical(4, 0, CoreType::Worker);
    let logical = manager.to_logical_coords(start).unwrap();
    assert_eq!(logical, CoreCoord::logical(3, 0, CoreType::Worker));

    // Workers route on their virtual location, which closes the gap from the right.
    let translated = manager.to_translated_coords(start).unwrap();
    assert_eq!(translated, CoreCoord::translated(3, 0, CoreType::Worker));
    assert_eq!(manager.to_physical_coords(translated).unwrap(), start);

    assert_eq!(manager.harvested_x_coordinates(), vec![3]);
    assert!(manager.harvested_y_coordinates().is_empty());
    assert_eq!(manager.harvested_cores().len(), 12);
    assert_eq!(
        manager.core_type_at(XyPair::new(3, 5)),
        Some(CoreType::Harvested)
    );
    check_bijection(&manager);
}

#[test]
fn mask_beyond_worker_columns_is_rejected() {
    let err = CoordinateManager::create(Arch::Blackhole, all_worker_layout(), 1 << 10).unwrap_err();

    assert!(
        matches!(
            err,
            CoordError::Harvesting(HarvestingError::InvalidConfiguration {
                axis: HarvestAxis::Column,
                axis_len: 10,
                ..
            })
        ),
        "{err:?}"
    );
}

#[test]
fn harvesting_every_column_is_rejected() {
    let err =
        CoordinateManager::create(Arch::Blackhole, all_worker_layout(), (1 << 10) - 1).unwrap_err();

    assert_eq!(
        err,
        CoordError::Configuration(ConfigurationError::AllWorkersHarvested(HarvestAxis::Column))
    );
}

#[test]
fn wormhole_first_row_harvested() {
    let manager = CoordinateManager::for_arch(
        Arch::Wormhole,
        ManagerOptions::new().harvesting_mask(HarvestingMask(1)),
    )
    .unwrap();

    assert_eq!(manager.grid_size(CoreType::Worker), (8, 9));
    assert_eq!(manager.harvested_y_coordinates(), vec![1]);

    let logical = CoreCoord::logical(0, 0, CoreType::Worker);
    assert_eq!(
        manager.to_virtual_coords(logical).unwrap(),
        CoreCoord::virtual_(1, 1, CoreType::Worker)
    );
    assert_eq!(
        manager.to_physical_coords(logical).unwrap(),
        CoreCoord::physical(1, 2, CoreType::Worker)
    );
    assert_eq!(
        manager.to_translated_coords(logical).unwrap(),
        CoreCoord::translated(18, 18, CoreType::Worker)
    );

    // The harvested row is only visible physically.
    let harvested = CoreCoord::physical(1, 1, CoreType::Worker);
    assert_eq!(
        manager.to_logical_coords(harvested),
        Err(CoordError::UnknownCoordinate(harvested))
    );
    assert_eq!(manager.core_type_at(XyPair::new(1, 1)), Some(CoreType::Harvested));
    assert_eq!(manager.cores(CoreType::Harvested, CoordSystem::Physical).len(), 8);
    assert!(manager
        .cores(CoreType::Harvested, CoordSystem::Translated)
        .is_empty());
}

#[test]
fn wormhole_ethernet_translation() {
    let manager = CoordinateManager::for_arch(Arch::Wormhole, ManagerOptions::new()).unwrap();

    let eth = CoreCoord::physical(1, 0, CoreType::Ethernet);
    assert_eq!(
        manager.to_translated_coords(eth).unwrap(),
        CoreCoord::translated(18, 16, CoreType::Ethernet)
    );
    let eth = CoreCoord::physical(9, 6, CoreType::Ethernet);
    assert_eq!(
        manager.to_translated_coords(eth).unwrap(),
        CoreCoord::translated(25, 17, CoreType::Ethernet)
    );

    // ARC keeps its NOC0 location.
    assert_eq!(
        manager.arc_core(),
        Some(CoreCoord::translated(0, 10, CoreType::Arc))
    );
}

#[test]
fn every_wormhole_mask() {
    for mask in 0..(1u32 << 10) - 1 {
        let manager = CoordinateManager::for_arch(
            Arch::Wormhole,
            ManagerOptions::new().harvesting_mask(mask),
        )
        .unwrap();

        let rows = 10 - mask.count_ones() as usize;
        assert_eq!(manager.grid_size(CoreType::Worker), (8, rows), "mask {mask:#x}");

        let harvested_y = manager.harvested_y_coordinates();
        assert_eq!(harvested_y.len(), mask.count_ones() as usize);
        assert!(manager
            .cores(CoreType::Worker, CoordSystem::Physical)
            .iter()
            .all(|core| !harvested_y.contains(&core.y)));

        // Translated workers always pack into the top-left of the translated window.
        let translated = manager.cores(CoreType::Worker, CoordSystem::Translated);
        assert!(translated
            .iter()
            .all(|core| (18..26).contains(&core.x) && (18..18 + rows as u8).contains(&core.y)));

        check_bijection(&manager);
    }

    let err = CoordinateManager::for_arch(
        Arch::Wormhole,
        ManagerOptions::new().harvesting_mask((1u32 << 10) - 1),
    )
    .unwrap_err();
    assert_eq!(
        err,
        CoordError::Configuration(ConfigurationError::AllWorkersHarvested(HarvestAxis::Row))
    );
}

#[test]
fn grayskull_has_no_translation() {
    let err = CoordinateManager::for_arch(
        Arch::Grayskull,
        ManagerOptions::new().noc_translation(true),
    )
    .unwrap_err();
    assert_eq!(
        err,
        CoordError::Configuration(ConfigurationError::TranslationUnsupported {
            arch: Arch::Grayskull
        })
    );

    let manager =
        CoordinateManager::for_arch(Arch::Grayskull, ManagerOptions::new().harvesting_mask(0b11))
            .unwrap();
    assert!(!manager.noc_translation_enabled());

    // Bits 0 and 1 select rows 1 and 2, the first two worker rows.
    assert_eq!(manager.harvested_y_coordinates(), vec![1, 2]);
    for core in manager.cores(CoreType::Worker, CoordSystem::Logical) {
        assert_eq!(
            manager.to_translated_coords(core).unwrap().xy(),
            manager.to_physical_coords(core).unwrap().xy()
        );
    }
    check_bijection(&manager);
}

#[test]
fn wormhole_harvesting_needs_translation() {
    let err = CoordinateManager::for_arch(
        Arch::Wormhole,
        ManagerOptions::new()
            .harvesting_mask(1)
            .noc_translation(false),
    )
    .unwrap_err();
    assert_eq!(
        err,
        CoordError::Configuration(ConfigurationError::HarvestingRequiresTranslation {
            arch: Arch::Wormhole
        })
    );

    // Without harvesting the NOC simply routes on physical locations.
    let manager =
        CoordinateManager::for_arch(Arch::Wormhole, ManagerOptions::new().noc_translation(false))
            .unwrap();
    let core = CoreCoord::logical(2, 3, CoreType::Worker);
    assert_eq!(
        manager.to_translated_coords(core).unwrap().xy(),
        manager.to_physical_coords(core).unwrap().xy()
    );
}

#[test]
fn blackhole_harvesting_without_translation() {
    let manager = CoordinateManager::for_arch(
        Arch::Blackhole,
        ManagerOptions::new()
            .harvesting_mask(1 << 0)
            .noc_translation(false),
    )
    .unwrap();

    // Column 1 is gone, logical x 0 is now column 2 in every system but virtual.
    let core = CoreCoord::logical(0, 0, CoreType::Worker);
    assert_eq!(
        manager.to_translated_coords(core).unwrap(),
        CoreCoord::translated(2, 2, CoreType::Worker)
    );
    assert_eq!(
        manager.to_virtual_coords(core).unwrap(),
        CoreCoord::virtual_(1, 2, CoreType::Worker)
    );
    check_bijection(&manager);
}

#[test]
fn blackhole_dram_harvesting() {
    let err = CoordinateManager::for_arch(
        Arch::Wormhole,
        ManagerOptions::new().dram_harvesting_mask(1),
    )
    .unwrap_err();
    assert_eq!(
        err,
        CoordError::Configuration(ConfigurationError::DramHarvestingUnsupported {
            arch: Arch::Wormhole
        })
    );

    let manager = CoordinateManager::for_arch(
        Arch::Blackhole,
        ManagerOptions::new().dram_harvesting_mask(1 << 1),
    )
    .unwrap();
    assert_eq!(manager.grid_size(CoreType::Dram), (7, 3));

    // Channel 1 is dropped, so logical channel 1 is the second channel on the west side.
    let dram = CoreCoord::logical(1, 0, CoreType::Dram);
    assert_eq!(
        manager.to_physical_coords(dram).unwrap(),
        CoreCoord::physical(0, 9, CoreType::Dram)
    );
    assert_eq!(
        manager.to_translated_coords(dram).unwrap(),
        CoreCoord::translated(18, 12, CoreType::Dram)
    );
    assert_eq!(
        manager.core_type_at(XyPair::new(0, 2)),
        Some(CoreType::Harvested)
    );
    check_bijection(&manager);
}

#[test]
fn dram_masks_must_leave_a_channel() {
    let err = CoordinateManager::for_arch(
        Arch::Blackhole,
        ManagerOptions::new().dram_harvesting_mask(0xff),
    )
    .unwrap_err();
    assert_eq!(
        err,
        CoordError::Configuration(ConfigurationError::AllDramHarvested)
    );

    let err = CoordinateManager::for_arch(
        Arch::Blackhole,
        ManagerOptions::new().dram_harvesting_mask(1 << 8),
    )
    .unwrap_err();
    assert_eq!(
        err,
        CoordError::Configuration(ConfigurationError::DramHarvestingOutOfRange {
            mask: 1 << 8,
            channels: 8
        })
    );
}

#[test]
fn blackhole_peripheral_translation() {
    let manager = CoordinateManager::for_arch(Arch::Blackhole, ManagerOptions::new()).unwrap();

    assert_eq!(
        manager
            .to_translated_coords(CoreCoord::physical(11, 0, CoreType::Pcie))
            .unwrap(),
        CoreCoord::translated(20, 24, CoreType::Pcie)
    );
    assert_eq!(
        manager
            .to_translated_coords(CoreCoord::physical(16, 1, CoreType::Ethernet))
            .unwrap(),
        CoreCoord::translated(21, 25, CoreType::Ethernet)
    );
    assert_eq!(
        manager.arc_core(),
        Some(CoreCoord::translated(8, 0, CoreType::Arc))
    );
    check_bijection(&manager);
}

#[test]
fn lookups_respect_core_type() {
    let manager = CoordinateManager::for_arch(Arch::Wormhole, ManagerOptions::new()).unwrap();

    let dram_as_worker = CoreCoord::physical(0, 0, CoreType::Worker);
    assert_eq!(
        manager.to_logical_coords(dram_as_worker),
        Err(CoordError::UnknownCoordinate(dram_as_worker))
    );

    let outside = CoreCoord::logical(8, 0, CoreType::Worker);
    assert_eq!(
        manager.to_physical_coords(outside),
        Err(CoordError::UnknownCoordinate(outside))
    );
}

#[test]
fn construction_is_deterministic() {
    let options = ManagerOptions::new().harvesting_mask(0b1010);
    let first = CoordinateManager::for_arch(Arch::Wormhole, options).unwrap();
    let second = CoordinateManager::for_arch(Arch::Wormhole, options).unwrap();

    assert_eq!(first, second);
}

#[test]
fn perf_banks_cover_every_worker() {
    for arch in [Arch::Grayskull, Arch::Wormhole, Arch::Blackhole] {
        let manager = CoordinateManager::for_arch(arch, ManagerOptions::new()).unwrap();
        let banks = manager.perf_dram_bank_to_workers();
        assert!(!banks.is_empty());

        let mut workers = HashSet::new();
        for (bank, assigned) in &banks {
            assert_eq!(bank.core_type, CoreType::Dram);
            assert_eq!(bank.coord_system, CoordSystem::Physical);
            assert!(!assigned.is_empty());
            for worker in assigned {
                assert!(workers.insert(*worker), "{arch}: {worker:?} assigned twice");
            }
        }
        assert_eq!(
            workers.len(),
            manager.cores(CoreType::Worker, CoordSystem::Physical).len()
        );
    }
}

#[test]
fn shared_between_threads() {
    let manager = Arc::new(
        CoordinateManager::for_arch(Arch::Blackhole, ManagerOptions::new().harvesting_mask(0b101))
            .unwrap(),
    );

    let handles = (0..4)
        .map(|thread| {
            let manager = manager.clone();
            std::thread::spawn(move || {
                for y in 0..10 {
                    let logical = CoreCoord::logical(thread, y, CoreType::Worker);
                    let translated = manager.to_translated_coords(logical).unwrap();
                    assert_eq!(manager.to_logical_coords(translated).unwrap(), logical);
                }
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn oversized_dram_channel_is_rejected() {
    // One channel with 300 ports does not fit the logical port axis.
    let worker = XyPair::new(19, 19);
    let ports: Vec<XyPair> = (0..20)
        .flat_map(|y| (0..20).map(move |x| XyPair::new(x, y)))
        .filter(|core| *core != worker)
        .take(300)
        .collect();
    let layout = SocLayout::new(XyPair::new(20, 20), vec![worker]).dram(vec![ports]);

    let err = CoordinateManager::create(Arch::Grayskull, layout, 0).unwrap_err();
    assert_eq!(
        err,
        CoordError::Configuration(ConfigurationError::TooManyCores {
            core_type: CoreType::Dram,
            count: 300
        })
    );
}

#[test]
fn worker_and_dram_sharing_a_translated_address() {
    // The only worker translates to (18, 18), where this DRAM port already sits.
    let layout = SocLayout::worker_grid(XyPair::new(20, 20), &[1], &[1])
        .dram(vec![vec![XyPair::new(18, 18)]]);

    let err = CoordinateManager::create(Arch::Wormhole, layout, 0).unwrap_err();
    assert_eq!(
        err,
        CoordError::Configuration(ConfigurationError::TranslatedCollision {
            coord: XyPair::new(18, 18),
            first: CoreType::Worker,
            second: CoreType::Dram
        })
    );
}

#[test]
fn translated_worker_past_coordinate_width() {
    let columns: Vec<u8> = (0..255).collect();
    let layout = SocLayout::worker_grid(XyPair::new(255, 1), &columns, &[0]);

    let err = CoordinateManager::create(Arch::Wormhole, layout, 0).unwrap_err();
    assert_eq!(
        err,
        CoordError::Configuration(ConfigurationError::TranslatedOverflow {
            core_type: CoreType::Worker,
            logical: XyPair::new(238, 0)
        })
    );
}
