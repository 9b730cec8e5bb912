use crate::chip::{coords::XyPair, soc::SocLayout};

const DRAM_LOCATIONS: &[(u8, u8)] = &[
    (1, 6),
    (4, 6),
    (7, 6),
    (10, 6),
    (1, 0),
    (4, 0),
    (7, 0),
    (10, 0),
];
const ARC_LOCATION: (u8, u8) = (0, 2);
const PCI_LOCATION: (u8, u8) = (0, 4);
const ROUTER_ONLY_LOCATIONS: &[(u8, u8)] = &[
    (0, 0),
    (0, 11),
    (0, 1),
    (0, 10),
    (0, 9),
    (0, 3),
    (0, 8),
    (0, 7),
    (0, 5),
    (0, 6),
    (12, 0),
    (11, 0),
    (2, 0),
    (3, 0),
    (9, 0),
    (8, 0),
    (5, 0),
    (6, 0),
    (12, 6),
    (11, 6),
    (2, 6),
    (3, 6),
    (9, 6),
    (8, 6),
    (5, 6),
    (6, 6),
];

const GRID_SIZE_X: u8 = 13;
const GRID_SIZE_Y: u8 = 12;

pub(super) const ALL_TENSIX_ROWS: &[u8] = &[1, 2, 3, 4, 5, 7, 8, 9, 10, 11];

fn xy((x, y): (u8, u8)) -> XyPair {
    XyPair::new(x, y)
}

pub fn default_layout() -> SocLayout {
    let columns = (1..GRID_SIZE_X).collect::<Vec<_>>();

    SocLayout::worker_grid(
        XyPair::new(GRID_SIZE_X, GRID_SIZE_Y),
        &columns,
        ALL_TENSIX_ROWS,
    )
    .dram(DRAM_LOCATIONS.iter().map(|core| vec![xy(*core)]).collect())
    .pcie(vec![xy(PCI_LOCATION)])
    .arc(vec![xy(ARC_LOCATION)])
    .router_only(ROUTER_ONLY_LOCATIONS.iter().copied().map(xy).collect())
    // 1MB per tensix
    .worker_l1_size(1024 * 1024)
    // 1GB per channel
    .dram_bank_size(1024 * 1024 * 1024)
}
