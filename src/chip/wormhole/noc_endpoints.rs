use crate::chip::{coords::XyPair, soc::SocLayout};

const DRAM_LOCATIONS: &[[(u8, u8); 3]] = &[
    [(0, 0), (0, 1), (0, 11)],
    [(0, 5), (0, 6), (0, 7)],
    [(5, 0), (5, 1), (5, 11)],
    [(5, 2), (5, 9), (5, 10)],
    [(5, 3), (5, 4), (5, 8)],
    [(5, 5), (5, 6), (5, 7)],
];
const ETH_LOCATIONS: &[(u8, u8)] = &[
    (9, 0),
    (1, 0),
    (8, 0),
    (2, 0),
    (7, 0),
    (3, 0),
    (6, 0),
    (4, 0),
    (9, 6),
    (1, 6),
    (8, 6),
    (2, 6),
    (7, 6),
    (3, 6),
    (6, 6),
    (4, 6),
];
const ARC_LOCATION: (u8, u8) = (0, 10);
const PCI_LOCATION: (u8, u8) = (0, 3);
const ROUTER_ONLY_LOCATIONS: &[(u8, u8)] = &[(0, 2), (0, 4), (0, 8), (0, 9)];

const GRID_SIZE_X: u8 = 10;
const GRID_SIZE_Y: u8 = 12;

pub(super) const ALL_TENSIX_ROWS: &[u8] = &[1, 2, 3, 4, 5, 7, 8, 9, 10, 11];
const ALL_TENSIX_COLS: &[u8] = &[1, 2, 3, 4, 6, 7, 8, 9];

fn xy((x, y): (u8, u8)) -> XyPair {
    XyPair::new(x, y)
}

pub fn default_layout() -> SocLayout {
    SocLayout::worker_grid(
        XyPair::new(GRID_SIZE_X, GRID_SIZE_Y),
        ALL_TENSIX_COLS,
        ALL_TENSIX_ROWS,
    )
    .dram(
        DRAM_LOCATIONS
            .iter()
            .map(|channel| channel.iter().copied().map(xy).collect())
            .collect(),
    )
    .ethernet(ETH_LOCATIONS.iter().copied().map(xy).collect())
    .pcie(vec![xy(PCI_LOCATION)])
    .arc(vec![xy(ARC_LOCATION)])
    .router_only(ROUTER_ONLY_LOCATIONS.iter().copied().map(xy).collect())
    // 1.5 MB per tensix
    .worker_l1_size(1536 * 1024)
    .eth_l1_size(256 * 1024)
    // 2 GB per channel
    .dram_bank_size(2 * 1024 * 1024 * 1024)
}
