use crate::chip::{coords::XyPair, soc::SocLayout};

const GRID_SIZE_X: u8 = 17;
const GRID_SIZE_Y: u8 = 12;

pub(super) const TENSIX_COLS: &[u8] = &[1, 2, 3, 4, 5, 6, 7, 10, 11, 12, 13, 14, 15, 16];
const TENSIX_ROWS: std::ops::RangeInclusive<u8> = 2..=11;

const GDDR_NOC0_COORDS: &[[(u8, u8); 3]] = &[
    [(0, 0), (0, 1), (0, 11)],
    [(0, 2), (0, 10), (0, 3)],
    [(0, 9), (0, 4), (0, 8)],
    [(0, 5), (0, 7), (0, 6)],
    [(9, 11), (9, 1), (9, 0)],
    [(9, 3), (9, 10), (9, 2)],
    [(9, 8), (9, 4), (9, 9)],
    [(9, 6), (9, 7), (9, 5)],
];

const ETH_ROW: u8 = 1;
const ETH_COLS: &[u8] = &[1, 16, 2, 15, 3, 14, 4, 13, 5, 12, 6, 11, 7, 10];

const ARC_LOCATION: (u8, u8) = (8, 0);
const PCIE_LOCATIONS: &[(u8, u8)] = &[(2, 0), (11, 0)];
const ROUTER_ONLY_COLS: &[u8] = &[1, 3, 4, 5, 6, 7, 10, 12, 13, 14, 15, 16];

fn xy((x, y): (u8, u8)) -> XyPair {
    XyPair::new(x, y)
}

pub fn default_layout() -> SocLayout {
    let rows = TENSIX_ROWS.collect::<Vec<_>>();

    SocLayout::worker_grid(XyPair::new(GRID_SIZE_X, GRID_SIZE_Y), TENSIX_COLS, &rows)
        .dram(
            GDDR_NOC0_COORDS
                .iter()
                .map(|channel| channel.iter().copied().map(xy).collect())
                .collect(),
        )
        .ethernet(ETH_COLS.iter().map(|x| XyPair::new(*x, ETH_ROW)).collect())
        .pcie(PCIE_LOCATIONS.iter().copied().map(xy).collect())
        .arc(vec![xy(ARC_LOCATION)])
        .router_only(ROUTER_ONLY_COLS.iter().map(|x| XyPair::new(*x, 0)).collect())
        .worker_l1_size(1536 * 1024)
        .eth_l1_size(512 * 1024)
        // 4 GB per channel
        .dram_bank_size(4 * 1024 * 1024 * 1024)
}
