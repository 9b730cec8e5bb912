use std::collections::BTreeSet;

use super::{
    arc::ArcMsgAddr,
    coords::{CoreType, XyPair},
    soc::SocLayout,
    translation::CorePosition,
};

mod noc_endpoints;

pub use noc_endpoints::default_layout;

/// Bit `i` of the harvesting word ARC reports disables NOC row `HARVESTING_NOC_LOCATIONS[i]`.
pub const HARVESTING_NOC_LOCATIONS: &[u8] = &[11, 1, 10, 2, 9, 3, 8, 4, 7, 5];

pub const ARC_MSG_ADDR: ArcMsgAddr = ArcMsgAddr {
    scratch_base: 0x8_8003_0060,
    arc_misc_cntl: 0x8_8003_0100,
};

pub const TRANSLATED_WORKER_START: XyPair = XyPair::new(18, 18);
pub const TRANSLATED_ETH_START: XyPair = XyPair::new(18, 16);

fn offset(start: XyPair, x: usize, y: usize) -> Option<XyPair> {
    Some(XyPair::new(
        u8::try_from(start.x as usize + x).ok()?,
        u8::try_from(start.y as usize + y).ok()?,
    ))
}

fn axis_index(values: impl Iterator<Item = u8>, value: u8) -> Option<usize> {
    values.collect::<BTreeSet<_>>().iter().position(|v| *v == value)
}

/// Workers are packed from (18, 18) in logical order. Ethernet cores are packed from
/// (18, 16) by the rank of their column and row among all Ethernet cores, so the two
/// Ethernet rows land on 16 and 17. Everything else routes on its physical location.
pub(crate) fn translated_coord(layout: &SocLayout, core: &CorePosition) -> Option<XyPair> {
    match core.core_type {
        CoreType::Worker => offset(
            TRANSLATED_WORKER_START,
            core.logical.x as usize,
            core.logical.y as usize,
        ),
        CoreType::Ethernet => {
            let x = axis_index(layout.ethernet.iter().map(|c| c.x), core.physical.x)?;
            let y = axis_index(layout.ethernet.iter().map(|c| c.y), core.physical.y)?;
            offset(TRANSLATED_ETH_START, x, y)
        }
        CoreType::Dram
        | CoreType::Pcie
        | CoreType::Arc
        | CoreType::RouterOnly
        | CoreType::Harvested => Some(core.physical),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn harvesting_locations_cover_every_worker_row() {
        let mut rows = HARVESTING_NOC_LOCATIONS.to_vec();
        rows.sort();
        assert_eq!(rows, noc_endpoints::ALL_TENSIX_ROWS);
    }

    #[test]
    fn default_layout_fills_the_grid() {
        let layout = default_layout();
        layout.validate().unwrap();

        let dram = layout.dram.iter().map(|c| c.len()).sum::<usize>();
        let total = layout.workers.len()
            + dram
            + layout.ethernet.len()
            + layout.pcie.len()
            + layout.arc.len()
            + layout.router_only.len();
        assert_eq!(layout.workers.len(), 80);
        assert_eq!(total, 10 * 12);
    }

    #[test]
    fn ethernet_rows_translate_to_16_and_17() {
        let layout = default_layout();
        let core = |x, y| CorePosition {
            core_type: CoreType::Ethernet,
            logical: XyPair::new(0, 0),
            physical: XyPair::new(x, y),
            virtual_: XyPair::new(x, y),
        };

        assert_eq!(
            translated_coord(&layout, &core(1, 0)),
            Some(XyPair::new(18, 16))
        );
        assert_eq!(
            translated_coord(&layout, &core(9, 6)),
            Some(XyPair::new(25, 17))
        );
    }
}
