use super::{
    coords::{CoreType, XyPair},
    soc::SocLayout,
    translation::CorePosition,
};

pub mod arc;
mod noc_endpoints;
pub mod telemetry;

pub use noc_endpoints::default_layout;

pub const TRANSLATED_DRAM_START: XyPair = XyPair::new(17, 12);
pub const TRANSLATED_PCIE_START: XyPair = XyPair::new(19, 24);
pub const TRANSLATED_ETH_START: XyPair = XyPair::new(20, 25);

fn offset(start: XyPair, x: usize, y: usize) -> Option<XyPair> {
    Some(XyPair::new(
        u8::try_from(start.x as usize + x).ok()?,
        u8::try_from(start.y as usize + y).ok()?,
    ))
}

/// Workers route on their virtual location, so harvested columns simply vanish from the
/// right of the grid. DRAM channels are packed two per column pair starting at (17, 12),
/// PCIe and Ethernet cores are laid out along rows 24 and 25.
pub(crate) fn translated_coord(layout: &SocLayout, core: &CorePosition) -> Option<XyPair> {
    let logical = core.logical;
    match core.core_type {
        CoreType::Worker => Some(core.virtual_),
        CoreType::Dram => {
            let (channel, port) = (logical.x as usize, logical.y as usize);
            offset(
                TRANSLATED_DRAM_START,
                channel % 2,
                layout.dram_ports() * (channel / 2) + port,
            )
        }
        CoreType::Pcie => offset(TRANSLATED_PCIE_START, logical.y as usize, 0),
        CoreType::Ethernet => offset(TRANSLATED_ETH_START, logical.y as usize, 0),
        CoreType::Arc | CoreType::RouterOnly | CoreType::Harvested => Some(core.physical),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_layout_is_valid() {
        let layout = default_layout();
        layout.validate().unwrap();

        assert_eq!(layout.workers.len(), 140);
        assert_eq!(layout.worker_columns(), noc_endpoints::TENSIX_COLS);
        assert_eq!(layout.dram.len(), 8);
        assert_eq!(layout.dram_ports(), 3);
        assert_eq!(layout.ethernet.len(), 14);
    }

    #[test]
    fn dram_translates_in_column_pairs() {
        let layout = default_layout();
        let dram = |channel, port| CorePosition {
            core_type: CoreType::Dram,
            logical: XyPair::new(channel, port),
            physical: XyPair::new(0, 0),
            virtual_: XyPair::new(0, 0),
        };

        assert_eq!(
            translated_coord(&layout, &dram(0, 0)),
            Some(XyPair::new(17, 12))
        );
        assert_eq!(
            translated_coord(&layout, &dram(1, 2)),
            Some(XyPair::new(18, 14))
        );
        assert_eq!(
            translated_coord(&layout, &dram(7, 2)),
            Some(XyPair::new(18, 23))
        );
    }
}
