use super::{arc::ArcMsgAddr, coords::XyPair, translation::CorePosition};

mod noc_endpoints;

pub use noc_endpoints::default_layout;

/// Bit `i` of the harvesting word ARC reports disables NOC row `HARVESTING_NOC_LOCATIONS[i]`.
pub const HARVESTING_NOC_LOCATIONS: &[u8] = &[5, 7, 4, 8, 3, 9, 2, 10, 1, 11];

pub const ARC_MSG_ADDR: ArcMsgAddr = ArcMsgAddr {
    scratch_base: 0x8_8003_0060,
    arc_misc_cntl: 0x8_8003_0100,
};

// No translation hardware; the NOC routes on physical coordinates.
pub(crate) fn translated_coord(core: &CorePosition) -> XyPair {
    core.physical
}
