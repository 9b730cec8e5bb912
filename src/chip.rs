use std::{collections::BTreeSet, str::FromStr};

use coords::XyPair;
use harvesting::{harvested_axis_values, HarvestAxis, HarvestingError, HarvestingMask};
use num_derive::FromPrimitive;
use soc::SocLayout;
use translation::CorePosition;

pub mod arc;
pub mod blackhole;
pub mod coordinate_manager;
pub mod coords;
mod dram_banks;
pub mod field;
pub mod grayskull;
pub mod harvesting;
pub mod noc;
pub mod soc;
pub mod translation;
pub mod wormhole;

/// Chip family. The discriminant is the PCI device id the family enumerates with.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, FromPrimitive)]
#[repr(u16)]
pub enum Arch {
    Grayskull = 0xfaca,
    Wormhole = 0x401e,
    Blackhole = 0xb140,
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arch::Grayskull => f.write_str("Grayskull"),
            Arch::Wormhole => f.write_str("Wormhole"),
            Arch::Blackhole => f.write_str("Blackhole"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown arch name {0:?}")]
pub struct ParseArchError(pub String);

impl FromStr for Arch {
    type Err = ParseArchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GRAYSKULL" => Ok(Arch::Grayskull),
            "WORMHOLE" | "WORMHOLE_B0" => Ok(Arch::Wormhole),
            "BLACKHOLE" => Ok(Arch::Blackhole),
            _ => Err(ParseArchError(s.to_string())),
        }
    }
}

impl Arch {
    pub fn from_pci_device_id(device_id: u16) -> Option<Arch> {
        num_traits::FromPrimitive::from_u16(device_id)
    }

    pub fn pci_device_id(&self) -> u16 {
        *self as u16
    }

    pub fn harvest_axis(&self) -> HarvestAxis {
        match self {
            Arch::Grayskull | Arch::Wormhole => HarvestAxis::Row,
            Arch::Blackhole => HarvestAxis::Column,
        }
    }

    /// The stock, unharvested NOC0 layout of the family.
    pub fn default_layout(&self) -> SocLayout {
        match self {
            Arch::Grayskull => grayskull::default_layout(),
            Arch::Wormhole => wormhole::default_layout(),
            Arch::Blackhole => blackhole::default_layout(),
        }
    }

    /// NOC rows named by each bit of the firmware harvesting report, if the firmware reports
    /// in NOC order at all.
    pub fn harvesting_noc_locations(&self) -> Option<&'static [u8]> {
        match self {
            Arch::Grayskull => Some(grayskull::HARVESTING_NOC_LOCATIONS),
            Arch::Wormhole => Some(wormhole::HARVESTING_NOC_LOCATIONS),
            Arch::Blackhole => None,
        }
    }

    pub fn supports_noc_translation(&self) -> bool {
        match self {
            Arch::Grayskull => false,
            Arch::Wormhole | Arch::Blackhole => true,
        }
    }

    /// Whether a harvested layout can still be addressed with NOC translation turned off.
    pub fn supports_harvesting_without_translation(&self) -> bool {
        match self {
            Arch::Grayskull | Arch::Blackhole => true,
            Arch::Wormhole => false,
        }
    }

    pub fn supports_dram_harvesting(&self) -> bool {
        match self {
            Arch::Grayskull | Arch::Wormhole => false,
            Arch::Blackhole => true,
        }
    }

    /// Worker column positions disabled by `mask`. Empty for row-harvesting families.
    pub fn get_x_coordinates_to_harvest(
        &self,
        mask: HarvestingMask,
        worker_columns: usize,
    ) -> Result<BTreeSet<usize>, HarvestingError> {
        match self.harvest_axis() {
            HarvestAxis::Column => harvested_axis_values(mask, HarvestAxis::Column, worker_columns),
            HarvestAxis::Row => Ok(BTreeSet::new()),
        }
    }

    /// Worker row positions disabled by `mask`. Empty for column-harvesting families.
    pub fn get_y_coordinates_to_harvest(
        &self,
        mask: HarvestingMask,
        worker_rows: usize,
    ) -> Result<BTreeSet<usize>, HarvestingError> {
        match self.harvest_axis() {
            HarvestAxis::Row => harvested_axis_values(mask, HarvestAxis::Row, worker_rows),
            HarvestAxis::Column => Ok(BTreeSet::new()),
        }
    }

    /// Translated address of a live core. Returns `None` when the result does not fit the
    /// coordinate width.
    pub(crate) fn translated_coord(&self, layout: &SocLayout, core: &CorePosition) -> Option<XyPair> {
        match self {
            Arch::Grayskull => Some(grayskull::translated_coord(core)),
            Arch::Wormhole => wormhole::translated_coord(layout, core),
            Arch::Blackhole => blackhole::translated_coord(layout, core),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pci_device_ids() {
        assert_eq!(Arch::from_pci_device_id(0xfaca), Some(Arch::Grayskull));
        assert_eq!(Arch::from_pci_device_id(0x401e), Some(Arch::Wormhole));
        assert_eq!(Arch::from_pci_device_id(0xb140), Some(Arch::Blackhole));
        assert_eq!(Arch::from_pci_device_id(0x1234), None);
        assert_eq!(Arch::Wormhole.pci_device_id(), 0x401e);
    }

    #[test]
    fn arch_names() {
        assert_eq!("GRAYSKULL".parse::<Arch>(), Ok(Arch::Grayskull));
        assert_eq!("wormhole_b0".parse::<Arch>(), Ok(Arch::Wormhole));
        assert_eq!(" BLACKHOLE ".parse::<Arch>(), Ok(Arch::Blackhole));
        assert!("quasar".parse::<Arch>().is_err());
    }

    #[test]
    fn harvest_axis_selects_decoder() {
        let mask = HarvestingMask(0b101);

        let rows = Arch::Wormhole.get_y_coordinates_to_harvest(mask, 10).unwrap();
        assert_eq!(rows.into_iter().collect::<Vec<_>>(), vec![0, 2]);
        assert!(Arch::Wormhole
            .get_x_coordinates_to_harvest(mask, 8)
            .unwrap()
            .is_empty());

        let cols = Arch::Blackhole.get_x_coordinates_to_harvest(mask, 14).unwrap();
        assert_eq!(cols.into_iter().collect::<Vec<_>>(), vec![0, 2]);
        assert!(Arch::Blackhole
            .get_y_coordinates_to_harvest(mask, 10)
            .unwrap()
            .is_empty());
    }
}
