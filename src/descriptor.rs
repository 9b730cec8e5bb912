//! SoC descriptor files: the YAML description of a chip's NOC layout.
//!
//! ```yaml
//! arch_name: WORMHOLE_B0
//! grid:
//!   x_size: 10
//!   y_size: 12
//! arc: [0-10]
//! pcie: [0-3]
//! dram: [[0-0, 0-1, 0-11], [0-5, 0-6, 0-7]]
//! eth: [9-0, 1-0]
//! functional_workers: [1-1, 2-1]
//! harvested_workers: []
//! router_only: [0-2, 0-4]
//! worker_l1_size: 1499136
//! eth_l1_size: 262144
//! dram_bank_size: 2147483648
//! features:
//!   noc:
//!     translation_id_enabled: true
//! ```
//!
//! Harvested workers are folded back into the layout and expressed as a [`HarvestingMask`].

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::chip::{
    coordinate_manager::{CoordError, CoordinateManager, ManagerOptions},
    coords::{ParseXyPairError, XyPair},
    harvesting::{HarvestAxis, HarvestingError, HarvestingMask},
    soc::{LayoutError, SocLayout},
    Arch, ParseArchError,
};

#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("Failed to read SoC descriptor {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Core(#[from] ParseXyPairError),

    #[error(transparent)]
    Arch(#[from] ParseArchError),

    #[error("Harvested workers cover only part of {axis} {value}")]
    PartialHarvestedAxis { axis: HarvestAxis, value: u8 },

    #[error(transparent)]
    Harvesting(#[from] HarvestingError),

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

#[derive(Debug, Deserialize)]
struct GridSize {
    x_size: u8,
    y_size: u8,
}

#[derive(Debug, Default, Deserialize)]
struct NocFeatures {
    translation_id_enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct Features {
    #[serde(default)]
    noc: Option<NocFeatures>,
}

#[derive(Debug, Deserialize)]
struct RawSocDescriptor {
    arch_name: String,
    grid: GridSize,

    #[serde(default)]
    arc: Option<Vec<String>>,
    #[serde(default)]
    pcie: Option<Vec<String>>,
    #[serde(default)]
    dram: Option<Vec<Vec<String>>>,
    #[serde(default)]
    eth: Option<Vec<String>>,
    functional_workers: Vec<String>,
    #[serde(default)]
    harvested_workers: Option<Vec<String>>,
    #[serde(default)]
    router_only: Option<Vec<String>>,

    #[serde(default)]
    worker_l1_size: u64,
    #[serde(default)]
    eth_l1_size: u64,
    #[serde(default)]
    dram_bank_size: u64,

    #[serde(default)]
    features: Option<Features>,
}

fn parse_cores(cores: Option<Vec<String>>) -> Result<Vec<XyPair>, ParseXyPairError> {
    cores
        .unwrap_or_default()
        .iter()
        .map(|core| core.parse())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocDescriptor {
    pub arch: Arch,
    /// Full layout, harvested workers included.
    pub layout: SocLayout,
    pub harvesting_mask: HarvestingMask,
    /// `None` when the descriptor leaves NOC translation to the family default.
    pub noc_translation_id_enabled: Option<bool>,
}

impl SocDescriptor {
    /// Descriptor of the family's stock, unharvested chip.
    pub fn from_arch(arch: Arch) -> Self {
        SocDescriptor {
            arch,
            layout: arch.default_layout(),
            harvesting_mask: HarvestingMask::NONE,
            noc_translation_id_enabled: None,
        }
    }

    /// Manager options for this descriptor. A missing `translation_id_enabled` keeps the
    /// family default instead of disabling translation, so a Wormhole descriptor without a
    /// `features` block can still list harvested rows.
    pub fn manager_options(&self) -> ManagerOptions {
        let options = ManagerOptions::new().harvesting_mask(self.harvesting_mask);
        match self.noc_translation_id_enabled {
            Some(enabled) => options.noc_translation(enabled),
            None => options,
        }
    }

    pub fn coordinate_manager(&self) -> Result<CoordinateManager, CoordError> {
        CoordinateManager::with_options(self.arch, self.layout.clone(), self.manager_options())
    }
}

/// Converts harvested workers into mask bits along the harvest axis of `arch`. Every worker
/// on a harvested row or column must itself be listed as harvested.
fn harvesting_mask(
    arch: Arch,
    layout: &SocLayout,
    harvested: &[XyPair],
) -> Result<HarvestingMask, DescriptorError> {
    let axis = arch.harvest_axis();
    let along = |core: &XyPair| match axis {
        HarvestAxis::Row => core.y,
        HarvestAxis::Column => core.x,
    };

    let harvested_set: BTreeSet<XyPair> = harvested.iter().copied().collect();
    let values: BTreeSet<u8> = harvested.iter().map(along).collect();
    for value in values.iter().copied() {
        if layout
            .workers
            .iter()
            .any(|core| along(core) == value && !harvested_set.contains(core))
        {
            return Err(DescriptorError::PartialHarvestedAxis { axis, value });
        }
    }

    let positions = match axis {
        HarvestAxis::Row => layout.worker_rows(),
        HarvestAxis::Column => layout.worker_columns(),
    };
    Ok(HarvestingMask::from_indices(
        positions
            .iter()
            .enumerate()
            .filter(|(_, value)| values.contains(value))
            .map(|(index, _)| index),
        axis,
    )?)
}

pub fn parse_soc_descriptor(text: &str) -> Result<SocDescriptor, DescriptorError> {
    let raw: RawSocDescriptor = serde_yaml::from_str(text)?;
    let arch: Arch = raw.arch_name.parse()?;

    let harvested = parse_cores(raw.harvested_workers)?;
    let mut workers = parse_cores(Some(raw.functional_workers))?;
    workers.extend(harvested.iter().copied());
    workers.sort_by_key(|core| core.row_major());

    let dram = raw
        .dram
        .unwrap_or_default()
        .into_iter()
        .map(|channel| parse_cores(Some(channel)))
        .collect::<Result<Vec<_>, _>>()?;

    let layout = SocLayout::new(XyPair::new(raw.grid.x_size, raw.grid.y_size), workers)
        .dram(dram)
        .ethernet(parse_cores(raw.eth)?)
        .pcie(parse_cores(raw.pcie)?)
        .arc(parse_cores(raw.arc)?)
        .router_only(parse_cores(raw.router_only)?)
        .worker_l1_size(raw.worker_l1_size)
        .eth_l1_size(raw.eth_l1_size)
        .dram_bank_size(raw.dram_bank_size);
    layout.validate()?;

    let harvesting_mask = harvesting_mask(arch, &layout, &harvested)?;

    tracing::debug!(
        "{arch}: loaded {} descriptor with {} workers, harvesting {harvesting_mask}",
        layout.grid_size,
        layout.workers.len()
    );

    Ok(SocDescriptor {
        arch,
        layout,
        harvesting_mask,
        noc_translation_id_enabled: raw
            .features
            .and_then(|features| features.noc)
            .and_then(|noc| noc.translation_id_enabled),
    })
}

pub fn load_soc_descriptor(path: impl AsRef<Path>) -> Result<SocDescriptor, DescriptorError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| DescriptorError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_soc_descriptor(&text)
}
