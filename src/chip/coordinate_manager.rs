use std::collections::BTreeSet;

use super::{
    coords::{CoordSystem, CoreCoord, CoreType, XyPair},
    dram_banks::map_workers_to_dram_banks,
    harvesting::{HarvestingError, HarvestingMask},
    soc::SocLayout,
    translation::{ConfigurationError, CoreTable, Harvest, TranslationTables},
    Arch,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Harvesting(#[from] HarvestingError),

    #[error("{0} does not name a live core")]
    UnknownCoordinate(CoreCoord),
}

/// Construction options beyond the layout itself.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ManagerOptions {
    pub harvesting_mask: HarvestingMask,
    /// One bit per DRAM channel, in layout order.
    pub dram_harvesting_mask: HarvestingMask,
    /// `None` selects the family default: on wherever the hardware has translation tables.
    pub noc_translation: Option<bool>,
}

impl ManagerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn harvesting_mask(mut self, mask: impl Into<HarvestingMask>) -> Self {
        self.harvesting_mask = mask.into();
        self
    }

    pub fn dram_harvesting_mask(mut self, mask: impl Into<HarvestingMask>) -> Self {
        self.dram_harvesting_mask = mask.into();
        self
    }

    pub fn noc_translation(mut self, enabled: bool) -> Self {
        self.noc_translation = Some(enabled);
        self
    }
}

/// Converts core coordinates between the logical, physical, virtual and translated systems
/// of one chip.
///
/// All tables are built up front; a constructed manager is immutable and every conversion
/// is a table lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinateManager {
    arch: Arch,
    layout: SocLayout,
    harvesting_mask: HarvestingMask,
    dram_harvesting_mask: HarvestingMask,
    noc_translation: bool,

    tables: TranslationTables,
}

fn dram_channels_to_harvest(
    mask: HarvestingMask,
    channels: usize,
) -> Result<BTreeSet<usize>, ConfigurationError> {
    if channels < 32 && mask.bits() >> channels != 0 {
        return Err(ConfigurationError::DramHarvestingOutOfRange {
            mask: mask.bits(),
            channels,
        });
    }

    Ok((0..channels.min(32))
        .filter(|channel| mask.is_harvested(*channel))
        .collect())
}

impl CoordinateManager {
    pub fn create(
        arch: Arch,
        layout: SocLayout,
        harvesting_mask: impl Into<HarvestingMask>,
    ) -> Result<Self, CoordError> {
        Self::with_options(
            arch,
            layout,
            ManagerOptions::new().harvesting_mask(harvesting_mask),
        )
    }

    /// Manager over the family's stock layout.
    pub fn for_arch(arch: Arch, options: ManagerOptions) -> Result<Self, CoordError> {
        Self::with_options(arch, arch.default_layout(), options)
    }

    pub fn with_options(
        arch: Arch,
        layout: SocLayout,
        options: ManagerOptions,
    ) -> Result<Self, CoordError> {
        tracing::debug!("{arch}: validating {} layout", layout.grid_size);
        layout.validate().map_err(ConfigurationError::from)?;

        let noc_translation = options
            .noc_translation
            .unwrap_or(arch.supports_noc_translation());
        if noc_translation && !arch.supports_noc_translation() {
            return Err(ConfigurationError::TranslationUnsupported { arch }.into());
        }
        if !options.dram_harvesting_mask.is_empty() && !arch.supports_dram_harvesting() {
            return Err(ConfigurationError::DramHarvestingUnsupported { arch }.into());
        }

        tracing::debug!(
            "{arch}: decoding harvesting mask {} (dram {})",
            options.harvesting_mask,
            options.dram_harvesting_mask
        );
        let harvest = Harvest {
            columns: arch.get_x_coordinates_to_harvest(
                options.harvesting_mask,
                layout.worker_columns().len(),
            )?,
            rows: arch
                .get_y_coordinates_to_harvest(options.harvesting_mask, layout.worker_rows().len())?,
            dram_channels: dram_channels_to_harvest(
                options.dram_harvesting_mask,
                layout.dram.len(),
            )?,
        };

        let harvested_any = !(harvest.columns.is_empty()
            && harvest.rows.is_empty()
            && harvest.dram_channels.is_empty());
        if harvested_any && !noc_translation {
            if !arch.supports_harvesting_without_translation() {
                return Err(ConfigurationError::HarvestingRequiresTranslation { arch }.into());
            }

            if arch.supports_noc_translation() {
                tracing::warn!(
                    "{arch}: harvested layout with NOC translation disabled, cores will be addressed by physical location"
                );
            }
        }

        tracing::debug!("{arch}: building translation tables");
        let tables = TranslationTables::build(arch, &layout, &harvest, noc_translation)?;

        tracing::debug!(
            "{arch}: coordinate manager ready, {} harvested cores",
            tables.harvested().len()
        );

        Ok(CoordinateManager {
            arch,
            layout,
            harvesting_mask: options.harvesting_mask,
            dram_harvesting_mask: options.dram_harvesting_mask,
            noc_translation,
            tables,
        })
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    /// The unharvested layout this manager was built from.
    pub fn layout(&self) -> &SocLayout {
        &self.layout
    }

    pub fn harvesting_mask(&self) -> HarvestingMask {
        self.harvesting_mask
    }

    pub fn dram_harvesting_mask(&self) -> HarvestingMask {
        self.dram_harvesting_mask
    }

    pub fn noc_translation_enabled(&self) -> bool {
        self.noc_translation
    }

    fn resolve(&self, coord: CoreCoord) -> Result<(&CoreTable, usize), CoordError> {
        let unknown = || CoordError::UnknownCoordinate(coord);

        let table = self.tables.table(coord.core_type).ok_or_else(unknown)?;
        let index = match coord.coord_system {
            CoordSystem::Logical => table.index_of(coord.xy()),
            system => self
                .tables
                .lookup(system, coord.xy())
                .filter(|(core_type, _)| *core_type == coord.core_type)
                .map(|(_, index)| index),
        }
        .ok_or_else(unknown)?;

        Ok((table, index))
    }

    /// Expresses `coord` in `system`. The input may be in any system but must name a live
    /// core of its own type.
    pub fn translate(&self, coord: CoreCoord, system: CoordSystem) -> Result<CoreCoord, CoordError> {
        let (table, index) = self.resolve(coord)?;
        let xy = table
            .get(system, index)
            .ok_or(CoordError::UnknownCoordinate(coord))?;
        Ok(CoreCoord::from_xy(xy, coord.core_type, system))
    }

    pub fn to_logical_coords(&self, coord: CoreCoord) -> Result<CoreCoord, CoordError> {
        self.translate(coord, CoordSystem::Logical)
    }

    pub fn to_physical_coords(&self, coord: CoreCoord) -> Result<CoreCoord, CoordError> {
        self.translate(coord, CoordSystem::Physical)
    }

    pub fn to_virtual_coords(&self, coord: CoreCoord) -> Result<CoreCoord, CoordError> {
        self.translate(coord, CoordSystem::Virtual)
    }

    pub fn to_translated_coords(&self, coord: CoreCoord) -> Result<CoreCoord, CoordError> {
        self.translate(coord, CoordSystem::Translated)
    }

    /// Logical extent `(width, height)` of a core type. Harvested cores have none.
    pub fn grid_size(&self, core_type: CoreType) -> (usize, usize) {
        self.tables
            .table(core_type)
            .map(|table| (table.width, table.height))
            .unwrap_or((0, 0))
    }

    /// Every live core of `core_type` expressed in `system`, in logical order.
    ///
    /// Harvested cores are only listed for the physical system.
    pub fn cores(&self, core_type: CoreType, system: CoordSystem) -> Vec<CoreCoord> {
        if core_type == CoreType::Harvested {
            return if system == CoordSystem::Physical {
                self.harvested_cores()
            } else {
                Vec::new()
            };
        }

        let Some(table) = self.tables.table(core_type) else {
            return Vec::new();
        };

        (0..table.len())
            .filter_map(|index| table.get(system, index))
            .map(|xy| CoreCoord::from_xy(xy, core_type, system))
            .collect()
    }

    /// Physical locations of every harvested core, row-major.
    pub fn harvested_cores(&self) -> Vec<CoreCoord> {
        self.tables
            .harvested()
            .iter()
            .map(|core| CoreCoord::from_xy(*core, CoreType::Harvested, CoordSystem::Physical))
            .collect()
    }

    pub fn core_type_at(&self, physical: XyPair) -> Option<CoreType> {
        self.tables
            .lookup(CoordSystem::Physical, physical)
            .map(|(core_type, _)| core_type)
    }

    /// Translated address of the first ARC core.
    pub fn arc_core(&self) -> Option<CoreCoord> {
        self.to_translated_coords(CoreCoord::logical(0, 0, CoreType::Arc))
            .ok()
    }

    /// Physical x values of harvested worker columns.
    pub fn harvested_x_coordinates(&self) -> Vec<u8> {
        self.tables.harvested_x().iter().copied().collect()
    }

    /// Physical y values of harvested worker rows.
    pub fn harvested_y_coordinates(&self) -> Vec<u8> {
        self.tables.harvested_y().iter().copied().collect()
    }

    /// Physical DRAM cores with the physical workers nearest to each.
    pub fn perf_dram_bank_to_workers(&self) -> Vec<(CoreCoord, Vec<CoreCoord>)> {
        let workers: Vec<XyPair> = self
            .cores(CoreType::Worker, CoordSystem::Physical)
            .iter()
            .map(CoreCoord::xy)
            .collect();

        let (channels, ports) = self.grid_size(CoreType::Dram);
        let live_channels: Vec<Vec<XyPair>> = (0..channels)
            .map(|channel| {
                (0..ports)
                    .filter_map(|port| {
                        self.to_physical_coords(CoreCoord::logical(
                            channel as u8,
                            port as u8,
                            CoreType::Dram,
                        ))
                        .ok()
                        .map(|core| core.xy())
                    })
                    .collect()
            })
            .collect();

        let physical = |xy: XyPair, core_type| CoreCoord::from_xy(xy, core_type, CoordSystem::Physical);
        map_workers_to_dram_banks(self.arch, &workers, &live_channels)
            .into_iter()
            .map(|(bank, workers)| {
                (
                    physical(bank, CoreType::Dram),
                    workers
                        .into_iter()
                        .map(|worker| physical(worker, CoreType::Worker))
                        .collect(),
                )
            })
            .collect()
    }
}
