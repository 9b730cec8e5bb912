use std::collections::{BTreeSet, HashMap};

use super::{
    coords::{CoordSystem, CoreType, XyPair},
    harvesting::HarvestAxis,
    soc::{LayoutError, SocLayout},
    Arch,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("Every worker {0} is harvested")]
    AllWorkersHarvested(HarvestAxis),

    #[error("Every DRAM channel is harvested")]
    AllDramHarvested,

    #[error("{arch} does not support DRAM harvesting")]
    DramHarvestingUnsupported { arch: Arch },

    #[error("DRAM harvesting mask {mask:#x} names channels beyond the {channels} present")]
    DramHarvestingOutOfRange { mask: u32, channels: usize },

    #[error("{arch} has no NOC translation hardware")]
    TranslationUnsupported { arch: Arch },

    #[error("{arch} cannot address a harvested layout with NOC translation disabled")]
    HarvestingRequiresTranslation { arch: Arch },

    #[error("{count} {core_type} cores do not fit in the logical coordinate range")]
    TooManyCores { core_type: CoreType, count: usize },

    #[error("Translated address of logical {core_type} {logical} overflows the coordinate width")]
    TranslatedOverflow { core_type: CoreType, logical: XyPair },

    #[error("Translated address {coord} is shared by a {first} and a {second} core")]
    TranslatedCollision {
        coord: XyPair,
        first: CoreType,
        second: CoreType,
    },
}

/// Harvested positions, as indices into the layout's worker columns, worker rows and DRAM
/// channels.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Harvest {
    pub columns: BTreeSet<usize>,
    pub rows: BTreeSet<usize>,
    pub dram_channels: BTreeSet<usize>,
}

/// One live core as seen by a translated-address formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CorePosition {
    pub core_type: CoreType,
    pub logical: XyPair,
    pub physical: XyPair,
    pub virtual_: XyPair,
}

/// Dense per-type arena, indexed by `y * width + x` of the logical coordinate.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct CoreTable {
    pub width: usize,
    pub height: usize,
    pub physical: Vec<XyPair>,
    pub virtual_: Vec<XyPair>,
    pub translated: Vec<XyPair>,
}

impl CoreTable {
    pub fn len(&self) -> usize {
        self.physical.len()
    }

    pub fn index_of(&self, logical: XyPair) -> Option<usize> {
        let (x, y) = (logical.x as usize, logical.y as usize);
        if x < self.width && y < self.height {
            Some(y * self.width + x)
        } else {
            None
        }
    }

    /// `None` for an empty table or an index whose logical position does not fit a `u8`.
    pub fn logical(&self, index: usize) -> Option<XyPair> {
        if self.width == 0 {
            return None;
        }
        Some(XyPair::new(
            u8::try_from(index % self.width).ok()?,
            u8::try_from(index / self.width).ok()?,
        ))
    }

    pub fn get(&self, system: CoordSystem, index: usize) -> Option<XyPair> {
        match system {
            CoordSystem::Logical => self.logical(index),
            CoordSystem::Physical => self.physical.get(index).copied(),
            CoordSystem::Virtual => self.virtual_.get(index).copied(),
            CoordSystem::Translated => self.translated.get(index).copied(),
        }
    }

    fn list(core_type: CoreType, cores: &[XyPair]) -> Result<Self, ConfigurationError> {
        check_logical_range(core_type, cores.len())?;

        Ok(CoreTable {
            width: usize::from(!cores.is_empty()),
            height: cores.len(),
            physical: cores.to_vec(),
            virtual_: cores.to_vec(),
            translated: Vec::with_capacity(cores.len()),
        })
    }
}

fn check_logical_range(core_type: CoreType, count: usize) -> Result<(), ConfigurationError> {
    if count > u8::MAX as usize + 1 {
        Err(ConfigurationError::TooManyCores { core_type, count })
    } else {
        Ok(())
    }
}

fn slot(core_type: CoreType) -> Option<usize> {
    CoreType::ADDRESSABLE.iter().position(|t| *t == core_type)
}

fn surviving<T: Clone>(values: &[T], harvested: &BTreeSet<usize>) -> Vec<T> {
    values
        .iter()
        .enumerate()
        .filter(|(index, _)| !harvested.contains(index))
        .map(|(_, value)| value.clone())
        .collect()
}

/// Every mapping of one chip configuration, built in a single pass and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TranslationTables {
    tables: Vec<CoreTable>,

    physical: HashMap<XyPair, (CoreType, usize)>,
    virtual_: HashMap<XyPair, (CoreType, usize)>,
    translated: HashMap<XyPair, (CoreType, usize)>,

    harvested: Vec<XyPair>,
    harvested_x: BTreeSet<u8>,
    harvested_y: BTreeSet<u8>,
}

impl TranslationTables {
    pub fn build(
        arch: Arch,
        layout: &SocLayout,
        harvest: &Harvest,
        noc_translation: bool,
    ) -> Result<Self, ConfigurationError> {
        let all_columns = layout.worker_columns();
        let all_rows = layout.worker_rows();

        let good_columns = surviving(&all_columns, &harvest.columns);
        if good_columns.is_empty() {
            return Err(ConfigurationError::AllWorkersHarvested(HarvestAxis::Column));
        }
        let good_rows = surviving(&all_rows, &harvest.rows);
        if good_rows.is_empty() {
            return Err(ConfigurationError::AllWorkersHarvested(HarvestAxis::Row));
        }

        let harvested_x: BTreeSet<u8> = harvest.columns.iter().map(|i| all_columns[*i]).collect();
        let harvested_y: BTreeSet<u8> = harvest.rows.iter().map(|i| all_rows[*i]).collect();

        let mut workers = CoreTable {
            width: good_columns.len(),
            height: good_rows.len(),
            ..Default::default()
        };
        for ly in 0..good_rows.len() {
            for lx in 0..good_columns.len() {
                workers.physical.push(XyPair::new(good_columns[lx], good_rows[ly]));
                workers.virtual_.push(XyPair::new(all_columns[lx], all_rows[ly]));
            }
        }

        let mut harvested: Vec<XyPair> = layout
            .workers
            .iter()
            .copied()
            .filter(|core| harvested_x.contains(&core.x) || harvested_y.contains(&core.y))
            .collect();

        let good_channels = surviving(&layout.dram, &harvest.dram_channels);
        if !layout.dram.is_empty() && good_channels.is_empty() {
            return Err(ConfigurationError::AllDramHarvested);
        }
        check_logical_range(CoreType::Dram, good_channels.len())?;

        let ports = layout.dram_ports();
        check_logical_range(CoreType::Dram, ports)?;
        let mut dram = CoreTable {
            width: good_channels.len(),
            height: if good_channels.is_empty() { 0 } else { ports },
            ..Default::default()
        };
        for port in 0..dram.height {
            for channel in 0..dram.width {
                dram.physical.push(good_channels[channel][port]);
                dram.virtual_.push(layout.dram[channel][port]);
            }
        }
        harvested.extend(
            harvest
                .dram_channels
                .iter()
                .flat_map(|channel| layout.dram[*channel].iter().copied()),
        );
        harvested.sort_by_key(|core| core.row_major());

        let mut tables = vec![
            workers,
            dram,
            CoreTable::list(CoreType::Ethernet, &layout.ethernet)?,
            CoreTable::list(CoreType::Pcie, &layout.pcie)?,
            CoreTable::list(CoreType::Arc, &layout.arc)?,
            CoreTable::list(CoreType::RouterOnly, &layout.router_only)?,
        ];

        for (core_type, table) in CoreType::ADDRESSABLE.iter().copied().zip(tables.iter_mut()) {
            for index in 0..table.len() {
                let logical = table.logical(index).ok_or(ConfigurationError::TooManyCores {
                    core_type,
                    count: table.len(),
                })?;
                let translated = if noc_translation {
                    let core = CorePosition {
                        core_type,
                        logical,
                        physical: table.physical[index],
                        virtual_: table.virtual_[index],
                    };
                    arch.translated_coord(layout, &core)
                        .ok_or(ConfigurationError::TranslatedOverflow {
                            core_type,
                            logical: core.logical,
                        })?
                } else {
                    table.physical[index]
                };
                table.translated.push(translated);
            }

            tracing::trace!(
                "{arch}: {core_type} table {}x{} ({} cores)",
                table.width,
                table.height,
                table.len()
            );
        }

        let mut physical = HashMap::new();
        let mut virtual_ = HashMap::new();
        let mut translated: HashMap<XyPair, (CoreType, usize)> = HashMap::new();
        for (core_type, table) in CoreType::ADDRESSABLE.iter().copied().zip(tables.iter()) {
            for index in 0..table.len() {
                physical.insert(table.physical[index], (core_type, index));
                virtual_.insert(table.virtual_[index], (core_type, index));

                let coord = table.translated[index];
                if let Some((first, _)) = translated.insert(coord, (core_type, index)) {
                    return Err(ConfigurationError::TranslatedCollision {
                        coord,
                        first,
                        second: core_type,
                    });
                }
            }
        }
        for (index, core) in harvested.iter().enumerate() {
            physical.insert(*core, (CoreType::Harvested, index));
        }

        Ok(TranslationTables {
            tables,
            physical,
            virtual_,
            translated,
            harvested,
            harvested_x,
            harvested_y,
        })
    }

    pub fn table(&self, core_type: CoreType) -> Option<&CoreTable> {
        slot(core_type).and_then(|slot| self.tables.get(slot))
    }

    /// Resolves a non-logical coordinate to its owning type and arena index.
    pub fn lookup(&self, system: CoordSystem, xy: XyPair) -> Option<(CoreType, usize)> {
        match system {
            CoordSystem::Logical => None,
            CoordSystem::Physical => self.physical.get(&xy).copied(),
            CoordSystem::Virtual => self.virtual_.get(&xy).copied(),
            CoordSystem::Translated => self.translated.get(&xy).copied(),
        }
    }

    pub fn harvested(&self) -> &[XyPair] {
        &self.harvested
    }

    pub fn harvested_x(&self) -> &BTreeSet<u8> {
        &self.harvested_x
    }

    pub fn harvested_y(&self) -> &BTreeSet<u8> {
        &self.harvested_y
    }
}
