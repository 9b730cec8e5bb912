use std::{collections::BTreeSet, fmt};

use super::Arch;

/// Which physical axis a harvesting mask disables.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum HarvestAxis {
    /// Whole rows (shared physical y) are disabled.
    Row,
    /// Whole columns (shared physical x) are disabled.
    Column,
}

impl fmt::Display for HarvestAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarvestAxis::Row => f.write_str("row"),
            HarvestAxis::Column => f.write_str("column"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HarvestingError {
    #[error("harvesting mask {mask:#x} sets bits beyond the {axis_len} harvestable {axis}s")]
    InvalidConfiguration {
        mask: u32,
        axis: HarvestAxis,
        axis_len: usize,
    },

    #[error("{arch} firmware reported NOC {axis} {location} as harvested but it holds no worker cores")]
    NoWorkersAtLocation {
        arch: Arch,
        axis: HarvestAxis,
        location: u8,
    },

    #[error("{arch} firmware harvesting mask {mask:#x} sets bits beyond its {count} harvesting locations")]
    UnknownFirmwareBits { arch: Arch, mask: u32, count: usize },
}

/// Bit `i` disables the `i`-th worker row or column, counted in ascending physical order
/// along the architecture's [`HarvestAxis`].
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq)]
pub struct HarvestingMask(pub u32);

impl HarvestingMask {
    pub const NONE: HarvestingMask = HarvestingMask(0);

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn is_harvested(&self, index: usize) -> bool {
        index < 32 && self.0 & (1 << index) != 0
    }

    /// Builds the mask from a set of positions along `axis`.
    pub fn from_indices(
        indices: impl IntoIterator<Item = usize>,
        axis: HarvestAxis,
    ) -> Result<Self, HarvestingError> {
        let mut mask = 0u32;
        for index in indices {
            if index >= 32 {
                return Err(HarvestingError::InvalidConfiguration {
                    mask,
                    axis,
                    axis_len: 32,
                });
            }
            mask |= 1 << index;
        }
        Ok(HarvestingMask(mask))
    }

    /// Inverts an "enabled" bitmap over `width` positions, as Blackhole telemetry reports
    /// working tensix columns rather than harvested ones.
    pub fn from_enabled(enabled: u32, width: usize) -> Self {
        let all = if width >= 32 {
            u32::MAX
        } else {
            (1u32 << width) - 1
        };
        HarvestingMask(!enabled & all)
    }

    /// Converts the mask reported by ARC firmware into axis positions over `worker_axis`
    /// (the sorted, distinct worker rows or columns of the layout in use).
    ///
    /// Grayskull and Wormhole firmware set bit `i` for NOC row `HARVESTING_NOC_LOCATIONS[i]`;
    /// Blackhole reports the enabled tensix columns.
    pub fn from_firmware(arch: Arch, raw: u32, worker_axis: &[u8]) -> Result<Self, HarvestingError> {
        let Some(locations) = arch.harvesting_noc_locations() else {
            return Ok(HarvestingMask::from_enabled(raw, worker_axis.len()));
        };

        if locations.len() < 32 && raw >> locations.len() != 0 {
            return Err(HarvestingError::UnknownFirmwareBits {
                arch,
                mask: raw,
                count: locations.len(),
            });
        }

        let mut mask = 0u32;
        for (bit, location) in locations.iter().copied().enumerate() {
            if raw & (1 << bit) == 0 {
                continue;
            }

            let index = worker_axis
                .iter()
                .position(|v| *v == location)
                .ok_or(HarvestingError::NoWorkersAtLocation {
                    arch,
                    axis: arch.harvest_axis(),
                    location,
                })?;
            mask |= 1 << index;
        }

        if mask != 0 {
            tracing::debug!("{arch}: firmware harvesting {raw:#x} -> worker {} mask {mask:#x}", arch.harvest_axis());
        }

        Ok(HarvestingMask(mask))
    }
}

impl From<u32> for HarvestingMask {
    fn from(value: u32) -> Self {
        HarvestingMask(value)
    }
}

impl fmt::Display for HarvestingMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Decodes `mask` into the set of harvested positions along an axis holding `axis_len`
/// worker rows or columns. Bits at or above `axis_len` are an error.
pub fn harvested_axis_values(
    mask: HarvestingMask,
    axis: HarvestAxis,
    axis_len: usize,
) -> Result<BTreeSet<usize>, HarvestingError> {
    let valid = if axis_len >= 32 {
        u32::MAX
    } else {
        (1u32 << axis_len) - 1
    };

    if mask.0 & !valid != 0 {
        return Err(HarvestingError::InvalidConfiguration {
            mask: mask.0,
            axis,
            axis_len,
        });
    }

    Ok((0..axis_len.min(32))
        .filter(|index| mask.is_harvested(*index))
        .collect())
}
