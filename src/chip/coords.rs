use std::{fmt, str::FromStr};

/// A bare `(x, y)` position on the NOC grid. It carries no coordinate system; use
/// [`CoreCoord`] whenever the system matters.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct XyPair {
    pub x: u8,
    pub y: u8,
}

impl XyPair {
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// Row-major sort key, y first.
    pub fn row_major(&self) -> (u8, u8) {
        (self.y, self.x)
    }
}

impl From<(u8, u8)> for XyPair {
    fn from((x, y): (u8, u8)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for XyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a core location, expected the form x-y")]
pub struct ParseXyPairError(pub String);

impl FromStr for XyPair {
    type Err = ParseXyPairError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseXyPairError(s.to_string());

        let (x, y) = s.trim().split_once('-').ok_or_else(err)?;
        Ok(XyPair {
            x: x.trim().parse().map_err(|_| err())?,
            y: y.trim().parse().map_err(|_| err())?,
        })
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum CoreType {
    Worker,
    Dram,
    Ethernet,
    Pcie,
    Arc,
    RouterOnly,
    /// Only ever reported in the physical system.
    Harvested,
}

impl CoreType {
    /// Every type that owns logical, virtual and translated coordinates.
    pub const ADDRESSABLE: [CoreType; 6] = [
        CoreType::Worker,
        CoreType::Dram,
        CoreType::Ethernet,
        CoreType::Pcie,
        CoreType::Arc,
        CoreType::RouterOnly,
    ];
}

impl fmt::Display for CoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CoreType::Worker => "worker",
            CoreType::Dram => "dram",
            CoreType::Ethernet => "ethernet",
            CoreType::Pcie => "pcie",
            CoreType::Arc => "arc",
            CoreType::RouterOnly => "router-only",
            CoreType::Harvested => "harvested",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum CoordSystem {
    Logical,
    Physical,
    Virtual,
    Translated,
}

impl fmt::Display for CoordSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CoordSystem::Logical => "logical",
            CoordSystem::Physical => "physical",
            CoordSystem::Virtual => "virtual",
            CoordSystem::Translated => "translated",
        };
        f.write_str(name)
    }
}

/// A core position tagged with the core type it addresses and the system it is expressed in.
///
/// Two coordinates are only equal when both tags match, so a logical `(1, 1)` never compares
/// equal to a physical `(1, 1)`.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct CoreCoord {
    pub x: u8,
    pub y: u8,
    pub core_type: CoreType,
    pub coord_system: CoordSystem,
}

impl CoreCoord {
    pub const fn new(x: u8, y: u8, core_type: CoreType, coord_system: CoordSystem) -> Self {
        Self {
            x,
            y,
            core_type,
            coord_system,
        }
    }

    pub const fn logical(x: u8, y: u8, core_type: CoreType) -> Self {
        Self::new(x, y, core_type, CoordSystem::Logical)
    }

    pub const fn physical(x: u8, y: u8, core_type: CoreType) -> Self {
        Self::new(x, y, core_type, CoordSystem::Physical)
    }

    pub const fn virtual_(x: u8, y: u8, core_type: CoreType) -> Self {
        Self::new(x, y, core_type, CoordSystem::Virtual)
    }

    pub const fn translated(x: u8, y: u8, core_type: CoreType) -> Self {
        Self::new(x, y, core_type, CoordSystem::Translated)
    }

    pub fn from_xy(xy: XyPair, core_type: CoreType, coord_system: CoordSystem) -> Self {
        Self::new(xy.x, xy.y, core_type, coord_system)
    }

    pub fn xy(&self) -> XyPair {
        XyPair::new(self.x, self.y)
    }
}

impl fmt::Display for CoreCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}, {})",
            self.coord_system, self.core_type, self.x, self.y
        )
    }
}
