pub use chip::{
    coordinate_manager::{CoordError, CoordinateManager, ManagerOptions},
    coords::{CoordSystem, CoreCoord, CoreType, XyPair},
    harvesting::{HarvestAxis, HarvestingError, HarvestingMask},
    soc::{LayoutError, SocLayout},
    translation::ConfigurationError,
    Arch,
};
pub use descriptor::{load_soc_descriptor, parse_soc_descriptor, DescriptorError, SocDescriptor};

pub mod chip;
pub mod descriptor;
