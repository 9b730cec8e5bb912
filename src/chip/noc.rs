use super::coords::{CoordSystem, CoreCoord};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum NocId {
    Noc0 = 0,
    Noc1 = 1,
}

#[derive(Debug, thiserror::Error)]
pub enum NocError {
    #[error("NOC access must use a translated coordinate, got {0}")]
    NotTranslated(CoreCoord),

    #[error("No core answers at {core} (noc{}, addr {addr:#x})", *.noc_id as u8)]
    NoCore {
        noc_id: NocId,
        core: CoreCoord,
        addr: u64,
    },

    #[error("NOC transport failed: {0}")]
    Transport(String),
}

/// Register-level access to a core over the NOC.
///
/// Cores are always addressed by their translated coordinate; resolve logical or physical
/// coordinates through the coordinate manager first.
pub trait NocInterface {
    fn noc_read32(&mut self, noc_id: NocId, core: CoreCoord, addr: u64) -> Result<u32, NocError>;
    fn noc_write32(
        &mut self,
        noc_id: NocId,
        core: CoreCoord,
        addr: u64,
        value: u32,
    ) -> Result<(), NocError>;
}

pub(crate) fn ensure_translated(core: CoreCoord) -> Result<CoreCoord, NocError> {
    if core.coord_system == CoordSystem::Translated {
        Ok(core)
    } else {
        Err(NocError::NotTranslated(core))
    }
}
