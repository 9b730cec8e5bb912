use super::{
    coords::CoreCoord,
    noc::{NocError, NocId, NocInterface},
};

#[inline]
fn field_mask(lower: u32, upper: u32) -> u32 {
    let width = upper - lower + 1;
    if width >= 32 {
        u32::MAX
    } else {
        ((1u32 << width) - 1) << lower
    }
}

/// Place `value` into bits `lower..=upper` of `existing`, keeping every other bit.
fn write_modify(existing: u32, value: u32, lower: u32, upper: u32) -> u32 {
    assert!(upper >= lower && upper < 32);

    let mask = field_mask(lower, upper);
    (existing & !mask) | ((value << lower) & mask)
}

fn read_modify(existing: u32, lower: u32, upper: u32) -> u32 {
    assert!(upper >= lower && upper < 32);

    (existing & field_mask(lower, upper)) >> lower
}

/// A 32-bit register, or the inclusive bit range `bits` inside one.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Field {
    pub addr: u64,
    pub bits: Option<(u32, u32)>,
}

impl Field {
    pub const fn register(addr: u64) -> Self {
        Self { addr, bits: None }
    }

    pub const fn bits(addr: u64, lower: u32, upper: u32) -> Self {
        Self {
            addr,
            bits: Some((lower, upper)),
        }
    }

    pub fn read<N: NocInterface + ?Sized>(
        &self,
        noc: &mut N,
        noc_id: NocId,
        core: CoreCoord,
    ) -> Result<u32, NocError> {
        let value = noc.noc_read32(noc_id, core, self.addr)?;

        Ok(match self.bits {
            Some((lower, upper)) => read_modify(value, lower, upper),
            None => value,
        })
    }

    /// Writes the field; a partial field is read-modify-written.
    pub fn write<N: NocInterface + ?Sized>(
        &self,
        noc: &mut N,
        noc_id: NocId,
        core: CoreCoord,
        value: u32,
    ) -> Result<(), NocError> {
        let value = if let Some((lower, upper)) = self.bits {
            let existing = noc.noc_read32(noc_id, core, self.addr)?;
            write_modify(existing, value, lower, upper)
        } else {
            value
        };

        noc.noc_write32(noc_id, core, self.addr, value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn write_keeps_surrounding_bits() {
        assert_eq!(write_modify(0xffff_ffff, 0, 16, 19), 0xfff0_ffff);
        assert_eq!(write_modify(0, 0x1f, 16, 19), 0x000f_0000);
        assert_eq!(write_modify(0x1234_5678, 0xdead_beef, 0, 31), 0xdead_beef);
    }

    #[test]
    fn read_extracts_range() {
        assert_eq!(read_modify(0x000a_0000, 16, 19), 0xa);
        assert_eq!(read_modify(0x8000_0000, 31, 31), 1);
        assert_eq!(read_modify(0x1234_5678, 0, 31), 0x1234_5678);
    }
}
