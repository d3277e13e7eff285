//! Built-in field layout for format version 2.
//!
//! Version 2 widens addresses to 46 bits and moves the dual directory
//! level to a 128-bit entry: the big-page sub-level occupies the low
//! 64-bit half and the small-page sub-level the high half, each with its
//! own aperture and volatile fields. Leaf entries keep a plain valid bit;
//! as with version 1, the leaf aperture table has no invalid encoding, so
//! it is not part of this descriptor.

use gmmu_field::BitField;

use crate::aperture::{Aperture, ApertureField};
use crate::entry::{EntryFormat, PdeFormat, PteFormat};
use crate::family::{FmtVersion, FormatFamily, PdeSubLevel};
use crate::FmtError;

/// width of the single-PDE and leaf entries, in bits
const STORAGE_BITS: u32 = 64;
/// width of the dual-PDE entry, in bits
const DUAL_STORAGE_BITS: u32 = 128;
/// bit offset of the small-page half within the dual entry
const SMALL_HALF: u32 = 64;

/// directory aperture encodings, shared by every version 2 directory field
const PDE_APERTURES: [(Aperture, u64); 4] = [
    (Aperture::Invalid, 0),
    (Aperture::Video, 1),
    (Aperture::SystemCoherent, 2),
    (Aperture::SystemNonCoherent, 3),
];

/// directory fields relative to the start of their half, as (width, offset)
const PDE_APERTURE: (u32, u32) = (2, 1);
const PDE_VOLATILE: u32 = 3;
const PDE_ADDRESS: (u32, u32) = (46, 8);

/// leaf entry fields
const PTE_VALID: u32 = 0;
const PTE_VOLATILE: u32 = 3;
const PTE_ADDRESS: (u32, u32) = (46, 8);

fn pde_format(storage_size_bits: u32, half_offset: u32) -> Result<PdeFormat, FmtError> {
    let (aperture_width, aperture_offset) = PDE_APERTURE;
    let (address_width, address_offset) = PDE_ADDRESS;
    EntryFormat::new(
        storage_size_bits,
        None,
        Some(BitField::flag(half_offset + PDE_VOLATILE, storage_size_bits)),
        Some(ApertureField::new(
            BitField::new(half_offset + aperture_offset, aperture_width, storage_size_bits),
            &PDE_APERTURES,
        )?),
        BitField::new(half_offset + address_offset, address_width, storage_size_bits),
    )
}

fn pte_format() -> Result<PteFormat, FmtError> {
    let (address_width, address_offset) = PTE_ADDRESS;
    EntryFormat::new(
        STORAGE_BITS,
        Some(BitField::flag(PTE_VALID, STORAGE_BITS)),
        Some(BitField::flag(PTE_VOLATILE, STORAGE_BITS)),
        None,
        BitField::new(address_offset, address_width, STORAGE_BITS),
    )
}

/// The version 2 format family: 64-bit single PDE, 128-bit dual sub-level
/// PDE, and a valid-bit leaf entry.
pub fn family() -> Result<FormatFamily, FmtError> {
    let big = PdeSubLevel {
        index: 0,
        format: pde_format(DUAL_STORAGE_BITS, 0)?,
    };
    let small = PdeSubLevel {
        index: 1,
        format: pde_format(DUAL_STORAGE_BITS, SMALL_HALF)?,
    };
    FormatFamily::new(
        FmtVersion::Two,
        pde_format(STORAGE_BITS, 0)?,
        &[big, small],
        pte_format()?,
    )
}
