//! Built-in field layout for format version 1.
//!
//! Version 1 uses a dual page directory entry: one 64-bit word carrying two
//! parallel sub-level formats, the big-page directory in the low half and
//! the small-page directory in the high half. Leaf entries signal validity
//! through a plain valid bit; the leaf aperture table has no invalid
//! encoding, so aperture selection for live mappings is left to the mapping
//! encoder and is not part of this descriptor.

use gmmu_field::BitField;

use crate::aperture::{Aperture, ApertureField};
use crate::entry::{EntryFormat, PdeFormat, PteFormat};
use crate::family::{FmtVersion, FormatFamily, PdeSubLevel};
use crate::FmtError;

/// entry width, in bits, for every version 1 format
const STORAGE_BITS: u32 = 64;

/// directory aperture encodings shared by both sub-levels
const PDE_APERTURES: [(Aperture, u64); 4] = [
    (Aperture::Invalid, 0),
    (Aperture::Video, 1),
    (Aperture::SystemCoherent, 2),
    (Aperture::SystemNonCoherent, 3),
];

/// big-page directory fields, low half of the dual entry, as (width, offset)
const PDE_BIG_APERTURE: (u32, u32) = (2, 0);
const PDE_BIG_ADDRESS: (u32, u32) = (28, 4);
const PDE_BIG_VOLATILE: u32 = 35;

/// small-page directory fields, high half of the dual entry
const PDE_SMALL_APERTURE: (u32, u32) = (2, 32);
const PDE_SMALL_ADDRESS: (u32, u32) = (28, 36);
const PDE_SMALL_VOLATILE: u32 = 34;

/// leaf entry fields
const PTE_VALID: u32 = 0;
const PTE_ADDRESS: (u32, u32) = (28, 4);
const PTE_VOLATILE: u32 = 32;

fn pde_format(
    aperture: (u32, u32),
    address: (u32, u32),
    volatile_offset: u32,
) -> Result<PdeFormat, FmtError> {
    let (aperture_width, aperture_offset) = aperture;
    let (address_width, address_offset) = address;
    EntryFormat::new(
        STORAGE_BITS,
        None,
        Some(BitField::flag(volatile_offset, STORAGE_BITS)),
        Some(ApertureField::new(
            BitField::new(aperture_offset, aperture_width, STORAGE_BITS),
            &PDE_APERTURES,
        )?),
        BitField::new(address_offset, address_width, STORAGE_BITS),
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

/// The version 1 format family: big-page directory as the single-PDE
/// format, dual big/small sub-levels, and a valid-bit leaf entry.
pub fn family() -> Result<FormatFamily, FmtError> {
    let big = PdeSubLevel {
        index: 0,
        format: pde_format(PDE_BIG_APERTURE, PDE_BIG_ADDRESS, PDE_BIG_VOLATILE)?,
    };
    let small = PdeSubLevel {
        index: 1,
        format: pde_format(PDE_SMALL_APERTURE, PDE_SMALL_ADDRESS, PDE_SMALL_VOLATILE)?,
    };
    FormatFamily::new(FmtVersion::One, big.format, &[big, small], pte_format()?)
}
