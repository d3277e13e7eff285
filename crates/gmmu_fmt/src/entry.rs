//! Entry layouts and the sparse-pattern derivation.

use core::fmt;

use gmmu_field::BitField;

use crate::aperture::{Aperture, ApertureField};
use crate::FmtError;

/// Largest supported entry, in bytes (dual page directory entries are 128
/// bits wide).
pub const MAX_ENTRY_SIZE: usize = 16;

/// One page directory or page table entry's worth of raw bytes, ready to be
/// written verbatim into page table memory.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EntryValue {
    bytes: [u8; MAX_ENTRY_SIZE],
    len: usize,
}

impl EntryValue {
    /// An all-zero entry sized for a `storage_size_bits`-bit format.
    pub const fn zeroed(storage_size_bits: u32) -> Self {
        EntryValue {
            bytes: [0; MAX_ENTRY_SIZE],
            len: (storage_size_bits / 8) as usize,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[..self.len]
    }
}

impl fmt::Debug for EntryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // most significant byte first, like a register dump
        f.write_str("0x")?;
        for byte in self.as_bytes().iter().rev() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Layout of one entry: which bits hold validity, volatility, the aperture
/// selector, and the physical address.
///
/// A directory entry signals "unmapped" through an `Invalid` aperture
/// encoding; a leaf entry without a distinct aperture field uses a plain
/// valid bit instead. Formats carrying neither cannot represent an unmapped
/// entry and are rejected when a sparse pattern is derived.
#[derive(Clone, Copy, Debug)]
pub struct EntryFormat {
    storage_size_bits: u32,
    valid: Option<BitField>,
    volatile_bit: Option<BitField>,
    aperture: Option<ApertureField>,
    address: BitField,
}

/// A page directory entry layout.
pub type PdeFormat = EntryFormat;
/// A page table (leaf) entry layout.
pub type PteFormat = EntryFormat;

impl EntryFormat {
    pub fn new(
        storage_size_bits: u32,
        valid: Option<BitField>,
        volatile_bit: Option<BitField>,
        aperture: Option<ApertureField>,
        address: BitField,
    ) -> Result<Self, FmtError> {
        if storage_size_bits == 0
            || storage_size_bits % 8 != 0
            || (storage_size_bits / 8) as usize > MAX_ENTRY_SIZE
        {
            return Err(FmtError::InvalidFormatDescriptor);
        }
        let flag_fits = |field: &BitField| {
            field.bit_width() == 1 && field.storage_size_bits() == storage_size_bits
        };
        if let Some(field) = &valid {
            if !flag_fits(field) {
                return Err(FmtError::InvalidFormatDescriptor);
            }
        }
        if let Some(field) = &volatile_bit {
            if !flag_fits(field) {
                return Err(FmtError::InvalidFormatDescriptor);
            }
        }
        if let Some(field) = &aperture {
            if field.field().storage_size_bits() != storage_size_bits {
                return Err(FmtError::InvalidFormatDescriptor);
            }
        }
        if address.storage_size_bits() != storage_size_bits {
            return Err(FmtError::InvalidFormatDescriptor);
        }
        Ok(EntryFormat {
            storage_size_bits,
            valid,
            volatile_bit,
            aperture,
            address,
        })
    }

    pub fn storage_size_bits(&self) -> u32 {
        self.storage_size_bits
    }

    pub fn valid(&self) -> Option<&BitField> {
        self.valid.as_ref()
    }

    pub fn volatile_bit(&self) -> Option<&BitField> {
        self.volatile_bit.as_ref()
    }

    pub fn aperture(&self) -> Option<&ApertureField> {
        self.aperture.as_ref()
    }

    pub fn address(&self) -> &BitField {
        &self.address
    }

    /// Derive the entry value representing a sparse mapping: structurally
    /// invalid (aperture `Invalid`, or valid bit clear) plus the volatile
    /// bit where the format has one.
    ///
    /// An all-zero entry is not enough; zero decodes as a live low-numbered
    /// aperture on some formats, and without the volatile bit the hardware
    /// would fault instead of reading zero.
    pub fn sparse_pattern(&self) -> Result<EntryValue, FmtError> {
        self.sparse(true)
    }

    /// Sparse pattern without the volatile marking. Multi-PDE sub-levels
    /// other than the first leave their volatile bit at its default; the
    /// per-page volatility is resolved through sub-level 0.
    pub(crate) fn sparse_pattern_quiet(&self) -> Result<EntryValue, FmtError> {
        self.sparse(false)
    }

    fn sparse(&self, mark_volatile: bool) -> Result<EntryValue, FmtError> {
        let mut value = EntryValue::zeroed(self.storage_size_bits);
        if let Some(aperture) = &self.aperture {
            aperture.encode(value.as_bytes_mut(), Aperture::Invalid)?;
        } else if let Some(valid) = &self.valid {
            valid.set_bool(value.as_bytes_mut(), false);
        } else {
            return Err(FmtError::InvalidFormatDescriptor);
        }
        if mark_volatile {
            if let Some(volatile_bit) = &self.volatile_bit {
                volatile_bit.set_bool(value.as_bytes_mut(), true);
            }
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{EntryFormat, EntryValue};
    use crate::aperture::{Aperture, ApertureField};
    use crate::FmtError;
    use gmmu_field::BitField;

    fn aperture_at(offset: u32, storage: u32) -> ApertureField {
        ApertureField::new(
            BitField::new(offset, 2, storage),
            &[
                (Aperture::Invalid, 0),
                (Aperture::Video, 1),
                (Aperture::SystemCoherent, 2),
                (Aperture::SystemNonCoherent, 3),
            ],
        )
        .unwrap()
    }

    // 2-bit aperture at bit 28, volatile flag at bit 30, 32-bit storage
    #[test]
    fn sparse_directory_entry_is_invalid_and_volatile() {
        let format = EntryFormat::new(
            32,
            None,
            Some(BitField::flag(30, 32)),
            Some(aperture_at(28, 32)),
            BitField::new(4, 20, 32),
        )
        .unwrap();
        let sparse = format.sparse_pattern().unwrap();
        assert_eq!(sparse.as_bytes(), &[0x00, 0x00, 0x00, 0x40]);
        assert_eq!(format.aperture().unwrap().decode(sparse.as_bytes()), Aperture::Invalid);
        assert!(format.volatile_bit().unwrap().get_bool(sparse.as_bytes()));
    }

    // valid bit 0, 8-bit storage, no aperture
    #[test]
    fn sparse_leaf_entry_clears_valid() {
        let format = EntryFormat::new(
            8,
            Some(BitField::flag(0, 8)),
            None,
            None,
            BitField::new(1, 4, 8),
        )
        .unwrap();
        let sparse = format.sparse_pattern().unwrap();
        assert_eq!(sparse.as_bytes(), &[0x00]);
        assert!(!format.valid().unwrap().get_bool(sparse.as_bytes()));
    }

    #[test]
    fn sparse_leaf_entry_sets_volatile_when_present() {
        let format = EntryFormat::new(
            64,
            Some(BitField::flag(0, 64)),
            Some(BitField::flag(3, 64)),
            None,
            BitField::new(8, 46, 64),
        )
        .unwrap();
        let sparse = format.sparse_pattern().unwrap();
        assert!(!format.valid().unwrap().get_bool(sparse.as_bytes()));
        assert!(format.volatile_bit().unwrap().get_bool(sparse.as_bytes()));
    }

    #[test]
    fn quiet_pattern_leaves_volatile_clear() {
        let format = EntryFormat::new(
            32,
            None,
            Some(BitField::flag(30, 32)),
            Some(aperture_at(28, 32)),
            BitField::new(4, 20, 32),
        )
        .unwrap();
        let sparse = format.sparse_pattern_quiet().unwrap();
        assert_eq!(format.aperture().unwrap().decode(sparse.as_bytes()), Aperture::Invalid);
        assert!(!format.volatile_bit().unwrap().get_bool(sparse.as_bytes()));
    }

    #[test]
    fn format_without_aperture_or_valid_cannot_be_sparse() {
        let format = EntryFormat::new(
            32,
            None,
            Some(BitField::flag(30, 32)),
            None,
            BitField::new(4, 20, 32),
        )
        .unwrap();
        assert_eq!(
            format.sparse_pattern().unwrap_err(),
            FmtError::InvalidFormatDescriptor
        );
    }

    #[test]
    fn aperture_wins_over_valid_bit_when_both_present() {
        // an all-zero entry would decode as a valid video aperture here
        let aperture = ApertureField::new(
            BitField::new(1, 2, 32),
            &[(Aperture::Video, 0), (Aperture::Invalid, 3)],
        )
        .unwrap();
        let format = EntryFormat::new(
            32,
            Some(BitField::flag(0, 32)),
            None,
            Some(aperture),
            BitField::new(8, 20, 32),
        )
        .unwrap();
        let sparse = format.sparse_pattern().unwrap();
        assert_eq!(format.aperture().unwrap().decode(sparse.as_bytes()), Aperture::Invalid);
    }

    #[test]
    fn rejects_field_from_wrong_storage_size() {
        let result = EntryFormat::new(
            32,
            Some(BitField::flag(0, 64)),
            None,
            None,
            BitField::new(4, 20, 32),
        );
        assert_eq!(result.unwrap_err(), FmtError::InvalidFormatDescriptor);
    }

    #[test]
    fn rejects_wide_valid_field() {
        let result = EntryFormat::new(
            32,
            Some(BitField::new(0, 2, 32)),
            None,
            None,
            BitField::new(4, 20, 32),
        );
        assert_eq!(result.unwrap_err(), FmtError::InvalidFormatDescriptor);
    }

    #[test]
    fn rejects_oversized_storage() {
        let result = EntryFormat::new(
            256,
            None,
            None,
            None,
            BitField::new(4, 20, 32),
        );
        assert_eq!(result.unwrap_err(), FmtError::InvalidFormatDescriptor);
    }

    #[test]
    fn entry_value_debug_prints_big_endian_hex() {
        let mut value = EntryValue::zeroed(32);
        value.as_bytes_mut()[0] = 0xEF;
        value.as_bytes_mut()[3] = 0xBE;
        // no alloc in this crate; render through a fixed fmt buffer
        struct Buf {
            data: [u8; 16],
            used: usize,
        }
        impl core::fmt::Write for Buf {
            fn write_str(&mut self, s: &str) -> core::fmt::Result {
                let bytes = s.as_bytes();
                self.data[self.used..self.used + bytes.len()].copy_from_slice(bytes);
                self.used += bytes.len();
                Ok(())
            }
        }
        let mut buf = Buf {
            data: [0; 16],
            used: 0,
        };
        use core::fmt::Write;
        write!(buf, "{:?}", value).unwrap();
        assert_eq!(&buf.data[..buf.used], b"0xbe0000ef");
    }
}
