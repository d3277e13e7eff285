//! Aperture kinds and their per-field hardware encodings.

use gmmu_field::BitField;
use num_enum::{FromPrimitive, IntoPrimitive};

use crate::FmtError;

/// Number of aperture kinds, including the decode-miss marker.
pub const APERTURE_COUNT: usize = 6;

/// The memory domain an entry's address refers to.
///
/// The raw bit encoding of each kind differs per format version and per
/// field (directory entries and leaf entries use different tables), so the
/// discriminants here are only table indices, never hardware values.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
pub enum Aperture {
    /// A raw field value with no entry in the encoding table. Never
    /// encodable, and never to be confused with `Invalid`: an unrecognized
    /// value must not be mistaken for a sparse marking.
    #[num_enum(default)]
    Unknown = 0,
    /// No backing memory; also the basis of the sparse entry encoding.
    Invalid = 1,
    /// On-device video memory.
    Video = 2,
    /// Coherent system memory.
    SystemCoherent = 3,
    /// Non-coherent system memory.
    SystemNonCoherent = 4,
    /// A peer device's memory. The peer index is carried by the address
    /// field, not the aperture field.
    Peer = 5,
}

/// A bit field holding an aperture selector, together with the encoding
/// table mapping each supported [`Aperture`] onto raw field values.
#[derive(Clone, Copy, Debug)]
pub struct ApertureField {
    field: BitField,
    encodings: [Option<u64>; APERTURE_COUNT],
}

impl ApertureField {
    /// Describe an aperture field from `(kind, raw value)` pairs.
    ///
    /// Every raw value must fit the field, kinds and raw values must be
    /// unique, `Unknown` is not encodable, and an `Invalid` entry is
    /// required so the field can always represent an unmapped entry.
    pub fn new(field: BitField, entries: &[(Aperture, u64)]) -> Result<Self, FmtError> {
        let mut encodings = [None; APERTURE_COUNT];
        for &(kind, raw) in entries {
            if kind == Aperture::Unknown || raw & !field.mask() != 0 {
                return Err(FmtError::InvalidFormatDescriptor);
            }
            if encodings.iter().any(|e| *e == Some(raw)) {
                return Err(FmtError::InvalidFormatDescriptor);
            }
            let slot = &mut encodings[u8::from(kind) as usize];
            if slot.is_some() {
                return Err(FmtError::InvalidFormatDescriptor);
            }
            *slot = Some(raw);
        }
        if encodings[u8::from(Aperture::Invalid) as usize].is_none() {
            return Err(FmtError::InvalidFormatDescriptor);
        }
        Ok(ApertureField { field, encodings })
    }

    pub fn field(&self) -> &BitField {
        &self.field
    }

    /// Write `kind`'s encoding into the aperture field of `buffer`.
    pub fn encode(&self, buffer: &mut [u8], kind: Aperture) -> Result<(), FmtError> {
        match self.encodings[u8::from(kind) as usize] {
            Some(raw) => {
                self.field.set(buffer, raw);
                Ok(())
            }
            None => Err(FmtError::UnsupportedAperture),
        }
    }

    /// Read the aperture field of `buffer` and reverse-map it through the
    /// encoding table. Raw values with no table entry classify as
    /// [`Aperture::Unknown`].
    pub fn decode(&self, buffer: &[u8]) -> Aperture {
        let raw = self.field.get(buffer);
        for (index, encoding) in self.encodings.iter().enumerate() {
            if *encoding == Some(raw) {
                return Aperture::from(index as u8);
            }
        }
        Aperture::Unknown
    }
}
