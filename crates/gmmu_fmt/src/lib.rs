#![no_std]

//! GPU MMU page-table entry format descriptions.
//!
//! Each hardware generation defines its page directory and page table entry
//! layouts as bit-field positions inside fixed-size entry words. This crate
//! describes those layouts ([`EntryFormat`]), bundles them per format version
//! ([`FormatFamily`]), and derives the special "sparse" entry encodings that
//! mark a region deliberately unmapped without faulting
//! ([`init::initialize_all`]).

pub use crate::aperture::{Aperture, ApertureField};
pub use crate::entry::{EntryFormat, EntryValue, PdeFormat, PteFormat};
pub use crate::family::{FmtVersion, FormatFamily, InitState, PdeSubLevel};
pub use crate::init::{initialize_all, InitSummary, MAX_VERSION_COUNT};

pub mod aperture;
pub mod entry;
pub mod family;
pub mod init;
pub mod version_one;
pub mod version_two;

/// Errors raised while describing formats or deriving entry encodings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FmtError {
    /// A format cannot represent an invalid/sparse entry (it has neither an
    /// aperture field nor a valid bit), or a field description does not fit
    /// its entry storage.
    InvalidFormatDescriptor,
    /// The requested aperture kind has no encoding in this field.
    UnsupportedAperture,
}

impl core::fmt::Display for FmtError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FmtError::InvalidFormatDescriptor => f.write_str("invalid format descriptor"),
            FmtError::UnsupportedAperture => f.write_str("aperture kind has no encoding"),
        }
    }
}

/// Build the format family table for all versions this crate ships layouts
/// for, ready to pass to [`init::initialize_all`].
///
/// Slot order follows the version numbering: index 0 holds version 1, index
/// 1 version 2. Version 3 ships no built-in layout and its slot stays empty.
pub fn supported_families() -> Result<[Option<FormatFamily>; MAX_VERSION_COUNT], FmtError> {
    Ok([
        Some(version_one::family()?),
        Some(version_two::family()?),
        None,
    ])
}
