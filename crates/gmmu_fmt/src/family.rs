//! Per-version bundles of entry formats and their derived sparse patterns.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::entry::{EntryValue, PdeFormat, PteFormat};
use crate::FmtError;

/// Maximum parallel sub-levels in a multi-PDE hierarchy (one per page size
/// class: big and small).
pub const MAX_SUB_LEVEL_COUNT: usize = 2;

/// Page-table format generations.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
pub enum FmtVersion {
    One = 1,
    Two = 2,
    Three = 3,
}

/// One parallel page-directory format within a multi-PDE level.
///
/// Sub-level 0 is the big-page directory; per-page volatility for the whole
/// dual entry is resolved through it.
#[derive(Clone, Copy, Debug)]
pub struct PdeSubLevel {
    pub index: u32,
    pub format: PdeFormat,
}

/// Where a family is in its one-shot initialization.
///
/// Families only move forward: `Uninitialized` to `Initialized` or
/// `Failed`. A failed family keeps its derived outputs unset and is retried
/// only by constructing a new family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitState {
    Uninitialized,
    Initialized,
    Failed(FmtError),
}

/// All entry formats for one hardware format version, plus the sparse entry
/// encodings derived from them.
///
/// The derived patterns start unset and are populated exactly once by
/// [`crate::init::initialize_all`]; afterwards the family is read-only and
/// can be shared across threads freely.
#[derive(Debug)]
pub struct FormatFamily {
    version: FmtVersion,
    pde: PdeFormat,
    sub_levels: [Option<PdeSubLevel>; MAX_SUB_LEVEL_COUNT],
    pte: PteFormat,
    state: InitState,
    sparse_pde: Option<EntryValue>,
    sparse_pde_multi: [Option<EntryValue>; MAX_SUB_LEVEL_COUNT],
    sparse_pte: Option<EntryValue>,
}

impl FormatFamily {
    /// Bundle the formats for one version. Sub-level indices must be unique
    /// and below [`MAX_SUB_LEVEL_COUNT`].
    pub fn new(
        version: FmtVersion,
        pde: PdeFormat,
        sub_levels: &[PdeSubLevel],
        pte: PteFormat,
    ) -> Result<Self, FmtError> {
        let mut slots = [None; MAX_SUB_LEVEL_COUNT];
        for sub_level in sub_levels {
            let index = sub_level.index as usize;
            if index >= MAX_SUB_LEVEL_COUNT || slots[index].is_some() {
                return Err(FmtError::InvalidFormatDescriptor);
            }
            slots[index] = Some(*sub_level);
        }
        Ok(FormatFamily {
            version,
            pde,
            sub_levels: slots,
            pte,
            state: InitState::Uninitialized,
            sparse_pde: None,
            sparse_pde_multi: [None; MAX_SUB_LEVEL_COUNT],
            sparse_pte: None,
        })
    }

    pub fn version(&self) -> FmtVersion {
        self.version
    }

    pub fn pde(&self) -> &PdeFormat {
        &self.pde
    }

    pub fn pte(&self) -> &PteFormat {
        &self.pte
    }

    pub fn sub_level(&self, index: usize) -> Option<&PdeSubLevel> {
        self.sub_levels.get(index).and_then(|s| s.as_ref())
    }

    pub fn state(&self) -> InitState {
        self.state
    }

    /// Sparse encoding for the single-PDE level. `None` until
    /// initialization has run.
    pub fn sparse_pde(&self) -> Option<&EntryValue> {
        self.sparse_pde.as_ref()
    }

    /// Sparse encoding for one multi-PDE sub-level. `None` until
    /// initialization has run or if the sub-level does not exist.
    pub fn sparse_pde_multi(&self, index: usize) -> Option<&EntryValue> {
        self.sparse_pde_multi.get(index).and_then(|v| v.as_ref())
    }

    /// Sparse encoding for the leaf PTE. `None` until initialization has
    /// run.
    pub fn sparse_pte(&self) -> Option<&EntryValue> {
        self.sparse_pte.as_ref()
    }

    pub(crate) fn sub_levels(&self) -> &[Option<PdeSubLevel>; MAX_SUB_LEVEL_COUNT] {
        &self.sub_levels
    }

    pub(crate) fn install_sparse(
        &mut self,
        sparse_pde: EntryValue,
        sparse_pde_multi: [Option<EntryValue>; MAX_SUB_LEVEL_COUNT],
        sparse_pte: EntryValue,
    ) {
        debug_assert_eq!(self.state, InitState::Uninitialized);
        self.sparse_pde = Some(sparse_pde);
        self.sparse_pde_multi = sparse_pde_multi;
        self.sparse_pte = Some(sparse_pte);
        self.state = InitState::Initialized;
    }

    pub(crate) fn mark_failed(&mut self, error: FmtError) {
        debug_assert_eq!(self.state, InitState::Uninitialized);
        self.state = InitState::Failed(error);
    }
}

#[cfg(test)]
mod tests {
    use super::{FmtVersion, FormatFamily, InitState, PdeSubLevel};
    use crate::FmtError;
    use gmmu_field::BitField;

    fn plain_format() -> crate::entry::EntryFormat {
        crate::entry::EntryFormat::new(
            32,
            Some(BitField::flag(0, 32)),
            None,
            None,
            BitField::new(4, 20, 32),
        )
        .unwrap()
    }

    #[test]
    fn starts_uninitialized_with_no_patterns() {
        let family =
            FormatFamily::new(FmtVersion::One, plain_format(), &[], plain_format()).unwrap();
        assert_eq!(family.state(), InitState::Uninitialized);
        assert!(family.sparse_pde().is_none());
        assert!(family.sparse_pde_multi(0).is_none());
        assert!(family.sparse_pte().is_none());
    }

    #[test]
    fn rejects_duplicate_sub_level_index() {
        let sub = PdeSubLevel {
            index: 0,
            format: plain_format(),
        };
        let result = FormatFamily::new(FmtVersion::One, plain_format(), &[sub, sub], plain_format());
        assert_eq!(result.unwrap_err(), FmtError::InvalidFormatDescriptor);
    }

    #[test]
    fn rejects_out_of_range_sub_level_index() {
        let sub = PdeSubLevel {
            index: 2,
            format: plain_format(),
        };
        let result = FormatFamily::new(FmtVersion::One, plain_format(), &[sub], plain_format());
        assert_eq!(result.unwrap_err(), FmtError::InvalidFormatDescriptor);
    }

    #[test]
    fn version_round_trips_through_primitive() {
        assert_eq!(u32::from(FmtVersion::Two), 2);
        assert_eq!(FmtVersion::try_from(3u32).unwrap(), FmtVersion::Three);
        assert!(FmtVersion::try_from(7u32).is_err());
    }
}
