//! One-shot derivation of sparse entry encodings for every format family.

use log::{debug, warn};

use crate::entry::EntryValue;
use crate::family::{FormatFamily, InitState, MAX_SUB_LEVEL_COUNT};
use crate::FmtError;

/// Number of format-version slots in a family table.
pub const MAX_VERSION_COUNT: usize = 3;

/// Per-slot outcome of one [`initialize_all`] pass.
#[derive(Clone, Copy, Debug)]
pub struct InitSummary {
    initialized: usize,
    failures: [Option<FmtError>; MAX_VERSION_COUNT],
}

impl InitSummary {
    /// True when no present family failed.
    pub fn is_ok(&self) -> bool {
        self.failures.iter().all(|f| f.is_none())
    }

    /// Number of families initialized (or already initialized).
    pub fn initialized(&self) -> usize {
        self.initialized
    }

    /// The failure recorded for one version slot, if any.
    pub fn failure(&self, index: usize) -> Option<FmtError> {
        self.failures.get(index).copied().flatten()
    }
}

/// Derive and cache the sparse entry encodings for every present family.
///
/// Empty slots are skipped. A family whose formats cannot represent a
/// sparse entry is marked [`InitState::Failed`] and reported in the
/// summary, and processing continues with the remaining slots; one
/// malformed format table must not take down the other generations.
///
/// The derived patterns are a pure function of the formats, so a second
/// pass over the same table leaves every family byte-identical:
/// already-initialized families are skipped and failed ones are only
/// re-reported, never retried.
pub fn initialize_all(families: &mut [Option<FormatFamily>; MAX_VERSION_COUNT]) -> InitSummary {
    let mut summary = InitSummary {
        initialized: 0,
        failures: [None; MAX_VERSION_COUNT],
    };
    for (slot_index, slot) in families.iter_mut().enumerate() {
        let family = match slot {
            Some(family) => family,
            None => continue,
        };
        match family.state() {
            InitState::Initialized => {
                summary.initialized += 1;
                continue;
            }
            InitState::Failed(error) => {
                summary.failures[slot_index] = Some(error);
                continue;
            }
            InitState::Uninitialized => {}
        }
        match derive_sparse_patterns(family) {
            Ok(()) => {
                debug!(
                    "gmmu format v{}: sparse encodings derived",
                    u32::from(family.version())
                );
                summary.initialized += 1;
            }
            Err(error) => {
                warn!(
                    "gmmu format v{}: sparse encoding unavailable: {}",
                    u32::from(family.version()),
                    error
                );
                family.mark_failed(error);
                summary.failures[slot_index] = Some(error);
            }
        }
    }
    summary
}

/// Compute every sparse pattern for one family, then install them in one
/// step so a failure leaves the family with no derived outputs at all.
fn derive_sparse_patterns(family: &mut FormatFamily) -> Result<(), FmtError> {
    let sparse_pde = family.pde().sparse_pattern()?;
    let mut sparse_pde_multi: [Option<EntryValue>; MAX_SUB_LEVEL_COUNT] =
        [None; MAX_SUB_LEVEL_COUNT];
    for slot in family.sub_levels() {
        if let Some(sub_level) = slot {
            // only the big-page sub-level carries the volatile marking;
            // the others get the invalid aperture alone
            let pattern = if sub_level.index == 0 {
                sub_level.format.sparse_pattern()?
            } else {
                sub_level.format.sparse_pattern_quiet()?
            };
            sparse_pde_multi[sub_level.index as usize] = Some(pattern);
        }
    }
    let sparse_pte = family.pte().sparse_pattern()?;
    family.install_sparse(sparse_pde, sparse_pde_multi, sparse_pte);
    Ok(())
}
