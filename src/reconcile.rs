//! Reconciliation of declared definitions against a previously applied ledger.

use std::fmt;

use crate::definition::Migration;

/// Error when the declared definitions do not match the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// The ledger names a migration at `index` with no definition to match.
    MissingDefinition {
        /// Index of the unmatched ledger entry.
        index: usize,
        /// The id the ledger expected at that index.
        expected: String,
    },
    /// The definition at `index` carries a different id than the ledger.
    Mismatch {
        /// Index of the first disagreement.
        index: usize,
        /// The id the ledger expected at that index.
        expected: String,
        /// The id the declared definition carries instead.
        found: String,
    },
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDefinition { index, expected } => write!(
                f,
                "migration definition mismatch: expected migration {expected} at index {index}, found nothing instead"
            ),
            Self::Mismatch {
                index,
                expected,
                found,
            } => write!(
                f,
                "migration definition mismatch: expected migration {expected} at index {index}, found {found} instead"
            ),
        }
    }
}

impl std::error::Error for ReconcileError {}

/// Compute the pending suffix of `definitions` relative to `previous`.
///
/// The walk is index-aligned: every ledger entry must be matched, in order,
/// by the definition at the same position. Once the ledger is exhausted the
/// remaining definitions are pending. Reordering declared definitions
/// relative to the ledger is always an error, never silently tolerated.
pub(crate) fn pending<'a>(
    previous: &[String],
    definitions: &'a [Migration],
) -> Result<&'a [Migration], ReconcileError> {
    for (index, expected) in previous.iter().enumerate() {
        match definitions.get(index) {
            None => {
                return Err(ReconcileError::MissingDefinition {
                    index,
                    expected: expected.clone(),
                })
            }
            Some(definition) if definition.id() != expected => {
                return Err(ReconcileError::Mismatch {
                    index,
                    expected: expected.clone(),
                    found: definition.id().to_string(),
                })
            }
            Some(_) => {}
        }
    }
    Ok(&definitions[previous.len()..])
}
