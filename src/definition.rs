//! Declared migration definitions and their validation.

use std::fmt;

use serde_json::{Map, Value};

/// Error type a migrate transform may surface.
///
/// Transforms carry their own failure causes; the engine propagates them
/// without rewriting (see [`MigrationError::Step`](crate::MigrationError)).
pub type StepError = Box<dyn std::error::Error + Send + Sync>;

type MigrateFn =
    Box<dyn Fn(Map<String, Value>) -> Result<Map<String, Value>, StepError> + Send + Sync>;

/// One declared schema-evolution step: an identifier and a transform.
///
/// The position of a definition within the declared list IS its execution
/// order. Identifiers are opaque strings compared only by equality — they
/// are never parsed or ordered by content.
///
/// The transform maps the state payload (the root object without the
/// reserved ledger key) to its next shape. It never observes the ledger.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use state_migrate::Migration;
///
/// let migration = Migration::new("add-settings", |mut state| {
///     state.insert("settings".into(), json!({}));
///     Ok(state)
/// });
/// assert_eq!(migration.id(), "add-settings");
/// ```
pub struct Migration {
    id: String,
    migrate: MigrateFn,
}

impl Migration {
    /// Declare a migration step.
    pub fn new<F>(id: impl Into<String>, migrate: F) -> Self
    where
        F: Fn(Map<String, Value>) -> Result<Map<String, Value>, StepError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            id: id.into(),
            migrate: Box::new(migrate),
        }
    }

    /// The migration's identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run the transform on a payload.
    pub(crate) fn apply(
        &self,
        payload: Map<String, Value>,
    ) -> Result<Map<String, Value>, StepError> {
        (self.migrate)(payload)
    }
}

impl PartialEq for Migration {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Error for malformed migration definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// The definition at `index` has an empty id.
    EmptyId {
        /// Position of the offending definition in the declared list.
        index: usize,
    },
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId { index } => write!(f, "migration {index} has an empty id"),
        }
    }
}

impl std::error::Error for DefinitionError {}

/// Check every definition before anything runs.
///
/// Exhaustive in intent but fails fast on the first offender, in index order.
/// No side effects.
pub(crate) fn validate(definitions: &[Migration]) -> Result<(), DefinitionError> {
    for (index, definition) in definitions.iter().enumerate() {
        if definition.id.is_empty() {
            return Err(DefinitionError::EmptyId { index });
        }
    }
    Ok(())
}
