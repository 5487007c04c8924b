//! The migration engine: validated definitions, reconciliation, execution.

use std::fmt;

use serde_json::Value;

use crate::definition::{self, DefinitionError, Migration, StepError};
use crate::ledger::{attach_ledger, detach_ledger, Ledger, StateError};
use crate::reconcile::{self, ReconcileError};

/// Error surfaced while constructing a migrated store.
///
/// Aggregates the failure classes of the construction pipeline. All variants
/// are raised at the moment of detection and never caught internally: if
/// construction fails, no store value exists.
#[derive(Debug)]
pub enum MigrationError {
    /// A declared definition is malformed.
    Definition(DefinitionError),
    /// The incoming state violates the plain-object contract.
    State(StateError),
    /// The declared definitions do not match the previously applied ledger.
    Reconcile(ReconcileError),
    /// A migrate transform failed. The source error is carried unmodified.
    Step {
        /// Id of the failing definition.
        id: String,
        /// The transform's own error.
        source: StepError,
    },
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Definition(e) => write!(f, "{e}"),
            Self::State(e) => write!(f, "{e}"),
            Self::Reconcile(e) => write!(f, "{e}"),
            Self::Step { id, source } => write!(f, "migration {id} failed: {source}"),
        }
    }
}

impl std::error::Error for MigrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Definition(e) => Some(e),
            Self::State(e) => Some(e),
            Self::Reconcile(e) => Some(e),
            Self::Step { source, .. } => Some(source.as_ref()),
        }
    }
}

impl From<DefinitionError> for MigrationError {
    fn from(e: DefinitionError) -> Self {
        Self::Definition(e)
    }
}

impl From<StateError> for MigrationError {
    fn from(e: StateError) -> Self {
        Self::State(e)
    }
}

impl From<ReconcileError> for MigrationError {
    fn from(e: ReconcileError) -> Self {
        Self::Reconcile(e)
    }
}

/// A validated, ordered list of migration definitions.
///
/// This is the configuration object of the two-stage store factory: built
/// once per process from the declared definitions, it can migrate any number
/// of state trees forward. The declared order IS the execution order.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use state_migrate::{Migration, Migrations};
///
/// let migrations = Migrations::new(vec![Migration::new("flatten", |mut state| {
///     state.remove("nested");
///     Ok(state)
/// })])
/// .unwrap();
///
/// let preloaded = json!({ "nested": { "old": true } });
/// let (migrated, ledger) = migrations.run(Some(&preloaded)).unwrap();
///
/// assert_eq!(migrated, json!({ "_ledger": ["flatten"] }));
/// assert_eq!(ledger, vec!["flatten"]);
/// ```
#[derive(Debug)]
pub struct Migrations {
    definitions: Vec<Migration>,
}

impl Migrations {
    /// Capture and validate the declared definitions.
    ///
    /// Validation fails fast on the first malformed definition, in index
    /// order, before anything runs.
    pub fn new(definitions: Vec<Migration>) -> Result<Self, DefinitionError> {
        definition::validate(&definitions)?;
        Ok(Self { definitions })
    }

    /// Number of declared definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether no definitions are declared.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Ids of all declared definitions, in execution order.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.definitions.iter().map(Migration::id)
    }

    /// Compute the definitions still pending for a state whose ledger is
    /// `previous`.
    ///
    /// Matching is purely positional: the ledger must be a prefix of the
    /// declared ids, or reconciliation fails at the first disagreement.
    pub fn pending(&self, previous: &[String]) -> Result<&[Migration], ReconcileError> {
        reconcile::pending(previous, &self.definitions)
    }

    /// Migrate `preloaded` forward through every pending definition.
    ///
    /// The payload handed to each transform has the reserved ledger key
    /// stripped; an id is appended to the ledger only after its transform
    /// succeeds, so the ledger names exactly the migrations that ran. A
    /// failing transform aborts the whole run and the draft state is
    /// discarded.
    ///
    /// Returns the migrated state (ledger reattached) and the grown ledger.
    pub fn run(&self, preloaded: Option<&Value>) -> Result<(Value, Ledger), MigrationError> {
        let (mut payload, previous) = detach_ledger(preloaded)?;
        let pending = self.pending(&previous)?;

        let mut ledger = previous;
        for definition in pending {
            payload = definition
                .apply(payload)
                .map_err(|source| MigrationError::Step {
                    id: definition.id().to_string(),
                    source,
                })?;
            ledger.push(definition.id().to_string());
        }

        Ok((attach_ledger(payload, &ledger), ledger))
    }
}

impl Default for Migrations {
    fn default() -> Self {
        Self {
            definitions: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use serde_json::json;

    use super::*;

    #[test]
    fn empty_engine_attaches_an_empty_ledger() {
        let migrations = Migrations::default();
        let (migrated, ledger) = migrations.run(None).unwrap();
        assert_eq!(migrated, json!({ "_ledger": [] }));
        assert!(ledger.is_empty());
    }

    #[test]
    fn transforms_state_and_records_the_id() {
        let migrations = Migrations::new(vec![Migration::new("123", |_state| {
            let mut next = serde_json::Map::new();
            next.insert("blub".into(), json!("blub"));
            Ok(next)
        })])
        .unwrap();

        let preloaded = json!({ "uiae": "thisIsGonnaBeReplaced" });
        let (migrated, ledger) = migrations.run(Some(&preloaded)).unwrap();

        assert_eq!(migrated, json!({ "blub": "blub", "_ledger": ["123"] }));
        assert_eq!(ledger, vec!["123"]);
    }

    #[test]
    fn applies_pending_definitions_in_declared_order() {
        let migrations = Migrations::new(vec![
            Migration::new("123", |mut state| {
                state.insert("blab".into(), json!("blab"));
                Ok(state)
            }),
            Migration::new("124", |mut state| {
                state.insert("blub".into(), json!([1, 2, 3]));
                Ok(state)
            }),
        ])
        .unwrap();

        let preloaded = json!({ "blub": "blub" });
        let (migrated, _) = migrations.run(Some(&preloaded)).unwrap();

        assert_eq!(
            migrated,
            json!({ "blab": "blab", "blub": [1, 2, 3], "_ledger": ["123", "124"] })
        );
    }

    #[test]
    fn skips_definitions_already_in_the_ledger() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);

        let migrations = Migrations::new(vec![
            Migration::new("1", |state| {
                panic!("already applied; must not run again: {state:?}")
            }),
            Migration::new("2", move |state| {
                flag.store(true, Ordering::SeqCst);
                Ok(state)
            }),
        ])
        .unwrap();

        let preloaded = json!({ "_ledger": ["1"], "someState": "someState" });
        let (migrated, ledger) = migrations.run(Some(&preloaded)).unwrap();

        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(ledger, vec!["1", "2"]);
        assert_eq!(migrated["someState"], json!("someState"));
    }

    #[test]
    fn transforms_never_observe_the_ledger() {
        let migrations = Migrations::new(vec![Migration::new("2", |state| {
            assert!(!state.contains_key("_ledger"));
            Ok(state)
        })])
        .unwrap();

        let preloaded = json!({ "someState": "someState" });
        migrations.run(Some(&preloaded)).unwrap();
    }

    #[test]
    fn failing_transform_aborts_the_run() {
        let later_ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&later_ran);

        let migrations = Migrations::new(vec![
            Migration::new("bad", |_state| Err("disk on fire".into())),
            Migration::new("after", move |state| {
                flag.store(true, Ordering::SeqCst);
                Ok(state)
            }),
        ])
        .unwrap();

        let err = migrations.run(Some(&json!({}))).unwrap_err();
        match err {
            MigrationError::Step { id, source } => {
                assert_eq!(id, "bad");
                assert_eq!(source.to_string(), "disk on fire");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!later_ran.load(Ordering::SeqCst));
    }

    #[test]
    fn mismatched_ledger_fails_before_any_transform() {
        let migrations = Migrations::new(vec![Migration::new("123", |_state| {
            panic!("must not run on mismatch")
        })])
        .unwrap();

        let preloaded = json!({ "_ledger": ["321"] });
        let err = migrations.run(Some(&preloaded)).unwrap_err();
        assert!(matches!(
            err,
            MigrationError::Reconcile(ReconcileError::Mismatch { index: 0, .. })
        ));
    }

    #[test]
    fn non_object_state_is_rejected() {
        let migrations = Migrations::default();
        let err = migrations.run(Some(&json!("uiae"))).unwrap_err();
        assert!(matches!(err, MigrationError::State(StateError::NotAnObject)));
    }

    #[test]
    fn ids_lists_the_declared_order() {
        let migrations = Migrations::new(vec![
            Migration::new("1", Ok),
            Migration::new("2", Ok),
        ])
        .unwrap();
        assert_eq!(migrations.ids().collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(migrations.len(), 2);
        assert!(!migrations.is_empty());
    }
}
