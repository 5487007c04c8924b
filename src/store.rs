//! Store construction: the two-stage factory tying validation,
//! reconciliation, execution, and the reducer guard together.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::engine::{MigrationError, Migrations};
use crate::ledger::StateError;
use crate::reducer::guard;

/// A reducer wrapped by the guard, as handed to a store constructor.
pub type GuardedReducer<A> =
    Box<dyn Fn(Option<&Value>, &A) -> Result<Value, StateError> + Send + Sync>;

impl Migrations {
    /// Stage one of the factory: capture the underlying store constructor.
    ///
    /// `create` is any callable accepting a guarded reducer and the migrated
    /// initial state; stage two ([`Enhanced::build`]) supplies both.
    pub fn enhance<C>(self, create: C) -> Enhanced<C> {
        Enhanced {
            migrations: self,
            create,
        }
    }

    /// Build the bundled in-memory [`Store`] directly.
    ///
    /// Shorthand for enhancing the built-in container; see
    /// [`Enhanced::build`] for the pipeline.
    pub fn store<A: 'static, R>(
        self,
        reducer: R,
        preloaded: Option<Value>,
    ) -> Result<Store<A>, MigrationError>
    where
        R: Fn(Option<&Value>, &A) -> Value + Send + Sync + 'static,
    {
        let (initial, _) = self.run(preloaded.as_ref())?;
        Ok(Store::with(Box::new(guard(reducer)), initial))
    }
}

/// Stage two of the factory: a captured store constructor awaiting its
/// reducer and preloaded state.
///
/// # Example
///
/// ```
/// use serde_json::{json, Value};
/// use state_migrate::{Migrations, Store};
///
/// let store: Store<()> = Migrations::default()
///     .enhance(|reducer, initial| Store::with(reducer, initial))
///     .build(
///         |state: Option<&Value>, _action: &()| state.cloned().unwrap_or_else(|| json!({})),
///         Some(json!({ "blub": "blub" })),
///     )
///     .unwrap();
///
/// assert_eq!(store.state(), &json!({ "blub": "blub", "_ledger": [] }));
/// ```
pub struct Enhanced<C> {
    migrations: Migrations,
    create: C,
}

impl<C> Enhanced<C> {
    /// Migrate `preloaded`, guard `reducer`, and hand both to the captured
    /// constructor.
    ///
    /// Fails fast, in order, on malformed state, on reconciliation mismatch,
    /// and on the first failing transform. On failure no store is produced.
    pub fn build<A: 'static, R, S>(self, reducer: R, preloaded: Option<Value>) -> Result<S, MigrationError>
    where
        C: FnOnce(GuardedReducer<A>, Value) -> S,
        R: Fn(Option<&Value>, &A) -> Value + Send + Sync + 'static,
    {
        let (initial, _) = self.migrations.run(preloaded.as_ref())?;
        let reducer: GuardedReducer<A> = Box::new(guard(reducer));
        Ok((self.create)(reducer, initial))
    }
}

/// Minimal synchronous store container.
///
/// Holds the current state root and the guarded reducer. Migration happens
/// once, at construction; dispatching folds one action at a time into the
/// state. There is no subscription mechanism and no middleware. Hosts with
/// their own container pass it to [`Migrations::enhance`] instead.
pub struct Store<A> {
    reducer: GuardedReducer<A>,
    state: Value,
}

impl<A> std::fmt::Debug for Store<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<A> Store<A> {
    /// Assemble a store from a guarded reducer and its initial state.
    pub fn with(reducer: GuardedReducer<A>, initial: Value) -> Self {
        Self {
            reducer,
            state: initial,
        }
    }

    /// The current state root.
    pub fn state(&self) -> &Value {
        &self.state
    }

    /// Deserialize the current state into a typed view.
    pub fn state_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.state.clone())
    }

    /// Fold `action` into the state through the guarded reducer.
    ///
    /// Guard violations (non-object reducer output) surface here, per
    /// dispatch; the previous state is kept on failure.
    pub fn dispatch(&mut self, action: A) -> Result<&Value, StateError> {
        self.state = (self.reducer)(Some(&self.state), &action)?;
        Ok(&self.state)
    }
}
