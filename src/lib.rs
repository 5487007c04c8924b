//! # state-migrate
//!
//! Versioned migrations for plain-object state stores.
//!
//! Applications that persist a single serializable state tree across releases
//! eventually change its shape. `state-migrate` records every schema-evolution
//! step already applied to a state tree in a **ledger** stored inside the tree
//! itself, and applies the missing steps exactly once, in declared order, when
//! a store is constructed from previously persisted state.
//!
//! ## How It Works
//!
//! 1. Every state root carries a ledger under the reserved [`LEDGER_KEY`]
//!    (`_ledger`): the ordered list of migration ids applied to that lineage.
//! 2. At store construction the declared definitions are **reconciled**
//!    against the ledger, position by position: the matching prefix is
//!    already applied, the remainder is pending, and any disagreement is an
//!    error. Reordering is never tolerated.
//! 3. Pending migrations run sequentially over the payload (ledger stripped);
//!    each id is appended only after its transform succeeds.
//! 4. The reducer is **guarded**: whatever it returns, the ledger is carried
//!    forward unchanged from its input state.
//!
//! ## Quick Start
//!
//! ```
//! use serde_json::{json, Value};
//! use state_migrate::{Migration, Migrations};
//!
//! let migrations = Migrations::new(vec![Migration::new("split-name", |mut state| {
//!     let name = state.remove("name").unwrap_or(Value::Null);
//!     state.insert("first_name".into(), name);
//!     Ok(state)
//! })])
//! .unwrap();
//!
//! let preloaded = json!({ "name": "Ada" });
//! let store = migrations
//!     .store(
//!         |state: Option<&Value>, _action: &()| state.cloned().unwrap_or_else(|| json!({})),
//!         Some(preloaded),
//!     )
//!     .unwrap();
//!
//! assert_eq!(
//!     store.state(),
//!     &json!({ "first_name": "Ada", "_ledger": ["split-name"] })
//! );
//! ```
//!
//! ## Guarantees
//!
//! - **Ordered, one-time application**: a migration runs exactly once per
//!   state lineage, in the declared order.
//! - **Fail-closed construction**: malformed definitions, ledger mismatches,
//!   and failing transforms abort construction; no store is produced.
//! - **Ledger integrity**: reducers can read the ledger but never change
//!   what is persisted.
//!
//! Hosts with their own store container plug it in through
//! [`Migrations::enhance`]; the bundled [`Store`] is the minimal container.

mod definition;
mod engine;
mod ledger;
mod reconcile;
mod reducer;
mod store;

pub mod prelude;

pub use definition::{DefinitionError, Migration, StepError};
pub use engine::{MigrationError, Migrations};
pub use ledger::{ledger_in_state, Ledger, StateError, LEDGER_KEY};
pub use reconcile::ReconcileError;
pub use reducer::guard;
pub use store::{Enhanced, GuardedReducer, Store};
