//! The reducer guard: carries the ledger through arbitrary reducers.

use serde_json::Value;

use crate::ledger::{ledger_in_state, StateError, LEDGER_KEY};

/// Wrap a reducer so the ledger survives whatever it returns.
///
/// The wrapped reducer receives its input state unchanged, ledger included,
/// so it may branch on migration history. Its output must be a plain object;
/// the reserved ledger key on that output is then overwritten with the ledger
/// captured from the input state. Downstream logic can never rewrite the
/// ledger, and the key is always present at the root.
///
/// Absent input state yields an empty ledger; defined non-object input fails
/// with [`StateError::NotAnObject`] before the reducer runs.
///
/// # Example
///
/// ```
/// use serde_json::{json, Value};
/// use state_migrate::guard;
///
/// let guarded = guard(|_state: Option<&Value>, _action: &()| json!({ "_ledger": "lololo" }));
///
/// let state = json!({ "_ledger": ["sensibleMigrationId"] });
/// let next = guarded(Some(&state), &()).unwrap();
/// assert_eq!(next, state);
/// ```
pub fn guard<A, R>(reducer: R) -> impl Fn(Option<&Value>, &A) -> Result<Value, StateError> + Send + Sync
where
    R: Fn(Option<&Value>, &A) -> Value + Send + Sync,
{
    move |state, action| {
        let ledger = ledger_in_state(state)?;
        match reducer(state, action) {
            Value::Object(mut next) => {
                next.insert(LEDGER_KEY.to_string(), Value::from(ledger));
                Ok(Value::Object(next))
            }
            _ => Err(StateError::ReducerOutput),
        }
    }
}
