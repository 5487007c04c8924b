//! Ledger extraction and attachment for plain-object state roots.
//!
//! The ledger lives inside the state tree itself, under a reserved root key,
//! so it travels with the state through persistence and reload.

use std::fmt;

use serde_json::{Map, Value};

/// Reserved root key holding the ledger of applied migration ids.
pub const LEDGER_KEY: &str = "_ledger";

/// Ordered list of migration ids already applied to a state lineage.
///
/// Append-only and positional: duplicates are permitted, but every entry must
/// match the declared definition at the same index during reconciliation.
pub type Ledger = Vec<String>;

/// Error for state-shape violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// State is defined but not a plain JSON object.
    NotAnObject,
    /// The reserved ledger key is present but not an array of strings.
    MalformedLedger,
    /// The wrapped reducer returned something other than a plain object.
    ReducerOutput,
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject => write!(
                f,
                "expected state to be a plain object; migrations only work with plain object stores"
            ),
            Self::MalformedLedger => {
                write!(f, "expected the {LEDGER_KEY} entry to be an array of strings")
            }
            Self::ReducerOutput => write!(
                f,
                "expected reducer to return a plain object; migrations only work with plain object stores"
            ),
        }
    }
}

impl std::error::Error for StateError {}

/// Read the ledger out of a state root.
///
/// Absent state and objects without the reserved key yield an empty ledger.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use state_migrate::ledger_in_state;
///
/// let state = json!({ "todos": [], "_ledger": ["add-todos"] });
/// assert_eq!(ledger_in_state(Some(&state)).unwrap(), vec!["add-todos"]);
/// assert_eq!(ledger_in_state(None).unwrap(), Vec::<String>::new());
/// ```
pub fn ledger_in_state(state: Option<&Value>) -> Result<Ledger, StateError> {
    match state {
        None => Ok(Ledger::new()),
        Some(Value::Object(map)) => match map.get(LEDGER_KEY) {
            None => Ok(Ledger::new()),
            Some(raw) => parse_ledger(raw),
        },
        Some(_) => Err(StateError::NotAnObject),
    }
}

/// Split a state root into its payload (reserved key removed) and its ledger.
pub(crate) fn detach_ledger(
    state: Option<&Value>,
) -> Result<(Map<String, Value>, Ledger), StateError> {
    match state {
        None => Ok((Map::new(), Ledger::new())),
        Some(Value::Object(map)) => {
            let mut payload = map.clone();
            let ledger = match payload.remove(LEDGER_KEY) {
                None => Ledger::new(),
                Some(raw) => parse_ledger(&raw)?,
            };
            Ok((payload, ledger))
        }
        Some(_) => Err(StateError::NotAnObject),
    }
}

/// Attach a ledger to a payload, producing a full state root.
pub(crate) fn attach_ledger(mut payload: Map<String, Value>, ledger: &[String]) -> Value {
    payload.insert(LEDGER_KEY.to_string(), Value::from(ledger.to_vec()));
    Value::Object(payload)
}

fn parse_ledger(raw: &Value) -> Result<Ledger, StateError> {
    let entries = raw.as_array().ok_or(StateError::MalformedLedger)?;
    entries
        .iter()
        .map(|entry| {
            entry
                .as_str()
                .map(str::to_string)
                .ok_or(StateError::MalformedLedger)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn absent_state_has_empty_ledger() {
        assert_eq!(ledger_in_state(None).unwrap(), Ledger::new());
    }

    #[test]
    fn object_without_ledger_has_empty_ledger() {
        assert_eq!(ledger_in_state(Some(&json!({}))).unwrap(), Ledger::new());
    }

    #[test]
    fn reads_ledger_from_state() {
        let state = json!({ "_ledger": ["123", "456"] });
        assert_eq!(ledger_in_state(Some(&state)).unwrap(), vec!["123", "456"]);
    }

    #[test]
    fn rejects_non_object_state() {
        for state in [json!(5), json!(false), json!(null), json!("uiae"), json!([1, 2])] {
            assert_eq!(ledger_in_state(Some(&state)), Err(StateError::NotAnObject));
        }
    }

    #[test]
    fn rejects_malformed_ledger() {
        let not_an_array = json!({ "_ledger": "lololo" });
        assert_eq!(
            ledger_in_state(Some(&not_an_array)),
            Err(StateError::MalformedLedger)
        );

        let wrong_entry = json!({ "_ledger": ["123", 5] });
        assert_eq!(
            ledger_in_state(Some(&wrong_entry)),
            Err(StateError::MalformedLedger)
        );
    }

    #[test]
    fn detach_strips_reserved_key() {
        let state = json!({ "blub": "blub", "_ledger": ["1"] });
        let (payload, ledger) = detach_ledger(Some(&state)).unwrap();
        assert!(!payload.contains_key(LEDGER_KEY));
        assert_eq!(payload.get("blub"), Some(&json!("blub")));
        assert_eq!(ledger, vec!["1"]);
    }

    #[test]
    fn detach_of_absent_state_is_empty() {
        let (payload, ledger) = detach_ledger(None).unwrap();
        assert!(payload.is_empty());
        assert!(ledger.is_empty());
    }

    #[test]
    fn attach_reattaches_ledger() {
        let (payload, _) = detach_ledger(Some(&json!({ "blub": "blub" }))).unwrap();
        let state = attach_ledger(payload, &["1".to_string()]);
        assert_eq!(state, json!({ "blub": "blub", "_ledger": ["1"] }));
    }
}
