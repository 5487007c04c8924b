//! Convenient re-exports for common usage.
//!
//! ```
//! use state_migrate::prelude::*;
//! ```

pub use crate::DefinitionError;
pub use crate::Ledger;
pub use crate::Migration;
pub use crate::MigrationError;
pub use crate::Migrations;
pub use crate::ReconcileError;
pub use crate::StateError;
pub use crate::Store;
pub use crate::LEDGER_KEY;
