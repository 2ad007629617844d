//! Scenery: trees of state machines over scoped, shared data
//!
//! Applications are built as cooperating finite-state machines. Each running
//! machine (a [`Cursor`](runtime::Cursor)) owns a record of fields whose
//! access is restricted per state, and may drive child machines of its own.
//!
//! # Core Concepts
//!
//! - **States**: identities declared in a [`RuleTable`](rules::RuleTable),
//!   with optional [`StateHooks`](core::StateHooks) for enter/update/leave
//! - **Rules**: guarded transitions evaluated in declaration order, plus
//!   ordered actions on rules and on `(source, destination)` edges
//! - **Scoped data**: every field is `Global`, `Static` to some states, or
//!   `Transient` (reset whenever its states are entered or left)
//! - **Context**: the stack of active cursors, resolving field names
//!   innermost first
//!
//! # Example
//!
//! ```rust
//! use scenery::core::HookFns;
//! use scenery::record;
//! use scenery::rules::{Edge, RuleTable};
//! use scenery::runtime::Cursor;
//! use scenery::store::Access;
//! use std::rc::Rc;
//!
//! record! {
//!     struct GameData {
//!         num: i64 = 0 => Access::global(),
//!         visits: i64 = 0 => Access::transient(["Second"]),
//!     }
//! }
//!
//! let mut table = RuleTable::new();
//! let entry = table
//!     .declare_state(
//!         "Entry",
//!         HookFns::new().on_update(|cursor, _| cursor.view().modify("num", |n: i64| n + 1)),
//!     )
//!     .unwrap();
//! table
//!     .add_condition(entry, "Second", |_, cursor, _| Ok(cursor.view().get::<i64>("num")? == 1))
//!     .unwrap();
//! table
//!     .add_action(entry, "Second", Edge::Enter, |_, _, cursor, _| {
//!         cursor.view().set("visits", 1)
//!     })
//!     .unwrap();
//! let second = table.declare("Second").unwrap();
//! table.finalize().unwrap();
//!
//! let mut game = Cursor::new::<GameData>("game", Rc::new(table), entry).unwrap();
//! game.tick().unwrap();
//!
//! assert_eq!(game.state(), second);
//! assert_eq!(game.view().get::<i64>("visits").unwrap(), 1);
//! ```

pub mod core;
pub mod error;
pub mod rules;
pub mod runtime;
pub mod store;

// Re-export commonly used types
pub use crate::core::{HookFns, StateHooks, StateId, StateRef};
pub use error::{ConfigError, Error, Result};
pub use rules::{Edge, Endpoint, RuleTable};
pub use runtime::{Context, Cursor};
pub use store::{Access, DataStore, Record};
