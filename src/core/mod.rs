//! State identities, hooks, conditions and transition history.
//!
//! - States are identities handed out by a rule table, via [`StateId`]
//! - Behaviour attaches through the [`StateHooks`] interface
//! - [`Condition`]s guard transition rules
//! - [`StateHistory`] journals the state changes of a cursor

mod guard;
mod history;
mod state;

pub use guard::Condition;
pub use history::{StateHistory, TransitionRecord, DEFAULT_HISTORY_LIMIT};
pub use state::{HookFns, NoHooks, StateHooks, StateId, StateRef};
