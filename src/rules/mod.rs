//! Transition rules.
//!
//! A [`RuleTable`] holds, for every declared state, the guarded rules that
//! lead out of it, plus edge actions keyed by `(source, destination)` that
//! fire on the LEAVE or ENTER side of a state change.
//!
//! # Evaluation order
//!
//! For a state change `A → B` the table runs, in order: the matched rule's
//! actions, LEAVE edge actions for `(A, B)`, `A`'s `on_leave`, the transient
//! resets for `A` and then `B`, ENTER edge actions for `(A, B)`, and `B`'s
//! `on_enter`. Within each list actions run in registration order.

mod resolve;
mod table;

pub use table::{Action, Edge, Endpoint, RuleId, RuleTable};
