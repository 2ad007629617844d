//! Running machines.
//!
//! [`Cursor`]s own a data store and a current state, and form a tree: a
//! game cursor may drive one child cursor per actor, each with its own
//! machine and data. A [`Context`] is the stack of cursors executing during
//! a tick and resolves field names across that stack.

mod context;
mod cursor;

pub use context::{Context, CursorRef};
pub use cursor::Cursor;
