//! Scoped data stores.
//!
//! Every cursor owns one record of fields. Each field carries an access
//! scope that decides which states may touch it:
//!
//! - `Global` fields are open to every state
//! - `Static` fields are open to a fixed set of states and keep their value
//! - `Transient` fields are open to a fixed set of states and are reset
//!   whenever a transition leaves or enters one of them

mod access;
mod data;
mod macros;
mod record;
mod view;

pub use access::{Access, Factory, Scope};
pub use data::{DataStore, FieldDescriptor};
pub use record::{FieldDecl, Record};
pub use view::{ScopedView, StoreHandle};
