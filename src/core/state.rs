//! State identity and per-state hooks.
//!
//! A state is not a value holder. It is an identity ([`StateId`]) handed out
//! by a [`RuleTable`](crate::rules::RuleTable) plus a set of hooks the table
//! invokes when a cursor enters, updates in, or leaves that state.

use crate::error::Result;
use crate::runtime::{Context, Cursor};
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a declared state.
///
/// Two ids are equal iff they were handed out by the same table for the same
/// declaration. The name is carried for diagnostics only and takes no part in
/// equality, ordering or hashing.
///
/// # Example
///
/// ```rust
/// use scenery::rules::RuleTable;
///
/// let mut table = RuleTable::new();
/// let idle = table.declare("Idle").unwrap();
/// let busy = table.declare("Busy").unwrap();
///
/// assert_ne!(idle, busy);
/// assert_eq!(idle.name(), "Idle");
/// assert_eq!(table.state_named("Idle"), Some(idle));
/// ```
#[derive(Clone, Copy, Serialize)]
pub struct StateId {
    table: u32,
    index: u32,
    name: &'static str,
}

impl StateId {
    pub(crate) fn new(table: u32, index: usize, name: &'static str) -> Self {
        Self {
            table,
            index: index as u32,
            name,
        }
    }

    /// Name the state was declared under.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn table(&self) -> u32 {
        self.table
    }

    pub(crate) fn index(&self) -> usize {
        self.index as usize
    }
}

impl PartialEq for StateId {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table && self.index == other.index
    }
}

impl Eq for StateId {}

impl Hash for StateId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.table.hash(state);
        self.index.hash(state);
    }
}

impl PartialOrd for StateId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StateId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.table, self.index).cmp(&(other.table, other.index))
    }
}

impl fmt::Debug for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateId({}#{}.{})", self.name, self.table, self.index)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Reference to a state that may not be declared yet.
///
/// Rules and access scopes accept either a resolved id or a name. Names are
/// resolved against a rule table later: at `finalize()` for rules, and when
/// the data store is built for scopes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StateRef {
    Id(StateId),
    Name(String),
}

impl StateRef {
    pub fn name(&self) -> &str {
        match self {
            Self::Id(id) => id.name(),
            Self::Name(name) => name,
        }
    }
}

impl From<StateId> for StateRef {
    fn from(id: StateId) -> Self {
        Self::Id(id)
    }
}

impl From<&StateId> for StateRef {
    fn from(id: &StateId) -> Self {
        Self::Id(*id)
    }
}

impl From<&str> for StateRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for StateRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl fmt::Display for StateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle hooks of a state.
///
/// Every method defaults to doing nothing, so a state only overrides what it
/// needs. Hooks run after the table's own bookkeeping for the same phase:
/// `on_enter` runs after transient resets and ENTER edge actions, and
/// `on_leave` runs after LEAVE edge actions.
pub trait StateHooks {
    /// Called once per tick while the cursor is in this state, before its
    /// children update.
    fn on_update(&self, _cursor: &mut Cursor, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }

    /// Called when a cursor enters this state. `from` is `None` for the
    /// start state of a freshly built cursor.
    fn on_enter(&self, _cursor: &mut Cursor, _from: Option<StateId>, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }

    /// Called when a cursor leaves this state for `to`.
    fn on_leave(&self, _cursor: &mut Cursor, _to: StateId, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }
}

/// State with no behaviour of its own.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHooks;

impl StateHooks for NoHooks {}

type UpdateFn = Box<dyn Fn(&mut Cursor, &mut Context) -> Result<()>>;
type EnterFn = Box<dyn Fn(&mut Cursor, Option<StateId>, &mut Context) -> Result<()>>;
type LeaveFn = Box<dyn Fn(&mut Cursor, StateId, &mut Context) -> Result<()>>;

/// Closure-backed [`StateHooks`].
///
/// # Example
///
/// ```rust
/// use scenery::core::HookFns;
/// use scenery::rules::RuleTable;
///
/// let mut table = RuleTable::new();
/// table
///     .declare_state(
///         "Counting",
///         HookFns::new().on_update(|cursor, _ctx| cursor.view().modify("num", |n: i64| n + 1)),
///     )
///     .unwrap();
/// ```
#[derive(Default)]
pub struct HookFns {
    update: Option<UpdateFn>,
    enter: Option<EnterFn>,
    leave: Option<LeaveFn>,
}

impl HookFns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_update<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Cursor, &mut Context) -> Result<()> + 'static,
    {
        self.update = Some(Box::new(f));
        self
    }

    pub fn on_enter<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Cursor, Option<StateId>, &mut Context) -> Result<()> + 'static,
    {
        self.enter = Some(Box::new(f));
        self
    }

    pub fn on_leave<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Cursor, StateId, &mut Context) -> Result<()> + 'static,
    {
        self.leave = Some(Box::new(f));
        self
    }
}

impl StateHooks for HookFns {
    fn on_update(&self, cursor: &mut Cursor, ctx: &mut Context) -> Result<()> {
        self.update.as_ref().map_or(Ok(()), |f| f(cursor, ctx))
    }

    fn on_enter(&self, cursor: &mut Cursor, from: Option<StateId>, ctx: &mut Context) -> Result<()> {
        self.enter.as_ref().map_or(Ok(()), |f| f(cursor, from, ctx))
    }

    fn on_leave(&self, cursor: &mut Cursor, to: StateId, ctx: &mut Context) -> Result<()> {
        self.leave.as_ref().map_or(Ok(()), |f| f(cursor, to, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_ignores_name() {
        let a = StateId::new(1, 0, "A");
        let renamed = StateId::new(1, 0, "Renamed");
        let other_table = StateId::new(2, 0, "A");

        assert_eq!(a, renamed);
        assert_ne!(a, other_table);
    }

    #[test]
    fn hash_follows_identity() {
        let mut set = HashSet::new();
        set.insert(StateId::new(1, 0, "A"));
        set.insert(StateId::new(1, 0, "A"));
        set.insert(StateId::new(1, 1, "B"));

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn ordering_is_declaration_order() {
        let first = StateId::new(1, 0, "Z");
        let second = StateId::new(1, 1, "A");
        assert!(first < second);
    }

    #[test]
    fn display_uses_name() {
        let id = StateId::new(3, 4, "Play");
        assert_eq!(id.to_string(), "Play");
        assert_eq!(format!("{:?}", id), "StateId(Play#3.4)");
    }

    #[test]
    fn state_ref_conversions() {
        let id = StateId::new(1, 2, "Death");
        assert_eq!(StateRef::from(id), StateRef::Id(id));
        assert_eq!(StateRef::from(&id), StateRef::Id(id));
        assert_eq!(StateRef::from("Death"), StateRef::Name("Death".to_string()));
        assert_eq!(StateRef::from(id).name(), "Death");
        assert_eq!(StateRef::from("Leaderboard").to_string(), "Leaderboard");
    }
}
