//! The stack of cursors active during a tick.

use super::cursor::Cursor;
use crate::core::StateId;
use crate::error::{Error, Result};
use crate::store::{ScopedView, StoreHandle};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cell::Cell;
use std::rc::Rc;
use uuid::Uuid;

/// Handle to a cursor on the context stack.
///
/// Tracks the cursor's current state live, so a view taken from it always
/// reflects the state the cursor is in now.
#[derive(Clone, Debug)]
pub struct CursorRef {
    key: String,
    id: Uuid,
    store: StoreHandle,
    state: Rc<Cell<StateId>>,
}

impl CursorRef {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> StateId {
        self.state.get()
    }

    pub fn data(&self) -> &StoreHandle {
        &self.store
    }

    /// View of the cursor's store under its current state.
    pub fn view(&self) -> ScopedView {
        self.store.scoped_view(self.state())
    }

    fn allows(&self, field: &str) -> bool {
        self.store.allows(field, self.state())
    }
}

/// Cursors currently executing, outermost first.
///
/// A cursor pushes itself when its `update` starts and pops itself when it
/// ends, so during a tick the context holds exactly the chain from the root
/// to the cursor running now. Field lookups search that chain innermost
/// first, letting inner machines shadow fields of outer ones.
///
/// # Example
///
/// ```rust
/// use scenery::record;
/// use scenery::rules::RuleTable;
/// use scenery::runtime::{Context, Cursor};
/// use scenery::store::Access;
/// use std::rc::Rc;
///
/// record! {
///     struct Outer { x: i64 = 1 => Access::global() }
/// }
/// record! {
///     struct Inner { x: i64 = 2 => Access::global() }
/// }
///
/// let mut table = RuleTable::new();
/// let idle = table.declare("Idle").unwrap();
/// table.finalize().unwrap();
/// let table = Rc::new(table);
///
/// let outer = Cursor::new::<Outer>("outer", Rc::clone(&table), idle).unwrap();
/// let inner = Cursor::new::<Inner>("inner", table, idle).unwrap();
///
/// let mut ctx = Context::new();
/// ctx.add_cursor("outer", &outer);
/// ctx.add_cursor("inner", &inner);
/// assert_eq!(ctx.which("x"), Some("inner"));
/// assert_eq!(ctx.get::<i64>("x").unwrap(), 2);
/// ```
#[derive(Debug, Default)]
pub struct Context {
    frames: Vec<CursorRef>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `cursor` under `key`.
    pub fn add_cursor(&mut self, key: impl Into<String>, cursor: &Cursor) {
        let key = key.into();
        tracing::trace!(key = %key, depth = self.frames.len(), "push cursor");
        self.frames.push(CursorRef {
            key,
            id: cursor.id(),
            store: cursor.data().clone(),
            state: cursor.state_cell(),
        });
    }

    /// Pop the innermost cursor.
    pub fn pop_cursor(&mut self) -> Option<CursorRef> {
        let frame = self.frames.pop();
        if let Some(frame) = &frame {
            tracing::trace!(key = %frame.key, depth = self.frames.len(), "pop cursor");
        }
        frame
    }

    /// Innermost cursor whose current state may access `field`.
    pub fn resolve(&self, field: &str) -> Option<&CursorRef> {
        self.frames.iter().rev().find(|frame| frame.allows(field))
    }

    /// Key of the innermost cursor whose current state may access `field`.
    pub fn which(&self, field: &str) -> Option<&str> {
        self.resolve(field).map(CursorRef::key)
    }

    /// Innermost cursor pushed under `key`.
    pub fn cursor(&self, key: &str) -> Option<&CursorRef> {
        self.frames.iter().rev().find(|frame| frame.key == key)
    }

    fn view_for(&self, field: &str) -> Result<ScopedView> {
        self.resolve(field)
            .map(CursorRef::view)
            .ok_or_else(|| Error::FieldNotAccessible {
                field: field.to_string(),
            })
    }

    pub fn get_value(&self, field: &str) -> Result<Value> {
        self.view_for(field)?.get_value(field)
    }

    pub fn set_value(&self, field: &str, value: Value) -> Result<()> {
        self.view_for(field)?.set_value(field, value)
    }

    /// Read `field` from the innermost cursor that can access it.
    pub fn get<T: DeserializeOwned>(&self, field: &str) -> Result<T> {
        self.view_for(field)?.get(field)
    }

    /// Write `field` on the innermost cursor that can access it.
    pub fn set<T: Serialize>(&self, field: &str, value: T) -> Result<()> {
        self.view_for(field)?.set(field, value)
    }

    pub fn modify<T, F>(&self, field: &str, f: F) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(T) -> T,
    {
        self.view_for(field)?.modify(field, f)
    }

    /// Keys on the stack, outermost first.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.frames.iter().map(CursorRef::key)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;
    use crate::rules::RuleTable;
    use crate::store::Access;

    record! {
        struct OuterData {
            test1: i64 = 1 => Access::global(),
            test2: i64 = 2 => Access::global(),
            test3: i64 = 3 => Access::static_in(["OuterScene1"]),
        }
    }

    record! {
        struct InnerData {
            test4: i64 = 4 => Access::global(),
            test1: i64 = 5 => Access::global(),
            test5: i64 = 6 => Access::static_in(["InnerScene1"]),
        }
    }

    fn cursors() -> (Cursor, Cursor) {
        let mut table = RuleTable::new();
        let outer1 = table.declare("OuterScene1").unwrap();
        table.declare("OuterScene2").unwrap();
        let inner1 = table.declare("InnerScene1").unwrap();
        table.declare("InnerScene2").unwrap();
        table.finalize().unwrap();
        let table = Rc::new(table);

        (
            Cursor::new::<OuterData>("outer", Rc::clone(&table), outer1).unwrap(),
            Cursor::new::<InnerData>("inner", table, inner1).unwrap(),
        )
    }

    #[test]
    fn which_scans_innermost_first() {
        let (outer, inner) = cursors();
        let mut ctx = Context::new();
        ctx.add_cursor("outer", &outer);
        ctx.add_cursor("inner", &inner);

        assert_eq!(ctx.which("test1"), Some("inner"));
        assert_eq!(ctx.which("test2"), Some("outer"));
        assert_eq!(ctx.which("test3"), Some("outer"));
        assert_eq!(ctx.which("test4"), Some("inner"));
        assert_eq!(ctx.which("test5"), Some("inner"));
        assert_eq!(ctx.which("test6"), None);
    }

    #[test]
    fn shadowed_field_writes_hit_the_inner_cursor() {
        let (outer, inner) = cursors();
        let mut ctx = Context::new();
        ctx.add_cursor("outer", &outer);
        ctx.add_cursor("inner", &inner);

        ctx.set("test1", 7).unwrap();
        assert_eq!(ctx.get::<i64>("test1").unwrap(), 7);
        assert_eq!(outer.view().get::<i64>("test1").unwrap(), 1);

        let outer_ref = ctx.cursor("outer").unwrap();
        outer_ref.view().set("test1", 8).unwrap();
        assert_eq!(ctx.get::<i64>("test1").unwrap(), 7);
        assert_eq!(outer_ref.view().get::<i64>("test1").unwrap(), 8);
    }

    #[test]
    fn missing_field_is_not_accessible() {
        let (outer, _) = cursors();
        let mut ctx = Context::new();
        ctx.add_cursor("outer", &outer);

        assert!(matches!(
            ctx.get::<i64>("test6"),
            Err(Error::FieldNotAccessible { ref field }) if field == "test6"
        ));
        assert!(matches!(
            ctx.set("test5", 1),
            Err(Error::FieldNotAccessible { .. })
        ));
    }

    #[test]
    fn push_and_pop_follow_stack_order() {
        let (outer, inner) = cursors();
        let mut ctx = Context::new();
        assert!(ctx.is_empty());

        ctx.add_cursor("outer", &outer);
        ctx.add_cursor("inner", &inner);
        assert_eq!(ctx.keys().collect::<Vec<_>>(), vec!["outer", "inner"]);

        let popped = ctx.pop_cursor().unwrap();
        assert_eq!(popped.key(), "inner");
        assert_eq!(popped.id(), inner.id());
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.which("test1"), Some("outer"));

        assert_eq!(ctx.pop_cursor().unwrap().key(), "outer");
        assert!(ctx.pop_cursor().is_none());
    }
}
