//! Cursors: running instances of a state machine.

use super::context::Context;
use crate::core::{StateHistory, StateId, TransitionRecord};
use crate::error::{ConfigError, Result};
use crate::rules::RuleTable;
use crate::store::{DataStore, Record, ScopedView, StoreHandle};
use chrono::Utc;
use std::cell::Cell;
use std::ops::ControlFlow;
use std::rc::Rc;
use uuid::Uuid;

/// One running state machine: a current state, the data it owns and the
/// child machines it drives.
///
/// Each tick a cursor runs its state's `on_update`, then updates every child
/// in order, then evaluates its own transition rules. Children share the
/// context of their parent, so they can resolve fields owned by any
/// ancestor.
///
/// # Example
///
/// ```rust
/// use scenery::core::HookFns;
/// use scenery::record;
/// use scenery::rules::RuleTable;
/// use scenery::runtime::Cursor;
/// use scenery::store::Access;
/// use std::rc::Rc;
///
/// record! {
///     struct Counter { num: i64 = 0 => Access::global() }
/// }
///
/// let mut table = RuleTable::new();
/// let counting = table
///     .declare_state(
///         "Counting",
///         HookFns::new().on_update(|cursor, _| cursor.view().modify("num", |n: i64| n + 1)),
///     )
///     .unwrap();
/// let done = table.declare("Done").unwrap();
/// table
///     .add_condition(counting, done, |_, cursor, _| Ok(cursor.view().get::<i64>("num")? >= 3))
///     .unwrap();
/// table.finalize().unwrap();
///
/// let mut cursor = Cursor::new::<Counter>("counter", Rc::new(table), counting).unwrap();
/// cursor.run_for(3).unwrap();
/// assert_eq!(cursor.state(), done);
/// assert_eq!(cursor.history().path(), vec![counting, done]);
/// ```
pub struct Cursor {
    id: Uuid,
    key: String,
    table: Rc<RuleTable>,
    store: StoreHandle,
    state: Rc<Cell<StateId>>,
    children: Vec<Cursor>,
    history: StateHistory,
    ticks: u64,
}

impl Cursor {
    /// Build a cursor for record `R` and enter `start` outside of any tick.
    pub fn new<R: Record>(key: &str, table: Rc<RuleTable>, start: StateId) -> Result<Self> {
        Self::new_in::<R>(key, table, start, &mut Context::new())
    }

    /// Build a cursor for record `R` while `ctx` is active, typically from a
    /// hook that spawns a child machine.
    pub fn new_in<R: Record>(
        key: &str,
        table: Rc<RuleTable>,
        start: StateId,
        ctx: &mut Context,
    ) -> Result<Self> {
        let store = DataStore::new::<R>(&table)?;
        Self::with_store(key, table, store, start, ctx)
    }

    /// Build a cursor around an existing store. The store must have been
    /// built against `table`.
    ///
    /// The start state is entered immediately with no predecessor: its
    /// transients are reset and its `on_enter` runs, with the new cursor
    /// pushed on `ctx` for the duration.
    pub fn with_store(
        key: &str,
        table: Rc<RuleTable>,
        store: DataStore,
        start: StateId,
        ctx: &mut Context,
    ) -> Result<Self> {
        if !table.is_finalized() {
            return Err(ConfigError::NotFinalized.into());
        }
        if !store.is_bound_to(&table) {
            return Err(ConfigError::ForeignStore.into());
        }
        if !table.owns(start) {
            return Err(ConfigError::ForeignState {
                name: start.name().to_string(),
            }
            .into());
        }

        let mut cursor = Cursor {
            id: Uuid::new_v4(),
            key: key.to_string(),
            table: Rc::clone(&table),
            store: StoreHandle::new(store),
            state: Rc::new(Cell::new(start)),
            children: Vec::new(),
            history: StateHistory::new(),
            ticks: 0,
        };

        tracing::debug!(cursor = %cursor.key, id = %cursor.id, state = %start, "cursor created");
        ctx.add_cursor(cursor.key.clone(), &cursor);
        let entered = table.enter(start, None, &mut cursor, ctx);
        ctx.pop_cursor();
        entered?;
        Ok(cursor)
    }

    /// Attach a child, builder style.
    pub fn with_child(mut self, child: Cursor) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history = StateHistory::with_limit(limit);
        self
    }

    /// Attach a child. Children added during a state's `on_update` are
    /// updated in the same tick.
    pub fn push_child(&mut self, child: Cursor) {
        self.children.push(child);
    }

    /// Detach every child for which `keep` returns false.
    pub fn retain_children<F>(&mut self, keep: F)
    where
        F: FnMut(&Cursor) -> bool,
    {
        self.children.retain(keep);
    }

    pub fn children(&self) -> &[Cursor] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Cursor] {
        &mut self.children
    }

    /// First child with the given key.
    pub fn child(&self, key: &str) -> Option<&Cursor> {
        self.children.iter().find(|c| c.key == key)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn state(&self) -> StateId {
        self.state.get()
    }

    pub(crate) fn state_cell(&self) -> Rc<Cell<StateId>> {
        Rc::clone(&self.state)
    }

    pub fn table(&self) -> &Rc<RuleTable> {
        &self.table
    }

    pub fn data(&self) -> &StoreHandle {
        &self.store
    }

    /// View of this cursor's store under its current state.
    pub fn view(&self) -> ScopedView {
        self.store.scoped_view(self.state())
    }

    /// View of this cursor's store under an arbitrary state.
    pub fn view_as(&self, state: StateId) -> ScopedView {
        self.store.scoped_view(state)
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    /// Ticks completed by this cursor.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one tick of this cursor and its subtree inside `ctx`.
    ///
    /// The cursor is on the context stack for the whole tick and popped even
    /// when the tick fails. Errors are returned as raised; whatever ran
    /// before the failure stays applied.
    pub fn update(&mut self, ctx: &mut Context) -> Result<()> {
        ctx.add_cursor(self.key.clone(), self);
        let result = self.step(ctx);
        ctx.pop_cursor();
        result
    }

    fn step(&mut self, ctx: &mut Context) -> Result<()> {
        let table = Rc::clone(&self.table);
        let current = self.state();

        table.update(current, self, ctx)?;
        for child in &mut self.children {
            child.update(ctx)?;
        }

        let next = table.detect_transition(current, self, ctx)?;
        if next != current {
            self.transition(&table, current, next, ctx)?;
        }
        self.ticks += 1;
        Ok(())
    }

    fn transition(
        &mut self,
        table: &RuleTable,
        from: StateId,
        to: StateId,
        ctx: &mut Context,
    ) -> Result<()> {
        table.leave(from, to, self, ctx)?;
        self.state.set(to);
        tracing::debug!(cursor = %self.key, %from, %to, tick = self.ticks, "state transition");
        table.enter(to, Some(from), self, ctx)?;
        self.history.record(TransitionRecord {
            from,
            to,
            timestamp: Utc::now(),
            tick: self.ticks,
        });
        Ok(())
    }

    /// Run one tick with a fresh context, as the root of a tree.
    pub fn tick(&mut self) -> Result<()> {
        self.update(&mut Context::new())
    }

    pub fn run_for(&mut self, ticks: u64) -> Result<()> {
        for _ in 0..ticks {
            self.tick()?;
        }
        Ok(())
    }

    /// Drive the cursor from an external loop.
    ///
    /// Ticks once, then hands the cursor to `after_tick` (where a driver
    /// would redraw, collect input or sleep) until it returns `Break`.
    pub fn run<F>(&mut self, mut after_tick: F) -> Result<()>
    where
        F: FnMut(&mut Cursor) -> Result<ControlFlow<()>>,
    {
        loop {
            self.tick()?;
            if after_tick(self)?.is_break() {
                return Ok(());
            }
        }
    }
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("key", &self.key)
            .field("id", &self.id)
            .field("state", &self.state())
            .field("children", &self.children)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}
