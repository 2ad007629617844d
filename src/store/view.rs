//! Shared store handles and state-bound accessors.

use super::data::{DataStore, FieldDescriptor};
use crate::core::StateId;
use crate::error::{Error, Result};
use crate::runtime::{Context, Cursor};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle to the data store a cursor owns.
///
/// The context keeps clones of these for every active cursor so that any
/// code running during a tick can reach data owned further up the tree.
/// Borrows of the underlying store never outlive a single call, so handles
/// can be used freely from hooks, conditions and factories.
#[derive(Clone, Debug)]
pub struct StoreHandle(Rc<RefCell<DataStore>>);

impl StoreHandle {
    pub fn new(store: DataStore) -> Self {
        Self(Rc::new(RefCell::new(store)))
    }

    /// Accessor that checks every read and write against `state`.
    pub fn scoped_view(&self, state: StateId) -> ScopedView {
        ScopedView {
            store: self.clone(),
            state,
        }
    }

    pub fn allows(&self, field: &str, state: StateId) -> bool {
        self.0.borrow().allows(field, state)
    }

    pub fn descriptor(&self, field: &str) -> Option<FieldDescriptor> {
        self.0.borrow().descriptor(field).cloned()
    }

    pub fn read_value(&self, field: &str, state: StateId) -> Result<Value> {
        self.0.borrow().read(field, state).cloned()
    }

    pub fn write_value(&self, field: &str, state: StateId, value: Value) -> Result<()> {
        self.0.borrow_mut().write(field, state, value)
    }

    /// Reset every transient field scoped to `state`, to its factory's value
    /// when it has one and to a fresh copy of its default otherwise.
    ///
    /// Fields are reset one at a time with the store released in between, so
    /// factories may read other fields, including through `ctx`.
    pub fn reset_transients(&self, cursor: &Cursor, state: StateId, ctx: &Context) -> Result<()> {
        let pending = self.0.borrow().pending_resets(state);
        for reset in pending {
            let value = match &reset.factory {
                Some(factory) => factory(cursor, state, ctx)?,
                None => reset.default,
            };
            tracing::trace!(field = reset.name, state = %state, ?value, "reset transient field");
            self.0.borrow_mut().reset_slot(reset.slot, value)?;
        }
        Ok(())
    }

    /// Reset transients for the state being left, then for the state being
    /// entered. A field transient for both is reset twice.
    pub fn on_transition(
        &self,
        cursor: &Cursor,
        leaving: Option<StateId>,
        entering: StateId,
        ctx: &Context,
    ) -> Result<()> {
        if let Some(leaving) = leaving {
            self.reset_transients(cursor, leaving, ctx)?;
        }
        self.reset_transients(cursor, entering, ctx)
    }

    pub fn ptr_eq(&self, other: &StoreHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Accessor bound to one state of one store.
///
/// Views hold no data of their own and are cheap to create on demand.
#[derive(Clone, Debug)]
pub struct ScopedView {
    store: StoreHandle,
    state: StateId,
}

impl ScopedView {
    pub fn state(&self) -> StateId {
        self.state
    }

    pub fn allows(&self, field: &str) -> bool {
        self.store.allows(field, self.state)
    }

    pub fn get_value(&self, field: &str) -> Result<Value> {
        self.store.read_value(field, self.state)
    }

    pub fn set_value(&self, field: &str, value: Value) -> Result<()> {
        self.store.write_value(field, self.state, value)
    }

    /// Read a field as `T`.
    pub fn get<T: DeserializeOwned>(&self, field: &str) -> Result<T> {
        let value = self.get_value(field)?;
        let found = super::data::kind(&value);
        serde_json::from_value(value).map_err(|_| Error::TypeMismatch {
            field: field.to_string(),
            expected: std::any::type_name::<T>().to_string(),
            found: found.to_string(),
        })
    }

    pub fn set<T: Serialize>(&self, field: &str, value: T) -> Result<()> {
        self.set_value(field, serde_json::to_value(value)?)
    }

    /// Read, transform and write back a field.
    pub fn modify<T, F>(&self, field: &str, f: F) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(T) -> T,
    {
        let current = self.get(field)?;
        self.set(field, f(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;
    use crate::rules::RuleTable;
    use crate::store::Access;

    record! {
        struct Data {
            num: i64 = 0 => Access::global(),
            secret: String = "s".to_string() => Access::static_in(["A"]),
        }
    }

    fn setup() -> (StoreHandle, StateId, StateId) {
        let mut table = RuleTable::new();
        let a = table.declare("A").unwrap();
        let b = table.declare("B").unwrap();
        let store = DataStore::new::<Data>(&table).unwrap();
        (StoreHandle::new(store), a, b)
    }

    #[test]
    fn views_share_the_same_record() {
        let (handle, a, b) = setup();
        let view_a = handle.scoped_view(a);
        let view_b = handle.scoped_view(b);

        view_a.set("num", 7).unwrap();
        assert_eq!(view_b.get::<i64>("num").unwrap(), 7);
        assert!(handle.clone().ptr_eq(&handle));
    }

    #[test]
    fn view_enforces_its_state_scope() {
        let (handle, a, b) = setup();
        assert_eq!(handle.scoped_view(a).get::<String>("secret").unwrap(), "s");
        assert!(matches!(
            handle.scoped_view(b).get::<String>("secret"),
            Err(Error::AccessDenied { .. })
        ));
        assert!(!handle.scoped_view(b).allows("secret"));
    }

    #[test]
    fn typed_read_reports_mismatch() {
        let (handle, a, _) = setup();
        assert!(matches!(
            handle.scoped_view(a).get::<String>("num"),
            Err(Error::TypeMismatch { ref found, .. }) if found == "number"
        ));
    }

    #[test]
    fn modify_reads_and_writes_back() {
        let (handle, a, _) = setup();
        let view = handle.scoped_view(a);
        view.modify("num", |n: i64| n + 5).unwrap();
        view.modify("num", |n: i64| n * 2).unwrap();
        assert_eq!(view.get::<i64>("num").unwrap(), 10);
    }
}
