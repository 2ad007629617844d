//! The scoped data store.

use super::access::{Factory, Scope};
use super::record::{FieldDecl, Record};
use crate::core::StateId;
use crate::error::{ConfigError, Error, Result};
use crate::rules::RuleTable;
use serde_json::Value;
use std::collections::HashMap;

/// Immutable description of one field, fixed when the store is built.
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    name: &'static str,
    type_name: &'static str,
    default: Value,
    scope: Scope,
}

impl FieldDescriptor {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn default(&self) -> &Value {
        &self.default
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Values of the same JSON kind as the default are accepted, as is
    /// `null` on either side. Numbers for a primitive integer field must
    /// also be integers within that type's range. Deeper structure is not
    /// checked, so a typed `get` can still fail on nested data.
    fn accepts(&self, value: &Value) -> bool {
        if self.default.is_null() || value.is_null() {
            return true;
        }
        kind(&self.default) == kind(value) && fits_integer(self.type_name, value)
    }

    fn check(&self, value: &Value) -> Result<()> {
        if self.accepts(value) {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                field: self.name.to_string(),
                expected: self.type_name.to_string(),
                found: kind(value).to_string(),
            })
        }
    }
}

fn integer_range(type_name: &str) -> Option<(i128, i128)> {
    let range = match type_name {
        "i8" => (i8::MIN as i128, i8::MAX as i128),
        "i16" => (i16::MIN as i128, i16::MAX as i128),
        "i32" => (i32::MIN as i128, i32::MAX as i128),
        "i64" => (i64::MIN as i128, i64::MAX as i128),
        "isize" => (isize::MIN as i128, isize::MAX as i128),
        "u8" => (0, u8::MAX as i128),
        "u16" => (0, u16::MAX as i128),
        "u32" => (0, u32::MAX as i128),
        "u64" => (0, u64::MAX as i128),
        "usize" => (0, usize::MAX as i128),
        _ => return None,
    };
    Some(range)
}

fn fits_integer(type_name: &str, value: &Value) -> bool {
    let (Value::Number(n), Some((min, max))) = (value, integer_range(type_name)) else {
        return true;
    };
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
        .is_some_and(|v| (min..=max).contains(&v))
}

pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A transient field due for reset, captured so the store can be released
/// while its factory runs.
pub(crate) struct PendingReset {
    pub(crate) slot: usize,
    pub(crate) name: &'static str,
    pub(crate) default: Value,
    pub(crate) factory: Option<Factory>,
}

/// One live record plus the descriptors guarding its fields.
///
/// Every read and write names the state it is made from; the store refuses
/// fields whose scope does not cover that state.
///
/// # Example
///
/// ```rust
/// use scenery::record;
/// use scenery::rules::RuleTable;
/// use scenery::store::{Access, DataStore};
///
/// record! {
///     struct Data {
///         hits: i64 = 0 => Access::static_in(["Play"]),
///     }
/// }
///
/// let mut table = RuleTable::new();
/// let play = table.declare("Play").unwrap();
/// let menu = table.declare("Menu").unwrap();
///
/// let mut store = DataStore::new::<Data>(&table).unwrap();
/// store.write("hits", play, 3.into()).unwrap();
/// assert_eq!(store.read("hits", play).unwrap(), &serde_json::json!(3));
/// assert!(store.read("hits", menu).is_err());
/// ```
#[derive(Clone, Debug)]
pub struct DataStore {
    descriptors: Vec<FieldDescriptor>,
    values: Vec<Value>,
    index: HashMap<&'static str, usize>,
    transients: HashMap<StateId, Vec<usize>>,
    table: u32,
}

impl DataStore {
    /// Build a store for record type `R`, resolving its scopes against
    /// `table`.
    pub fn new<R: Record>(table: &RuleTable) -> Result<Self, ConfigError> {
        Self::from_fields(R::fields(), table)
    }

    /// Build a store from explicit field declarations.
    pub fn from_fields(fields: Vec<FieldDecl>, table: &RuleTable) -> Result<Self, ConfigError> {
        let mut store = DataStore {
            descriptors: Vec::with_capacity(fields.len()),
            values: Vec::with_capacity(fields.len()),
            index: HashMap::with_capacity(fields.len()),
            transients: HashMap::new(),
            table: table.id(),
        };

        for decl in fields {
            let default = match decl.default {
                Some(Ok(default)) => default,
                Some(Err(reason)) => {
                    return Err(ConfigError::InvalidDefault {
                        field: decl.name.to_string(),
                        reason,
                    })
                }
                None => {
                    return Err(ConfigError::MissingDefault {
                        field: decl.name.to_string(),
                    })
                }
            };
            let access = decl.access.ok_or_else(|| ConfigError::MissingAccess {
                field: decl.name.to_string(),
            })?;
            let scope = access.resolve(table)?;

            let slot = store.descriptors.len();
            if store.index.insert(decl.name, slot).is_some() {
                return Err(ConfigError::DuplicateField {
                    field: decl.name.to_string(),
                });
            }
            if let Scope::Transient { states, .. } = &scope {
                for state in states {
                    store.transients.entry(*state).or_default().push(slot);
                }
            }

            store.values.push(default.clone());
            store.descriptors.push(FieldDescriptor {
                name: decl.name,
                type_name: decl.type_name,
                default,
                scope,
            });
        }

        Ok(store)
    }

    pub fn descriptor(&self, field: &str) -> Option<&FieldDescriptor> {
        self.index.get(field).map(|&slot| &self.descriptors[slot])
    }

    /// Descriptors in declaration order.
    pub fn descriptors(&self) -> &[FieldDescriptor] {
        &self.descriptors
    }

    /// Whether `field` exists and is visible from `state`.
    pub fn allows(&self, field: &str, state: StateId) -> bool {
        self.descriptor(field)
            .is_some_and(|d| d.scope.covers(state))
    }

    fn slot(&self, field: &str, state: StateId) -> Result<usize> {
        let slot = *self.index.get(field).ok_or_else(|| Error::UnknownField {
            field: field.to_string(),
        })?;
        if !self.descriptors[slot].scope.covers(state) {
            return Err(Error::AccessDenied {
                field: field.to_string(),
                state: state.name().to_string(),
            });
        }
        Ok(slot)
    }

    pub fn read(&self, field: &str, state: StateId) -> Result<&Value> {
        let slot = self.slot(field, state)?;
        Ok(&self.values[slot])
    }

    pub fn write(&mut self, field: &str, state: StateId, value: Value) -> Result<()> {
        let slot = self.slot(field, state)?;
        self.descriptors[slot].check(&value)?;
        self.values[slot] = value;
        Ok(())
    }

    /// Whether this store's scopes were resolved against `table`.
    pub fn is_bound_to(&self, table: &RuleTable) -> bool {
        self.table == table.id()
    }

    /// Transient fields scoped to `state`, in declaration order.
    pub(crate) fn pending_resets(&self, state: StateId) -> Vec<PendingReset> {
        self.transients
            .get(&state)
            .into_iter()
            .flatten()
            .map(|&slot| {
                let descriptor = &self.descriptors[slot];
                PendingReset {
                    slot,
                    name: descriptor.name,
                    default: descriptor.default.clone(),
                    factory: descriptor.scope.factory().cloned(),
                }
            })
            .collect()
    }

    /// Store a reset value, holding factory output to the same type
    /// discipline as `write`.
    pub(crate) fn reset_slot(&mut self, slot: usize, value: Value) -> Result<()> {
        self.descriptors[slot].check(&value)?;
        self.values[slot] = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;
    use crate::store::Access;
    use serde_json::json;

    record! {
        struct Data {
            name: String = "anon".to_string() => Access::global(),
            scores: Vec<i64> = vec![1, 2] => Access::static_in(["A", "B"]),
            health: i64 = 100 => Access::transient(["A"]),
            maybe: Option<i64> = None => Access::global(),
        }
    }

    fn setup() -> (DataStore, StateId, StateId, StateId) {
        let mut table = RuleTable::new();
        let a = table.declare("A").unwrap();
        let b = table.declare("B").unwrap();
        let c = table.declare("C").unwrap();
        (DataStore::new::<Data>(&table).unwrap(), a, b, c)
    }

    #[test]
    fn defaults_are_copied_into_the_record() {
        let (store, a, _, _) = setup();
        assert_eq!(store.read("name", a).unwrap(), &json!("anon"));
        assert_eq!(store.read("scores", a).unwrap(), &json!([1, 2]));
        assert_eq!(store.read("health", a).unwrap(), &json!(100));
        assert_eq!(store.descriptors().len(), 4);
    }

    #[test]
    fn global_fields_are_open_to_every_state() {
        let (mut store, a, b, c) = setup();
        for state in [a, b, c] {
            store.write("name", state, json!(state.name())).unwrap();
            assert_eq!(store.read("name", state).unwrap(), &json!(state.name()));
        }
    }

    #[test]
    fn static_fields_deny_other_states() {
        let (mut store, a, b, c) = setup();
        store.write("scores", a, json!([9])).unwrap();
        assert_eq!(store.read("scores", b).unwrap(), &json!([9]));

        let err = store.read("scores", c).unwrap_err();
        assert!(matches!(
            err,
            Error::AccessDenied { ref field, ref state } if field == "scores" && state == "C"
        ));
        assert!(store.write("scores", c, json!([])).is_err());
        assert!(!store.allows("scores", c));
        assert!(store.allows("scores", a));
    }

    #[test]
    fn unknown_field_is_reported() {
        let (store, a, _, _) = setup();
        assert!(matches!(
            store.read("mana", a),
            Err(Error::UnknownField { ref field }) if field == "mana"
        ));
        assert!(!store.allows("mana", a));
    }

    #[test]
    fn write_rejects_a_different_kind() {
        let (mut store, a, _, _) = setup();
        let err = store.write("health", a, json!("lots")).unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch { ref expected, ref found, .. } if expected == "i64" && found == "string"
        ));
        assert_eq!(store.read("health", a).unwrap(), &json!(100));
    }

    #[test]
    fn integer_fields_reject_fractions_and_out_of_range_values() {
        let mut table = RuleTable::new();
        let a = table.declare("A").unwrap();
        let fields = vec![
            FieldDecl::new("signed").default_value(0i64).access(Access::global()),
            FieldDecl::new("small").default_value(0u8).access(Access::global()),
            FieldDecl::new("ratio").default_value(0.5f64).access(Access::global()),
        ];
        let mut store = DataStore::from_fields(fields, &table).unwrap();

        assert!(store.write("signed", a, json!(-3)).is_ok());
        assert!(matches!(
            store.write("signed", a, json!(1.5)),
            Err(Error::TypeMismatch { ref expected, .. }) if expected == "i64"
        ));
        assert!(store.write("small", a, json!(255)).is_ok());
        assert!(store.write("small", a, json!(256)).is_err());
        assert!(store.write("small", a, json!(-1)).is_err());
        assert!(store.write("ratio", a, json!(2)).is_ok());
        assert!(store.write("ratio", a, json!(-0.25)).is_ok());
        assert_eq!(store.read("small", a).unwrap(), &json!(255));
    }

    #[test]
    fn unserializable_default_is_reported_as_invalid() {
        let table = RuleTable::new();
        let mut keyed = std::collections::BTreeMap::new();
        keyed.insert(vec![1u8], 1);

        let fields = vec![FieldDecl::new("keyed").default_value(keyed).access(Access::global())];
        assert!(matches!(
            DataStore::from_fields(fields, &table).unwrap_err(),
            ConfigError::InvalidDefault { ref field, .. } if field == "keyed"
        ));
    }

    #[test]
    fn store_remembers_its_table() {
        let mut table = RuleTable::new();
        table.declare("A").unwrap();
        let other = RuleTable::new();

        let store = DataStore::from_fields(
            vec![FieldDecl::new("x").default_value(1).access(Access::global())],
            &table,
        )
        .unwrap();
        assert!(store.is_bound_to(&table));
        assert!(!store.is_bound_to(&other));
    }

    #[test]
    fn null_defaults_accept_any_value() {
        let (mut store, a, _, _) = setup();
        store.write("maybe", a, json!(5)).unwrap();
        store.write("maybe", a, Value::Null).unwrap();
    }

    #[test]
    fn pending_resets_only_cover_transient_states() {
        let (store, a, b, _) = setup();
        let resets = store.pending_resets(a);
        assert_eq!(resets.len(), 1);
        assert_eq!(resets[0].name, "health");
        assert_eq!(resets[0].default, json!(100));
        assert!(resets[0].factory.is_none());
        assert!(store.pending_resets(b).is_empty());
    }

    #[test]
    fn missing_default_or_access_is_a_configuration_error() {
        let table = RuleTable::new();

        let no_default = vec![FieldDecl::new("x").access(Access::global())];
        assert_eq!(
            DataStore::from_fields(no_default, &table).unwrap_err(),
            ConfigError::MissingDefault {
                field: "x".to_string()
            }
        );

        let no_access = vec![FieldDecl::new("y").default_value(1)];
        assert_eq!(
            DataStore::from_fields(no_access, &table).unwrap_err(),
            ConfigError::MissingAccess {
                field: "y".to_string()
            }
        );
    }

    #[test]
    fn duplicate_fields_are_rejected() {
        let table = RuleTable::new();
        let fields = vec![
            FieldDecl::new("x").default_value(1).access(Access::global()),
            FieldDecl::new("x").default_value(2).access(Access::global()),
        ];
        assert_eq!(
            DataStore::from_fields(fields, &table).unwrap_err(),
            ConfigError::DuplicateField {
                field: "x".to_string()
            }
        );
    }
}
