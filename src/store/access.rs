//! Field access scopes.
//!
//! [`Access`] is what a record declares: scopes name their states by
//! [`StateRef`], so a record can be written before the states exist.
//! [`Scope`] is the resolved form a [`DataStore`](super::DataStore) keeps.

use crate::core::{StateId, StateRef};
use crate::error::{ConfigError, Result};
use crate::rules::RuleTable;
use crate::runtime::{Context, Cursor};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// Produces the value a transient field is reset to.
pub type Factory = Rc<dyn Fn(&Cursor, StateId, &Context) -> Result<Value>>;

/// Declared access scope of a field.
///
/// # Example
///
/// ```rust
/// use scenery::store::Access;
///
/// let name = Access::global();
/// let scores = Access::static_in(["Play", "Leaderboard"]);
/// let health = Access::transient(["Play"]);
/// let started = Access::transient_with(["Play", "Death"], |_cursor, _state, _ctx| Ok(42_u64));
/// # let _ = (name, scores, health, started);
/// ```
#[derive(Clone)]
pub enum Access {
    /// Readable and writable from any state.
    Global,
    /// Readable and writable only from the listed states. The value persists
    /// across transitions.
    Static(Vec<StateRef>),
    /// Like `Static`, but reset whenever a transition leaves or enters one of
    /// the listed states.
    Transient {
        states: Vec<StateRef>,
        factory: Option<Factory>,
    },
}

impl Access {
    pub fn global() -> Self {
        Access::Global
    }

    pub fn static_in<I, R>(states: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<StateRef>,
    {
        Access::Static(states.into_iter().map(Into::into).collect())
    }

    /// Transient field reset to a fresh copy of its default.
    pub fn transient<I, R>(states: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<StateRef>,
    {
        Access::Transient {
            states: states.into_iter().map(Into::into).collect(),
            factory: None,
        }
    }

    /// Transient field reset to whatever `factory` returns for the state
    /// being left or entered.
    pub fn transient_with<I, R, F, T>(states: I, factory: F) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<StateRef>,
        F: Fn(&Cursor, StateId, &Context) -> Result<T> + 'static,
        T: Serialize,
    {
        let factory: Factory = Rc::new(
            move |cursor: &Cursor, state: StateId, ctx: &Context| -> Result<Value> {
                Ok(serde_json::to_value(factory(cursor, state, ctx)?)?)
            },
        );
        Access::Transient {
            states: states.into_iter().map(Into::into).collect(),
            factory: Some(factory),
        }
    }

    /// Resolve state references against `table`.
    pub(crate) fn resolve(&self, table: &RuleTable) -> Result<Scope, ConfigError> {
        let resolve_all = |states: &[StateRef]| -> Result<HashSet<StateId>, ConfigError> {
            states.iter().map(|s| table.resolve(s)).collect()
        };

        Ok(match self {
            Access::Global => Scope::Global,
            Access::Static(states) => Scope::Static(resolve_all(states)?),
            Access::Transient { states, factory } => Scope::Transient {
                states: resolve_all(states)?,
                factory: factory.clone(),
            },
        })
    }
}

impl fmt::Debug for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Global => f.write_str("Global"),
            Access::Static(states) => f.debug_tuple("Static").field(states).finish(),
            Access::Transient { states, factory } => f
                .debug_struct("Transient")
                .field("states", states)
                .field("factory", &factory.is_some())
                .finish(),
        }
    }
}

/// Access scope with every state resolved.
#[derive(Clone)]
pub enum Scope {
    Global,
    Static(HashSet<StateId>),
    Transient {
        states: HashSet<StateId>,
        factory: Option<Factory>,
    },
}

impl Scope {
    /// Whether a cursor in `state` may read and write the field.
    pub fn covers(&self, state: StateId) -> bool {
        match self {
            Scope::Global => true,
            Scope::Static(states) | Scope::Transient { states, .. } => states.contains(&state),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Scope::Transient { .. })
    }

    /// States the scope is restricted to; `None` for global fields.
    pub fn states(&self) -> Option<&HashSet<StateId>> {
        match self {
            Scope::Global => None,
            Scope::Static(states) | Scope::Transient { states, .. } => Some(states),
        }
    }

    pub(crate) fn factory(&self) -> Option<&Factory> {
        match self {
            Scope::Transient { factory, .. } => factory.as_ref(),
            _ => None,
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => f.write_str("Global"),
            Scope::Static(states) => f.debug_tuple("Static").field(states).finish(),
            Scope::Transient { states, factory } => f
                .debug_struct("Transient")
                .field("states", states)
                .field("factory", &factory.is_some())
                .finish(),
        }
    }
}
