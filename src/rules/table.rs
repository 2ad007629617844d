//! The transition rule table.

use crate::core::{Condition, NoHooks, StateHooks, StateId, StateRef};
use crate::error::{ConfigError, Result};
use crate::runtime::{Context, Cursor};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_TABLE_ID: AtomicU32 = AtomicU32::new(1);

/// Side effect attached to a rule or to an edge: `(from, to, cursor, ctx)`.
pub type Action = Rc<dyn Fn(StateId, StateId, &mut Cursor, &mut Context) -> Result<()>>;

/// Which side of a state change an edge action runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Edge {
    /// After transient resets, before the destination's `on_enter`.
    Enter,
    /// Before the source's `on_leave` and before any reset.
    Leave,
}

/// One side of an edge action: a specific state or any state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Any,
    State(StateRef),
}

impl From<StateRef> for Endpoint {
    fn from(state: StateRef) -> Self {
        Endpoint::State(state)
    }
}

impl From<StateId> for Endpoint {
    fn from(state: StateId) -> Self {
        Endpoint::State(state.into())
    }
}

impl From<&str> for Endpoint {
    fn from(name: &str) -> Self {
        Endpoint::State(name.into())
    }
}

impl From<String> for Endpoint {
    fn from(name: String) -> Self {
        Endpoint::State(name.into())
    }
}

/// Handle to a declared rule, used to attach rule actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RuleId {
    table: u32,
    index: usize,
}

struct StateEntry {
    id: StateId,
    hooks: Rc<dyn StateHooks>,
}

struct PendingRule {
    source: StateRef,
    destination: StateRef,
    condition: Condition,
    actions: Vec<Action>,
}

struct PendingEdge {
    source: Endpoint,
    destination: Endpoint,
    edge: Edge,
    action: Action,
}

pub(crate) struct Rule {
    pub(crate) condition: Condition,
    pub(crate) actions: Vec<Action>,
}

/// Outgoing rules of one state, grouped by destination in the order each
/// destination was first named.
pub(crate) type Outgoing = Vec<(StateId, Vec<Rule>)>;

pub(crate) struct EdgeAction {
    pub(crate) source: Option<StateId>,
    pub(crate) destination: Option<StateId>,
    pub(crate) edge: Edge,
    pub(crate) action: Action,
}

impl EdgeAction {
    fn matches(&self, edge: Edge, from: StateId, to: StateId) -> bool {
        self.edge == edge
            && self.source.is_none_or(|s| s == from)
            && self.destination.is_none_or(|d| d == to)
    }
}

/// Per-state transition rules and edge actions for a family of states.
///
/// A table is built in two phases. During declaration states are added and
/// rules and actions are registered, naming states either by id or by a
/// name that may not be declared yet. [`finalize`](Self::finalize) then
/// resolves every name and freezes the table; cursors only run on frozen
/// tables.
///
/// # Example
///
/// ```rust
/// use scenery::rules::{Edge, Endpoint, RuleTable};
///
/// let mut table = RuleTable::new();
/// let play = table.declare("Play").unwrap();
///
/// // "Death" does not exist yet; it is resolved at finalize.
/// let died = table
///     .add_condition(play, "Death", |_, cursor, _| Ok(cursor.view().get::<i64>("health")? <= 0))
///     .unwrap();
/// table
///     .add_rule_action(died, |_, _, _, _| {
///         println!("You died");
///         Ok(())
///     })
///     .unwrap();
/// table
///     .add_action(Endpoint::Any, "Death", Edge::Enter, |_, _, _, _| Ok(()))
///     .unwrap();
///
/// table.declare("Death").unwrap();
/// table.finalize().unwrap();
/// assert!(table.is_finalized());
/// ```
pub struct RuleTable {
    id: u32,
    states: Vec<StateEntry>,
    by_name: HashMap<&'static str, StateId>,
    pending_rules: Vec<PendingRule>,
    pending_edges: Vec<PendingEdge>,
    outgoing: Vec<Outgoing>,
    edge_actions: Vec<EdgeAction>,
    finalized: bool,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleTable {
    pub fn new() -> Self {
        Self {
            id: NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed),
            states: Vec::new(),
            by_name: HashMap::new(),
            pending_rules: Vec::new(),
            pending_edges: Vec::new(),
            outgoing: Vec::new(),
            edge_actions: Vec::new(),
            finalized: false,
        }
    }

    fn ensure_open(&self) -> Result<(), ConfigError> {
        if self.finalized {
            Err(ConfigError::AlreadyFinalized)
        } else {
            Ok(())
        }
    }

    /// Declare a state with its hooks.
    pub fn declare_state<H>(&mut self, name: &'static str, hooks: H) -> Result<StateId, ConfigError>
    where
        H: StateHooks + 'static,
    {
        self.ensure_open()?;
        if self.by_name.contains_key(name) {
            return Err(ConfigError::DuplicateState {
                name: name.to_string(),
            });
        }

        let id = StateId::new(self.id, self.states.len(), name);
        self.states.push(StateEntry {
            id,
            hooks: Rc::new(hooks),
        });
        self.by_name.insert(name, id);
        Ok(id)
    }

    /// Declare a state without hooks of its own.
    pub fn declare(&mut self, name: &'static str) -> Result<StateId, ConfigError> {
        self.declare_state(name, NoHooks)
    }

    /// Append a rule: when `predicate` holds for a cursor in `source`, the
    /// cursor moves to `destination`.
    pub fn add_condition<S, D, F>(
        &mut self,
        source: S,
        destination: D,
        predicate: F,
    ) -> Result<RuleId, ConfigError>
    where
        S: Into<StateRef>,
        D: Into<StateRef>,
        F: Fn(StateId, &Cursor, &Context) -> Result<bool> + 'static,
    {
        self.ensure_open()?;
        self.pending_rules.push(PendingRule {
            source: source.into(),
            destination: destination.into(),
            condition: Condition::new(predicate),
            actions: Vec::new(),
        });
        Ok(RuleId {
            table: self.id,
            index: self.pending_rules.len() - 1,
        })
    }

    /// Attach an action that fires when `rule` is the rule that matched,
    /// before the cursor leaves its state.
    pub fn add_rule_action<F>(&mut self, rule: RuleId, action: F) -> Result<(), ConfigError>
    where
        F: Fn(StateId, StateId, &mut Cursor, &mut Context) -> Result<()> + 'static,
    {
        self.ensure_open()?;
        if rule.table != self.id {
            return Err(ConfigError::ForeignRule);
        }
        let pending = self
            .pending_rules
            .get_mut(rule.index)
            .ok_or(ConfigError::ForeignRule)?;
        pending.actions.push(Rc::new(action));
        Ok(())
    }

    /// Attach an action to every state change matching `source → destination`.
    /// Either side may be [`Endpoint::Any`], but not both.
    pub fn add_action<S, D, F>(
        &mut self,
        source: S,
        destination: D,
        edge: Edge,
        action: F,
    ) -> Result<(), ConfigError>
    where
        S: Into<Endpoint>,
        D: Into<Endpoint>,
        F: Fn(StateId, StateId, &mut Cursor, &mut Context) -> Result<()> + 'static,
    {
        self.ensure_open()?;
        let (source, destination) = (source.into(), destination.into());
        if source == Endpoint::Any && destination == Endpoint::Any {
            return Err(ConfigError::WildcardEdge);
        }
        self.pending_edges.push(PendingEdge {
            source,
            destination,
            edge,
            action: Rc::new(action),
        });
        Ok(())
    }

    /// Resolve every state reference and freeze the table.
    ///
    /// All unresolved references are reported together. A table can only be
    /// finalized once.
    pub fn finalize(&mut self) -> Result<(), ConfigError> {
        self.ensure_open()?;
        let references = self
            .pending_rules
            .iter()
            .flat_map(|rule| [&rule.source, &rule.destination])
            .chain(
                self.pending_edges
                    .iter()
                    .flat_map(|edge| [&edge.source, &edge.destination])
                    .filter_map(|endpoint| match endpoint {
                        Endpoint::State(state) => Some(state),
                        Endpoint::Any => None,
                    }),
            );
        super::resolve::check_references(self, references)?;

        let mut outgoing: Vec<Outgoing> = (0..self.states.len()).map(|_| Vec::new()).collect();
        for pending in std::mem::take(&mut self.pending_rules) {
            let source = self.resolve(&pending.source)?;
            let destination = self.resolve(&pending.destination)?;
            let rule = Rule {
                condition: pending.condition,
                actions: pending.actions,
            };

            let rules = &mut outgoing[source.index()];
            match rules.iter_mut().find(|(dest, _)| *dest == destination) {
                Some((_, group)) => group.push(rule),
                None => rules.push((destination, vec![rule])),
            }
        }

        let mut edge_actions = Vec::with_capacity(self.pending_edges.len());
        for pending in std::mem::take(&mut self.pending_edges) {
            edge_actions.push(EdgeAction {
                source: self.resolve_endpoint(&pending.source)?,
                destination: self.resolve_endpoint(&pending.destination)?,
                edge: pending.edge,
                action: pending.action,
            });
        }

        self.outgoing = outgoing;
        self.edge_actions = edge_actions;
        self.finalized = true;
        tracing::info!(
            table = self.id,
            states = self.states.len(),
            edge_actions = self.edge_actions.len(),
            "rule table finalized"
        );
        Ok(())
    }

    pub(crate) fn id(&self) -> u32 {
        self.id
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Resolve a reference to a state declared in this table.
    pub fn resolve(&self, state: &StateRef) -> Result<StateId, ConfigError> {
        match state {
            StateRef::Id(id) if self.owns(*id) => Ok(*id),
            StateRef::Id(id) => Err(ConfigError::ForeignState {
                name: id.name().to_string(),
            }),
            StateRef::Name(name) => {
                self.by_name
                    .get(name.as_str())
                    .copied()
                    .ok_or_else(|| ConfigError::UnresolvedState { name: name.clone() })
            }
        }
    }

    pub(crate) fn resolve_endpoint(&self, endpoint: &Endpoint) -> Result<Option<StateId>, ConfigError> {
        match endpoint {
            Endpoint::Any => Ok(None),
            Endpoint::State(state) => self.resolve(state).map(Some),
        }
    }

    /// Whether `state` was declared by this table.
    pub fn owns(&self, state: StateId) -> bool {
        state.table() == self.id && state.index() < self.states.len()
    }

    pub fn state_named(&self, name: &str) -> Option<StateId> {
        self.by_name.get(name).copied()
    }

    /// Declared states in declaration order.
    pub fn states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.states.iter().map(|entry| entry.id)
    }

    /// Destinations reachable from `state`, in evaluation order. Empty until
    /// the table is finalized.
    pub fn destinations(&self, state: StateId) -> Vec<StateId> {
        self.outgoing_of(state)
            .map(|rules| rules.iter().map(|(dest, _)| *dest).collect())
            .unwrap_or_default()
    }

    fn outgoing_of(&self, state: StateId) -> Option<&Outgoing> {
        if self.owns(state) {
            self.outgoing.get(state.index())
        } else {
            None
        }
    }

    fn hooks(&self, state: StateId) -> Result<Rc<dyn StateHooks>> {
        if !self.owns(state) {
            return Err(ConfigError::ForeignState {
                name: state.name().to_string(),
            }
            .into());
        }
        Ok(Rc::clone(&self.states[state.index()].hooks))
    }

    /// Find the state a cursor in `state` should move to.
    ///
    /// Destinations are tried in the order they were first named and each
    /// destination's conditions in declaration order. The first condition
    /// that holds wins: its rule actions fire immediately and its destination
    /// is returned. When nothing holds the cursor stays in `state`.
    pub fn detect_transition(
        &self,
        state: StateId,
        cursor: &mut Cursor,
        ctx: &mut Context,
    ) -> Result<StateId> {
        let Some(outgoing) = self.outgoing_of(state) else {
            return Ok(state);
        };

        for (destination, rules) in outgoing {
            for rule in rules {
                if rule.condition.check(state, cursor, ctx)? {
                    tracing::trace!(from = %state, to = %destination, "transition condition matched");
                    for action in &rule.actions {
                        action(state, *destination, cursor, ctx)?;
                    }
                    return Ok(*destination);
                }
            }
        }
        Ok(state)
    }

    fn fire_edge_actions(
        &self,
        edge: Edge,
        from: StateId,
        to: StateId,
        cursor: &mut Cursor,
        ctx: &mut Context,
    ) -> Result<()> {
        for edge_action in self.edge_actions.iter().filter(|a| a.matches(edge, from, to)) {
            (edge_action.action)(from, to, cursor, ctx)?;
        }
        Ok(())
    }

    pub(crate) fn update(&self, state: StateId, cursor: &mut Cursor, ctx: &mut Context) -> Result<()> {
        self.hooks(state)?.on_update(cursor, ctx)
    }

    /// LEAVE edge actions for `(state, to)`, then the state's `on_leave`.
    pub(crate) fn leave(
        &self,
        state: StateId,
        to: StateId,
        cursor: &mut Cursor,
        ctx: &mut Context,
    ) -> Result<()> {
        self.fire_edge_actions(Edge::Leave, state, to, cursor, ctx)?;
        self.hooks(state)?.on_leave(cursor, to, ctx)
    }

    /// Transient resets, ENTER edge actions for `(from, state)`, then the
    /// state's `on_enter`. Without a predecessor no edge action fires.
    pub(crate) fn enter(
        &self,
        state: StateId,
        from: Option<StateId>,
        cursor: &mut Cursor,
        ctx: &mut Context,
    ) -> Result<()> {
        let store = cursor.data().clone();
        store.on_transition(cursor, from, state, ctx)?;
        if let Some(from) = from {
            self.fire_edge_actions(Edge::Enter, from, state, cursor, ctx)?;
        }
        self.hooks(state)?.on_enter(cursor, from, ctx)
    }
}

impl fmt::Debug for RuleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleTable")
            .field("id", &self.id)
            .field("states", &self.states.iter().map(|s| s.id).collect::<Vec<_>>())
            .field("finalized", &self.finalized)
            .finish_non_exhaustive()
    }
}
