//! Transition conditions.
//!
//! A condition is the guard half of a transition rule: a predicate over the
//! source state, the cursor being evaluated and the active context. Unlike a
//! pure guard it may read data through the cursor or the context, and any
//! access failure it hits is returned rather than treated as `false`.

use super::state::StateId;
use crate::error::Result;
use crate::runtime::{Context, Cursor};
use std::fmt;
use std::rc::Rc;

type Predicate = dyn Fn(StateId, &Cursor, &Context) -> Result<bool>;

/// Predicate that decides whether a rule fires.
///
/// # Example
///
/// ```rust
/// use scenery::core::Condition;
///
/// let always = Condition::always();
/// let on_one = Condition::new(|_state, cursor, _ctx| Ok(cursor.view().get::<i64>("num")? == 1));
/// # let _ = (always, on_one);
/// ```
#[derive(Clone)]
pub struct Condition {
    predicate: Rc<Predicate>,
}

impl Condition {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(StateId, &Cursor, &Context) -> Result<bool> + 'static,
    {
        Condition {
            predicate: Rc::new(predicate),
        }
    }

    /// Condition that holds on every evaluation.
    pub fn always() -> Self {
        Self::new(|_, _, _| Ok(true))
    }

    /// Evaluate the condition for a cursor sitting in `state`.
    pub fn check(&self, state: StateId, cursor: &Cursor, ctx: &Context) -> Result<bool> {
        (self.predicate)(state, cursor, ctx)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition").finish_non_exhaustive()
    }
}
