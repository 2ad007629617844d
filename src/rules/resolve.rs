//! Reference checking for `finalize`.
//!
//! Every state named by a pending rule or edge action is checked, and all
//! failures are accumulated with `Validation` rather than stopping at the
//! first one, so a table with several typos reports all of them at once.

use super::table::RuleTable;
use crate::core::StateRef;
use crate::error::ConfigError;
use std::collections::HashSet;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<ConfigError>>;

fn check_one(table: &RuleTable, state: &StateRef) -> Check {
    match table.resolve(state) {
        Ok(_) => Validation::success(()),
        Err(err) => Validation::fail(err),
    }
}

/// Check that every reference resolves against `table`. Each distinct
/// reference is reported once; a single failure is returned as-is and
/// several are wrapped in [`ConfigError::Unresolved`].
pub(crate) fn check_references<'a, I>(table: &RuleTable, references: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = &'a StateRef>,
{
    let mut seen = HashSet::new();
    let checks: Vec<Check> = references
        .into_iter()
        .filter(|state| seen.insert(*state))
        .map(|state| check_one(table, state))
        .collect();

    match Validation::all_vec(checks) {
        Validation::Success(_) => Ok(()),
        Validation::Failure(errors) => {
            let mut errors: Vec<ConfigError> = errors.iter().cloned().collect();
            if errors.len() == 1 {
                Err(errors.remove(0))
            } else {
                Err(ConfigError::Unresolved(errors))
            }
        }
    }
}
