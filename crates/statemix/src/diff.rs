#![forbid(unsafe_code)]

//! Change detection over an ordered list of observed keys.
//!
//! # Invariants
//!
//! 1. Changes are yielded in the order of the observed list, duplicates
//!    included.
//! 2. A key is reported iff its old and new values are not
//!    [strictly equal](Value::strict_eq). Absent keys read as `Undefined`.
//! 3. Keys outside the observed list are never reported.
//!
//! The iterator is lazy: a consumer that stops early (for example because a
//! callback failed) never evaluates the remaining keys.

use std::rc::Rc;

use crate::map::StateMap;
use crate::value::Value;

/// One observed key whose value changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateChange<'a> {
    pub name: &'a str,
    pub old: &'a Value,
    pub new: &'a Value,
}

/// Changes between two records, restricted to `observed` and in its order.
pub fn changes<'a, S>(
    old: &'a StateMap,
    new: &'a StateMap,
    observed: &'a [S],
) -> impl Iterator<Item = StateChange<'a>>
where
    S: AsRef<str>,
{
    observed.iter().filter_map(move |name| {
        let name = name.as_ref();
        let (old, new) = (old.value(name), new.value(name));
        (!old.strict_eq(new)).then_some(StateChange { name, old, new })
    })
}

/// The records on either side of one accepted `set_state` call.
#[derive(Debug, Clone)]
pub struct Transition {
    pub old: Rc<StateMap>,
    pub new: Rc<StateMap>,
}

impl Transition {
    /// Changes restricted to `observed`, in its order.
    pub fn changes<'a, S: AsRef<str>>(
        &'a self,
        observed: &'a [S],
    ) -> impl Iterator<Item = StateChange<'a>> {
        changes(&self.old, &self.new, observed)
    }

    /// Feed each observed change to `notify`, stopping at the first error.
    pub fn dispatch<S, E>(
        &self,
        observed: &[S],
        mut notify: impl FnMut(StateChange<'_>) -> Result<(), E>,
    ) -> Result<(), E>
    where
        S: AsRef<str>,
    {
        for change in self.changes(observed) {
            #[cfg(feature = "tracing")]
            tracing::debug!(message = "state.changed", key = change.name);
            notify(change)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
