#![forbid(unsafe_code)]

//! Per-instance storage for the private state record.
//!
//! A [`StateSlot`] is embedded as a field in a type that implements
//! [`UseState`](crate::UseState), or kept in a side table for runtime
//! instances. The record is only reachable through `get`/`merge`; `Debug`
//! shows how many keys it holds, not what they are.
//!
//! # State transitions
//!
//! ```text
//!  ┌───────────────┐  first get/merge  ┌──────────────────────┐
//!  │ Uninitialized ├──────────────────▶│ Initialized (N keys) │◀─┐
//!  └───────────────┘                   └──────────┬───────────┘  │
//!                                                 │  merge       │
//!                                                 └──────────────┘
//! ```
//!
//! # Invariants
//!
//! 1. `get` never fails; the first access installs an empty record.
//! 2. `merge` replaces the record with a new allocation. The previous record
//!    is returned in the [`Transition`] and is never mutated.
//! 3. No `RefCell` borrow outlives a method call, so callbacks may re-enter.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::diff::Transition;
use crate::map::StateMap;
use crate::value::Value;

#[derive(Default)]
pub struct StateSlot {
    record: RefCell<Option<Rc<StateMap>>>,
}

impl StateSlot {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            record: RefCell::new(None),
        }
    }

    /// Whether the record has been created yet.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.record.borrow().is_some()
    }

    /// Current record, creating an empty one on first access.
    ///
    /// Calls without an intervening accepted merge return the same `Rc`.
    #[must_use]
    pub fn get(&self) -> Rc<StateMap> {
        let mut record = self.record.borrow_mut();
        Rc::clone(record.get_or_insert_with(Rc::default))
    }

    /// Shallow-merge `partial` into the record.
    ///
    /// Returns `None`, leaving the slot untouched, when `partial` is not an
    /// object (see [`StateMap::from_partial`]).
    pub fn merge(&self, partial: &Value) -> Option<Transition> {
        let Some(entries) = StateMap::from_partial(partial) else {
            #[cfg(feature = "tracing")]
            tracing::trace!(message = "state.set.ignored", kind = partial.type_name());
            return None;
        };
        let old = self.get();
        let new = Rc::new(old.overlay(&entries));
        #[cfg(feature = "tracing")]
        tracing::trace!(message = "state.set", keys = entries.len(), total = new.len());
        *self.record.borrow_mut() = Some(Rc::clone(&new));
        Some(Transition { old, new })
    }
}

impl fmt::Debug for StateSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.record.borrow();
        f.debug_struct("StateSlot")
            .field("initialized", &record.is_some())
            .field("keys", &record.as_ref().map_or(0, |map| map.len()))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_map;

    #[test]
    fn lazy_initialization() {
        let slot = StateSlot::new();
        assert!(!slot.is_initialized());
        assert!(slot.get().is_empty());
        assert!(slot.is_initialized());
    }

    #[test]
    fn repeated_reads_share_the_record() {
        let slot = StateSlot::new();
        let a = slot.get();
        let b = slot.get();
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn merge_replaces_record_and_keeps_old() {
        let slot = StateSlot::new();
        slot.merge(&state_map! { "a" => 1 }.into()).expect("accepted");
        let before = slot.get();

        let transition = slot.merge(&state_map! { "b" => 2 }.into()).expect("accepted");
        assert!(Rc::ptr_eq(&transition.old, &before));
        assert_eq!(*before, state_map! { "a" => 1 });
        assert_eq!(*transition.new, state_map! { "a" => 1, "b" => 2 });
        assert!(Rc::ptr_eq(&slot.get(), &transition.new));
    }

    #[test]
    fn rejected_partial_leaves_slot_untouched() {
        let slot = StateSlot::new();
        assert!(slot.merge(&Value::Null).is_none());
        assert!(!slot.is_initialized());

        slot.merge(&state_map! { "a" => 1 }.into()).expect("accepted");
        let before = slot.get();
        assert!(slot.merge(&Value::from("x")).is_none());
        assert!(Rc::ptr_eq(&before, &slot.get()));
    }

    #[test]
    fn host_object_partial_still_replaces_record() {
        let slot = StateSlot::new();
        slot.merge(&state_map! { "a" => 1 }.into()).expect("accepted");
        let before = slot.get();
        let transition = slot
            .merge(&Value::object(Rc::new(())))
            .expect("objects are accepted");
        assert!(!Rc::ptr_eq(&before, &transition.new));
        assert_eq!(*transition.new, *before);
    }

    #[test]
    fn debug_hides_values() {
        let slot = StateSlot::new();
        slot.merge(&state_map! { "secret" => "value" }.into()).expect("accepted");
        let dbg = format!("{slot:?}");
        assert!(dbg.contains("keys: 1"));
        assert!(!dbg.contains("secret"));
    }
}
