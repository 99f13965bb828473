#![forbid(unsafe_code)]

//! The state mixin for ordinary Rust types.
//!
//! A type opts in by embedding a [`StateSlot`] and implementing
//! [`UseState::state_slot`]. `get_state` and `set_state` come for free.
//!
//! Change notification is a separate, explicit opt-in with two parts, both
//! required:
//!
//! - [`UseState::OBSERVED_STATE`]: the ordered list of keys to watch;
//! - [`UseState::change_listener`]: the [`StateChangedCallback`] to call.
//!
//! ```
//! use std::cell::RefCell;
//! use statemix::{CallbackError, StateChangedCallback, StateSlot, UseState, Value, state_map};
//!
//! #[derive(Default)]
//! struct Label {
//!     state: StateSlot,
//!     log: RefCell<Vec<String>>,
//! }
//!
//! impl UseState for Label {
//!     const OBSERVED_STATE: Option<&'static [&'static str]> = Some(&["text"]);
//!
//!     fn state_slot(&self) -> &StateSlot {
//!         &self.state
//!     }
//!
//!     fn change_listener(&self) -> Option<&dyn StateChangedCallback> {
//!         Some(self)
//!     }
//! }
//!
//! impl StateChangedCallback for Label {
//!     fn state_changed_callback(
//!         &self,
//!         name: &str,
//!         _old: &Value,
//!         new: &Value,
//!     ) -> Result<(), CallbackError> {
//!         self.log.borrow_mut().push(format!("{name}={new:?}"));
//!         Ok(())
//!     }
//! }
//!
//! let label = Label::default();
//! label.set_state(state_map! { "text" => "hi", "width" => 4 })?;
//! assert_eq!(*label.log.borrow(), vec!["text=String(\"hi\")".to_string()]);
//! # Ok::<(), CallbackError>(())
//! ```

use std::rc::Rc;

use crate::error::CallbackError;
use crate::map::StateMap;
use crate::slot::StateSlot;
use crate::value::Value;

/// Receives one call per changed observed key.
///
/// Runs synchronously inside `set_state`, with the record already replaced:
/// `get_state` from within the callback sees the new values.
pub trait StateChangedCallback {
    fn state_changed_callback(
        &self,
        name: &str,
        old: &Value,
        new: &Value,
    ) -> Result<(), CallbackError>;
}

/// Private state with shallow merge and optional change notification.
pub trait UseState {
    /// Keys whose changes are reported, in reporting order. `None` disables
    /// notification.
    const OBSERVED_STATE: Option<&'static [&'static str]> = None;

    /// Where this instance keeps its record.
    fn state_slot(&self) -> &StateSlot;

    /// Listener for observed changes. `None` disables notification.
    fn change_listener(&self) -> Option<&dyn StateChangedCallback> {
        None
    }

    /// The current record. Empty until the first accepted `set_state`.
    fn get_state(&self) -> Rc<StateMap> {
        self.state_slot().get()
    }

    /// Shallow-merge `partial` into the record, then notify.
    ///
    /// Non-object partials (`Undefined`, `Null`, booleans, numbers, strings)
    /// are ignored and return `Ok`. A callback error is returned unchanged
    /// and the remaining observed keys are not reported; the record stays
    /// updated.
    fn set_state(&self, partial: impl Into<Value>) -> Result<(), CallbackError>
    where
        Self: Sized,
    {
        let Some(transition) = self.state_slot().merge(&partial.into()) else {
            return Ok(());
        };
        let Some(observed) = Self::OBSERVED_STATE else {
            return Ok(());
        };
        let Some(listener) = self.change_listener() else {
            return Ok(());
        };
        transition.dispatch(observed, |change| {
            listener.state_changed_callback(change.name, change.old, change.new)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
