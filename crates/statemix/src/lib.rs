#![forbid(unsafe_code)]

//! Private per-instance state with shallow merge and change callbacks.
//!
//! A type opts into two operations, `get_state` and `set_state`. The state
//! itself is a [`StateMap`] held outside the type's public surface, created
//! lazily on first access and dropped together with its owner (runtime
//! instances caught in a reference cycle through their own records are the
//! exception; see [`class`]).
//!
//! `set_state` overlays a partial map onto the current one (shallow,
//! copy-on-write) and, when the type declares an ordered list of observed
//! keys *and* a change callback, reports each observed key whose value
//! changed, in declared order.
//!
//! Two faces share one core:
//!
//! - [`UseState`]: a trait for ordinary Rust structs. The record lives in an
//!   embedded [`StateSlot`]; opt-in to notifications is a trait constant plus
//!   a [`StateChangedCallback`] implementation.
//! - [`use_state`]: installs `getState` / `setState` into the method table of
//!   a runtime [`Class`]. Records live in a thread-local [`WeakTable`] keyed by
//!   instance identity.
//!
//! # Invariants
//!
//! 1. Every instance maps to exactly one record.
//! 2. `set_state` never mutates a record in place; earlier snapshots returned
//!    by `get_state` keep their contents.
//! 3. Keys absent from a partial keep their prior values.
//! 4. Partials that are not objects (`Undefined`, `Null`, booleans, numbers,
//!    strings, classes) are ignored without error.
//! 5. Callback errors propagate unchanged and stop the remaining dispatch for
//!    that call.
//!
//! # Example
//!
//! ```
//! use statemix::{StateSlot, UseState, state_map};
//!
//! #[derive(Default)]
//! struct Counter {
//!     state: StateSlot,
//! }
//!
//! impl UseState for Counter {
//!     fn state_slot(&self) -> &StateSlot {
//!         &self.state
//!     }
//! }
//!
//! let counter = Counter::default();
//! counter.set_state(state_map! { "a" => 1 }).unwrap();
//! counter.set_state(state_map! { "b" => 2 }).unwrap();
//! assert_eq!(*counter.get_state(), state_map! { "a" => 1, "b" => 2 });
//! ```

pub mod class;
pub mod diff;
pub mod error;
pub mod map;
pub mod mixin;
#[cfg(feature = "serde")]
mod serde_impl;
pub mod slot;
pub mod value;
pub mod weak_table;

pub use class::{Class, Instance, Method, use_state};
pub use diff::{StateChange, Transition, changes};
pub use error::{CallbackError, StateError};
pub use map::StateMap;
pub use mixin::{StateChangedCallback, UseState};
pub use slot::StateSlot;
pub use value::Value;
pub use weak_table::WeakTable;
