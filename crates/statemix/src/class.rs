#![forbid(unsafe_code)]

//! Runtime classes and the `use_state` mixin.
//!
//! A [`Class`] is a named method table plus static properties; an
//! [`Instance`] dispatches [`call`](Instance::call) through its class's table,
//! so methods installed after construction are visible to existing instances.
//!
//! [`use_state`] installs `getState` and `setState` into a class. Records are
//! kept in a thread-local [`WeakTable`] keyed by instance identity, outside
//! the instance's own fields.
//!
//! # Invariants
//!
//! 1. `use_state` succeeds only for class values and returns the same class.
//! 2. An instance's record is created on first `getState`/`setState` and
//!    removed from the table when the instance is dropped, unless the
//!    instance is kept alive by a reference cycle (see Failure Modes).
//! 3. Notification needs both a list-valued `observedState` and a
//!    `stateChangedCallback` method, checked on every `setState`.
//! 4. The observed list is read once per `setState`; `stateChangedCallback`
//!    is looked up again for every changed key, so a callback that redefines
//!    itself affects the keys after it.
//! 5. No table or method-table borrow is held while a method runs.
//!
//! # Failure Modes
//!
//! - **Non-class target**: `use_state` returns
//!   [`StateError::NotConstructible`] and changes nothing.
//! - **Missing method**: [`Instance::call`] returns
//!   [`StateError::MethodNotFound`]; calling `get_state` before `use_state`
//!   hits this.
//! - **Callback error**: returned from `setState` as-is; later keys are not
//!   reported.
//! - **Reference cycles**: the table owns each record strongly. A record that
//!   holds its own instance, directly or through another instance's record,
//!   keeps that instance alive after every outside handle is dropped.
//!   Neither `Drop` nor [`live_records`] reclaims it. Overwrite the
//!   referring keys (for example with `Null`) to break the cycle.

use std::any::Any;
use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::error::{Result, StateError};
use crate::map::StateMap;
use crate::slot::StateSlot;
use crate::value::{UNDEFINED, Value};
use crate::weak_table::WeakTable;

/// Method name installed by [`use_state`] for reads.
pub const GET_STATE: &str = "getState";
/// Method name installed by [`use_state`] for merges.
pub const SET_STATE: &str = "setState";
/// Method looked up on the instance's class to report changes.
pub const STATE_CHANGED_CALLBACK: &str = "stateChangedCallback";

/// A method body: receives the instance it was called on and the arguments.
pub type Method = Rc<dyn Fn(&Instance, &[Value]) -> Result<Value>>;

thread_local! {
    static PRIVATES: RefCell<WeakTable<InstanceInner, Rc<StateSlot>>> =
        RefCell::new(WeakTable::new());
}

pub(crate) struct ClassInner {
    name: Rc<str>,
    observed_state: RefCell<Option<Value>>,
    prototype: RefCell<AHashMap<Rc<str>, Method>>,
}

/// Whether a host object is a runtime class.
pub(crate) fn is_class(object: &Rc<dyn Any>) -> bool {
    object.is::<ClassInner>()
}

/// Own enumerable fields of a host object that is a runtime instance.
pub(crate) fn own_fields(object: &Rc<dyn Any>) -> Option<StateMap> {
    object
        .downcast_ref::<InstanceInner>()
        .map(|inner| inner.fields.borrow().clone())
}

/// Shared handle to a runtime class.
#[derive(Clone)]
pub struct Class(Rc<ClassInner>);

impl Class {
    #[must_use]
    pub fn new(name: impl Into<Rc<str>>) -> Self {
        Self(Rc::new(ClassInner {
            name: name.into(),
            observed_state: RefCell::new(None),
            prototype: RefCell::new(AHashMap::new()),
        }))
    }

    /// Builder form of [`set_observed_state`](Self::set_observed_state).
    #[must_use]
    pub fn observed_state(self, keys: impl Into<Value>) -> Self {
        self.set_observed_state(keys);
        self
    }

    /// Set the static `observedState` property.
    ///
    /// Only a list enables notification; any other value is stored but
    /// treated as "not declared".
    pub fn set_observed_state(&self, keys: impl Into<Value>) {
        *self.0.observed_state.borrow_mut() = Some(keys.into());
    }

    pub fn clear_observed_state(&self) {
        self.0.observed_state.borrow_mut().take();
    }

    /// Builder form of [`define_method`](Self::define_method).
    #[must_use]
    pub fn method(
        self,
        name: impl Into<Rc<str>>,
        body: impl Fn(&Instance, &[Value]) -> Result<Value> + 'static,
    ) -> Self {
        self.define_method(name, body);
        self
    }

    /// Install a method, replacing any method of the same name.
    pub fn define_method(
        &self,
        name: impl Into<Rc<str>>,
        body: impl Fn(&Instance, &[Value]) -> Result<Value> + 'static,
    ) {
        self.0
            .prototype
            .borrow_mut()
            .insert(name.into(), Rc::new(body));
    }

    #[must_use]
    pub fn has_method(&self, name: &str) -> bool {
        self.0.prototype.borrow().contains_key(name)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Create an instance with no fields and no state record yet.
    #[must_use]
    pub fn construct(&self) -> Instance {
        Instance(Rc::new(InstanceInner {
            class: self.clone(),
            fields: RefCell::new(StateMap::new()),
        }))
    }

    /// Whether both handles refer to the same class.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    /// The class as a first-class value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// The class behind `value`, if it is one.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(object) => Rc::clone(object).downcast::<ClassInner>().ok().map(Self),
            _ => None,
        }
    }

    fn lookup(&self, name: &str) -> Option<Method> {
        self.0.prototype.borrow().get(name).cloned()
    }

    /// Observed keys in declared order, or `None` when `observedState` is
    /// absent or not a list.
    fn observed_keys(&self) -> Option<Vec<String>> {
        match &*self.0.observed_state.borrow() {
            Some(Value::List(keys)) => Some(
                keys.iter()
                    .map(|key| Cow::into_owned(key.to_key()))
                    .collect(),
            ),
            _ => None,
        }
    }
}

impl From<Class> for Value {
    fn from(class: Class) -> Self {
        class.into_value()
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<_> = self
            .0
            .prototype
            .borrow()
            .keys()
            .map(ToString::to_string)
            .collect();
        methods.sort_unstable();
        f.debug_struct("Class")
            .field("name", &self.name())
            .field("observed_state", &self.0.observed_state.borrow())
            .field("methods", &methods)
            .finish()
    }
}

pub(crate) struct InstanceInner {
    class: Class,
    fields: RefCell<StateMap>,
}

impl Drop for InstanceInner {
    fn drop(&mut self) {
        let addr = std::ptr::from_ref(self) as usize;
        // The table may be gone during thread teardown or busy if this drop
        // was triggered from inside it; `purge` catches those entries.
        let released = PRIVATES
            .try_with(|table| {
                table
                    .try_borrow_mut()
                    .ok()
                    .and_then(|mut table| table.remove_addr(addr))
            })
            .ok()
            .flatten();
        drop(released);
    }
}

/// Shared handle to an instance of a [`Class`].
#[derive(Clone)]
pub struct Instance(Rc<InstanceInner>);

impl Instance {
    #[must_use]
    pub fn class(&self) -> &Class {
        &self.0.class
    }

    /// Call a method from the class's table with this instance as context.
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value> {
        let body = self
            .0
            .class
            .lookup(method)
            .ok_or_else(|| StateError::MethodNotFound {
                class: self.0.class.name().to_string(),
                method: method.to_string(),
            })?;
        body(self, args)
    }

    /// Shorthand for `call("getState", [])`.
    pub fn get_state(&self) -> Result<Rc<StateMap>> {
        match self.call(GET_STATE, &[])? {
            Value::Map(map) => Ok(map),
            _ => Ok(Rc::default()),
        }
    }

    /// Shorthand for `call("setState", [partial])`.
    pub fn set_state(&self, partial: impl Into<Value>) -> Result<()> {
        self.call(SET_STATE, &[partial.into()]).map(drop)
    }

    /// Set an own, enumerable field. Fields and state never overlap.
    pub fn set_field(&self, name: impl Into<Rc<str>>, value: impl Into<Value>) {
        self.0.fields.borrow_mut().insert(name, value);
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Value {
        self.0.fields.borrow().value(name).clone()
    }

    /// Snapshot of the instance's own fields.
    #[must_use]
    pub fn fields(&self) -> StateMap {
        self.0.fields.borrow().clone()
    }

    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(object) => Rc::clone(object)
                .downcast::<InstanceInner>()
                .ok()
                .map(Self),
            _ => None,
        }
    }

    /// This instance's record holder, created on first use.
    fn privates(&self) -> Rc<StateSlot> {
        PRIVATES.with(|table| {
            let mut table = table.borrow_mut();
            Rc::clone(table.get_or_insert_with(&self.0, Rc::default))
        })
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.0.class.name())
            .field("fields", &*self.0.fields.borrow())
            .finish()
    }
}

/// Install `getState` and `setState` on `target`.
///
/// Fails with [`StateError::NotConstructible`] unless `target` is a class
/// value; nothing is modified in that case. Existing methods with those
/// names are replaced. Returns the same class.
pub fn use_state(target: &Value) -> Result<Class> {
    let Some(class) = Class::from_value(target) else {
        return Err(StateError::NotConstructible {
            found: target.type_name(),
        });
    };
    #[cfg(feature = "tracing")]
    tracing::debug!(message = "state.mixin.apply", class = class.name());
    class.define_method(GET_STATE, get_state);
    class.define_method(SET_STATE, set_state);
    Ok(class)
}

fn get_state(this: &Instance, _args: &[Value]) -> Result<Value> {
    Ok(Value::Map(this.privates().get()))
}

fn set_state(this: &Instance, args: &[Value]) -> Result<Value> {
    let partial = args.first().unwrap_or(UNDEFINED);
    let Some(transition) = this.privates().merge(partial) else {
        return Ok(Value::Undefined);
    };
    let Some(observed) = this.class().observed_keys() else {
        return Ok(Value::Undefined);
    };
    if !this.class().has_method(STATE_CHANGED_CALLBACK) {
        return Ok(Value::Undefined);
    }
    transition.dispatch(observed.as_slice(), |change| {
        this.call(
            STATE_CHANGED_CALLBACK,
            &[
                Value::from(change.name),
                change.old.clone(),
                change.new.clone(),
            ],
        )
        .map(drop)
    })?;
    Ok(Value::Undefined)
}

/// Number of live records in this thread's side table, after dropping
/// entries whose instance is gone.
#[must_use]
pub fn live_records() -> usize {
    let purged = PRIVATES.with(|table| table.borrow_mut().purge());
    drop(purged);
    PRIVATES.with(|table| table.borrow().len())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
