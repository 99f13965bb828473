#![no_main]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use statemix::class::STATE_CHANGED_CALLBACK;
use statemix::{Class, Instance, StateMap, Value, use_state};

const KEYS: [&str; 4] = ["a", "b", "c", "d"];

#[derive(Arbitrary, Debug)]
enum FuzzValue {
    Undefined,
    Null,
    Bool(bool),
    Number(i8),
    Nan,
    Text(u8),
}

impl FuzzValue {
    fn to_value(&self) -> Value {
        match self {
            Self::Undefined => Value::Undefined,
            Self::Null => Value::Null,
            Self::Bool(b) => Value::from(*b),
            Self::Number(n) => Value::from(i32::from(*n)),
            Self::Nan => Value::from(f64::NAN),
            Self::Text(t) => Value::from(format!("t{}", t % 4)),
        }
    }
}

#[derive(Arbitrary, Debug)]
enum FuzzOp {
    Set { instance: bool, entries: Vec<(u8, FuzzValue)> },
    SetList { instance: bool, items: Vec<FuzzValue> },
    SetScalar { instance: bool, value: FuzzValue },
    Observe(Vec<u8>),
    Unobserve,
    Get { instance: bool },
    Drop { instance: bool },
}

fn key(index: u8) -> &'static str {
    KEYS[usize::from(index) % KEYS.len()]
}

fn pick(instances: &mut [Option<Instance>; 2], class: &Class, second: bool) -> Instance {
    instances[usize::from(second)]
        .get_or_insert_with(|| class.construct())
        .clone()
}

/// Strict equality, except NaN matches NaN.
fn same(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan() => true,
        _ => a == b,
    }
}

fuzz_target!(|ops: Vec<FuzzOp>| {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    let class = Class::new("Fuzz")
        .observed_state(KEYS.to_vec())
        .method(STATE_CHANGED_CALLBACK, move |_, args| {
            sink.borrow_mut().push(args[0].to_key().into_owned());
            Ok(Value::Undefined)
        });
    let Ok(class) = use_state(&class.into()) else {
        return;
    };
    let mut instances: [Option<Instance>; 2] = [None, None];
    let mut shadow: [BTreeMap<&'static str, Value>; 2] = Default::default();

    for op in ops.iter().take(256) {
        match op {
            FuzzOp::Set { instance, entries } => {
                let target = pick(&mut instances, &class, *instance);
                let partial: StateMap = entries
                    .iter()
                    .map(|(index, value)| (key(*index), value.to_value()))
                    .collect();
                let before = target.get_state().expect("installed");
                calls.borrow_mut().clear();
                target.set_state(partial.clone()).expect("callback never fails");
                let after = target.get_state().expect("installed");

                // Never mutated in place.
                assert!(!Rc::ptr_eq(&before, &after));
                for (name, value) in partial.iter() {
                    assert!(same(&after[name], value));
                }
                for name in calls.borrow().iter() {
                    assert!(KEYS.contains(&name.as_str()));
                }

                let record = &mut shadow[usize::from(*instance)];
                for (index, value) in entries {
                    record.insert(key(*index), value.to_value());
                }
            }
            FuzzOp::SetList { instance, items } => {
                let target = pick(&mut instances, &class, *instance);
                let list: Vec<Value> = items.iter().take(8).map(FuzzValue::to_value).collect();
                target.set_state(list).expect("callback never fails");
            }
            FuzzOp::SetScalar { instance, value } => {
                let target = pick(&mut instances, &class, *instance);
                let before = target.get_state().expect("installed");
                calls.borrow_mut().clear();
                target.set_state(value.to_value()).expect("callback never fails");
                assert!(Rc::ptr_eq(&before, &target.get_state().expect("installed")));
                assert!(calls.borrow().is_empty());
            }
            FuzzOp::Observe(indices) => {
                let keys: Vec<&str> = indices.iter().take(8).map(|i| key(*i)).collect();
                class.set_observed_state(keys);
            }
            FuzzOp::Unobserve => class.clear_observed_state(),
            FuzzOp::Get { instance } => {
                let target = pick(&mut instances, &class, *instance);
                let record = target.get_state().expect("installed");
                for (name, value) in &shadow[usize::from(*instance)] {
                    assert!(same(&record[*name], value));
                }
            }
            FuzzOp::Drop { instance } => {
                instances[usize::from(*instance)] = None;
                shadow[usize::from(*instance)].clear();
            }
        }
    }
});
