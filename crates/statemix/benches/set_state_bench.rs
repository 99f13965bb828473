//! Benchmarks for `set_state`: merge cost by record size, and dispatch cost
//! by observed-key count.
//!
//! Run with: cargo bench -p statemix -- set_state

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use statemix::class::STATE_CHANGED_CALLBACK;
use statemix::{
    CallbackError, Class, StateChangedCallback, StateMap, StateSlot, UseState, Value, state_map,
    use_state,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const OBSERVED: &[&str] = &["k0", "k1", "k2", "k3", "k4", "k5", "k6", "k7"];

#[derive(Default)]
struct Plain {
    state: StateSlot,
}

impl UseState for Plain {
    fn state_slot(&self) -> &StateSlot {
        &self.state
    }
}

#[derive(Default)]
struct Observed {
    state: StateSlot,
}

impl UseState for Observed {
    const OBSERVED_STATE: Option<&'static [&'static str]> = Some(OBSERVED);

    fn state_slot(&self) -> &StateSlot {
        &self.state
    }

    fn change_listener(&self) -> Option<&dyn StateChangedCallback> {
        Some(self)
    }
}

impl StateChangedCallback for Observed {
    fn state_changed_callback(&self, name: &str, _: &Value, new: &Value) -> Result<(), CallbackError> {
        let _ = black_box((name, new));
        Ok(())
    }
}

fn seeded_map(count: u64) -> StateMap {
    (0..count).map(|i| (format!("k{i}"), i as usize)).collect()
}

// ---------------------------------------------------------------------------
// 1. Merge into records of growing size
// ---------------------------------------------------------------------------

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_state/merge");

    for count in [8u64, 128, 2_048] {
        group.throughput(Throughput::Elements(1));
        let plain = Plain::default();
        plain.set_state(seeded_map(count)).unwrap();
        let mut tick = 0usize;

        group.bench_with_input(BenchmarkId::new("typed", count), &(), |b, _| {
            b.iter(|| {
                tick = tick.wrapping_add(1);
                plain.set_state(state_map! { "k0" => tick }).unwrap();
                black_box(plain.get_state().len())
            })
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 2. Dispatch over observed keys
// ---------------------------------------------------------------------------

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_state/dispatch");
    group.throughput(Throughput::Elements(OBSERVED.len() as u64));

    let observed = Observed::default();
    let mut tick = 0usize;
    group.bench_function("typed", |b| {
        b.iter(|| {
            tick = tick.wrapping_add(1);
            let partial: StateMap = OBSERVED.iter().map(|key| (*key, tick)).collect();
            observed.set_state(partial).unwrap();
        })
    });

    let class = Class::new("Bench")
        .observed_state(OBSERVED.to_vec())
        .method(STATE_CHANGED_CALLBACK, |_, args| {
            let _ = black_box(args.len());
            Ok(Value::Undefined)
        });
    let instance = use_state(&class.into()).unwrap().construct();
    let mut tick = 0usize;
    group.bench_function("runtime", |b| {
        b.iter(|| {
            tick = tick.wrapping_add(1);
            let partial: StateMap = OBSERVED.iter().map(|key| (*key, tick)).collect();
            instance.set_state(partial).unwrap();
        })
    });
    group.finish();
}

criterion_group!(benches, bench_merge, bench_dispatch);
criterion_main!(benches);
