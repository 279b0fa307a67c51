use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use csi_core::{
    falls, Atom, Domain, EvalConfig, Formula, Monitor, Path, RegistryBuilder, Trace, Value,
};

fn path(name: &str) -> Path {
    name.parse().unwrap()
}

fn atom(name: &str) -> Atom {
    Atom::new(path(name)).unwrap()
}

fn scenario_trace(steps: u64) -> Trace {
    let mut trace = Trace::new();
    for t in 0..steps {
        let instant = t as f64;
        trace.set(&path("has_assembly"), instant, t % 5 < 3);
        trace.set(&path("is_secured"), instant, t % 7 < 2);
        trace.set(&path("velocity"), instant, (t % 11) as f64 * 2.5);
        trace.set(&path("in_bench"), instant, t % 3 == 0);
    }
    trace.set(&path("v_bench"), 0.0, 15.0);
    trace
}

fn hazard_conditions() -> Vec<Formula> {
    vec![
        (falls(atom("has_assembly")) & !Formula::from(atom("is_secured"))).eventually(),
        (atom("velocity").gt(atom("v_bench")) & Formula::from(atom("in_bench"))).eventually(),
        Formula::from(atom("has_assembly"))
            .implies(Formula::from(atom("has_assembly")).weak_until(atom("is_secured")))
            .always(),
    ]
}

fn evaluate_conditions(c: &mut Criterion) {
    let monitor = Monitor::from_conditions(hazard_conditions());
    for steps in [100u64, 1_000] {
        let trace = scenario_trace(steps);
        c.bench_with_input(
            BenchmarkId::new("evaluate monitor", steps),
            &trace,
            |b, trace| {
                b.iter(|| monitor.evaluate(trace, &EvalConfig::default(), false));
            },
        );
    }
}

fn register_coverage(c: &mut Criterion) {
    for steps in [100u64, 1_000] {
        let trace = scenario_trace(steps);
        c.bench_with_input(
            BenchmarkId::new("register coverage", steps),
            &trace,
            |b, trace| {
                b.iter(|| {
                    let mut builder = RegistryBuilder::new();
                    builder.add_component(
                        path("velocity"),
                        Domain::threshold_range(0.0, 25.0, 5.0, true, false).unwrap(),
                    );
                    builder.add_component(
                        path("in_bench"),
                        Domain::values([Value::Bool(false), Value::Bool(true)]),
                    );
                    let mut registry = builder.build();
                    registry.register(trace);
                    registry.covered()
                });
            },
        );
    }
}

criterion_group!(benches, evaluate_conditions, register_coverage);
criterion_main!(benches);
