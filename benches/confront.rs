use criterion::{black_box, criterion_group, criterion_main, Criterion};
use confront::{var, DataSet, RuleSet, RuleSetBuilder, Value};

/// Build a rule set with `rules` independent range checks and a dataset of
/// `rows` records, one column per rule, with some missing cells.
fn build_fixture(rules: usize, rows: usize) -> (RuleSet, DataSet) {
    let mut builder = RuleSetBuilder::new();
    let mut dataset = DataSet::new();

    for i in 0..rules {
        let column = format!("c{i}");
        let column_clone = column.clone();
        builder = builder.rule(&format!("r{i}"), move |r| {
            r.when(var(&column_clone).gte(0_i64).and(var(&column_clone).lt(1000_i64)))
        });
        let values: Vec<Value> = (0..rows)
            .map(|row| {
                if row % 17 == 0 {
                    Value::Na
                } else {
                    Value::Int((row as i64 * 31 + i as i64) % 1200 - 100)
                }
            })
            .collect();
        dataset = dataset.column(&column, values);
    }

    (builder.compile().unwrap(), dataset)
}

fn bench_confront(c: &mut Criterion) {
    let mut group = c.benchmark_group("confront");

    for &(rules, rows) in &[(5, 1_000), (20, 1_000), (20, 10_000)] {
        let (set, dataset) = build_fixture(rules, rows);
        group.bench_function(&format!("{rules}_rules_{rows}_rows"), |b| {
            b.iter(|| set.confront(black_box(dataset.clone())).unwrap());
        });
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    let dsl: String = (0..50)
        .map(|i| format!("rule r{i}: c{i} >= 0 & c{i} < 1000\n"))
        .collect();
    group.bench_function("50_rules_from_dsl", |b| {
        b.iter(|| RuleSet::from_dsl(black_box(&dsl)).unwrap());
    });

    let grouped = "group cols = (a, b, c, d, e, f, g, h)\nrule pos: $cols >= 0\n";
    group.bench_function("group_expansion", |b| {
        b.iter(|| RuleSet::from_dsl(black_box(grouped)).unwrap());
    });

    group.finish();
}

fn bench_funcdep(c: &mut Criterion) {
    let mut group = c.benchmark_group("funcdep");

    let rows = 10_000;
    let set = RuleSet::from_dsl("rule dep: key -> val").unwrap();
    let dataset = DataSet::new()
        .column(
            "key",
            (0..rows).map(|i| Value::Int(i % 500)).collect::<Vec<_>>(),
        )
        .column(
            "val",
            (0..rows).map(|i| Value::Int(i % 501)).collect::<Vec<_>>(),
        );

    group.bench_function("10k_rows_500_groups", |b| {
        b.iter(|| set.confront(black_box(dataset.clone())).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_confront, bench_compile, bench_funcdep);
criterion_main!(benches);
