use criterion::{criterion_group, criterion_main, Criterion};
use partiql::ast::builder::*;
use partiql::{Datum, Engine, EngineConfig};

fn make_rows(rows: i64) -> Datum {
    Datum::bag((0..rows).map(|i| {
        Datum::tuple([
            ("group", Datum::string(format!("group-{}", i % 4))),
            ("order", Datum::Int(i)),
            ("value", Datum::Int(i % 10)),
        ])
    }))
}

fn bench_scan_filter_aggregate(c: &mut Criterion) {
    let mut engine = Engine::new(EngineConfig::default());
    engine.catalog_mut().insert("t", make_rows(1024));

    // SELECT r."group" AS g, SUM(r.value) AS total FROM t AS r
    // WHERE r."order" > 100 GROUP BY r."group"
    let q = query(
        SelectBuilder::items(vec![
            item(path(id("r"), "group"), "g"),
            item(agg("sum", vec![path(id("r"), "value")]), "total"),
        ])
        .from(scan(id("t"), "r"))
        .filter(gt(path(id("r"), "order"), int(100)))
        .group_by(vec![(path(id("r"), "group"), None)])
        .build(),
    );
    let compiled = engine.prepare(&q).unwrap();

    c.bench_function("plan_and_compile", |b| {
        b.iter(|| {
            let _ = engine.prepare(&q).unwrap();
        })
    });
    c.bench_function("scan_filter_aggregate", |b| {
        b.iter(|| {
            let _ = compiled
                .eval(engine.session())
                .unwrap()
                .materialize()
                .unwrap();
        })
    });
}

criterion_group!(queries, bench_scan_filter_aggregate);
criterion_main!(queries);
