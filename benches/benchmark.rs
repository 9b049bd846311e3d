use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use recsql::infer::besttype;
use recsql::text_table;
use recsql::{Converter, Mode, Store, Table, TableOptions, Value};

fn text_table_with_rows(rows: usize) -> String {
    let mut text = String::from(
        "Table[bench]: generated rows\n========  ==========  ========\nid        value       flag\n========  ==========  ========\n",
    );
    for i in 0..rows {
        text.push_str(&format!("{:<8}  {:<10}  {:<8}\n", i, i as f64 * 0.5, if i % 2 == 0 { "x" } else { "-" }));
    }
    text.push_str("========  ==========  ========\n");
    text
}

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("besttype integer", |b| b.iter(|| besttype(black_box("1921"))));
    c.bench_function("besttype float", |b| b.iter(|| besttype(black_box("3.14159"))));
    c.bench_function("besttype text", |b| b.iter(|| besttype(black_box("R. P. Feynman"))));

    let converter = Converter::new(Mode::Singlet);
    let text = text_table_with_rows(1_000);
    c.bench_function("parse 1k rows", |b| {
        b.iter(|| text_table::parse(black_box(&text), &converter))
    });

    let store = Store::open_in_memory().expect("store");
    let records = (0..10_000)
        .map(|i| vec![Value::from(i), Value::from(i as f64 / 3.0)])
        .collect();
    let mut table = Table::create(&store, "bench", &["id", "value"], records, TableOptions::default())
        .expect("table");
    c.bench_function("cached count 10k", |b| {
        b.iter(|| table.row_count().expect("count"))
    });
    c.bench_function("uncached avg 10k", |b| {
        b.iter(|| {
            table
                .execute("SELECT avg(value) FROM __self__", None, true, false)
                .expect("avg")
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
