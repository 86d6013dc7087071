use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sqlweave::{NO_DIALECT, POSTGRES, Dialect, Stmt};

/// SELECT col0, col1, ... FROM t WHERE col0 = ? AND col1 = ? ...
/// with the WHERE conditions added before the columns.
fn build_select(dialect: &'static Dialect, n: usize) -> Stmt {
    let mut q = dialect.from("t", ());
    for i in 0..n {
        q = q.where_(&format!("col{i} = ?"), i as i64);
    }
    for i in 0..n {
        q = q.select(&format!("col{i}"), ());
    }
    q.order_by("col0").limit(10_i64)
}

fn bench_build_and_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("stmt_builder/build_and_render");

    for n in [1, 5, 10, 50] {
        group.bench_with_input(BenchmarkId::new("none", n), &n, |b, &n| {
            b.iter(|| {
                let q = build_select(&NO_DIALECT, n);
                black_box(q.sql().len());
            });
        });
        group.bench_with_input(BenchmarkId::new("postgres", n), &n, |b, &n| {
            b.iter(|| {
                let q = build_select(&POSTGRES, n);
                black_box(q.sql().len());
            });
        });
    }

    group.finish();
}

fn bench_render_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("stmt_builder/render");

    for n in [5, 50] {
        let mut q = build_select(&POSTGRES, n);
        group.bench_with_input(BenchmarkId::new("cached", n), &n, |b, _| {
            b.iter(|| {
                q.invalidate();
                black_box(q.sql().len());
            });
        });
        group.bench_with_input(BenchmarkId::new("uncached", n), &n, |b, _| {
            b.iter(|| {
                POSTGRES.clear_cache();
                q.invalidate();
                black_box(q.sql().len());
            });
        });
    }

    group.finish();
}

fn bench_subquery(c: &mut Criterion) {
    c.bench_function("stmt_builder/with_union", |b| {
        b.iter(|| {
            let q = POSTGRES
                .with(
                    "recent",
                    POSTGRES.from("orders", ()).select("id", ()).where_("age < ?", 3_i32),
                )
                .from("recent", ())
                .select("id", ())
                .union_all(POSTGRES.from("archive", ()).select("id", ()).where_("year = ?", 2020_i32))
                .limit(100_i64);
            black_box(q.build().1.len());
        });
    });
}

criterion_group!(benches, bench_build_and_render, bench_render_cache, bench_subquery);
criterion_main!(benches);
