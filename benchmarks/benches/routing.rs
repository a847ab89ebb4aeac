//! Routing tables under load: glob matching and full locator scans.

use cairn_core::routing::{GlobPattern, ServletLocator};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

fn bench_glob_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("glob_match");

    let cases = [
        ("extension", "*.html", "/catalog/items/detail.html"),
        ("alternation", "*.(js|css|gif|png)", "/assets/vendor/app.min.css"),
        ("prefix_tree", "/api/v?/orders/*", "/api/v2/orders/1234/lines"),
        ("char_class", "/files/[a-z][0-9]*", "/files/a7-report.pdf"),
    ];
    for (name, pattern, path) in cases {
        let compiled = GlobPattern::compile(pattern);
        group.bench_with_input(BenchmarkId::new("hit", name), &compiled, |b, compiled| {
            b.iter(|| compiled.matches(black_box(path)))
        });
    }

    // Worst case: a backtracking miss over many '*' candidates.
    let miss = GlobPattern::compile("*.(jpg|jpeg|webp)");
    group.bench_function("miss_after_backtracking", |b| {
        b.iter(|| miss.matches(black_box("/very/long/path/that/never/matches/archive.tar.gz")))
    });
    group.finish();
}

fn typical_locator() -> ServletLocator {
    let mut locator = ServletLocator::new();
    // The default extension block every deployed application carries.
    for ext in ["html", "htm", "css", "js", "json", "png", "jpg", "gif", "svg", "ico", "txt"] {
        locator.add_mapping(&format!("*.{ext}"), "static");
    }
    locator.add_mapping("/api/orders/*", "orders");
    locator.add_mapping("/api/customers/*", "customers");
    locator.add_mapping("/admin/*", "admin");
    locator.add_mapping("*.php", "php");
    locator.add_mapping("*", "fallback");
    locator
}

fn bench_locator(c: &mut Criterion) {
    let locator = typical_locator();
    let mut group = c.benchmark_group("locate");

    // First mapping wins immediately.
    group.bench_function("early_hit", |b| {
        b.iter(|| locator.locate(black_box("/index.html")).unwrap())
    });
    // Declared mapping behind the whole extension block.
    group.bench_function("late_hit", |b| {
        b.iter(|| locator.locate(black_box("/api/orders/42/lines")).unwrap())
    });
    // Catch-all at the very end of the table.
    group.bench_function("fallback", |b| {
        b.iter(|| locator.locate(black_box("/health")).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_glob_matching, bench_locator);
criterion_main!(benches);
