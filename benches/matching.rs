use std::cell::Cell;
use std::hint::black_box;
use std::rc::Rc;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use serde_json::{json, Value};

use kyrostate::{
    compare_patterns, intersect_patterns, ListenerOptions, PathPattern, PathScanner, ReactiveStore,
    WildcardMatcher,
};

fn bench_wildcard(c: &mut Criterion) {
    let mut group = c.benchmark_group("wildcard");
    group.throughput(Throughput::Elements(1));

    // Long literal runs around a single star.
    let prefix = "a".repeat(512);
    let suffix = "b".repeat(512);
    let matcher = WildcardMatcher::compile(&format!("{prefix}*{suffix}"));
    let hit = format!("{prefix}{}{suffix}", "x".repeat(1024));
    let miss = format!("{prefix}{}", "a".repeat(1536));
    group.bench_function("bracketed_star_hit", |b| {
        b.iter(|| black_box(matcher.is_match(black_box(&hit))));
    });
    group.bench_function("bracketed_star_miss", |b| {
        b.iter(|| black_box(matcher.is_match(black_box(&miss))));
    });

    let mixed = WildcardMatcher::compile("user-*-?-*.json");
    group.bench_function("mixed", |b| {
        b.iter(|| black_box(mixed.is_match(black_box("user-42-x-profile.json"))));
    });
    group.finish();
}

fn bench_patterns(c: &mut Criterion) {
    let mut group = c.benchmark_group("patterns");
    group.throughput(Throughput::Elements(1));

    let a = PathPattern::parse("users.(a|b|c|d|e).posts.**.title", ".").unwrap();
    let b = PathPattern::parse("users.!(b|x).*.2024.*.title", ".").unwrap();
    group.bench_function("compare", |bench| {
        bench.iter(|| black_box(compare_patterns(black_box(&a), black_box(&b))));
    });
    group.bench_function("intersect", |bench| {
        bench.iter(|| black_box(intersect_patterns(black_box(&a), black_box(&b))));
    });

    let concrete = "users.c.posts.2024.05.title";
    group.bench_function("matches", |bench| {
        bench.iter(|| black_box(a.matches(black_box(concrete))));
    });
    group.finish();
}

fn wide_tree(width: usize) -> Value {
    let users: serde_json::Map<String, Value> = (0..width)
        .map(|i| {
            (
                format!("u{i}"),
                json!({"name": format!("user {i}"), "posts": [{"title": "a"}, {"title": "b"}]}),
            )
        })
        .collect();
    json!({ "users": users })
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");
    let tree = wide_tree(1_000);
    let pattern = PathPattern::parse("users.*.posts.**.title", ".").unwrap();
    group.throughput(Throughput::Elements(2_000));
    group.bench_function("variable_depth_1000_users", |b| {
        b.iter(|| black_box(PathScanner::new(black_box(&tree)).scan(&pattern).len()));
    });
    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(1));

    let store = ReactiveStore::new(wide_tree(200));
    let calls = Rc::new(Cell::new(0_u64));
    let mut subs = Vec::new();
    for pattern in ["users.*.name", "users.:id.posts.*.title", "users", "users.u7;"] {
        let calls = Rc::clone(&calls);
        subs.push(
            store
                .subscribe(
                    pattern,
                    move |_, _| calls.set(calls.get() + 1),
                    ListenerOptions::default(),
                )
                .unwrap(),
        );
    }

    let mut n = 0_u64;
    group.bench_function("update_leaf", |b| {
        b.iter(|| {
            n += 1;
            store.update("users.u7.name", json!(n)).unwrap();
        });
    });
    group.bench_function("replace_subtree", |b| {
        b.iter(|| {
            n += 1;
            store
                .update("users.u7", json!({"name": n, "posts": [{"title": "c"}]}))
                .unwrap();
        });
    });
    group.finish();
    black_box(calls.get());
    drop(subs);
}

criterion_group!(
    matching,
    bench_wildcard,
    bench_patterns,
    bench_scan,
    bench_dispatch
);
criterion_main!(matching);
