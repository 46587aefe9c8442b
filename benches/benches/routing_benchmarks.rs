use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use murmur::InvalidationDispatcher;

fn bench_keys_for(c: &mut Criterion) {
    let cases = [
        ("created", "confessions:confession:created", r#"{"id":"x1"}"#),
        ("updated", "confessions:confession:updated", r#"{"id":"x1","author_id":"u1"}"#),
        (
            "reaction",
            "confessions:reaction:updated",
            r#"{"id":"r1","confession_id":"x1","comment_id":"c1","kind":"like"}"#,
        ),
        ("malformed", "confessions:comment:updated", r#"{"id":"c1","confession_id":"#),
        ("unknown", "comments:posted", r#"{"id":"c1"}"#),
    ];

    let mut group = c.benchmark_group("keys_for");
    for (name, channel, payload) in cases {
        group.bench_function(name, |b| {
            b.iter(|| InvalidationDispatcher::keys_for(black_box(channel), black_box(payload)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_keys_for);
criterion_main!(benches);
