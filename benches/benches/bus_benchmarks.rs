use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use murmur::{bus::MemoryBus, MessageBus, NAMESPACE_PATTERN};
use tokio::runtime::Runtime;

fn bench_publish(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let idle = MemoryBus::new(1 << 16);
    let bus = &idle;
    c.bench_function("memory_publish_0_subs", |b| {
        b.to_async(&rt).iter(|| async move {
            black_box(bus.publish("confessions:confession:created", "{}").await)
        })
    });

    let busy = MemoryBus::new(1 << 16);
    let bus = &busy;
    let (_exact, _pattern) = rt.block_on(async {
        (
            bus.subscribe(&["confessions:confession:created"]).await,
            bus.psubscribe(NAMESPACE_PATTERN).await,
        )
    });
    c.bench_function("memory_publish_exact_and_pattern", |b| {
        b.to_async(&rt).iter(|| async move {
            black_box(bus.publish("confessions:confession:created", "{}").await)
        })
    });
}

criterion_group!(benches, bench_publish);
criterion_main!(benches);
