use std::{hint::black_box, sync::Arc};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use murmur::{ClientConnection, ConnectionRegistry};

fn bench_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_broadcast");
    let payload = r#"{"id":"0b9f1c1e","confession_id":"5d2a","comment_id":null}"#;

    for clients in [0usize, 10, 100, 1000] {
        let registry = ConnectionRegistry::new();
        let mut receivers = Vec::with_capacity(clients);
        for _ in 0..clients {
            let (conn, rx) = ClientConnection::channel(registry.next_id(), None, 1);
            registry.add(Arc::new(conn));
            receivers.push(rx);
        }

        group.throughput(Throughput::Elements(clients as u64));
        group.bench_with_input(BenchmarkId::from_parameter(clients), &clients, |b, _| {
            b.iter(|| {
                let report = registry.broadcast(black_box(payload));
                // очередь на одно сообщение: опустошаем, чтобы никого не выкинуть
                for rx in receivers.iter_mut() {
                    let _ = rx.try_recv();
                }
                black_box(report)
            })
        });
    }
    group.finish();
}

fn bench_add_remove(c: &mut Criterion) {
    let registry = ConnectionRegistry::new();
    c.bench_function("registry_add_remove", |b| {
        b.iter(|| {
            let (conn, _rx) = ClientConnection::channel(registry.next_id(), None, 1);
            let id = conn.id();
            registry.add(Arc::new(conn));
            black_box(registry.remove(id))
        })
    });
}

criterion_group!(benches, bench_broadcast, bench_add_remove);
criterion_main!(benches);
