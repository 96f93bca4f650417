use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use serde_json::json;
use shell_events::{AmbientChannel, AmbientEvent, AmbientHub, EventBus};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Publish latency as the number of local subscribers grows.
fn bench_local_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_fan_out");

    for subscribers in [1usize, 10, 100] {
        let bus = EventBus::detached();
        let hits = Arc::new(AtomicU64::new(0));
        for _ in 0..subscribers {
            let hits = hits.clone();
            bus.subscribe("authChanged", move |_| {
                hits.fetch_add(1, Ordering::Relaxed);
                Ok(())
            });
        }

        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, _| {
                b.iter(|| bus.publish("authChanged", black_box(json!(true))).unwrap());
            },
        );
    }

    group.finish();
}

/// Publish cost including the ambient bridge into a second bus.
fn bench_ambient_bridge(c: &mut Criterion) {
    let mut group = c.benchmark_group("ambient_bridge");

    let hub = Arc::new(AmbientHub::new());
    let shell = EventBus::new(hub.clone());
    let remote = EventBus::new(hub.clone());
    remote.subscribe("userLoggedIn", |_| Ok(()));
    remote.listen_ambient("userLoggedIn");

    let payload = json!({ "username": "alice", "role": "user" });
    group.bench_function("shell_to_remote", |b| {
        b.iter(|| shell.publish("userLoggedIn", black_box(payload.clone())).unwrap());
    });

    group.bench_function("raw_hub_dispatch", |b| {
        let event = AmbientEvent::new("userLoggedIn", payload.clone());
        b.iter(|| hub.dispatch(black_box(&event)));
    });

    group.finish();
}

criterion_group!(benches, bench_local_fan_out, bench_ambient_bridge);
criterion_main!(benches);
