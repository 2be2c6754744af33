/// Channel routing benchmarks using Criterion
///
/// Run with: cargo bench --bench channel_benchmark
///
/// Benchmarks cover:
/// - Point-to-point send_to / receive_from over loopback links
/// - Broadcast fan-out to N transmitters
use comms_core::{loopback, Channel, Receiver, Transmitter};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

fn bench_point_to_point(c: &mut Criterion) {
    let (sender, receiver) = loopback("bench.out", "bench.in");
    let receiver: Arc<dyn Receiver> = Arc::new(receiver);
    let sender: Arc<dyn Transmitter> = Arc::new(sender);
    let channel = Channel::point_to_point(Some(receiver), Some(sender)).unwrap();
    let payload = vec![0u8; 256];

    let mut group = c.benchmark_group("channel_point_to_point");
    group.throughput(Throughput::Elements(1));
    group.bench_function("send_then_receive", |b| {
        b.iter(|| {
            channel.send_to(black_box(&payload), "bench.out").unwrap();
            black_box(channel.receive_from("bench.in").unwrap());
        })
    });
    group.finish();
}

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel_fan_out");

    for fan in [1usize, 4, 16].iter() {
        let pairs: Vec<_> = (0..*fan)
            .map(|i| loopback(format!("out.{}", i), format!("probe.{}", i)))
            .collect();
        let mut builder = Channel::builder();
        for (sender, _) in &pairs {
            builder = builder.transmitter(sender.clone());
        }
        let channel = builder.build().unwrap();
        let payload = vec![0u8; 64];

        group.throughput(Throughput::Elements(*fan as u64));
        group.bench_with_input(BenchmarkId::from_parameter(fan), fan, |b, _| {
            b.iter(|| {
                channel.send(black_box(&payload)).unwrap();
                for (_, probe) in &pairs {
                    black_box(probe.receive().unwrap());
                }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_point_to_point, bench_fan_out);
criterion_main!(benches);
