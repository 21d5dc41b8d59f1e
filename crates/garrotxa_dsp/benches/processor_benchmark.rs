//! Performance benchmarks for the DSP module
//!
//! Run with: cargo bench -p garrotxa_dsp

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use garrotxa_dsp::{eq_coefficients, EqSettings, Oversampler, ProcessParams, ProcessSpec, Processor};

fn benchmark_processor(c: &mut Criterion) {
    let mut group = c.benchmark_group("processor");

    // Common buffer sizes in audio applications
    let buffer_sizes = [64, 128, 256, 512, 1024, 2048];

    for size in buffer_sizes {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("process_planar_{}_frames", size), |b| {
            let mut processor = Processor::new();
            processor
                .prepare(ProcessSpec::new(48000.0, size, 2))
                .unwrap();
            let params = ProcessParams::default();
            let mut left: Vec<f32> = (0..size).map(|i| (i as f32 * 0.001).sin()).collect();
            let mut right: Vec<f32> = (0..size).map(|i| (i as f32 * 0.002).sin()).collect();

            b.iter(|| {
                black_box(processor.process(&mut [&mut left, &mut right], black_box(&params)));
            });
        });

        group.bench_function(format!("process_interleaved_{}_frames", size), |b| {
            let mut processor = Processor::new();
            processor
                .prepare(ProcessSpec::new(48000.0, size, 2))
                .unwrap();
            let params = ProcessParams::default();
            let mut buffer: Vec<f32> = (0..size * 2).map(|i| (i as f32 * 0.001).sin()).collect();

            b.iter(|| {
                black_box(processor.process_interleaved(black_box(&mut buffer), black_box(&params)));
            });
        });
    }

    group.finish();
}

fn benchmark_oversampling_round_trip(c: &mut Criterion) {
    c.bench_function("oversampler_round_trip_512", |b| {
        let mut os = Oversampler::new();
        os.prepare(1, 512).unwrap();
        let input: Vec<f32> = (0..512).map(|i| (i as f32 * 0.01).sin()).collect();
        let mut output = vec![0.0_f32; 512];

        b.iter(|| {
            os.process_up(0, black_box(&input)).unwrap();
            os.process_down(0, black_box(&mut output)).unwrap();
        });
    });
}

fn benchmark_coefficient_update(c: &mut Criterion) {
    c.bench_function("eq_coefficients", |b| {
        let mut settings = EqSettings::default();

        b.iter(|| {
            // Simulate sweeping the mid knob
            settings.mid_frequency = 200.0 + (settings.mid_frequency + 37.0) % 4800.0;
            black_box(eq_coefficients(black_box(192000.0), &settings));
        });
    });
}

criterion_group!(
    benches,
    benchmark_processor,
    benchmark_oversampling_round_trip,
    benchmark_coefficient_update
);

criterion_main!(benches);
