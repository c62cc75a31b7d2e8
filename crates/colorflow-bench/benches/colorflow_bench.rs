//! Benchmarks for colorflow pulls.
//!
//! Run with: `cargo bench`

use colorflow_core::{
    MemoryImage, OptionValue, Options, PixelLayout, ProfileIdentity, Rect, SampleType,
};
use colorflow_graph::filters::{DEPTH, OFFSET, SCALE};
use colorflow_graph::{ContextKey, Conversion, Engine, EngineConfig, KeyBuilder, SharedContext};
use colorflow_icc::{ICC_LCMS2, IccIdentity, PROFILE_OUT};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

fn rgb_image(size: u32, profile: Option<Arc<dyn ProfileIdentity>>) -> Arc<MemoryImage> {
    let data: Vec<u8> = (0..size * size * 3).map(|i| (i % 251) as u8).collect();
    let image = MemoryImage::from_vec(size, size, PixelLayout::rgb8(), data).unwrap();
    Arc::new(match profile {
        Some(profile) => image.with_profile(profile),
        None => image,
    })
}

/// Offset chain, whole-image pulls, serial vs row-parallel.
fn bench_offset_pull(c: &mut Criterion) {
    let mut group = c.benchmark_group("offset_pull");

    for size in [64u32, 256, 1024] {
        group.throughput(Throughput::Elements(size as u64 * size as u64));
        for (name, config) in [
            ("serial", EngineConfig::sequential()),
            ("parallel", EngineConfig::default()),
        ] {
            let engine = Engine::with_builtins(config).shared();
            let filters = [(OFFSET, Options::new().with("offset", "12"))];
            let conv = Conversion::chain(engine, rgb_image(size, None), &filters, None).unwrap();

            group.bench_with_input(BenchmarkId::new(name, size), &conv, |b, conv| {
                b.iter(|| {
                    let mut ticket = conv.full_ticket().unwrap();
                    conv.run_pixels(&mut ticket).unwrap();
                    black_box(ticket.into_buffer())
                })
            });
        }
    }

    group.finish();
}

/// Depth conversion plus downscale, which needs intermediate buffers.
fn bench_buffered_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffered_chain");
    let engine = Engine::with_builtins(EngineConfig::default()).shared();
    let filters = [
        (DEPTH, Options::new().with("sample_type", "f32")),
        (SCALE, Options::new().with("factor", "0.5")),
    ];
    let conv = Conversion::chain(engine, rgb_image(512, None), &filters, None).unwrap();
    group.throughput(Throughput::Elements(256 * 256));

    group.bench_function("depth_scale_512", |b| {
        b.iter(|| {
            let mut ticket = conv.full_ticket().unwrap();
            conv.run_pixels(&mut ticket).unwrap();
            black_box(ticket.cursor())
        })
    });

    group.bench_function("tile_64", |b| {
        b.iter(|| {
            let mut ticket = conv.ticket(Rect::new(64, 64, 64, 64)).unwrap();
            conv.run_pixels(&mut ticket).unwrap();
            black_box(ticket.cursor())
        })
    });

    group.finish();
}

/// sRGB to Display P3 through lcms2.
fn bench_icc(c: &mut Criterion) {
    let mut group = c.benchmark_group("icc");
    let mut engine = Engine::with_builtins(EngineConfig::default());
    colorflow_icc::register(&mut engine).unwrap();
    let engine = engine.shared();
    let srgb = IccIdentity::srgb().unwrap().shared();
    let options = Options::new().with(PROFILE_OUT, "display-p3");
    let filters = [(ICC_LCMS2, options)];
    let conv = Conversion::chain(engine, rgb_image(256, Some(srgb)), &filters, None).unwrap();
    group.throughput(Throughput::Elements(256 * 256));

    group.bench_function("srgb_to_p3_256", |b| {
        b.iter(|| {
            let mut ticket = conv.full_ticket().unwrap();
            conv.run_pixels(&mut ticket).unwrap();
            black_box(ticket.cursor())
        })
    });

    group.finish();
}

/// Context key hashing and cache lookups.
fn bench_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache");
    let layout = PixelLayout::rgb8().with_sample(SampleType::U16);

    group.bench_function("key_builder", |b| {
        b.iter(|| {
            let mut builder = KeyBuilder::new();
            builder
                .field(b"registration", OFFSET.as_bytes())
                .field(b"layout", &layout.encode().to_le_bytes())
                .field(b"offset", &OptionValue::from("12").identity());
            black_box(builder.finish())
        })
    });

    let engine = Engine::with_builtins(EngineConfig::default());
    let key = ContextKey::from_bytes([7; 32]);
    engine
        .cache()
        .get_or_build(key, || Ok(Arc::new(0u32) as SharedContext))
        .unwrap();
    group.bench_function("hit", |b| {
        b.iter(|| {
            black_box(
                engine
                    .cache()
                    .get_or_build(black_box(key), || Ok(Arc::new(1u32) as SharedContext))
                    .unwrap(),
            )
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_offset_pull,
    bench_buffered_chain,
    bench_icc,
    bench_cache,
);

criterion_main!(benches);
