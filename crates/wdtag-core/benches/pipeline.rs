//! Benchmarks for the wdtag tagging pipeline.
//!
//! Run with: cargo bench -p wdtag-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use wdtag_core::inference::preprocess;
use wdtag_core::tagging::mcut_threshold;

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
    }))
}

fn benchmark_preprocess(c: &mut Criterion) {
    let mut group = c.benchmark_group("preprocess_448");
    for (w, h) in [(448, 448), (1920, 1080), (512, 768)] {
        let img = gradient(w, h);
        group.bench_with_input(BenchmarkId::from_parameter(format!("{w}x{h}")), &img, |b, img| {
            b.iter(|| preprocess(black_box(img), 448))
        });
    }
    group.finish();
}

fn benchmark_preprocess_alpha(c: &mut Criterion) {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1024, 1024, Rgba([40, 80, 120, 128])));

    c.bench_function("preprocess_448_rgba", |b| {
        b.iter(|| preprocess(black_box(&img), 448))
    });
}

fn benchmark_mcut(c: &mut Criterion) {
    // Roughly the size of the general category in the v3 vocabularies.
    let scores: Vec<f32> = (0..9000u32)
        .map(|i| ((i.wrapping_mul(2654435761) >> 8) % 10_000) as f32 / 10_000.0)
        .collect();

    c.bench_function("mcut_threshold_9000", |b| {
        b.iter(|| mcut_threshold(black_box(&scores)))
    });
}

criterion_group!(
    benches,
    benchmark_preprocess,
    benchmark_preprocess_alpha,
    benchmark_mcut,
);
criterion_main!(benches);
