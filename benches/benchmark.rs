use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use thumbnail_cache::{
    resize_image, CacheKey, CaptureError, Identity, MemoryCache, OutputFormat, Screenshot,
    ScreenshotDriver, ScreenshotKind, SnapshotRequest, WindowSize,
};

#[cfg(feature = "integration_benchmarks")]
use thumbnail_cache::{ChromeDriver, DriverConfig};
#[cfg(feature = "integration_benchmarks")]
use tokio::runtime::Runtime;

// Fast settings for all benchmarks
fn configure_fast_group(group: &mut criterion::BenchmarkGroup<criterion::measurement::WallTime>) {
    group.warm_up_time(Duration::from_millis(500));
    group.measurement_time(Duration::from_millis(500));
    group.sample_size(20);
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 64, 255])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// Driver returning the same capture every time
struct StaticDriver(Vec<u8>);

#[async_trait]
impl ScreenshotDriver for StaticDriver {
    async fn capture(
        &self,
        _url: &str,
        _element_selector: &str,
        _identity: &Identity,
        _window_size: WindowSize,
    ) -> Result<Vec<u8>, CaptureError> {
        Ok(self.0.clone())
    }
}

// === UNIT BENCHMARKS ===

fn benchmark_key_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_key");
    configure_fast_group(&mut group);

    group.bench_function("derive", |b| {
        b.iter(|| {
            let key = CacheKey::derive(
                black_box(ScreenshotKind::Dashboard),
                black_box("5b0e5d1c9a"),
                WindowSize::new(1600, 1200),
                WindowSize::new(800, 600),
            );
            black_box(key);
        });
    });

    group.finish();
}

fn benchmark_request_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_request");
    configure_fast_group(&mut group);

    group.bench_function("creation", |b| {
        b.iter(|| {
            let request = SnapshotRequest::chart(
                black_box("http://localhost:8088/explore/?slice_id=42&standalone=0"),
                "5b0e5d1c9a",
            )
            .unwrap();
            black_box(request);
        });
    });

    group.finish();
}

fn benchmark_resize(c: &mut Criterion) {
    let mut group = c.benchmark_group("resize_image");
    configure_fast_group(&mut group);

    let dashboard = png(1600, 1200);
    let drifted = png(800, 650);

    group.bench_function("dashboard_png", |b| {
        b.iter(|| {
            let thumb = resize_image(
                black_box(&dashboard),
                WindowSize::new(1600, 1200),
                WindowSize::new(800, 600),
                OutputFormat::Png,
                true,
            )
            .unwrap();
            black_box(thumb);
        });
    });

    group.bench_function("cropped_jpeg", |b| {
        b.iter(|| {
            let thumb = resize_image(
                black_box(&drifted),
                WindowSize::new(800, 600),
                WindowSize::new(400, 300),
                OutputFormat::Jpeg,
                true,
            )
            .unwrap();
            black_box(thumb);
        });
    });

    group.finish();
}

fn benchmark_cache_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("screenshot_get");
    configure_fast_group(&mut group);

    let request =
        SnapshotRequest::chart("http://localhost:8088/explore/?slice_id=42", "5b0e5d1c9a").unwrap();
    let screenshot = Screenshot::new(request, Arc::new(StaticDriver(png(800, 600))));
    let cache = MemoryCache::new();
    let identity = Identity::anonymous();

    tokio_test::block_on(screenshot.get(&identity, &cache, None)).unwrap();

    group.bench_function("cache_hit", |b| {
        b.iter(|| {
            let thumbnail = tokio_test::block_on(screenshot.get(&identity, &cache, None)).unwrap();
            black_box(thumbnail);
        });
    });

    group.finish();
}

// === INTEGRATION BENCHMARKS (require Chrome) ===

#[cfg(feature = "integration_benchmarks")]
fn benchmark_chrome_capture(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("chrome_capture");
    configure_fast_group(&mut group);

    let driver = ChromeDriver::new(DriverConfig {
        screenshot_timeout: Duration::from_secs(10),
        settle_delay: None,
        ..Default::default()
    });

    group.bench_function("example_body", |b| {
        b.iter(|| {
            rt.block_on(async {
                let result = driver
                    .capture(
                        "https://example.com",
                        "body",
                        &Identity::anonymous(),
                        WindowSize::new(800, 600),
                    )
                    .await;
                black_box(result.is_ok());
            })
        });
    });

    group.finish();
}

// === BENCHMARK GROUPS ===

criterion_group!(
    unit_benches,
    benchmark_key_derivation,
    benchmark_request_creation,
    benchmark_resize,
    benchmark_cache_hit,
);

#[cfg(feature = "integration_benchmarks")]
criterion_group!(integration_benches, benchmark_chrome_capture);

#[cfg(feature = "integration_benchmarks")]
criterion_main!(unit_benches, integration_benches);

#[cfg(not(feature = "integration_benchmarks"))]
criterion_main!(unit_benches);
