//! # Thumbnail Cache
//!
//! Compute and cache thumbnails of web-rendered charts and dashboards.
//!
//! A thumbnail is addressed by a cache key derived from what is rendered (the
//! content digest and kind) and how (window and thumbnail sizes). Looking one
//! up either serves the cached bytes or captures the page in a headless
//! browser, crops and resizes the capture, and caches the result.
//!
//! ## Pipeline
//!
//! | Step | Component | Failure handling |
//! |------|-----------|------------------|
//! | Key derivation | [`CacheKey`] | Infallible |
//! | Cache lookup | [`ThumbnailCache`] | Propagated to the caller |
//! | Capture | [`ScreenshotDriver`] | Logged, thumbnail reported absent |
//! | Crop & resize | [`resize_image`] | Logged, thumbnail reported absent |
//! | Cache write | [`ThumbnailCache`] | Propagated to the caller |
//!
//! An absent thumbnail is never an error: callers show a placeholder and try
//! again later.
//!
//! ## Default sizes
//!
//! | Kind | Window | Thumbnail | Captured element | `standalone` |
//! |------|--------|-----------|------------------|--------------|
//! | Chart | 800x600 | 800x600 | `.chart-container` | `true` |
//! | Dashboard | 1600x1200 | 800x600 | `.standalone` | `3` |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use thumbnail_cache::{ChromeDriver, Config, FileCache, Identity, Screenshot, ScreenshotKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let driver = Arc::new(ChromeDriver::new(config.driver.clone()));
//!     let cache = FileCache::new(config.cache_dir.clone());
//!
//!     let request = config.request(
//!         ScreenshotKind::Chart,
//!         "http://localhost:8088/explore/?slice_id=42",
//!         "5b0e5d1c",
//!     )?;
//!     let screenshot = Screenshot::from_config(request, driver, &config);
//!
//!     if let Some(thumbnail) = screenshot.get(&Identity::user("admin"), &cache, None).await? {
//!         println!("Thumbnail: {} bytes", thumbnail.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! thumbnail-cache --username admin --cookie session=... \
//!     get --kind dashboard --url http://localhost:8088/superset/dashboard/1/ --digest 5b0e5d1c
//!
//! thumbnail-cache warm --kind chart --url http://localhost:8088/explore/?slice_id=42 \
//!     --digest 5b0e5d1c --thumb 400x300
//! ```

/// Thumbnail storage backends
pub mod cache;

/// Configuration, sizes and request types
pub mod config;

/// Browser automation boundary and the headless Chrome driver
pub mod driver;

/// Error types
pub mod error;

/// Cache key derivation
pub mod key;

/// Compute-or-reuse orchestration
pub mod screenshot;

/// Crop and resize of captured images
pub mod transform;

/// Query string rewriting
pub mod urls;

/// Command-line interface implementation
pub mod cli;

/// Metrics for cache and render outcomes
pub mod telemetry;

/// Formatting helpers
pub mod utils;


pub use cache::*;
pub use cli::*;
pub use config::*;
pub use driver::*;
pub use error::*;
pub use key::*;
pub use screenshot::*;
pub use telemetry::*;
pub use transform::*;
pub use urls::*;
pub use utils::*;
