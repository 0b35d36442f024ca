//! Snapshot orchestration
//!
//! This module provides [`Screenshot`], which resolves a thumbnail for a
//! chart or dashboard: it derives the cache key, serves cached payloads, and
//! on a miss captures the page through the driver, resizes the capture and
//! stores the result.
//!
//! Capture and transform failures never reach the caller. They are logged
//! with the cache key and reported as an absent thumbnail, which callers treat
//! as "temporarily unavailable" and retry on their own schedule. Only cache
//! backend errors are propagated.

use crate::{
    resize_image, CacheError, CacheKey, CaptureError, Config, Identity, OutputFormat, RenderError,
    ScreenshotDriver, SnapshotRequest, ThumbnailCache, ThumbnailMetrics, WindowSize,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Encoded thumbnail bytes, the only artifact that is ever cached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail(Vec<u8>);

impl Thumbnail {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Thumbnail {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Thumbnail {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Compute-or-reuse thumbnails for one chart or dashboard
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use thumbnail_cache::{
///     ChromeDriver, DriverConfig, Identity, MemoryCache, Screenshot, SnapshotRequest,
/// };
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let url = "http://localhost:8088/superset/dashboard/1/";
///     let request = SnapshotRequest::dashboard(url, "9f2c")?;
///     let driver = Arc::new(ChromeDriver::new(DriverConfig::default()));
///     let screenshot = Screenshot::new(request, driver);
///
///     let cache = MemoryCache::new();
///     match screenshot.get(&Identity::user("admin"), &cache, None).await? {
///         Some(thumbnail) => println!("Thumbnail: {} bytes", thumbnail.len()),
///         None => println!("Thumbnail not available yet"),
///     }
///     Ok(())
/// }
/// ```
pub struct Screenshot {
    request: SnapshotRequest,
    driver: Arc<dyn ScreenshotDriver>,
    output_format: OutputFormat,
    crop: bool,
    metrics: ThumbnailMetrics,
}

impl Screenshot {
    pub fn new(request: SnapshotRequest, driver: Arc<dyn ScreenshotDriver>) -> Self {
        let metrics = ThumbnailMetrics::new(request.kind());
        Self {
            request,
            driver,
            output_format: OutputFormat::Png,
            crop: true,
            metrics,
        }
    }

    /// Build with the output format and crop setting of `config`.
    pub fn from_config(
        request: SnapshotRequest,
        driver: Arc<dyn ScreenshotDriver>,
        config: &Config,
    ) -> Self {
        Self::new(request, driver)
            .with_output_format(config.output_format)
            .with_crop(config.crop)
    }

    pub fn with_output_format(mut self, output_format: OutputFormat) -> Self {
        self.output_format = output_format;
        self
    }

    pub fn with_crop(mut self, crop: bool) -> Self {
        self.crop = crop;
        self
    }

    pub fn request(&self) -> &SnapshotRequest {
        &self.request
    }

    /// Cache key for the given sizes, falling back to the request's sizes.
    pub fn cache_key(
        &self,
        window_size: Option<WindowSize>,
        thumb_size: Option<WindowSize>,
    ) -> CacheKey {
        CacheKey::derive(
            self.request.kind(),
            self.request.content_digest(),
            window_size.unwrap_or(self.request.window_size()),
            thumb_size.unwrap_or(self.request.thumb_size()),
        )
    }

    /// Cached thumbnail, computing and caching it on a miss.
    ///
    /// `None` means the thumbnail could not be produced right now.
    pub async fn get(
        &self,
        identity: &Identity,
        cache: &dyn ThumbnailCache,
        thumb_size: Option<WindowSize>,
    ) -> Result<Option<Thumbnail>, CacheError> {
        let cache_key = self.cache_key(None, thumb_size);

        if let Some(thumbnail) = Self::get_from_cache_key(cache, &cache_key).await? {
            info!("Loaded thumbnail from cache: {}", cache_key);
            self.metrics.record_cache_hit();
            return Ok(Some(thumbnail));
        }

        self.metrics.record_cache_miss();
        self.compute_and_cache(identity, None, thumb_size, cache, true)
            .await
    }

    /// Cached thumbnail for the given sizes; never computes.
    pub async fn get_from_cache(
        &self,
        cache: &dyn ThumbnailCache,
        window_size: Option<WindowSize>,
        thumb_size: Option<WindowSize>,
    ) -> Result<Option<Thumbnail>, CacheError> {
        let cache_key = self.cache_key(window_size, thumb_size);
        Self::get_from_cache_key(cache, &cache_key).await
    }

    pub async fn get_from_cache_key(
        cache: &dyn ThumbnailCache,
        cache_key: &CacheKey,
    ) -> Result<Option<Thumbnail>, CacheError> {
        debug!("Attempting to get from cache: {}", cache_key);
        match cache.get(cache_key).await? {
            Some(payload) if !payload.is_empty() => Ok(Some(Thumbnail(payload))),
            _ => {
                debug!("Failed at getting from cache: {}", cache_key);
                Ok(None)
            }
        }
    }

    /// Capture, resize and cache the thumbnail.
    ///
    /// With `force` unset, an existing cache entry short-circuits the whole
    /// pipeline and nothing is returned. Otherwise the page is captured even
    /// when an entry exists. Capture and transform failures are logged and
    /// yield `Ok(None)` without touching the cache.
    pub async fn compute_and_cache(
        &self,
        identity: &Identity,
        window_size: Option<WindowSize>,
        thumb_size: Option<WindowSize>,
        cache: &dyn ThumbnailCache,
        force: bool,
    ) -> Result<Option<Thumbnail>, CacheError> {
        let cache_key = self.cache_key(window_size, thumb_size);
        let window_size = window_size.unwrap_or(self.request.window_size());
        let thumb_size = thumb_size.unwrap_or(self.request.thumb_size());

        if !force && Self::get_from_cache_key(cache, &cache_key).await?.is_some() {
            info!("Thumb already cached, skipping: {}", cache_key);
            self.metrics.record_skipped();
            return Ok(None);
        }

        info!("Processing url for thumbnail: {}", cache_key);
        let payload = match self.render(identity, window_size, thumb_size).await {
            Ok(payload) => payload,
            Err(RenderError::Capture(e)) => {
                warn!(
                    "Failed at generating thumbnail {} (retryable: {}): {}",
                    cache_key,
                    e.is_retryable(),
                    e
                );
                self.metrics.record_capture_failure();
                return Ok(None);
            }
            Err(RenderError::Transform(e)) => {
                warn!("Failed at resizing thumbnail {}: {}", cache_key, e);
                self.metrics.record_transform_failure();
                return Ok(None);
            }
        };

        info!("Caching thumbnail: {}", cache_key);
        cache.set(&cache_key, payload.clone()).await?;
        self.metrics.record_cached();
        debug!("Done caching thumbnail: {}", cache_key);

        Ok(Some(Thumbnail(payload)))
    }

    /// Capture the page at `window_size` and resize it to `thumb_size`.
    ///
    /// The capture is returned untouched when both sizes are equal.
    pub async fn render(
        &self,
        identity: &Identity,
        window_size: WindowSize,
        thumb_size: WindowSize,
    ) -> Result<Vec<u8>, RenderError> {
        let start_time = Instant::now();

        let captured = self
            .driver
            .capture(
                self.request.url(),
                self.request.element_selector(),
                identity,
                window_size,
            )
            .await?;
        if captured.is_empty() {
            return Err(CaptureError::EmptyCapture.into());
        }

        let payload = if window_size != thumb_size {
            resize_image(
                &captured,
                window_size,
                thumb_size,
                self.output_format,
                self.crop,
            )?
        } else {
            captured
        };

        self.metrics.record_render(start_time.elapsed());
        Ok(payload)
    }
}
