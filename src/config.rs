//! Configuration management with serde serialization/deserialization
//!
//! This module provides the configuration structures for the thumbnail cache,
//! including driver settings, per-kind size presets and output formats, along
//! with the request types that flow through the orchestrator.

use crate::{modify_url_query, ThumbnailError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure for the thumbnail cache
///
/// Controls the browser driver, the default sizes used for each kind of
/// snapshot, and how thumbnails are encoded and stored.
///
/// # Examples
///
/// ```rust
/// use thumbnail_cache::{Config, OutputFormat};
///
/// // Use default configuration
/// let config = Config::default();
///
/// // Create custom configuration
/// let config = Config {
///     output_format: OutputFormat::Jpeg,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Browser driver settings
    pub driver: DriverConfig,

    /// Window and thumbnail sizes used for charts (default: 800x600 / 800x600)
    pub chart: SizePreset,

    /// Window and thumbnail sizes used for dashboards (default: 1600x1200 / 800x600)
    pub dashboard: SizePreset,

    /// Encoding of the cached thumbnails (default: PNG)
    pub output_format: OutputFormat,

    /// Crop captures whose height drifted from the requested window (default: true)
    pub crop: bool,

    /// Directory used by the file-backed cache (default: `.thumbnail-cache`)
    pub cache_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            driver: DriverConfig::default(),
            chart: ScreenshotKind::Chart.default_sizes(),
            dashboard: ScreenshotKind::Dashboard.default_sizes(),
            output_format: OutputFormat::Png,
            crop: true,
            cache_dir: PathBuf::from(".thumbnail-cache"),
        }
    }
}

impl Config {
    /// Load a JSON configuration file. Missing fields fall back to defaults.
    pub async fn load(path: &Path) -> Result<Self, ThumbnailError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Size preset configured for the given kind.
    pub fn sizes(&self, kind: ScreenshotKind) -> SizePreset {
        match kind {
            ScreenshotKind::Chart => self.chart,
            ScreenshotKind::Dashboard => self.dashboard,
        }
    }

    /// Build a request for `kind` using this configuration's size presets.
    pub fn request(
        &self,
        kind: ScreenshotKind,
        url: &str,
        digest: &str,
    ) -> Result<SnapshotRequest, ThumbnailError> {
        let sizes = self.sizes(kind);
        SnapshotRequest::new(
            kind,
            url,
            digest,
            Some(sizes.window_size),
            Some(sizes.thumb_size),
        )
    }

    pub fn validate(&self) -> Result<(), ThumbnailError> {
        if self.driver.screenshot_timeout.is_zero() {
            return Err(ThumbnailError::ConfigurationError(
                "Screenshot timeout must be greater than 0".to_string(),
            ));
        }

        for (name, preset) in [("chart", self.chart), ("dashboard", self.dashboard)] {
            if preset.window_size.is_degenerate() || preset.thumb_size.is_degenerate() {
                return Err(ThumbnailError::ConfigurationError(format!(
                    "{name} window and thumbnail dimensions must be greater than 0"
                )));
            }
            if preset.window_size.is_oversized() || preset.thumb_size.is_oversized() {
                return Err(ThumbnailError::ConfigurationError(format!(
                    "{name} window and thumbnail dimensions must not exceed {}",
                    WindowSize::MAX_DIMENSION
                )));
            }
        }

        if self.cache_dir.as_os_str().is_empty() {
            return Err(ThumbnailError::ConfigurationError(
                "Cache directory must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Settings for the headless Chrome driver
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Path to Chrome/Chromium executable (default: auto-detect)
    pub chrome_path: Option<String>,

    /// Upper bound for a whole capture, browser launch included (default: 60 seconds)
    pub screenshot_timeout: Duration,

    /// Extra time given to the page to finish rendering before the element
    /// is captured (default: 2 seconds)
    ///
    /// Charts usually animate in after the page load event fires.
    pub settle_delay: Option<Duration>,

    /// Custom User-Agent string for requests (default: Chrome default)
    pub user_agent: Option<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            screenshot_timeout: Duration::from_secs(60),
            settle_delay: Some(Duration::from_secs(2)),
            user_agent: None,
        }
    }
}

impl DriverConfig {
    /// Generate Chrome command-line arguments for a capture at `window_size`
    /// using the browser profile stored in `profile_dir`
    pub fn chrome_args(&self, window_size: WindowSize, profile_dir: &Path) -> Vec<String> {
        let mut args = vec![
            "--headless".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-gpu".to_string(),
            "--hide-scrollbars".to_string(),
            "--disable-extensions".to_string(),
            "--disable-default-apps".to_string(),
            "--disable-sync".to_string(),
            "--no-first-run".to_string(),
            format!("--window-size={},{}", window_size.width, window_size.height),
            format!("--user-data-dir={}", profile_dir.display()),
        ];

        if let Some(user_agent) = &self.user_agent {
            args.push(format!("--user-agent={user_agent}"));
        }

        args
    }
}

/// A width/height pair in pixels, used for both browser windows and thumbnails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl WindowSize {
    /// Largest accepted width or height
    pub const MAX_DIMENSION: u32 = 8192;

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True when either dimension is above [`WindowSize::MAX_DIMENSION`].
    pub fn is_oversized(&self) -> bool {
        self.width > Self::MAX_DIMENSION || self.height > Self::MAX_DIMENSION
    }
}

impl fmt::Display for WindowSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for WindowSize {
    type Err = ThumbnailError;

    /// Parses `WIDTHxHEIGHT`, e.g. `800x600`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ThumbnailError::ConfigurationError(format!("Invalid size: {s:?}"));
        let (width, height) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width = width.trim().parse().map_err(|_| invalid())?;
        let height = height.trim().parse().map_err(|_| invalid())?;

        let size = Self::new(width, height);
        if size.is_oversized() {
            return Err(ThumbnailError::ConfigurationError(format!(
                "Size {size} exceeds the maximum dimension of {}",
                Self::MAX_DIMENSION
            )));
        }
        Ok(size)
    }
}

/// Window size to capture at and thumbnail size to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct SizePreset {
    pub window_size: WindowSize,
    pub thumb_size: WindowSize,
}

/// Supported output image formats for thumbnails
///
/// - PNG: lossless, keeps the alpha channel (default)
/// - JPEG: lossy, alpha is dropped before encoding
/// - WebP: alpha is dropped before encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl OutputFormat {
    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            OutputFormat::Png => image::ImageFormat::Png,
            OutputFormat::Jpeg => image::ImageFormat::Jpeg,
            OutputFormat::Webp => image::ImageFormat::WebP,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Webp => "webp",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ThumbnailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "webp" => Ok(OutputFormat::Webp),
            other => Err(ThumbnailError::ConfigurationError(format!(
                "Unsupported output format: {other}"
            ))),
        }
    }
}

/// What is being rendered
///
/// Charts and dashboards go through exactly the same pipeline; they only
/// differ in the element captured, the standalone mode forced on the URL
/// and their default sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenshotKind {
    Chart,
    Dashboard,
}

impl ScreenshotKind {
    /// Name used in cache keys and metric labels.
    pub fn thumbnail_type(&self) -> &'static str {
        match self {
            ScreenshotKind::Chart => "chart",
            ScreenshotKind::Dashboard => "dashboard",
        }
    }

    /// CSS selector of the element that gets captured.
    pub fn element_selector(&self) -> &'static str {
        match self {
            ScreenshotKind::Chart => ".chart-container",
            ScreenshotKind::Dashboard => ".standalone",
        }
    }

    /// Value of the `standalone` query parameter.
    ///
    /// Charts hide the navigation (`true`), dashboards switch to report mode (`3`).
    pub fn standalone_mode(&self) -> &'static str {
        match self {
            ScreenshotKind::Chart => "true",
            ScreenshotKind::Dashboard => "3",
        }
    }

    pub fn default_sizes(&self) -> SizePreset {
        match self {
            ScreenshotKind::Chart => SizePreset {
                window_size: WindowSize::new(800, 600),
                thumb_size: WindowSize::new(800, 600),
            },
            ScreenshotKind::Dashboard => SizePreset {
                window_size: WindowSize::new(1600, 1200),
                thumb_size: WindowSize::new(800, 600),
            },
        }
    }
}

impl fmt::Display for ScreenshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.thumbnail_type())
    }
}

impl FromStr for ScreenshotKind {
    type Err = ThumbnailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chart" => Ok(ScreenshotKind::Chart),
            "dashboard" => Ok(ScreenshotKind::Dashboard),
            other => Err(ThumbnailError::ConfigurationError(format!(
                "Unknown screenshot kind: {other}"
            ))),
        }
    }
}

/// A single chart or dashboard to snapshot
///
/// The URL is rewritten to the kind's standalone rendering mode when the
/// request is built, and absent sizes are filled from the kind's defaults.
/// Fields are private so a request cannot change after construction.
///
/// # Examples
///
/// ```rust
/// use thumbnail_cache::{SnapshotRequest, WindowSize};
///
/// let request =
///     SnapshotRequest::chart("https://bi.example.com/explore/?slice_id=1", "abc123").unwrap();
/// assert_eq!(request.window_size(), WindowSize::new(800, 600));
/// assert!(request.url().contains("standalone=true"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRequest {
    kind: ScreenshotKind,
    url: String,
    content_digest: String,
    window_size: WindowSize,
    thumb_size: WindowSize,
}

impl SnapshotRequest {
    pub fn new(
        kind: ScreenshotKind,
        url: &str,
        content_digest: &str,
        window_size: Option<WindowSize>,
        thumb_size: Option<WindowSize>,
    ) -> Result<Self, ThumbnailError> {
        let defaults = kind.default_sizes();
        let url = modify_url_query(url, "standalone", kind.standalone_mode())?;

        Ok(Self {
            kind,
            url: url.to_string(),
            content_digest: content_digest.to_string(),
            window_size: window_size.unwrap_or(defaults.window_size),
            thumb_size: thumb_size.unwrap_or(defaults.thumb_size),
        })
    }

    pub fn chart(url: &str, content_digest: &str) -> Result<Self, ThumbnailError> {
        Self::new(ScreenshotKind::Chart, url, content_digest, None, None)
    }

    pub fn dashboard(url: &str, content_digest: &str) -> Result<Self, ThumbnailError> {
        Self::new(ScreenshotKind::Dashboard, url, content_digest, None, None)
    }

    pub fn kind(&self) -> ScreenshotKind {
        self.kind
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn content_digest(&self) -> &str {
        &self.content_digest
    }

    pub fn element_selector(&self) -> &'static str {
        self.kind.element_selector()
    }

    pub fn window_size(&self) -> WindowSize {
        self.window_size
    }

    pub fn thumb_size(&self) -> WindowSize {
        self.thumb_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.chart.window_size, WindowSize::new(800, 600));
        assert_eq!(config.chart.thumb_size, WindowSize::new(800, 600));
        assert_eq!(config.dashboard.window_size, WindowSize::new(1600, 1200));
        assert_eq!(config.dashboard.thumb_size, WindowSize::new(800, 600));
        assert_eq!(config.output_format, OutputFormat::Png);
        assert!(config.crop);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_degenerate_sizes() {
        let config = Config {
            dashboard: SizePreset {
                window_size: WindowSize::new(1600, 0),
                thumb_size: WindowSize::new(800, 600),
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ThumbnailError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_config_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"output_format": "jpeg"}"#).unwrap();
        assert_eq!(config.output_format, OutputFormat::Jpeg);
        assert_eq!(config.dashboard, ScreenshotKind::Dashboard.default_sizes());
    }

    #[test]
    fn test_output_format_json_matches_cli_spelling() {
        assert_eq!(serde_json::to_string(&OutputFormat::Webp).unwrap(), r#""webp""#);
        let parsed: OutputFormat = serde_json::from_str(r#""webp""#).unwrap();
        assert_eq!(parsed, "webp".parse::<OutputFormat>().unwrap());
    }

    #[test]
    fn test_config_rejects_oversized_sizes() {
        let config = Config {
            chart: SizePreset {
                window_size: WindowSize::new(800, 600),
                thumb_size: WindowSize::new(200_000, 200_000),
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ThumbnailError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_window_size_parse() {
        assert_eq!("800x600".parse::<WindowSize>().unwrap(), WindowSize::new(800, 600));
        assert_eq!(" 1600X1200 ".parse::<WindowSize>().unwrap(), WindowSize::new(1600, 1200));
        assert!("800".parse::<WindowSize>().is_err());
        assert!("axb".parse::<WindowSize>().is_err());
        assert!("200000x200000".parse::<WindowSize>().is_err());
        assert!("8192x8192".parse::<WindowSize>().is_ok());
        assert_eq!(WindowSize::new(400, 300).to_string(), "400x300");
    }

    #[test]
    fn test_chrome_args_generation() {
        let profile_dir = Path::new("/tmp/thumbnail-cache-profile");
        let args = DriverConfig::default().chrome_args(WindowSize::new(1600, 1200), profile_dir);
        assert!(args.contains(&"--headless".to_string()));
        assert!(args.contains(&"--window-size=1600,1200".to_string()));
        assert!(args.contains(&"--user-data-dir=/tmp/thumbnail-cache-profile".to_string()));
    }

    #[test]
    fn test_request_defaults_per_kind() {
        let chart =
            SnapshotRequest::chart("http://localhost:8088/explore/?slice_id=7", "d1").unwrap();
        assert_eq!(chart.window_size(), WindowSize::new(800, 600));
        assert_eq!(chart.thumb_size(), WindowSize::new(800, 600));
        assert_eq!(chart.element_selector(), ".chart-container");
        assert!(chart.url().contains("standalone=true"));
        assert!(chart.url().contains("slice_id=7"));

        let dashboard =
            SnapshotRequest::dashboard("http://localhost:8088/dashboard/3/", "d2").unwrap();
        assert_eq!(dashboard.window_size(), WindowSize::new(1600, 1200));
        assert_eq!(dashboard.thumb_size(), WindowSize::new(800, 600));
        assert_eq!(dashboard.element_selector(), ".standalone");
        assert!(dashboard.url().ends_with("standalone=3"));
    }

    #[test]
    fn test_request_explicit_sizes_win() {
        let request = SnapshotRequest::new(
            ScreenshotKind::Dashboard,
            "http://localhost:8088/dashboard/3/",
            "d2",
            Some(WindowSize::new(1024, 768)),
            None,
        )
        .unwrap();
        assert_eq!(request.window_size(), WindowSize::new(1024, 768));
        assert_eq!(request.thumb_size(), WindowSize::new(800, 600));
    }

    #[test]
    fn test_request_rejects_relative_url() {
        assert!(matches!(
            SnapshotRequest::chart("/explore/?slice_id=1", "d"),
            Err(ThumbnailError::InvalidUrl(_))
        ));
    }
}
