use crate::WindowSize;
use std::time::Duration;
use thiserror::Error;

/// The driver could not produce raw bytes for a page
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    #[error("Browser launch failed: {0}")]
    BrowserLaunchFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Screenshot capture failed: {0}")]
    CaptureFailed(String),

    #[error("Capture returned no image data")]
    EmptyCapture,

    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

impl CaptureError {
    /// Whether a later attempt has a reasonable chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CaptureError::BrowserLaunchFailed(_)
                | CaptureError::NavigationFailed(_)
                | CaptureError::CaptureFailed(_)
                | CaptureError::EmptyCapture
                | CaptureError::Timeout(_)
        )
    }
}

/// Decode, crop, resize or encode failure on captured bytes
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("Image decode failed: {0}")]
    Decode(String),

    #[error("Degenerate size: {0}")]
    DegenerateSize(WindowSize),

    #[error("Size {0} exceeds the maximum dimension")]
    OversizedSize(WindowSize),

    #[error("Crop of {width}x{height} image collapses to zero height")]
    EmptyCrop { width: u32, height: u32 },

    #[error("Image encode failed: {0}")]
    Encode(String),
}

/// Why the render pipeline produced no payload
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("transform failed: {0}")]
    Transform(#[from] TransformError),
}

/// Failure reported by a cache backend
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Cache IO error: {0}")]
    Io(String),

    #[error("Invalid cache key: {0}")]
    InvalidKey(String),
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(err.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum ThumbnailError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Thumbnail unavailable: {0}")]
    Unavailable(String),

    #[error("Metrics error: {0}")]
    MetricsError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl ThumbnailError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ThumbnailError::Unavailable(_) => ErrorSeverity::Low,
            ThumbnailError::InvalidUrl(_) => ErrorSeverity::Low,
            ThumbnailError::ConfigurationError(_) => ErrorSeverity::High,
            ThumbnailError::Cache(CacheError::Unavailable(_)) => ErrorSeverity::High,
            _ => ErrorSeverity::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
}

impl From<std::io::Error> for ThumbnailError {
    fn from(err: std::io::Error) -> Self {
        ThumbnailError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ThumbnailError {
    fn from(err: serde_json::Error) -> Self {
        ThumbnailError::SerializationError(err.to_string())
    }
}
