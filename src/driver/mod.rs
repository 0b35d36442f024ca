//! Browser automation boundary
//!
//! The orchestrator only sees [`ScreenshotDriver`]; [`ChromeDriver`] is the
//! headless Chrome implementation used by the command-line tool.

mod chrome;

pub use chrome::*;

use crate::{CaptureError, ThumbnailError, WindowSize};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Captures an element of a rendered page as an encoded image
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScreenshotDriver: Send + Sync {
    /// Load `url` as `identity` in a window of `window_size` and capture the
    /// element matching `element_selector`.
    async fn capture(
        &self,
        url: &str,
        element_selector: &str,
        identity: &Identity,
        window_size: WindowSize,
    ) -> Result<Vec<u8>, CaptureError>;
}

/// Who the page is rendered for
///
/// The driver uses the session cookies to pass the target page's access
/// control; how they were obtained is up to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Identity {
    pub username: Option<String>,
    pub cookies: Vec<SessionCookie>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            cookies: Vec::new(),
        }
    }

    pub fn with_cookie(mut self, cookie: SessionCookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_none() && self.cookies.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl FromStr for SessionCookie {
    type Err = ThumbnailError;

    /// Parses `NAME=VALUE`; the value may itself contain `=`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                Ok(Self::new(name.trim(), value))
            }
            _ => Err(ThumbnailError::ConfigurationError(format!(
                "Invalid cookie {s:?}, expected NAME=VALUE"
            ))),
        }
    }
}
