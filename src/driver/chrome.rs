use super::{Identity, ScreenshotDriver};
use crate::{CaptureError, DriverConfig, WindowSize};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::Path;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Headless Chrome driver
///
/// Every capture launches its own browser with a throwaway profile and
/// closes it afterwards; nothing is shared between captures. The whole
/// capture, launch included, is bounded by `screenshot_timeout`.
#[derive(Debug, Clone)]
pub struct ChromeDriver {
    config: DriverConfig,
}

/// Aborts the browser event handler when dropped
///
/// A capture cut short by the timeout is dropped at whatever await it was
/// parked on, so the handler is not left running behind it.
struct HandlerTask(JoinHandle<()>);

impl Drop for HandlerTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl ChromeDriver {
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }

    async fn capture_in_browser(
        &self,
        url: &str,
        element_selector: &str,
        identity: &Identity,
        window_size: WindowSize,
    ) -> Result<Vec<u8>, CaptureError> {
        // Dropped last: the profile outlives the browser using it
        let profile_dir = create_profile_dir()?;

        let browser_config = create_browser_config(&self.config, window_size, profile_dir.path())?;
        let (mut browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| CaptureError::BrowserLaunchFailed(e.to_string()))?;

        // The handler drives the DevTools connection and must be polled
        let _handler_task = HandlerTask(tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Handler error: {}", e);
                    break;
                }
            }
        }));

        let result = self
            .capture_page(&browser, url, element_selector, identity, window_size)
            .await;

        if let Err(e) = browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
        let _ = browser.wait().await;

        result
    }

    async fn capture_page(
        &self,
        browser: &Browser,
        url: &str,
        element_selector: &str,
        identity: &Identity,
        window_size: WindowSize,
    ) -> Result<Vec<u8>, CaptureError> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| CaptureError::NavigationFailed(e.to_string()))?;

        let result = self
            .render_element(&page, url, element_selector, identity, window_size)
            .await;

        let _ = page.close().await;
        result
    }

    async fn render_element(
        &self,
        page: &Page,
        url: &str,
        element_selector: &str,
        identity: &Identity,
        window_size: WindowSize,
    ) -> Result<Vec<u8>, CaptureError> {
        let emulation_params = SetDeviceMetricsOverrideParams::builder()
            .width(window_size.width)
            .height(window_size.height)
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(CaptureError::CaptureFailed)?;

        page.execute(emulation_params)
            .await
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;

        if !identity.cookies.is_empty() {
            page.set_cookies(session_cookies(identity, url)?)
                .await
                .map_err(|e| CaptureError::InvalidIdentity(e.to_string()))?;
        }

        if identity.is_anonymous() {
            debug!("Loading {} anonymously", url);
        } else {
            debug!(
                "Loading {} as {}",
                url,
                identity.username.as_deref().unwrap_or("cookie session")
            );
        }
        page.goto(url)
            .await
            .map_err(|e| CaptureError::NavigationFailed(e.to_string()))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| CaptureError::NavigationFailed(e.to_string()))?;

        if let Some(delay) = self.config.settle_delay {
            sleep(delay).await;
        }

        let element = page
            .find_element(element_selector)
            .await
            .map_err(|e| CaptureError::ElementNotFound(format!("{element_selector}: {e}")))?;

        element
            .screenshot(CaptureScreenshotFormat::Png)
            .await
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))
    }
}

#[async_trait]
impl ScreenshotDriver for ChromeDriver {
    async fn capture(
        &self,
        url: &str,
        element_selector: &str,
        identity: &Identity,
        window_size: WindowSize,
    ) -> Result<Vec<u8>, CaptureError> {
        let capture = self.capture_in_browser(url, element_selector, identity, window_size);

        match timeout(self.config.screenshot_timeout, capture).await {
            Ok(result) => result,
            Err(_) => Err(CaptureError::Timeout(self.config.screenshot_timeout)),
        }
    }
}

pub fn create_browser_config(
    config: &DriverConfig,
    window_size: WindowSize,
    profile_dir: &Path,
) -> Result<BrowserConfig, CaptureError> {
    let mut builder = BrowserConfig::builder()
        .window_size(window_size.width, window_size.height)
        .args(config.chrome_args(window_size, profile_dir));

    if let Some(chrome_path) = &config.chrome_path {
        builder = builder.chrome_executable(chrome_path);
    }

    builder.build().map_err(CaptureError::BrowserLaunchFailed)
}

/// Fresh browser profile directory, removed together with its contents on drop.
fn create_profile_dir() -> Result<TempDir, CaptureError> {
    tempfile::Builder::new()
        .prefix("thumbnail-cache-profile-")
        .tempdir()
        .map_err(|e| {
            CaptureError::BrowserLaunchFailed(format!("Failed to create profile dir: {e}"))
        })
}

/// Cookies of `identity`, scoped to the origin of `url`.
fn session_cookies(identity: &Identity, url: &str) -> Result<Vec<CookieParam>, CaptureError> {
    identity
        .cookies
        .iter()
        .map(|cookie| {
            CookieParam::builder()
                .name(cookie.name.clone())
                .value(cookie.value.clone())
                .url(url)
                .build()
                .map_err(CaptureError::InvalidIdentity)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionCookie;
    use std::sync::Arc;

    #[test]
    fn test_browser_config_creation() {
        let config = DriverConfig {
            chrome_path: Some("/usr/bin/chromium".to_string()),
            ..Default::default()
        };
        let profile_dir = create_profile_dir().unwrap();
        let browser_config =
            create_browser_config(&config, WindowSize::new(800, 600), profile_dir.path());
        assert!(browser_config.is_ok());
    }

    #[test]
    fn test_profile_dir_is_removed_on_drop() {
        let profile_dir = create_profile_dir().unwrap();
        let path = profile_dir.path().to_path_buf();
        std::fs::create_dir_all(path.join("Default")).unwrap();
        std::fs::write(path.join("Default").join("Cookies"), b"session").unwrap();
        assert!(path.exists());

        drop(profile_dir);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_handler_task_is_aborted_on_drop() {
        let alive = Arc::new(());
        let held = alive.clone();
        let task = HandlerTask(tokio::spawn(async move {
            let _held = held;
            futures::future::pending::<()>().await;
        }));

        drop(task);
        for _ in 0..100 {
            if Arc::strong_count(&alive) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(Arc::strong_count(&alive), 1);
    }

    #[test]
    fn test_session_cookies_are_scoped_to_url() {
        let identity = Identity::user("admin")
            .with_cookie(SessionCookie::new("session", "s3cr3t"))
            .with_cookie(SessionCookie::new("csrf", "token"));
        let cookies = session_cookies(&identity, "http://localhost:8088/dashboard/1/").unwrap();
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].name, "session");
        assert_eq!(cookies[0].value, "s3cr3t");
        assert_eq!(cookies[1].url.as_deref(), Some("http://localhost:8088/dashboard/1/"));
    }

    #[tokio::test]
    async fn test_unlaunchable_browser_is_a_capture_error() {
        let driver = ChromeDriver::new(DriverConfig {
            chrome_path: Some("/nonexistent/chrome".to_string()),
            ..Default::default()
        });
        let err = driver
            .capture(
                "http://localhost:8088/",
                ".chart-container",
                &Identity::anonymous(),
                WindowSize::new(800, 600),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::BrowserLaunchFailed(_)));
    }
}
