//! Chrome DevTools Protocol driver (feature `browser`).
//!
//! Elements found through CDP are kept in a registry and handed out as
//! opaque [`ElementHandle`]s. Re-running a query releases the remote objects
//! of its previous run; navigation releases everything.

#![allow(clippy::significant_drop_tightening, clippy::missing_errors_doc)]

use crate::driver::{ElementHandle, ListingDriver};
use crate::registry::HandleRegistry;
use crate::result::{StarsiftError, StarsiftResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::cdp::js_protocol::runtime::ReleaseObjectParams;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use tokio::sync::Mutex;

const SCROLL_JS: &str = "function() { this.scrollIntoView({block: 'center', inline: 'center'}); }";
const CLICK_JS: &str = "function() { this.click(); }";
const VISIBLE_JS: &str = "function() { \
    const r = this.getBoundingClientRect(); \
    const s = window.getComputedStyle(this); \
    return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; }";
const XHR_IDLE_JS: &str =
    "(typeof jQuery === 'undefined' || jQuery.active === undefined) ? null : jQuery.active === 0";

/// Browser launch settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Run without a visible window
    pub headless: bool,
    /// Chromium sandbox; disable in containers
    pub sandbox: bool,
    /// Chrome/Chromium executable, when not on PATH
    pub chromium_path: Option<String>,
    /// Window size
    pub window: (u32, u32),
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            sandbox: true,
            chromium_path: None,
            window: (1920, 1080),
        }
    }
}

impl LaunchOptions {
    /// Show the browser window
    #[must_use]
    pub const fn headed(mut self) -> Self {
        self.headless = false;
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }
}

/// [`ListingDriver`] backed by a real Chromium over CDP
pub struct CdpListingDriver {
    browser: Mutex<CdpBrowser>,
    page: CdpPage,
    elements: Mutex<HandleRegistry<Element>>,
    handler: tokio::task::JoinHandle<()>,
}

impl std::fmt::Debug for CdpListingDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdpListingDriver").finish_non_exhaustive()
    }
}

fn cdp_error(context: &str, err: impl std::fmt::Display) -> StarsiftError {
    StarsiftError::driver(format!("{context}: {err}"))
}

/// Queries against a node that left the DOM report "Could not find node"
fn is_missing_node(err: &CdpError) -> bool {
    err.to_string().contains("Could not find node")
}

fn unknown(handle: &ElementHandle) -> StarsiftError {
    StarsiftError::driver(format!("unknown element {handle}"))
}

impl CdpListingDriver {
    /// Launch a browser and open a blank page
    pub async fn launch(options: LaunchOptions) -> StarsiftResult<Self> {
        let mut builder = CdpConfig::builder().window_size(options.window.0, options.window.1);
        if !options.headless {
            builder = builder.with_head();
        }
        if !options.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = options.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(|e| cdp_error("browser config", e))?;

        let (browser, mut handler) = CdpBrowser::launch(config)
            .await
            .map_err(|e| cdp_error("browser launch", e))?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| cdp_error("new page", e))?;
        tracing::info!(headless = options.headless, "browser launched");

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            elements: Mutex::new(HandleRegistry::new()),
            handler,
        })
    }

    /// Close the browser
    pub async fn close(self) -> StarsiftResult<()> {
        let mut browser = self.browser.lock().await;
        let _ = browser.close().await.map_err(|e| cdp_error("browser close", e))?;
        let _ = browser.wait().await;
        self.handler.abort();
        Ok(())
    }

    /// Register `found` under `scope` and release the previous run's objects
    async fn register(&self, scope: String, found: Vec<Element>) -> Vec<ElementHandle> {
        let (handles, released) = self.elements.lock().await.replace(scope, found);
        self.release(released).await;
        handles
    }

    async fn release(&self, released: Vec<Element>) {
        for element in released {
            let params = ReleaseObjectParams::new(element.remote_object_id.clone());
            if let Err(err) = self.page.execute(params).await {
                tracing::debug!(error = %err, "remote object already gone");
            }
        }
    }

    async fn call(&self, handle: &ElementHandle, js: &str) -> StarsiftResult<Option<serde_json::Value>> {
        let elements = self.elements.lock().await;
        let element = elements.get(handle).ok_or_else(|| unknown(handle))?;
        let returns = element
            .call_js_fn(js, false)
            .await
            .map_err(|e| cdp_error("script on element", e))?;
        Ok(returns.result.value)
    }
}

#[async_trait]
impl ListingDriver for CdpListingDriver {
    async fn navigate(&self, url: &str) -> StarsiftResult<()> {
        // the old document's objects die with it
        let _ = self.elements.lock().await.clear();
        let _ = self
            .page
            .goto(url)
            .await
            .map_err(|e| cdp_error(&format!("navigate to {url}"), e))?;
        Ok(())
    }

    async fn find_one(&self, selector: &str) -> StarsiftResult<Option<ElementHandle>> {
        let mut found = self.query(selector).await?;
        found.truncate(1);
        Ok(self
            .register(HandleRegistry::<Element>::page_scope(selector), found)
            .await
            .pop())
    }

    async fn find_all(&self, selector: &str) -> StarsiftResult<Vec<ElementHandle>> {
        let found = self.query(selector).await?;
        Ok(self
            .register(HandleRegistry::<Element>::page_scope(selector), found)
            .await)
    }

    async fn find_in(
        &self,
        parent: &ElementHandle,
        selector: &str,
    ) -> StarsiftResult<Option<ElementHandle>> {
        let found = {
            let elements = self.elements.lock().await;
            let element = elements.get(parent).ok_or_else(|| unknown(parent))?;
            match element.find_elements(selector).await {
                Ok(found) => found,
                Err(err) if is_missing_node(&err) => Vec::new(),
                Err(err) => return Err(cdp_error(&format!("query {selector} in {parent}"), err)),
            }
        };
        let scope = HandleRegistry::<Element>::child_scope(parent, selector);
        Ok(self
            .register(scope, found.into_iter().take(1).collect())
            .await
            .pop())
    }

    async fn is_checked(&self, element: &ElementHandle) -> StarsiftResult<bool> {
        let elements = self.elements.lock().await;
        let el = elements.get(element).ok_or_else(|| unknown(element))?;
        let checked = el
            .property("checked")
            .await
            .map_err(|e| cdp_error("read checked", e))?;
        Ok(checked.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    async fn classes(&self, element: &ElementHandle) -> StarsiftResult<Vec<String>> {
        let elements = self.elements.lock().await;
        let el = elements.get(element).ok_or_else(|| unknown(element))?;
        let class = el
            .attribute("class")
            .await
            .map_err(|e| cdp_error("read class", e))?;
        Ok(class
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect())
    }

    async fn text(&self, element: &ElementHandle) -> StarsiftResult<String> {
        let elements = self.elements.lock().await;
        let el = elements.get(element).ok_or_else(|| unknown(element))?;
        let text = el
            .inner_text()
            .await
            .map_err(|e| cdp_error("read text", e))?;
        Ok(text.unwrap_or_default())
    }

    async fn is_visible(&self, element: &ElementHandle) -> StarsiftResult<bool> {
        let value = self.call(element, VISIBLE_JS).await?;
        Ok(value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> StarsiftResult<()> {
        let _ = self.call(element, SCROLL_JS).await?;
        Ok(())
    }

    async fn activate(&self, element: &ElementHandle) -> StarsiftResult<()> {
        let _ = self.call(element, CLICK_JS).await?;
        Ok(())
    }

    async fn network_idle(&self) -> StarsiftResult<Option<bool>> {
        let result = self
            .page
            .evaluate(XHR_IDLE_JS)
            .await
            .map_err(|e| cdp_error("read XHR counter", e))?;
        // null when the page exposes no counter
        Ok(result.value().and_then(serde_json::Value::as_bool))
    }

    async fn screenshot(&self) -> StarsiftResult<Vec<u8>> {
        use base64::Engine;

        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let screenshot = self
            .page
            .execute(params)
            .await
            .map_err(|e| cdp_error("screenshot", e))?;
        base64::engine::general_purpose::STANDARD
            .decode(&screenshot.data)
            .map_err(|e| cdp_error("screenshot", e))
    }
}

impl CdpListingDriver {
    async fn query(&self, selector: &str) -> StarsiftResult<Vec<Element>> {
        match self.page.find_elements(selector).await {
            Ok(found) => Ok(found),
            Err(err) if is_missing_node(&err) => Ok(Vec::new()),
            Err(err) => Err(cdp_error(&format!("query {selector}"), err)),
        }
    }
}
