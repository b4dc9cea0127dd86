//! Browser control for form runs.
//!
//! With the `browser` feature, [`ChromiumFormDriver`] drives a real Chromium
//! over the Chrome `DevTools` Protocol via chromiumoxide. One browser and one
//! page serve the whole run; every case re-opens the creation view.

/// Whether `document.readyState` reports a fully loaded page
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn is_loaded(ready_state: &str) -> bool {
    ready_state == "complete"
}

/// Browser configuration
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc, clippy::significant_drop_tightening)]
mod cdp {
    use super::BrowserConfig;
    use crate::config::Timeouts;
    use crate::driver::FormDriver;
    use crate::result::{ProbeError, ProbeResult};
    use crate::schema::{ErrorProbe, FieldKind};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::element::Element;
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use std::collections::BTreeMap;
    use std::future::Future;
    use std::time::Duration;
    use tokio::time::{sleep, timeout, Instant};
    use tracing::{debug, warn};

    const POLL_INTERVAL: Duration = Duration::from_millis(100);

    fn page_error(e: impl std::fmt::Display) -> ProbeError {
        ProbeError::Page {
            message: e.to_string(),
        }
    }

    /// Form driver backed by a real Chromium session
    #[derive(Debug)]
    pub struct ChromiumFormDriver {
        browser: CdpBrowser,
        page: CdpPage,
        handle: tokio::task::JoinHandle<()>,
        timeouts: Timeouts,
    }

    impl ChromiumFormDriver {
        /// Launch Chromium and open a blank page
        ///
        /// # Errors
        ///
        /// Returns error if browser cannot be launched
        pub async fn launch(config: BrowserConfig, timeouts: Timeouts) -> ProbeResult<Self> {
            let mut builder =
                CdpConfig::builder().window_size(config.viewport_width, config.viewport_height);

            if !config.headless {
                builder = builder.with_head();
            }

            if !config.sandbox {
                builder = builder.no_sandbox();
            }

            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            let cdp_config = builder
                .build()
                .map_err(|message| ProbeError::BrowserLaunch { message })?;

            let (browser, mut handler) =
                CdpBrowser::launch(cdp_config)
                    .await
                    .map_err(|e| ProbeError::BrowserLaunch {
                        message: e.to_string(),
                    })?;

            let handle = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            let page = browser.new_page("about:blank").await.map_err(page_error)?;

            debug!(
                headless = config.headless,
                width = config.viewport_width,
                height = config.viewport_height,
                "browser launched"
            );

            Ok(Self {
                browser,
                page,
                handle,
                timeouts,
            })
        }

        async fn within<T>(
            &self,
            operation: &str,
            limit: Duration,
            fut: impl Future<Output = ProbeResult<T>> + Send,
        ) -> ProbeResult<T> {
            timeout(limit, fut)
                .await
                .map_err(|_| ProbeError::timeout(operation, limit))?
        }

        async fn ready_state(&self) -> ProbeResult<String> {
            self.page
                .evaluate("document.readyState")
                .await
                .map_err(page_error)?
                .into_value::<String>()
                .map_err(page_error)
        }

        async fn wait_until_ready(&self, operation: &str, limit: Duration) -> ProbeResult<()> {
            let deadline = Instant::now() + limit;
            loop {
                if let Ok(state) = self.ready_state().await {
                    if super::is_loaded(&state) {
                        return Ok(());
                    }
                }
                if Instant::now() >= deadline {
                    return Err(ProbeError::timeout(operation, limit));
                }
                sleep(POLL_INTERVAL).await;
            }
        }

        async fn wait_for_element(&self, selector: &str) -> ProbeResult<Element> {
            let limit = self.timeouts.element();
            let deadline = Instant::now() + limit;
            loop {
                if let Ok(element) = self.page.find_element(selector).await {
                    return Ok(element);
                }
                if Instant::now() >= deadline {
                    return Err(ProbeError::element_not_found(selector));
                }
                sleep(POLL_INTERVAL).await;
            }
        }

        /// Run a script that answers `ok`, `missing` or `no-option`
        async fn run_field_script(&self, selector: &str, value: &str, script: String) -> ProbeResult<()> {
            let answer: String = self
                .page
                .evaluate(script)
                .await
                .map_err(page_error)?
                .into_value()
                .map_err(page_error)?;
            match answer.as_str() {
                "ok" => Ok(()),
                "no-option" => Err(ProbeError::element_not_found(format!(
                    "{selector} option '{value}'"
                ))),
                _ => Err(ProbeError::element_not_found(selector)),
            }
        }

        async fn fill_text(&self, selector: &str, value: &str) -> ProbeResult<()> {
            let element = self.wait_for_element(selector).await?;
            let sel = js_literal(selector)?;
            self.run_field_script(
                selector,
                value,
                format!(
                    "(() => {{ const el = document.querySelector({sel}); \
                     if (!el) return 'missing'; \
                     el.value = ''; \
                     el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
                     return 'ok'; }})()"
                ),
            )
            .await?;
            element.click().await.map_err(page_error)?;
            element.type_str(value).await.map_err(page_error)?;
            Ok(())
        }

        async fn assign_value(&self, selector: &str, kind: FieldKind, value: &str) -> ProbeResult<()> {
            self.wait_for_element(selector).await?;
            let sel = js_literal(selector)?;
            let val = js_literal(value)?;
            let guard = if kind.is_select() {
                format!(
                    "if (![...el.options].some(o => o.value === {val})) return 'no-option';"
                )
            } else {
                String::new()
            };
            self.run_field_script(
                selector,
                value,
                format!(
                    "(() => {{ const el = document.querySelector({sel}); \
                     if (!el) return 'missing'; \
                     {guard} \
                     el.value = {val}; \
                     el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
                     el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
                     return 'ok'; }})()"
                ),
            )
            .await
        }
    }

    fn js_literal(text: &str) -> ProbeResult<String> {
        Ok(serde_json::to_string(text)?)
    }

    #[async_trait]
    impl FormDriver for ChromiumFormDriver {
        async fn open(&mut self, url: &str) -> ProbeResult<()> {
            let limit = self.timeouts.navigation();
            self.within("navigation", limit, async {
                self.page
                    .goto(url)
                    .await
                    .map_err(|e| ProbeError::Navigation {
                        url: url.to_string(),
                        message: e.to_string(),
                    })?;
                Ok(())
            })
            .await?;
            self.wait_until_ready("navigation", limit).await
        }

        async fn select_first_option(&mut self, selector: &str) -> ProbeResult<bool> {
            self.wait_for_element(selector).await?;
            let sel = js_literal(selector)?;
            let answer: String = self
                .page
                .evaluate(format!(
                    "(() => {{ const el = document.querySelector({sel}); \
                     if (!el) return 'missing'; \
                     if (el.options.length < 2) return 'empty'; \
                     el.selectedIndex = 1; \
                     el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
                     return 'ok'; }})()"
                ))
                .await
                .map_err(page_error)?
                .into_value()
                .map_err(page_error)?;
            match answer.as_str() {
                "ok" => Ok(true),
                "empty" => Ok(false),
                _ => Err(ProbeError::element_not_found(selector)),
            }
        }

        async fn set_field(
            &mut self,
            selector: &str,
            kind: FieldKind,
            value: &str,
        ) -> ProbeResult<()> {
            if value.is_empty() {
                return Ok(());
            }
            match kind {
                FieldKind::Text => self.fill_text(selector, value).await,
                FieldKind::Date | FieldKind::Select => {
                    self.assign_value(selector, kind, value).await
                }
            }
        }

        async fn submit(&mut self, selector: &str) -> ProbeResult<()> {
            let button = self.wait_for_element(selector).await?;
            button.click().await.map_err(page_error)?;
            sleep(self.timeouts.settle_delay()).await;
            self.wait_until_ready("submit", self.timeouts.settle()).await
        }

        async fn current_errors(
            &mut self,
            probes: &[ErrorProbe],
        ) -> ProbeResult<BTreeMap<String, String>> {
            let mut errors = BTreeMap::new();
            for probe in probes {
                let Ok(element) = self.page.find_element(probe.selector.as_str()).await else {
                    continue;
                };
                let text = element.inner_text().await.map_err(page_error)?;
                if let Some(text) = text.map(|t| t.trim().to_string()) {
                    if !text.is_empty() {
                        errors.insert(probe.field.clone(), text);
                    }
                }
            }
            Ok(errors)
        }

        async fn current_url(&mut self) -> ProbeResult<String> {
            self.page
                .url()
                .await
                .map_err(page_error)?
                .ok_or_else(|| page_error("page has no location"))
        }

        async fn close(&mut self) -> ProbeResult<()> {
            let closed = self.browser.close().await.map_err(page_error);
            if let Err(e) = self.browser.wait().await {
                warn!(error = %e, "browser process did not exit cleanly");
            }
            self.handle.abort();
            closed.map(|_| ())
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::ChromiumFormDriver;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BrowserConfig::default();
        assert!(config.headless);
        assert_eq!(config.viewport_width, 1920);
        assert_eq!(config.viewport_height, 1080);
        assert!(config.sandbox);
    }

    #[test]
    fn test_builder() {
        let config = BrowserConfig::default()
            .with_headless(false)
            .with_viewport(1280, 720)
            .with_chromium_path("/usr/bin/chromium")
            .with_no_sandbox();
        assert!(!config.headless);
        assert_eq!(config.viewport_width, 1280);
        assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
        assert!(!config.sandbox);
    }

    #[test]
    fn test_only_complete_counts_as_loaded() {
        assert!(is_loaded("complete"));
        assert!(!is_loaded("interactive"));
        assert!(!is_loaded("loading"));
    }
}
