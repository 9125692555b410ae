//! Chromium control over the Chrome `DevTools` Protocol.
//!
//! [`ChromiumFactory`] launches one browser per run and hands out a
//! [`ChromiumDriver`] per test case, each inside its own browser context so
//! cookies and local storage never leak between cases. Element operations
//! run as page-side JavaScript over [`Selector::to_query_all`], which keeps
//! CSS, XPath, text, role and placeholder selectors on one code path.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    Cookie as CdpCookie, CookieParam, CookieSameSite, TimeSinceEpoch,
};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::cdp::browser_protocol::storage::GetCookiesParams;
use chromiumoxide::cdp::browser_protocol::target::{CreateBrowserContextParams, CreateTargetParams};
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::config::BrowserSettings;
use crate::context::{Cookie, NameValue, OriginState, SameSite, StorageState};
use crate::driver::{origin_of, DriverFactory, PageDriver};
use crate::locator::Selector;
use crate::result::{ProbeError, ProbeResult};

fn page_error(e: impl std::fmt::Display) -> ProbeError {
    ProbeError::page(e.to_string())
}

/// JavaScript resolving the `index`-th match of `selector` into `el`
/// (`null` when absent) and returning `body`.
fn element_script(selector: &Selector, index: usize, body: &str) -> String {
    format!(
        "(() => {{ const el = ({})[{index}] || null; {body} }})()",
        selector.to_query_all()
    )
}

/// Launches chromium once and opens an isolated context per test case
#[derive(Debug)]
pub struct ChromiumFactory {
    browser: Arc<Mutex<CdpBrowser>>,
    handler: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl ChromiumFactory {
    /// Launch chromium with the given settings
    pub async fn launch(settings: &BrowserSettings) -> ProbeResult<Self> {
        let mut builder =
            CdpConfig::builder().window_size(settings.viewport_width, settings.viewport_height);
        if !settings.headless {
            builder = builder.with_head();
        }
        if settings.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = settings.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder
            .build()
            .map_err(|message| ProbeError::BrowserLaunchError { message })?;

        let (browser, mut handler) =
            CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| ProbeError::BrowserLaunchError {
                    message: e.to_string(),
                })?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "CDP handler stopped");
                    break;
                }
            }
        });
        tracing::info!(headless = settings.headless, "chromium launched");

        Ok(Self {
            browser: Arc::new(Mutex::new(browser)),
            handler: Mutex::new(Some(handle)),
        })
    }
}

#[async_trait]
impl DriverFactory for ChromiumFactory {
    async fn new_driver(&self) -> ProbeResult<Arc<dyn PageDriver>> {
        let browser = self.browser.lock().await;
        let context = browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .map_err(page_error)?;
        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context.clone())
            .build()
            .map_err(ProbeError::page)?;
        let page = browser.new_page(target).await.map_err(page_error)?;
        Ok(Arc::new(ChromiumDriver {
            page,
            context,
            browser: Arc::clone(&self.browser),
        }))
    }

    async fn shutdown(&self) -> ProbeResult<()> {
        {
            let mut browser = self.browser.lock().await;
            browser.close().await.map_err(page_error)?;
            if let Err(e) = browser.wait().await {
                tracing::debug!(error = %e, "waiting for chromium exit failed");
            }
        }
        if let Some(handle) = self.handler.lock().await.take() {
            handle.abort();
        }
        tracing::info!("chromium closed");
        Ok(())
    }
}

/// One page in its own browser context
#[derive(Debug)]
pub struct ChromiumDriver {
    page: CdpPage,
    context: BrowserContextId,
    browser: Arc<Mutex<CdpBrowser>>,
}

impl ChromiumDriver {
    async fn eval<T: DeserializeOwned>(&self, script: &str) -> ProbeResult<T> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| ProbeError::EvaluationError {
                message: e.to_string(),
            })?;
        result
            .into_value()
            .map_err(|e| ProbeError::EvaluationError {
                message: e.to_string(),
            })
    }

    /// Run an element action; the script returns `false` when the element is gone
    async fn act(&self, action: &'static str, selector: &Selector, index: usize, body: &str) -> ProbeResult<()> {
        let done: bool = self.eval(&element_script(selector, index, body)).await?;
        if done {
            Ok(())
        } else {
            Err(ProbeError::ActionFailed {
                action,
                selector: selector.to_string(),
                message: "element detached before the action ran".to_string(),
            })
        }
    }
}

/// `Storage.getCookies` for a whole browser context, not just the current URL
fn context_cookies(context: &BrowserContextId) -> GetCookiesParams {
    GetCookiesParams::builder()
        .browser_context_id(context.clone())
        .build()
}

fn to_cookie(c: CdpCookie) -> Cookie {
    let mut cookie = Cookie::new(&c.name, &c.value, &c.domain).with_path(&c.path);
    cookie.expires = if c.session { -1.0 } else { c.expires };
    cookie.http_only = c.http_only;
    cookie.secure = c.secure;
    cookie.same_site = match c.same_site {
        Some(CookieSameSite::Strict) => SameSite::Strict,
        Some(CookieSameSite::None) => SameSite::None,
        _ => SameSite::Lax,
    };
    cookie
}

fn to_cookie_param(c: &Cookie) -> ProbeResult<CookieParam> {
    let mut builder = CookieParam::builder()
        .name(c.name.clone())
        .value(c.value.clone())
        .domain(c.domain.clone())
        .path(c.path.clone())
        .http_only(c.http_only)
        .secure(c.secure)
        .same_site(match c.same_site {
            SameSite::Strict => CookieSameSite::Strict,
            SameSite::Lax => CookieSameSite::Lax,
            SameSite::None => CookieSameSite::None,
        });
    if !c.is_session() {
        builder = builder.expires(TimeSinceEpoch::new(c.expires));
    }
    builder.build().map_err(ProbeError::page)
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn goto(&self, url: &str) -> ProbeResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| ProbeError::NavigationError {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        Ok(self
            .page
            .url()
            .await
            .map_err(page_error)?
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn count(&self, selector: &Selector) -> ProbeResult<usize> {
        self.eval(&format!("({}).length", selector.to_query_all()))
            .await
    }

    async fn is_visible(&self, selector: &Selector, index: usize) -> ProbeResult<bool> {
        self.eval(&element_script(
            selector,
            index,
            "if (!el) return false; \
             const s = window.getComputedStyle(el); \
             const r = el.getBoundingClientRect(); \
             return s.visibility !== 'hidden' && s.display !== 'none' && r.width > 0 && r.height > 0;",
        ))
        .await
    }

    async fn text_content(&self, selector: &Selector, index: usize) -> ProbeResult<Option<String>> {
        self.eval(&element_script(
            selector,
            index,
            "return el ? (el.textContent || '') : null;",
        ))
        .await
    }

    async fn input_value(&self, selector: &Selector, index: usize) -> ProbeResult<String> {
        let value: Option<String> = self
            .eval(&element_script(
                selector,
                index,
                "return el && 'value' in el ? String(el.value) : null;",
            ))
            .await?;
        value.ok_or_else(|| ProbeError::ActionFailed {
            action: "input_value",
            selector: selector.to_string(),
            message: "element is not an input".to_string(),
        })
    }

    async fn click(&self, selector: &Selector, index: usize) -> ProbeResult<()> {
        self.act(
            "click",
            selector,
            index,
            "if (!el) return false; el.scrollIntoView({block: 'center'}); el.click(); return true;",
        )
        .await
    }

    async fn fill(&self, selector: &Selector, index: usize, value: &str) -> ProbeResult<()> {
        let value = serde_json::to_string(value)?;
        self.act(
            "fill",
            selector,
            index,
            &format!(
                "if (!el) return false; el.focus(); \
                 const proto = Object.getPrototypeOf(el); \
                 const setter = Object.getOwnPropertyDescriptor(proto, 'value'); \
                 if (setter && setter.set) {{ setter.set.call(el, {value}); }} else {{ el.value = {value}; }} \
                 el.dispatchEvent(new Event('input', {{bubbles: true}})); \
                 el.dispatchEvent(new Event('change', {{bubbles: true}})); \
                 return true;"
            ),
        )
        .await
    }

    async fn evaluate(&self, script: &str) -> ProbeResult<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| ProbeError::EvaluationError {
                message: e.to_string(),
            })?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn storage_state(&self) -> ProbeResult<StorageState> {
        let params = context_cookies(&self.context);
        let cookies = {
            let browser = self.browser.lock().await;
            browser.execute(params).await.map_err(page_error)?
        };
        let mut state = StorageState {
            cookies: cookies.result.cookies.into_iter().map(to_cookie).collect(),
            origins: Vec::new(),
        };
        if let Some(origin) = origin_of(&self.current_url().await?) {
            let entries: Vec<(String, String)> = self
                .eval("Object.entries(window.localStorage)")
                .await?;
            if !entries.is_empty() {
                state.origins.push(OriginState {
                    origin,
                    local_storage: entries
                        .iter()
                        .map(|(k, v)| NameValue::new(k, v))
                        .collect(),
                });
            }
        }
        Ok(state)
    }

    async fn add_cookies(&self, cookies: &[Cookie]) -> ProbeResult<()> {
        let params = cookies
            .iter()
            .map(to_cookie_param)
            .collect::<ProbeResult<Vec<_>>>()?;
        self.page.set_cookies(params).await.map_err(page_error)?;
        Ok(())
    }

    async fn set_local_storage(&self, entries: &[(String, String)]) -> ProbeResult<()> {
        let entries = serde_json::to_string(entries)?;
        let _: bool = self
            .eval(&format!(
                "(() => {{ for (const [k, v] of {entries}) window.localStorage.setItem(k, v); return true; }})()"
            ))
            .await?;
        Ok(())
    }

    async fn screenshot(&self) -> ProbeResult<Vec<u8>> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let shot = self
            .page
            .execute(params)
            .await
            .map_err(|e| ProbeError::ScreenshotError {
                message: e.to_string(),
            })?;
        base64::engine::general_purpose::STANDARD
            .decode(&shot.data)
            .map_err(|e| ProbeError::ScreenshotError {
                message: e.to_string(),
            })
    }

    async fn close(&self) -> ProbeResult<()> {
        self.page.clone().close().await.map_err(page_error)?;
        let browser = self.browser.lock().await;
        browser
            .dispose_browser_context(self.context.clone())
            .await
            .map_err(page_error)?;
        Ok(())
    }
}
