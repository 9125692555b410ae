//! Mock driver for testing journeys without a browser.
//!
//! [`MockDriver`] keeps an in-memory DOM keyed by selector description
//! (`Selector::to_string()`), so page objects and the mock agree on element
//! identity without parsing CSS or XPath. Pages are modelled as routes,
//! clicks trigger scripted [`MockEffect`]s, and effects can be delayed to
//! exercise auto-waiting.
//!
//! ## Example
//!
//! ```rust
//! use storefront_probe::mock::{MockDriver, MockEffect, MockElement};
//! use storefront_probe::{AriaRole, Selector};
//!
//! let mock = MockDriver::new();
//! let button = Selector::role(AriaRole::Button, "Check");
//! let details = Selector::css(".delivery-details-text");
//! mock.insert(&button, MockElement::visible("Check"));
//! mock.insert(&details, MockElement::hidden(""));
//! mock.on_click(&button, vec![
//!     MockEffect::SetText(details.to_string(), "Delivery by Friday".into()),
//!     MockEffect::Show(details.to_string()),
//! ]);
//! ```

pub mod storefront;

use crate::context::{Cookie, NameValue, OriginState, StorageState};
use crate::driver::{origin_of, path_of, DriverFactory, PageDriver};
use crate::locator::Selector;
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Default origin for relative mock navigation
pub const MOCK_ORIGIN: &str = "https://shop.test";

/// Minimal PNG signature returned by [`MockDriver::screenshot`]
pub const MOCK_SCREENSHOT: &[u8] = b"\x89PNG\r\n\x1a\n";

/// A fake DOM element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockElement {
    /// Text content
    pub text: String,
    /// Input value
    pub value: String,
    /// Visibility
    pub visible: bool,
}

impl MockElement {
    /// Visible element with text
    #[must_use]
    pub fn visible(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            value: String::new(),
            visible: true,
        }
    }

    /// Hidden element with text
    #[must_use]
    pub fn hidden(text: impl Into<String>) -> Self {
        Self {
            visible: false,
            ..Self::visible(text)
        }
    }

    /// Visible input with a value
    #[must_use]
    pub fn input(value: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            value: value.into(),
            visible: true,
        }
    }
}

/// Scripted reaction to a click, keyed by selector description
#[derive(Debug, Clone)]
pub enum MockEffect {
    /// Make all matches of the key visible
    Show(String),
    /// Hide all matches of the key
    Hide(String),
    /// Set the text of all matches
    SetText(String, String),
    /// Set the value of all matches
    SetValue(String, String),
    /// Append an element
    Insert(String, MockElement),
    /// Remove all matches
    Remove(String),
    /// Navigate to a path (relative to the current origin) or absolute URL
    Navigate(String),
    /// Store a cookie
    SetCookie(Cookie),
    /// Store a local storage entry for the current origin
    SetLocalStorage(String, String),
    /// Branch on the value of the first match of `key`
    WhenValue {
        /// Element key
        key: String,
        /// Expected value
        equals: String,
        /// Effects when the value matches
        then: Vec<MockEffect>,
        /// Effects otherwise
        otherwise: Vec<MockEffect>,
    },
    /// Apply an effect after a delay
    After(Duration, Box<MockEffect>),
}

/// A page served at a path
#[derive(Debug, Clone, Default)]
pub struct MockRoute {
    elements: Vec<(String, MockElement)>,
    guard: Option<RouteGuard>,
}

#[derive(Debug, Clone)]
struct RouteGuard {
    cookie: String,
    storage_key: Option<String>,
    redirect: String,
}

impl MockRoute {
    /// Create an empty route
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element to the page
    #[must_use]
    pub fn element(mut self, selector: &Selector, element: MockElement) -> Self {
        self.elements.push((selector.to_string(), element));
        self
    }

    /// Redirect to `redirect_path` unless cookie `name` is present
    #[must_use]
    pub fn requires_cookie(mut self, name: impl Into<String>, redirect_path: impl Into<String>) -> Self {
        self.guard = Some(RouteGuard {
            cookie: name.into(),
            storage_key: None,
            redirect: redirect_path.into(),
        });
        self
    }

    /// Let a local storage entry on the page's origin satisfy the guard too
    #[must_use]
    pub fn or_local_storage(mut self, key: impl Into<String>) -> Self {
        if let Some(guard) = &mut self.guard {
            guard.storage_key = Some(key.into());
        }
        self
    }
}

#[derive(Debug)]
struct MockState {
    url: String,
    elements: HashMap<String, Vec<MockElement>>,
    routes: HashMap<String, MockRoute>,
    on_click: HashMap<String, Vec<MockEffect>>,
    cookies: Vec<Cookie>,
    local_storage: BTreeMap<String, BTreeMap<String, String>>,
    pending: Vec<(Instant, MockEffect)>,
    clicks: Vec<String>,
    fills: Vec<(String, String)>,
    navigations: Vec<String>,
    closed: bool,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            url: "about:blank".to_string(),
            elements: HashMap::new(),
            routes: HashMap::new(),
            on_click: HashMap::new(),
            cookies: Vec::new(),
            local_storage: BTreeMap::new(),
            pending: Vec::new(),
            clicks: Vec::new(),
            fills: Vec::new(),
            navigations: Vec::new(),
            closed: false,
        }
    }
}

impl MockState {
    fn origin(&self) -> String {
        origin_of(&self.url).unwrap_or_else(|| MOCK_ORIGIN.to_string())
    }

    fn apply_due(&mut self) {
        let now = Instant::now();
        let (due, later): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.pending).into_iter().partition(|(at, _)| *at <= now);
        self.pending = later;
        for (_, effect) in due {
            self.apply(effect);
        }
    }

    fn navigate(&mut self, target: &str) {
        let mut url = if target.starts_with('/') {
            format!("{}{target}", self.origin())
        } else {
            target.to_string()
        };
        // Guards redirect at most a few hops to avoid loops in bad scripts.
        for _ in 0..4 {
            let origin = origin_of(&url).unwrap_or_else(|| MOCK_ORIGIN.to_string());
            let redirect = self
                .routes
                .get(&path_of(&url))
                .and_then(|route| route.guard.as_ref())
                .filter(|guard| !self.satisfies(guard, &origin))
                .map(|guard| guard.redirect.clone());
            match redirect {
                Some(to) => url = format!("{origin}{to}"),
                None => break,
            }
        }
        self.elements.clear();
        if let Some(route) = self.routes.get(&path_of(&url)) {
            for (key, element) in &route.elements {
                self.elements.entry(key.clone()).or_default().push(element.clone());
            }
        }
        self.navigations.push(url.clone());
        self.url = url;
    }

    fn satisfies(&self, guard: &RouteGuard, origin: &str) -> bool {
        self.cookies.iter().any(|c| c.name == guard.cookie)
            || guard.storage_key.as_ref().is_some_and(|key| {
                self.local_storage
                    .get(origin)
                    .is_some_and(|entries| entries.contains_key(key))
            })
    }

    fn apply(&mut self, effect: MockEffect) {
        match effect {
            MockEffect::Show(key) => self.each(&key, |e| e.visible = true),
            MockEffect::Hide(key) => self.each(&key, |e| e.visible = false),
            MockEffect::SetText(key, text) => self.each(&key, |e| e.text.clone_from(&text)),
            MockEffect::SetValue(key, value) => self.each(&key, |e| e.value.clone_from(&value)),
            MockEffect::Insert(key, element) => self.elements.entry(key).or_default().push(element),
            MockEffect::Remove(key) => {
                let _ = self.elements.remove(&key);
            }
            MockEffect::Navigate(target) => self.navigate(&target),
            MockEffect::SetCookie(cookie) => {
                self.cookies.retain(|c| c.name != cookie.name || c.domain != cookie.domain);
                self.cookies.push(cookie);
            }
            MockEffect::SetLocalStorage(key, value) => {
                let origin = self.origin();
                let _ = self.local_storage.entry(origin).or_default().insert(key, value);
            }
            MockEffect::WhenValue {
                key,
                equals,
                then,
                otherwise,
            } => {
                let matched = self
                    .elements
                    .get(&key)
                    .and_then(|els| els.first())
                    .is_some_and(|e| e.value == equals);
                for effect in if matched { then } else { otherwise } {
                    self.apply(effect);
                }
            }
            MockEffect::After(delay, effect) => {
                self.pending.push((Instant::now() + delay, *effect));
            }
        }
    }

    fn each(&mut self, key: &str, mut f: impl FnMut(&mut MockElement)) {
        if let Some(elements) = self.elements.get_mut(key) {
            elements.iter_mut().for_each(&mut f);
        }
    }

    fn element(&self, selector: &Selector, index: usize) -> Option<&MockElement> {
        self.elements
            .get(&selector.to_string())
            .and_then(|els| els.get(index))
    }
}

/// In-memory page driver with a scripted DOM
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    /// Create an empty mock page at `about:blank`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// State with every due delayed effect applied
    fn live(&self) -> MutexGuard<'_, MockState> {
        let mut state = self.live();
        state
    }

    /// Append an element to the current DOM
    pub fn insert(&self, selector: &Selector, element: MockElement) {
        self.state()
            .elements
            .entry(selector.to_string())
            .or_default()
            .push(element);
    }

    /// Serve a page at `path`
    pub fn route(&self, path: impl Into<String>, route: MockRoute) {
        let _ = self.state().routes.insert(path.into(), route);
    }

    /// Register effects for clicks on `selector`
    pub fn on_click(&self, selector: &Selector, effects: Vec<MockEffect>) {
        self.state()
            .on_click
            .entry(selector.to_string())
            .or_default()
            .extend(effects);
    }

    /// Apply an effect after `delay`
    pub fn schedule(&self, delay: Duration, effect: MockEffect) {
        self.state().apply(MockEffect::After(delay, Box::new(effect)));
    }

    /// Selector descriptions clicked so far, in order
    #[must_use]
    pub fn clicks(&self) -> Vec<String> {
        self.state().clicks.clone()
    }

    /// `(selector, value)` pairs filled so far, in order
    #[must_use]
    pub fn fills(&self) -> Vec<(String, String)> {
        self.state().fills.clone()
    }

    /// URLs navigated to (after redirects), in order
    #[must_use]
    pub fn navigations(&self) -> Vec<String> {
        self.state().navigations.clone()
    }

    /// Cookies currently set
    #[must_use]
    pub fn cookies(&self) -> Vec<Cookie> {
        self.state().cookies.clone()
    }

    /// Local storage value for `origin`
    #[must_use]
    pub fn local_storage(&self, origin: &str, key: &str) -> Option<String> {
        self.state()
            .local_storage
            .get(origin)
            .and_then(|entries| entries.get(key).cloned())
    }

    /// Whether [`PageDriver::close`] was called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    fn missing(action: &'static str, selector: &Selector, index: usize) -> ProbeError {
        ProbeError::ActionFailed {
            action,
            selector: selector.to_string(),
            message: format!("no element at index {index}"),
        }
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn goto(&self, url: &str) -> ProbeResult<()> {
        if !url.contains("://") && !url.starts_with('/') && url != "about:blank" {
            return Err(ProbeError::NavigationError {
                url: url.to_string(),
                message: "invalid URL".to_string(),
            });
        }
        let mut state = self.live();
        state.navigate(url);
        Ok(())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        Ok(self.live().url.clone())
    }

    async fn count(&self, selector: &Selector) -> ProbeResult<usize> {
        let mut state = self.live();
        Ok(state.elements.get(&selector.to_string()).map_or(0, Vec::len))
    }

    async fn is_visible(&self, selector: &Selector, index: usize) -> ProbeResult<bool> {
        let mut state = self.live();
        Ok(state.element(selector, index).is_some_and(|e| e.visible))
    }

    async fn text_content(
        &self,
        selector: &Selector,
        index: usize,
    ) -> ProbeResult<Option<String>> {
        let mut state = self.live();
        Ok(state.element(selector, index).map(|e| e.text.clone()))
    }

    async fn input_value(&self, selector: &Selector, index: usize) -> ProbeResult<String> {
        let mut state = self.live();
        state
            .element(selector, index)
            .map(|e| e.value.clone())
            .ok_or_else(|| Self::missing("input_value", selector, index))
    }

    async fn click(&self, selector: &Selector, index: usize) -> ProbeResult<()> {
        let mut state = self.live();
        match state.element(selector, index) {
            Some(e) if e.visible => {}
            Some(_) => {
                return Err(ProbeError::ActionFailed {
                    action: "click",
                    selector: selector.to_string(),
                    message: "element is not visible".to_string(),
                })
            }
            None => return Err(Self::missing("click", selector, index)),
        }
        let key = selector.to_string();
        state.clicks.push(key.clone());
        let effects = state.on_click.get(&key).cloned().unwrap_or_default();
        for effect in effects {
            state.apply(effect);
        }
        Ok(())
    }

    async fn fill(&self, selector: &Selector, index: usize, value: &str) -> ProbeResult<()> {
        let mut state = self.live();
        let key = selector.to_string();
        let element = state
            .elements
            .get_mut(&key)
            .and_then(|els| els.get_mut(index))
            .ok_or_else(|| Self::missing("fill", selector, index))?;
        element.value = value.to_string();
        state.fills.push((key, value.to_string()));
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> ProbeResult<serde_json::Value> {
        Err(ProbeError::EvaluationError {
            message: format!("MockDriver cannot evaluate scripts ({} bytes)", script.len()),
        })
    }

    async fn storage_state(&self) -> ProbeResult<StorageState> {
        let state = self.live();
        let origins = state
            .local_storage
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(origin, entries)| OriginState {
                origin: origin.clone(),
                local_storage: entries
                    .iter()
                    .map(|(name, value)| NameValue::new(name, value))
                    .collect(),
            })
            .collect();
        Ok(StorageState {
            cookies: state.cookies.clone(),
            origins,
        })
    }

    async fn add_cookies(&self, cookies: &[Cookie]) -> ProbeResult<()> {
        let mut state = self.live();
        for cookie in cookies {
            state.apply(MockEffect::SetCookie(cookie.clone()));
        }
        Ok(())
    }

    async fn set_local_storage(&self, entries: &[(String, String)]) -> ProbeResult<()> {
        let mut state = self.live();
        if origin_of(&state.url).is_none() {
            return Err(ProbeError::page(format!(
                "local storage is not available on {}",
                state.url
            )));
        }
        for (key, value) in entries {
            state.apply(MockEffect::SetLocalStorage(key.clone(), value.clone()));
        }
        Ok(())
    }

    async fn screenshot(&self) -> ProbeResult<Vec<u8>> {
        Ok(MOCK_SCREENSHOT.to_vec())
    }

    async fn close(&self) -> ProbeResult<()> {
        self.state().closed = true;
        Ok(())
    }
}

/// Builds a fresh [`MockDriver`] per test case from a setup function.
#[derive(Clone)]
pub struct MockDriverFactory {
    build: Arc<dyn Fn() -> MockDriver + Send + Sync>,
    opened: Arc<Mutex<Vec<MockDriver>>>,
}

impl std::fmt::Debug for MockDriverFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDriverFactory")
            .field("opened", &self.opened().len())
            .finish_non_exhaustive()
    }
}

impl MockDriverFactory {
    /// Create a factory from a builder function
    pub fn new(build: impl Fn() -> MockDriver + Send + Sync + 'static) -> Self {
        Self {
            build: Arc::new(build),
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every driver handed out so far
    #[must_use]
    pub fn opened(&self) -> Vec<MockDriver> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl DriverFactory for MockDriverFactory {
    async fn new_driver(&self) -> ProbeResult<Arc<dyn PageDriver>> {
        let driver = (self.build)();
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(driver.clone());
        Ok(Arc::new(driver))
    }
}
