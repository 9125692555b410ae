//! Web-first assertions (Playwright's `expect()`).
//!
//! Every assertion re-reads the page until it holds or the timeout elapses,
//! so journeys never sleep waiting for the storefront to settle.
//!
//! ```ignore
//! expect(&checkout.total_amount_header()).to_contain_text("₹67472").await?;
//! expect(&details).not().to_be_empty().await?;
//! expect(&toast).with_timeout(10_000).to_be_visible().await?;
//! ```

use crate::locator::Locator;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{poll_until, Probe, WaitOptions};

/// Collapse whitespace runs and trim, as the browser renders text
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Assertion builder for a locator
#[derive(Debug, Clone)]
pub struct Expect<'a> {
    locator: &'a Locator,
    negated: bool,
    options: WaitOptions,
}

/// Create an expectation for a locator
#[must_use]
pub fn expect(locator: &Locator) -> Expect<'_> {
    Expect::new(locator)
}

enum Check {
    Count(usize),
    Element(ElementCheck),
}

/// Checks that need an attached element
enum ElementCheck {
    Visible,
    Text(String),
    ContainsText(String),
    Value(String),
    Empty,
}

impl Check {
    fn describe(&self) -> String {
        match self {
            Self::Count(n) => format!("have count {n}"),
            Self::Element(ElementCheck::Visible) => "be visible".to_string(),
            Self::Element(ElementCheck::Text(t)) => format!("have text {t:?}"),
            Self::Element(ElementCheck::ContainsText(t)) => format!("contain text {t:?}"),
            Self::Element(ElementCheck::Value(v)) => format!("have value {v:?}"),
            Self::Element(ElementCheck::Empty) => "be empty".to_string(),
        }
    }
}

impl<'a> Expect<'a> {
    /// Create a new expectation with the locator's own timeout
    #[must_use]
    pub fn new(locator: &'a Locator) -> Self {
        Self {
            locator,
            negated: false,
            options: locator.options().wait_options(),
        }
    }

    /// Invert the next assertion
    #[must_use]
    pub fn not(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// Override the assertion timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.options = self.options.with_timeout(timeout_ms);
        self
    }

    /// Assert the element is visible
    pub async fn to_be_visible(self) -> ProbeResult<()> {
        self.run(Check::Element(ElementCheck::Visible)).await
    }

    /// Assert the element is hidden or detached
    pub async fn to_be_hidden(self) -> ProbeResult<()> {
        self.not().run(Check::Element(ElementCheck::Visible)).await
    }

    /// Assert the element's whitespace-normalized text equals `expected`
    pub async fn to_have_text(self, expected: &str) -> ProbeResult<()> {
        self.run(Check::Element(ElementCheck::Text(normalize_whitespace(
            expected,
        ))))
        .await
    }

    /// Assert the element's text contains `expected`
    pub async fn to_contain_text(self, expected: &str) -> ProbeResult<()> {
        self.run(Check::Element(ElementCheck::ContainsText(
            normalize_whitespace(expected),
        )))
        .await
    }

    /// Assert an input's value equals `expected`
    pub async fn to_have_value(self, expected: &str) -> ProbeResult<()> {
        self.run(Check::Element(ElementCheck::Value(expected.to_string())))
            .await
    }

    /// Assert the element has no text (or an input has no value)
    pub async fn to_be_empty(self) -> ProbeResult<()> {
        self.run(Check::Element(ElementCheck::Empty)).await
    }

    /// Assert the number of matching elements
    pub async fn to_have_count(self, expected: usize) -> ProbeResult<()> {
        self.run(Check::Count(expected)).await
    }

    async fn run(self, check: Check) -> ProbeResult<()> {
        let what = format!(
            "{} to {}{}",
            self.locator.describe(),
            if self.negated { "not " } else { "" },
            check.describe()
        );
        let negated = self.negated;
        let this = &self;
        let check = &check;
        let result = poll_until(self.options, &what, || async move {
            match this.observe(check).await? {
                (Some(holds), _) if holds != negated => Ok(Probe::Ready(())),
                (_, observed) => Ok(Probe::Pending(observed)),
            }
        })
        .await;
        match result {
            Err(ProbeError::Timeout { ms, waited_for }) => Err(ProbeError::assertion(format!(
                "expected {waited_for} within {ms}ms"
            ))),
            other => other,
        }
    }

    /// Evaluate `check` once.
    ///
    /// Returns whether it holds, or `None` while the element is detached,
    /// plus what was seen. A detached element counts as hidden, but text and
    /// value checks keep waiting for it in either polarity.
    async fn observe(&self, check: &Check) -> ProbeResult<(Option<bool>, String)> {
        let locator = self.locator;
        let check = match check {
            Check::Count(expected) => {
                let count = locator.count().await?;
                return Ok((Some(count == *expected), format!("count {count}")));
            }
            Check::Element(check) => check,
        };
        let Some(index) = locator.try_resolve().await? else {
            let hidden = matches!(check, ElementCheck::Visible).then_some(false);
            return Ok((hidden, "not attached".to_string()));
        };
        let driver = locator.driver();
        let selector = locator.selector();
        let (holds, observed) = match check {
            ElementCheck::Visible => {
                let visible = driver.is_visible(selector, index).await?;
                (visible, if visible { "visible" } else { "hidden" }.to_string())
            }
            ElementCheck::Text(expected) => {
                let text = normalize_whitespace(
                    &driver.text_content(selector, index).await?.unwrap_or_default(),
                );
                (&text == expected, format!("{text:?}"))
            }
            ElementCheck::ContainsText(expected) => {
                let text = normalize_whitespace(
                    &driver.text_content(selector, index).await?.unwrap_or_default(),
                );
                (text.contains(expected.as_str()), format!("{text:?}"))
            }
            ElementCheck::Value(expected) => {
                let value = driver.input_value(selector, index).await?;
                (&value == expected, format!("{value:?}"))
            }
            ElementCheck::Empty => {
                let text = driver.text_content(selector, index).await?.unwrap_or_default();
                let value = driver.input_value(selector, index).await.unwrap_or_default();
                let empty = text.trim().is_empty() && value.is_empty();
                (empty, format!("text {:?}", text.trim()))
            }
        };
        Ok((Some(holds), observed))
    }
}
