//! Browser surface capability
//!
//! The orchestrator owns exactly one surface for the lifetime of a sign-in
//! or authorization call; nothing else touches it during that window. The
//! trait is the seam to the actual browser driver, which lives outside this
//! workspace.

use async_trait::async_trait;
use rp_types::{AppResult, SessionSnapshot};
use std::time::Duration;

/// What "the element is there" means for a bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Present in the DOM and rendered.
    Visible,
    /// Present in the DOM, rendered or not.
    Attached,
}

/// Handle to a located element.
///
/// Carries the text content captured at locate time; the only consumer is
/// the authenticator display-number read, so a second round-trip accessor
/// is not worth the API surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub selector: String,
    pub text: Option<String>,
}

impl Element {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            text: None,
        }
    }

    pub fn with_text(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            text: Some(text.into()),
        }
    }

    /// Trimmed, non-empty text content.
    pub fn trimmed_text(&self) -> Option<String> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }
}

/// One browser page driven by the orchestrator.
#[async_trait]
pub trait BrowserSurface: Send + Sync {
    /// Navigate to a URL and wait for the page to be usable.
    async fn navigate(&self, url: &str) -> AppResult<()>;

    /// Bounded wait for an element. `None` when it does not appear within
    /// the timeout; callers treat that as a degraded-mode signal, not an
    /// error.
    async fn locate(
        &self,
        selector: &str,
        timeout: Duration,
        visibility: Visibility,
    ) -> Option<Element>;

    /// Bounded wait for an element to leave the DOM. Returns true once it
    /// is gone, false on timeout.
    async fn wait_detached(&self, selector: &str, timeout: Duration) -> bool;

    /// Replace the value of an input.
    async fn fill(&self, selector: &str, text: &str) -> AppResult<()>;

    /// Click a control.
    async fn activate(&self, selector: &str) -> AppResult<()>;

    /// Press a keyboard key on the focused element.
    async fn press(&self, key: &str) -> AppResult<()>;

    /// URL of the page as currently loaded.
    async fn current_url(&self) -> String;

    /// Capture the storage state of the underlying browser context.
    async fn snapshot(&self) -> AppResult<SessionSnapshot>;

    /// Whether this surface presents as a mobile browser. Mobile pages use
    /// different challenge markers and skip some confirmation probes.
    fn is_mobile(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trimmed_text() {
        let element = Element::with_text("#displaySign", "  42  ");
        assert_eq!(element.trimmed_text(), Some("42".to_string()));

        let blank = Element::with_text("#displaySign", "   ");
        assert_eq!(blank.trimmed_text(), None);

        let missing = Element::new("#displaySign");
        assert_eq!(missing.trimmed_text(), None);
    }
}
