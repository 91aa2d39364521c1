//! Scriptable in-memory browser surface
//!
//! Deterministic `BrowserSurface` for tests: selectors are staged as
//! present, absent, or appearing after N queries; the URL can follow a
//! staged sequence; every interaction is recorded. Waits return
//! immediately, so timeout-shaped logic is exercised without wall-clock
//! delays. Exported publicly because the flow crates drive their tests
//! with it.

use crate::surface::{BrowserSurface, Element, Visibility};
use async_trait::async_trait;
use parking_lot::Mutex;
use rp_types::{AppResult, SessionSnapshot};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Everything the flows did to the surface, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceAction {
    Navigated(String),
    Filled { selector: String, text: String },
    Activated(String),
    Pressed(String),
}

enum ElementScript {
    Present { text: Option<String> },
    AppearsAfter { queries: usize, text: Option<String> },
}

#[derive(Default)]
struct State {
    current_url: String,
    url_sequence: VecDeque<String>,
    elements: HashMap<String, ElementScript>,
    locate_counts: HashMap<String, usize>,
    detach_results: HashMap<String, VecDeque<bool>>,
    snapshot: Option<SessionSnapshot>,
    actions: Vec<SurfaceAction>,
}

pub struct ScriptedSurface {
    state: Mutex<State>,
    mobile: bool,
}

impl ScriptedSurface {
    pub fn desktop() -> Self {
        Self {
            state: Mutex::new(State::default()),
            mobile: false,
        }
    }

    pub fn mobile() -> Self {
        Self {
            state: Mutex::new(State::default()),
            mobile: true,
        }
    }

    /// Stage an element as present from the start.
    pub fn present(&self, selector: &str) {
        self.state
            .lock()
            .elements
            .insert(selector.to_string(), ElementScript::Present { text: None });
    }

    /// Stage an element as present with text content.
    pub fn present_with_text(&self, selector: &str, text: &str) {
        self.state.lock().elements.insert(
            selector.to_string(),
            ElementScript::Present {
                text: Some(text.to_string()),
            },
        );
    }

    /// Stage an element that only appears after it has been queried
    /// `queries` times (simulates state that changes while the flow runs).
    pub fn appears_after(&self, selector: &str, queries: usize) {
        self.state.lock().elements.insert(
            selector.to_string(),
            ElementScript::AppearsAfter {
                queries,
                text: None,
            },
        );
    }

    /// Queue URLs that successive `current_url` calls will report. Once the
    /// queue drains, the URL stays at the last reported (or last navigated)
    /// value.
    pub fn stage_urls<I, S>(&self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state.lock();
        for url in urls {
            state.url_sequence.push_back(url.into());
        }
    }

    /// Script `wait_detached` outcomes for a selector, consumed in order.
    /// Unscripted selectors never detach.
    pub fn stage_detach<I>(&self, selector: &str, results: I)
    where
        I: IntoIterator<Item = bool>,
    {
        self.state
            .lock()
            .detach_results
            .entry(selector.to_string())
            .or_default()
            .extend(results);
    }

    pub fn stage_snapshot(&self, snapshot: SessionSnapshot) {
        self.state.lock().snapshot = Some(snapshot);
    }

    pub fn actions(&self) -> Vec<SurfaceAction> {
        self.state.lock().actions.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state
            .lock()
            .actions
            .iter()
            .filter_map(|a| match a {
                SurfaceAction::Navigated(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    /// Texts filled into a selector, in order.
    pub fn fills_for(&self, selector: &str) -> Vec<String> {
        self.state
            .lock()
            .actions
            .iter()
            .filter_map(|a| match a {
                SurfaceAction::Filled { selector: s, text } if s == selector => {
                    Some(text.clone())
                }
                _ => None,
            })
            .collect()
    }
}

impl Default for ScriptedSurface {
    fn default() -> Self {
        Self::desktop()
    }
}

#[async_trait]
impl BrowserSurface for ScriptedSurface {
    async fn navigate(&self, url: &str) -> AppResult<()> {
        let mut state = self.state.lock();
        state.current_url = url.to_string();
        state.actions.push(SurfaceAction::Navigated(url.to_string()));
        Ok(())
    }

    async fn locate(
        &self,
        selector: &str,
        _timeout: Duration,
        _visibility: Visibility,
    ) -> Option<Element> {
        let mut state = self.state.lock();
        let counter = state.locate_counts.entry(selector.to_string()).or_insert(0);
        *counter += 1;
        let count = *counter;

        match state.elements.get(selector) {
            Some(ElementScript::Present { text }) => Some(element(selector, text)),
            Some(ElementScript::AppearsAfter { queries, text }) if count > *queries => {
                Some(element(selector, text))
            }
            _ => None,
        }
    }

    async fn wait_detached(&self, selector: &str, _timeout: Duration) -> bool {
        self.state
            .lock()
            .detach_results
            .get_mut(selector)
            .and_then(VecDeque::pop_front)
            .unwrap_or(false)
    }

    async fn fill(&self, selector: &str, text: &str) -> AppResult<()> {
        self.state.lock().actions.push(SurfaceAction::Filled {
            selector: selector.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn activate(&self, selector: &str) -> AppResult<()> {
        self.state
            .lock()
            .actions
            .push(SurfaceAction::Activated(selector.to_string()));
        Ok(())
    }

    async fn press(&self, key: &str) -> AppResult<()> {
        self.state
            .lock()
            .actions
            .push(SurfaceAction::Pressed(key.to_string()));
        Ok(())
    }

    async fn current_url(&self) -> String {
        let mut state = self.state.lock();
        if let Some(next) = state.url_sequence.pop_front() {
            state.current_url = next;
        }
        state.current_url.clone()
    }

    async fn snapshot(&self) -> AppResult<SessionSnapshot> {
        Ok(self.state.lock().snapshot.clone().unwrap_or_default())
    }

    fn is_mobile(&self) -> bool {
        self.mobile
    }
}

fn element(selector: &str, text: &Option<String>) -> Element {
    Element {
        selector: selector.to_string(),
        text: text.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_millis(1);

    #[tokio::test]
    async fn test_present_and_absent_elements() {
        let surface = ScriptedSurface::desktop();
        surface.present_with_text("#displaySign", "42");

        let found = surface
            .locate("#displaySign", WAIT, Visibility::Visible)
            .await;
        assert_eq!(found.unwrap().text.as_deref(), Some("42"));

        assert!(surface
            .locate("#missing", WAIT, Visibility::Visible)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_appears_after_queries() {
        let surface = ScriptedSurface::desktop();
        surface.appears_after("#late", 2);

        assert!(surface.locate("#late", WAIT, Visibility::Visible).await.is_none());
        assert!(surface.locate("#late", WAIT, Visibility::Visible).await.is_none());
        assert!(surface.locate("#late", WAIT, Visibility::Visible).await.is_some());
    }

    #[tokio::test]
    async fn test_url_sequence_then_sticks() {
        let surface = ScriptedSurface::desktop();
        surface.navigate("https://a.example/start").await.unwrap();
        surface.stage_urls(["https://a.example/next", "https://a.example/done"]);

        assert_eq!(surface.current_url().await, "https://a.example/next");
        assert_eq!(surface.current_url().await, "https://a.example/done");
        assert_eq!(surface.current_url().await, "https://a.example/done");
    }

    #[tokio::test]
    async fn test_detach_script_consumed_in_order() {
        let surface = ScriptedSurface::desktop();
        surface.stage_detach("form", [false, true]);

        assert!(!surface.wait_detached("form", WAIT).await);
        assert!(surface.wait_detached("form", WAIT).await);
        // Script exhausted: back to never detaching.
        assert!(!surface.wait_detached("form", WAIT).await);
    }

    #[tokio::test]
    async fn test_actions_recorded_in_order() {
        let surface = ScriptedSurface::mobile();
        surface.fill("input", "text").await.unwrap();
        surface.activate("button").await.unwrap();
        surface.press("Enter").await.unwrap();

        assert!(surface.is_mobile());
        assert_eq!(
            surface.actions(),
            vec![
                SurfaceAction::Filled {
                    selector: "input".to_string(),
                    text: "text".to_string()
                },
                SurfaceAction::Activated("button".to_string()),
                SurfaceAction::Pressed("Enter".to_string()),
            ]
        );
    }
}
