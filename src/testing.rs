//! In-memory test doubles shared by the unit tests.
//!
//! [`FakePage`] is a [`ScriptHost`] with a tiny DOM, a storage map that counts
//! writes, document title and capture-marker state, and knobs for injecting
//! failures. [`FakeCapture`] is a [`CaptureService`] that records its calls.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::checkpoint::{CaptureOutcome, CaptureService};
use crate::error::{Error, Result};
use crate::identifiers::{ElementRef, SessionId};
use crate::transport::{RefArena, ScriptHost};

// ============================================================================
// Tracing
// ============================================================================

/// Installs a test-writer subscriber once per process.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("icu_harness=debug")),
        )
        .with_test_writer()
        .try_init();
}

// ============================================================================
// FakePage
// ============================================================================

/// Chrome on Windows.
pub(crate) const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Default)]
struct FakeElement {
    selectors: Vec<String>,
    text: String,
    html: String,
    value: String,
    clicks: usize,
    events: Vec<String>,
    rect: [f64; 4],
    /// Number of earlier `find_all` calls before the element is rendered.
    appears_after: usize,
}

#[derive(Debug)]
struct PageState {
    elements: Vec<FakeElement>,
    refs: RefArena<usize>,
    find_calls: usize,
    storage: FxHashMap<String, String>,
    storage_writes: usize,
    storage_removes: usize,
    title: String,
    capture_marker: bool,
    user_agent: Option<String>,
    echo_override: Option<String>,
    capture_error: Option<String>,
    restore_error: Option<String>,
}

/// Scriptable in-memory page.
#[derive(Debug)]
pub(crate) struct FakePage {
    state: Mutex<PageState>,
}

impl Default for FakePage {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePage {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(PageState {
                elements: Vec::new(),
                refs: RefArena::new(),
                find_calls: 0,
                storage: FxHashMap::default(),
                storage_writes: 0,
                storage_removes: 0,
                title: "App".to_string(),
                capture_marker: false,
                user_agent: Some(CHROME_UA.to_string()),
                echo_override: None,
                capture_error: None,
                restore_error: None,
            }),
        }
    }

    pub(crate) fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Adds a rendered element and returns its DOM index.
    pub(crate) fn add_element(&self, selectors: &[&str], text: &str, html: &str) -> usize {
        self.add_late_element(selectors, text, html, 0)
    }

    /// Adds an element that only renders after `after_finds` queries.
    pub(crate) fn add_late_element(
        &self,
        selectors: &[&str],
        text: &str,
        html: &str,
        after_finds: usize,
    ) -> usize {
        let mut state = self.state.lock();
        state.elements.push(FakeElement {
            selectors: selectors.iter().map(|s| (*s).to_string()).collect(),
            text: text.to_string(),
            html: html.to_string(),
            appears_after: after_finds,
            ..FakeElement::default()
        });
        state.elements.len() - 1
    }

    pub(crate) fn set_rect(&self, index: usize, rect: [f64; 4]) {
        self.state.lock().elements[index].rect = rect;
    }

    pub(crate) fn clicks(&self, index: usize) -> usize {
        self.state.lock().elements[index].clicks
    }

    pub(crate) fn value(&self, index: usize) -> String {
        self.state.lock().elements[index].value.clone()
    }

    pub(crate) fn events(&self, index: usize) -> Vec<String> {
        self.state.lock().elements[index].events.clone()
    }

    pub(crate) fn html(&self, index: usize) -> String {
        self.state.lock().elements[index].html.clone()
    }

    pub(crate) fn find_calls(&self) -> usize {
        self.state.lock().find_calls
    }

    pub(crate) fn live_refs(&self) -> usize {
        self.state.lock().refs.len()
    }

    pub(crate) fn stored(&self, key: &str) -> Option<String> {
        self.state.lock().storage.get(key).cloned()
    }

    /// Seeds storage without counting a write.
    pub(crate) fn seed_storage(&self, key: &str, value: &str) {
        self.state
            .lock()
            .storage
            .insert(key.to_string(), value.to_string());
    }

    pub(crate) fn storage_writes(&self) -> usize {
        self.state.lock().storage_writes
    }

    pub(crate) fn storage_removes(&self) -> usize {
        self.state.lock().storage_removes
    }

    pub(crate) fn title(&self) -> String {
        self.state.lock().title.clone()
    }

    pub(crate) fn has_capture_marker(&self) -> bool {
        self.state.lock().capture_marker
    }

    pub(crate) fn set_user_agent(&self, user_agent: &str) {
        self.state.lock().user_agent = Some(user_agent.to_string());
    }

    /// Makes reading `navigator.userAgent` throw.
    pub(crate) fn fail_user_agent(&self) {
        self.state.lock().user_agent = None;
    }

    /// Makes the installation echo return `token` instead of the request.
    pub(crate) fn set_echo(&self, token: &str) {
        self.state.lock().echo_override = Some(token.to_string());
    }

    /// Makes entering capture mode fail with a script error.
    pub(crate) fn fail_capture_start(&self, message: &str) {
        self.state.lock().capture_error = Some(message.to_string());
    }

    /// Makes leaving capture mode fail with a script error.
    pub(crate) fn fail_capture_restore(&self, message: &str) {
        self.state.lock().restore_error = Some(message.to_string());
    }

    fn with_element<R>(
        &self,
        element: ElementRef,
        f: impl FnOnce(&mut FakeElement) -> R,
    ) -> Result<R> {
        let mut state = self.state.lock();
        let index = *state.refs.get(element)?;
        Ok(f(&mut state.elements[index]))
    }
}

impl ScriptHost for FakePage {
    fn eval(&self, code: &str) -> Result<Value> {
        let state = self.state.lock();
        match code {
            "navigator.userAgent" => state
                .user_agent
                .clone()
                .map(Value::String)
                .ok_or_else(|| Error::script("TypeError: navigator is undefined")),
            "document.title" => Ok(Value::String(state.title.clone())),
            other => serde_json::from_str(other)
                .map_err(|_| Error::script(format!("ReferenceError: {other} is not defined"))),
        }
    }

    fn find_all(&self, selector: &str) -> Result<Vec<ElementRef>> {
        let mut state = self.state.lock();
        let seen = state.find_calls;
        state.find_calls += 1;

        let matching: Vec<usize> = state
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.appears_after <= seen && e.selectors.iter().any(|s| s == selector))
            .map(|(i, _)| i)
            .collect();

        Ok(matching.into_iter().map(|i| state.refs.insert(i)).collect())
    }

    fn click(&self, element: ElementRef) -> Result<()> {
        self.with_element(element, |e| e.clicks += 1)
    }

    fn set_value(&self, element: ElementRef, value: &str) -> Result<()> {
        self.with_element(element, |e| e.value = value.to_string())
    }

    fn dispatch_event(&self, element: ElementRef, event_type: &str) -> Result<()> {
        self.with_element(element, |e| e.events.push(event_type.to_string()))
    }

    fn content(&self, element: ElementRef, as_html: bool) -> Result<String> {
        self.with_element(element, |e| {
            if as_html {
                e.html.clone()
            } else {
                e.text.clone()
            }
        })
    }

    fn set_content(&self, element: ElementRef, html: &str) -> Result<String> {
        self.with_element(element, |e| {
            e.text = html.to_string();
            std::mem::replace(&mut e.html, html.to_string())
        })
    }

    fn cleanup(&self) -> Result<()> {
        self.state.lock().refs.clear();
        Ok(())
    }

    fn storage_get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.state.lock().storage.get(key).cloned())
    }

    fn storage_set(&self, key: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.storage_writes += 1;
        state.storage.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn storage_remove(&self, key: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.storage_removes += 1;
        state.storage.remove(key);
        Ok(())
    }

    fn capture_mode(&self, title: &str, start: bool) -> Result<String> {
        let mut state = self.state.lock();
        if start {
            if let Some(message) = &state.capture_error {
                return Err(Error::script(message.clone()));
            }
            state.capture_marker = true;
        } else {
            if let Some(message) = &state.restore_error {
                return Err(Error::script(message.clone()));
            }
            state.capture_marker = false;
        }
        Ok(std::mem::replace(&mut state.title, title.to_string()))
    }

    fn position(&self, selector: &str) -> Result<[f64; 4]> {
        let state = self.state.lock();
        let matching: Vec<&FakeElement> = state
            .elements
            .iter()
            .filter(|e| e.selectors.iter().any(|s| s == selector))
            .collect();

        match matching.as_slice() {
            [single] => Ok(single.rect),
            _ => Err(Error::script(format!(
                "Expected one element for '{selector}', found {}",
                matching.len()
            ))),
        }
    }

    fn echo(&self, token: &str) -> Result<String> {
        let state = self.state.lock();
        Ok(state
            .echo_override
            .clone()
            .unwrap_or_else(|| token.to_string()))
    }
}

// ============================================================================
// FakeCapture
// ============================================================================

/// Scripted result of a [`FakeCapture`] call.
#[derive(Debug, Clone)]
pub(crate) enum CaptureBehavior {
    Pass,
    Fail,
    Error(String),
}

/// What the page looked like when a capture ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CaptureCall {
    pub session: String,
    pub title: String,
    pub page_title: Option<String>,
    pub marker: bool,
}

/// Recording capture service.
pub(crate) struct FakeCapture {
    behavior: CaptureBehavior,
    page: Option<Arc<FakePage>>,
    calls: Mutex<Vec<CaptureCall>>,
}

impl FakeCapture {
    pub(crate) fn new(behavior: CaptureBehavior) -> Self {
        Self {
            behavior,
            page: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Also records the page's title and marker at capture time.
    pub(crate) fn observing(behavior: CaptureBehavior, page: Arc<FakePage>) -> Self {
        Self {
            behavior,
            page: Some(page),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<CaptureCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CaptureService for FakeCapture {
    async fn init_image_capture(&self, session: &SessionId, title: &str) -> Result<CaptureOutcome> {
        self.calls.lock().push(CaptureCall {
            session: session.to_string(),
            title: title.to_string(),
            page_title: self.page.as_ref().map(|p| p.title()),
            marker: self.page.as_ref().is_some_and(|p| p.has_capture_marker()),
        });

        match &self.behavior {
            CaptureBehavior::Pass => Ok(CaptureOutcome::passed(format!("{title}.png"))),
            CaptureBehavior::Fail => Ok(CaptureOutcome::failed(format!("{title}.diff.png"))),
            CaptureBehavior::Error(message) => Err(Error::script(message.clone())),
        }
    }
}
