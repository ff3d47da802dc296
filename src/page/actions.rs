//! UI actions, content access and scripting.
//!
//! Synthetic events do not trigger the browser's default actions: setting a
//! value does not fire `input` or `change` on its own, so tests dispatch the
//! event they need explicitly.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::Result;
use crate::identifiers::ElementRef;

use super::Page;

// ============================================================================
// Page - Actions
// ============================================================================

impl Page {
    /// Clicks an element.
    pub async fn click(&self, element: ElementRef) -> Result<()> {
        trace!(%element, "click");
        self.transport.click(element).await
    }

    /// Assigns `element.value`.
    ///
    /// Works for component inputs whose value is otherwise private.
    pub async fn set_value(&self, element: ElementRef, value: &str) -> Result<()> {
        trace!(%element, value, "set_value");
        self.transport.set_value(element, value).await
    }

    /// Dispatches a synthetic event of `event_type` on an element.
    pub async fn dispatch_event(&self, element: ElementRef, event_type: &str) -> Result<()> {
        trace!(%element, event_type, "dispatch_event");
        self.transport.dispatch_event(element, event_type).await
    }

    /// Drops every element reference issued so far.
    ///
    /// Call after any action that replaces the page context, e.g. navigation.
    pub async fn cleanup(&self) -> Result<()> {
        debug!("Cleaning up element references");
        self.transport.cleanup().await
    }
}

// ============================================================================
// Page - Content
// ============================================================================

impl Page {
    /// Inner HTML of an element.
    pub async fn html_content(&self, element: ElementRef) -> Result<String> {
        self.transport.content(element, true).await
    }

    /// Text content of an element.
    pub async fn text_content(&self, element: ElementRef) -> Result<String> {
        self.transport.content(element, false).await
    }

    /// Replaces the inner HTML of an element, returning the previous HTML.
    pub async fn set_content(&self, element: ElementRef, html: &str) -> Result<String> {
        self.transport.set_content(element, html).await
    }
}

// ============================================================================
// Page - Scripting
// ============================================================================

impl Page {
    /// Evaluates a JavaScript expression.
    ///
    /// # Errors
    ///
    /// [`Error::Script`](crate::error::Error::Script) if it throws.
    pub async fn eval(&self, code: &str) -> Result<Value> {
        self.transport.eval(code).await
    }

    /// Evaluates an expression and deserializes its JSON encoding as `T`.
    pub async fn eval_json<T: DeserializeOwned>(&self, code: &str) -> Result<T> {
        self.transport.eval_json(code).await
    }

    /// Device-pixel `[left, top, width, height]` of the single element
    /// matching `selector`, for region captures.
    pub async fn position(&self, selector: &str) -> Result<[f64; 4]> {
        self.transport.position(selector).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde::Deserialize;

    use crate::config::Config;
    use crate::page::Page;
    use crate::testing::FakePage;
    use crate::transport::Transport;

    fn page_over(fake: &Arc<FakePage>) -> Page {
        Page::new(Transport::embedded(Arc::clone(fake) as _), &Config::default())
    }

    #[tokio::test]
    async fn test_set_value_then_change_event() {
        let fake = FakePage::shared();
        let input = fake.add_element(&["#qty"], "", "");
        let page = page_over(&fake);

        let element = page.resolve_one("#qty", "").await.expect("resolve");
        page.set_value(element, "3").await.expect("set");
        page.dispatch_event(element, "change").await.expect("event");

        assert_eq!(fake.value(input), "3");
        assert_eq!(fake.events(input), vec!["change".to_string()]);
    }

    #[tokio::test]
    async fn test_content_accessors() {
        let fake = FakePage::shared();
        let cell = fake.add_element(&["td"], "42", "<i>42</i>");
        let page = page_over(&fake);

        let element = page.resolve_one("td", "").await.expect("resolve");
        assert_eq!(page.html_content(element).await.expect("html"), "<i>42</i>");
        assert_eq!(page.text_content(element).await.expect("text"), "42");

        let previous = page.set_content(element, "<i>43</i>").await.expect("set");
        assert_eq!(previous, "<i>42</i>");
        assert_eq!(fake.html(cell), "<i>43</i>");
    }

    #[tokio::test]
    async fn test_eval_json_and_position() {
        #[derive(Deserialize)]
        struct Point {
            x: i32,
            y: i32,
        }

        let fake = FakePage::shared();
        let chart = fake.add_element(&["#chart"], "", "");
        fake.set_rect(chart, [10.0, 20.0, 300.0, 150.0]);
        let page = page_over(&fake);

        let point: Point = page.eval_json(r#"{"x": 3, "y": -4}"#).await.expect("eval");
        assert_eq!((point.x, point.y), (3, -4));

        assert_eq!(
            page.position("#chart").await.expect("position"),
            [10.0, 20.0, 300.0, 150.0]
        );
        assert!(page.position("#nothing").await.is_err());
    }
}
