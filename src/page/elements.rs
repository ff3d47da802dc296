//! Element resolution: selector lookup, text filtering and cardinality.
//!
//! Finding candidates, filtering them by text and enforcing how many may
//! survive are separate steps so that each failure has its own message:
//!
//! | Failure | Error |
//! |---------|-------|
//! | Selector never matched before the find deadline | [`Error::NotFound`] |
//! | Candidates found, none contain the text | [`Error::NoMatch`] |
//! | More than one survivor where one is required | [`Error::AmbiguousMatch`] |

use tracing::debug;

use crate::error::{Error, Result, describe_search};
use crate::identifiers::ElementRef;
use crate::wait::{WaitOptions, wait_for};

use super::Page;

// ============================================================================
// Page - Element Search
// ============================================================================

impl Page {
    /// Polls `selector` until it matches at least one element.
    ///
    /// Returns every match of the first non-empty poll; elements added after
    /// that poll are not picked up.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] if nothing matched before the find deadline.
    pub async fn find_all(&self, selector: &str) -> Result<Vec<ElementRef>> {
        wait_for(
            move || async move {
                let refs = self.transport.find_all(selector).await?;
                Ok::<_, Error>((!refs.is_empty()).then_some(refs))
            },
            self.find,
        )
        .await
    }

    /// Keeps the elements whose text content contains `text`.
    ///
    /// The match is a case-sensitive substring test. An empty `text` keeps
    /// everything without touching the page.
    pub async fn filter_by_text(&self, refs: Vec<ElementRef>, text: &str) -> Result<Vec<ElementRef>> {
        if text.is_empty() {
            return Ok(refs);
        }

        let mut kept = Vec::with_capacity(refs.len());
        for element in refs {
            if self.transport.content(element, false).await?.contains(text) {
                kept.push(element);
            }
        }
        Ok(kept)
    }

    /// Resolves exactly one element.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the selector never matched
    /// - [`Error::NoMatch`] if no candidate contains `text`
    /// - [`Error::AmbiguousMatch`] if more than one does
    pub async fn resolve_one(&self, selector: &str, text: &str) -> Result<ElementRef> {
        let survivors = self.search(selector, text).await?;
        single(survivors, selector, text)
    }

    /// Resolves every element matching `selector` and containing `text`.
    ///
    /// The result may be empty when candidates exist but none pass the text
    /// filter.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the selector never matched.
    pub async fn resolve_many(&self, selector: &str, text: &str) -> Result<Vec<ElementRef>> {
        self.search(selector, text).await
    }

    /// Candidates that pass the text filter, with find timeouts renamed.
    async fn search(&self, selector: &str, text: &str) -> Result<Vec<ElementRef>> {
        let candidates = self.find_all(selector).await.map_err(|e| match e {
            Error::Timeout { .. } => Error::not_found(selector),
            other => other,
        })?;

        let survivors = self.filter_by_text(candidates, text).await?;

        debug!(selector, text, count = survivors.len(), "Resolved elements");
        Ok(survivors)
    }
}

// ============================================================================
// Page - Element Waiting
// ============================================================================

impl Page {
    /// Waits until exactly one element matches `selector` and contains
    /// `text`.
    ///
    /// Each attempt is a single lookup; an attempt with no match or with
    /// several matches is retried. Uses the configured wait tunables when
    /// `options` is `None`.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] naming the search when no attempt resolved.
    pub async fn wait_for_element(
        &self,
        selector: &str,
        text: &str,
        options: Option<WaitOptions>,
    ) -> Result<ElementRef> {
        let options = options.unwrap_or(self.wait_for_element);

        debug!(selector, text, timeout_ms = options.timeout_ms, "Waiting for element");

        wait_for(
            move || async move {
                let candidates = self.transport.find_all(selector).await?;
                let survivors = self.filter_by_text(candidates, text).await?;
                match single(survivors, selector, text) {
                    Ok(element) => Ok::<_, Error>(Some(element)),
                    Err(e) if e.is_resolution_error() => Ok(None),
                    Err(e) => Err(e),
                }
            },
            options,
        )
        .await
        .map_err(|e| match e {
            Error::Timeout { timeout_ms, .. } => Error::timeout(
                format!("wait_for_element {}", describe_search(selector, text)),
                timeout_ms,
            ),
            other => other,
        })
    }
}

/// Enforces exactly one survivor.
fn single(survivors: Vec<ElementRef>, selector: &str, text: &str) -> Result<ElementRef> {
    match survivors.as_slice() {
        [element] => Ok(*element),
        [] => Err(Error::no_match(selector, text)),
        many => Err(Error::ambiguous_match(many.len(), selector, text)),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use crate::error::Error;
    use crate::page::Page;
    use crate::testing::FakePage;
    use crate::transport::Transport;
    use crate::wait::WaitOptions;

    fn page_over(fake: &Arc<FakePage>) -> Page {
        Page::with_options(
            Transport::embedded(Arc::clone(fake) as _),
            WaitOptions::new(5000, 100),
            WaitOptions::new(5000, 200),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_one_with_text_then_click() {
        let fake = FakePage::shared();
        let open = fake.add_element(&[".btn"], "Open", "Open");
        let save = fake.add_element(&[".btn"], "Save", "<b>Save</b>");
        let close = fake.add_element(&[".btn"], "Close", "Close");
        let page = page_over(&fake);

        let element = page.resolve_one(".btn", "Save").await.expect("resolve");
        page.click(element).await.expect("click");

        assert_eq!(fake.clicks(save), 1);
        assert_eq!(fake.clicks(open) + fake.clicks(close), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_one_cardinality() {
        let fake = FakePage::shared();
        fake.add_element(&["li"], "a", "a");
        fake.add_element(&["li"], "b", "b");
        fake.add_element(&["li"], "c", "c");
        fake.add_element(&["h1"], "Title", "Title");
        let page = page_over(&fake);

        assert!(page.resolve_one("h1", "").await.is_ok());

        match page.resolve_one("li", "").await {
            Err(Error::AmbiguousMatch { count, search }) => {
                assert_eq!(count, 3);
                assert_eq!(search, "'li'");
            }
            other => panic!("expected ambiguous match, got {other:?}"),
        }

        let err = page.resolve_one("li", "zzz").await.unwrap_err();
        assert_eq!(err.to_string(), "No matches for 'li' with text 'zzz'.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_selector_that_never_matches_is_not_found() {
        let fake = FakePage::shared();
        let page = page_over(&fake);

        let err = page.resolve_one("#missing", "").await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot find element with '#missing'");

        // 5000 / 100 polls.
        assert_eq!(fake.find_calls(), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_many_may_be_empty_after_filter() {
        let fake = FakePage::shared();
        fake.add_element(&["li"], "apple", "apple");
        fake.add_element(&["li"], "banana", "banana");
        let page = page_over(&fake);

        assert_eq!(page.resolve_many("li", "").await.expect("all").len(), 2);
        assert!(page.resolve_many("li", "cherry").await.expect("none").is_empty());
        assert!(matches!(
            page.resolve_many("ol", "").await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_find_all_stops_at_first_nonempty_poll() {
        let fake = FakePage::shared();
        fake.add_late_element(&["li"], "first", "first", 2);
        fake.add_late_element(&["li"], "second", "second", 10);
        let page = page_over(&fake);

        let refs = page.find_all("li").await.expect("find");
        assert_eq!(refs.len(), 1);
        assert_eq!(fake.find_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_is_case_sensitive() {
        let fake = FakePage::shared();
        fake.add_element(&["p"], "Save changes", "");
        let page = page_over(&fake);

        let refs = page.find_all("p").await.expect("find");
        assert_eq!(page.filter_by_text(refs.clone(), "save").await.expect("filter").len(), 0);
        assert_eq!(page.filter_by_text(refs, "Save").await.expect("filter").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_element_waits_for_text() {
        let fake = FakePage::shared();
        fake.add_element(&[".toast"], "Saving", "");
        let done = fake.add_late_element(&[".status"], "Saved", "", 3);
        let page = page_over(&fake);

        let element = page
            .wait_for_element(".status", "Saved", None)
            .await
            .expect("appears");
        page.click(element).await.expect("click");
        assert_eq!(fake.clicks(done), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_element_times_out_with_search() {
        let fake = FakePage::shared();
        fake.add_element(&["li"], "a", "");
        fake.add_element(&["li"], "a", "");
        let page = page_over(&fake);

        let err = page
            .wait_for_element("li", "a", Some(WaitOptions::new(1000, 250)))
            .await
            .unwrap_err();

        match err {
            Error::Timeout {
                operation,
                timeout_ms,
            } => {
                assert_eq!(timeout_ms, 1000);
                assert!(operation.contains("'li' with text 'a'"));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(fake.find_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_invalidates_waited_element() {
        let fake = FakePage::shared();
        fake.add_element(&["div"], "x", "");
        let page = page_over(&fake);

        let element = page.wait_for_element("div", "", None).await.expect("found");
        page.cleanup().await.expect("cleanup");
        assert!(matches!(
            page.click(element).await,
            Err(Error::StaleElement { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_filter_by_text_is_idempotent(
            texts in prop::collection::vec("[abc]{0,4}", 1..8),
            needle in "[abc]{0,2}",
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .expect("runtime");

            rt.block_on(async {
                let fake = FakePage::shared();
                for text in &texts {
                    fake.add_element(&["span"], text, "");
                }
                let page = page_over(&fake);

                let refs = page.find_all("span").await.expect("find");
                let once = page.filter_by_text(refs, &needle).await.expect("filter");
                let twice = page.filter_by_text(once.clone(), &needle).await.expect("filter");
                assert_eq!(once, twice);
            });
        }
    }
}
