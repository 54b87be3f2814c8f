//! Page-fade transitions between internal pages and header scroll state.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::Url;
use tracing::debug;

use crate::dom::{closest, select_first, NodeId, Page, Selector};
use crate::site::reveal::AnimationDriver;

/// Time the fade-out runs before navigating.
pub const TRANSITION_DURATION: Duration = Duration::from_millis(380);

/// Scroll offset (px) past which the header is marked `scrolled`.
pub const HEADER_SCROLL_THRESHOLD: f64 = 6.0;

pub const READY_CLASS: &str = "is-ready";
pub const FADE_OUT_CLASS: &str = "fade-out";
pub const SCROLLED_CLASS: &str = "scrolled";

static ANCHOR_SELECTOR: OnceLock<Selector> = OnceLock::new();
static HEADER_SELECTOR: OnceLock<Selector> = OnceLock::new();

/// What a click on a link should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    /// Not a link we handle; the browser default applies.
    Passthrough,
    /// In-page anchor whose target exists.
    ScrollTo(NodeId),
    /// In-page anchor with no target; the click is swallowed.
    Stay,
    /// Internal page; fade out then navigate.
    Navigate(Url),
}

/// Link handling relative to the URL of the current page.
#[derive(Debug, Clone)]
pub struct PageTransitions {
    current: Url,
}

impl PageTransitions {
    pub fn new(current: Url) -> Self {
        Self { current }
    }

    pub fn current_url(&self) -> &Url {
        &self.current
    }

    /// Decide what a click on `target` does, without touching the page.
    pub fn classify<P: Page + ?Sized>(&self, page: &P, target: NodeId) -> LinkAction {
        let anchor_selector = ANCHOR_SELECTOR.get_or_init(|| Selector::parse("a").unwrap());
        let Some(anchor) = closest(page, target, anchor_selector) else {
            return LinkAction::Passthrough;
        };

        if page.has_attribute(anchor, "data-no-transition")
            || page.attribute(anchor, "target") == Some("_blank")
            || page.has_attribute(anchor, "download")
        {
            return LinkAction::Passthrough;
        }

        let Some(href) = page.attribute(anchor, "href") else {
            return LinkAction::Passthrough;
        };
        let Ok(resolved) = self.current.join(href) else {
            return LinkAction::Passthrough;
        };
        if resolved.origin() != self.current.origin() {
            return LinkAction::Passthrough;
        }

        if href.is_empty() {
            return LinkAction::Stay;
        }
        if let Some(fragment) = href.strip_prefix('#') {
            return match element_by_id(page, fragment) {
                Some(id) => LinkAction::ScrollTo(id),
                None => LinkAction::Stay,
            };
        }

        LinkAction::Navigate(resolved)
    }

    /// Handle a link click: scroll in-page anchors, start the fade for
    /// internal pages. Returns the action taken.
    pub fn on_click<P: Page + ?Sized, D: AnimationDriver>(
        &self,
        page: &mut P,
        driver: &mut D,
        target: NodeId,
    ) -> LinkAction {
        let action = self.classify(page, target);
        match &action {
            LinkAction::ScrollTo(id) => driver.scroll_to(page, *id),
            LinkAction::Navigate(url) => {
                debug!("Fading out before navigating to {}", url);
                if let Some(body) = page.body() {
                    page.add_class(body, FADE_OUT_CLASS);
                }
            }
            LinkAction::Passthrough | LinkAction::Stay => {}
        }
        action
    }
}

/// Wait for the fade-out, then hand the URL to `navigate`.
pub async fn navigate_after_fade<F: FnOnce(Url)>(url: Url, navigate: F) {
    tokio::time::sleep(TRANSITION_DURATION).await;
    navigate(url);
}

/// Mark the page ready once it has rendered.
pub fn mark_ready<P: Page + ?Sized>(page: &mut P) {
    if let Some(body) = page.body() {
        page.add_class(body, READY_CLASS);
    }
}

/// Page shown again; restored from the back-forward cache when `persisted`.
pub fn on_page_show<P: Page + ?Sized>(page: &mut P, persisted: bool) {
    if !persisted {
        return;
    }
    if let Some(body) = page.body() {
        page.remove_class(body, FADE_OUT_CLASS);
        page.add_class(body, READY_CLASS);
    }
}

/// Toggle the header `scrolled` class for a vertical scroll offset.
pub fn update_header<P: Page + ?Sized>(page: &mut P, scroll_y: f64) {
    let selector = HEADER_SELECTOR.get_or_init(|| Selector::parse(".site-header").unwrap());
    let Some(header) = select_first(page, selector) else {
        return;
    };
    if scroll_y > HEADER_SCROLL_THRESHOLD {
        page.add_class(header, SCROLLED_CLASS);
    } else {
        page.remove_class(header, SCROLLED_CLASS);
    }
}

fn element_by_id<P: Page + ?Sized>(page: &P, id: &str) -> Option<NodeId> {
    if id.is_empty() {
        return None;
    }
    page.elements()
        .into_iter()
        .find(|&node| page.attribute(node, "id") == Some(id))
}
