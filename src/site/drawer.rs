//! Mobile navigation drawer.

use std::sync::OnceLock;

use tracing::debug;

use crate::dom::{closest, select_all, select_first, NodeId, Page, Selector};

/// Viewport width above which the drawer is always closed.
pub const DRAWER_BREAKPOINT: u32 = 860;

pub const OPEN_CLASS: &str = "open";
pub const BODY_OPEN_CLASS: &str = "drawer-open";

static TOGGLE_SELECTOR: OnceLock<Selector> = OnceLock::new();
static DRAWER_SELECTOR: OnceLock<Selector> = OnceLock::new();
static LINK_SELECTOR: OnceLock<Selector> = OnceLock::new();
static LANGUAGE_CONTROL_SELECTOR: OnceLock<Selector> = OnceLock::new();

fn toggle_selector() -> &'static Selector {
    TOGGLE_SELECTOR.get_or_init(|| Selector::parse(".nav-toggle").unwrap())
}

/// Toggle button plus drawer panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drawer {
    toggle: NodeId,
    drawer: NodeId,
}

impl Drawer {
    /// Wire the drawer of `page`, removing duplicate `.nav-toggle` buttons.
    ///
    /// Returns `None` when the page has no toggle or no `.mobile-drawer`.
    pub fn attach<P: Page + ?Sized>(page: &mut P) -> Option<Self> {
        let toggles = select_all(page, toggle_selector());
        if toggles.len() > 1 {
            debug!("Removing {} duplicate nav toggles", toggles.len() - 1);
            for &extra in &toggles[1..] {
                page.remove_element(extra);
            }
        }

        let drawer_selector =
            DRAWER_SELECTOR.get_or_init(|| Selector::parse(".mobile-drawer").unwrap());
        let toggle = toggles.first().copied()?;
        let drawer = select_first(page, drawer_selector)?;
        Some(Self { toggle, drawer })
    }

    pub fn toggle_button(&self) -> NodeId {
        self.toggle
    }

    pub fn panel(&self) -> NodeId {
        self.drawer
    }

    pub fn is_open<P: Page + ?Sized>(&self, page: &P) -> bool {
        page.has_class(self.drawer, OPEN_CLASS)
    }

    pub fn open<P: Page + ?Sized>(&self, page: &mut P) {
        page.add_class(self.drawer, OPEN_CLASS);
        page.set_attribute(self.toggle, "aria-expanded", "true");
        page.remove_attribute(self.drawer, "hidden");
        if let Some(body) = page.body() {
            page.set_style_property(body, "overflow", Some("hidden"));
            page.add_class(body, BODY_OPEN_CLASS);
        }
    }

    pub fn close<P: Page + ?Sized>(&self, page: &mut P) {
        page.remove_class(self.drawer, OPEN_CLASS);
        page.set_attribute(self.toggle, "aria-expanded", "false");
        page.set_attribute(self.drawer, "hidden", "");
        if let Some(body) = page.body() {
            page.set_style_property(body, "overflow", None);
            page.remove_class(body, BODY_OPEN_CLASS);
        }
    }

    /// Click on the toggle button.
    pub fn toggle<P: Page + ?Sized>(&self, page: &mut P) {
        if self.is_open(page) {
            self.close(page);
        } else {
            self.open(page);
        }
    }

    /// Key press anywhere on the page. Returns true if the drawer closed.
    pub fn on_key<P: Page + ?Sized>(&self, page: &mut P, key: &str) -> bool {
        if key != "Escape" {
            return false;
        }
        self.close(page);
        true
    }

    /// Window resized to `width` pixels. Returns true if the drawer closed.
    pub fn on_resize<P: Page + ?Sized>(&self, page: &mut P, width: u32) -> bool {
        if width <= DRAWER_BREAKPOINT {
            return false;
        }
        self.close(page);
        true
    }

    /// Click inside the drawer panel. Links and language controls close it.
    pub fn on_drawer_click<P: Page + ?Sized>(&self, page: &mut P, target: NodeId) -> bool {
        let link = LINK_SELECTOR.get_or_init(|| Selector::parse("a").unwrap());
        let language = LANGUAGE_CONTROL_SELECTOR
            .get_or_init(|| Selector::parse(".lang-switch [data-lang]").unwrap());

        if closest(page, target, link).is_some() || closest(page, target, language).is_some() {
            self.close(page);
            return true;
        }
        false
    }
}
