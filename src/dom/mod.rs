//! Page abstraction the presentation layer runs against.
//!
//! Everything that reads or mutates the rendered page goes through the
//! [`Page`] trait, so the translation engine and the site behaviors can be
//! exercised against the in-memory [`Document`] without a browser.
//!
//! # Architecture
//!
//! - `document`: Arena-backed in-memory element tree implementing `Page`
//! - `selector`: Small CSS selector subset (tag, `#id`, `.class`, `[attr]`,
//!   `[attr="value"]`, descendant combinator) with query helpers

mod document;
mod selector;

pub use document::Document;
pub use selector::{
    closest, select_all, select_all_within, select_first, select_first_within, Selector,
    SelectorError,
};

/// Stable handle to an element inside a [`Page`].
pub type NodeId = usize;

/// Read/write access to the elements of the current page.
///
/// Implementations only expose elements that are attached to the tree;
/// element ids stay valid after removal but detached elements are no
/// longer returned by [`Page::elements`] or reachable through `children`.
pub trait Page {
    /// The document element (`<html>`).
    fn root(&self) -> NodeId;

    /// All attached elements in document order, root included.
    fn elements(&self) -> Vec<NodeId>;

    /// Lowercase tag name of an element.
    fn tag_name(&self, id: NodeId) -> &str;

    fn parent(&self, id: NodeId) -> Option<NodeId>;

    /// Element children in document order (text nodes are not included).
    fn children(&self, id: NodeId) -> Vec<NodeId>;

    fn attribute(&self, id: NodeId, name: &str) -> Option<&str>;

    fn set_attribute(&mut self, id: NodeId, name: &str, value: &str);

    fn remove_attribute(&mut self, id: NodeId, name: &str);

    /// Concatenated text of the element and all of its descendants.
    fn text_content(&self, id: NodeId) -> String;

    /// Replace every child of the element with a single text node.
    fn set_text_content(&mut self, id: NodeId, text: &str);

    /// Create a new element as the last child of `parent`.
    fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId;

    /// Detach an element (and its subtree) from its parent.
    fn remove_element(&mut self, id: NodeId);

    fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    fn has_element_children(&self, id: NodeId) -> bool {
        !self.children(id).is_empty()
    }

    fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attribute(id, "class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        let classes = match self.attribute(id, "class") {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{} {}", existing.trim(), class)
            }
            _ => class.to_string(),
        };
        self.set_attribute(id, "class", &classes);
    }

    fn remove_class(&mut self, id: NodeId, class: &str) {
        if !self.has_class(id, class) {
            return;
        }
        let remaining = self
            .attribute(id, "class")
            .unwrap_or_default()
            .split_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(id, "class", &remaining);
    }

    /// Value of one declaration of the inline `style` attribute.
    fn style_property(&self, id: NodeId, property: &str) -> Option<String> {
        self.attribute(id, "style")?
            .split(';')
            .filter_map(|declaration| declaration.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case(property))
            .map(|(_, value)| value.trim().to_string())
    }

    /// Set (`Some`) or clear (`None`) one inline style declaration, keeping
    /// the others. An empty style attribute is removed.
    fn set_style_property(&mut self, id: NodeId, property: &str, value: Option<&str>) {
        let mut declarations: Vec<String> = self
            .attribute(id, "style")
            .unwrap_or_default()
            .split(';')
            .map(str::trim)
            .filter(|declaration| !declaration.is_empty())
            .filter(|declaration| {
                let name = declaration.split(':').next().unwrap_or_default();
                !name.trim().eq_ignore_ascii_case(property)
            })
            .map(str::to_owned)
            .collect();

        if let Some(value) = value {
            declarations.push(format!("{}: {}", property, value));
        }

        if declarations.is_empty() {
            self.remove_attribute(id, "style");
        } else {
            self.set_attribute(id, "style", &declarations.join("; "));
        }
    }

    /// First `<body>` element, if the page has one.
    fn body(&self) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|&id| self.tag_name(id) == "body")
    }

    /// Set the `lang` attribute of the document element.
    fn set_document_lang(&mut self, lang: &str) {
        let root = self.root();
        self.set_attribute(root, "lang", lang);
    }

    fn document_lang(&self) -> Option<&str> {
        self.attribute(self.root(), "lang")
    }
}
