use super::{NodeId, Page};

#[derive(Debug, Clone)]
enum Child {
    Element(NodeId),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<Child>,
    parent: Option<NodeId>,
}

impl Node {
    fn new(tag: &str, parent: Option<NodeId>) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            children: Vec::new(),
            parent,
        }
    }
}

/// In-memory element tree.
///
/// Nodes live in an arena and are addressed by [`NodeId`]; removing an
/// element only detaches it, so ids handed out earlier never dangle.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// Create a document containing `<html><body></body></html>`.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: vec![Node::new("html", None)],
        };
        doc.append_element(0, "body");
        doc
    }

    /// Append an element with attributes to `parent`.
    pub fn append_with(&mut self, parent: NodeId, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let id = self.append_element(parent, tag);
        for (name, value) in attributes {
            self.set_attribute(id, name, value);
        }
        id
    }

    /// Append an element with attributes and a single text child.
    pub fn append_text_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attributes: &[(&str, &str)],
        text: &str,
    ) -> NodeId {
        let id = self.append_with(parent, tag, attributes);
        self.append_text(id, text);
        id
    }

    /// Append a text node to `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        self.nodes[parent].children.push(Child::Text(text.to_string()));
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        for child in &self.nodes[id].children {
            match child {
                Child::Text(text) => out.push_str(text),
                Child::Element(child_id) => self.collect_text(*child_id, out),
            }
        }
    }

    fn collect_elements(&self, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        for child in &self.nodes[id].children {
            if let Child::Element(child_id) = child {
                self.collect_elements(*child_id, out);
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Page for Document {
    fn root(&self) -> NodeId {
        0
    }

    fn elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements(self.root(), &mut out);
        out
    }

    fn tag_name(&self, id: NodeId) -> &str {
        &self.nodes[id].tag
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id]
            .children
            .iter()
            .filter_map(|child| match child {
                Child::Element(child_id) => Some(*child_id),
                Child::Text(_) => None,
            })
            .collect()
    }

    fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id]
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let attributes = &mut self.nodes[id].attributes;
        match attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => attributes.push((name.to_string(), value.to_string())),
        }
    }

    fn remove_attribute(&mut self, id: NodeId, name: &str) {
        self.nodes[id].attributes.retain(|(key, _)| key != name);
    }

    fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn set_text_content(&mut self, id: NodeId, text: &str) {
        let previous = std::mem::take(&mut self.nodes[id].children);
        for child in previous {
            if let Child::Element(child_id) = child {
                self.nodes[child_id].parent = None;
            }
        }
        if !text.is_empty() {
            self.nodes[id].children.push(Child::Text(text.to_string()));
        }
    }

    fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::new(tag, Some(parent)));
        self.nodes[parent].children.push(Child::Element(id));
        id
    }

    fn remove_element(&mut self, id: NodeId) {
        let Some(parent) = self.nodes[id].parent.take() else {
            return;
        };
        self.nodes[parent]
            .children
            .retain(|child| !matches!(child, Child::Element(child_id) if *child_id == id));
    }
}
