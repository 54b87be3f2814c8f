use std::iter::Peekable;
use std::str::{Chars, FromStr};

use thiserror::Error;

use super::{NodeId, Page};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("expected an identifier after '{0}'")]
    ExpectedIdent(char),

    #[error("unterminated attribute selector")]
    UnterminatedAttribute,

    #[error("unexpected character '{0}'")]
    Unexpected(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeMatch {
    name: String,
    value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeMatch>,
}

impl Compound {
    fn matches<P: Page + ?Sized>(&self, page: &P, node: NodeId) -> bool {
        if let Some(tag) = &self.tag {
            if page.tag_name(node) != tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if page.attribute(node, "id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|class| page.has_class(node, class)) {
            return false;
        }
        self.attributes.iter().all(|attr| match (&attr.value, page.attribute(node, &attr.name)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(expected), Some(actual)) => expected == actual,
        })
    }
}

/// A parsed selector: compound selectors joined by descendant combinators.
///
/// Supported syntax: `tag`, `*`, `#id`, `.class`, `[attr]`, `[attr="value"]`
/// and whitespace between compounds. That covers every selector the site
/// scripts use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    compounds: Vec<Compound>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        input.parse()
    }

    /// Whether `node` matches this selector.
    pub fn matches<P: Page + ?Sized>(&self, page: &P, node: NodeId) -> bool {
        let Some((last, ancestors)) = self.compounds.split_last() else {
            return false;
        };
        if !last.matches(page, node) {
            return false;
        }

        // Descendant-only chains can be matched greedily against the nearest ancestor.
        let mut current = page.parent(node);
        for compound in ancestors.iter().rev() {
            loop {
                let Some(candidate) = current else {
                    return false;
                };
                current = page.parent(candidate);
                if compound.matches(page, candidate) {
                    break;
                }
            }
        }
        true
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut chars = input.trim().chars().peekable();
        let mut compounds = Vec::new();

        loop {
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
            if chars.peek().is_none() {
                break;
            }
            compounds.push(parse_compound(&mut chars)?);
        }

        if compounds.is_empty() {
            return Err(SelectorError::Empty);
        }
        Ok(Self { compounds })
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn read_ident(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        ident.push(c);
        chars.next();
    }
    ident
}

fn parse_compound(chars: &mut Peekable<Chars<'_>>) -> Result<Compound, SelectorError> {
    let mut compound = Compound::default();

    match chars.peek() {
        Some('*') => {
            chars.next();
        }
        Some(&c) if is_ident_char(c) => {
            compound.tag = Some(read_ident(chars).to_ascii_lowercase());
        }
        _ => {}
    }

    while let Some(&c) = chars.peek() {
        match c {
            '.' | '#' => {
                chars.next();
                let ident = read_ident(chars);
                if ident.is_empty() {
                    return Err(SelectorError::ExpectedIdent(c));
                }
                if c == '.' {
                    compound.classes.push(ident);
                } else {
                    compound.id = Some(ident);
                }
            }
            '[' => {
                chars.next();
                compound.attributes.push(parse_attribute(chars)?);
            }
            c if c.is_whitespace() => break,
            other => return Err(SelectorError::Unexpected(other)),
        }
    }

    Ok(compound)
}

fn parse_attribute(chars: &mut Peekable<Chars<'_>>) -> Result<AttributeMatch, SelectorError> {
    let name = read_ident(chars);
    if name.is_empty() {
        return Err(SelectorError::ExpectedIdent('['));
    }

    match chars.next() {
        Some(']') => Ok(AttributeMatch { name, value: None }),
        Some('=') => {
            let value = match chars.peek() {
                Some(&quote) if quote == '"' || quote == '\'' => {
                    chars.next();
                    let mut value = String::new();
                    loop {
                        match chars.next() {
                            Some(c) if c == quote => break,
                            Some(c) => value.push(c),
                            None => return Err(SelectorError::UnterminatedAttribute),
                        }
                    }
                    value
                }
                _ => read_ident(chars),
            };
            match chars.next() {
                Some(']') => Ok(AttributeMatch {
                    name,
                    value: Some(value),
                }),
                Some(other) => Err(SelectorError::Unexpected(other)),
                None => Err(SelectorError::UnterminatedAttribute),
            }
        }
        Some(other) => Err(SelectorError::Unexpected(other)),
        None => Err(SelectorError::UnterminatedAttribute),
    }
}

/// All attached elements matching `selector`, in document order.
pub fn select_all<P: Page + ?Sized>(page: &P, selector: &Selector) -> Vec<NodeId> {
    page.elements()
        .into_iter()
        .filter(|&id| selector.matches(page, id))
        .collect()
}

/// First attached element matching `selector`.
pub fn select_first<P: Page + ?Sized>(page: &P, selector: &Selector) -> Option<NodeId> {
    page.elements()
        .into_iter()
        .find(|&id| selector.matches(page, id))
}

/// Descendants of `root` (excluding `root`) matching `selector`.
pub fn select_all_within<P: Page + ?Sized>(page: &P, root: NodeId, selector: &Selector) -> Vec<NodeId> {
    page.elements()
        .into_iter()
        .filter(|&id| id != root && is_descendant(page, id, root) && selector.matches(page, id))
        .collect()
}

/// First descendant of `root` matching `selector`, like `querySelector`.
pub fn select_first_within<P: Page + ?Sized>(
    page: &P,
    root: NodeId,
    selector: &Selector,
) -> Option<NodeId> {
    page.elements()
        .into_iter()
        .find(|&id| id != root && is_descendant(page, id, root) && selector.matches(page, id))
}

fn is_descendant<P: Page + ?Sized>(page: &P, node: NodeId, ancestor: NodeId) -> bool {
    let mut current = page.parent(node);
    while let Some(id) = current {
        if id == ancestor {
            return true;
        }
        current = page.parent(id);
    }
    false
}

/// The element itself or its nearest ancestor matching `selector`.
pub fn closest<P: Page + ?Sized>(page: &P, node: NodeId, selector: &Selector) -> Option<NodeId> {
    let mut current = Some(node);
    while let Some(id) = current {
        if selector.matches(page, id) {
            return Some(id);
        }
        current = page.parent(id);
    }
    None
}
