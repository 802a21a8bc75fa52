//! The adapter every tree engine implements.
//!
//! Path evaluation, serialization and the document service are written
//! once against [`HtmlTree`]; the engines differ in how they store nodes
//! and in what they advertise through [`Capabilities`].

use std::fmt::Debug;
use std::hash::Hash;

use crate::error::DocError;
use crate::untyped_dom::{Element, Namespace};

/// Which path-expression dialect an engine evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Element steps, `//`, `.`, `..` and simple attribute predicates.
    Basic,
    /// The XPath 1.0 location-path subset described in [`crate::path`].
    Full,
}

/// How `update_element_by_path` rewrites the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStrategy {
    /// Remove the old matches, then append the new content under the
    /// parent of the old path.
    DeleteThenInsertUnderParent,
    /// Replace the first match where it stands and drop the other matches.
    ReplaceInPlace,
}

/// What an engine can do beyond the common contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub dialect: Dialect,
    /// Whether `get_element_by_path` (single result) is offered.
    pub single_path_lookup: bool,
    pub update: UpdateStrategy,
    /// Whether template placeholders are scanned for.
    pub template_scan: bool,
}

/// Borrowed view of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeView<'a> {
    /// The invisible node above the root element.
    Document,
    Element { tag: &'a str, ns: Namespace },
    Text(&'a str),
    Comment(&'a str),
}

impl<'a> NodeView<'a> {
    pub fn is_element(&self) -> bool {
        matches!(self, NodeView::Element { .. })
    }

    pub fn tag(&self) -> Option<&'a str> {
        match *self {
            NodeView::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }
}

/// A parsed, mutable HTML tree.
pub trait HtmlTree {
    /// Handle to a node. Handles are only meaningful for the tree that
    /// produced them, and only until the next mutation.
    type Node: Clone + Eq + Hash + Debug;

    const CAPS: Capabilities;

    /// Parse a complete document. html5ever recovers from every error, so
    /// this cannot fail.
    fn parse_html(html: &str) -> Self
    where
        Self: Sized;

    /// The document node (parent of the root element).
    fn document(&self) -> Self::Node;

    fn view(&self, node: &Self::Node) -> NodeView<'_>;

    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Attributes of an element in source order; empty for other nodes.
    fn attrs(&self, node: &Self::Node) -> Vec<(&str, &str)>;

    fn doctype(&self) -> Option<&str>;

    /// Append `element` as the last child of `parent`, returning the handle
    /// of the adopted node.
    fn append_child(&mut self, parent: &Self::Node, element: Element)
    -> Result<Self::Node, DocError>;

    /// Put `element` where `old` stands and detach `old`.
    fn replace_node(&mut self, old: &Self::Node, element: Element)
    -> Result<Self::Node, DocError>;

    /// Detach `node` from its parent.
    fn remove_node(&mut self, node: &Self::Node) -> Result<(), DocError>;

    /// The root element, if the document has one.
    fn root(&self) -> Option<Self::Node> {
        let document = self.document();
        self.children(&document)
            .into_iter()
            .find(|n| self.view(n).is_element())
    }

    fn attr(&self, node: &Self::Node, name: &str) -> Option<&str> {
        self.attrs(node)
            .into_iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }

    /// All nodes below `node` in pre-order, excluding `node` itself.
    fn descendants(&self, node: &Self::Node) -> Vec<Self::Node> {
        let mut out = Vec::new();
        let mut stack: Vec<Self::Node> = self.children(node).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            stack.extend(self.children(&current).into_iter().rev());
            out.push(current);
        }
        out
    }

    /// Ancestors of `node`, nearest first, ending with the document node.
    fn ancestors(&self, node: &Self::Node) -> Vec<Self::Node> {
        let mut out = Vec::new();
        let mut current = self.parent(node);
        while let Some(parent) = current {
            current = self.parent(&parent);
            out.push(parent);
        }
        out
    }

    fn is_ancestor(&self, ancestor: &Self::Node, node: &Self::Node) -> bool {
        let mut current = self.parent(node);
        while let Some(parent) = current {
            if parent == *ancestor {
                return true;
            }
            current = self.parent(&parent);
        }
        false
    }

    /// Every element in document order, the root element included.
    fn elements(&self) -> Vec<Self::Node> {
        self.descendants(&self.document())
            .into_iter()
            .filter(|n| self.view(n).is_element())
            .collect()
    }

    /// Concatenated text of every text node at or below `node`.
    fn text_content(&self, node: &Self::Node) -> String {
        match self.view(node) {
            NodeView::Text(t) => t.to_string(),
            NodeView::Comment(_) => String::new(),
            NodeView::Document | NodeView::Element { .. } => {
                let mut out = String::new();
                for n in self.descendants(node) {
                    if let NodeView::Text(t) = self.view(&n) {
                        out.push_str(t);
                    }
                }
                out
            }
        }
    }

    /// Concatenated text of the direct text children of `node`.
    fn own_text(&self, node: &Self::Node) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            if let NodeView::Text(t) = self.view(&child) {
                out.push_str(t);
            }
        }
        out
    }

    /// First element in document order carrying attribute `name` with
    /// exactly `value`.
    fn element_by_attr(&self, name: &str, value: &str) -> Option<Self::Node> {
        self.elements()
            .into_iter()
            .find(|n| self.attr(n, name) == Some(value))
    }

    fn element_by_id(&self, id: &str) -> Option<Self::Node> {
        self.element_by_attr("id", id)
    }
}
