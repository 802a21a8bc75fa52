//! Owned HTML tree: every element owns its children.
//!
//! This is the tree engine's storage, and also the shape fragments take
//! between parsing and adoption into either engine. Node handles into a
//! [`Document`] are child-index paths ([`NodePath`]): the empty path is the
//! document itself, `[0]` is the root `<html>` element, and each further
//! index selects a child of the previous node.

use smallvec::SmallVec;

use crate::error::DocError;
use crate::tree::{Capabilities, Dialect, HtmlTree, NodeView, UpdateStrategy};

/// XML/HTML namespace for elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Namespace {
    /// HTML namespace (default)
    #[default]
    Html,
    /// SVG namespace
    Svg,
    /// MathML namespace
    MathMl,
}

impl Namespace {
    /// Map a namespace URI onto the namespaces we track. Unknown URIs fall
    /// back to HTML.
    pub fn from_url(url: &str) -> Self {
        match url {
            "http://www.w3.org/2000/svg" => Namespace::Svg,
            "http://www.w3.org/1998/Math/MathML" => Namespace::MathMl,
            _ => Namespace::Html,
        }
    }

    /// Returns the namespace URI.
    pub fn uri(&self) -> &'static str {
        match self {
            Namespace::Html => "http://www.w3.org/1999/xhtml",
            Namespace::Svg => "http://www.w3.org/2000/svg",
            Namespace::MathMl => "http://www.w3.org/1998/Math/MathML",
        }
    }
}

/// An ordered collection of attributes with first-wins semantics.
///
/// When parsing HTML, if an attribute appears multiple times, only the first
/// occurrence is kept (matching browser behavior).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Create from an iterator of (name, value) pairs.
    /// Enforces first-wins: if a name appears multiple times, only the first is kept.
    pub fn collect_from<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut attrs = Self::new();
        for (name, value) in iter {
            attrs.set_if_missing(name, value);
        }
        attrs
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute value. If the attribute already exists, updates its value
    /// in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some((_, v)) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            *v = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Set an attribute only if it doesn't already exist (first-wins semantics).
    pub fn set_if_missing(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if !self.contains(&name) {
            self.entries.push((name, value.into()));
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Iterate over all attributes in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// DOM content - either an element, text, or comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Text content of this node and all descendants.
    pub fn text_content(&self) -> String {
        match self {
            Node::Text(t) => t.clone(),
            Node::Comment(_) => String::new(),
            Node::Element(e) => e.text_content(),
        }
    }
}

/// An HTML/SVG/MathML element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    /// The tag name (lowercase for HTML, case-preserved for SVG/MathML)
    pub tag: String,
    pub ns: Namespace,
    pub attrs: Attributes,
    pub children: Vec<Node>,
}

impl Element {
    /// Create a new element with the given tag name in the HTML namespace.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_namespace(tag: impl Into<String>, ns: Namespace) -> Self {
        Self {
            tag: tag.into(),
            ns,
            ..Default::default()
        }
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name)
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attrs.set(name, value);
    }

    pub fn push_child(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(Node::Text(text.into()));
    }

    pub fn push_element(&mut self, element: Element) {
        self.children.push(Node::Element(element));
    }

    /// Text content of this element and all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
                Node::Comment(_) => {}
            }
        }
    }

    /// Follow child indices down from this element.
    fn node_at(&self, path: &[u32]) -> Option<&Node> {
        let (&last, parents) = path.split_last()?;
        let mut current = self;
        for &idx in parents {
            current = current.children.get(idx as usize)?.as_element()?;
        }
        current.children.get(last as usize)
    }

    /// Mutable access to the children of the element at `path` (relative to
    /// this element).
    fn children_at_mut(&mut self, path: &[u32]) -> Option<&mut Vec<Node>> {
        let mut current = self;
        for &idx in path {
            current = current.children.get_mut(idx as usize)?.as_element_mut()?;
        }
        Some(&mut current.children)
    }
}

/// Position of a node inside a [`Document`], as child indices from the
/// document node.
///
/// Uses SmallVec<[u32; 16]> to avoid heap allocations for typical DOM depths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodePath(pub SmallVec<[u32; 16]>);

impl NodePath {
    /// The document node.
    pub fn document() -> Self {
        NodePath(SmallVec::new())
    }

    pub fn is_document(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, index: u32) -> Self {
        let mut path = self.clone();
        path.0.push(index);
        path
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, parent) = self.0.split_last()?;
        Some(NodePath(parent.iter().copied().collect()))
    }

    /// Index of this node among its parent's children.
    pub fn index(&self) -> Option<u32> {
        self.0.last().copied()
    }
}

impl std::fmt::Display for NodePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, idx) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", idx)?;
        }
        Ok(())
    }
}

/// A complete HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// The DOCTYPE declaration (e.g., "html" for `<!DOCTYPE html>`)
    pub doctype: Option<String>,
    /// The root html element
    pub root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self {
            doctype: None,
            root,
        }
    }

    /// Create a new HTML5 document with empty head and body.
    pub fn html5() -> Self {
        let mut html = Element::new("html");
        html.push_element(Element::new("head"));
        html.push_element(Element::new("body"));
        Self {
            doctype: Some("html".to_string()),
            root: html,
        }
    }

    pub fn body(&self) -> Option<&Element> {
        self.root
            .children
            .iter()
            .filter_map(Node::as_element)
            .find(|e| e.tag == "body")
    }

    /// Resolve a path to a node. The document path itself has no [`Node`]
    /// and resolves to `None`, as do dangling paths.
    pub fn node(&self, path: &NodePath) -> Option<NodeRef<'_>> {
        match path.0.split_first() {
            None => Some(NodeRef::Document),
            Some((&0, [])) => Some(NodeRef::Element(&self.root)),
            Some((&0, rest)) => match self.root.node_at(rest)? {
                Node::Element(e) => Some(NodeRef::Element(e)),
                Node::Text(t) => Some(NodeRef::Text(t)),
                Node::Comment(c) => Some(NodeRef::Comment(c)),
            },
            Some(_) => None,
        }
    }

    /// Mutable access to the child list of the element at `path`.
    pub(crate) fn children_mut(&mut self, path: &NodePath) -> Option<&mut Vec<Node>> {
        match path.0.split_first() {
            Some((&0, rest)) => self.root.children_at_mut(rest),
            _ => None,
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::html5()
    }
}

/// Borrowed view of whatever a [`NodePath`] points at.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Document,
    Element(&'a Element),
    Text(&'a str),
    Comment(&'a str),
}

impl HtmlTree for Document {
    type Node = NodePath;

    const CAPS: Capabilities = Capabilities {
        dialect: Dialect::Basic,
        single_path_lookup: false,
        update: UpdateStrategy::ReplaceInPlace,
        template_scan: true,
    };

    fn parse_html(html: &str) -> Self {
        crate::parser::parse_document(html)
    }

    fn document(&self) -> NodePath {
        NodePath::document()
    }

    /// Dangling paths read as empty text nodes.
    fn view(&self, node: &NodePath) -> NodeView<'_> {
        match self.node(node) {
            Some(NodeRef::Document) => NodeView::Document,
            Some(NodeRef::Element(e)) => NodeView::Element {
                tag: &e.tag,
                ns: e.ns,
            },
            Some(NodeRef::Text(t)) => NodeView::Text(t),
            Some(NodeRef::Comment(c)) => NodeView::Comment(c),
            None => NodeView::Text(""),
        }
    }

    fn children(&self, node: &NodePath) -> Vec<NodePath> {
        match self.node(node) {
            Some(NodeRef::Document) => vec![node.child(0)],
            Some(NodeRef::Element(e)) => (0..e.children.len() as u32)
                .map(|i| node.child(i))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn parent(&self, node: &NodePath) -> Option<NodePath> {
        node.parent()
    }

    fn attrs(&self, node: &NodePath) -> Vec<(&str, &str)> {
        match self.node(node) {
            Some(NodeRef::Element(e)) => e.attrs.iter().collect(),
            _ => Vec::new(),
        }
    }

    fn doctype(&self) -> Option<&str> {
        self.doctype.as_deref()
    }

    fn append_child(&mut self, parent: &NodePath, element: Element) -> Result<NodePath, DocError> {
        if parent.is_document() {
            return Err(DocError::invalid_input(
                "the document already has a root element",
            ));
        }
        let children = self.children_mut(parent).ok_or_else(|| {
            DocError::invalid_input("cannot append children to a text or comment node")
        })?;
        children.push(Node::Element(element));
        Ok(parent.child(children.len() as u32 - 1))
    }

    fn replace_node(&mut self, old: &NodePath, element: Element) -> Result<NodePath, DocError> {
        let (Some(parent), Some(index)) = (old.parent(), old.index()) else {
            return Err(DocError::invalid_input("cannot replace the document node"));
        };
        if parent.is_document() {
            self.root = element;
            return Ok(old.clone());
        }
        let slot = self
            .children_mut(&parent)
            .and_then(|children| children.get_mut(index as usize))
            .ok_or_else(|| DocError::internal(format!("no node at {old}")))?;
        *slot = Node::Element(element);
        Ok(old.clone())
    }

    fn remove_node(&mut self, node: &NodePath) -> Result<(), DocError> {
        let (Some(parent), Some(index)) = (node.parent(), node.index()) else {
            return Err(DocError::invalid_input("node has no parent"));
        };
        if parent.is_document() {
            return Err(DocError::invalid_input("cannot remove the root element"));
        }
        let children = self
            .children_mut(&parent)
            .filter(|children| (index as usize) < children.len())
            .ok_or_else(|| DocError::internal(format!("no node at {node}")))?;
        children.remove(index as usize);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_attributes_first_wins() {
        let attrs = Attributes::collect_from([
            ("class".to_string(), "first".to_string()),
            ("class".to_string(), "second".to_string()),
            ("id".to_string(), "myid".to_string()),
        ]);

        assert_eq!(attrs.get("class"), Some("first"));
        assert_eq!(attrs.get("id"), Some("myid"));
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_attributes_set_updates_in_place() {
        let mut attrs = Attributes::new();
        attrs.set("class", "first");
        attrs.set("id", "x");
        attrs.set("class", "second");
        assert_eq!(attrs.get("class"), Some("second"));
        let names: Vec<_> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["class", "id"]);
    }

    #[test]
    fn test_attributes_set_if_missing() {
        let mut attrs = Attributes::collect_from([("id".to_string(), "myid".to_string())]);
        attrs.set_if_missing("id", "other");
        attrs.set_if_missing("class", "myclass");
        assert_eq!(attrs.get("id"), Some("myid"));
        assert!(attrs.contains("class"));
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_element_text_content() {
        let mut div = Element::new("div");
        div.push_text("Hello ");
        let mut span = Element::new("span");
        span.push_text("world");
        div.push_element(span);
        div.push_child(Node::Comment("ignored".into()));
        div.push_text("!");

        assert_eq!(div.text_content(), "Hello world!");
    }

    #[test]
    fn test_node_path_navigation() {
        let doc = Document::html5();
        assert!(matches!(
            doc.node(&NodePath::document()),
            Some(NodeRef::Document)
        ));
        assert!(matches!(
            doc.node(&NodePath(smallvec![0])),
            Some(NodeRef::Element(e)) if e.tag == "html"
        ));
        assert!(matches!(
            doc.node(&NodePath(smallvec![0, 1])),
            Some(NodeRef::Element(e)) if e.tag == "body"
        ));
        assert!(doc.node(&NodePath(smallvec![0, 2])).is_none());
        assert!(doc.node(&NodePath(smallvec![1])).is_none());
    }

    #[test]
    fn test_node_path_parent_and_display() {
        let path = NodePath(smallvec![0, 1, 3]);
        assert_eq!(path.to_string(), "0.1.3");
        assert_eq!(path.index(), Some(3));
        assert_eq!(path.parent(), Some(NodePath(smallvec![0, 1])));
        assert_eq!(NodePath::document().parent(), None);
        assert_eq!(NodePath::document().child(0).child(1).to_string(), "0.1");
    }

    #[test]
    fn test_tree_children_and_parent() {
        let doc = crate::parser::parse_document("<p>a</p><p>b</p>");
        let body = doc.element_by_attr("id", "none");
        assert!(body.is_none());

        let root = doc.root().expect("root");
        assert_eq!(root, NodePath(smallvec![0]));
        assert_eq!(doc.parent(&root), Some(NodePath::document()));
        let body = NodePath(smallvec![0, 1]);
        assert_eq!(doc.view(&body).tag(), Some("body"));
        assert_eq!(doc.children(&body).len(), 2);
        assert_eq!(doc.text_content(&body), "ab");
    }

    #[test]
    fn test_tree_mutations() {
        let mut doc =
            crate::parser::parse_document(r#"<ul><li id="1">a</li><li id="2">b</li></ul>"#);
        let ul = doc.elements().into_iter().find(|n| doc.view(n).tag() == Some("ul")).expect("ul");

        let added = doc
            .append_child(&ul, Element::new("li"))
            .expect("append");
        assert_eq!(added, ul.child(2));

        let first = doc.element_by_id("1").expect("first li");
        let mut replacement = Element::new("li");
        replacement.push_text("z");
        doc.replace_node(&first, replacement).expect("replace");
        assert_eq!(doc.text_content(&ul), "zb");

        let second = doc.element_by_id("2").expect("second li");
        doc.remove_node(&second).expect("remove");
        assert_eq!(doc.children(&ul).len(), 2);

        let root = doc.root().expect("root");
        assert!(doc.remove_node(&root).is_err());
        assert!(doc.append_child(&NodePath::document(), Element::new("x")).is_err());
    }

    #[test]
    fn test_namespace_from_url() {
        assert_eq!(
            Namespace::from_url("http://www.w3.org/2000/svg"),
            Namespace::Svg
        );
        assert_eq!(Namespace::from_url("urn:unknown"), Namespace::Html);
        assert_eq!(Namespace::MathMl.uri(), "http://www.w3.org/1998/Math/MathML");
    }
}
