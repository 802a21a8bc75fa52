//! The document service: lookups and mutations over one parsed document.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::arena_dom;
use crate::error::DocError;
use crate::parser::parse_fragment;
use crate::path::{self, normalize_space, parent_path};
use crate::serialize::{SerializeOptions, serialize_document, serialize_node};
use crate::template::references_variable;
use crate::tracing_macros::{debug, warn};
use crate::tree::{Capabilities, HtmlTree, NodeView, UpdateStrategy};
use crate::untyped_dom::{self, Element};

/// What `check_if_node_exists` compares against.
#[derive(Debug, Clone, Copy)]
pub enum NodeProbe<'a> {
    /// HTML source; its text content is compared.
    Fragment(&'a str),
    Element(&'a Element),
}

impl NodeProbe<'_> {
    /// Whitespace-normalized text the matched node must carry. A fragment
    /// without any element is compared as raw text.
    pub fn expected_text(&self) -> String {
        match self {
            NodeProbe::Fragment(html) => match parse_fragment(html) {
                Ok(element) => normalize_space(&element.text_content()),
                Err(_) => normalize_space(html),
            },
            NodeProbe::Element(element) => normalize_space(&element.text_content()),
        }
    }
}

impl<'a> From<&'a str> for NodeProbe<'a> {
    fn from(html: &'a str) -> Self {
        NodeProbe::Fragment(html)
    }
}

impl<'a> From<&'a Element> for NodeProbe<'a> {
    fn from(element: &'a Element) -> Self {
        NodeProbe::Element(element)
    }
}

/// Lookups and mutations on one loaded document. Returned elements are
/// serialized HTML, never live handles.
pub trait DocumentParser {
    fn capabilities(&self) -> Capabilities;

    /// First element in document order whose `id` is `id`.
    fn get_element_by_id(&self, id: &str) -> Option<String>;

    fn check_if_element_exists(&self, id: &str) -> (bool, Option<String>) {
        let element = self.get_element_by_id(id);
        (element.is_some(), element)
    }

    fn get_element_by_name(&self, name: &str) -> Option<String>;

    fn get_elements_by_name(&self, name: &str) -> Vec<String>;

    /// First node selected by `path`. Engines without single-path lookup
    /// return `NotSupported`.
    fn get_element_by_path(&self, path: &str) -> Result<Option<String>, DocError>;

    fn get_elements_by_path(&self, path: &str) -> Result<Vec<String>, DocError>;

    /// Elements, in pre-order, whose text content contains `value`.
    fn get_elements_by_value(&self, value: &str) -> Vec<String>;

    /// Elements whose own text has a template placeholder referencing
    /// `name`. Empty on engines that do not scan templates.
    fn get_elements_by_jinja_variable(&self, name: &str) -> Vec<String>;

    fn replace_element_by_id(&mut self, id: &str, new_element_html: &str)
    -> Result<(), DocError>;

    fn remove_element_by_id(&mut self, id: &str) -> Result<(), DocError>;

    /// Detaches every selected node and returns how many were removed.
    fn delete_elements_by_path(&mut self, path: &str) -> Result<usize, DocError>;

    /// Appends the fragment as the last child of the first selected node.
    fn insert_element_by_path(&mut self, path: &str, element_html: &str)
    -> Result<(), DocError>;

    fn update_element_by_path(
        &mut self,
        old_path: &str,
        new_path: &str,
        new_content: &str,
        important_data: Option<&str>,
    ) -> Result<(), DocError>;

    fn check_if_node_exists(&self, xpath: &str, node: NodeProbe<'_>) -> Result<bool, DocError>;

    /// The whole document, doctype included.
    fn to_html(&self) -> String;
}

/// [`DocumentParser`] over any tree engine.
pub struct DocumentService<T: HtmlTree> {
    tree: T,
    opts: SerializeOptions,
}

impl<T: HtmlTree> DocumentService<T> {
    pub fn new(tree: T) -> Self {
        Self {
            tree,
            opts: SerializeOptions::default(),
        }
    }

    pub fn parse(html: &str) -> Self {
        Self::new(T::parse_html(html))
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }

    pub fn into_tree(self) -> T {
        self.tree
    }

    fn fragment(&self, node: &T::Node) -> String {
        serialize_node(&self.tree, node, &self.opts)
    }

    fn fragments(&self, nodes: &[T::Node]) -> Vec<String> {
        nodes.iter().map(|n| self.fragment(n)).collect()
    }

    fn select(&self, path: &str) -> Result<Vec<T::Node>, DocError> {
        path::select(&self.tree, path, T::CAPS.dialect)
    }

    fn is_root(&self, node: &T::Node) -> bool {
        self.tree.root().as_ref() == Some(node)
    }

    /// Removes `nodes` (in document order) back to front, so handles to
    /// earlier nodes stay valid. The document node and the root element are
    /// skipped.
    fn detach_all(&mut self, nodes: &[T::Node]) -> Result<usize, DocError> {
        let mut removed = 0;
        for node in nodes.iter().rev() {
            if self.tree.parent(node).is_none() || self.is_root(node) {
                continue;
            }
            self.tree.remove_node(node)?;
            removed += 1;
        }
        Ok(removed)
    }

    fn update_by_reinsert(
        &mut self,
        old_path: &str,
        new_content: &str,
    ) -> Result<(), DocError> {
        let parent = parent_path(old_path).ok_or_else(|| {
            DocError::invalid_input(format!("`{old_path}` has no parent step"))
        })?;
        let fragment = parse_fragment(new_content)?;

        let old = self.select(old_path)?;
        self.detach_all(&old)?;

        let target = self
            .select(parent)?
            .into_iter()
            .next()
            .ok_or_else(|| DocError::not_found("Parent path not found"))?;
        self.tree.append_child(&target, fragment)?;
        Ok(())
    }

    fn update_in_place(
        &mut self,
        old_path: &str,
        new_content: &str,
        important_data: Option<&str>,
    ) -> Result<(), DocError> {
        let matches = self.select(old_path)?;
        let Some((first, rest)) = matches.split_first() else {
            return Err(DocError::not_found("Element not found"));
        };
        let mut fragment = parse_fragment(new_content)?;

        for name in important_data
            .into_iter()
            .flat_map(|list| list.split(','))
            .map(str::trim)
            .filter(|name| !name.is_empty())
        {
            if let Some(value) = self.tree.attr(first, name) {
                fragment.attrs.set_if_missing(name, value);
            }
        }

        let others: Vec<T::Node> = rest
            .iter()
            .filter(|node| !self.tree.is_ancestor(first, node))
            .cloned()
            .collect();
        self.detach_all(&others)?;
        self.tree.replace_node(first, fragment)?;
        Ok(())
    }
}

impl<T: HtmlTree> DocumentParser for DocumentService<T> {
    fn capabilities(&self) -> Capabilities {
        T::CAPS
    }

    fn get_element_by_id(&self, id: &str) -> Option<String> {
        self.tree.element_by_id(id).map(|n| self.fragment(&n))
    }

    fn get_element_by_name(&self, name: &str) -> Option<String> {
        self.tree
            .element_by_attr("name", name)
            .map(|n| self.fragment(&n))
    }

    fn get_elements_by_name(&self, name: &str) -> Vec<String> {
        let nodes: Vec<T::Node> = self
            .tree
            .elements()
            .into_iter()
            .filter(|n| self.tree.attr(n, "name") == Some(name))
            .collect();
        self.fragments(&nodes)
    }

    fn get_element_by_path(&self, path: &str) -> Result<Option<String>, DocError> {
        if !T::CAPS.single_path_lookup {
            return Err(DocError::not_supported(
                "get_element_by_path is not offered by this engine",
            ));
        }
        Ok(self.select(path)?.first().map(|n| self.fragment(n)))
    }

    fn get_elements_by_path(&self, path: &str) -> Result<Vec<String>, DocError> {
        Ok(self.fragments(&self.select(path)?))
    }

    fn get_elements_by_value(&self, value: &str) -> Vec<String> {
        let nodes: Vec<T::Node> = self
            .tree
            .elements()
            .into_iter()
            .filter(|n| {
                let text = self.tree.text_content(n);
                !text.is_empty() && text.contains(value)
            })
            .collect();
        self.fragments(&nodes)
    }

    fn get_elements_by_jinja_variable(&self, name: &str) -> Vec<String> {
        if !T::CAPS.template_scan {
            return Vec::new();
        }
        let nodes: Vec<T::Node> = self
            .tree
            .elements()
            .into_iter()
            .filter(|n| references_variable(&self.tree.own_text(n), name))
            .collect();
        self.fragments(&nodes)
    }

    fn replace_element_by_id(
        &mut self,
        id: &str,
        new_element_html: &str,
    ) -> Result<(), DocError> {
        let node = self
            .tree
            .element_by_id(id)
            .ok_or_else(|| DocError::not_found("Element not found"))?;
        if self.is_root(&node) {
            return Err(DocError::invalid_input("cannot replace the root element"));
        }
        let fragment = parse_fragment(new_element_html)?;
        self.tree.replace_node(&node, fragment)?;
        debug!(id, "replaced element");
        Ok(())
    }

    fn remove_element_by_id(&mut self, id: &str) -> Result<(), DocError> {
        let node = self
            .tree
            .element_by_id(id)
            .ok_or_else(|| DocError::not_found("Element not found"))?;
        self.tree.remove_node(&node)?;
        debug!(id, "removed element");
        Ok(())
    }

    fn delete_elements_by_path(&mut self, path: &str) -> Result<usize, DocError> {
        let nodes = self.select(path)?;
        let removed = self.detach_all(&nodes)?;
        debug!(path, removed, "deleted elements");
        Ok(removed)
    }

    fn insert_element_by_path(
        &mut self,
        path: &str,
        element_html: &str,
    ) -> Result<(), DocError> {
        let target = self
            .select(path)?
            .into_iter()
            .next()
            .ok_or_else(|| DocError::not_found("Path not found"))?;
        if !matches!(self.tree.view(&target), NodeView::Element { .. }) {
            return Err(DocError::invalid_input(
                "insertion target is not an element",
            ));
        }
        let fragment = parse_fragment(element_html)?;
        self.tree.append_child(&target, fragment)?;
        debug!(path, "inserted element");
        Ok(())
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn update_element_by_path(
        &mut self,
        old_path: &str,
        new_path: &str,
        new_content: &str,
        important_data: Option<&str>,
    ) -> Result<(), DocError> {
        debug!(old_path, new_path, "updating element");
        match T::CAPS.update {
            UpdateStrategy::DeleteThenInsertUnderParent => {
                self.update_by_reinsert(old_path, new_content)
            }
            UpdateStrategy::ReplaceInPlace => {
                self.update_in_place(old_path, new_content, important_data)
            }
        }
    }

    fn check_if_node_exists(&self, xpath: &str, node: NodeProbe<'_>) -> Result<bool, DocError> {
        let expected = node.expected_text();
        let exists = self.select(xpath)?.iter().any(|candidate| {
            let first_text = self
                .tree
                .children(candidate)
                .into_iter()
                .find_map(|child| match self.tree.view(&child) {
                    NodeView::Text(t) => Some(normalize_space(t)),
                    _ => None,
                })
                .unwrap_or_default();
            first_text == expected
        });
        Ok(exists)
    }

    fn to_html(&self) -> String {
        serialize_document(&self.tree, &self.opts)
    }
}

/// Which tree engine backs a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    /// `indextree` arena with the full path dialect.
    Arena,
    /// Owned element tree with the basic path dialect.
    Tree,
}

/// Loaded when a source document cannot be read.
pub const FALLBACK_DOCUMENT: &str = "<html></html>";

impl Engine {
    pub fn name(self) -> &'static str {
        match self {
            Engine::Arena => "arena",
            Engine::Tree => "tree",
        }
    }

    /// Port each engine's server listens on unless configured otherwise.
    pub fn default_port(self) -> u16 {
        match self {
            Engine::Tree => 5000,
            Engine::Arena => 8001,
        }
    }

    pub fn capabilities(self) -> Capabilities {
        match self {
            Engine::Arena => <arena_dom::Document as HtmlTree>::CAPS,
            Engine::Tree => <untyped_dom::Document as HtmlTree>::CAPS,
        }
    }

    pub fn parse(self, html: &str) -> Box<dyn DocumentParser> {
        match self {
            Engine::Arena => Box::new(DocumentService::<arena_dom::Document>::parse(html)),
            Engine::Tree => Box::new(DocumentService::<untyped_dom::Document>::parse(html)),
        }
    }

    /// Loads and parses the document at `path`. Unreadable files yield
    /// [`FALLBACK_DOCUMENT`].
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    pub fn open(self, path: impl AsRef<Path>) -> Box<dyn DocumentParser> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(html) => {
                debug!(path = %path.display(), engine = self.name(), "loaded document");
                self.parse(&html)
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot read document, using an empty one");
                self.parse(FALLBACK_DOCUMENT)
            }
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Engine {
    type Err = DocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arena" => Ok(Engine::Arena),
            "tree" => Ok(Engine::Tree),
            other => Err(DocError::invalid_input(format!(
                "unknown engine `{other}`, expected `arena` or `tree`"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Dialect;

    const SAMPLE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Sample</title></head>
<body>
<div class="container" name="nesto">
<ul>
<li id="1">Field (F1)</li>
<li id="2">Second</li>
</ul>
<p id="greeting">Hello {{ user.name }}</p>
<input name="email" id="email">
</div>
</body>
</html>"#;

    fn both() -> [Box<dyn DocumentParser>; 2] {
        [Engine::Arena.parse(SAMPLE), Engine::Tree.parse(SAMPLE)]
    }

    #[test]
    fn test_lookup_by_id_and_name() {
        for doc in both() {
            assert_eq!(
                doc.get_element_by_id("1").as_deref(),
                Some(r#"<li id="1">Field (F1)</li>"#)
            );
            assert_eq!(doc.get_element_by_id("999"), None);
            assert_eq!(doc.check_if_element_exists("999"), (false, None));
            let (exists, element) = doc.check_if_element_exists("2");
            assert!(exists);
            assert!(element.is_some_and(|e| e.contains("Second")));

            let by_name = doc.get_element_by_name("nesto").expect("div");
            assert!(by_name.starts_with(r#"<div class="container" name="nesto">"#));
            assert_eq!(doc.get_elements_by_name("email").len(), 1);
            assert!(doc.get_elements_by_name("missing").is_empty());
        }
    }

    #[test]
    fn test_get_by_value_is_pre_order() {
        for doc in both() {
            let found = doc.get_elements_by_value("Field (F1)");
            assert!(found.len() >= 3);
            assert!(found[0].starts_with("<html>"));
            assert_eq!(found.last().map(String::as_str), Some(r#"<li id="1">Field (F1)</li>"#));
            assert!(found.iter().all(|f| f.contains("Field (F1)")));
        }
    }

    #[test]
    fn test_single_path_lookup_per_engine() {
        let arena = Engine::Arena.parse(SAMPLE);
        let first = arena.get_element_by_path("//li").expect("supported");
        assert_eq!(first.as_deref(), Some(r#"<li id="1">Field (F1)</li>"#));
        assert_eq!(arena.get_element_by_path("//table").expect("ok"), None);

        let tree = Engine::Tree.parse(SAMPLE);
        let err = tree.get_element_by_path("//li").expect_err("unsupported");
        assert!(err.is_not_supported());
    }

    #[test]
    fn test_jinja_scan_per_engine() {
        let tree = Engine::Tree.parse(SAMPLE);
        let found = tree.get_elements_by_jinja_variable("user");
        assert_eq!(found, vec![r#"<p id="greeting">Hello {{ user.name }}</p>"#]);
        assert!(tree.get_elements_by_jinja_variable("nobody").is_empty());

        let arena = Engine::Arena.parse(SAMPLE);
        assert!(arena.get_elements_by_jinja_variable("user").is_empty());
    }

    #[test]
    fn test_insert_then_select() {
        for mut doc in both() {
            doc.insert_element_by_path("/html/body/div/ul", r#"<li id="3">New</li>"#)
                .expect("insert");
            let found = doc.get_elements_by_path("//ul/li[@id='3']").expect("select");
            assert_eq!(found, vec![r#"<li id="3">New</li>"#]);
            let children = doc.get_elements_by_path("/html/body/div/ul/*").expect("select");
            assert_eq!(children.len(), 3);

            let err = doc
                .insert_element_by_path("//table", "<tr></tr>")
                .expect_err("no target");
            assert!(err.is_not_found());
            assert_eq!(err.message(), "Path not found");

            let err = doc
                .insert_element_by_path("//ul", "just text")
                .expect_err("no element");
            assert!(matches!(err, DocError::InvalidInput { .. }));
        }
    }

    #[test]
    fn test_delete_is_idempotent() {
        for mut doc in both() {
            assert_eq!(doc.delete_elements_by_path("//li").expect("delete"), 2);
            assert_eq!(doc.delete_elements_by_path("//li").expect("delete"), 0);
            assert!(doc.get_elements_by_path("//li").expect("select").is_empty());
        }
    }

    #[test]
    fn test_delete_nested_matches() {
        for mut doc in both() {
            let removed = doc.delete_elements_by_path("//div//*").expect("delete");
            assert_eq!(removed, 5);
            assert!(doc.to_html().contains(r#"<div class="container" name="nesto">"#));
            assert!(!doc.to_html().contains("<ul>"));
        }
    }

    #[test]
    fn test_delete_skips_root() {
        for mut doc in both() {
            assert_eq!(doc.delete_elements_by_path("/html").expect("delete"), 0);
            assert!(doc.to_html().contains("Field (F1)"));
        }
    }

    #[test]
    fn test_replace_and_remove_by_id() {
        for mut doc in both() {
            doc.replace_element_by_id("1", r#"<li id="1b">Swapped</li>"#)
                .expect("replace");
            let items = doc.get_elements_by_path("//ul/li").expect("select");
            assert_eq!(items[0], r#"<li id="1b">Swapped</li>"#);
            assert_eq!(doc.get_element_by_id("1"), None);

            let err = doc.replace_element_by_id("1", "<b>x</b>").expect_err("gone");
            assert!(err.is_not_found());
            assert_eq!(err.message(), "Element not found");

            doc.remove_element_by_id("2").expect("remove");
            assert_eq!(doc.get_element_by_id("2"), None);
            assert!(doc.remove_element_by_id("2").expect_err("gone").is_not_found());
        }
    }

    #[test]
    fn test_root_cannot_be_replaced_or_removed() {
        let html = r#"<html id="top"><body><p>x</p></body></html>"#;
        for engine in [Engine::Arena, Engine::Tree] {
            let mut doc = engine.parse(html);
            let err = doc
                .replace_element_by_id("top", "<html></html>")
                .expect_err("root");
            assert!(matches!(err, DocError::InvalidInput { .. }));
            let err = doc.remove_element_by_id("top").expect_err("root");
            assert!(matches!(err, DocError::InvalidInput { .. }));
        }
    }

    #[test]
    fn test_update_reinserts_under_parent_on_arena() {
        let mut doc = Engine::Arena.parse(SAMPLE);
        doc.update_element_by_path(
            "/html/body/div/ul/li[@id='1']",
            "/html/body/div/ul/li[@id='9']",
            r#"<li id="9">Moved</li>"#,
            None,
        )
        .expect("update");
        let items = doc.get_elements_by_path("//ul/li").expect("select");
        assert_eq!(
            items,
            vec![r#"<li id="2">Second</li>"#, r#"<li id="9">Moved</li>"#]
        );

        let err = doc
            .update_element_by_path("//ul", "//ul", "<ul></ul>", None)
            .expect_err("no parent step");
        assert!(matches!(err, DocError::InvalidInput { .. }));
    }

    #[test]
    fn test_update_replaces_in_place_on_tree() {
        let mut doc = Engine::Tree.parse(SAMPLE);
        doc.update_element_by_path(
            "//ul/li",
            "//ul/li",
            r#"<li>Only</li>"#,
            Some("id, missing"),
        )
        .expect("update");
        let items = doc.get_elements_by_path("//ul/li").expect("select");
        assert_eq!(items, vec![r#"<li id="1">Only</li>"#]);

        let err = doc
            .update_element_by_path("//table", "//table", "<table></table>", None)
            .expect_err("nothing to update");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_check_if_node_exists() {
        for doc in both() {
            assert!(doc
                .check_if_node_exists("//ul/li", NodeProbe::Fragment("<li>Field (F1)</li>"))
                .expect("check"));
            assert!(doc
                .check_if_node_exists("//ul/li", NodeProbe::Fragment("  Second "))
                .expect("check"));
            assert!(!doc
                .check_if_node_exists("//ul/li", "<li>Third</li>".into())
                .expect("check"));

            let mut probe = Element::new("li");
            probe.push_text("Second");
            assert!(doc.check_if_node_exists("//li", (&probe).into()).expect("check"));

            assert!(doc.check_if_node_exists("//ul", NodeProbe::Fragment("")).expect("check"));
        }
    }

    #[test]
    fn test_dialect_errors_surface() {
        let tree = Engine::Tree.parse(SAMPLE);
        let err = tree
            .get_elements_by_path("//li[contains(., 'F1')]")
            .expect_err("basic dialect");
        assert!(err.is_not_supported());

        let arena = Engine::Arena.parse(SAMPLE);
        assert_eq!(
            arena
                .get_elements_by_path("//li[contains(., 'F1')]")
                .expect("full dialect")
                .len(),
            1
        );
        let err = arena.get_elements_by_path("//li[").expect_err("malformed");
        assert!(matches!(err, DocError::InvalidInput { .. }));
    }

    #[test]
    fn test_to_html_keeps_doctype() {
        for doc in both() {
            let html = doc.to_html();
            assert!(html.starts_with("<!DOCTYPE html><html>"));
            assert!(html.contains("Field (F1)"));
        }
    }

    #[test]
    fn test_engine_metadata() {
        assert_eq!("Arena".parse::<Engine>().expect("arena"), Engine::Arena);
        assert_eq!(" tree ".parse::<Engine>().expect("tree"), Engine::Tree);
        assert!("soup".parse::<Engine>().is_err());
        assert_eq!(Engine::Tree.default_port(), 5000);
        assert_eq!(Engine::Arena.default_port(), 8001);
        assert_eq!(Engine::Arena.capabilities().dialect, Dialect::Full);
        assert_eq!(Engine::Tree.to_string(), "tree");
    }

    #[test]
    fn test_open_falls_back_on_missing_file() {
        let doc = Engine::Arena.open("/definitely/not/here.html");
        assert_eq!(doc.to_html(), "<html><head></head><body></body></html>");
    }
}
