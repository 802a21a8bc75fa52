//! HTML5 parsing into the owned tree, using html5ever's TreeSink.
//!
//! html5ever's tree construction algorithm gives browser-compatible error
//! recovery, so parsing never fails; only fragment extraction can reject its
//! input.

use html5ever::tree_builder::{ElemName, ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{
    Attribute, LocalName, QualName, parse_document as html5ever_parse,
    parse_fragment as html5ever_parse_fragment,
};
use std::borrow::Cow;
use std::cell::RefCell;
use tendril::{StrTendril, TendrilSink};

use crate::error::DocError;
use crate::untyped_dom::{Attributes, Document, Element, Namespace, Node};

/// Parse an HTML string into an owned [`Document`].
///
/// Comments and the doctype name are kept; processing instructions are
/// dropped.
pub fn parse_document(html: &str) -> Document {
    let sink = HtmlSink::default();
    html5ever_parse(sink, Default::default())
        .one(StrTendril::from(html))
        .into_document()
}

/// Parse an HTML fragment into a single element.
///
/// The fragment is parsed in a `<template>` context, whose content model
/// accepts any element, so table parts such as `<tr>` or `<td>` survive on
/// their own. A single top-level element is returned as is; several are
/// wrapped in a `<div>`, in order. Top-level text between elements is
/// dropped.
pub fn parse_fragment(html: &str) -> Result<Element, DocError> {
    let context = OwnedElemName::new("template", Namespace::Html).0;
    let doc = html5ever_parse_fragment(
        HtmlSink::default(),
        Default::default(),
        context,
        Vec::new(),
        false,
    )
    .one(StrTendril::from(html))
    .into_document();

    let mut elements: Vec<Element> = doc
        .root
        .children
        .into_iter()
        .filter_map(|child| match child {
            Node::Element(e) => Some(e),
            _ => None,
        })
        .collect();

    match elements.len() {
        0 => Err(DocError::invalid_input("fragment contains no element")),
        1 => Ok(elements.remove(0)),
        _ => {
            let mut wrapper = Element::new("div");
            wrapper.children = elements.into_iter().map(Node::Element).collect();
            Ok(wrapper)
        }
    }
}

/// Owned element name handed back to html5ever from `elem_name`.
#[derive(Debug, Clone)]
pub(crate) struct OwnedElemName(pub(crate) QualName);

impl OwnedElemName {
    pub(crate) fn new(tag: &str, ns: Namespace) -> Self {
        OwnedElemName(QualName {
            prefix: None,
            ns: html5ever::Namespace::from(ns.uri()),
            local: LocalName::from(tag),
        })
    }

    /// Name for handles that are not elements. html5ever only asks for
    /// element names, so this is never matched against.
    pub(crate) fn placeholder() -> Self {
        Self::new("", Namespace::Html)
    }
}

impl ElemName for OwnedElemName {
    fn ns(&self) -> &html5ever::Namespace {
        &self.0.ns
    }

    fn local_name(&self) -> &LocalName {
        &self.0.local
    }
}

/// Parse-time node: a slab slot with its parent link.
#[derive(Debug)]
struct Slot {
    kind: SlotKind,
    parent: Option<usize>,
    children: Vec<usize>,
}

#[derive(Debug)]
enum SlotKind {
    Document,
    Element {
        name: QualName,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
}

/// html5ever tree builder target for the owned tree. Nodes are slab
/// indices while parsing and become an [`Element`] tree in `into_document`.
struct HtmlSink {
    slots: RefCell<Vec<Slot>>,
    doctype: RefCell<Option<String>>,
}

const DOCUMENT: usize = 0;

impl Default for HtmlSink {
    fn default() -> Self {
        Self {
            slots: RefCell::new(vec![Slot {
                kind: SlotKind::Document,
                parent: None,
                children: Vec::new(),
            }]),
            doctype: RefCell::new(None),
        }
    }
}

impl HtmlSink {
    fn alloc(&self, kind: SlotKind) -> usize {
        let mut slots = self.slots.borrow_mut();
        slots.push(Slot {
            kind,
            parent: None,
            children: Vec::new(),
        });
        slots.len() - 1
    }

    fn attach(&self, child: NodeOrText<usize>) -> usize {
        match child {
            NodeOrText::AppendNode(id) => id,
            NodeOrText::AppendText(text) => self.alloc(SlotKind::Text(text.to_string())),
        }
    }

    fn detach(slots: &mut [Slot], id: usize) {
        if let Some(parent) = slots[id].parent.take() {
            slots[parent].children.retain(|&child| child != id);
        }
    }

    fn into_document(self) -> Document {
        let slots = self.slots.into_inner();
        let root = slots[DOCUMENT]
            .children
            .iter()
            .find_map(|&id| Self::build_element(&slots, id))
            .unwrap_or_else(|| Element::new("html"));
        Document {
            doctype: self.doctype.into_inner(),
            root,
        }
    }

    fn build_element(slots: &[Slot], id: usize) -> Option<Element> {
        let SlotKind::Element { name, attrs } = &slots[id].kind else {
            return None;
        };
        let children = slots[id]
            .children
            .iter()
            .filter_map(|&child| match &slots[child].kind {
                SlotKind::Text(text) => Some(Node::Text(text.clone())),
                SlotKind::Comment(text) => Some(Node::Comment(text.clone())),
                SlotKind::Element { .. } => Self::build_element(slots, child).map(Node::Element),
                SlotKind::Document => None,
            })
            .collect();
        Some(Element {
            tag: name.local.to_string(),
            ns: Namespace::from_url(name.ns.as_ref()),
            attrs: Attributes::collect_from(attrs.iter().cloned()),
            children,
        })
    }
}

impl TreeSink for HtmlSink {
    type Handle = usize;
    type Output = Self;
    type ElemName<'a>
        = OwnedElemName
    where
        Self: 'a;

    fn finish(self) -> Self {
        self
    }

    fn parse_error(&self, _msg: Cow<'static, str>) {}

    fn get_document(&self) -> usize {
        DOCUMENT
    }

    fn elem_name<'a>(&'a self, target: &'a usize) -> OwnedElemName {
        match &self.slots.borrow()[*target].kind {
            SlotKind::Element { name, .. } => OwnedElemName(name.clone()),
            _ => OwnedElemName::placeholder(),
        }
    }

    fn create_element(&self, name: QualName, attrs: Vec<Attribute>, _: ElementFlags) -> usize {
        let attrs = attrs
            .into_iter()
            .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
            .collect();
        self.alloc(SlotKind::Element { name, attrs })
    }

    fn create_comment(&self, text: StrTendril) -> usize {
        self.alloc(SlotKind::Comment(text.to_string()))
    }

    fn create_pi(&self, _target: StrTendril, _data: StrTendril) -> usize {
        self.alloc(SlotKind::Text(String::new()))
    }

    fn append(&self, parent: &usize, child: NodeOrText<usize>) {
        if let NodeOrText::AppendText(text) = &child {
            let mut slots = self.slots.borrow_mut();
            if let Some(&last) = slots[*parent].children.last()
                && let SlotKind::Text(existing) = &mut slots[last].kind
            {
                existing.push_str(text);
                return;
            }
        }
        let id = self.attach(child);
        let mut slots = self.slots.borrow_mut();
        Self::detach(&mut slots, id);
        slots[id].parent = Some(*parent);
        slots[*parent].children.push(id);
    }

    fn append_based_on_parent_node(
        &self,
        element: &usize,
        prev_element: &usize,
        child: NodeOrText<usize>,
    ) {
        let has_parent = self.slots.borrow()[*element].parent.is_some();
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(&self, name: StrTendril, _: StrTendril, _: StrTendril) {
        *self.doctype.borrow_mut() = Some(name.to_string());
    }

    fn get_template_contents(&self, target: &usize) -> usize {
        *target
    }

    fn same_node(&self, x: &usize, y: &usize) -> bool {
        x == y
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn append_before_sibling(&self, sibling: &usize, new_node: NodeOrText<usize>) {
        let id = self.attach(new_node);
        let mut slots = self.slots.borrow_mut();
        let Some(parent) = slots[*sibling].parent else {
            return;
        };
        Self::detach(&mut slots, id);
        let at = slots[parent]
            .children
            .iter()
            .position(|&child| child == *sibling)
            .unwrap_or(slots[parent].children.len());
        slots[parent].children.insert(at, id);
        slots[id].parent = Some(parent);
    }

    fn add_attrs_if_missing(&self, target: &usize, attrs: Vec<Attribute>) {
        if let SlotKind::Element {
            attrs: existing, ..
        } = &mut self.slots.borrow_mut()[*target].kind
        {
            for attr in attrs {
                let name = attr.name.local.to_string();
                if !existing.iter().any(|(known, _)| *known == name) {
                    existing.push((name, attr.value.to_string()));
                }
            }
        }
    }

    fn remove_from_parent(&self, target: &usize) {
        Self::detach(&mut self.slots.borrow_mut(), *target);
    }

    fn reparent_children(&self, node: &usize, new_parent: &usize) {
        let mut slots = self.slots.borrow_mut();
        let moved = std::mem::take(&mut slots[*node].children);
        for &child in &moved {
            slots[child].parent = Some(*new_parent);
        }
        slots[*new_parent].children.extend(moved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document_structure() {
        let doc = parse_document("<!DOCTYPE html><html><body><p>Hello</p></body></html>");
        assert_eq!(doc.doctype.as_deref(), Some("html"));
        assert_eq!(doc.root.tag, "html");
        let body = doc.body().expect("should have body");
        let p = body.children[0].as_element().expect("p element");
        assert_eq!(p.tag, "p");
        assert_eq!(p.text_content(), "Hello");
    }

    #[test]
    fn test_parse_keeps_comments() {
        let doc = parse_document("<html><body><!-- note --><p>x</p></body></html>");
        let body = doc.body().expect("should have body");
        assert_eq!(body.children[0], Node::Comment(" note ".to_string()));
    }

    #[test]
    fn test_parse_duplicate_attributes_first_wins() {
        let doc = parse_document(r#"<div class="a" class="b" id="x"></div>"#);
        let div = doc.body().expect("body").children[0]
            .as_element()
            .expect("div");
        assert_eq!(div.get_attr("class"), Some("a"));
        assert_eq!(div.attrs.len(), 2);
    }

    #[test]
    fn test_parse_svg_namespace() {
        let doc = parse_document("<body><svg><rect></rect></svg></body>");
        let svg = doc.body().expect("body").children[0]
            .as_element()
            .expect("svg");
        assert_eq!(svg.ns, Namespace::Svg);
    }

    #[test]
    fn test_foster_parented_text_lands_before_table() {
        let doc = parse_document("<body><table>oops<tr><td>x</td></tr></table></body>");
        let body = doc.body().expect("body");
        assert_eq!(body.children[0], Node::Text("oops".to_string()));
        assert_eq!(
            body.children[1].as_element().map(|e| e.tag.as_str()),
            Some("table")
        );
    }

    #[test]
    fn test_fragment_single_element() {
        let li = parse_fragment(r#"<li id="3">New Inserted Element</li>"#).expect("fragment");
        assert_eq!(li.tag, "li");
        assert_eq!(li.get_attr("id"), Some("3"));
        assert_eq!(li.text_content(), "New Inserted Element");
    }

    #[test]
    fn test_fragment_multiple_elements_are_wrapped() {
        let wrapper = parse_fragment("<p>a</p> <p>b</p>").expect("fragment");
        assert_eq!(wrapper.tag, "div");
        assert_eq!(wrapper.children.len(), 2);
    }

    #[test]
    fn test_fragment_from_head_content() {
        let meta = parse_fragment(r#"<meta name="x" content="y">"#).expect("fragment");
        assert_eq!(meta.tag, "meta");
    }

    #[test]
    fn test_fragment_table_parts() {
        let tr = parse_fragment(r#"<tr id="r2"><td>b</td></tr>"#).expect("row");
        assert_eq!(tr.tag, "tr");
        assert_eq!(tr.get_attr("id"), Some("r2"));
        assert_eq!(tr.children[0].as_element().map(|e| e.tag.as_str()), Some("td"));

        let td = parse_fragment("<td>cell</td>").expect("cell");
        assert_eq!(td.tag, "td");
        assert_eq!(td.text_content(), "cell");

        let wrapper = parse_fragment("<th>a</th><th>b</th>").expect("cells");
        assert_eq!(wrapper.tag, "div");
        assert_eq!(wrapper.children.len(), 2);
    }

    #[test]
    fn test_fragment_without_element_is_rejected() {
        let err = parse_fragment("just text").expect_err("no element");
        assert!(matches!(err, DocError::InvalidInput { .. }));
        assert!(parse_fragment("   ").is_err());
    }
}
