//! Storage for the arena engine.
//!
//! Nodes live in an `indextree` arena and are addressed by `NodeId`. Strings
//! are `StrTendril`s sharing the source buffer. Removing a node detaches its
//! subtree; the slots are reclaimed only when the document is dropped.

use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute, QualName, parse_document};
use indexmap::IndexMap;
use indextree::{Arena, NodeId};
use std::borrow::Cow;
use std::cell::RefCell;
use tendril::{StrTendril, TendrilSink};

use crate::error::DocError;
use crate::parser::OwnedElemName;
use crate::tree::{Capabilities, Dialect, HtmlTree, NodeView, UpdateStrategy};
use crate::untyped_dom::{Element, Namespace, Node};

/// A parsed document held in one `indextree` arena.
#[derive(Debug, Clone)]
pub struct Document {
    pub arena: Arena<NodeData>,

    /// Invisible node above the root element.
    pub document: NodeId,

    /// The root element, `<html>` for anything html5ever produced.
    pub root: NodeId,

    pub doctype: Option<StrTendril>,
}

impl Document {
    pub fn get(&self, id: NodeId) -> &NodeData {
        self.arena[id].get()
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.arena[id].get_mut()
    }

    pub fn body(&self) -> Option<NodeId> {
        self.root_child("body")
    }

    pub fn head(&self) -> Option<NodeId> {
        self.root_child("head")
    }

    fn root_child(&self, tag: &str) -> Option<NodeId> {
        self.root
            .children(&self.arena)
            .find(|&id| self.get(id).tag() == Some(tag))
    }

    /// Moves an owned element tree into the arena, detached.
    pub fn adopt(&mut self, element: Element) -> NodeId {
        let ns = element.ns;
        let node = self.arena.new_node(NodeData {
            kind: NodeKind::Element(ElementData {
                tag: StrTendril::from(element.tag.as_str()),
                attrs: element
                    .attrs
                    .iter()
                    .map(|(name, value)| (name.to_string(), StrTendril::from(value)))
                    .collect(),
            }),
            ns,
        });

        for child in element.children {
            let kind = match child {
                Node::Element(inner) => {
                    let id = self.adopt(inner);
                    node.append(id, &mut self.arena);
                    continue;
                }
                Node::Text(text) => NodeKind::Text(StrTendril::from(text.as_str())),
                Node::Comment(text) => NodeKind::Comment(StrTendril::from(text.as_str())),
            };
            let id = self.arena.new_node(NodeData { kind, ns });
            node.append(id, &mut self.arena);
        }
        node
    }

    fn is_attached(&self, id: NodeId) -> bool {
        id.ancestors(&self.arena).any(|a| a == self.document)
    }
}

/// One arena slot.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    pub ns: Namespace,
}

impl NodeData {
    fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element(elem) => Some(elem.tag.as_ref()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Document,
    Element(ElementData),
    Text(StrTendril),
    Comment(StrTendril),
}

#[derive(Debug, Clone)]
pub struct ElementData {
    pub tag: StrTendril,
    /// Source order; the first occurrence of a repeated name wins.
    pub attrs: IndexMap<String, StrTendril>,
}

/// Parses a full document. Text and attribute values share the source
/// buffer.
pub fn parse(html: &str) -> Document {
    parse_document(ArenaSink::new(), Default::default()).one(StrTendril::from(html))
}

impl HtmlTree for Document {
    type Node = NodeId;

    const CAPS: Capabilities = Capabilities {
        dialect: Dialect::Full,
        single_path_lookup: true,
        update: UpdateStrategy::DeleteThenInsertUnderParent,
        template_scan: false,
    };

    fn parse_html(html: &str) -> Self {
        parse(html)
    }

    fn document(&self) -> NodeId {
        self.document
    }

    fn view(&self, node: &NodeId) -> NodeView<'_> {
        let data = self.get(*node);
        match &data.kind {
            NodeKind::Document => NodeView::Document,
            NodeKind::Element(elem) => NodeView::Element {
                tag: elem.tag.as_ref(),
                ns: data.ns,
            },
            NodeKind::Text(t) => NodeView::Text(t.as_ref()),
            NodeKind::Comment(c) => NodeView::Comment(c.as_ref()),
        }
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        node.children(&self.arena).collect()
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.arena.get(*node)?.parent()
    }

    fn attrs(&self, node: &NodeId) -> Vec<(&str, &str)> {
        match &self.get(*node).kind {
            NodeKind::Element(elem) => elem
                .attrs
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_ref()))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn doctype(&self) -> Option<&str> {
        self.doctype.as_deref()
    }

    fn append_child(&mut self, parent: &NodeId, element: Element) -> Result<NodeId, DocError> {
        if !matches!(
            self.get(*parent).kind,
            NodeKind::Element(_) | NodeKind::Document
        ) {
            return Err(DocError::invalid_input(
                "cannot append children to a text or comment node",
            ));
        }
        let new_node = self.adopt(element);
        parent.append(new_node, &mut self.arena);
        Ok(new_node)
    }

    fn replace_node(&mut self, old: &NodeId, element: Element) -> Result<NodeId, DocError> {
        if self.parent(old).is_none() || !self.is_attached(*old) {
            return Err(DocError::invalid_input("cannot replace a detached node"));
        }
        let new_node = self.adopt(element);
        old.insert_after(new_node, &mut self.arena);
        old.detach(&mut self.arena);
        if *old == self.root {
            self.root = new_node;
        }
        Ok(new_node)
    }

    fn remove_node(&mut self, node: &NodeId) -> Result<(), DocError> {
        if *node == self.root {
            return Err(DocError::invalid_input("cannot remove the root element"));
        }
        if self.parent(node).is_none() {
            return Err(DocError::invalid_input("node has no parent"));
        }
        node.detach(&mut self.arena);
        Ok(())
    }
}

/// html5ever tree builder target. html5ever hands out `&self`, so the arena
/// sits behind a `RefCell` until `finish`.
struct ArenaSink {
    arena: RefCell<Arena<NodeData>>,
    document: NodeId,
    doctype: RefCell<Option<StrTendril>>,
}

impl ArenaSink {
    fn new() -> Self {
        let mut arena = Arena::new();
        let document = arena.new_node(NodeData {
            kind: NodeKind::Document,
            ns: Namespace::Html,
        });
        ArenaSink {
            arena: RefCell::new(arena),
            document,
            doctype: RefCell::new(None),
        }
    }

    fn html_node(&self, kind: NodeKind) -> NodeId {
        self.arena.borrow_mut().new_node(NodeData {
            kind,
            ns: Namespace::Html,
        })
    }

    fn materialize(&self, child: NodeOrText<NodeId>) -> NodeId {
        match child {
            NodeOrText::AppendNode(node) => node,
            NodeOrText::AppendText(text) => self.html_node(NodeKind::Text(text)),
        }
    }
}

impl TreeSink for ArenaSink {
    type Handle = NodeId;
    type Output = Document;
    type ElemName<'a>
        = OwnedElemName
    where
        Self: 'a;

    fn finish(self) -> Document {
        let root = self
            .document
            .children(&self.arena.borrow())
            .find(|&id| self.arena.borrow()[id].get().tag().is_some());
        let root = root.unwrap_or_else(|| {
            let html = self.html_node(NodeKind::Element(ElementData {
                tag: StrTendril::from("html"),
                attrs: IndexMap::new(),
            }));
            self.document.append(html, &mut self.arena.borrow_mut());
            html
        });

        Document {
            arena: self.arena.into_inner(),
            document: self.document,
            root,
            doctype: self.doctype.into_inner(),
        }
    }

    fn parse_error(&self, _msg: Cow<'static, str>) {}

    fn get_document(&self) -> NodeId {
        self.document
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn same_node(&self, a: &NodeId, b: &NodeId) -> bool {
        a == b
    }

    fn elem_name<'a>(&'a self, target: &'a NodeId) -> OwnedElemName {
        let arena = self.arena.borrow();
        let data = arena[*target].get();
        match data.tag() {
            Some(tag) => OwnedElemName::new(tag, data.ns),
            None => OwnedElemName::placeholder(),
        }
    }

    fn create_element(&self, name: QualName, attrs: Vec<Attribute>, _: ElementFlags) -> NodeId {
        let mut map: IndexMap<String, StrTendril> = IndexMap::with_capacity(attrs.len());
        for attr in attrs {
            map.entry(attr.name.local.to_string()).or_insert(attr.value);
        }
        self.arena.borrow_mut().new_node(NodeData {
            kind: NodeKind::Element(ElementData {
                tag: StrTendril::from(name.local.as_ref()),
                attrs: map,
            }),
            ns: Namespace::from_url(name.ns.as_ref()),
        })
    }

    fn create_comment(&self, text: StrTendril) -> NodeId {
        self.html_node(NodeKind::Comment(text))
    }

    /// Processing instructions are not HTML; keep an empty comment in place.
    fn create_pi(&self, _target: StrTendril, _data: StrTendril) -> NodeId {
        self.html_node(NodeKind::Comment(StrTendril::new()))
    }

    fn append(&self, parent: &NodeId, child: NodeOrText<NodeId>) {
        if let NodeOrText::AppendText(text) = &child {
            let mut arena = self.arena.borrow_mut();
            let last = parent.children(&arena).next_back();
            if let Some(last) = last
                && let NodeKind::Text(existing) = &mut arena[last].get_mut().kind
            {
                existing.push_tendril(text);
                return;
            }
        }
        let node = self.materialize(child);
        parent.append(node, &mut self.arena.borrow_mut());
    }

    fn append_before_sibling(&self, sibling: &NodeId, new_node: NodeOrText<NodeId>) {
        let node = self.materialize(new_node);
        sibling.insert_before(node, &mut self.arena.borrow_mut());
    }

    fn append_based_on_parent_node(
        &self,
        element: &NodeId,
        prev_element: &NodeId,
        child: NodeOrText<NodeId>,
    ) {
        if self.arena.borrow()[*element].parent().is_some() {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(&self, name: StrTendril, _: StrTendril, _: StrTendril) {
        *self.doctype.borrow_mut() = Some(name);
    }

    /// `<template>` content stays inline under the element.
    fn get_template_contents(&self, target: &NodeId) -> NodeId {
        *target
    }

    fn add_attrs_if_missing(&self, target: &NodeId, attrs: Vec<Attribute>) {
        if let NodeKind::Element(elem) = &mut self.arena.borrow_mut()[*target].get_mut().kind {
            for attr in attrs {
                elem.attrs
                    .entry(attr.name.local.to_string())
                    .or_insert(attr.value);
            }
        }
    }

    fn remove_from_parent(&self, target: &NodeId) {
        target.detach(&mut self.arena.borrow_mut());
    }

    fn reparent_children(&self, node: &NodeId, new_parent: &NodeId) {
        let mut arena = self.arena.borrow_mut();
        let children: Vec<NodeId> = node.children(&arena).collect();
        for child in children {
            child.detach(&mut arena);
            new_parent.append(child, &mut arena);
        }
    }
}
