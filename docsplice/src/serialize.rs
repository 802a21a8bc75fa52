//! HTML serialization over any [`HtmlTree`].
//!
//! Output is what a browser's `outerHTML` would give for the same tree:
//! void elements have no end tag, `script`/`style` content is written raw,
//! `title`/`textarea` content escapes only `&` and `<`, and empty foreign
//! (SVG, MathML) elements self-close.

use std::fmt::Write;

use crate::tree::{HtmlTree, NodeView};
use crate::untyped_dom::{self, Element, Namespace};

/// How fragments and documents are written out.
#[derive(Clone, Debug)]
pub struct SerializeOptions {
    /// One node per line, indented by `indent` per level.
    pub pretty: bool,
    pub indent: String,
    /// Attributes in name order instead of source order.
    pub sort_attributes: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            indent: "  ".to_string(),
            sort_attributes: false,
        }
    }
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    pub fn sort_attributes(mut self) -> Self {
        self.sort_attributes = true;
        self
    }
}

/// The whole document, doctype included.
pub fn serialize_document<T: HtmlTree>(tree: &T, opts: &SerializeOptions) -> String {
    let mut writer = Writer::new(tree, opts);
    if let Some(doctype) = tree.doctype() {
        let _ = write!(writer.out, "<!DOCTYPE {doctype}>");
        writer.newline();
    }
    for child in tree.children(&tree.document()) {
        writer.node(&child);
    }
    writer.out
}

/// One node and its subtree. A text node comes out as escaped text.
pub fn serialize_node<T: HtmlTree>(tree: &T, node: &T::Node, opts: &SerializeOptions) -> String {
    let mut writer = Writer::new(tree, opts);
    writer.node(node);
    writer.out
}

/// What an element's content looks like on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentModel {
    Void,
    RawText,
    EscapableRawText,
    Normal,
}

impl ContentModel {
    fn of(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link"
            | "meta" | "param" | "source" | "track" | "wbr" => ContentModel::Void,
            "script" | "style" => ContentModel::RawText,
            "title" | "textarea" => ContentModel::EscapableRawText,
            _ => ContentModel::Normal,
        }
    }
}

/// Characters replaced by an entity in each escaping context.
#[derive(Clone, Copy)]
enum Escape {
    Text,
    Rcdata,
    Attribute,
}

fn escape_into(out: &mut String, text: &str, mode: Escape) {
    for c in text.chars() {
        let entity = match (c, mode) {
            ('&', _) => "&amp;",
            ('<', _) => "&lt;",
            ('>', Escape::Text | Escape::Attribute) => "&gt;",
            ('"', Escape::Attribute) => "&quot;",
            _ => {
                out.push(c);
                continue;
            }
        };
        out.push_str(entity);
    }
}

/// Script bodies never contain a literal `</script`, whatever its case.
fn push_script(out: &mut String, text: &str) {
    const END: &[u8] = b"</script";
    let bytes = text.as_bytes();
    let mut copied = 0;
    let mut at = 0;
    while at + END.len() <= bytes.len() {
        if bytes[at..at + END.len()].eq_ignore_ascii_case(END) {
            out.push_str(&text[copied..at]);
            out.push_str("<\\/script");
            at += END.len();
            copied = at;
        } else {
            at += 1;
        }
    }
    out.push_str(&text[copied..]);
}

struct Writer<'a, T: HtmlTree> {
    tree: &'a T,
    opts: &'a SerializeOptions,
    out: String,
    depth: usize,
}

impl<'a, T: HtmlTree> Writer<'a, T> {
    fn new(tree: &'a T, opts: &'a SerializeOptions) -> Self {
        Self {
            tree,
            opts,
            out: String::new(),
            depth: 0,
        }
    }

    fn indent(&mut self) {
        if self.opts.pretty {
            for _ in 0..self.depth {
                self.out.push_str(&self.opts.indent);
            }
        }
    }

    fn newline(&mut self) {
        if self.opts.pretty {
            self.out.push('\n');
        }
    }

    fn close(&mut self, tag: &str) {
        let _ = write!(self.out, "</{tag}>");
        self.newline();
    }

    fn node(&mut self, node: &T::Node) {
        match self.tree.view(node) {
            NodeView::Document => {
                for child in self.tree.children(node) {
                    self.node(&child);
                }
            }
            NodeView::Element { tag, ns } => self.element(node, tag, ns),
            NodeView::Text(text) => {
                self.indent();
                escape_into(&mut self.out, text, Escape::Text);
                if !text.is_empty() {
                    self.newline();
                }
            }
            NodeView::Comment(text) => {
                self.indent();
                let _ = write!(self.out, "<!--{}-->", text.replace("--", "- -"));
                self.newline();
            }
        }
    }

    fn open_tag(&mut self, node: &T::Node, tag: &str) {
        self.indent();
        let _ = write!(self.out, "<{tag}");
        let mut attrs = self.tree.attrs(node);
        if self.opts.sort_attributes {
            attrs.sort_by_key(|(name, _)| *name);
        }
        for (name, value) in attrs {
            let _ = write!(self.out, " {name}=\"");
            escape_into(&mut self.out, value, Escape::Attribute);
            self.out.push('"');
        }
    }

    fn element(&mut self, node: &T::Node, tag: &str, ns: Namespace) {
        self.open_tag(node, tag);
        let model = ContentModel::of(tag);
        if model == ContentModel::Void {
            self.out.push('>');
            self.newline();
            return;
        }

        let children = self.tree.children(node);
        if ns != Namespace::Html && children.is_empty() {
            self.out.push_str("/>");
            self.newline();
            return;
        }
        self.out.push('>');

        let texts: Option<Vec<&str>> = children
            .iter()
            .map(|child| match self.tree.view(child) {
                NodeView::Text(text) => Some(text),
                _ => None,
            })
            .collect();

        match (model, texts) {
            (ContentModel::RawText, _) | (ContentModel::EscapableRawText, _) => {
                let raw = children.iter().filter_map(|child| match self.tree.view(child) {
                    NodeView::Text(text) => Some(text),
                    _ => None,
                });
                for text in raw {
                    match model {
                        ContentModel::RawText if tag.eq_ignore_ascii_case("script") => {
                            push_script(&mut self.out, text)
                        }
                        ContentModel::RawText => self.out.push_str(text),
                        _ => escape_into(&mut self.out, text, Escape::Rcdata),
                    }
                }
            }
            (_, Some(texts)) => {
                for text in texts {
                    escape_into(&mut self.out, text, Escape::Text);
                }
            }
            (_, None) => {
                self.newline();
                self.depth += 1;
                for child in &children {
                    self.node(child);
                }
                self.depth -= 1;
                self.indent();
            }
        }
        self.close(tag);
    }
}

impl Element {
    /// This element as a detached fragment.
    pub fn to_html(&self) -> String {
        self.to_html_with_options(&SerializeOptions::default())
    }

    pub fn to_html_with_options(&self, opts: &SerializeOptions) -> String {
        let doc = untyped_dom::Document::new(self.clone());
        let root = untyped_dom::NodePath::document().child(0);
        serialize_node(&doc, &root, opts)
    }
}

impl untyped_dom::Document {
    pub fn to_html(&self) -> String {
        serialize_document(self, &SerializeOptions::default())
    }
}
