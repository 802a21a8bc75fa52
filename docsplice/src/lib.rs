//! Path-addressed HTML document manipulation on top of html5ever.
//!
//! docsplice provides:
//! - **Two tree engines**: an `indextree` arena ([`arena_dom`]) and an owned
//!   element tree ([`untyped_dom`]), both behind the [`HtmlTree`] adapter
//! - **Parsing**: browser-compatible HTML5 parsing via html5ever with full
//!   error recovery, for documents and fragments
//! - **Path expressions**: an XPath 1.0 subset in two dialects ([`path`])
//! - **Serialization**: HTML5-correct serialization with proper escaping
//! - **Document service**: lookups and mutations by id, name, path, text
//!   and template variable ([`DocumentParser`])
//!
//! # Example
//!
//! ```rust
//! use docsplice::{DocumentParser, Engine};
//!
//! let mut doc = Engine::Arena.parse(
//!     r#"<html><body><ul><li id="1">One</li></ul></body></html>"#,
//! );
//! doc.insert_element_by_path("/html/body/ul", r#"<li id="2">Two</li>"#)
//!     .unwrap();
//!
//! let items = doc.get_elements_by_path("//ul/li[@id='2']").unwrap();
//! assert_eq!(items, vec![r#"<li id="2">Two</li>"#]);
//! assert!(doc.get_element_by_id("1").is_some());
//! ```

mod tracing_macros;

pub mod arena_dom;
mod document;
mod error;
mod parser;
pub mod path;
pub mod serialize;
pub mod template;
mod tree;
pub mod untyped_dom;
pub mod wire;

pub use document::{DocumentParser, DocumentService, Engine, FALLBACK_DOCUMENT, NodeProbe};
pub use error::DocError;
pub use parser::{parse_document, parse_fragment};
pub use serialize::{SerializeOptions, serialize_document, serialize_node};
pub use tree::{Capabilities, Dialect, HtmlTree, NodeView, UpdateStrategy};
pub use untyped_dom::{Element, Namespace, Node};
