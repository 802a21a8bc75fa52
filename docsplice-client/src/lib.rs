//! Blocking clients for docsplice document servers.
//!
//! [`ApiParser`] presents the server's document operations as local calls.
//! Two implementations talk to the two server engines:
//! [`TreeApiParser`] maps every operation onto its own route, while
//! [`ArenaApiParser`] leans on the arena engine's full path dialect to
//! answer some operations through `/get-elements-by-path`.
//! [`ApiParserFactory`] picks one by name.
//!
//! ```no_run
//! use docsplice_client::ApiParserFactory;
//!
//! let parser = ApiParserFactory::create("arena", None, Some("sample_files/F1.html"))?;
//! if let Some(item) = parser.get_element_by_id("1")? {
//!     println!("{item}");
//! }
//! # Ok::<(), docsplice::DocError>(())
//! ```

mod tracing_macros;

mod arena;
mod config;
mod factory;
mod transport;
mod tree;

use docsplice::{DocError, NodeProbe};

pub use arena::ArenaApiParser;
pub use config::{ClientConfig, DEFAULT_TIMEOUT};
pub use factory::{ApiParserFactory, ParserKind};
pub use tree::TreeApiParser;

/// Document operations served over HTTP. Returned elements are serialized
/// HTML fragments.
///
/// Optional lookups report a missing element as `Ok(None)` and list
/// lookups as an empty list; mutations surface [`DocError::NotFound`].
pub trait ApiParser {
    fn kind(&self) -> ParserKind;

    fn base_url(&self) -> &str;

    /// The `file_path` sent with every request, if any.
    fn document(&self) -> Option<&str>;

    fn get_element_by_id(&self, id: &str) -> Result<Option<String>, DocError>;

    fn check_if_element_exists(&self, id: &str) -> Result<(bool, Option<String>), DocError>;

    fn get_element_by_name(&self, name: &str) -> Result<Option<String>, DocError>;

    fn get_elements_by_name(&self, name: &str) -> Result<Vec<String>, DocError>;

    fn get_element_by_path(&self, path: &str) -> Result<Option<String>, DocError>;

    fn get_elements_by_path(&self, path: &str) -> Result<Vec<String>, DocError>;

    fn get_elements_by_value(&self, value: &str) -> Result<Vec<String>, DocError>;

    fn get_elements_by_jinja_variable(&self, name: &str) -> Result<Vec<String>, DocError>;

    fn replace_element_by_id(&self, id: &str, new_element_html: &str) -> Result<(), DocError>;

    fn remove_element_by_id(&self, id: &str) -> Result<(), DocError>;

    /// Number of nodes the server detached.
    fn delete_elements_by_path(&self, path: &str) -> Result<usize, DocError>;

    fn insert_element_by_path(&self, path: &str, element_html: &str) -> Result<(), DocError>;

    fn update_element_by_path(
        &self,
        old_path: &str,
        new_path: &str,
        new_content: &str,
        important_data: Option<&str>,
    ) -> Result<(), DocError>;

    fn check_if_node_exists(&self, xpath: &str, node: NodeProbe<'_>) -> Result<bool, DocError>;
}
