use docsplice::{DocError, NodeProbe};

use crate::config::ClientConfig;
use crate::transport::Transport;
use crate::{ApiParser, ParserKind};

/// Client for a tree-engine server: one route per operation.
#[derive(Debug, Clone)]
pub struct TreeApiParser {
    transport: Transport,
}

impl TreeApiParser {
    pub fn new(config: &ClientConfig) -> Result<Self, DocError> {
        Ok(Self {
            transport: Transport::new(config)?,
        })
    }

    /// Targets `http://127.0.0.1:5000` and the server's default document.
    pub fn local() -> Result<Self, DocError> {
        Self::new(&ClientConfig::for_kind(ParserKind::Tree))
    }

    /// Names `path` on every later request instead of the configured one.
    pub fn with_document(mut self, path: impl Into<String>) -> Self {
        self.transport.set_file_path(Some(path.into()));
        self
    }
}

impl ApiParser for TreeApiParser {
    fn kind(&self) -> ParserKind {
        ParserKind::Tree
    }

    fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    fn document(&self) -> Option<&str> {
        self.transport.file_path()
    }

    fn get_element_by_id(&self, id: &str) -> Result<Option<String>, DocError> {
        self.transport.get_by_id(id)
    }

    fn check_if_element_exists(&self, id: &str) -> Result<(bool, Option<String>), DocError> {
        self.transport.check_exists(id)
    }

    fn get_element_by_name(&self, name: &str) -> Result<Option<String>, DocError> {
        self.transport.get_by_name(name)
    }

    fn get_elements_by_name(&self, name: &str) -> Result<Vec<String>, DocError> {
        self.transport.get_elements_by_name(name)
    }

    fn get_element_by_path(&self, path: &str) -> Result<Option<String>, DocError> {
        self.transport.get_by_path(path)
    }

    fn get_elements_by_path(&self, path: &str) -> Result<Vec<String>, DocError> {
        self.transport.get_elements_by_path(path)
    }

    fn get_elements_by_value(&self, value: &str) -> Result<Vec<String>, DocError> {
        self.transport.get_by_value(value)
    }

    fn get_elements_by_jinja_variable(&self, name: &str) -> Result<Vec<String>, DocError> {
        self.transport.get_by_jinja_variable(name)
    }

    fn replace_element_by_id(&self, id: &str, new_element_html: &str) -> Result<(), DocError> {
        self.transport.replace_by_id(id, new_element_html)
    }

    fn remove_element_by_id(&self, id: &str) -> Result<(), DocError> {
        self.transport.remove_by_id(id)
    }

    fn delete_elements_by_path(&self, path: &str) -> Result<usize, DocError> {
        self.transport.delete_elements_by_path(path)
    }

    fn insert_element_by_path(&self, path: &str, element_html: &str) -> Result<(), DocError> {
        self.transport.insert_element_by_path(path, element_html)
    }

    fn update_element_by_path(
        &self,
        old_path: &str,
        new_path: &str,
        new_content: &str,
        important_data: Option<&str>,
    ) -> Result<(), DocError> {
        self.transport
            .update_element_by_path(old_path, new_path, new_content, important_data)
    }

    fn check_if_node_exists(&self, xpath: &str, node: NodeProbe<'_>) -> Result<bool, DocError> {
        match node {
            NodeProbe::Fragment(html) => self.transport.check_if_node_exists(xpath, html),
            NodeProbe::Element(element) => {
                self.transport.check_if_node_exists(xpath, &element.to_html())
            }
        }
    }
}
