use std::path::PathBuf;

use docsplice::Engine;

/// Document served when a request names no `file_path`.
pub const DEFAULT_DOCUMENT: &str = "sample_files/F1.html";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub engine: Engine,
    pub default_document: PathBuf,
}

impl ServerConfig {
    /// Loopback on the engine's default port, serving the sample document.
    pub fn new(engine: Engine) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: engine.default_port(),
            engine,
            default_document: PathBuf::from(DEFAULT_DOCUMENT),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_default_document(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_document = path.into();
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(Engine::Tree)
    }
}
