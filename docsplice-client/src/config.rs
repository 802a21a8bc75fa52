use std::time::Duration;

use crate::ParserKind;

/// Where a client sends requests and which document it names by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Sent as `file_path` on every request unless overridden.
    pub default_file_path: Option<String>,
    pub timeout: Duration,
}

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            default_file_path: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// The loopback address the matching server listens on by default.
    pub fn for_kind(kind: ParserKind) -> Self {
        Self::new(kind.default_base_url())
    }

    pub fn with_default_file_path(mut self, path: impl Into<String>) -> Self {
        self.default_file_path = Some(path.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
