use std::fmt;
use std::str::FromStr;

use docsplice::{DocError, Engine};

use crate::config::ClientConfig;
use crate::tracing_macros::debug;
use crate::{ApiParser, ArenaApiParser, TreeApiParser};

/// Which server engine a client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserKind {
    Tree,
    Arena,
}

const TREE_KEYS: &[&str] = &["tree", "http", "httpapi", "http_api"];
const ARENA_KEYS: &[&str] = &[
    "arena",
    "arena_http",
    "xpath",
    "lxml",
    "lxml_http",
    "lxml_http_api",
];

impl ParserKind {
    pub fn name(self) -> &'static str {
        match self {
            ParserKind::Tree => "tree",
            ParserKind::Arena => "arena",
        }
    }

    /// Every key [`FromStr`] accepts.
    pub fn keys() -> impl Iterator<Item = &'static str> {
        TREE_KEYS.iter().chain(ARENA_KEYS).copied()
    }

    pub fn engine(self) -> Engine {
        match self {
            ParserKind::Tree => Engine::Tree,
            ParserKind::Arena => Engine::Arena,
        }
    }

    pub fn default_base_url(self) -> String {
        format!("http://127.0.0.1:{}", self.engine().default_port())
    }
}

impl fmt::Display for ParserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParserKind {
    type Err = DocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        if TREE_KEYS.contains(&key.as_str()) {
            Ok(ParserKind::Tree)
        } else if ARENA_KEYS.contains(&key.as_str()) {
            Ok(ParserKind::Arena)
        } else {
            let known: Vec<&str> = ParserKind::keys().collect();
            Err(DocError::invalid_input(format!(
                "unknown parser type `{}`; expected one of: {}",
                s.trim(),
                known.join(", ")
            )))
        }
    }
}

/// Builds clients by name.
pub struct ApiParserFactory;

impl ApiParserFactory {
    /// `kind` is matched case-insensitively. Without `base_url` the client
    /// targets the engine's default local port.
    pub fn create(
        kind: &str,
        base_url: Option<&str>,
        default_file_path: Option<&str>,
    ) -> Result<Box<dyn ApiParser>, DocError> {
        let kind: ParserKind = kind.parse()?;
        let mut config = match base_url {
            Some(url) => ClientConfig::new(url),
            None => ClientConfig::for_kind(kind),
        };
        if let Some(path) = default_file_path {
            config = config.with_default_file_path(path);
        }
        Self::from_config(kind, &config)
    }

    pub fn from_config(
        kind: ParserKind,
        config: &ClientConfig,
    ) -> Result<Box<dyn ApiParser>, DocError> {
        debug!(%kind, base_url = %config.base_url, "creating parser client");
        Ok(match kind {
            ParserKind::Tree => Box::new(TreeApiParser::new(config)?),
            ParserKind::Arena => Box::new(ArenaApiParser::new(config)?),
        })
    }
}
