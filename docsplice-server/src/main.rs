use std::path::PathBuf;

use clap::Parser;
use docsplice::Engine;
use docsplice_server::{DEFAULT_DOCUMENT, ServerConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Serve an HTML document over HTTP for path-addressed edits.
#[derive(Parser, Debug)]
#[command(name = "docsplice-server", version, about)]
struct Cli {
    /// Address to bind
    #[arg(long, env = "DOCSPLICE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on (defaults to 5000 for tree, 8001 for arena)
    #[arg(long, env = "DOCSPLICE_PORT")]
    port: Option<u16>,

    /// Tree engine: `tree` or `arena`
    #[arg(long, env = "DOCSPLICE_ENGINE", default_value = "tree")]
    engine: Engine,

    /// Document used when a request has no `file_path`
    #[arg(long, env = "DOCSPLICE_DOCUMENT", default_value = DEFAULT_DOCUMENT)]
    document: PathBuf,
}

impl Cli {
    fn into_config(self) -> ServerConfig {
        let config = ServerConfig::new(self.engine)
            .with_host(self.host)
            .with_default_document(self.document);
        match self.port {
            Some(port) => config.with_port(port),
            None => config,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();

    let config = Cli::parse().into_config();
    docsplice_server::serve(config).await
}
