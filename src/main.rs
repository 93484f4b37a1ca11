use clap::Parser;
use tracing_subscriber::EnvFilter;

use mock_ollama::{Cli, MockOllamaServer};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Cli::parse().into_config();
    let (host, port) = (config.host.clone(), config.port);

    let server = match MockOllamaServer::start(config).await {
        Ok(server) => server,
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(1);
        }
    };

    let port = if port == 0 { server.address().port() } else { port };
    println!("Mock Ollama server running at http://{}:{}", host, port);

    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c, serving until killed: {}", err);
        std::future::pending::<()>().await;
    }

    server.shutdown().await;
}
