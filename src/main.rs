use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use medlit::{
    api, config, logging,
    search::{Query, SearchResponse, SearchService},
};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(
    name = "medlit",
    about = "Search PubMed and summarize open-access full text or abstracts"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API (default when no subcommand is given).
    Serve {
        /// Overrides SERVER_PORT.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run a single query and print the JSON response on stdout.
    Search {
        query: String,
        #[arg(long)]
        max_results: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    config::init_config();

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(port).await,
        Command::Search { query, max_results } => search_once(query, max_results).await,
    }
}

async fn serve(port: Option<u16>) -> Result<()> {
    logging::init_tracing();
    let config = config::get_config();
    let service = SearchService::new().context("Failed to initialize search service")?;
    let app = api::create_router(Arc::new(service));

    let port = port.unwrap_or(config.server_port);
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn search_once(query: String, max_results: Option<usize>) -> Result<()> {
    logging::init_cli_tracing();
    let config = config::get_config();
    let service = SearchService::new().context("Failed to initialize search service")?;

    let max_results = max_results.unwrap_or(config.search_default_max_results);
    let pubmed = service.search(Query::new(query, max_results)).await?;
    let rendered = serde_json::to_string_pretty(&SearchResponse { pubmed })?;
    println!("{rendered}");
    Ok(())
}
