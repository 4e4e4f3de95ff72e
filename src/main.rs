//! Paideia - Personalized Study Assistant
//!
//! Entry point for the HTTP backend: wires the vector memory, the progress
//! store, and the Ollama services into the task graph and serves the API.

use clap::Parser;
use paideia::api::{ApiServer, ApiServerConfig};
use paideia::{
    LearnOrchestrator, LibsqlProgress, OllamaEmbedder, OllamaGenerator, Orchestrator, Settings,
    StudyAgent, VectorMemory,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "paideia")]
#[command(about = "Personalized study assistant backend", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to bind the API server to (overrides PAIDEIA_LISTEN_ADDR)
    #[arg(long)]
    addr: Option<String>,

    /// Database path (overrides PAIDEIA_DATABASE_PATH)
    #[arg(long)]
    db_path: Option<String>,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Keep hyper and tower noise down unless explicitly asked for.
    let filter = EnvFilter::new(format!(
        "paideia={},tower_http=info,hyper=warn",
        level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    debug!("Paideia v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut settings = Settings::load()?;
    if let Some(addr) = cli.addr {
        settings.listen_addr = addr;
    }
    if let Some(db_path) = cli.db_path {
        settings.database_path = db_path;
    }

    let llm_config = settings.llm_config();
    let embedder = Arc::new(OllamaEmbedder::new(llm_config.clone())?);
    let generator = Arc::new(OllamaGenerator::new(llm_config)?);

    let memory = Arc::new(VectorMemory::new(embedder, Path::new(&settings.data_dir))?);
    let store = Arc::new(LibsqlProgress::new_local(&settings.database_path).await?);
    info!("Progress store ready at {}", settings.database_path);

    let agent = Arc::new(StudyAgent::new(
        memory.clone(),
        generator,
        store.clone(),
    ));
    let orchestrator = Arc::new(Orchestrator::new(store.clone()));
    let learn = Arc::new(LearnOrchestrator::new(agent.clone(), store.clone()));

    let addr: SocketAddr = settings.listen_addr.parse()?;
    let server = ApiServer::new(
        ApiServerConfig { addr },
        memory,
        store,
        agent,
        orchestrator,
        learn,
    );
    server.serve().await
}
