pub mod agent;
pub mod cli;
pub mod error;
pub mod history;
pub mod llm;
pub mod models;
pub mod server;

#[cfg(test)]
pub(crate) mod test_support;

use agent::ChatAgent;
use cli::Args;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Listen Address: {}", args.listen_addr());
    info!("Static Directory: {}", args.static_dir);
    info!("Vector Store Type: {}", args.vector_type);
    info!("Vector Store Host: {}", args.vector_host);
    info!("Vector Collection: {} (dimension {})", args.collection, args.dimension);
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Embedding LLM Type: {}", args.embedding_llm_type);
    info!("History Limit: {}", args.history_limit);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let agent = Arc::new(ChatAgent::from_args(&args).await?);
    Server::new(args, agent).run().await?;

    Ok(())
}
