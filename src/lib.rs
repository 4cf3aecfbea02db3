pub mod agent;
pub mod models;
pub mod server;
pub mod config;
pub mod llm;
pub mod cli;
pub mod history;
pub mod store;

use agent::ChatAgent;
use cli::Args;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Route Path: {}", args.route_path);
    info!("Allowed Origins: {}", args.allowed_origins);
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Max Output Tokens: {}", args.max_output_tokens);
    info!("Request Timeout: {}s", args.request_timeout_secs);
    info!("Record Store Type: {}", args.record_store_type);
    info!("Record Store Host: {}", args.record_store_host);
    info!("Record Table: {}", args.record_table);
    info!("Persona Path: {}", args.persona_path);
    info!("Strip Newlines: {}", args.strip_newlines);
    info!("Verbose Errors: {}", args.verbose_errors);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let agent = Arc::new(ChatAgent::from_args(&args)?);
    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, agent, args);
    server.run().await?;

    Ok(())
}
