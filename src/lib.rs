pub mod cli;
pub mod error;
pub mod forwarder;
pub mod llm;
pub mod models;
pub mod server;
pub mod store;

use cli::Args;
use forwarder::CompletionForwarder;
use log::{ info, warn };
use server::{ AppState, Server };
use std::error::Error;
use std::sync::Arc;
use store::create_conversation_store;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Listen Address: {}:{}", args.host, args.port);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Chat Model: {}", args.chat_model);
    info!("Chat Base URL: {}", args.chat_base_url.as_deref().unwrap_or("provider default"));
    info!("Default Temperature: {}", args.default_temperature);
    if args.chat_timeout_secs > 0 {
        info!("Chat Timeout: {}s", args.chat_timeout_secs);
    } else {
        info!("Chat Timeout: none");
    }
    info!("Store Type: {}", args.store_type);
    info!("-------------------------");
    if args.chat_api_key.is_empty() {
        warn!("No chat API key configured; /chat will fail for providers that require one.");
    }

    let forwarder = Arc::new(CompletionForwarder::from_args(&args)?);
    let store = create_conversation_store(&args)?;

    let server = Server::new(args, AppState { forwarder, store })?;
    server.run().await?;

    Ok(())
}
