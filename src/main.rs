// SPDX-License-Identifier: MIT

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use oracle_choice::oracle::storage::{MemoryStore, SessionStore, SqliteStore};
use oracle_choice::oracle::{server, ChatRequest, OracleAgent, Settings};

use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML settings file, overlaid by environment variables
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Bind host (defaults to settings)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (defaults to settings)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Ask a single question and print the reply
    Ask {
        /// The question
        #[arg(short, long)]
        message: String,

        /// Continue an existing session
        #[arg(short, long)]
        session: Option<String>,

        /// Always draw a reading
        #[arg(long)]
        force_divination: bool,

        /// Keep the turn in memory instead of the database
        #[arg(long)]
        ephemeral: bool,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },
}

async fn build_agent(settings: &Settings, ephemeral: bool) -> anyhow::Result<OracleAgent> {
    let registry = settings.build_registry().await;
    if registry.providers().await.is_empty() {
        log::warn!("No provider configured; replies will use the built-in rules");
    }
    let client = Arc::new(settings.completion_client(registry));

    let storage: Arc<dyn SessionStore> = if ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(
            SqliteStore::open(&settings.storage.db_path)
                .with_context(|| format!("opening {}", settings.storage.db_path.display()))?,
        )
    };

    Ok(OracleAgent::new(
        client,
        storage,
        settings.storage.history_limit,
    )?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let mut settings = Settings::load(args.config.as_deref())?;

    match args.command {
        Commands::Serve { host, port } => {
            // Prints tower-http request spans; log records stay with env_logger
            if let Err(e) =
                tracing::subscriber::set_global_default(tracing_subscriber::fmt().finish())
            {
                log::warn!("Request tracing disabled: {}", e);
            }

            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }

            let agent = Arc::new(build_agent(&settings, false).await?);
            server::serve(&settings.bind_addr(), agent)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
        }
        Commands::Ask {
            message,
            session,
            force_divination,
            ephemeral,
            json,
        } => {
            let agent = build_agent(&settings, ephemeral).await?;

            let mut request = ChatRequest::new(message).with_force_divination(force_divination);
            if let Some(session) = session {
                request = request.with_session(session);
            }

            let response = agent.chat(request).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("[{}] {}", response.tool, response.message);
                if !response.reading.verdict.is_empty() {
                    println!("Verdict: {}", response.reading.verdict);
                    for item in &response.reading.advice {
                        println!("  - {}", item);
                    }
                }
                println!("Session: {}", response.session_id);
            }
        }
    }

    Ok(())
}
