//! parley — command-line front end for a Zep-compatible conversational memory service
//!
//! # Subcommands
//! - `health`                                   — probe the service health endpoint
//! - `user create|get`                          — manage users
//! - `session create|list`                      — open and list conversations
//! - `message add <session> --role --content`   — append one message
//! - `context <session> [-n N] [--json]`        — recent messages and relevant facts
//! - `summary <session> [--json]`               — derived conversation summary
//! - `search <user> <query> [-n N] [--json]`    — service-side conversation search
//! - `smoke`                                    — end-to-end smoke test
//! - `demo`                                     — conversation database walkthrough
//! - `chat [--auto]`                            — interactive chat backed by the service

mod chat;
mod flows;

use clap::{Parser, Subcommand};
use parley_core::models::Metadata;
use parley_core::{
    ConversationClient, MessageInput, NewUser, ParleyConfig, ParleyError, DEFAULT_LAST_N,
};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "parley",
    version,
    about = "Drive a conversational memory service from the terminal"
)]
struct Cli {
    /// Path to the TOML config file (optional)
    #[arg(short, long, default_value = "parley.toml")]
    config: String,

    /// Memory service base URL, e.g. http://localhost:8000/api/v2
    #[arg(long, env = "PARLEY_BASE_URL")]
    base_url: Option<String>,

    /// API key sent as `Authorization: Api-Key <key>`
    #[arg(long, env = "PARLEY_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check that the memory service is up
    Health,

    /// Create or look up users
    User {
        #[command(subcommand)]
        action: UserCommand,
    },

    /// Create or list conversation sessions
    Session {
        #[command(subcommand)]
        action: SessionCommand,
    },

    /// Append messages to a session
    Message {
        #[command(subcommand)]
        action: MessageCommand,
    },

    /// Show recent messages and relevant facts for a session
    Context {
        session_id: String,

        /// Number of most recent messages to fetch
        #[arg(short = 'n', long, default_value_t = DEFAULT_LAST_N)]
        last_n: u32,

        /// Print the raw snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarise a session
    Summary {
        session_id: String,

        #[arg(long)]
        json: bool,
    },

    /// Search a user's conversations (requires service search support)
    Search {
        user_id: String,
        query: String,

        /// Maximum number of hits
        #[arg(short = 'n', long)]
        limit: Option<u32>,

        #[arg(long)]
        json: bool,
    },

    /// Run the end-to-end smoke test
    Smoke,

    /// Walk through using the service as a conversation database
    Demo,

    /// Chat with a canned assistant, storing every turn in the service
    Chat {
        /// User to log in as (created if missing)
        #[arg(long)]
        user_id: Option<String>,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        /// Run the scripted support conversation instead of reading stdin
        #[arg(long)]
        auto: bool,
    },
}

#[derive(Debug, Subcommand)]
enum UserCommand {
    /// Create a user
    Create {
        user_id: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        /// Metadata entry, repeatable
        #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_meta)]
        meta: Vec<(String, String)>,
    },

    /// Fetch a user
    Get { user_id: String },
}

#[derive(Debug, Subcommand)]
enum SessionCommand {
    /// Create a session; prints the session id
    Create {
        user_id: String,
        /// Session id (generated when omitted)
        #[arg(long)]
        session_id: Option<String>,
        #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_meta)]
        meta: Vec<(String, String)>,
    },

    /// List a user's sessions
    List {
        user_id: String,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
enum MessageCommand {
    /// Append a single message
    Add {
        session_id: String,
        #[arg(long, default_value = "user")]
        role: String,
        #[arg(long)]
        content: String,
        #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_meta)]
        meta: Vec<(String, String)>,
    },
}

/// Parse a `key=value` metadata argument.
fn parse_meta(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

fn to_metadata(pairs: Vec<(String, String)>) -> Metadata {
    pairs
        .into_iter()
        .map(|(k, v)| (k, serde_json::Value::String(v)))
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Command dispatch
// ============================================================================

async fn run(client: ConversationClient, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Health => {
            client.health().await?;
            println!("✅ Memory service is healthy");
        }

        Commands::User { action } => match action {
            UserCommand::Create {
                user_id,
                email,
                first_name,
                last_name,
                meta,
            } => {
                let new_user = NewUser {
                    user_id,
                    email,
                    first_name,
                    last_name,
                    metadata: to_metadata(meta),
                };
                let user = client.create_user(&new_user).await?;
                println!("✅ User created: {}", user.user_id);
            }
            UserCommand::Get { user_id } => {
                let user = client.get_user(&user_id).await?;
                print_json(&user)?;
            }
        },

        Commands::Session { action } => match action {
            SessionCommand::Create {
                user_id,
                session_id,
                meta,
            } => {
                let id = client
                    .create_session(&user_id, session_id.as_deref(), Some(to_metadata(meta)))
                    .await?;
                println!("{}", id);
            }
            SessionCommand::List { user_id, json } => {
                let sessions = client.get_user_sessions(&user_id).await?;
                if json {
                    return print_json(&sessions);
                }
                if sessions.is_empty() {
                    eprintln!("No sessions found for {}", user_id);
                }
                for s in &sessions {
                    println!(
                        "{}  {}  ({})",
                        s.session_id,
                        s.metadata_str("topic").unwrap_or("No topic"),
                        s.created_at.as_deref().unwrap_or("unknown date")
                    );
                }
            }
        },

        Commands::Message { action } => match action {
            MessageCommand::Add {
                session_id,
                role,
                content,
                meta,
            } => {
                let mut message = MessageInput::new(role.as_str(), content)
                    .with_timestamp(client.clock().now());
                message.metadata.extend(to_metadata(meta));
                client.add_message(&session_id, message).await?;
                println!("✅ Message added to {}", session_id);
            }
        },

        Commands::Context {
            session_id,
            last_n,
            json,
        } => {
            let snapshot = client.get_context(&session_id, last_n).await?;
            if json {
                return print_json(&snapshot);
            }
            println!("📝 Messages: {}", snapshot.message_count());
            for m in &snapshot.messages {
                println!("  [{}] {}", m.speaker().to_uppercase(), m.content);
            }
            println!("🧠 Facts: {}", snapshot.relevant_facts.len());
            for f in &snapshot.relevant_facts {
                println!("  - {}", f.fact);
            }
            if let Some(context) = snapshot.context.as_deref().filter(|c| !c.is_empty()) {
                println!("📄 Context: {}", context);
            }
        }

        Commands::Summary { session_id, json } => {
            let summary = client.get_conversation_summary(&session_id).await?;
            if json {
                return print_json(&summary);
            }
            println!("📊 Conversation Summary:");
            println!("   - Session ID:    {}", summary.session_id);
            println!("   - Message count: {}", summary.message_count);
            println!("   - Facts:         {}", summary.relevant_facts.len());
            println!("   - Retrieved at:  {}", summary.retrieved_at.to_rfc3339());
        }

        Commands::Search {
            user_id,
            query,
            limit,
            json,
        } => {
            let hits = client.search_sessions(&user_id, &query, limit).await?;
            if json {
                return print_json(&hits);
            }
            if hits.is_empty() {
                eprintln!("No results found for: {}", query);
            }
            for hit in &hits {
                let text = hit
                    .fact
                    .as_ref()
                    .map(|f| f.fact.as_str())
                    .or_else(|| hit.message.as_ref().map(|m| m.content.as_str()))
                    .unwrap_or("");
                println!(
                    "{}  {:.2}  {}",
                    hit.session_id.as_deref().unwrap_or("?"),
                    hit.score.unwrap_or_default(),
                    text
                );
            }
        }

        Commands::Smoke => flows::run_smoke(&client).await?,

        Commands::Demo => flows::run_demo(&client).await?,

        Commands::Chat {
            user_id,
            name,
            email,
            auto,
        } => {
            if auto {
                chat::run_automated(client).await?;
            } else {
                chat::run_interactive(client, user_id, name, email).await?;
            }
        }
    }

    Ok(())
}

fn build_client(cli: &Cli) -> Result<(ConversationClient, ParleyConfig), ParleyError> {
    let mut config = ParleyConfig::load(&cli.config)?;
    if let Some(url) = &cli.base_url {
        config.service.base_url = url.clone();
    }
    if let Some(key) = &cli.api_key {
        config.service.api_key = key.clone();
    }
    let client = ConversationClient::new(config.service.clone())?;
    Ok((client, config))
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let (client, config) = match build_client(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("parley: {}", e);
            std::process::exit(1);
        }
    };

    // Logs go to stderr so command output stays pipeable
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(base_url = %client.base_url(), "Client configured");

    if let Err(e) = run(client, cli.command).await {
        eprintln!("parley: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
