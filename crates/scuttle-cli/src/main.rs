//! Scuttle - conversational ticket-support agent
//!
//! Thin front-end over `scuttle-core`: wires the classifier, ticket
//! store, and session store together and streams agent events as
//! line-delimited JSON on stdout. Logs go to stderr so the event stream
//! stays machine-readable.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

use scuttle_core::agent::{AgentOrchestrator, HandleRequest};
use scuttle_core::classify::{
    route, ModelClassifier, ModelClassifierConfig, ReferenceDataset, RetryConfig,
    RetryingClassifier,
};
use scuttle_core::constants;
use scuttle_core::storage::{Database, SessionStore};
use scuttle_core::tickets::{MemoryTicketStore, NewTicket, TicketStatus};

/// Scuttle - ticket classification and agent core
#[derive(Parser)]
#[command(name = "scuttle")]
#[command(about = "Conversational ticket-support agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// User id to act as
    #[arg(short, long, default_value = "local")]
    user: String,

    /// Model id for the classification call
    #[arg(short, long)]
    model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message to the agent and stream the events
    Chat {
        message: String,

        /// Continue an existing session
        #[arg(long)]
        session: Option<String>,

        /// Seed a couple of demo tickets into the in-memory store
        #[arg(long)]
        seed: bool,
    },

    /// Classify a piece of text through the full pipeline
    Classify {
        text: String,

        /// Optional CSV of reference examples (category,text)
        #[arg(long)]
        dataset: Option<PathBuf>,
    },

    /// List your chat sessions
    Sessions,

    /// Show the messages of a session
    Messages { session_id: String },

    /// Delete a session and its messages
    DeleteSession { session_id: String },
}

fn data_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    Ok(home.join(constants::cli::CONFIG_DIR_NAME))
}

fn open_session_store() -> Result<SessionStore> {
    let db = Database::new(&data_dir()?.join("scuttle.db"))?;
    Ok(SessionStore::new(db))
}

fn build_classifier(model: Option<String>, dataset: Option<PathBuf>) -> Result<Arc<RetryingClassifier>> {
    let config = ModelClassifierConfig {
        model: model.unwrap_or_else(|| constants::classify::DEFAULT_MODEL.to_string()),
        ..ModelClassifierConfig::default()
    };
    // Without a key every model call fails fast and the keyword fallback
    // takes over, which keeps the pipeline usable offline.
    let api_key = std::env::var("SCUTTLE_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .unwrap_or_default();

    let mut model_classifier = ModelClassifier::new(config, api_key);
    if let Some(path) = dataset {
        model_classifier = model_classifier.with_dataset(ReferenceDataset::from_csv(&path)?);
    }

    Ok(Arc::new(RetryingClassifier::new(
        Arc::new(model_classifier),
        RetryConfig::default(),
    )))
}

fn seed_demo_tickets(store: &MemoryTicketStore, user: &str) {
    use chrono::{Duration, Utc};
    use scuttle_core::classify::Category;

    store.seed(
        NewTicket {
            user_id: user.to_string(),
            message: "The app crashes with an error every time I log in".to_string(),
            category: Category::Technical,
            assigned_team: route(Category::Technical),
            confidence: 0.9,
            expected_resolution: Utc::now() + Duration::hours(8),
        },
        TicketStatus::Pending,
    );
    store.seed(
        NewTicket {
            user_id: user.to_string(),
            message: "I was charged twice for my subscription".to_string(),
            category: Category::Billing,
            assigned_team: route(Category::Billing),
            confidence: 0.85,
            expected_resolution: Utc::now() + Duration::hours(4),
        },
        TicketStatus::Resolved,
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scuttle=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Chat { message, session, seed } => {
            let sessions = Arc::new(open_session_store()?);
            let tickets = Arc::new(MemoryTicketStore::new());
            if seed {
                seed_demo_tickets(&tickets, &cli.user);
            }
            let classifier = build_classifier(cli.model, None)?;
            let orchestrator = Arc::new(AgentOrchestrator::new(sessions, tickets, classifier));

            tracing::info!(user = %cli.user, "starting chat turn");
            let mut stream = orchestrator.handle(HandleRequest {
                session_id: session,
                user_id: cli.user,
                text: message,
            });
            while let Some(event) = stream.next().await {
                println!("{}", serde_json::to_string(&event)?);
            }
        }

        Commands::Classify { text, dataset } => {
            let classifier = build_classifier(cli.model, dataset)?;
            let result = classifier.classify(&text).await;
            let team = route(result.category);
            println!(
                "{}",
                serde_json::json!({
                    "label": result.category,
                    "confidence": result.confidence,
                    "source": result.source,
                    "assigned_team": team,
                })
            );
        }

        Commands::Sessions => {
            let sessions = open_session_store()?;
            for session in sessions.list_sessions(&cli.user)? {
                println!(
                    "{}  {:<40}  {} messages  updated {}",
                    session.id,
                    session.title,
                    session.message_count,
                    session.updated_at.format("%Y-%m-%d %H:%M")
                );
            }
        }

        Commands::Messages { session_id } => {
            let sessions = open_session_store()?;
            for message in sessions.list_messages(&session_id)? {
                let action = message
                    .action_performed
                    .map(|a| format!("  [{a}]"))
                    .unwrap_or_default();
                println!("{:>9}: {}{}", message.role.as_str(), message.content, action);
            }
        }

        Commands::DeleteSession { session_id } => {
            let sessions = open_session_store()?;
            sessions.delete_session(&session_id)?;
            println!("deleted {session_id}");
        }
    }

    Ok(())
}
