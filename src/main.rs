use std::path::Path;

use clap::{Parser, Subcommand};
use console::style;
use time::{macros::format_description, OffsetDateTime};
use tracing_subscriber::EnvFilter;

use arbor_bot::domains::answer::AnswerRequest;
use arbor_bot::{ArborBot, Config, Result};

#[derive(Parser, Debug)]
#[command(name = "arbor-bot")]
#[command(about = "Arbor Bot CLI (knowledge graph / FAQ / RAG answer cascade)")]
struct Cli {
    #[arg(long, default_value = "./arbor-bot.json")]
    config: String,

    #[arg(long, default_value = "cli_user", env = "ARBOR_BOT_USER")]
    user_id: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question through the answer cascade
    Ask {
        question: String,
        #[arg(long)]
        session: Option<String>,
        #[arg(long)]
        workflow: Option<i32>,
    },
    /// Create a new chat session
    NewSession {
        #[arg(long, default_value = "New Chat")]
        title: String,
        #[arg(long, default_value = "General")]
        category: String,
    },
    /// List active sessions for the user
    Sessions,
    /// Replay the messages of a session in chronological order
    Messages { session: String },
    /// Hard-delete every message in a session
    ClearMessages { session: String },
    /// Soft-delete a session
    DeleteSession { session: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let bot = if Path::new(&cli.config).exists() {
        ArborBot::from_config_path(&cli.config).await?
    } else {
        ArborBot::from_config(Config::default()).await?
    };

    match cli.command {
        Commands::Ask {
            question,
            session,
            workflow,
        } => {
            let request = AnswerRequest {
                question,
                session_id: session,
                user_id: Some(cli.user_id),
                workflow_id: workflow,
            };
            let envelope = bot.ask(request).await?;
            let rendered = serde_json::to_string_pretty(&envelope)
                .map_err(|e| arbor_bot::ArborBotError::Serialization(e.to_string()))?;
            println!("{rendered}");
        }
        Commands::NewSession { title, category } => {
            let session = bot.create_session(&cli.user_id, &title, &category).await?;
            println!(
                "{} {}",
                style("created").green(),
                style(&session.session_id).bold()
            );
        }
        Commands::Sessions => {
            let sessions = bot.list_sessions(&cli.user_id).await?;
            if sessions.is_empty() {
                println!("{}", style("no active sessions").dim());
            }
            for session in sessions {
                println!(
                    "{}  {}  [{}]  {} messages  updated {}",
                    style(&session.session_id).bold(),
                    session.title,
                    session.category,
                    session.total_messages,
                    format_timestamp(session.updated_at)
                );
            }
        }
        Commands::Messages { session } => {
            let messages = bot.get_messages(&session).await?;
            for message in messages {
                println!(
                    "[{}] {} {}",
                    format_timestamp(message.timestamp),
                    style("Q:").cyan(),
                    message.question
                );
                match message.answer {
                    Some(answer) => println!(
                        "        {} ({}) {}",
                        style("A:").green(),
                        message.source.as_str(),
                        answer
                    ),
                    None => println!("        {}", style("A: <pending>").dim()),
                }
            }
        }
        Commands::ClearMessages { session } => {
            let cleared = bot.clear_messages(&session).await?;
            println!("{} {cleared} messages", style("cleared").yellow());
        }
        Commands::DeleteSession { session } => {
            bot.delete_session(&session).await?;
            println!("{} {session}", style("deleted").yellow());
        }
    }

    Ok(())
}

const TIMESTAMP_FORMAT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

fn format_timestamp(ts: i64) -> String {
    OffsetDateTime::from_unix_timestamp(ts)
        .ok()
        .and_then(|dt| dt.format(TIMESTAMP_FORMAT).ok())
        .unwrap_or_else(|| ts.to_string())
}
