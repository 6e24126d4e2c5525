use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use mellow::config::Config;
use mellow::service::{FeedbackSubmission, ModerationService, ServiceError};

/// Mellow: classify messages as neutral, offensive, or toxic.
///
/// Flags the words and emoji behind each verdict, proposes a kinder
/// rewrite, and keeps a durable history of classifications and corrections.
#[derive(Parser)]
#[command(name = "mellow", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare storage and report which backends are active
    Init,

    /// Classify a single message and store the result
    Classify {
        /// The message to classify
        text: String,
    },

    /// Classify every line of a .txt or .csv file
    Batch {
        /// Path to the input file
        file: PathBuf,
    },

    /// Record a correction for a previous classification
    Feedback {
        /// The text that was classified
        #[arg(long)]
        text: String,

        /// The correct classification (neutral, offensive, toxic)
        #[arg(long)]
        correct: String,

        /// The classification mellow gave originally
        #[arg(long)]
        original: Option<String>,

        /// Optional free-form comment
        #[arg(long)]
        comment: Option<String>,
    },

    /// Show stored classifications (or feedback), newest first
    History {
        /// Show feedback instead of classifications
        #[arg(long)]
        feedback: bool,

        /// Maximum number of records to show (default: 20)
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Delete all stored classifications
    ClearHistory,

    /// Show system status (storage backend, scorer, record counts)
    Status,

    /// Download the ONNX toxicity model (~126 MB)
    DownloadModel,

    /// Start the JSON API server
    #[cfg(feature = "web")]
    Serve {
        /// Port to listen on (default: 5000, or $PORT if set)
        #[arg(long)]
        port: Option<u16>,

        /// Address to bind (default: 127.0.0.1)
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mellow=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Init => {
            info!("Initializing mellow storage...");
            let service = ModerationService::start(&config).await?;
            println!("Storage mode: {}", service.gateway().mode());
            println!("Fallback directory: {}", config.storage.data_dir.display());
            println!("\nMellow is ready. Optional next steps:");
            println!("  - set DATABASE_URL in .env to use PostgreSQL");
            println!("  - run `mellow download-model` for model-based scoring");
        }

        Commands::Classify { text } => {
            let service = ModerationService::start(&config).await?;
            let record = service.classify(&text).await.map_err(into_anyhow)?;
            mellow::output::terminal::display_classification(&record);
        }

        Commands::Batch { file } => {
            let service = ModerationService::start(&config).await?;
            println!("Classifying lines from {}...", file.display());
            let outcome = service.classify_file(&file).await.map_err(into_anyhow)?;
            mellow::output::terminal::display_batch(&outcome);
        }

        Commands::Feedback {
            text,
            correct,
            original,
            comment,
        } => {
            let service = ModerationService::start(&config).await?;
            let submission = FeedbackSubmission {
                original_text: Some(text),
                original_classification: original,
                correct_classification: Some(correct),
                comment,
            };
            let record = service
                .submit_feedback(submission)
                .await
                .map_err(into_anyhow)?;
            println!(
                "{} Feedback recorded: {}",
                "✓".green(),
                record.corrected_classification
            );
        }

        Commands::History { feedback, limit } => {
            let service = ModerationService::start(&config).await?;
            if feedback {
                let mut records = service.list_feedback().await.map_err(into_anyhow)?;
                records.truncate(limit);
                mellow::output::terminal::display_feedback(&records);
            } else {
                let mut records = service.list_history().await;
                records.truncate(limit);
                mellow::output::terminal::display_history(&records);
            }
        }

        Commands::ClearHistory => {
            let service = ModerationService::start(&config).await?;
            let outcome = service.clear_history().await.map_err(into_anyhow)?;
            match outcome.deleted_count() {
                Some(n) => println!("{} History cleared ({n} records deleted)", "✓".green()),
                None => println!(
                    "{} History clear could not be confirmed; check the data directory",
                    "!".yellow()
                ),
            }
        }

        Commands::Status => {
            let service = ModerationService::start(&config).await?;
            mellow::status::show(&service, &config).await?;
        }

        Commands::DownloadModel => {
            let model_dir = &config.model_dir;

            println!("Downloading ONNX model...");
            println!("  Destination: {}", model_dir.display());

            mellow::toxicity::download::download_model(model_dir).await?;

            println!("\n{}", "Model downloaded successfully.".bold());
            println!("Set MELLOW_SCORER=onnx (the default) to use it.");
        }

        #[cfg(feature = "web")]
        Commands::Serve { port, bind } => {
            // Platforms like Railway/Render inject PORT; --port overrides it.
            let port = port
                .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
                .unwrap_or(5000);
            let service = ModerationService::start(&config).await?;
            mellow::web::run_server(std::sync::Arc::new(service), port, &bind).await?;
        }
    }

    Ok(())
}

/// Service errors carry their own user-facing message; surface it as-is.
fn into_anyhow(e: ServiceError) -> anyhow::Error {
    match e {
        ServiceError::Internal(e) => e,
        other => anyhow::anyhow!(other.to_string()),
    }
}
