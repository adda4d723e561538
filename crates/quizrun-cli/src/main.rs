//! quizrun CLI — timed quizzes in the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "quizrun", version, about = "Timed multiple-choice quizzes with recorded attempts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a timed quiz
    Take {
        /// Quiz id
        #[arg(long)]
        quiz: String,

        /// Subject (learner) id; defaults to the configured subject
        #[arg(long)]
        subject: Option<String>,

        /// Quiz directory or file, overriding the config
        #[arg(long)]
        quiz_dir: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Milliseconds per countdown second
        #[arg(long, default_value = "1000", hide = true)]
        tick_ms: u64,
    },

    /// Show recorded attempts for a quiz
    History {
        /// Quiz id
        #[arg(long)]
        quiz: String,

        /// Subject (learner) id; defaults to the configured subject
        #[arg(long)]
        subject: Option<String>,

        /// Print the history as JSON
        #[arg(long)]
        json: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List available quizzes
    List {
        /// Quiz directory or file, overriding the config
        #[arg(long)]
        quiz_dir: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate quiz TOML files
    Validate {
        /// Path to a quiz file or directory
        #[arg(long)]
        quiz_dir: PathBuf,
    },

    /// Create starter config and example quiz
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("quizrun=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Take {
            quiz,
            subject,
            quiz_dir,
            config,
            tick_ms,
        } => commands::take::execute(quiz, subject, quiz_dir, config, tick_ms).await,
        Commands::History {
            quiz,
            subject,
            json,
            config,
        } => commands::history::execute(quiz, subject, json, config).await,
        Commands::List { quiz_dir, config } => commands::list::execute(quiz_dir, config).await,
        Commands::Validate { quiz_dir } => commands::validate::execute(quiz_dir),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
