//! # AiTa CLI (`aita`)
//!
//! The `aita` binary serves the classroom question gate over HTTP and offers
//! the same gate, the audit log, and the document corpus from the command
//! line.
//!
//! ## Usage
//!
//! ```bash
//! aita --config ./config/aita.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `aita serve` | Start the HTTP server (`POST /ask`, `GET /unknowns`) |
//! | `aita ask "<question>"` | Run one question through the gate |
//! | `aita unknowns` | Print a teacher's deflected questions |
//! | `aita corpus` | List the documents available as context |
//! | `aita check` | Validate the configuration and policy file |
//!
//! ## Examples
//!
//! ```bash
//! # Ask as a student of the default teacher
//! aita ask "Do I need goggles for the drill press?"
//!
//! # Ask as a substitute (returns the day plan)
//! aita ask "What are we doing today?" --mode sub
//!
//! # Review what the engineering class could not get answered
//! aita unknowns --teacher engineering
//! ```

use aita::models::{Mode, DEFAULT_TEACHER_ID};
use aita::{audit, config, corpus, gate, logging, policy, server};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// AiTa: a classroom question-answering gateway for a local language model.
#[derive(Parser)]
#[command(
    name = "aita",
    about = "AiTa: a classroom question-answering gateway for a local language model",
    version,
    long_about = "AiTa answers student questions from a teacher's own documents through a locally \
    hosted model. Questions that hit the policy blocklist, have no supporting context, or that the \
    model cannot answer get a fixed fallback reply and are logged for the teacher to review."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/aita.toml`. Server, path, retrieval, and model
    /// settings are read from this file.
    #[arg(long, global = true, default_value = "./config/aita.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Loads the policy (a malformed policy aborts startup), then binds to
    /// `[server].bind` and serves `POST /ask`, `GET /unknowns`, and
    /// `GET /health`.
    Serve,

    /// Run one question through the gate and print the answer.
    Ask {
        /// The question text.
        question: String,

        /// Teacher whose documents and audit log are used.
        #[arg(long, default_value = DEFAULT_TEACHER_ID)]
        teacher: String,

        /// Who is asking.
        #[arg(long, value_enum, default_value_t = AskMode::Student)]
        mode: AskMode,
    },

    /// Print the questions deflected for a teacher.
    Unknowns {
        /// Teacher id.
        #[arg(long, default_value = DEFAULT_TEACHER_ID)]
        teacher: String,
    },

    /// List the documents available as answer context.
    Corpus,

    /// Validate the configuration and policy file.
    Check,
}

#[derive(Clone, Copy, ValueEnum)]
enum AskMode {
    Student,
    Sub,
}

impl From<AskMode> for Mode {
    fn from(mode: AskMode) -> Self {
        match mode {
            AskMode::Student => Mode::Student,
            AskMode::Sub => Mode::Sub,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Ask {
            question,
            teacher,
            mode,
        } => {
            gate::run_ask(&cfg, &question, &teacher, mode.into()).await?;
        }
        Commands::Unknowns { teacher } => {
            audit::print_unknowns(&cfg, &teacher)?;
        }
        Commands::Corpus => {
            corpus::list_corpus(&cfg)?;
        }
        Commands::Check => {
            policy::run_check(&cfg)?;
        }
    }

    Ok(())
}
