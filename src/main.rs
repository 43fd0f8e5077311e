//! # Mandate knowledge base CLI (`kb`)
//!
//! ## Usage
//!
//! ```bash
//! kb --config ./config/kb.toml <command>
//! ```
//!
//! Without `--config` every setting takes its default: built-in corpus,
//! local hashing embeddings, template replies only.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kb ask "<question>"` | Load content and answer a single question |
//! | `kb chat` | Interactive conversation on stdin |
//! | `kb documents` | List the chunks the knowledge base would hold |
//! | `kb sources` | List configured connectors |
//! | `kb serve` | Start the HTTP chat server with scheduled refresh |
//!
//! ## Examples
//!
//! ```bash
//! kb ask "What does the mandate say about land?"
//! kb chat --config ./config/kb.toml
//! kb serve --config ./config/kb.toml
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use mandate_kb::assistant::Assistant;
use mandate_kb::config::{self, Config};
use mandate_kb::logging::init_logging;
use mandate_kb::server::run_server;

#[derive(Parser)]
#[command(
    name = "kb",
    about = "Conversational knowledge base for the Khoisan First Nations mandate",
    version,
    long_about = "Answers questions about the Khoisan First Nations mandate from a small corpus of \
    posts, website copy and the mandate text, using semantic retrieval and conversational \
    templates, with optional LLM generation."
)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question and exit.
    Ask {
        /// The question to ask.
        question: String,
    },

    /// Start an interactive conversation. Type `exit` or press Ctrl-D to quit.
    Chat,

    /// List the stored chunks after a content load.
    Documents {
        /// Print full chunk text instead of a preview.
        #[arg(long)]
        full: bool,
    },

    /// List configured connectors.
    Sources,

    /// Start the HTTP chat server.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };
    init_logging(&cfg.logging)?;

    match cli.command {
        Commands::Ask { question } => {
            let assistant = Assistant::start(cfg).await?;
            println!("{}", assistant.respond("cli", &question).await);
        }
        Commands::Chat => {
            let assistant = Assistant::start(cfg).await?;
            run_chat(&assistant).await?;
        }
        Commands::Documents { full } => {
            let assistant = Assistant::start(cfg).await?;
            print_documents(&assistant, full);
        }
        Commands::Sources => {
            let assistant = Assistant::builder(cfg).build()?;
            println!("{:<28} DESCRIPTION", "CONNECTOR");
            for c in assistant.connectors().connectors() {
                println!("{:<28} {}", c.label(), c.description());
            }
        }
        Commands::Serve => {
            let assistant = Arc::new(Assistant::start(cfg.clone()).await?);
            run_server(&cfg, assistant).await?;
        }
    }

    Ok(())
}

async fn run_chat(assistant: &Assistant) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Ask about the Khoisan mandate. Type 'exit' to quit.");
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }
        if line.is_empty() {
            continue;
        }
        println!("{}\n", assistant.respond("cli", line).await);
    }
    Ok(())
}

fn print_documents(assistant: &Assistant, full: bool) {
    let docs = assistant.documents();
    for doc in &docs {
        let text = if full {
            doc.text.clone()
        } else {
            preview(&doc.text, 80)
        };
        let marker = if doc.is_embedded() { "" } else { " [no vector]" };
        println!("{}  {}{}\n    {}", doc.id, doc.source, marker, text);
    }
    println!("{} documents", docs.len());
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &flat[..idx]),
        None => flat,
    }
}
