use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use log::{error, info};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use acme_nexus::chunking::{ChunkerConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use acme_nexus::document::{CorpusPaths, DEFAULT_SPREADSHEET_FILE, DEFAULT_TEXT_FILE};
use acme_nexus::gemini::{GeminiClient, GeminiConfig};
use acme_nexus::prompt::PromptTemplate;
use acme_nexus::rag::{RagSettings, RagSystem};
use acme_nexus::retriever::DEFAULT_TOP_K;
use acme_nexus::session::{run_query_loop, Session};

/// Acme Nexus: ask questions about the company corpus, answered by Gemini
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory holding the corpus files [default: directory of this executable]
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Plain-text corpus file name
    #[arg(long, default_value = DEFAULT_TEXT_FILE)]
    text_file: String,

    /// Spreadsheet corpus file name (xlsx, xls, ods, csv or tsv)
    #[arg(long, default_value = DEFAULT_SPREADSHEET_FILE)]
    spreadsheet: String,

    /// Number of chunks retrieved per question
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// Chunk window size in characters
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
    chunk_overlap: usize,

    /// Timeout for each API request; unlimited when omitted
    #[arg(long)]
    request_timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    let data_dir = match args.data_dir {
        Some(dir) => dir,
        None => install_dir().context("Failed to locate the executable's directory")?,
    };
    let paths = CorpusPaths::in_dir(&data_dir, &args.text_file, &args.spreadsheet);
    info!("Using corpus in {}", data_dir.display());

    let settings = RagSettings {
        chunker: ChunkerConfig::new(args.chunk_size, args.chunk_overlap)?,
        top_k: args.top_k,
        template: PromptTemplate::default(),
    };

    let gemini_config = GeminiConfig::from_env()
        .with_request_timeout(args.request_timeout_secs.map(Duration::from_secs));
    let gemini = GeminiClient::new(gemini_config).context("Failed to initialize Gemini client")?;

    info!(
        "Embedding model {}, chat model {}",
        gemini.config().embedding_model,
        gemini.config().chat_model
    );

    println!("Connecting to Nexus Core...");
    let system = match RagSystem::initialize(&paths, settings, gemini.clone(), gemini).await {
        Ok(system) => system,
        Err(e) => {
            error!("Nexus Setup Failed: {}", e);
            return Err(e).context("Nexus Setup Failed");
        }
    };
    info!("Indexed {} chunks", system.retriever().index().len());

    // Enter interactive Q&A loop
    let mut session = Session::new();
    let stdin = io::stdin();
    run_query_loop(&system, &mut session, stdin.lock(), io::stdout())
        .await
        .context("Error in query loop")?;

    Ok(())
}

fn install_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    exe.parent()
        .map(|dir| dir.to_path_buf())
        .context("Executable has no parent directory")
}
