//! # Lore CLI Application
//!
//! Command-line access to site discovery and retrieval.
//!
//! - `discover`: Crawl a site and print the discovered URL tree
//! - `retrieve`: Semantic retrieval against a libsql index with Gemini embeddings
//! - `lookup`: Lexical retrieval against the same index, no embeddings needed

mod telemetry;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use clap::{Args, Parser, Subcommand};
use lore::crawler::{cancel_pair, CrawlOptions, Crawler, UrlNode};
use lore::index::Database;
use lore::model::RigEmbeddingClient;
use lore::retrieval::{
    DeterministicRetriever, RetrieveRequest, RetrieveResult, Retriever, ScriptLanguageDetector,
};
use tracing::{info, instrument, warn};

#[derive(Parser)]
#[command(author, version, about = "Document discovery and retrieval for multi-tenant chatbots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Discover the pages of a website
    Discover(DiscoverArgs),

    /// Retrieve chunks for a query with embeddings
    Retrieve(RetrieveArgs),

    /// Retrieve chunks for a query by text match
    Lookup(LookupArgs),
}

#[derive(Args, Debug)]
struct DiscoverArgs {
    /// Base URL to start from
    #[arg(required = true)]
    url: String,

    /// Maximum crawl depth
    #[arg(short, long, default_value_t = lore::crawler::DEFAULT_MAX_DEPTH)]
    depth: u32,

    /// Only discover paths under this prefix (defaults to the base URL path)
    #[arg(long)]
    prefix: Option<String>,

    /// Do not seed the crawl from sitemap.xml
    #[arg(long)]
    no_sitemap: bool,

    /// Pause between requests in milliseconds
    #[arg(short, long, default_value_t = lore::crawler::DEFAULT_DELAY_MS)]
    rate: u64,

    /// Per-request timeout in milliseconds
    #[arg(short, long, default_value_t = lore::crawler::DEFAULT_TIMEOUT_MS)]
    timeout: u64,

    /// Maximum number of pages to discover
    #[arg(short = 'p', long, default_value_t = lore::crawler::DEFAULT_MAX_PAGES)]
    max_pages: usize,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Save the result as JSON to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RetrieveArgs {
    /// Query text
    #[arg(required = true)]
    query: String,

    /// Team the bot belongs to
    #[arg(long)]
    team: String,

    /// Bot whose documents are searched
    #[arg(long)]
    bot: String,

    /// Conversation whose pinned chunks are used and updated
    #[arg(short, long)]
    conversation: Option<String>,

    /// Preferred languages, most preferred first (repeatable)
    #[arg(short, long = "lang")]
    languages: Vec<String>,

    /// Number of fresh chunks
    #[arg(short = 'k', long, default_value_t = lore::retrieval::DEFAULT_TOP_K)]
    top_k: usize,

    /// Maximum pinned chunks per conversation
    #[arg(long, default_value_t = lore::retrieval::DEFAULT_PIN_LIMIT)]
    pin_limit: usize,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Database path
    #[arg(long, default_value = "index.db")]
    database: PathBuf,
}

#[derive(Args, Debug)]
struct LookupArgs {
    /// Query text
    #[arg(required = true)]
    query: String,

    /// Team the bot belongs to
    #[arg(long)]
    team: String,

    /// Bot whose documents are searched
    #[arg(long)]
    bot: String,

    /// Number of matches
    #[arg(short = 'k', long, default_value_t = lore::retrieval::DEFAULT_LEXICAL_TOP_K)]
    top_k: usize,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Database path
    #[arg(long, default_value = "index.db")]
    database: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _otel = telemetry::init_tracing_subscriber()?;

    match cli.command {
        Some(Commands::Discover(args)) => {
            discover_command(args).await?;
        }
        Some(Commands::Retrieve(args)) => {
            retrieve_command(args).await?;
        }
        Some(Commands::Lookup(args)) => {
            lookup_command(args).await?;
        }
        None => {
            // If no command is provided, show help
            let _ = Cli::parse_from(["lore", "--help"]);
        }
    }

    Ok(())
}

#[instrument]
async fn discover_command(args: DiscoverArgs) -> anyhow::Result<()> {
    let mut builder = CrawlOptions::builder(&args.url)
        .max_depth(args.depth)
        .use_sitemap(!args.no_sitemap)
        .delay_ms(args.rate)
        .timeout_ms(args.timeout)
        .max_pages(args.max_pages);
    if let Some(prefix) = &args.prefix {
        builder = builder.allow_path_prefix(prefix);
    }
    let options = builder.build();

    let crawler = Crawler::with_http(&options)?;
    let (trigger, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, returning the pages discovered so far");
            trigger.cancel();
        }
    });

    eprintln!("Discovering {}...", options.base_url);
    let result = crawler.discover_with_cancel(options, signal).await?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => {
            print_tree(&result.root, 0);
            println!();
            println!("Discovered {} pages", result.total);
            if !result.errors.is_empty() {
                println!("Errors:");
                for error in &result.errors {
                    println!("  {}", error);
                }
            }
        }
    }

    if let Some(output_file) = args.output {
        let json = serde_json::to_string_pretty(&result)?;
        tokio::fs::write(&output_file, json).await?;
        info!("Saved discovery result to {}", output_file.display());
    }

    Ok(())
}

fn print_tree(node: &UrlNode, indent: usize) {
    match &node.title {
        Some(title) => println!("{}{} ({})", "  ".repeat(indent), node.url, title),
        None => println!("{}{}", "  ".repeat(indent), node.url),
    }
    for child in &node.children {
        print_tree(child, indent + 1);
    }
}

#[instrument]
async fn retrieve_command(args: RetrieveArgs) -> anyhow::Result<()> {
    let db = Arc::new(open_database(&args.database).await?);
    let embedder = RigEmbeddingClient::new_gemini_from_env()?;

    let retriever = Retriever::new(
        Arc::new(embedder),
        db.clone(),
        Arc::new(ScriptLanguageDetector::new()),
        db.clone(),
        db,
    );

    let mut builder = RetrieveRequest::builder(&args.team, &args.bot, &args.query)
        .top_k(args.top_k)
        .pin_limit(args.pin_limit);
    if let Some(conversation) = &args.conversation {
        builder = builder.conversation_id(conversation);
    }
    if !args.languages.is_empty() {
        builder = builder.preferred_languages(args.languages.iter().cloned());
    }

    let result = retriever.retrieve(&builder.build()).await?;
    print_result(&result, &args.format)
}

#[instrument]
async fn lookup_command(args: LookupArgs) -> anyhow::Result<()> {
    let db = Arc::new(open_database(&args.database).await?);
    let retriever = DeterministicRetriever::new(db);

    let result = retriever
        .retrieve(&args.team, &args.bot, &args.query, Some(args.top_k))
        .await?;
    print_result(&result, &args.format)
}

async fn open_database(path: &Path) -> anyhow::Result<Database> {
    let path = path
        .to_str()
        .ok_or_else(|| anyhow!("Database path is not valid UTF-8: {}", path.display()))?;
    Ok(Database::new_from_path(path).await?)
}

fn print_result(result: &RetrieveResult, format: &str) -> anyhow::Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(result)?),
        _ => {
            println!("Found {} chunks", result.chunks.len());
            for (i, chunk) in result.chunks.iter().enumerate() {
                let score = chunk
                    .similarity
                    .map(|s| format!("{:.3}", s))
                    .unwrap_or_else(|| "pinned".to_string());
                println!(
                    "{}. [{}] {}",
                    i + 1,
                    score,
                    chunk.canonical_url.as_deref().unwrap_or(&chunk.document_id)
                );
                println!("   {}", chunk.content);
                println!();
            }
            if !result.pinned_chunk_ids.is_empty() {
                println!("Pinned: {}", result.pinned_chunk_ids.join(", "));
            }
        }
    }
    Ok(())
}
