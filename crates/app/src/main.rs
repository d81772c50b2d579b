mod config;
mod matching;
mod server;

use chrono::Utc;
use clap::{Parser, Subcommand};
use config::{DatabaseArgs, IndexArgs, ProviderArgs};
use researcher_match_core::{build_http_client, SearchRequest, DEFAULT_TOP_K};
use server::{AppState, ServerSettings};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "researcher-match", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the matching API over HTTP.
    Serve {
        #[command(flatten)]
        providers: ProviderArgs,

        #[command(flatten)]
        database: DatabaseArgs,

        /// Address to listen on
        #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
        bind: SocketAddr,

        /// Allowed CORS origins (comma separated); any origin when empty
        #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
        cors_origin: Vec<String>,

        /// Whole-request deadline, in seconds; derived from the provider
        /// timeout and max top_k when unset
        #[arg(long, env = "REQUEST_TIMEOUT_SECS")]
        request_timeout_secs: Option<u64>,
    },
    /// Run one search and print the explained matches.
    Search {
        #[command(flatten)]
        providers: ProviderArgs,

        /// Consultation category, e.g. "AI"
        #[arg(long)]
        category: String,

        /// Research field, e.g. "NLP"
        #[arg(long)]
        field: String,

        /// Free-text description of the request
        #[arg(long)]
        description: String,

        /// Number of researchers to return
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
    /// Print the fields of one indexed document to diagnose schema mismatch.
    InspectIndex {
        #[command(flatten)]
        index: IndexArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    if let Err(error) = dotenvy::dotenv() {
        if !error.not_found() {
            return Err(error.into());
        }
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "researcher-match boot"
    );

    match cli.command {
        Command::Serve {
            providers,
            database,
            bind,
            cors_origin,
            request_timeout_secs,
        } => {
            let pipeline = providers.build_pipeline()?;
            let options = pipeline.options();
            let request_timeout = server::request_deadline(
                options,
                request_timeout_secs.map(Duration::from_secs),
            )?;
            info!(
                search_index = %providers.index.search_index,
                vector_field = %providers.index.vector_field,
                max_top_k = options.max_top_k,
                explanation_concurrency = options.explanation_concurrency,
                "pipeline ready"
            );

            let store = database.connect().await?;
            if store.is_none() {
                warn!("DATABASE_URL not set; matchmaking routes will answer 503");
            }

            let state = AppState {
                pipeline: Arc::new(pipeline),
                store,
            };
            let settings = ServerSettings {
                bind_addr: bind,
                cors_origins: cors_origin
                    .into_iter()
                    .filter(|origin| !origin.trim().is_empty())
                    .collect(),
                request_timeout,
            };
            server::serve(state, settings).await?;
        }
        Command::Search {
            providers,
            category,
            field,
            description,
            top_k,
        } => {
            let pipeline = providers.build_pipeline()?;
            let request = SearchRequest::new(category, field, description).with_top_k(top_k);

            let results = pipeline.search_researchers(&request).await?;

            println!("query: {}", request.query_text());
            println!("{} matching researchers", results.len());
            for (rank, result) in results.iter().enumerate() {
                println!(
                    "[{}] score={:.4} researcher_id={}",
                    rank + 1,
                    result.score,
                    result.researcher_id
                );
                println!("  project: {}", result.project_title);
                println!("  field: {}", result.research_field);
                println!("  keywords: {}", result.keywords);
                println!("  explanation: {}", result.explanation);
            }
        }
        Command::InspectIndex { index } => {
            let client = build_http_client(index.call_timeout())?;
            let store = index.build_index(client)?;
            let fields = store.sample_fields().await?;

            if fields.is_empty() {
                println!("no documents found in index {}", index.search_index);
                return Ok(());
            }

            println!("index {} fields:", index.search_index);
            for field in &fields {
                println!("- {}: {}", field.name, field.preview);
            }

            let schema = store.schema();
            let present = |name: &str| fields.iter().any(|field| field.name == name);
            for expected in schema.projection() {
                if !present(expected) {
                    warn!(field = expected, "selected field missing from sampled document");
                }
            }
            if !present(&schema.vector_field) {
                println!(
                    "note: vector field {} is not retrievable, so it does not appear above",
                    schema.vector_field
                );
            }
        }
    }

    Ok(())
}
