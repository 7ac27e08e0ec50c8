use clap::{Parser, Subcommand};
use indexsync::transport::{ClusterClient, HttpTransport};
use indexsync::{ClusterConfig, IndexDefinition, IndexSync};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status when the index has drifted from its schema.
const EXIT_DRIFTED: u8 = 2;

#[derive(Parser)]
#[command(name = "indexsync", about = "Keep a search index in step with its declared schema")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, env = "INDEXSYNC_URL", default_value = "http://127.0.0.1:9200", global = true)]
    url: String,
    #[arg(long, env = "INDEXSYNC_TIMEOUT_MS", default_value_t = 30_000, global = true)]
    timeout_ms: u64,
    /// Cluster API version, e.g. 6.8 or 7.10
    #[arg(long, env = "INDEXSYNC_API_VERSION", global = true)]
    api_version: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Create the index, or add whatever the schema declares and the index lacks
    Ensure { definition: PathBuf },
    /// Show what `ensure` would do without changing the index
    Audit { definition: PathBuf },
    /// Check that the cluster answers
    Ping,
}

impl Cli {
    fn config(&self) -> ClusterConfig {
        ClusterConfig {
            url: self.url.clone(),
            request_timeout_ms: self.timeout_ms,
            api_version: self.api_version.clone(),
        }
    }
}

fn print_json(value: &serde_json::Value) -> indexsync::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> indexsync::Result<ExitCode> {
    let config = cli.config();
    tracing::debug!(url = %config.url, timeout_ms = config.request_timeout_ms, "cluster config");

    match cli.command {
        Command::Ping => {
            let client = ClusterClient::new(Arc::new(HttpTransport::new(&config)?));
            if client.ping().await? {
                eprintln!("cluster at {} is up", config.url);
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!("cluster at {} answered with an error", config.url);
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Ensure { definition } => {
            let sync = IndexSync::connect(&config, IndexDefinition::load(definition)?)?;
            let outcome = sync.ensure().await?;
            print_json(&json!(outcome))?;
            Ok(exit_for(outcome.consistent))
        }
        Command::Audit { definition } => {
            let sync = IndexSync::connect(&config, IndexDefinition::load(definition)?)?;
            if !sync.exists().await? {
                print_json(&json!({ "index": sync.index(), "exists": false }))?;
                return Ok(exit_for(false));
            }

            let settings = sync.audit_settings().await?;
            let mappings = sync.audit_mappings().await?;
            let in_sync = settings.is_in_sync() && mappings.is_in_sync();
            print_json(&json!({
                "index": sync.index(),
                "exists": true,
                "in_sync": in_sync,
                "settings": settings,
                "mappings": mappings,
            }))?;
            Ok(exit_for(in_sync))
        }
    }
}

fn exit_for(consistent: bool) -> ExitCode {
    if consistent {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_DRIFTED)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            ExitCode::FAILURE
        }
    }
}
