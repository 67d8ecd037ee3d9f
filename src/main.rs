use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use variant_cache::config::{self, ServiceConfig};
use variant_cache::coordinator::RequestCoordinator;
use variant_cache::gateway::{CacheGateway, OriginGateway};
use variant_cache::imaging::RustBackend;
use variant_cache::server;
use variant_cache::storage::FsStore;

#[derive(Parser)]
#[command(name = "variant-cache")]
#[command(about = "On-demand resized image variants with a write-through cache")]
#[command(long_about = "\
On-demand resized image variants with a write-through cache

Requests name a variant by key:

  1280x720/wind/surfing.jpg    explicit resolution
  wind/surfing.jpg             default resolution applied

A cached variant is a redirect to the optimized store. A miss reads the
master, resizes it to fit inside the resolution, writes the variant, and
redirects to it. Anything that goes wrong redirects to the master.

Configuration comes from config.toml, overridden by MASTER_BUCKET,
MASTER_URL, OPTIMIZED_BUCKET, OPTIMIZED_URL, ALLOWED_RESOLUTIONS and
DEFAULT_RESOLUTION.

Run 'variant-cache gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Path to the config file
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Run a single key through the pipeline and print the response
    Resolve {
        /// Request key, e.g. 1280x720/wind/surfing.jpg
        key: String,
        /// Accept header to negotiate with
        #[arg(long)]
        accept: Option<String>,
    },
    /// Validate configuration without serving
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Serve => {
            let cfg = config::load_config(&cli.config)?;
            let coordinator = Arc::new(build_coordinator(&cfg));
            let listener = tokio::net::TcpListener::bind(&cfg.server.bind).await?;
            server::serve(listener, server::router(coordinator)).await?;
        }
        Command::Resolve { key, accept } => {
            let cfg = config::load_config(&cli.config)?;
            let coordinator = build_coordinator(&cfg);
            let descriptor = coordinator.respond(&key, accept.as_deref());
            println!("{}", serde_json::to_string_pretty(&descriptor)?);
        }
        Command::Check => {
            let cfg = config::load_config(&cli.config)?;
            warn_on_default_resolution(&cfg);
            let (master, optimized) = (&cfg.master, &cfg.optimized);
            println!("master:    {} -> {}", master.bucket, master.url);
            println!("optimized: {} -> {}", optimized.bucket, optimized.url);
            println!("==> Config is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the global subscriber; `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("variant_cache=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_coordinator(cfg: &ServiceConfig) -> RequestCoordinator<RustBackend> {
    warn_on_default_resolution(cfg);
    info!(
        master = %cfg.master.bucket,
        optimized = %cfg.optimized.bucket,
        "stores configured"
    );
    RequestCoordinator::new(
        cfg.key_policy(),
        OriginGateway::new(Arc::new(FsStore::new(&cfg.master.bucket))),
        CacheGateway::new(Arc::new(FsStore::new(&cfg.optimized.bucket))),
        RustBackend::new(),
        cfg.links(),
    )
    .with_quality(cfg.quality())
}

fn warn_on_default_resolution(cfg: &ServiceConfig) {
    if !cfg.has_valid_default_resolution() {
        warn!(
            default_resolution = %cfg.default_resolution,
            "default_resolution is not WIDTHxHEIGHT; keys without a resolution will be rejected"
        );
    }
}
