//! Asset Uploadr - chunked file upload client
//!
//! Uploads one file and prints the upload result as JSON.

use anyhow::Context;
use asset_uploadr::{
    client::HttpRequestSender,
    config::Config,
    logging,
    upload::{AssetMetadata, Uploader, BRAND_ID_KEY, MEDIA_ID_KEY},
};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Asset Uploadr - upload a file as a new asset or a new asset version
#[derive(Parser, Debug)]
#[command(name = "asset-uploadr")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    /// File to upload
    file: PathBuf,

    /// Existing media id; uploads a new version of that asset
    #[arg(long, conflicts_with = "brand_id")]
    media_id: Option<String>,

    /// Brand id for a new asset
    #[arg(long)]
    brand_id: Option<String>,

    /// Extra metadata field passed to the save request (repeatable)
    #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_field)]
    fields: Vec<(String, String)>,

    /// Print Prometheus metrics to stderr when done
    #[arg(long)]
    print_metrics: bool,
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

fn build_metadata(args: &Args) -> AssetMetadata {
    let mut metadata: AssetMetadata = args.fields.iter().cloned().collect();
    if let Some(ref media_id) = args.media_id {
        metadata.insert(MEDIA_ID_KEY, media_id.as_str());
    }
    if let Some(ref brand_id) = args.brand_id {
        metadata.insert(BRAND_ID_KEY, brand_id.as_str());
    }
    metadata
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load configuration from {:?}", args.config))?;
    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }

    logging::init_logging(&config.logging)?;
    info!("Starting Asset Uploadr v{}", asset_uploadr::VERSION);
    info!("Loaded configuration from {:?}", args.config);

    asset_uploadr::metrics::set_enabled(config.metrics.enabled);

    let sender = HttpRequestSender::from_config(&config.api)?;
    let uploader = Uploader::new(sender);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling upload");
            on_signal.cancel();
        }
    });

    let result = uploader
        .upload_with_cancel(&args.file, build_metadata(&args), cancel)
        .await;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if args.print_metrics && config.metrics.enabled {
        eprint!("{}", asset_uploadr::metrics::render());
    }

    if !result.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
