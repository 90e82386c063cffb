//! aitax - command-line front end for the AI taxonomist widget
//!
//! Runs one widget session against a configured identification backend and
//! prints the normalized results.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use aitax_common::config::{default_config_path, load_or_default, write_toml_config, TomlConfig};
use aitax_common::events::{EventBus, WidgetEvent};
use aitax_widget::config::{
    parse_api_url, resolve_config, ConfigOverrides, DEFAULT_API_URL, DEFAULT_MAX_IMAGES,
};
use aitax_widget::models::{ImageAsset, ResultBatch, SUPPORTED_IMAGE_TYPES};
use aitax_widget::services::{ReqwestTransport, SpeciesListClient, Transport};
use aitax_widget::widget::{IdentifyState, WidgetSession};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " [",
    env!("GIT_HASH"),
    "] built ",
    env!("BUILD_TIMESTAMP"),
    " (",
    env!("BUILD_PROFILE"),
    ")"
);

/// Command-line arguments for aitax
#[derive(Parser, Debug)]
#[command(name = "aitax")]
#[command(about = "Identify plants from photos with an AI taxonomist backend")]
#[command(version, long_version = LONG_VERSION)]
struct Cli {
    /// TOML configuration file (default: <config_dir>/aitax/config.toml)
    #[arg(short, long, global = true, env = "AITAX_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Identify the plant shown in one or more images
    Identify(IdentifyArgs),
    /// List the species known to the backend
    Species(SpeciesArgs),
    /// Write a default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct IdentifyArgs {
    /// Image files, in submission order
    #[arg(required = true)]
    images: Vec<PathBuf>,

    #[command(flatten)]
    backend: BackendArgs,

    /// API key passed as the `api-key` query parameter
    #[arg(long)]
    api_key: Option<String>,

    /// Backend wire format: pn, c4c or carp
    #[arg(short, long = "backend")]
    backend_format: Option<String>,

    /// Maximum images per identification
    #[arg(long)]
    max_images: Option<usize>,

    /// Language tag for localized names
    #[arg(long)]
    lang: Option<String>,

    /// Print the result batch as JSON
    #[arg(long)]
    json: bool,

    /// Number of candidates to print
    #[arg(long, default_value = "5")]
    max_results: usize,
}

#[derive(Args, Debug)]
struct SpeciesArgs {
    #[command(flatten)]
    backend: BackendArgs,

    /// Only list species whose names contain this text
    #[arg(short, long)]
    filter: Option<String>,
}

#[derive(Args, Debug)]
struct BackendArgs {
    /// Backend endpoint URL
    #[arg(short = 'u', long)]
    api_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let toml_config = load_or_default(cli.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&toml_config);

    info!(
        "Starting aitax v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match cli.command {
        Command::Identify(args) => identify(args, &toml_config).await,
        Command::Species(args) => species(args, &toml_config).await,
        Command::InitConfig { force } => init_config(cli.config.as_deref(), force),
    }
}

/// RUST_LOG wins; otherwise the TOML `[logging] level` applies to aitax crates
fn init_tracing(toml_config: &TomlConfig) {
    let level = &toml_config.logging.level;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("aitax={level},aitax_widget={level},aitax_common={level}").into()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn identify(args: IdentifyArgs, toml_config: &TomlConfig) -> Result<()> {
    let overrides = ConfigOverrides {
        api_url: args.backend.api_url,
        api_key: args.api_key,
        backend_format: args.backend_format,
        max_images: args.max_images,
        lang: args.lang,
    };
    let config = resolve_config(&overrides, toml_config).context("Invalid configuration")?;

    let images = load_images(&args.images)?;
    let transport: Arc<dyn Transport> =
        Arc::new(ReqwestTransport::new().context("Failed to create HTTP client")?);

    let events = EventBus::new(16);
    let observer = tokio::spawn(log_events(events.subscribe()));
    let session = WidgetSession::new(config, transport, events);

    let (state, provenance) = tokio::join!(session.pick_images(images), session.load_provenance());
    session.close().await;
    drop(session);
    observer.abort();

    match state {
        IdentifyState::Loaded(batch) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&batch)?);
            } else {
                print_batch(&batch, args.max_results);
                if let Some(url) = provenance {
                    println!("\nModel trained on GBIF dataset: {}", url);
                }
            }
            Ok(())
        }
        IdentifyState::Error(message) => Err(anyhow!(message)),
        other => bail!("Identification did not complete (state: {})", other.name()),
    }
}

/// Read image files, skipping types the backends do not accept
fn load_images(paths: &[PathBuf]) -> Result<Vec<ImageAsset>> {
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        let image = ImageAsset::from_file(path)
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        if image.is_supported() {
            images.push(image);
        } else {
            warn!(
                file = %path.display(),
                mime_type = %image.mime_type(),
                "Skipping unsupported image type"
            );
        }
    }

    if images.is_empty() {
        bail!(
            "No supported images (accepted: {})",
            SUPPORTED_IMAGE_TYPES.join(", ")
        );
    }
    Ok(images)
}

async fn log_events(mut rx: tokio::sync::broadcast::Receiver<WidgetEvent>) {
    while let Ok(event) = rx.recv().await {
        match &event {
            WidgetEvent::IdentificationStarted {
                image_count,
                backend,
                ..
            } => info!(image_count, backend = %backend, "Submitting images"),
            other => debug!(event = ?other, "Widget event"),
        }
    }
}

fn print_batch(batch: &ResultBatch, max_results: usize) {
    if let Some(overall) = &batch.overall_score {
        println!("{}\n", overall);
    }
    if batch.is_empty() {
        println!("No matching species found");
        return;
    }

    for (rank, result) in batch.results.iter().take(max_results).enumerate() {
        let name = result.taxon_name.as_deref().unwrap_or("Unknown taxon");
        let author = result.author.as_deref().map(|a| format!(" {}", a)).unwrap_or_default();
        let family = result.family.as_deref().map(|f| format!(" ({})", f)).unwrap_or_default();

        println!("{}. {}{}{}  {}%", rank + 1, name, author, family, result.score_percent());
        if let Some(common) = result.primary_common_name() {
            println!("   {}", common);
        }
        if let Some(text) = &result.additional_text {
            println!("   {}", text);
        }
        if let Some(url) = result.gbif_url.as_ref().or(result.url.as_ref()) {
            println!("   {}", url);
        }
    }
}

async fn species(args: SpeciesArgs, toml_config: &TomlConfig) -> Result<()> {
    let overrides = ConfigOverrides {
        api_url: args.backend.api_url,
        ..ConfigOverrides::default()
    };
    let config = resolve_config(&overrides, toml_config).context("Invalid configuration")?;

    let transport = Arc::new(ReqwestTransport::new().context("Failed to create HTTP client")?);
    let species = SpeciesListClient::new(transport)
        .fetch(&config.api_url)
        .await
        .map_err(|message| anyhow!(message))?;

    let query = args.filter.unwrap_or_default();
    let mut shown = 0usize;
    for taxon in species.iter().filter(|s| s.matches(&query)) {
        if taxon.vernacular_name.is_empty() {
            println!("{}", taxon.name);
        } else {
            println!("{} - {}", taxon.name, taxon.vernacular_name);
        }
        shown += 1;
    }
    info!(shown, total = species.len(), "Species listed");
    Ok(())
}

fn init_config(explicit: Option<&Path>, force: bool) -> Result<()> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => default_config_path().context("No configuration directory on this platform")?,
    };
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let config = TomlConfig {
        api_url: Some(parse_api_url(DEFAULT_API_URL)?.to_string()),
        max_images: Some(DEFAULT_MAX_IMAGES),
        ..TomlConfig::default()
    };
    write_toml_config(&config, &path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
