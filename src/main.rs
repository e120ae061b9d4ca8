use anyhow::{anyhow, Context, Result};
use batas_core::config::{LogFormat, LoggingConfig};
use batas_core::tile::TileCoord;
use batas_core::types::LonLat;
use batas_core::AppConfig;
use batas_explorer::presentation;
use batas_explorer::{ApiClient, DetailCoordinator, DetailOutcome, SearchCoordinator, SearchOutcome};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// batas-desa - Village boundary explorer probe
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long, global = true, env = "BATAS_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search villages by name or code
    Search {
        query: String,
    },
    /// Show the full record of a village
    Detail {
        /// Lookup code (kdepum)
        code: String,
    },
    /// Download one boundary vector tile
    Tile {
        z: u8,
        x: u32,
        y: u32,

        /// Write the payload to this file instead of reporting its size
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the tile containing a coordinate
    TileAt {
        #[arg(allow_hyphen_values = true)]
        lon: f64,
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        zoom: u8,
    },
    /// Print the effective configuration
    Config,
}

fn init_logging(config: &LoggingConfig) -> Result<()> {
    config.parse_level()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config =
        AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
    }
    config.validate().context("Invalid configuration")?;

    init_logging(&config.logging)?;

    match cli.command {
        Command::Search { query } => search(&config, &query).await,
        Command::Detail { code } => detail(&config, &code).await,
        Command::Tile { z, x, y, output } => tile(&config, z, x, y, output).await,
        Command::TileAt { lon, lat, zoom } => tile_at(&config, lon, lat, zoom),
        Command::Config => {
            print!("{}", serde_yaml::to_string(&config).context("Failed to render configuration")?);
            Ok(())
        }
    }
}

async fn search(config: &AppConfig, query: &str) -> Result<()> {
    let client = ApiClient::from_config(&config.api)?;
    info!("Searching {} for {:?}", client.base_url(), query);

    let search =
        SearchCoordinator::with_min_query_chars(Arc::new(client), config.search.min_query_chars);
    match search.search(query).await {
        SearchOutcome::Skipped => anyhow::bail!(
            "Query must be at least {} characters",
            search.min_query_chars()
        ),
        SearchOutcome::Failed => anyhow::bail!("Search failed; see log for details"),
        SearchOutcome::Applied(_) | SearchOutcome::Stale => {}
    }

    let results = search.results();
    for entity in &results {
        println!(
            "{}\t{}\t{}",
            entity.id,
            entity.lookup_code().unwrap_or("-"),
            presentation::result_label(entity)
        );
    }
    info!("{} result(s)", results.len());
    Ok(())
}

async fn detail(config: &AppConfig, code: &str) -> Result<()> {
    let client = ApiClient::from_config(&config.api)?;
    let detail = DetailCoordinator::new(Arc::new(client));

    if detail.fetch_detail(code).await != DetailOutcome::Applied {
        anyhow::bail!("No detail available for {}", code);
    }
    let record = detail
        .visible_record()
        .ok_or_else(|| anyhow!("No detail available for {}", code))?;

    println!("{}", presentation::detail_title(&record));
    for row in presentation::detail_rows(&record.attributes) {
        println!("{}: {}", row.label, row.value);
    }
    Ok(())
}

async fn tile(config: &AppConfig, z: u8, x: u32, y: u32, output: Option<PathBuf>) -> Result<()> {
    let tile = TileCoord::new(z, x, y).context("Invalid tile coordinate")?;
    let client = ApiClient::from_config(&config.api)?;

    info!("Fetching {}", client.tile_url(tile));
    let payload = client.fetch_tile(tile).await?;

    match output {
        Some(path) => {
            std::fs::write(&path, &payload)
                .with_context(|| format!("Failed to write tile to {:?}", path))?;
            println!("{}: {} bytes -> {}", tile, payload.len(), path.display());
        }
        None => println!("{}: {} bytes", tile, payload.len()),
    }
    Ok(())
}

fn tile_at(config: &AppConfig, lon: f64, lat: f64, zoom: u8) -> Result<()> {
    let tile = TileCoord::containing(LonLat::new(lon, lat), zoom).context("Invalid position")?;
    let client = ApiClient::from_config(&config.api)?;

    println!("{}", tile);
    println!("{}", client.tile_url(tile));
    Ok(())
}
