mod display;
mod pipeline;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use parcelscope_batch::{BatchRequest, BatchRunner};
use parcelscope_core::{CategorySet, Credential, FloorDataPolicy, decode};
use parcelscope_export::{DEFAULT_FIELDS, ExportLayout};
use parcelscope_registry::{
    BuildingRegistryClient, CategoryAggregator, OwnerClient, OwnerEnricher, ParcelLocator,
    ServiceConfig,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parcelscope")]
#[command(version, about = "Resolve parcels inside a polygon and aggregate building-registry records")]
struct Cli {
    #[command(flatten)]
    service: ServiceArgs,

    #[command(subcommand)]
    command: Command,
}

/// Endpoint settings. Flags override the optional JSON config file.
#[derive(Args)]
struct ServiceArgs {
    /// JSON file with geometry/registry/owner endpoint settings
    #[arg(long, global = true, env = "PARCELSCOPE_CONFIG")]
    config: Option<PathBuf>,

    /// Geometry (WFS) service API key
    #[arg(long, global = true, env = "PARCELSCOPE_GEOMETRY_KEY", hide_env_values = true)]
    geometry_key: Option<String>,

    /// Referer domain registered with the geometry API key
    #[arg(long, global = true, env = "PARCELSCOPE_GEOMETRY_DOMAIN")]
    geometry_domain: Option<String>,

    /// Building-registry service key
    #[arg(long, global = true, env = "PARCELSCOPE_REGISTRY_KEY", hide_env_values = true)]
    registry_key: Option<String>,

    /// Building-registry base URL
    #[arg(long, global = true, env = "PARCELSCOPE_REGISTRY_URL")]
    registry_url: Option<String>,

    /// Owner backend POST endpoint
    #[arg(long, global = true, env = "PARCELSCOPE_OWNER_URL")]
    owner_url: Option<String>,

    /// Per-request timeout in seconds (default: none)
    #[arg(long, global = true, env = "PARCELSCOPE_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// List registry categories by group (* = selected by default)
    Categories,
    /// Decode a 19-character parcel identifier
    Decode {
        identifier: String,
    },
    /// Resolve the parcels inside a polygon
    Locate {
        /// JSON file: [{"lat": .., "lng": ..}, ...]
        #[arg(long)]
        polygon: PathBuf,
    },
    /// Locate parcels, aggregate their records and write an export
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// JSON file: [{"lat": .., "lng": ..}, ...]
    #[arg(long)]
    polygon: PathBuf,

    /// Category ids, e.g. "1,4,11" (default: the default-checked set)
    #[arg(long)]
    categories: Option<String>,

    /// Output file; .csv or .parquet
    #[arg(long)]
    out: PathBuf,

    /// Record fields to export, comma separated
    #[arg(long, value_delimiter = ',')]
    fields: Vec<String>,

    /// Owner backend login
    #[arg(long, env = "PARCELSCOPE_OWNER_ID")]
    owner_id: Option<String>,

    /// Owner backend password
    #[arg(long, env = "PARCELSCOPE_OWNER_PW", hide_env_values = true)]
    owner_pw: Option<String>,

    /// When floor-outline rows count as data
    #[arg(long, value_enum, default_value_t = FloorPolicyArg::AnyPositiveArea)]
    floor_policy: FloorPolicyArg,

    /// Print detail cards for the first N finished parcels
    #[arg(long, default_value_t = 3)]
    show: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum FloorPolicyArg {
    AnyPositiveArea,
    AnyRow,
}

impl From<FloorPolicyArg> for FloorDataPolicy {
    fn from(arg: FloorPolicyArg) -> Self {
        match arg {
            FloorPolicyArg::AnyPositiveArea => FloorDataPolicy::AnyPositiveArea,
            FloorPolicyArg::AnyRow => FloorDataPolicy::AnyRow,
        }
    }
}

impl ServiceArgs {
    fn load(&self) -> anyhow::Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => ServiceConfig::default(),
        };

        if let Some(key) = &self.geometry_key {
            config.geometry.api_key = key.clone();
        }
        if let Some(domain) = &self.geometry_domain {
            config.geometry.domain = Some(domain.clone());
        }
        if let Some(key) = &self.registry_key {
            config.registry.service_key = key.clone();
        }
        if let Some(url) = &self.registry_url {
            config.registry.base_url = url.clone();
        }
        if let Some(url) = &self.owner_url {
            config.owner.endpoint = Some(url.clone());
        }
        if self.timeout_secs.is_some() {
            config.request_timeout_secs = self.timeout_secs;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("parcelscope v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Categories => {
            display::print_categories();
            Ok(())
        }
        Command::Decode { identifier } => cmd_decode(&identifier),
        Command::Locate { polygon } => cmd_locate(&cli.service, &polygon).await,
        Command::Run(args) => cmd_run(&cli.service, args).await,
    }
}

fn cmd_decode(identifier: &str) -> anyhow::Result<()> {
    let decoded = decode(identifier)
        .with_context(|| format!("cannot decode parcel identifier {identifier:?}"))?;
    println!("  {:<16} {}", "region", decoded.region_code);
    println!("  {:<16} {}", "sub-region", decoded.sub_region_code);
    println!("  {:<16} {}", "lot numerator", decoded.lot_numerator);
    println!("  {:<16} {}", "lot denominator", decoded.lot_denominator);
    Ok(())
}

async fn cmd_locate(service: &ServiceArgs, polygon_path: &std::path::Path) -> anyhow::Result<()> {
    let config = service.load()?;
    let client = config.http_client().context("building HTTP client")?;
    let polygon = pipeline::load_polygon(polygon_path)?;

    let locator = ParcelLocator::new(client, config.geometry);
    let parcels = locator
        .locate(polygon.vertices())
        .await
        .context("querying geometry service")?;

    for parcel in &parcels {
        println!("{}  {}", parcel.identifier, parcel.address);
    }
    eprintln!("{} parcels", parcels.len());
    Ok(())
}

async fn cmd_run(service: &ServiceArgs, args: RunArgs) -> anyhow::Result<()> {
    let config = service.load()?;
    let client = config.http_client().context("building HTTP client")?;
    let polygon = pipeline::load_polygon(&args.polygon)?;

    let categories = match &args.categories {
        Some(list) => list
            .parse::<CategorySet>()
            .with_context(|| format!("parsing categories {list:?}"))?,
        None => CategorySet::defaults(),
    };
    let mut request = BatchRequest::new(categories).context("selecting categories")?;
    if let (Some(id), Some(pw)) = (&args.owner_id, &args.owner_pw) {
        request = request.with_credential(Credential::new(id.clone(), pw.clone()));
    }

    let registry = BuildingRegistryClient::new(client.clone(), config.registry.clone());
    let aggregator =
        CategoryAggregator::new(Arc::new(registry)).with_floor_policy(args.floor_policy.into());
    let mut runner = BatchRunner::new(aggregator);
    if let Some(endpoint) = &config.owner.endpoint {
        let owners = OwnerClient::new(client.clone(), endpoint.clone());
        runner = runner.with_owner_enricher(OwnerEnricher::new(Arc::new(owners)));
    }

    let layout = if args.fields.is_empty() {
        ExportLayout::new(DEFAULT_FIELDS.iter().copied())
    } else {
        ExportLayout::new(args.fields.iter().cloned())
    };

    let locator = ParcelLocator::new(client, config.geometry);
    let outcome = pipeline::run_pipeline(&locator, &runner, &polygon, &request, &layout, &args.out)
        .await?;

    if !outcome.results.is_empty() {
        display::print_summary(&outcome.results)?;
    }
    for result in outcome
        .results
        .iter()
        .filter(|r| r.detail.is_some())
        .take(args.show)
    {
        display::print_parcel_card(result);
    }

    let stats = &outcome.stats;
    eprintln!(
        "  {} parcels: {} done, {} failed; {} rows written to {} in {:.1}s",
        stats.parcels,
        stats.done,
        stats.failed,
        stats.rows_written,
        args.out.display(),
        stats.elapsed_secs
    );
    Ok(())
}
