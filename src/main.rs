use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use votemap::{
    config::AppConfig,
    decode::FlatGeobufDecoder,
    fetch::{FileFetcher, ResourceFetcher},
    loader::{FeatureLoader, DEFAULT_RESOURCE},
    model::{Feature, Properties},
    progress::{LoggedProgress, ProgressIndicator},
    rows::load_rows,
    transform::{encode_visual_attributes, CoordinateJoin},
};

/// Load a FlatGeobuf layer, join vote rows onto it and emit marker attributes.
#[derive(Parser, Debug)]
#[command(name = "votemap", version, about)]
struct Cli {
    /// Local `.fgb` path, absolute URL, or path relative to `loader.base_url`.
    #[arg(short, long, default_value = DEFAULT_RESOURCE)]
    resource: String,

    /// JSON array of tabular rows to join by region name.
    #[arg(long)]
    rows: Option<PathBuf>,

    /// YAML configuration file.
    #[arg(short, long, env = "VOTEMAP_CONFIG")]
    config: Option<PathBuf>,

    /// Output file; stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let start = Instant::now();

    // ─── 2) configuration ────────────────────────────────────────────
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };

    // ─── 3) load features ────────────────────────────────────────────
    let progress: Arc<dyn ProgressIndicator> = Arc::new(LoggedProgress::new(&cli.resource, 10.0));
    let features = if Path::new(&cli.resource).is_file() {
        let loader = FeatureLoader::new(
            FileFetcher::default(),
            FlatGeobufDecoder,
            config.loader.clone(),
        );
        load(&loader, &cli.resource, progress).await?
    } else {
        load(&FeatureLoader::http(config.loader.clone()), &cli.resource, progress).await?
    };

    // ─── 4) join & encode ────────────────────────────────────────────
    let written = match &cli.rows {
        Some(path) => {
            let rows = load_rows(path)?;
            let total = rows.len();
            let outcome = CoordinateJoin::new(config.join.clone()).join(rows, &features);
            if outcome.dropped > 0 {
                warn!(
                    dropped = outcome.dropped,
                    total, "rows without a point match were skipped"
                );
            }
            let encoded = encode_visual_attributes(outcome.records, &config.encoding);
            write_output(&encoded, cli.output.as_deref())?
        }
        None => {
            let records: Vec<Properties> = features.into_iter().map(located_properties).collect();
            let encoded = encode_visual_attributes(records, &config.encoding);
            write_output(&encoded, cli.output.as_deref())?
        }
    };

    info!(records = written, elapsed = ?start.elapsed(), "done");
    Ok(())
}

async fn load<F: ResourceFetcher>(
    loader: &FeatureLoader<F, FlatGeobufDecoder>,
    resource: &str,
    progress: Arc<dyn ProgressIndicator>,
) -> Result<Vec<Feature>> {
    loader
        .load(resource, Some(progress))
        .await
        .with_context(|| format!("loading {}", resource))
}

/// Feature properties, plus `lon`/`lat` for point geometries.
fn located_properties(feature: Feature) -> Properties {
    let mut props = feature.properties;
    if let geo_types::Geometry::Point(point) = feature.geometry {
        props.insert("lon".into(), point.x().into());
        props.insert("lat".into(), point.y().into());
    }
    props
}

fn write_output<T: Serialize>(items: &[T], output: Option<&Path>) -> Result<usize> {
    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    serde_json::to_writer_pretty(&mut writer, items)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(items.len())
}
