/// One-shot environmental lookup: resolve a single grid coordinate to the
/// fused-record JSON on stdout.
///
/// Exit status 0 on any resolved request — including one where
/// classification was skipped — and 1 with an `{"error": ...}` body on
/// malformed input, boundary rejection, or a data source failing at
/// startup.

use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Parser;
use drumlin_core::{Crs, LookupServiceBuilder};

#[derive(Parser, Debug)]
#[command(name = "lookup", about = "Fused environmental lookup for one grid coordinate")]
struct Args {
    /// Easting (metres in Irish Grid, or longitude with --crs wgs84).
    easting: f64,

    /// Northing (metres in Irish Grid, or latitude with --crs wgs84).
    northing: f64,

    /// Directory holding the persisted layer CSVs.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Classifier artifact path (default <data-dir>/cluster_classifier.json).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Reference system of the input coordinate.
    #[arg(long, default_value = "EPSG:29903")]
    crs: String,
}

fn run(args: Args) -> Result<String> {
    let crs = Crs::from_str(&args.crs)?;

    let mut builder = LookupServiceBuilder::new(&args.data_dir);
    if let Some(model) = &args.model {
        builder = builder.artifact_path(model);
    }
    let service = builder
        .build()
        .with_context(|| format!("loading layers from {}", args.data_dir.display()))?;

    let response = service.lookup(args.easting, args.northing, crs)?;
    serde_json::to_string(&response).context("serializing response")
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e)
            if matches!(
                e.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            println!("{}", serde_json::json!({ "error": e.to_string() }));
            return ExitCode::from(1);
        }
    };

    match run(args) {
        Ok(line) => {
            println!("{line}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{}", serde_json::json!({ "error": format!("{e:#}") }));
            ExitCode::from(1)
        }
    }
}
