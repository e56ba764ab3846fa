//! Command-line client for bulk export and import jobs.
//!
//! ```sh
//! export BULKPORT_URL='https://shop.example.com'
//! export BULKPORT_TOKEN='...'
//! bulkport import product-1.json category-1.csv
//! bulkport export --query-file products.graphql --format csv --output out/
//! ```

use anyhow::Context;
use bulkport::{
    BulkJobClient, ClientConfig, DownloadRequest, ExportQuery, FileFormat, ImportSource,
    JobConfig, JobOutcome, ObjectType, OutputFormat, OutputTarget,
};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Bulk data exchange client
#[derive(Parser, Debug)]
#[command(name = "bulkport")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Platform base URL
    #[arg(long, env = "BULKPORT_URL")]
    url: String,

    /// Bearer token
    #[arg(long, env = "BULKPORT_TOKEN", hide_env_values = true)]
    token: String,

    /// Job timeout in seconds (capped at one hour)
    #[arg(long, global = true, default_value_t = 1800)]
    timeout: u64,

    /// Debug logging; keeps staged files
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stage files and import them as one job
    Import(ImportArgs),
    /// Run an export query and download the results
    Export(ExportArgs),
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// Input files (JSON array, CSV or JSON-Lines)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Object type of a single input file; otherwise taken from the file name prefix
    #[arg(long = "type")]
    object_type: Option<ObjectType>,

    /// Input format; otherwise inferred from the extension
    #[arg(long)]
    format: Option<FileFormat>,

    /// Directory for staged wire files
    #[arg(long)]
    staging_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// File containing the export query
    #[arg(long)]
    query_file: PathBuf,

    /// Query variables as a JSON object
    #[arg(long)]
    variables: Option<String>,

    /// Only download this object type
    #[arg(long = "type")]
    object_type: Option<ObjectType>,

    /// Output directory, or file path for a single object
    #[arg(long, default_value = ".")]
    output: PathBuf,

    /// Output format: wire, json, csv or jsonl
    #[arg(long, default_value = "wire")]
    format: OutputFormat,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut job_config = JobConfig::builder()
        .with_timeout(Duration::from_secs(cli.timeout))
        .with_verbose(cli.verbose);
    if let Commands::Import(ImportArgs {
        staging_dir: Some(dir),
        ..
    }) = &cli.command
    {
        job_config = job_config.with_staging_dir(dir);
    }

    let client = BulkJobClient::with_config(
        &cli.url,
        &cli.token,
        ClientConfig::default(),
        job_config.build(),
    )
    .context("failed to create client")?;

    match cli.command {
        Commands::Import(args) => import(&client, args).await,
        Commands::Export(args) => export(&client, args).await,
    }
}

async fn import(client: &BulkJobClient, args: ImportArgs) -> anyhow::Result<()> {
    let sources = import_sources(args)?;
    let report = client.execute_import(&sources).await?;

    for skipped in &report.skipped {
        eprintln!("warning: skipped {}: {}", skipped.path.display(), skipped.reason);
    }
    print_summary(&report.outcome);
    for path in &report.retained_files {
        println!("  staged file kept: {}", path.display());
    }
    Ok(())
}

async fn export(client: &BulkJobClient, args: ExportArgs) -> anyhow::Result<()> {
    let query = std::fs::read_to_string(&args.query_file)
        .with_context(|| format!("failed to read {}", args.query_file.display()))?;

    let mut export_query = ExportQuery::new(query);
    if let Some(raw) = &args.variables {
        let variables: serde_json::Value =
            serde_json::from_str(raw).context("--variables is not valid JSON")?;
        export_query = export_query.with_variables(variables);
    }

    let mut request = DownloadRequest::new(output_target(&args.output)).with_format(args.format);
    if let Some(object_type) = args.object_type {
        request = request.with_object_type(object_type);
    }

    let report = client.execute_export(export_query, &request).await?;

    print_summary(&report.outcome);
    for file in &report.downloads.written {
        println!(
            "  {} -> {} ({} records)",
            file.object,
            file.path.display(),
            file.record_count
        );
    }
    Ok(())
}

/// One batch holds one file per object type, so `--type` only makes sense
/// for a single file.
fn import_sources(args: ImportArgs) -> anyhow::Result<Vec<ImportSource>> {
    if args.object_type.is_some() && args.files.len() > 1 {
        anyhow::bail!(
            "--type applies to a single file; name multiple files <type>-<name>.<ext> instead"
        );
    }

    Ok(args
        .files
        .into_iter()
        .map(|path| ImportSource {
            path,
            object_type: args.object_type,
            format: args.format,
        })
        .collect())
}

/// A path that exists as a directory, ends in a separator or has no
/// extension is a directory target.
fn output_target(path: &Path) -> OutputTarget {
    let looks_like_dir = path.is_dir()
        || path.as_os_str().to_string_lossy().ends_with(std::path::MAIN_SEPARATOR)
        || path.extension().is_none();
    if looks_like_dir {
        OutputTarget::Directory(path.to_path_buf())
    } else {
        OutputTarget::File(path.to_path_buf())
    }
}

fn print_summary(outcome: &JobOutcome) {
    let state = if outcome.is_partial() {
        "completed with warnings"
    } else {
        "completed"
    };
    println!(
        "{} job {} {}: {} objects, {} records",
        outcome.kind,
        outcome.job_id,
        state,
        outcome.objects.len(),
        outcome.record_count()
    );
    for warning in &outcome.warnings {
        eprintln!("warning: {warning}");
    }
}
