//! `accessibility`: batch nearest-facility run from a JSON run file.
//!
//! Loads the road network, origins, and facility categories named in the run
//! file, runs the category pipeline, and writes the accessibility table and
//! regional summary.
//!
//! Run with:
//!   cargo run -p accessibility --release -- demos/accessibility/run.json
//!
//! Logging goes to stderr; set `RUST_LOG=info` (or `debug` for per-chunk
//! progress).
//!
//! `--time-limit` stops the cost stage at the next chunk boundary once the
//! limit passes.  With a checkpoint, rerunning the same command continues
//! where the previous run stopped.

// mimalloc keeps per-origin row buffers from fragmenting the heap on large
// origin sets.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod run_file;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use memory_stats::memory_stats;

use acc_matrix::CancelToken;
use acc_output::{AccessWriter, CsvWriter};
use acc_pipeline::{LogObserver, PipelineBuilder, RunStatus};

use run_file::RunFile;

// ── Memory helper ─────────────────────────────────────────────────────────────

fn mem_mb() -> f64 {
    memory_stats()
        .map(|s| s.physical_mem as f64 / (1024.0 * 1024.0))
        .unwrap_or(0.0)
}

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Csv,
    Sqlite,
    Parquet,
}

#[derive(Parser, Debug)]
#[command(name = "accessibility")]
#[command(about = "Nearest-facility accessibility over a road network")]
struct Cli {
    /// JSON run file
    run_file: PathBuf,

    /// Output directory (overrides the run file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Table format for the accessibility table and regional summary
    #[arg(short, long, value_enum, default_value_t = Format::Csv)]
    format: Format,

    /// OD checkpoint CSV (overrides the run file)
    #[arg(long, conflicts_with = "no_checkpoint")]
    checkpoint: Option<PathBuf>,

    /// Ignore any checkpoint named in the run file
    #[arg(long)]
    no_checkpoint: bool,

    /// Also write the full OD matrix, in minutes when `report_minutes` is set
    #[arg(long)]
    od_matrix: Option<PathBuf>,

    /// Stop computing costs after this many seconds (resume with a checkpoint)
    #[arg(long, value_name = "SECONDS")]
    time_limit: Option<u64>,
}

/// Cancel `token` from a background thread once `limit` has elapsed.
fn arm_time_limit(token: &CancelToken, limit: Duration) {
    let token = token.clone();
    std::thread::spawn(move || {
        std::thread::sleep(limit);
        log::warn!("time limit of {}s reached; stopping at the next chunk", limit.as_secs());
        token.cancel();
    });
}

fn open_writer(format: Format, dir: &std::path::Path, schema: &acc_output::AccessSchema) -> Result<Box<dyn AccessWriter>> {
    Ok(match format {
        Format::Csv => Box::new(CsvWriter::new(dir, schema)?),
        #[cfg(feature = "sqlite")]
        Format::Sqlite => Box::new(acc_output::SqliteWriter::new(dir, schema)?),
        #[cfg(feature = "parquet")]
        Format::Parquet => Box::new(acc_output::ParquetWriter::new(dir, schema)?),
        #[allow(unreachable_patterns)]
        other => bail!("this binary was built without the `{other:?}` output feature"),
    })
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    let mut run = RunFile::load(&cli.run_file)?;
    if let Some(dir) = cli.output {
        run.output_dir = dir;
    }
    if cli.no_checkpoint {
        run.checkpoint = None;
    } else if let Some(p) = cli.checkpoint {
        run.checkpoint = Some(p);
    }
    log::info!("mem[startup] {:.0} MB", mem_mb());

    // 1. Inputs.
    let t_load = Instant::now();
    let network = run.load_network()?;
    let origins = run.load_origins()?;
    let categories = run.load_categories()?;
    let elevation = run.load_elevation(run.config.crs)?;
    log::info!(
        "loaded {} nodes, {} edges, {} origins, {} categories in {:.2}s",
        network.node_count(),
        network.edge_count(),
        origins.len(),
        categories.len(),
        t_load.elapsed().as_secs_f64(),
    );
    log::info!("mem[after load] {:.0} MB", mem_mb());

    // 2. Pipeline.
    let mut builder = PipelineBuilder::new(network, run.config.clone(), origins)
        .straight_line(run.straight_line)
        .retain_matrix(cli.od_matrix.is_some());
    for c in categories {
        builder = builder.category(c);
    }
    if let Some(e) = elevation {
        builder = builder.elevation(e);
    }
    if let Some(spec) = run.regions.clone() {
        builder = builder.regions(spec);
    }
    if let Some(p) = run.checkpoint.clone() {
        builder = builder.checkpoint(p);
    }
    let pipeline = builder.build()?;

    // 3. Run.
    let t_run = Instant::now();
    let cancel = CancelToken::new();
    if let Some(secs) = cli.time_limit {
        if run.checkpoint.is_none() {
            log::warn!("--time-limit without a checkpoint: a stopped run cannot be resumed");
        }
        arm_time_limit(&cancel, Duration::from_secs(secs));
    }
    let report = pipeline.run(&mut LogObserver::new(), &cancel)?;
    log::info!("mem[after run] {:.0} MB", mem_mb());
    if report.status == RunStatus::Cancelled {
        log::warn!("run cancelled after {} rows; rerun to resume from the checkpoint", report.rows_computed);
        return Ok(());
    }
    for (name, failed) in &report.facility_snap_failures {
        if *failed > 0 {
            log::warn!("{failed} {name} facilities failed to snap and were left out");
        }
    }

    // 4. Outputs.
    std::fs::create_dir_all(&run.output_dir)?;
    let mut writer = open_writer(cli.format, &run.output_dir, &report.schema)?;
    report.write(&mut writer)?;

    if let (Some(path), Some(od)) = (&cli.od_matrix, &report.od) {
        let od = if run.config.report_minutes { od.to_minutes(run.config.fail_value)? } else { od.clone() };
        let network = &pipeline.context().network;
        let dests: Vec<i64> = od.destinations().iter().map(|&d| network.external_id(d)).collect();
        let mut w = acc_output::OdCsvWriter::create(path, &dests)?;
        for (origin, row) in od.rows() {
            w.write_row(network.external_id(origin), row)?;
        }
        w.flush()?;
        log::info!("wrote {} x {} OD matrix to {}", od.n_origins(), od.n_destinations(), path.display());
    }

    log::info!(
        "{} origins scored in {:.2}s ({} unit); output in {}",
        report.records.len(),
        t_run.elapsed().as_secs_f64(),
        report.unit.as_str(),
        run.output_dir.display(),
    );
    Ok(())
}
