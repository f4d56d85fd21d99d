//! Command-line front end for the FADC readout chain.
#![allow(clippy::uninlined_format_args)]

use clap::{Parser, Subcommand, ValueEnum};
use fadcsim_core::{CalibratedHit, ChannelTable, Cluster, ConditionsHandle};
use fadcsim_fadc::tables::channel_table_from_file;
use fadcsim_fadc::{FadcConfig, RawConverter, RawEvent};
use fadcsim_trigger::{evaluator, TriggerCutConfig, TriggerKind, TriggerObserver, TriggerRecord};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(#[from] fadcsim_core::Error),

    #[error("FADC error: {0}")]
    Fadc(#[from] fadcsim_fadc::Error),

    #[error("Trigger error: {0}")]
    Trigger(#[from] fadcsim_trigger::Error),
}

/// Trigger type selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Any cluster passing the cluster cuts
    Singles,
    /// Coincident top/bottom cluster pairs
    Pairs,
}

impl From<Mode> for TriggerKind {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Singles => TriggerKind::Singles,
            Mode::Pairs => TriggerKind::Pairs,
        }
    }
}

/// FADC hit conversion and trigger emulation.
#[derive(Parser)]
#[command(name = "fadcsim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert raw FADC events into calibrated hits
    Convert {
        /// Events file (JSON list of events)
        input: PathBuf,

        /// FADC configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Channel calibration table
        #[arg(long)]
        calibration: PathBuf,

        /// Time offset added to Mode-3/7 hits (ns)
        #[arg(long, default_value = "0.0")]
        time_offset: f64,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a trigger over per-cycle cluster lists
    Trigger {
        /// Clusters file (JSON list of cycles, each a list of clusters, each a list of hits)
        input: PathBuf,

        /// Trigger cut configuration file
        #[arg(long)]
        cuts: PathBuf,

        /// Channel calibration table (crystal geometry)
        #[arg(long)]
        calibration: PathBuf,

        /// Trigger type
        #[arg(short, long, value_enum, default_value = "singles")]
        mode: Mode,

        /// Positional cut string overriding the file (e.g. "0.1 1.5 2")
        #[arg(long)]
        cut_string: Option<String>,
    },

    /// Show a validated FADC configuration
    Info {
        /// FADC configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Logs every fired trigger.
struct LogObserver;

impl TriggerObserver for LogObserver {
    fn trigger_fired(&mut self, record: &TriggerRecord) {
        log::info!("{} trigger at cycle {} ({:.1} ns)", record.kind, record.cycle, record.time_ns);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Convert {
            input,
            config,
            calibration,
            time_offset,
            output,
        } => convert(&input, &config, &calibration, time_offset, output.as_deref()),
        Commands::Trigger {
            input,
            cuts,
            calibration,
            mode,
            cut_string,
        } => trigger(&input, &cuts, &calibration, mode.into(), cut_string.as_deref()),
        Commands::Info { config } => {
            let config = FadcConfig::from_file(&config)?;
            println!("Integration window: NSA={} ns, NSB={} ns", config.window.nsa, config.window.nsb);
            println!(
                "Samples: {} after, {} before crossing",
                config.window.samples_after(),
                config.window.samples_before()
            );
            println!("Threshold: {} ADC over pedestal", config.threshold);
            println!("Max pulses: {}", config.max_pulses);
            match config.window_samples() {
                Some(samples) => println!("Readout window: {} samples", samples),
                None => println!("Readout window: unbounded"),
            }
            println!("Mode-7 timing: {}", config.mode7_timing);
            println!("SSP emulation: {}", config.ssp_emulation);
            println!("Running pedestal: {}", config.use_running_pedestal);
            println!("Pulse fitting: {}", config.use_fit);
            Ok(())
        }
    }
}

fn convert(input: &Path, config: &Path, calibration: &Path, time_offset: f64, output: Option<&Path>) -> Result<()> {
    let config = FadcConfig::from_file(config)?;
    let conditions = Arc::new(ConditionsHandle::new(channel_table_from_file(calibration)?));
    let mut converter = RawConverter::builder()
        .config(config)
        .conditions(conditions)
        .time_offset(time_offset)
        .build()?;

    let events: Vec<RawEvent> = serde_json::from_reader(BufReader::new(File::open(input)?))?;
    log::info!("converting {} events from {}", events.len(), input.display());

    let start = Instant::now();
    let hits = events
        .iter()
        .map(|event| converter.convert_event(event))
        .collect::<std::result::Result<Vec<Vec<CalibratedHit>>, _>>()?;
    let elapsed = start.elapsed();

    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, &hits)?;
    writeln!(writer)?;
    writer.flush()?;

    let stats = converter.statistics();
    eprintln!(
        "Converted {} events in {:.2}s: {} channels, {} pulses, {} hits, {} dropped",
        events.len(),
        elapsed.as_secs_f64(),
        stats.channels_processed,
        stats.pulses_found,
        stats.hits_produced,
        stats.channels_dropped
    );
    Ok(())
}

fn trigger(
    input: &Path,
    cuts: &Path,
    calibration: &Path,
    kind: TriggerKind,
    cut_string: Option<&str>,
) -> Result<()> {
    let mut config = TriggerCutConfig::from_file(cuts)?;
    if let Some(values) = cut_string {
        config.parse_cut_values(kind, values).map_err(fadcsim_core::Error::from)?;
    }
    let table: ChannelTable = channel_table_from_file(calibration)?;

    let cycles: Vec<Vec<Vec<CalibratedHit>>> = serde_json::from_reader(BufReader::new(File::open(input)?))?;
    let cycles = cycles
        .into_iter()
        .map(|cycle| cycle.into_iter().map(Cluster::new).collect::<fadcsim_core::Result<Vec<_>>>())
        .collect::<fadcsim_core::Result<Vec<_>>>()?;

    let mut evaluator = evaluator(kind, config).map_err(fadcsim_core::Error::from)?;
    evaluator.add_observer(Box::new(LogObserver));

    let mut records = Vec::new();
    for clusters in &cycles {
        if let Some(record) = evaluator.process_cycle(clusters, &table)? {
            records.push(record);
        }
    }

    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &records)?;
    writeln!(stdout)?;

    let stats = evaluator.statistics();
    eprintln!(
        "{} trigger: {} cycles ({} dead), {} of {} clusters passed, {} pairs tested, {} triggers",
        evaluator.name(),
        stats.cycles_processed,
        stats.cycles_in_dead_time,
        stats.clusters_passed,
        stats.clusters_seen,
        stats.pairs_tested,
        stats.triggers
    );
    Ok(())
}
