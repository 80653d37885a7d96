//! RangeLab CLI: run, sweep, convert and inspect commands.
//!
//! Commands:
//! - `run`: analyze one TOML config over a bar file (or synthetic data)
//! - `sweep`: analyze several configs over the same bars in parallel
//! - `convert`: convert bar files between CSV and Parquet
//! - `inspect`: report bar count, span and session count of a bar file

use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use rangelab_core::data::{read_csv, read_parquet, write_csv, write_parquet};
use rangelab_core::domain::clock;
use rangelab_core::{partition, BarSeries, SessionRule};
use rangelab_runner::{
    load_series, run_analysis, run_sweep, save_artifacts, AnalysisConfig, AnalysisResult,
    DataSource, LoadOptions,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "rangelab",
    about = "RangeLab CLI: intraday range and breakout event statistics"
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one config over a bar file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Bar file (.csv or .parquet).
        #[arg(long)]
        data: Option<PathBuf>,

        /// Use synthetic data when no bar file is available.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Weekdays of synthetic data to generate.
        #[arg(long, default_value_t = 250)]
        synthetic_days: usize,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Analyze several configs over the same bars.
    Sweep {
        /// TOML config files; repeat the flag for each.
        #[arg(long = "config", required = true)]
        configs: Vec<PathBuf>,

        /// Bar file (.csv or .parquet).
        #[arg(long)]
        data: Option<PathBuf>,

        /// Use synthetic data when no bar file is available.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Weekdays of synthetic data to generate.
        #[arg(long, default_value_t = 250)]
        synthetic_days: usize,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Convert a bar file between CSV and Parquet.
    Convert {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,

        /// Zone used to express timestamps.
        #[arg(long, default_value = "America/New_York")]
        timezone: String,
    },
    /// Report bar count, span and session count.
    Inspect {
        #[arg(long)]
        data: PathBuf,

        #[arg(long, default_value = "America/New_York")]
        timezone: String,

        /// Session rollover time (HH:MM); calendar days when omitted.
        #[arg(long)]
        rollover: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            data,
            synthetic,
            synthetic_days,
            output_dir,
        } => run_cmd(&config, data, synthetic, synthetic_days, &output_dir),
        Commands::Sweep {
            configs,
            data,
            synthetic,
            synthetic_days,
            output_dir,
        } => sweep_cmd(&configs, data, synthetic, synthetic_days, &output_dir),
        Commands::Convert {
            input,
            output,
            timezone,
        } => convert_cmd(&input, &output, &timezone),
        Commands::Inspect {
            data,
            timezone,
            rollover,
        } => inspect_cmd(&data, &timezone, rollover.as_deref()),
    }
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `--verbose`.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn parse_tz(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| anyhow::anyhow!("unknown timezone '{name}'"))
}

fn load_options(
    data: Option<PathBuf>,
    synthetic: bool,
    synthetic_days: usize,
    label: &str,
    timezone: Tz,
) -> Result<LoadOptions> {
    if data.is_none() && !synthetic {
        bail!("one of --data or --synthetic is required");
    }
    Ok(LoadOptions {
        path: data,
        timezone,
        synthetic,
        synthetic_label: label.to_string(),
        synthetic_days,
    })
}

fn run_cmd(
    config_path: &Path,
    data: Option<PathBuf>,
    synthetic: bool,
    synthetic_days: usize,
    output_dir: &Path,
) -> Result<()> {
    let config = AnalysisConfig::from_file(config_path)?;
    tracing::info!(config = %config_path.display(), name = %config.name, "loaded config");
    let opts = load_options(
        data,
        synthetic,
        synthetic_days,
        &config.name,
        config.timezone()?,
    )?;
    let loaded = load_series(&opts)?;

    let result = run_analysis(&config, &loaded)?;
    print_summary(&result);

    let run_dir = save_artifacts(&result, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn sweep_cmd(
    config_paths: &[PathBuf],
    data: Option<PathBuf>,
    synthetic: bool,
    synthetic_days: usize,
    output_dir: &Path,
) -> Result<()> {
    let configs = config_paths
        .iter()
        .map(|p| {
            AnalysisConfig::from_file(p).with_context(|| format!("loading {}", p.display()))
        })
        .collect::<Result<Vec<_>>>()?;
    let Some(first) = configs.first() else {
        bail!("at least one --config is required");
    };

    let opts = load_options(data, synthetic, synthetic_days, &first.name, first.timezone()?)?;
    let loaded = load_series(&opts)?;
    let sweep = run_sweep(&configs, &loaded)?;

    println!(
        "{:<20} {:>8} {:>6} {:>6} {:>8} {:>8} {:>9}",
        "config", "sessions", "up", "down", "no_range", "no_break", "ambiguous"
    );
    for result in sweep.all() {
        let s = &result.stats;
        println!(
            "{:<20} {:>8} {:>6} {:>6} {:>8} {:>8} {:>9}",
            result.name,
            s.sessions,
            s.up.samples,
            s.down.samples,
            s.skips.no_range,
            s.skips.no_breakout,
            s.skips.ambiguous
        );
    }

    for result in sweep.all() {
        let run_dir = save_artifacts(result, output_dir)?;
        println!("{}: {}", result.name, run_dir.display());
    }
    Ok(())
}

fn read_bars(path: &Path, tz: Tz) -> Result<BarSeries> {
    let series = match DataSource::from_path(path)? {
        DataSource::Parquet => read_parquet(path, tz)?,
        _ => read_csv(path, tz)?,
    };
    Ok(series)
}

fn convert_cmd(input: &Path, output: &Path, timezone: &str) -> Result<()> {
    let tz = parse_tz(timezone)?;
    let series = read_bars(input, tz)
        .with_context(|| format!("reading {}", input.display()))?;
    match DataSource::from_path(output)? {
        DataSource::Parquet => write_parquet(output, &series)?,
        _ => write_csv(output, &series)?,
    }
    println!(
        "Converted {} bars: {} -> {}",
        series.len(),
        input.display(),
        output.display()
    );
    Ok(())
}

fn inspect_cmd(data: &Path, timezone: &str, rollover: Option<&str>) -> Result<()> {
    let tz = parse_tz(timezone)?;
    let series = read_bars(data, tz).with_context(|| format!("reading {}", data.display()))?;
    let rule = match rollover {
        Some(t) => SessionRule::rolling_at(
            clock::parse(t).with_context(|| format!("bad rollover time '{t}'"))?,
        ),
        None => SessionRule::calendar(),
    };
    let sessions = partition(&series, &rule);

    println!("File:      {}", data.display());
    println!("Bars:      {}", series.len());
    println!("First bar: {}", series.first().timestamp.to_rfc3339());
    println!("Last bar:  {}", series.last().timestamp.to_rfc3339());
    println!("Sessions:  {}", sessions.len());
    if let (Some(first), Some(last)) = (sessions.first(), sessions.last()) {
        println!("Dates:     {} to {}", first.date(), last.date());
    }
    Ok(())
}

fn pct(rate: Option<f64>) -> String {
    rate.map_or_else(|| "n/a".to_string(), |r| format!("{:.1}%", r * 100.0))
}

fn print_summary(result: &AnalysisResult) {
    let s = &result.stats;
    println!("=== {} ===", result.name);
    if result.has_synthetic {
        println!("Data:         SYNTHETIC");
    }
    println!("Sessions:     {}", s.sessions);
    println!("Up breaks:    {}", s.up.samples);
    println!("Down breaks:  {}", s.down.samples);
    println!(
        "Skipped:      no_range={} no_breakout={} ambiguous={}",
        s.skips.no_range, s.skips.no_breakout, s.skips.ambiguous
    );
    println!(
        "Close-confirmed: up {} / down {}",
        pct(s.up.close_rate()),
        pct(s.down.close_rate())
    );

    if let (Some(up), Some(down)) = (&s.up.revisit, &s.down.revisit) {
        for (i, cutoff) in up.cutoffs.iter().enumerate() {
            println!(
                "Held to {}:  up {} / down {}",
                clock::format(*cutoff),
                pct(up.combined(i).rate()),
                pct(down.combined(i).rate())
            );
        }
    }

    if let (Some(up), Some(down)) = (&s.up.stairstep, &s.down.stairstep) {
        for n in 1..=up.survivors.len() {
            println!(
                "Stairstep {n}:  up {} / down {}",
                pct(up.rate(n)),
                pct(down.rate(n))
            );
        }
    }

    if let (Some(up), Some(down)) = (&s.up.trade, &s.down.trade) {
        for (u, d) in up.tiers.iter().zip(&down.tiers) {
            println!(
                "Trade {}R:     win up {} / down {}  (fills {} / {})",
                u.target_r,
                pct(u.win_rate()),
                pct(d.win_rate()),
                u.trades,
                d.trades
            );
        }
        println!(
            "Trade skips:  no_entry_fill={} degenerate_risk={}",
            s.skips.no_entry_fill, s.skips.degenerate_risk
        );
    }

    if let (Some(up), Some(down)) = (&s.up.midpoint, &s.down.midpoint) {
        println!(
            "Midpoint 1st: up {} / down {}  (range_too_wide={})",
            pct(up.midpoint_rate()),
            pct(down.midpoint_rate()),
            s.skips.range_too_wide
        );
    }

    if let (Some(up), Some(down)) = (&s.up.retrace_race, &s.down.retrace_race) {
        for (u, d) in up.legs.iter().zip(&down.legs) {
            println!(
                "Retrace {}R:  before {}R up {} / down {}",
                u.fraction,
                up.target_r,
                pct(u.retrace_rate()),
                pct(d.retrace_rate())
            );
        }
    }
}
