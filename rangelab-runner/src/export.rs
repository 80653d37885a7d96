//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats for analysis results:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: one row per session, and one row per derived rate
//! - **Markdown**: human-readable single-run report
//!
//! All persisted artifacts include a `schema_version` field. Newer versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rangelab_core::domain::clock;
use rangelab_core::outcome::StairstepMode;
use rangelab_core::stats::{DirectionalStats, HeldCount};
use rangelab_core::{AggregateStats, Direction};
use serde::Serialize;

use crate::result::{AnalysisResult, SessionSummary, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize an `AnalysisResult` to pretty JSON.
pub fn export_json(result: &AnalysisResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize AnalysisResult to JSON")
}

/// Deserialize an `AnalysisResult` from JSON, rejecting newer schema versions.
pub fn import_json(json: &str) -> Result<AnalysisResult> {
    let result: AnalysisResult =
        serde_json::from_str(json).context("failed to deserialize AnalysisResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export per-session summaries as CSV, one row per session.
pub fn export_sessions_csv(rows: &[SessionSummary]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in rows {
        wtr.serialize(row)?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One derived rate with its integer numerator and denominator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatRow {
    pub direction: Direction,
    pub metric: String,
    pub count: u64,
    pub total: u64,
    pub rate: Option<f64>,
}

impl StatRow {
    fn new(direction: Direction, metric: String, count: u64, total: u64) -> Self {
        let rate = (total > 0).then(|| count as f64 / total as f64);
        Self {
            direction,
            metric,
            count,
            total,
            rate,
        }
    }
}

/// Flatten the directional counts into rate rows, up before down.
pub fn stat_rows(stats: &AggregateStats) -> Vec<StatRow> {
    let mut rows = Vec::new();
    for direction in [Direction::Up, Direction::Down] {
        directional_rows(direction, stats.direction(direction), &mut rows);
    }
    rows
}

fn directional_rows(direction: Direction, d: &DirectionalStats, rows: &mut Vec<StatRow>) {
    rows.push(StatRow::new(direction, "close_confirmed".into(), d.close, d.samples));

    if let Some(revisit) = &d.revisit {
        for (i, cutoff) in revisit.cutoffs.iter().enumerate() {
            let at = clock::format(*cutoff);
            let split = [
                ("", revisit.combined(i)),
                ("/wick", revisit.wick.get(i).copied().unwrap_or_default()),
                ("/close", revisit.close.get(i).copied().unwrap_or_default()),
            ];
            for (suffix, HeldCount { held, total }) in split {
                rows.push(StatRow::new(
                    direction,
                    format!("revisit_held@{at}{suffix}"),
                    held,
                    total,
                ));
            }
        }
    }

    if let Some(chain) = &d.stairstep {
        for (i, &survivors) in chain.survivors.iter().enumerate() {
            let total = match chain.mode {
                StairstepMode::Cumulative => chain.base,
                StairstepMode::Conditional => chain.reached.get(i).copied().unwrap_or(0),
            };
            rows.push(StatRow::new(
                direction,
                format!("stairstep_step{}", i + 1),
                survivors,
                total,
            ));
        }
    }

    if let Some(trade) = &d.trade {
        for tier in &trade.tiers {
            rows.push(StatRow::new(
                direction,
                format!("trade_win@{}R", tier.target_r),
                tier.wins,
                tier.resolved(),
            ));
        }
    }

    if let Some(ext) = &d.extension {
        for (b, bucket) in ext.buckets.iter().enumerate() {
            let label = bucket_label(&ext.bucket_edges, b);
            for (m, multiple) in ext.multiples.iter().enumerate() {
                let hits = bucket.hits.get(m).copied().unwrap_or(0);
                rows.push(StatRow::new(
                    direction,
                    format!("extension_{multiple}x[{label}]"),
                    hits,
                    bucket.samples,
                ));
            }
        }
    }

    if let Some(mid) = &d.midpoint {
        for (metric, count) in [
            ("midpoint_first", mid.midpoint_first),
            ("midpoint_boundary_first", mid.boundary_first),
            ("midpoint_neither", mid.neither),
        ] {
            rows.push(StatRow::new(direction, metric.into(), count, mid.samples));
        }
    }

    if let Some(race) = &d.retrace_race {
        for leg in &race.legs {
            let at = format!("{}R/{}R", leg.fraction, race.target_r);
            rows.push(StatRow::new(
                direction,
                format!("race_retrace_first@{at}"),
                leg.retrace_first,
                leg.samples,
            ));
            rows.push(StatRow::new(
                direction,
                format!("race_target_first@{at}"),
                leg.target_first,
                leg.samples,
            ));
        }
    }
}

/// `<e0`, `e0-e1`, …, `>=eN` for bucket `b`.
fn bucket_label(edges: &[f64], b: usize) -> String {
    match (b.checked_sub(1).and_then(|i| edges.get(i)), edges.get(b)) {
        (None, Some(hi)) => format!("<{hi}"),
        (Some(lo), Some(hi)) => format!("{lo}-{hi}"),
        (Some(lo), None) => format!(">={lo}"),
        (None, None) => "all".to_string(),
    }
}

/// Export the derived rates as CSV.
pub fn export_stats_csv(stats: &AggregateStats) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in stat_rows(stats) {
        wtr.serialize(row)?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Directory name for a result: `{name}-{first 8 hex of run id}`.
pub fn artifact_dirname(result: &AnalysisResult) -> String {
    let run_id = result.run_id();
    format!("{}-{}", result.name, &run_id[..8])
}

/// Save the full artifact set for a single analysis run.
///
/// Creates `{name}-{hash8}/` under `output_dir` containing:
/// - `result.json`: the full `AnalysisResult`
/// - `sessions.csv`: one row per session
/// - `stats.csv`: derived rates with numerators and denominators
/// - `report.md`: human-readable summary
///
/// The hash covers both the config and the dataset, so re-running the same
/// pair overwrites its own directory and nothing else.
pub fn save_artifacts(result: &AnalysisResult, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(artifact_dirname(result));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write_atomic(&run_dir.join("result.json"), &export_json(result)?)?;
    write_atomic(
        &run_dir.join("sessions.csv"),
        &export_sessions_csv(&result.reports)?,
    )?;
    write_atomic(&run_dir.join("stats.csv"), &export_stats_csv(&result.stats)?)?;
    write_atomic(&run_dir.join("report.md"), &generate_report(result))?;

    Ok(run_dir)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, contents).with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("failed to rename to {}", path.display()))
}

/// Load an `AnalysisResult` from an artifact directory's result.json.
///
/// Rejects newer schema versions.
pub fn load_artifacts(dir: &Path) -> Result<AnalysisResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

fn pct(rate: Option<f64>) -> String {
    rate.map_or_else(|| "n/a".to_string(), |r| format!("{:.1}%", r * 100.0))
}

fn num(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.3}"))
}

/// Generate a Markdown report for a single analysis run.
pub fn generate_report(result: &AnalysisResult) -> String {
    let mut md = String::with_capacity(2048);
    let stats = &result.stats;
    let config = &result.config;

    md.push_str(&format!("# Range Report: {}\n\n", result.name));

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Timezone | {} |\n", config.timezone));
    md.push_str(&format!("| Reference | {} |\n", config.reference));
    md.push_str(&format!(
        "| Horizon | {}-{} |\n",
        clock::format(config.reference.end),
        clock::format(config.scan.end)
    ));
    if let Some(rollover) = config.session.rollover {
        md.push_str(&format!("| Rollover | {} |\n", clock::format(rollover)));
    }
    md.push_str(&format!("| Sessions | {} |\n", result.session_count));
    md.push_str(&format!("| Config Hash | {} |\n", result.config_hash));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    if result.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    md.push_str("## Sessions\n\n");
    md.push_str("| Bucket | Count |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Up breakouts | {} |\n", stats.up.samples));
    md.push_str(&format!("| Down breakouts | {} |\n", stats.down.samples));
    md.push_str(&format!("| No range | {} |\n", stats.skips.no_range));
    md.push_str(&format!("| No breakout | {} |\n", stats.skips.no_breakout));
    md.push_str(&format!("| Ambiguous | {} |\n", stats.skips.ambiguous));
    md.push_str(&format!("| No entry fill | {} |\n", stats.skips.no_entry_fill));
    md.push_str(&format!("| Degenerate risk | {} |\n", stats.skips.degenerate_risk));
    md.push_str(&format!("| No forward bar | {} |\n", stats.skips.no_forward_bar));
    md.push_str(&format!("| Range too wide | {} |\n", stats.skips.range_too_wide));
    md.push('\n');

    md.push_str("## Rates\n\n");
    md.push_str("| Direction | Metric | Count | Total | Rate |\n");
    md.push_str("| --- | --- | --- | --- | --- |\n");
    for row in stat_rows(stats) {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            row.direction.as_str(),
            row.metric,
            row.count,
            row.total,
            pct(row.rate)
        ));
    }
    md.push('\n');

    let tiers: Vec<_> = [Direction::Up, Direction::Down]
        .into_iter()
        .filter_map(|dir| stats.direction(dir).trade.as_ref().map(|t| (dir, t)))
        .collect();
    if !tiers.is_empty() {
        md.push_str("## Trade Tiers\n\n");
        md.push_str(
            "| Direction | Target | Trades | Wins | Losses | Open | Ambiguous | Expectancy (R) | Profit Factor |\n",
        );
        md.push_str("| --- | --- | --- | --- | --- | --- | --- | --- | --- |\n");
        for (dir, trade) in tiers {
            for t in &trade.tiers {
                md.push_str(&format!(
                    "| {} | {}R | {} | {} | {} | {} | {} | {} | {} |\n",
                    dir.as_str(),
                    t.target_r,
                    t.trades,
                    t.wins,
                    t.losses,
                    t.unresolved,
                    t.ambiguous,
                    num(t.expectancy()),
                    num(t.profit_factor())
                ));
            }
        }
        md.push('\n');
        md.push_str(
            "A bar that touches both stop and target is booked as a loss; the intrabar path is not known from OHLC.\n",
        );
    }

    let races: Vec<_> = [Direction::Up, Direction::Down]
        .into_iter()
        .filter_map(|dir| stats.direction(dir).retrace_race.as_ref().map(|r| (dir, r)))
        .collect();
    if !races.is_empty() {
        md.push_str("\n## Retrace Race\n\n");
        md.push_str(
            "| Direction | Retrace | Target | Samples | Retrace First | Target First | Neither | Same Bar |\n",
        );
        md.push_str("| --- | --- | --- | --- | --- | --- | --- | --- |\n");
        for (dir, race) in &races {
            for leg in &race.legs {
                md.push_str(&format!(
                    "| {} | {}R | {}R | {} | {} | {} | {} | {} |\n",
                    dir.as_str(),
                    leg.fraction,
                    race.target_r,
                    leg.samples,
                    pct(leg.retrace_rate()),
                    pct(leg.target_rate()),
                    leg.neither,
                    leg.same_bar
                ));
            }
        }
        let (no_forward, degenerate) = races.iter().fold((0, 0), |(f, d), (_, r)| {
            (f + r.no_forward_bar, d + r.degenerate_risk)
        });
        md.push_str(&format!(
            "\nNot raced: {no_forward} without a forward bar, {degenerate} with zero risk.\n"
        ));
    }

    md
}
