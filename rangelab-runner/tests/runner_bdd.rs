//! BDD tests for the runner: configs, loading, runs, sweeps, artifacts.
//!
//! These tests drive the public API end to end:
//! - TOML config file + CSV bars → result → artifact directory
//! - CSV and Parquet inputs agree
//! - Overnight sessions with a rollover time
//! - Sweeps over several configurations
//! - Synthetic data is tagged all the way into artifacts
//! - Midpoint and retrace races reach the stats and session rows

use chrono_tz::America::New_York;
use rangelab_core::data::{read_csv, write_parquet};
use rangelab_core::Direction;
use rangelab_runner::{
    load_artifacts, load_series, run_analysis, run_sweep, save_artifacts, AnalysisConfig,
    DataSource, LoadOptions,
};
use std::path::{Path, PathBuf};

// ─── Helpers ────────────────────────────────────────────────────────

const AM_MACRO: &str = r#"
name = "am_macro"
timezone = "America/New_York"

[reference]
start = "09:50"
end = "10:10"

[scan]
end = "12:00"

[revisit]
cutoffs = ["11:00", "12:00"]

[stairstep]
max_steps = 4
mode = "cumulative"

[trade]
retrace_fraction = 0.5
r_targets = [1.0, 1.5, 2.0]
"#;

fn write_file(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

/// Day 2: clean upside break. Day 3: first post-range bar crosses both
/// sides. Day 4: no bar in the reference window.
const TWO_SESSION_CSV: &str = "\
timestamp,open,high,low,close
2024-01-02T09:50:00-05:00,105,110,100,105
2024-01-02T10:10:00-05:00,109,112,108,111
2024-01-02T10:15:00-05:00,111,113,109,112
2024-01-03T09:50:00-05:00,105,110,100,105
2024-01-03T10:10:00-05:00,105,111,99,104
2024-01-03T10:15:00-05:00,104,125,103,124
2024-01-04T11:00:00-05:00,100,101,99,100
";

// ─── Scenarios ──────────────────────────────────────────────────────

#[test]
fn bdd_scenario_run_config_file_over_csv_and_save_artifacts() {
    // GIVEN a config file and a CSV bar file on disk
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_file(dir.path(), "am_macro.toml", AM_MACRO);
    let bars_path = write_file(dir.path(), "bars.csv", TWO_SESSION_CSV);

    let config = AnalysisConfig::from_file(&config_path).unwrap();
    let data = load_series(&LoadOptions::from_path(&bars_path, New_York)).unwrap();
    assert_eq!(data.source, DataSource::Csv);

    // WHEN the analysis runs
    let result = run_analysis(&config, &data).unwrap();

    // THEN every session lands in exactly one bucket
    assert_eq!(result.session_count, 3);
    assert_eq!(result.stats.sessions, 3);
    assert_eq!(result.stats.up.samples, 1);
    assert_eq!(result.stats.down.samples, 0);
    assert_eq!(result.stats.skips.ambiguous, 1);
    assert_eq!(result.stats.skips.no_range, 1);

    // AND the per-session rows say why
    let outcomes: Vec<&str> = result.reports.iter().map(|r| r.outcome.as_str()).collect();
    assert_eq!(outcomes, ["breakout", "ambiguous", "no_range"]);
    assert_eq!(result.reports[0].direction, Some(Direction::Up));

    // WHEN artifacts are saved
    let out = dir.path().join("results");
    let run_dir = save_artifacts(&result, &out).unwrap();

    // THEN they can be loaded back with the same counts
    let loaded = load_artifacts(&run_dir).unwrap();
    assert_eq!(loaded.stats, result.stats);
    assert_eq!(loaded.config, config);
    assert!(!loaded.has_synthetic);

    // AND the sessions CSV has a header plus one row per session
    let sessions = std::fs::read_to_string(run_dir.join("sessions.csv")).unwrap();
    assert_eq!(sessions.lines().count(), 4);
}

#[test]
fn bdd_scenario_csv_and_parquet_inputs_agree() {
    // GIVEN the same bars stored as CSV and as Parquet
    let dir = tempfile::tempdir().unwrap();
    let csv_path = write_file(dir.path(), "bars.csv", TWO_SESSION_CSV);
    let parquet_path = dir.path().join("bars.parquet");
    let series = read_csv(&csv_path, New_York).unwrap();
    write_parquet(&parquet_path, &series).unwrap();

    // WHEN both are loaded and analyzed with one config
    let config = AnalysisConfig::from_toml(AM_MACRO).unwrap();
    let from_csv = load_series(&LoadOptions::from_path(&csv_path, New_York)).unwrap();
    let from_parquet = load_series(&LoadOptions::from_path(&parquet_path, New_York)).unwrap();
    assert_eq!(from_parquet.source, DataSource::Parquet);

    // THEN the datasets hash identically and the results match
    assert_eq!(from_csv.dataset_hash, from_parquet.dataset_hash);
    let a = run_analysis(&config, &from_csv).unwrap();
    let b = run_analysis(&config, &from_parquet).unwrap();
    assert_eq!(a, b);
}

#[test]
fn bdd_scenario_overnight_session_with_rollover() {
    // GIVEN an evening range that rolls into the next trade date and a
    // horizon that wraps midnight
    let config = AnalysisConfig::from_toml(
        r#"
name = "overnight"
timezone = "America/New_York"

[session]
rollover = "18:00"

[reference]
start = "18:00"
end = "20:00"

[scan]
end = "02:00"

[revisit]
cutoffs = ["00:00", "02:00"]
"#,
    )
    .unwrap();

    // AND bars where the low is revisited at 01:00
    let dir = tempfile::tempdir().unwrap();
    let bars = write_file(
        dir.path(),
        "overnight.csv",
        "\
timestamp,open,high,low,close
2024-01-02T18:00:00-05:00,100,101,99,100
2024-01-02T19:00:00-05:00,100,100.5,99.5,100
2024-01-02T20:00:00-05:00,100.5,102,100,101.5
2024-01-03T01:00:00-05:00,101,101,98.5,99
",
    );
    let data = load_series(&LoadOptions::from_path(&bars, New_York)).unwrap();

    // WHEN the analysis runs
    let result = run_analysis(&config, &data).unwrap();

    // THEN all four bars form one session dated the next day
    assert_eq!(result.session_count, 1);
    let row = &result.reports[0];
    assert_eq!(row.date.to_string(), "2024-01-03");

    // AND the upside break held through midnight but not through 02:00
    assert_eq!(row.direction, Some(Direction::Up));
    assert_eq!(row.revisit.as_deref(), Some("00:00:held;02:00:broken"));
    let revisit = result.stats.up.revisit.as_ref().unwrap();
    assert_eq!(revisit.combined(0).rate(), Some(1.0));
    assert_eq!(revisit.combined(1).rate(), Some(0.0));
}

#[test]
fn bdd_scenario_sweep_several_configs_over_one_series() {
    // GIVEN one synthetic series and three reference windows
    let data = load_series(&LoadOptions::synthetic("ES", 40, New_York)).unwrap();
    let windows = [
        ("open", "09:30", "10:00"),
        ("macro", "09:50", "10:10"),
        ("late", "10:30", "10:45"),
    ];
    let configs: Vec<AnalysisConfig> = windows
        .iter()
        .map(|(name, start, end)| {
            let text = AM_MACRO
                .replace("am_macro", name)
                .replace("09:50", start)
                .replace("10:10", end);
            AnalysisConfig::from_toml(&text).unwrap()
        })
        .collect();

    // WHEN the sweep runs
    let sweep = run_sweep(&configs, &data).unwrap();

    // THEN each configuration is evaluated independently
    assert_eq!(sweep.len(), 3);
    for (config, result) in configs.iter().zip(sweep.all()) {
        assert_eq!(result, &run_analysis(config, &data).unwrap());
        assert_eq!(result.stats.sessions, 40);
    }

    // AND distinct configs get distinct hashes
    let mut hashes: Vec<&str> = sweep.all().iter().map(|r| r.config_hash.as_str()).collect();
    hashes.sort_unstable();
    hashes.dedup();
    assert_eq!(hashes.len(), 3);
}

#[test]
fn bdd_scenario_synthetic_results_are_tagged() {
    // GIVEN no data file but synthetic fallback enabled
    let mut opts = LoadOptions::from_path("/nonexistent/es.parquet", New_York);
    opts.synthetic = true;
    opts.synthetic_days = 10;

    // WHEN the analysis runs and artifacts are saved
    let data = load_series(&opts).unwrap();
    let result = run_analysis(&AnalysisConfig::from_toml(AM_MACRO).unwrap(), &data).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let run_dir = save_artifacts(&result, dir.path()).unwrap();

    // THEN the synthetic tag survives into every artifact
    assert!(result.has_synthetic);
    assert!(load_artifacts(&run_dir).unwrap().has_synthetic);
    let report = std::fs::read_to_string(run_dir.join("report.md")).unwrap();
    assert!(report.contains("SYNTHETIC"));
}

#[test]
fn bdd_scenario_rerun_is_idempotent() {
    // GIVEN a config and a series
    let data = load_series(&LoadOptions::synthetic("NQ", 25, New_York)).unwrap();
    let config = AnalysisConfig::from_toml(AM_MACRO).unwrap();

    // WHEN the same analysis runs twice and both are saved
    let dir = tempfile::tempdir().unwrap();
    let first = run_analysis(&config, &data).unwrap();
    let second = run_analysis(&config, &data).unwrap();
    let d1 = save_artifacts(&first, dir.path()).unwrap();
    let d2 = save_artifacts(&second, dir.path()).unwrap();

    // THEN results and artifact paths are identical
    assert_eq!(first, second);
    assert_eq!(d1, d2);
    assert_eq!(
        std::fs::read_to_string(d1.join("result.json")).unwrap(),
        std::fs::read_to_string(d2.join("result.json")).unwrap()
    );
}

#[test]
fn bdd_scenario_bad_bars_fail_the_run() {
    // GIVEN a CSV whose timestamps go backwards
    let dir = tempfile::tempdir().unwrap();
    let bars = write_file(
        dir.path(),
        "bad.csv",
        "\
timestamp,open,high,low,close
2024-01-02T10:00:00-05:00,100,101,99,100
2024-01-02T09:55:00-05:00,100,101,99,100
",
    );

    // WHEN it is loaded
    let err = load_series(&LoadOptions::from_path(&bars, New_York)).unwrap_err();

    // THEN the precondition violation surfaces as a data error
    assert!(err.to_string().contains("precondition violated"));
}

#[test]
fn bdd_scenario_midpoint_and_retrace_races_reach_rows_and_stats() {
    // GIVEN a config racing the midpoint and two retrace depths
    let text = format!(
        "{AM_MACRO}\n[midpoint]\n\n[retrace_race]\nretrace_fractions = [0.5, 0.75]\n"
    );
    let config = AnalysisConfig::from_toml(&text).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let bars_path = write_file(dir.path(), "bars.csv", TWO_SESSION_CSV);
    let data = load_series(&LoadOptions::from_path(&bars_path, New_York)).unwrap();

    // WHEN the analysis runs
    let result = run_analysis(&config, &data).unwrap();

    // THEN the one breakout never revisits the midpoint, retraces half an R
    // before the target, and never reaches three quarters
    let mid = result.stats.up.midpoint.as_ref().unwrap();
    assert_eq!((mid.samples, mid.neither), (1, 1));
    let race = result.stats.up.retrace_race.as_ref().unwrap();
    assert_eq!(race.legs[0].retrace_first, 1);
    assert_eq!(race.legs[1].neither, 1);

    // AND the session row spells it out
    let row = &result.reports[0];
    assert_eq!(row.midpoint.as_deref(), Some("neither"));
    assert_eq!(row.retrace_race.as_deref(), Some("0.5:retrace;0.75:neither"));

    // WHEN the range cap is tighter than the 10-point range
    let capped_text = text.replace("[midpoint]", "[midpoint]\nmax_range_size = 5.0");
    let capped = AnalysisConfig::from_toml(&capped_text).unwrap();
    let result = run_analysis(&capped, &data).unwrap();

    // THEN the breakout is tallied as a skip instead of a race sample
    assert_eq!(result.stats.skips.range_too_wide, 1);
    assert_eq!(result.stats.up.midpoint.as_ref().unwrap().samples, 0);
    assert_eq!(result.reports[0].midpoint.as_deref(), Some("range_too_wide"));
}

#[test]
fn bdd_scenario_shipped_configs_are_valid() {
    // GIVEN the configs shipped at the workspace root
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../configs");

    // WHEN each one is loaded
    for name in ["am_macro.toml", "overnight.toml"] {
        let config = AnalysisConfig::from_file(&dir.join(name)).unwrap();

        // THEN it validates and has a stable hash
        assert!(config.validate().is_ok());
        assert_eq!(config.config_hash().unwrap().len(), 64);
    }
}
