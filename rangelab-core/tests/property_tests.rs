//! Property tests for pipeline invariants.
//!
//! Uses proptest to verify:
//! 1. Partition coverage: every bar lands in exactly one session, in order
//! 2. Wrapping slices: union of head and tail equals the membership filter
//! 3. Direction exclusivity: every session is counted exactly once, and
//!    every breakout exactly once per race
//! 4. Stairstep monotonicity: broken/missing steps never recover
//! 5. Merge algebra: merge is commutative and associative

use chrono::{Duration, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::America::New_York;
use proptest::prelude::*;
use rangelab_core::outcome::{
    ExtensionParams, MidpointParams, MidpointTie, RaceTie, RetraceRaceParams, RevisitParams,
    StairstepMode, StairstepParams, StepResult, TradeParams,
};
use rangelab_core::{
    partition, AggregateStats, AnalyzerConfig, Bar, BarSeries, SessionAnalyzer, SessionRule,
    Window,
};

// ── Strategies (proptest) ────────────────────────────────────────────

const SLOTS_PER_DAY: usize = 48;

/// Per 30-minute slot: (present, return in points, wick size).
fn arb_day() -> impl Strategy<Value = Vec<(bool, f64, f64)>> {
    prop::collection::vec((any::<bool>(), -2.0..2.0_f64, 0.0..1.5_f64), SLOTS_PER_DAY)
}

fn arb_series() -> impl Strategy<Value = BarSeries> {
    prop::collection::vec(arb_day(), 1..4).prop_map(|days| {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut price = 100.0_f64;
        let mut bars = Vec::new();
        for (d, slots) in days.iter().enumerate() {
            let date = start + Duration::days(d as i64);
            for (i, &(present, ret, wick)) in slots.iter().enumerate() {
                if !present && !(d == 0 && i == 0) {
                    continue;
                }
                let local = date.and_hms_opt(0, 0, 0).unwrap() + Duration::minutes(30 * i as i64);
                let open = price;
                let close = (price + ret).max(1.0);
                bars.push(Bar {
                    timestamp: New_York.from_local_datetime(&local).single().unwrap(),
                    open,
                    high: open.max(close) + wick,
                    low: (open.min(close) - wick).max(0.5),
                    close,
                });
                price = close;
            }
        }
        BarSeries::new(bars).unwrap()
    })
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn with_policies(mut config: AnalyzerConfig, cutoffs: Vec<NaiveTime>) -> AnalyzerConfig {
    config.revisit = Some(RevisitParams { cutoffs });
    config.stairstep = Some(StairstepParams {
        max_steps: 4,
        mode: StairstepMode::Conditional,
    });
    config.trade = Some(TradeParams {
        retrace_fraction: 0.5,
        r_targets: vec![1.0, 2.0],
    });
    config.extension = Some(ExtensionParams {
        bucket_edges: vec![1.0, 3.0],
        multiples: vec![0.5, 1.0],
    });
    config.midpoint = Some(MidpointParams {
        max_range_size: Some(4.0),
        close_only: false,
        same_bar: MidpointTie::Midpoint,
    });
    config.retrace_race = Some(RetraceRaceParams {
        retrace_fractions: vec![0.5, 0.75],
        target_r: 1.0,
        same_bar: RaceTie::Retrace,
    });
    config
}

fn morning_config() -> AnalyzerConfig {
    with_policies(
        AnalyzerConfig::new(Window::new(t(9, 30), t(10, 30)), t(13, 0)),
        vec![t(11, 0), t(12, 30)],
    )
}

/// Evening range with a horizon that wraps midnight.
fn overnight_config() -> AnalyzerConfig {
    with_policies(
        AnalyzerConfig::new(Window::new(t(20, 0), t(22, 0)), t(2, 0)),
        vec![t(0, 0), t(1, 30)],
    )
}

fn aggregate(config: &AnalyzerConfig, rule: &SessionRule, series: &BarSeries) -> AggregateStats {
    let analyzer = SessionAnalyzer::new(config.clone()).unwrap();
    let mut stats = AggregateStats::new(config);
    for session in partition(series, rule) {
        stats.record(&analyzer.analyze(&session));
    }
    stats
}

// ── 1. Partition coverage ────────────────────────────────────────────

proptest! {
    #[test]
    fn partition_covers_every_bar_once(series in arb_series(), roll in any::<bool>()) {
        let rule = if roll { SessionRule::rolling_at(t(20, 0)) } else { SessionRule::calendar() };
        let sessions = partition(&series, &rule);

        let flattened: Vec<&Bar> = sessions.iter().flat_map(|s| s.bars()).collect();
        prop_assert_eq!(flattened.len(), series.len());
        for (a, b) in flattened.iter().zip(series.bars()) {
            prop_assert_eq!(*a, b);
        }
        prop_assert!(sessions.windows(2).all(|w| w[0].date() < w[1].date()));
        for s in &sessions {
            prop_assert!(s.bars().iter().all(|b| rule.trade_date(b) == s.date()));
        }
    }
}

// ── 2. Wrapping slices ───────────────────────────────────────────────

proptest! {
    #[test]
    fn wrapping_slice_matches_membership(
        series in arb_series(),
        start in 0u32..24,
        end in 0u32..24,
    ) {
        prop_assume!(start != end);
        let window = Window::new(t(start, 0), t(end, 0));
        for session in partition(&series, &SessionRule::rolling_at(t(20, 0))) {
            let sliced = session.slice(&window);
            let filtered: Vec<&Bar> = session
                .bars()
                .iter()
                .filter(|b| window.contains(b.time()))
                .collect();
            prop_assert_eq!(sliced, filtered);
        }
    }
}

// ── 3. Direction exclusivity ─────────────────────────────────────────

proptest! {
    #[test]
    fn every_session_counted_exactly_once(series in arb_series(), overnight in any::<bool>()) {
        let (config, rule) = if overnight {
            (overnight_config(), SessionRule::rolling_at(t(20, 0)))
        } else {
            (morning_config(), SessionRule::calendar())
        };
        let stats = aggregate(&config, &rule, &series);

        let accounted = stats.up.samples
            + stats.down.samples
            + stats.skips.no_range
            + stats.skips.no_breakout
            + stats.skips.ambiguous;
        prop_assert_eq!(accounted, stats.sessions);
        prop_assert_eq!(stats.up.samples, stats.up.wick + stats.up.close);
        prop_assert_eq!(stats.down.samples, stats.down.wick + stats.down.close);

        let raced: u64 = [&stats.up, &stats.down]
            .iter()
            .map(|d| d.midpoint.as_ref().map_or(0, |m| m.samples + m.unconfirmed))
            .sum();
        prop_assert_eq!(raced + stats.skips.range_too_wide, stats.samples());
        for dir in [&stats.up, &stats.down] {
            let race = dir.retrace_race.as_ref().unwrap();
            for leg in &race.legs {
                prop_assert_eq!(
                    leg.samples + race.no_forward_bar + race.degenerate_risk,
                    dir.samples
                );
            }
        }
    }
}

// ── 4. Stairstep monotonicity ────────────────────────────────────────

proptest! {
    #[test]
    fn stairstep_never_recovers(series in arb_series()) {
        let config = morning_config();
        let analyzer = SessionAnalyzer::new(config.clone()).unwrap();
        for session in partition(&series, &SessionRule::calendar()) {
            let report = analyzer.analyze(&session);
            let Some(record) = report.breakout().and_then(|b| b.stairstep.clone()).flatten() else {
                continue;
            };
            for pair in record.steps.windows(2) {
                match pair[0] {
                    StepResult::Broken => prop_assert_eq!(pair[1], StepResult::Broken),
                    StepResult::Missing => prop_assert_eq!(pair[1], StepResult::Missing),
                    StepResult::Held => {}
                }
            }
            prop_assert_ne!(record.steps[0], StepResult::Missing);
        }

        let stats = aggregate(&config, &SessionRule::calendar(), &series);
        for dir in [&stats.up, &stats.down] {
            let chain = dir.stairstep.as_ref().unwrap();
            prop_assert!(chain.survivors.windows(2).all(|w| w[0] >= w[1]));
            prop_assert!(chain.survivors.iter().zip(&chain.reached).all(|(s, r)| s <= r));
        }
    }
}

// ── 5. Merge algebra ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn merge_is_commutative_and_associative(
        a in arb_series(),
        b in arb_series(),
        c in arb_series(),
    ) {
        let config = morning_config();
        let rule = SessionRule::calendar();
        let sa = aggregate(&config, &rule, &a);
        let sb = aggregate(&config, &rule, &b);
        let sc = aggregate(&config, &rule, &c);

        let ab = sa.clone().merged(sb.clone());
        let ba = sb.clone().merged(sa.clone());
        prop_assert_eq!(&ab, &ba);

        let left = ab.merged(sc.clone());
        let right = sa.merged(sb.merged(sc));
        prop_assert_eq!(left, right);
    }
}
