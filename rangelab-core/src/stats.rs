//! Aggregation of session reports into counts and rates.
//!
//! Only integer counts are accumulated. Rates are derived on read from the
//! counts and the configuration values stored alongside them, so merging
//! partial aggregates in any order gives bit-identical results.

use crate::analyzer::{AnalyzerConfig, BreakoutReport, SessionOutcome, SessionReport};
use crate::domain::{clock, Confirmation, Direction};
use crate::outcome::{
    CutoffResult, ExtensionRecord, MidpointRecord, RaceLevel, RaceOutcome, RaceRecord,
    StairstepMode, StairstepRecord, StepResult, TierOutcome, TradeRecord,
};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

fn ratio(num: u64, den: u64) -> Option<f64> {
    (den > 0).then(|| num as f64 / den as f64)
}

/// Sum `other` into `dst` element-wise, growing `dst` if needed.
fn add_counts(dst: &mut Vec<u64>, other: &[u64]) {
    if dst.len() < other.len() {
        dst.resize(other.len(), 0);
    }
    for (d, o) in dst.iter_mut().zip(other) {
        *d += o;
    }
}

/// Merge optional sub-aggregates: sum when both exist, otherwise keep
/// whichever side has one.
fn merge_opt<T: Clone>(dst: &mut Option<T>, other: &Option<T>, merge: impl FnOnce(&mut T, &T)) {
    match (dst.as_mut(), other) {
        (Some(d), Some(o)) => merge(d, o),
        (None, Some(o)) => *dst = Some(o.clone()),
        _ => {}
    }
}

// ── Skip tally ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipTally {
    pub no_range: u64,
    pub no_breakout: u64,
    pub ambiguous: u64,
    pub no_entry_fill: u64,
    pub degenerate_risk: u64,
    pub no_forward_bar: u64,
    /// Breakouts left out of the midpoint race by its range-size cap.
    #[serde(default)]
    pub range_too_wide: u64,
}

impl SkipTally {
    pub fn merge(&mut self, other: &Self) {
        self.no_range += other.no_range;
        self.no_breakout += other.no_breakout;
        self.ambiguous += other.ambiguous;
        self.no_entry_fill += other.no_entry_fill;
        self.degenerate_risk += other.degenerate_risk;
        self.no_forward_bar += other.no_forward_bar;
        self.range_too_wide += other.range_too_wide;
    }

    pub fn total(&self) -> u64 {
        self.no_range
            + self.no_breakout
            + self.ambiguous
            + self.no_entry_fill
            + self.degenerate_risk
            + self.no_forward_bar
            + self.range_too_wide
    }
}

// ── Revisit ─────────────────────────────────────────────────────────

/// Held / evaluated counts for one cutoff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeldCount {
    pub held: u64,
    pub total: u64,
}

impl HeldCount {
    pub fn rate(&self) -> Option<f64> {
        ratio(self.held, self.total)
    }

    fn add(&mut self, other: &Self) {
        self.held += other.held;
        self.total += other.total;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisitStats {
    #[serde(with = "clock::list")]
    pub cutoffs: Vec<NaiveTime>,
    /// Per cutoff, wick-confirmed breakouts only.
    pub wick: Vec<HeldCount>,
    /// Per cutoff, close-confirmed breakouts only.
    pub close: Vec<HeldCount>,
}

impl RevisitStats {
    pub fn new(cutoffs: &[NaiveTime]) -> Self {
        Self {
            cutoffs: cutoffs.to_vec(),
            wick: vec![HeldCount::default(); cutoffs.len()],
            close: vec![HeldCount::default(); cutoffs.len()],
        }
    }

    fn record(&mut self, confirmation: Confirmation, results: &[CutoffResult]) {
        let split = match confirmation {
            Confirmation::Wick => &mut self.wick,
            Confirmation::Close => &mut self.close,
        };
        if split.len() < results.len() {
            split.resize(results.len(), HeldCount::default());
        }
        for (count, result) in split.iter_mut().zip(results) {
            count.total += 1;
            if result.held {
                count.held += 1;
            }
        }
    }

    /// Wick and close combined for cutoff `i`.
    pub fn combined(&self, i: usize) -> HeldCount {
        let mut out = HeldCount::default();
        if let Some(w) = self.wick.get(i) {
            out.add(w);
        }
        if let Some(c) = self.close.get(i) {
            out.add(c);
        }
        out
    }

    pub fn merge(&mut self, other: &Self) {
        for (dst, src) in [(&mut self.wick, &other.wick), (&mut self.close, &other.close)] {
            if dst.len() < src.len() {
                dst.resize(src.len(), HeldCount::default());
            }
            for (d, o) in dst.iter_mut().zip(src) {
                d.add(o);
            }
        }
        if self.cutoffs.len() < other.cutoffs.len() {
            self.cutoffs = other.cutoffs.clone();
        }
    }
}

// ── Stairstep ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StairstepStats {
    pub mode: StairstepMode,
    /// Events where at least candle 1 existed.
    pub base: u64,
    /// `survivors[n - 1]`: steps 1..=n all held.
    pub survivors: Vec<u64>,
    /// `reached[n - 1]`: steps 1..n held and candle n exists.
    pub reached: Vec<u64>,
}

impl StairstepStats {
    pub fn new(max_steps: usize, mode: StairstepMode) -> Self {
        Self {
            mode,
            base: 0,
            survivors: vec![0; max_steps],
            reached: vec![0; max_steps],
        }
    }

    fn record(&mut self, record: &StairstepRecord) {
        self.base += 1;
        let len = record.steps.len();
        if self.survivors.len() < len {
            self.survivors.resize(len, 0);
            self.reached.resize(len, 0);
        }
        let held = record.held_run();
        for (i, step) in record.steps.iter().enumerate() {
            if i > held {
                break;
            }
            if *step != StepResult::Missing {
                self.reached[i] += 1;
            }
            if *step == StepResult::Held {
                self.survivors[i] += 1;
            }
        }
    }

    /// `survivors(n) / base`, with `n` counted from 1.
    pub fn cumulative_rate(&self, n: usize) -> Option<f64> {
        let survivors = *self.survivors.get(n.checked_sub(1)?)?;
        ratio(survivors, self.base)
    }

    /// `survivors(n) / reached(n)`, with `n` counted from 1.
    pub fn conditional_rate(&self, n: usize) -> Option<f64> {
        let i = n.checked_sub(1)?;
        ratio(*self.survivors.get(i)?, *self.reached.get(i)?)
    }

    /// Rate selected by the configured mode.
    pub fn rate(&self, n: usize) -> Option<f64> {
        match self.mode {
            StairstepMode::Cumulative => self.cumulative_rate(n),
            StairstepMode::Conditional => self.conditional_rate(n),
        }
    }

    pub fn merge(&mut self, other: &Self) {
        self.base += other.base;
        add_counts(&mut self.survivors, &other.survivors);
        add_counts(&mut self.reached, &other.reached);
    }
}

// ── Trade ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierStats {
    pub target_r: f64,
    /// Filled trades, resolved or not.
    pub trades: u64,
    pub wins: u64,
    pub losses: u64,
    pub unresolved: u64,
    /// Losses booked because stop and target shared a bar.
    pub ambiguous: u64,
}

impl TierStats {
    pub fn new(target_r: f64) -> Self {
        Self {
            target_r,
            trades: 0,
            wins: 0,
            losses: 0,
            unresolved: 0,
            ambiguous: 0,
        }
    }

    pub fn resolved(&self) -> u64 {
        self.wins + self.losses
    }

    /// Wins over resolved trades.
    pub fn win_rate(&self) -> Option<f64> {
        ratio(self.wins, self.resolved())
    }

    /// Gross R won over gross R lost; `None` without losses.
    pub fn profit_factor(&self) -> Option<f64> {
        (self.losses > 0).then(|| self.wins as f64 * self.target_r / self.losses as f64)
    }

    /// Mean R per filled trade, unresolved trades counting as zero.
    pub fn expectancy(&self) -> Option<f64> {
        (self.trades > 0).then(|| {
            (self.wins as f64 * self.target_r - self.losses as f64) / self.trades as f64
        })
    }

    fn merge(&mut self, other: &Self) {
        self.trades += other.trades;
        self.wins += other.wins;
        self.losses += other.losses;
        self.unresolved += other.unresolved;
        self.ambiguous += other.ambiguous;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeStats {
    pub tiers: Vec<TierStats>,
}

impl TradeStats {
    pub fn new(r_targets: &[f64]) -> Self {
        Self {
            tiers: r_targets.iter().map(|&k| TierStats::new(k)).collect(),
        }
    }

    pub fn merge(&mut self, other: &Self) {
        let start = self.tiers.len();
        if start < other.tiers.len() {
            self.tiers
                .extend(other.tiers[start..].iter().map(|t| TierStats::new(t.target_r)));
        }
        for (d, o) in self.tiers.iter_mut().zip(&other.tiers) {
            d.merge(o);
        }
    }
}

// ── Extension ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketStats {
    pub samples: u64,
    /// Per multiple, sessions whose excursion reached it.
    pub hits: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionStats {
    pub bucket_edges: Vec<f64>,
    pub multiples: Vec<f64>,
    pub buckets: Vec<BucketStats>,
    /// Breakouts from zero-size ranges.
    pub not_evaluated: u64,
}

impl ExtensionStats {
    pub fn new(bucket_edges: &[f64], multiples: &[f64]) -> Self {
        let bucket = BucketStats {
            samples: 0,
            hits: vec![0; multiples.len()],
        };
        Self {
            bucket_edges: bucket_edges.to_vec(),
            multiples: multiples.to_vec(),
            buckets: vec![bucket; bucket_edges.len() + 1],
            not_evaluated: 0,
        }
    }

    fn record(&mut self, record: Option<&ExtensionRecord>) {
        let Some(record) = record else {
            self.not_evaluated += 1;
            return;
        };
        if self.buckets.len() <= record.bucket {
            self.buckets.resize(record.bucket + 1, BucketStats::default());
        }
        let bucket = &mut self.buckets[record.bucket];
        bucket.samples += 1;
        if bucket.hits.len() < record.reached_at.len() {
            bucket.hits.resize(record.reached_at.len(), 0);
        }
        for (i, count) in bucket.hits.iter_mut().enumerate() {
            if record.hit(i) {
                *count += 1;
            }
        }
    }

    /// Hit rate of multiple `m` within bucket `b`.
    pub fn hit_rate(&self, b: usize, m: usize) -> Option<f64> {
        let bucket = self.buckets.get(b)?;
        ratio(*bucket.hits.get(m)?, bucket.samples)
    }

    pub fn merge(&mut self, other: &Self) {
        if self.buckets.len() < other.buckets.len() {
            self.buckets.resize(other.buckets.len(), BucketStats::default());
        }
        for (d, o) in self.buckets.iter_mut().zip(&other.buckets) {
            d.samples += o.samples;
            add_counts(&mut d.hits, &o.hits);
        }
        self.not_evaluated += other.not_evaluated;
    }
}

// ── Midpoint race ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidpointStats {
    /// Breakouts that entered the race.
    pub samples: u64,
    pub midpoint_first: u64,
    pub boundary_first: u64,
    pub neither: u64,
    /// Resolved on a bar that reached both levels.
    pub same_bar: u64,
    /// Wick-only breakouts left out under `close_only`.
    pub unconfirmed: u64,
}

impl MidpointStats {
    fn record(&mut self, record: &MidpointRecord) {
        match record {
            MidpointRecord::Touched { level, same_bar, .. } => {
                self.samples += 1;
                match level {
                    RaceLevel::Midpoint => self.midpoint_first += 1,
                    RaceLevel::Boundary => self.boundary_first += 1,
                }
                if *same_bar {
                    self.same_bar += 1;
                }
            }
            MidpointRecord::Neither => {
                self.samples += 1;
                self.neither += 1;
            }
            MidpointRecord::Unconfirmed => self.unconfirmed += 1,
            MidpointRecord::RangeTooWide => {}
        }
    }

    pub fn midpoint_rate(&self) -> Option<f64> {
        ratio(self.midpoint_first, self.samples)
    }

    pub fn boundary_rate(&self) -> Option<f64> {
        ratio(self.boundary_first, self.samples)
    }

    pub fn neither_rate(&self) -> Option<f64> {
        ratio(self.neither, self.samples)
    }

    pub fn merge(&mut self, other: &Self) {
        self.samples += other.samples;
        self.midpoint_first += other.midpoint_first;
        self.boundary_first += other.boundary_first;
        self.neither += other.neither;
        self.same_bar += other.same_bar;
        self.unconfirmed += other.unconfirmed;
    }
}

// ── Retrace race ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceLegStats {
    pub fraction: f64,
    pub samples: u64,
    pub retrace_first: u64,
    pub target_first: u64,
    pub neither: u64,
    pub same_bar: u64,
}

impl RaceLegStats {
    pub fn new(fraction: f64) -> Self {
        Self {
            fraction,
            samples: 0,
            retrace_first: 0,
            target_first: 0,
            neither: 0,
            same_bar: 0,
        }
    }

    pub fn retrace_rate(&self) -> Option<f64> {
        ratio(self.retrace_first, self.samples)
    }

    pub fn target_rate(&self) -> Option<f64> {
        ratio(self.target_first, self.samples)
    }

    fn merge(&mut self, other: &Self) {
        self.samples += other.samples;
        self.retrace_first += other.retrace_first;
        self.target_first += other.target_first;
        self.neither += other.neither;
        self.same_bar += other.same_bar;
    }
}

/// Kept apart from [`SkipTally`] so that the race and the trade policy
/// never count the same breakout twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceStats {
    pub target_r: f64,
    pub legs: Vec<RaceLegStats>,
    pub no_forward_bar: u64,
    pub degenerate_risk: u64,
}

impl RaceStats {
    pub fn new(retrace_fractions: &[f64], target_r: f64) -> Self {
        Self {
            target_r,
            legs: retrace_fractions.iter().map(|&f| RaceLegStats::new(f)).collect(),
            no_forward_bar: 0,
            degenerate_risk: 0,
        }
    }

    fn grow_to(&mut self, fractions: impl Iterator<Item = f64>) {
        let start = self.legs.len();
        self.legs.extend(fractions.skip(start).map(RaceLegStats::new));
    }

    fn record(&mut self, record: &RaceRecord) {
        let run = match record {
            RaceRecord::Raced(run) => run,
            RaceRecord::NoForwardBar => {
                self.no_forward_bar += 1;
                return;
            }
            RaceRecord::DegenerateRisk => {
                self.degenerate_risk += 1;
                return;
            }
        };
        if self.legs.len() < run.legs.len() {
            self.grow_to(run.legs.iter().map(|l| l.fraction));
        }
        for (agg, leg) in self.legs.iter_mut().zip(&run.legs) {
            agg.samples += 1;
            match leg.outcome {
                RaceOutcome::RetraceFirst => agg.retrace_first += 1,
                RaceOutcome::TargetFirst => agg.target_first += 1,
                RaceOutcome::Neither => agg.neither += 1,
            }
            if leg.same_bar {
                agg.same_bar += 1;
            }
        }
    }

    pub fn merge(&mut self, other: &Self) {
        if self.legs.len() < other.legs.len() {
            self.grow_to(other.legs.iter().map(|l| l.fraction));
        }
        for (d, o) in self.legs.iter_mut().zip(&other.legs) {
            d.merge(o);
        }
        self.no_forward_bar += other.no_forward_bar;
        self.degenerate_risk += other.degenerate_risk;
    }
}

// ── Per-direction and top level ─────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionalStats {
    pub samples: u64,
    pub wick: u64,
    pub close: u64,
    pub revisit: Option<RevisitStats>,
    pub stairstep: Option<StairstepStats>,
    pub trade: Option<TradeStats>,
    pub extension: Option<ExtensionStats>,
    #[serde(default)]
    pub midpoint: Option<MidpointStats>,
    #[serde(default)]
    pub retrace_race: Option<RaceStats>,
}

impl DirectionalStats {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            samples: 0,
            wick: 0,
            close: 0,
            revisit: config.revisit.as_ref().map(|p| RevisitStats::new(&p.cutoffs)),
            stairstep: config
                .stairstep
                .as_ref()
                .map(|p| StairstepStats::new(p.max_steps, p.mode)),
            trade: config.trade.as_ref().map(|p| TradeStats::new(&p.r_targets)),
            extension: config
                .extension
                .as_ref()
                .map(|p| ExtensionStats::new(&p.bucket_edges, &p.multiples)),
            midpoint: config.midpoint.as_ref().map(|_| MidpointStats::default()),
            retrace_race: config
                .retrace_race
                .as_ref()
                .map(|p| RaceStats::new(&p.retrace_fractions, p.target_r)),
        }
    }

    /// Share of breakouts that closed beyond the boundary.
    pub fn close_rate(&self) -> Option<f64> {
        ratio(self.close, self.samples)
    }

    pub fn merge(&mut self, other: &Self) {
        self.samples += other.samples;
        self.wick += other.wick;
        self.close += other.close;
        merge_opt(&mut self.revisit, &other.revisit, RevisitStats::merge);
        merge_opt(&mut self.stairstep, &other.stairstep, StairstepStats::merge);
        merge_opt(&mut self.trade, &other.trade, TradeStats::merge);
        merge_opt(&mut self.extension, &other.extension, ExtensionStats::merge);
        merge_opt(&mut self.midpoint, &other.midpoint, MidpointStats::merge);
        merge_opt(&mut self.retrace_race, &other.retrace_race, RaceStats::merge);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub sessions: u64,
    pub skips: SkipTally,
    pub up: DirectionalStats,
    pub down: DirectionalStats,
}

impl AggregateStats {
    /// Empty aggregate shaped for `config`. This is also the identity for
    /// [`merge`](Self::merge).
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            sessions: 0,
            skips: SkipTally::default(),
            up: DirectionalStats::new(config),
            down: DirectionalStats::new(config),
        }
    }

    pub fn direction(&self, direction: Direction) -> &DirectionalStats {
        match direction {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        }
    }

    /// Breakout samples across both directions.
    pub fn samples(&self) -> u64 {
        self.up.samples + self.down.samples
    }

    pub fn record(&mut self, report: &SessionReport) {
        self.sessions += 1;
        match &report.outcome {
            SessionOutcome::NoRange => self.skips.no_range += 1,
            SessionOutcome::NoBreakout { .. } => self.skips.no_breakout += 1,
            SessionOutcome::Ambiguous { .. } => self.skips.ambiguous += 1,
            SessionOutcome::Breakout(breakout) => self.record_breakout(breakout),
        }
    }

    fn record_breakout(&mut self, report: &BreakoutReport) {
        let event = &report.event;
        let stats = match event.direction {
            Direction::Up => &mut self.up,
            Direction::Down => &mut self.down,
        };
        stats.samples += 1;
        match event.confirmation {
            Confirmation::Wick => stats.wick += 1,
            Confirmation::Close => stats.close += 1,
        }

        if let (Some(agg), Some(results)) = (stats.revisit.as_mut(), &report.revisit) {
            agg.record(event.confirmation, results);
        }

        if let (Some(agg), Some(record)) = (stats.stairstep.as_mut(), &report.stairstep) {
            match record {
                Some(record) => agg.record(record),
                None => self.skips.no_forward_bar += 1,
            }
        }

        if let (Some(agg), Some(record)) = (stats.trade.as_mut(), &report.trade) {
            match record {
                TradeRecord::NoEntryFill => self.skips.no_entry_fill += 1,
                TradeRecord::DegenerateRisk => self.skips.degenerate_risk += 1,
                TradeRecord::Filled(fill) => {
                    if agg.tiers.len() < fill.tiers.len() {
                        let start = agg.tiers.len();
                        agg.tiers
                            .extend(fill.tiers[start..].iter().map(|t| TierStats::new(t.target_r)));
                    }
                    for (tier, result) in agg.tiers.iter_mut().zip(&fill.tiers) {
                        tier.trades += 1;
                        match result.outcome {
                            TierOutcome::Win => tier.wins += 1,
                            TierOutcome::Loss => tier.losses += 1,
                            TierOutcome::Unresolved => tier.unresolved += 1,
                        }
                        if result.ambiguous {
                            tier.ambiguous += 1;
                        }
                    }
                }
            }
        }

        if let (Some(agg), Some(record)) = (stats.extension.as_mut(), &report.extension) {
            agg.record(record.as_ref());
        }

        if let (Some(agg), Some(record)) = (stats.midpoint.as_mut(), &report.midpoint) {
            match record {
                MidpointRecord::RangeTooWide => self.skips.range_too_wide += 1,
                other => agg.record(other),
            }
        }

        if let (Some(agg), Some(record)) = (stats.retrace_race.as_mut(), &report.retrace_race) {
            agg.record(record);
        }
    }

    /// Commutative, associative sum of two aggregates.
    pub fn merge(&mut self, other: &Self) {
        self.sessions += other.sessions;
        self.skips.merge(&other.skips);
        self.up.merge(&other.up);
        self.down.merge(&other.down);
    }

    /// Owned variant of [`merge`](Self::merge), convenient as a reduce step.
    pub fn merged(mut self, other: Self) -> Self {
        self.merge(&other);
        self
    }
}
