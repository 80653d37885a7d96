//! Session partitioner.
//!
//! Splits a validated series into trading sessions keyed by trade date and
//! exposes the time-of-day views the detectors and classifiers scan.

use crate::data::BarSeries;
use crate::domain::{clock, Bar, Window};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// How bars map to trade dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRule {
    /// Bars at or after this clock time belong to the next trade date
    /// (e.g. `20:00` for an evening-open futures session).
    #[serde(default, with = "clock::option")]
    pub rollover: Option<NaiveTime>,
}

impl SessionRule {
    pub fn calendar() -> Self {
        Self { rollover: None }
    }

    pub fn rolling_at(time: NaiveTime) -> Self {
        Self {
            rollover: Some(time),
        }
    }

    pub fn trade_date(&self, bar: &Bar) -> NaiveDate {
        let date = bar.date();
        match self.rollover {
            Some(cut) if bar.time() >= cut => date + Duration::days(1),
            _ => date,
        }
    }
}

/// One trade date's worth of bars, in timestamp order.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    date: NaiveDate,
    bars: Vec<Bar>,
}

impl Session {
    /// Build a session directly. `bars` must already be time-ordered.
    pub fn new(date: NaiveDate, bars: Vec<Bar>) -> Self {
        Self { date, bars }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Bars whose clock time falls inside `window`, in timestamp order.
    ///
    /// A wrapping window is the union of its tail (`time >= start`) and its
    /// head (`time < end`), merged back by timestamp.
    pub fn slice(&self, window: &Window) -> Vec<&Bar> {
        if window.is_empty() {
            return Vec::new();
        }
        if !window.is_wrapping() {
            return self
                .bars
                .iter()
                .filter(|b| window.contains(b.time()))
                .collect();
        }

        let tail: Vec<&Bar> = self
            .bars
            .iter()
            .filter(|b| window.contains_tail(b.time()))
            .collect();
        let head: Vec<&Bar> = self
            .bars
            .iter()
            .filter(|b| window.contains_head(b.time()))
            .collect();
        merge_by_timestamp(tail, head)
    }

    /// Bars strictly after `ts`, cut at the first bar outside `horizon`.
    pub fn after(&self, ts: &DateTime<Tz>, horizon: &Window) -> &[Bar] {
        let start = self.bars.partition_point(|b| b.timestamp <= *ts);
        self.run_inside(start, horizon)
    }

    /// Bars at or after `ts`, cut at the first bar outside `horizon`.
    pub fn starting_at(&self, ts: &DateTime<Tz>, horizon: &Window) -> &[Bar] {
        let start = self.bars.partition_point(|b| b.timestamp < *ts);
        self.run_inside(start, horizon)
    }

    fn run_inside(&self, start: usize, horizon: &Window) -> &[Bar] {
        let rest = &self.bars[start..];
        let len = rest
            .iter()
            .position(|b| !horizon.contains(b.time()))
            .unwrap_or(rest.len());
        &rest[..len]
    }
}

fn merge_by_timestamp<'a>(a: Vec<&'a Bar>, b: Vec<&'a Bar>) -> Vec<&'a Bar> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i].timestamp <= b[j].timestamp {
            out.push(a[i]);
            i += 1;
        } else {
            out.push(b[j]);
            j += 1;
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// Partition a series into sessions. Every bar lands in exactly one session.
pub fn partition(series: &BarSeries, rule: &SessionRule) -> Vec<Session> {
    let mut sessions: Vec<Session> = Vec::new();
    for bar in series.bars() {
        let date = rule.trade_date(bar);
        match sessions.last_mut() {
            Some(current) if current.date == date => current.bars.push(bar.clone()),
            _ => sessions.push(Session::new(date, vec![bar.clone()])),
        }
    }
    sessions
}
