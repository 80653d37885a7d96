//! Range extension targets.
//!
//! Measures how far price travels beyond the breached boundary, in units of
//! the range size, and buckets sessions by how wide the range was.

use super::{EventContext, OutcomePolicy};
use crate::domain::{Bar, Direction};
use crate::scan::first_hit;
use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionParams {
    /// Ascending upper edges; bucket `i` holds `size <= edges[i]`, and one
    /// extra open-ended bucket follows the last edge.
    pub bucket_edges: Vec<f64>,
    pub multiples: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtensionRecord {
    pub size: f64,
    pub bucket: usize,
    /// Maximum favorable excursion beyond the boundary.
    pub excursion: f64,
    /// First bar reaching each multiple, in `multiples` order.
    pub reached_at: Vec<Option<DateTime<Tz>>>,
}

impl ExtensionRecord {
    pub fn hit(&self, i: usize) -> bool {
        self.reached_at.get(i).is_some_and(Option::is_some)
    }
}

#[derive(Debug, Clone)]
pub struct ExtensionPolicy {
    bucket_edges: Vec<f64>,
    multiples: Vec<f64>,
}

impl ExtensionPolicy {
    pub fn new(params: &ExtensionParams) -> Self {
        Self {
            bucket_edges: params.bucket_edges.clone(),
            multiples: params.multiples.clone(),
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.bucket_edges.len() + 1
    }

    pub fn multiples(&self) -> &[f64] {
        &self.multiples
    }

    pub fn bucket_for(&self, size: f64) -> usize {
        self.bucket_edges
            .iter()
            .position(|&edge| size <= edge)
            .unwrap_or(self.bucket_edges.len())
    }
}

fn favorable(bar: &Bar, direction: Direction, boundary: f64) -> f64 {
    match direction {
        Direction::Up => bar.high - boundary,
        Direction::Down => boundary - bar.low,
    }
}

impl OutcomePolicy for ExtensionPolicy {
    /// `None` for a zero-size range.
    type Record = Option<ExtensionRecord>;

    fn name(&self) -> &'static str {
        "extension"
    }

    fn evaluate(&self, ctx: &EventContext<'_>) -> Self::Record {
        let size = ctx.range.size();
        if size <= 0.0 {
            return None;
        }
        let direction = ctx.event.direction;
        let boundary = ctx.event.boundary(ctx.range);
        let bars = ctx.session.starting_at(&ctx.event.timestamp, ctx.horizon);

        let excursion = bars
            .iter()
            .map(|b| favorable(b, direction, boundary))
            .fold(0.0_f64, f64::max);
        let reached_at = self
            .multiples
            .iter()
            .map(|&m| {
                first_hit(bars, |b| {
                    (favorable(b, direction, boundary) >= m * size).then_some(b.timestamp)
                })
                .map(|hit| hit.value)
            })
            .collect();

        Some(ExtensionRecord {
            size,
            bucket: self.bucket_for(size),
            excursion,
            reached_at,
        })
    }
}
