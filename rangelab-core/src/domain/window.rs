//! Half-open clock-time windows.
//!
//! A `Window` is `[start, end)` in local clock time. The left edge is
//! inclusive and the right edge exclusive, so a bar stamped exactly at `end`
//! belongs to the *next* window. When `start > end` the window wraps
//! midnight (e.g. 20:00–00:00 or 18:00–02:00).

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Half-open `[start, end)` interval of clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    #[serde(with = "clock")]
    pub start: NaiveTime,
    #[serde(with = "clock")]
    pub end: NaiveTime,
}

impl Window {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Build a window from two `"HH:MM"` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, chrono::ParseError> {
        Ok(Self::new(clock::parse(start)?, clock::parse(end)?))
    }

    /// True when the window crosses midnight.
    pub fn is_wrapping(&self) -> bool {
        self.start > self.end
    }

    /// True when `start == end`; such a window selects nothing.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Tail half of a wrapping window: `[start, 24:00)`.
    pub fn contains_tail(&self, t: NaiveTime) -> bool {
        t >= self.start
    }

    /// Head half of a wrapping window: `[00:00, end)`.
    pub fn contains_head(&self, t: NaiveTime) -> bool {
        t < self.end
    }

    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.is_empty() {
            false
        } else if self.is_wrapping() {
            self.contains_tail(t) || self.contains_head(t)
        } else {
            self.start <= t && t < self.end
        }
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", clock::format(self.start), clock::format(self.end))
    }
}

/// Serde adapter writing clock times as `"HH:MM"` (or `"HH:MM:SS"` when
/// seconds are present).
pub mod clock {
    use chrono::{NaiveTime, Timelike};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(s: &str) -> Result<NaiveTime, chrono::ParseError> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s.trim(), "%H:%M:%S"))
    }

    pub fn format(t: NaiveTime) -> String {
        if t.second() == 0 {
            t.format("%H:%M").to_string()
        } else {
            t.format("%H:%M:%S").to_string()
        }
    }

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format(*t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).map_err(|e| serde::de::Error::custom(format!("bad clock time '{raw}': {e}")))
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(t: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
            match t {
                Some(t) => s.serialize_some(&format(*t)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
            Option::<String>::deserialize(d)?
                .map(|raw| {
                    parse(&raw).map_err(|e| {
                        serde::de::Error::custom(format!("bad clock time '{raw}': {e}"))
                    })
                })
                .transpose()
        }
    }

    pub mod list {
        use super::*;
        use serde::ser::SerializeSeq;

        pub fn serialize<S: Serializer>(ts: &[NaiveTime], s: S) -> Result<S::Ok, S::Error> {
            let mut seq = s.serialize_seq(Some(ts.len()))?;
            for t in ts {
                seq.serialize_element(&format(*t))?;
            }
            seq.end()
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<NaiveTime>, D::Error> {
            Vec::<String>::deserialize(d)?
                .iter()
                .map(|raw| {
                    parse(raw).map_err(|e| {
                        serde::de::Error::custom(format!("bad clock time '{raw}': {e}"))
                    })
                })
                .collect()
        }
    }
}

/// Minutes since midnight; handy for fixtures and debugging output.
pub fn minute_of_day(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}
