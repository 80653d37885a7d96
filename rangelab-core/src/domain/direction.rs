//! Breakout direction and crossing quality.

use serde::{Deserialize, Serialize};

/// Side of the reference range that was breached first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// +1.0 for up, -1.0 for down. Multiplying a price move by the sign turns
    /// it into a favorable (positive) or adverse (negative) excursion.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Direction::Up => 1.0,
            Direction::Down => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

/// How convincingly the triggering bar crossed the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    /// Only the high (or low) pierced the boundary; the close stayed inside.
    Wick,
    /// The close also finished beyond the boundary.
    Close,
}

impl Confirmation {
    pub fn as_str(self) -> &'static str {
        match self {
            Confirmation::Wick => "wick",
            Confirmation::Close => "close",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_is_involution() {
        assert_eq!(Direction::Up.opposite(), Direction::Down);
        assert_eq!(Direction::Up.opposite().opposite(), Direction::Up);
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Direction::Down).unwrap(), "\"down\"");
        assert_eq!(serde_json::to_string(&Confirmation::Wick).unwrap(), "\"wick\"");
    }
}
