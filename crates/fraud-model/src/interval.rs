use serde::{Deserialize, Serialize};

/// A closed address range `[lower, upper]` tagged with a payload (a country name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub lower: u32,
    pub upper: u32,
    pub payload: String,
}

impl Interval {
    pub fn new(lower: u32, upper: u32, payload: impl Into<String>) -> Self {
        Self {
            lower,
            upper,
            payload: payload.into(),
        }
    }

    /// True when `key` lies inside the range, both bounds included.
    pub fn contains(&self, key: u32) -> bool {
        self.lower <= key && key <= self.upper
    }

    /// Number of addresses covered, or 0 for an inverted range.
    pub fn width(&self) -> u64 {
        if self.lower > self.upper {
            0
        } else {
            u64::from(self.upper - self.lower) + 1
        }
    }
}
