//! # Resource tiers.
//!
//! [`Tier`] classifies a host by total memory. Classification is a lookup over
//! the fixed ascending [`TIER_TABLE`]: the first row whose bound is `>=` the
//! host's total memory wins, anything above the last bound is [`Tier::Maximum`].
//!
//! | total memory      | tier      |
//! |-------------------|-----------|
//! | `<= 1024 MB`      | `minimal` |
//! | `<= 2048 MB`      | `low`     |
//! | `<= 4096 MB`      | `medium`  |
//! | `<= 8192 MB`      | `high`    |
//! | `>  8192 MB`      | `maximum` |

use std::fmt;

use serde::{Deserialize, Serialize};

/// Discrete resource class of a host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Minimal,
    Low,
    Medium,
    High,
    Maximum,
}

/// Inclusive upper bounds (MB) for every tier except [`Tier::Maximum`].
const TIER_TABLE: [(u64, Tier); 4] = [
    (1024, Tier::Minimal),
    (2048, Tier::Low),
    (4096, Tier::Medium),
    (8192, Tier::High),
];

impl Tier {
    /// All tiers in ascending order.
    pub const ALL: [Tier; 5] = [
        Tier::Minimal,
        Tier::Low,
        Tier::Medium,
        Tier::High,
        Tier::Maximum,
    ];

    /// Classifies a host by its total memory in MB.
    pub fn classify(total_memory_mb: u64) -> Tier {
        TIER_TABLE
            .iter()
            .find(|(bound, _)| total_memory_mb <= *bound)
            .map(|(_, tier)| *tier)
            .unwrap_or(Tier::Maximum)
    }

    /// Returns the lowercase tier name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Minimal => "minimal",
            Tier::Low => "low",
            Tier::Medium => "medium",
            Tier::High => "high",
            Tier::Maximum => "maximum",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
