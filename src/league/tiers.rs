//! League Tier Table
//!
//! Static ordered list of reputation brackets. A user's league is the
//! highest tier whose karma threshold does not exceed their current
//! balance. Each tier grants a set of capability identifiers ("astras");
//! grants are permanent even if karma later drops below the threshold.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered reputation brackets, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum League {
    Spark,
    Ember,
    Flame,
    Beacon,
    Aurora,
}

/// A tier in the static table: entry threshold plus the capabilities it
/// grants on promotion.
#[derive(Debug, Clone, Copy)]
pub struct LeagueTier {
    pub league: League,
    pub min_karma: u64,
    pub grants: &'static [&'static str],
}

/// Highest threshold last; `for_karma` walks it in reverse.
pub const TIERS: &[LeagueTier] = &[
    LeagueTier {
        league: League::Spark,
        min_karma: 0,
        grants: &["post-content", "comment"],
    },
    LeagueTier {
        league: League::Ember,
        min_karma: 100,
        grants: &["create-boards", "long-form-video"],
    },
    LeagueTier {
        league: League::Flame,
        min_karma: 500,
        grants: &["validate-content", "pin-content"],
    },
    LeagueTier {
        league: League::Beacon,
        min_karma: 2_000,
        grants: &["review-moderation", "featured-eligibility"],
    },
    LeagueTier {
        league: League::Aurora,
        min_karma: 10_000,
        grants: &["host-campaigns", "platform-governance"],
    },
];

impl League {
    /// Highest tier whose threshold is met by `karma`.
    pub fn for_karma(karma: u64) -> League {
        for tier in TIERS.iter().rev() {
            if karma >= tier.min_karma {
                return tier.league;
            }
        }
        League::Spark
    }

    pub fn tier(&self) -> &'static LeagueTier {
        TIERS
            .iter()
            .find(|t| t.league == *self)
            .expect("every league variant has a tier entry")
    }

    pub fn min_karma(&self) -> u64 {
        self.tier().min_karma
    }

    /// Capabilities granted on reaching this tier (not cumulative).
    pub fn grants(&self) -> &'static [&'static str] {
        self.tier().grants
    }

    /// The next tier up, if any.
    pub fn next(&self) -> Option<League> {
        let idx = TIERS.iter().position(|t| t.league == *self)?;
        TIERS.get(idx + 1).map(|t| t.league)
    }

    /// Capabilities of this tier and every tier below it.
    pub fn cumulative_grants(&self) -> Vec<&'static str> {
        TIERS
            .iter()
            .take_while(|t| t.league <= *self)
            .flat_map(|t| t.grants.iter().copied())
            .collect()
    }
}

impl fmt::Display for League {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            League::Spark => "spark",
            League::Ember => "ember",
            League::Flame => "flame",
            League::Beacon => "beacon",
            League::Aurora => "aurora",
        };
        write!(f, "{name}")
    }
}

impl FromStr for League {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spark" => Ok(League::Spark),
            "ember" => Ok(League::Ember),
            "flame" => Ok(League::Flame),
            "beacon" => Ok(League::Beacon),
            "aurora" => Ok(League::Aurora),
            other => Err(format!("unknown league: {other}")),
        }
    }
}
