//! League Progression
//!
//! Ordered reputation brackets unlocked by karma thresholds. Progression
//! is a pure function of the current balance; capability grants are
//! permanent once earned.

pub mod progression;
pub mod tiers;

pub use progression::{reevaluate, LeagueChange, LeagueStatus};
pub use tiers::{League, LeagueTier, TIERS};
