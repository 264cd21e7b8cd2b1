use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::env;

use crate::league::League;

/// Top-level configuration for the reputation & consensus engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Fixed karma amounts for engine-driven awards and penalties
    pub rewards: RewardConfig,
    /// Validation consensus parameters
    pub consensus: ConsensusConfig,
    /// Moderation review parameters
    pub moderation: ModerationConfig,
    /// External record sync parameters
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Enable request/response span logging
    pub log_requests: bool,
}

/// Fixed karma amounts. Every engine-driven ledger mutation uses one of
/// these; free-form amounts only enter through the external award/deduct
/// surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardConfig {
    /// Awarded to a validator for casting a vote
    pub validation_vote_reward: u64,
    /// Awarded to every participating validator when an item seals
    pub consensus_bonus: u64,
    /// Deducted from the author when an item seals as flagged
    pub misinformation_penalty: u64,
    /// Awarded to a reviewer for approving a ticket
    pub moderation_approve_reward: u64,
    /// Awarded to a reviewer for rejecting a ticket (larger: rejection
    /// requires writing up the call)
    pub moderation_reject_reward: u64,
    /// Deducted from the author when a reviewer rejects their content
    pub author_rejection_penalty: u64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            validation_vote_reward: 5,
            consensus_bonus: 10,
            misinformation_penalty: 50,
            moderation_approve_reward: 10,
            moderation_reject_reward: 20,
            author_rejection_penalty: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Minimum number of votes before consensus can be evaluated
    pub min_quorum: usize,
    /// Fraction of votes the leading verdict needs (0..1)
    pub agreement_threshold: f64,
    /// Lowest league allowed to vote on content
    pub min_validator_league: League,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            min_quorum: 3,
            agreement_threshold: 0.67,
            min_validator_league: League::Flame,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Lowest league allowed to review moderation tickets
    pub min_reviewer_league: League,
    /// Queue page size
    pub page_size: usize,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            min_reviewer_league: League::Beacon,
            page_size: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum record attempts before a job is abandoned
    pub max_attempts: u32,
    /// First backoff delay; doubles per attempt
    pub base_backoff_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff_ms: 200,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8470,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                log_requests: false,
            },
            rewards: RewardConfig::default(),
            consensus: ConsensusConfig::default(),
            moderation: ModerationConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from NEBULA_* environment variables, falling
    /// back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = env::var("NEBULA_HOST") {
            config.server.host = host;
        }
        if let Some(port) = parse_env("NEBULA_PORT")? {
            config.server.port = port;
        }
        if let Ok(level) = env::var("NEBULA_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(log_requests) = parse_env("NEBULA_LOG_REQUESTS")? {
            config.logging.log_requests = log_requests;
        }

        if let Some(v) = parse_env("NEBULA_VALIDATION_VOTE_REWARD")? {
            config.rewards.validation_vote_reward = v;
        }
        if let Some(v) = parse_env("NEBULA_CONSENSUS_BONUS")? {
            config.rewards.consensus_bonus = v;
        }
        if let Some(v) = parse_env("NEBULA_MISINFORMATION_PENALTY")? {
            config.rewards.misinformation_penalty = v;
        }
        if let Some(v) = parse_env("NEBULA_MODERATION_APPROVE_REWARD")? {
            config.rewards.moderation_approve_reward = v;
        }
        if let Some(v) = parse_env("NEBULA_MODERATION_REJECT_REWARD")? {
            config.rewards.moderation_reject_reward = v;
        }
        if let Some(v) = parse_env("NEBULA_AUTHOR_REJECTION_PENALTY")? {
            config.rewards.author_rejection_penalty = v;
        }

        if let Some(v) = parse_env("NEBULA_MIN_QUORUM")? {
            config.consensus.min_quorum = v;
        }
        if let Some(v) = parse_env("NEBULA_AGREEMENT_THRESHOLD")? {
            config.consensus.agreement_threshold = v;
        }
        if let Ok(league) = env::var("NEBULA_MIN_VALIDATOR_LEAGUE") {
            config.consensus.min_validator_league = league.parse().map_err(|e| anyhow!("{e}"))?;
        }
        if let Ok(league) = env::var("NEBULA_MIN_REVIEWER_LEAGUE") {
            config.moderation.min_reviewer_league = league.parse().map_err(|e| anyhow!("{e}"))?;
        }
        if let Some(v) = parse_env("NEBULA_MODERATION_PAGE_SIZE")? {
            config.moderation.page_size = v;
        }

        if let Some(v) = parse_env("NEBULA_SYNC_MAX_ATTEMPTS")? {
            config.sync.max_attempts = v;
        }
        if let Some(v) = parse_env("NEBULA_SYNC_BASE_BACKOFF_MS")? {
            config.sync.base_backoff_ms = v;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.consensus.min_quorum == 0 {
            return Err(anyhow!("min_quorum must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.consensus.agreement_threshold) {
            return Err(anyhow!(
                "agreement_threshold must be in 0..=1, got {}",
                self.consensus.agreement_threshold
            ));
        }
        if self.moderation.page_size == 0 {
            return Err(anyhow!("moderation page_size must be at least 1"));
        }
        if self.sync.max_attempts == 0 {
            return Err(anyhow!("sync max_attempts must be at least 1"));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| anyhow!("invalid {key}={raw}: {e}")),
        Err(_) => Ok(None),
    }
}
