//! Correlation scorer: relevance classification per number.
//!
//! Total = w_f·frequency + w_p·partner_diversity + w_d·duration
//!       + operator_bonus + geo_bonus
//!
//! Every sub-score is normalized to [0, 1] before weighting. The target
//! is never scored; it is always `CorrelationLevel::Target`.

use crate::{aggregate::NumberProfile, config::ScoringConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationLevel {
    Target,
    High,
    Medium,
    Low,
    Indirect,
}

impl CorrelationLevel {
    /// Lower rank sorts first when ordering by importance.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Target => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
            Self::Indirect => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Target => "target",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Indirect => "indirect",
        }
    }
}

/// Every factor that went into a classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreBreakdown {
    pub frequency: f64,
    pub partner_diversity: f64,
    pub duration: f64,
    pub operator_bonus: f64,
    pub geo_bonus: f64,
    pub total: f64,
    pub level: CorrelationLevel,
}

impl ScoreBreakdown {
    fn target() -> Self {
        Self {
            frequency: 1.0,
            partner_diversity: 1.0,
            duration: 1.0,
            operator_bonus: 0.0,
            geo_bonus: 0.0,
            total: 1.0,
            level: CorrelationLevel::Target,
        }
    }
}

pub fn score_profile(profile: &NumberProfile, config: &ScoringConfig) -> ScoreBreakdown {
    if profile.is_target {
        return ScoreBreakdown::target();
    }

    let frequency = capped_ratio(profile.interaction_count as f64, config.frequency_cap);
    let partner_diversity = capped_ratio(profile.counterparts.len() as f64, config.partner_cap);
    let duration = capped_ratio(profile.average_duration_secs(), config.duration_cap_secs);
    let operator_bonus = if profile.operators.len() > 1 {
        config.operator_bonus
    } else {
        0.0
    };
    let geo_bonus = if profile.has_geo() { config.geo_bonus } else { 0.0 };

    let total = config.frequency_weight * frequency
        + config.partner_weight * partner_diversity
        + config.duration_weight * duration
        + operator_bonus
        + geo_bonus;

    ScoreBreakdown {
        frequency,
        partner_diversity,
        duration,
        operator_bonus,
        geo_bonus,
        total,
        level: classify(total, config),
    }
}

pub fn classify(total: f64, config: &ScoringConfig) -> CorrelationLevel {
    if total >= config.high_threshold {
        CorrelationLevel::High
    } else if total >= config.medium_threshold {
        CorrelationLevel::Medium
    } else if total >= config.low_threshold {
        CorrelationLevel::Low
    } else {
        CorrelationLevel::Indirect
    }
}

fn capped_ratio(value: f64, cap: f64) -> f64 {
    if cap <= 0.0 {
        return 1.0;
    }
    (value / cap).clamp(0.0, 1.0)
}
