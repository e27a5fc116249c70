//! Scoring weights, tier thresholds, and permit classification rules.
//!
//! Everything the engine treats as tunable lives in [`ScoringConfig`]. The
//! defaults are declared as named constants and mirrored by the embedded
//! [`DEFAULT_CONFIG_TOML`] document, so a deployment can change any weight
//! or threshold with a TOML file instead of a code change.

use std::collections::BTreeSet;

use parcel_watch_parcel_models::RiskLevel;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Weight applied to every court case.
pub const DEFAULT_CASE_WEIGHT: f64 = 2.0;
/// Weight applied to every complaint, open or closed.
pub const DEFAULT_COMPLAINT_WEIGHT: f64 = 1.5;
/// Extra weight layered on top of [`DEFAULT_COMPLAINT_WEIGHT`] for open
/// complaints.
pub const DEFAULT_OPEN_COMPLAINT_BONUS: f64 = 0.5;
/// Weight applied to every high-value permit.
pub const DEFAULT_HIGH_VALUE_PERMIT_WEIGHT: f64 = 3.0;
/// Weight applied to every stalled permit.
pub const DEFAULT_STALLED_PERMIT_WEIGHT: f64 = 2.5;

/// Lowest score classified as [`RiskLevel::Moderate`].
pub const DEFAULT_MODERATE_THRESHOLD: f64 = 4.0;
/// Lowest score classified as [`RiskLevel::High`].
pub const DEFAULT_HIGH_THRESHOLD: f64 = 7.0;
/// Lowest score classified as [`RiskLevel::Critical`].
pub const DEFAULT_CRITICAL_THRESHOLD: f64 = 12.0;

/// Valuation (in dollars) at or above which a permit counts as high-value.
pub const DEFAULT_HIGH_VALUE_THRESHOLD: f64 = 100_000.0;
/// Permit statuses that indicate stalled development. Matched exactly.
pub const DEFAULT_STALLED_STATUSES: &[&str] = &["Pending", "Issued - Hold"];
/// Trailing window, in days, of court cases that count toward a score.
pub const DEFAULT_CASE_WINDOW_DAYS: u32 = 180;
/// Longest accepted court case window, roughly a century.
pub const MAX_CASE_WINDOW_DAYS: u32 = 36_500;
/// Number of offense types kept per parcel in published output.
pub const DEFAULT_TOP_OFFENSE_LIMIT: usize = 3;

/// The default configuration as a TOML document, embedded at compile time.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default.toml");

/// Errors raised while loading or validating a [`ScoringConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be rendered as TOML.
    #[error("Config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The configuration parsed but holds values the engine cannot use.
    #[error("Invalid config: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },
}

/// Weights of the parcel risk formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    /// Per court case.
    pub case: f64,
    /// Per complaint.
    pub complaint: f64,
    /// Additional weight per open complaint.
    pub open_complaint_bonus: f64,
    /// Per high-value permit.
    pub high_value_permit: f64,
    /// Per stalled permit.
    pub stalled_permit: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            case: DEFAULT_CASE_WEIGHT,
            complaint: DEFAULT_COMPLAINT_WEIGHT,
            open_complaint_bonus: DEFAULT_OPEN_COMPLAINT_BONUS,
            high_value_permit: DEFAULT_HIGH_VALUE_PERMIT_WEIGHT,
            stalled_permit: DEFAULT_STALLED_PERMIT_WEIGHT,
        }
    }
}

impl RiskWeights {
    fn validate(&self) -> Result<(), ConfigError> {
        let named = [
            ("case", self.case),
            ("complaint", self.complaint),
            ("open_complaint_bonus", self.open_complaint_bonus),
            ("high_value_permit", self.high_value_permit),
            ("stalled_permit", self.stalled_permit),
        ];
        for (name, weight) in named {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::Invalid {
                    message: format!("weight '{name}' must be a non-negative number, got {weight}"),
                });
            }
        }
        Ok(())
    }
}

/// Lower bounds (inclusive) of each tier above [`RiskLevel::Low`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    /// Lowest moderate score.
    pub moderate: f64,
    /// Lowest high score.
    pub high: f64,
    /// Lowest critical score.
    pub critical: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            moderate: DEFAULT_MODERATE_THRESHOLD,
            high: DEFAULT_HIGH_THRESHOLD,
            critical: DEFAULT_CRITICAL_THRESHOLD,
        }
    }
}

impl RiskThresholds {
    /// Maps a score to its tier, checking the highest tier first.
    ///
    /// Monotonic as long as the thresholds are ascending, which
    /// [`ScoringConfig::validate`] enforces.
    #[must_use]
    pub fn classify(&self, score: f64) -> RiskLevel {
        if score >= self.critical {
            RiskLevel::Critical
        } else if score >= self.high {
            RiskLevel::High
        } else if score >= self.moderate {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let all_finite =
            self.moderate.is_finite() && self.high.is_finite() && self.critical.is_finite();
        if !all_finite || self.moderate >= self.high || self.high >= self.critical {
            return Err(ConfigError::Invalid {
                message: format!(
                    "thresholds must be finite and strictly ascending, got moderate={} high={} critical={}",
                    self.moderate, self.high, self.critical
                ),
            });
        }
        Ok(())
    }
}

/// Complete scoring configuration passed into the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Minimum valuation of a high-value permit.
    pub high_value_threshold: f64,
    /// Permit statuses treated as stalled (exact, case-sensitive match).
    pub stalled_statuses: BTreeSet<String>,
    /// Trailing window of court cases applied by the ingestion layer.
    pub case_window_days: u32,
    /// Offense types kept per parcel when publishing.
    pub top_offense_limit: usize,
    /// Optional cap on the number of published leaderboard rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leaderboard_limit: Option<usize>,
    /// Formula weights.
    pub weights: RiskWeights,
    /// Tier thresholds.
    pub thresholds: RiskThresholds,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            high_value_threshold: DEFAULT_HIGH_VALUE_THRESHOLD,
            stalled_statuses: DEFAULT_STALLED_STATUSES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            case_window_days: DEFAULT_CASE_WINDOW_DAYS,
            top_offense_limit: DEFAULT_TOP_OFFENSE_LIMIT,
            leaderboard_limit: None,
            weights: RiskWeights::default(),
            thresholds: RiskThresholds::default(),
        }
    }
}

impl ScoringConfig {
    /// Parses and validates a TOML document. Omitted fields take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the document is not valid TOML or holds
    /// unusable values.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::de::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses the embedded [`DEFAULT_CONFIG_TOML`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the embedded document is invalid.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_toml_str(DEFAULT_CONFIG_TOML)
    }

    /// Renders the configuration as a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks weights, thresholds, the high-value threshold, and the case
    /// window length.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        self.thresholds.validate()?;
        if !self.high_value_threshold.is_finite() || self.high_value_threshold < 0.0 {
            return Err(ConfigError::Invalid {
                message: format!(
                    "high_value_threshold must be a non-negative number, got {}",
                    self.high_value_threshold
                ),
            });
        }
        if self.case_window_days > MAX_CASE_WINDOW_DAYS {
            return Err(ConfigError::Invalid {
                message: format!(
                    "case_window_days must be at most {MAX_CASE_WINDOW_DAYS}, got {}",
                    self.case_window_days
                ),
            });
        }
        Ok(())
    }

    /// Returns `true` if the valuation meets the high-value threshold.
    #[must_use]
    pub fn is_high_value(&self, valuation: f64) -> bool {
        valuation >= self.high_value_threshold
    }

    /// Returns `true` if the permit status is one of the stalled statuses.
    #[must_use]
    pub fn is_stalled(&self, status: &str) -> bool {
        self.stalled_statuses.contains(status)
    }
}
