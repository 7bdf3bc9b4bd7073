//! Game balance and match options
//!
//! Loaded from JSON; any field left out falls back to its default.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::BATONS_PER_TURN;

/// Bot skill presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BotDifficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl BotDifficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotDifficulty::Easy => "Easy",
            BotDifficulty::Medium => "Medium",
            BotDifficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(BotDifficulty::Easy),
            "medium" | "med" => Some(BotDifficulty::Medium),
            "hard" => Some(BotDifficulty::Hard),
            _ => None,
        }
    }

    /// Accuracy band (min, max) for this preset
    pub fn accuracy_band(&self) -> (f32, f32) {
        match self {
            BotDifficulty::Easy => (0.70, 0.85),
            BotDifficulty::Medium => (0.85, 0.95),
            BotDifficulty::Hard => (0.93, 0.99),
        }
    }
}

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed tuning JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid tuning value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Match tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// RNG seed (same seed + same inputs = same match)
    pub seed: u64,
    pub batons_per_turn: u8,

    // === Bot ===
    pub difficulty: BotDifficulty,
    /// Overrides the preset's accuracy band
    pub bot_accuracy: Option<(f32, f32)>,
    pub bot_decision_secs: f32,
    pub bot_return_secs: f32,
    pub bot_goes_for_king: bool,

    // === Timing ===
    /// Baton flight time before the next throw
    pub baton_settle_secs: f32,
    /// Impacts right after a kubb is placed are ignored
    pub spawn_grace_secs: f32,

    // === Impacts ===
    pub kubb_impact_threshold: f32,
    pub king_impact_threshold: f32,

    // === Landing ===
    pub landing_speed_threshold: f32,
    pub landing_settle_secs: f32,
    pub flight_timeout_secs: f32,

    // === Rules ===
    pub wind: bool,
    /// Player raises the kubbs they toss back by hand
    pub manual_raise: bool,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            seed: 0x4b55_4242,
            batons_per_turn: BATONS_PER_TURN,

            difficulty: BotDifficulty::Medium,
            bot_accuracy: None,
            bot_decision_secs: 1.5,
            bot_return_secs: 1.0,
            bot_goes_for_king: true,

            baton_settle_secs: 2.5,
            spawn_grace_secs: 0.5,

            kubb_impact_threshold: 0.03,
            king_impact_threshold: 0.03,

            landing_speed_threshold: 0.5,
            landing_settle_secs: 0.5,
            flight_timeout_secs: 8.0,

            wind: true,
            manual_raise: true,
        }
    }
}

impl Tuning {
    /// Parse and validate
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Read a tuning file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Accuracy band in effect (override or preset)
    pub fn accuracy_band(&self) -> (f32, f32) {
        self.bot_accuracy
            .unwrap_or_else(|| self.difficulty.accuracy_band())
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        if self.batons_per_turn == 0 {
            return Err(invalid("batons_per_turn", "must be at least 1"));
        }
        let (lo, hi) = self.accuracy_band();
        if !(0.0..=1.0).contains(&lo) || !(0.0..=1.0).contains(&hi) || lo > hi {
            return Err(invalid(
                "bot_accuracy",
                format!("band ({lo}, {hi}) must satisfy 0 <= min <= max <= 1"),
            ));
        }
        let durations = [
            ("bot_decision_secs", self.bot_decision_secs),
            ("bot_return_secs", self.bot_return_secs),
            ("baton_settle_secs", self.baton_settle_secs),
            ("landing_settle_secs", self.landing_settle_secs),
            ("flight_timeout_secs", self.flight_timeout_secs),
        ];
        for (field, secs) in durations {
            if !(secs.is_finite() && secs > 0.0) {
                return Err(invalid(field, format!("{secs} must be a positive duration")));
            }
        }
        let non_negative = [
            ("spawn_grace_secs", self.spawn_grace_secs),
            ("kubb_impact_threshold", self.kubb_impact_threshold),
            ("king_impact_threshold", self.king_impact_threshold),
            ("landing_speed_threshold", self.landing_speed_threshold),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(field, format!("{value} must be >= 0")));
            }
        }
        if self.flight_timeout_secs <= self.landing_settle_secs {
            return Err(invalid(
                "flight_timeout_secs",
                "must be longer than landing_settle_secs",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> TuningError {
    TuningError::Invalid {
        field,
        reason: reason.into(),
    }
}
