//! Kubb Toss - a turn-based lawn game, player versus bot
//!
//! Core modules:
//! - `sim`: Deterministic match engine (turns, kubbs, scoring, bot, return throws)
//! - `tuning`: Data-driven game balance
//!
//! Rendering, rigid-body physics, audio and pointer capture live in the host.
//! The host feeds simulator events and throw intents into [`sim::tick`] and
//! drains body commands back out of the match.

pub mod sim;
pub mod tuning;

pub use tuning::{BotDifficulty, Tuning, TuningError};

use glam::Vec3;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz, matches the host's physics step)
    pub const SIM_DT: f32 = 1.0 / 120.0;

    /// Downward acceleration used for aim solving and trajectory previews
    pub const GRAVITY: f32 = 9.81;
    /// Height of the lawn
    pub const GROUND_Y: f32 = 0.0;

    /// Pitch layout. The player's half is +z, the bot's half is -z.
    pub const BASELINE_Z: f32 = 8.0;
    pub const BASELINE_KUBBS: usize = 5;
    pub const BASELINE_SPACING: f32 = 1.25;
    /// Field kubbs must land inside this rectangle on their half
    pub const FIELD_HALF_WIDTH: f32 = 3.5;
    pub const FIELD_NEAR_Z: f32 = 1.5;
    pub const FIELD_FAR_Z: f32 = 6.5;
    /// Radius of the scatter around a batch's random centre
    pub const FIELD_CLUSTER_X: f32 = 1.0;
    pub const FIELD_CLUSTER_Z: f32 = 0.75;

    /// Anything past these is treated as "left the world"
    pub const WORLD_HALF_WIDTH: f32 = 20.0;
    pub const WORLD_HALF_LENGTH: f32 = 25.0;
    pub const WORLD_FLOOR_Y: f32 = -5.0;

    /// Kubb dimensions
    pub const KUBB_HEIGHT: f32 = 0.6;
    /// Effective height when raised on the top edge (shorter, harder to hit)
    pub const KUBB_RAISED_TOP_HEIGHT: f32 = 0.45;
    pub const KING_HEIGHT: f32 = 1.0;

    /// Baton release point: height and distance behind the baseline
    pub const BATON_READY_Y: f32 = 1.0;
    pub const BATON_BEHIND_BASELINE: f32 = 0.4;

    /// Batons per turn
    pub const BATONS_PER_TURN: u8 = 6;
}

/// Convert a duration in seconds to whole simulation ticks (rounded, at least 1)
#[inline]
pub fn secs_to_ticks(secs: f32) -> u64 {
    ((secs / consts::SIM_DT).round() as u64).max(1)
}

/// Convert simulation ticks back to seconds
#[inline]
pub fn ticks_to_secs(ticks: u64) -> f32 {
    ticks as f32 * consts::SIM_DT
}

/// True if a body has left the playable world (fell through or flew off)
#[inline]
pub fn is_out_of_world(pos: Vec3) -> bool {
    use consts::*;
    pos.y < WORLD_FLOOR_Y || pos.x.abs() > WORLD_HALF_WIDTH || pos.z.abs() > WORLD_HALF_LENGTH
}
