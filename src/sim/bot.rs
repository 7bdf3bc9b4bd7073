//! Bot opponent
//!
//! The bot attacks the player's half: standing field kubbs first, then
//! baseline kubbs, then (optionally) the king once the half is clear. Its aim
//! is the exact ballistic solution to the target, perturbed by an accuracy
//! roll from the configured band.

use glam::{Vec2, Vec3};
use rand::Rng;
use rand::seq::IteratorRandom;
use serde::{Deserialize, Serialize};

use super::registry::KubbRegistry;
use super::state::{Kubb, KubbId, KubbKind, Side};
use super::throw::{ThrowIntent, ThrowKind, ThrowParameterTranslator};
use crate::secs_to_ticks;
use crate::tuning::Tuning;

/// Miss distance at zero accuracy, across and along the throw
const MISS_X: f32 = 3.0;
const MISS_Z: f32 = 4.0;
/// Release point spread around the target's x
const RELEASE_JITTER: f32 = 0.4;
const RELEASE_MAX_X: f32 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BotTarget {
    pub kubb: KubbId,
    pub kind: KubbKind,
    pub position: Vec3,
}

/// One decided baton throw
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BotThrow {
    pub target: BotTarget,
    /// Where the baton is released
    pub release: Vec3,
    pub intent: ThrowIntent,
    /// Accuracy rolled for this throw
    pub accuracy: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotAi {
    /// Accuracy band (min, max), each in 0–1
    pub accuracy: (f32, f32),
    /// Delay between decisions
    pub decision_ticks: u64,
    /// Delay between return throws
    pub return_ticks: u64,
    /// Aim at the king once the player's half is clear
    pub goes_for_king: bool,
}

impl BotAi {
    pub fn from_tuning(tuning: &Tuning) -> Self {
        Self {
            accuracy: tuning.accuracy_band(),
            decision_ticks: secs_to_ticks(tuning.bot_decision_secs),
            return_ticks: secs_to_ticks(tuning.bot_return_secs),
            goes_for_king: tuning.bot_goes_for_king,
        }
    }

    /// Random standing field kubb on the player's half, else a random
    /// standing baseline kubb, else the king when allowed
    pub fn pick_target<R: Rng>(&self, registry: &KubbRegistry, rng: &mut R) -> Option<BotTarget> {
        let half = Some(Side::Bot.opponent());
        let as_target = |k: &Kubb| BotTarget {
            kubb: k.id,
            kind: k.kind,
            position: k.position,
        };
        if let Some(k) = registry.standing(half, KubbKind::Field).choose(rng) {
            return Some(as_target(k));
        }
        if let Some(k) = registry.standing(half, KubbKind::Baseline).choose(rng) {
            return Some(as_target(k));
        }
        if self.goes_for_king && registry.live_count(Side::Player) == 0 {
            return registry.standing(None, KubbKind::King).next().map(as_target);
        }
        None
    }

    /// Pick a target and solve the throw at it
    pub fn decide<R: Rng>(
        &self,
        registry: &KubbRegistry,
        translator: &ThrowParameterTranslator,
        wind: Vec2,
        rng: &mut R,
    ) -> Option<BotThrow> {
        let target = self.pick_target(registry, rng)?;
        let (lo, hi) = self.accuracy;
        let accuracy = if hi > lo { rng.random_range(lo..=hi) } else { lo };
        let miss = 1.0 - accuracy;

        let release_x = (target.position.x + rng.random_range(-RELEASE_JITTER..=RELEASE_JITTER))
            .clamp(-RELEASE_MAX_X, RELEASE_MAX_X);
        let release = Side::Bot.baton_ready_position(release_x);
        let aim = target.position
            + Vec3::new(
                rng.random_range(-1.0..=1.0) * miss * MISS_X,
                0.0,
                rng.random_range(-1.0..=1.0) * miss * MISS_Z,
            );
        let arc = rng.random_range(15.0..=25.0);
        let intent =
            translator.intent_for_target(ThrowKind::Baton, Side::Bot, release, aim, arc, wind);
        log::debug!(
            "Bot aims at kubb {} ({:?}) accuracy {:.2} power {:.2}",
            target.kubb,
            target.kind,
            accuracy,
            intent.power
        );
        Some(BotThrow {
            target,
            release,
            intent,
            accuracy,
        })
    }

    /// Intent for tossing a kubb from `origin` onto the planned spot `aim`
    pub fn return_intent<R: Rng>(
        &self,
        translator: &ThrowParameterTranslator,
        origin: Vec3,
        aim: Vec3,
        wind: Vec2,
        rng: &mut R,
    ) -> ThrowIntent {
        let arc = rng.random_range(40.0..=50.0);
        let mut intent =
            translator.intent_for_target(ThrowKind::Kubb, Side::Bot, origin, aim, arc, wind);
        intent.spin = rng.random_range(-0.3..=0.3);
        intent
    }
}
