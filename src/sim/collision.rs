//! Collision-to-hit resolution
//!
//! The simulator reports every contact on a kubb. Most of them are noise:
//! settling jitter right after a kubb is placed, repeat contacts while a kubb
//! is already toppling, or soft touches. This module turns that stream into at
//! most one scoring hit per kubb.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::registry::KubbRegistry;
use super::state::{BodyId, KubbId, KubbKind, Side, SimCommand};
use super::turn::GamePhase;
use crate::secs_to_ticks;
use crate::tuning::Tuning;

/// Raw impact reported by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Impact {
    pub target: KubbId,
    pub impact_speed: f32,
}

/// A scoring hit (emitted at most once per kubb)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hit {
    pub kubb: KubbId,
    pub kind: KubbKind,
    /// Half the kubb stood on (`None` for the king)
    pub side: Option<Side>,
    /// Side whose turn it was
    pub turn_owner: Side,
}

/// Converts impacts into hits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionResolver {
    /// Impacts this soon after a kubb is placed are ignored
    pub grace_ticks: u64,
    pub kubb_threshold: f32,
    pub king_threshold: f32,
}

impl CollisionResolver {
    pub fn from_tuning(tuning: &Tuning) -> Self {
        Self {
            grace_ticks: secs_to_ticks(tuning.spawn_grace_secs),
            kubb_threshold: tuning.kubb_impact_threshold,
            king_threshold: tuning.king_impact_threshold,
        }
    }

    /// Resolve one impact. `thrown_by` is the side whose baton is airborne,
    /// if any. On a hit the kubb is marked down and a topple impulse is
    /// queued for the simulator.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve<R: Rng>(
        &self,
        impact: Impact,
        registry: &mut KubbRegistry,
        phase: GamePhase,
        thrown_by: Option<Side>,
        now: u64,
        rng: &mut R,
        out: &mut Vec<SimCommand>,
    ) -> Option<Hit> {
        let turn_owner = phase.active_side()?;
        // Contacts only count while the active side's baton is in the air
        if thrown_by != Some(turn_owner) {
            log::debug!(
                "Impact on kubb {} with no {} baton in flight, ignored",
                impact.target,
                turn_owner.as_str()
            );
            return None;
        }
        let kubb = registry.get(impact.target)?;
        if !kubb.is_standing() || kubb.has_fired {
            return None;
        }
        if now.saturating_sub(kubb.spawned_at) < self.grace_ticks {
            log::debug!("Impact on kubb {} inside spawn grace, ignored", kubb.id);
            return None;
        }

        let threshold = match kubb.kind {
            KubbKind::King => self.king_threshold,
            KubbKind::Baseline | KubbKind::Field => {
                // Only the opposing side's baton may topple a kubb, and only batons score
                if !phase.is_baton_turn() || kubb.side != Some(turn_owner.opponent()) {
                    return None;
                }
                self.kubb_threshold
            }
        };
        if impact.impact_speed <= threshold {
            return None;
        }

        let hit = Hit {
            kubb: kubb.id,
            kind: kubb.kind,
            side: kubb.side,
            turn_owner,
        };
        if !registry.mark_down(hit.kubb) {
            return None;
        }
        out.push(topple_impulse(hit.kubb, hit.kind, turn_owner, rng));
        Some(hit)
    }
}

/// Push the kubb over, away from the thrower, with a randomized magnitude
fn topple_impulse<R: Rng>(id: KubbId, kind: KubbKind, thrower: Side, rng: &mut R) -> SimCommand {
    let dir = thrower.throw_direction();
    let (impulse, offset, angular) = match kind {
        KubbKind::King => (
            Vec3::new(0.0, 3.0, dir * rng.random_range(4.5..=5.5)),
            Vec3::new(0.0, 0.4, 0.0),
            Vec3::new(dir * rng.random_range(4.0..=6.0), 0.0, 0.0),
        ),
        KubbKind::Baseline | KubbKind::Field => (
            Vec3::new(
                rng.random_range(-0.3..=0.3),
                0.2,
                dir * rng.random_range(1.0..=1.4),
            ),
            Vec3::new(0.0, 0.3, 0.0),
            Vec3::new(
                dir * rng.random_range(5.0..=6.0),
                rng.random_range(-0.75..=0.75),
                rng.random_range(-1.5..=1.5),
            ),
        ),
    };
    SimCommand::ApplyImpulse {
        body: BodyId::Kubb(id),
        impulse,
        offset,
        angular,
    }
}
