//! Running score and the king verdict

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::collision::Hit;
use super::registry::KubbRegistry;
use super::state::{KingVerdict, KubbId, KubbKind, Side};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringEngine {
    scores: [u32; 2],
    /// Baseline kubbs already credited (a kubb never scores twice)
    counted: BTreeSet<KubbId>,
}

impl ScoringEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn score(&self, side: Side) -> u32 {
        self.scores[side.index()]
    }

    /// A baseline kubb is guarded while field kubbs stand on its half
    pub fn is_guarded(registry: &KubbRegistry, half: Side) -> bool {
        registry.standing_count(Some(half), KubbKind::Field) > 0
    }

    /// Credit a hit. Call after the registry marked the kubb down.
    /// Returns whether it scored.
    pub fn record_hit(&mut self, hit: &Hit, registry: &KubbRegistry) -> bool {
        if hit.kind != KubbKind::Baseline {
            return false;
        }
        let Some(defender) = hit.side else {
            return false;
        };
        if defender == hit.turn_owner {
            return false;
        }
        if Self::is_guarded(registry, defender) {
            log::debug!(
                "Baseline kubb {} down while {} field kubbs stand: not scored",
                hit.kubb,
                defender.as_str()
            );
            return false;
        }
        if !self.counted.insert(hit.kubb) {
            return false;
        }
        self.scores[hit.turn_owner.index()] += 1;
        true
    }

    /// Verdict for the side that felled the king
    pub fn resolve_king_hit(active: Side, registry: &KubbRegistry) -> KingVerdict {
        if registry.live_count(active.opponent()) > 0 {
            KingVerdict::Lose
        } else {
            KingVerdict::Win
        }
    }
}
