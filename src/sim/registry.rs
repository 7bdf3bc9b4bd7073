//! Kubb registry: the single source of truth for kubb existence and status

use glam::{Vec2, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::{
    BodyId, CollisionFilter, Kubb, KubbId, KubbKind, KubbStatus, RaiseEdge, Side, SimCommand,
};
use crate::consts::*;

/// Legal landing rectangle on a side's half, as (min, max) in (x, z)
pub fn field_bounds(side: Side) -> (Vec2, Vec2) {
    let (z0, z1) = match side {
        Side::Player => (FIELD_NEAR_Z, FIELD_FAR_Z),
        Side::Bot => (-FIELD_FAR_Z, -FIELD_NEAR_Z),
    };
    (
        Vec2::new(-FIELD_HALF_WIDTH, z0),
        Vec2::new(FIELD_HALF_WIDTH, z1),
    )
}

/// Clamp a point into a side's field rectangle, standing on the ground
pub fn clamp_to_field(side: Side, pos: Vec3, height: f32) -> Vec3 {
    let (min, max) = field_bounds(side);
    Vec3::new(
        pos.x.clamp(min.x, max.x),
        GROUND_Y + height / 2.0,
        pos.z.clamp(min.y, max.y),
    )
}

/// All kubbs in the match (sorted by id for deterministic iteration)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KubbRegistry {
    kubbs: Vec<Kubb>,
    next_id: KubbId,
}

impl KubbRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every kubb (ids keep counting so stale simulator events never alias)
    pub fn reset(&mut self) {
        self.kubbs.clear();
    }

    pub fn len(&self) -> usize {
        self.kubbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kubbs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Kubb> {
        self.kubbs.iter()
    }

    pub fn get(&self, id: KubbId) -> Option<&Kubb> {
        self.kubbs
            .binary_search_by_key(&id, |k| k.id)
            .ok()
            .map(|i| &self.kubbs[i])
    }

    fn get_mut(&mut self, id: KubbId) -> Option<&mut Kubb> {
        self.kubbs
            .binary_search_by_key(&id, |k| k.id)
            .ok()
            .map(|i| &mut self.kubbs[i])
    }

    fn spawn(
        &mut self,
        kind: KubbKind,
        side: Option<Side>,
        position: Vec3,
        status: KubbStatus,
        now: u64,
        out: &mut Vec<SimCommand>,
    ) -> KubbId {
        let id = self.next_id;
        self.next_id += 1;
        let (height, filter) = match side {
            Some(side) => (KUBB_HEIGHT, CollisionFilter::for_half(side)),
            None => (KING_HEIGHT, CollisionFilter::king()),
        };
        let body = BodyId::Kubb(id);
        out.push(SimCommand::SetCollisionFilter { body, filter });
        if status == KubbStatus::Standing {
            out.push(SimCommand::ResetBody { body, position });
        }
        self.kubbs.push(Kubb {
            id,
            kind,
            side,
            position,
            status,
            height,
            filter,
            spawned_at: now,
            has_fired: false,
        });
        id
    }

    /// Five kubbs evenly spaced along a side's back line
    pub fn create_baseline_targets(
        &mut self,
        side: Side,
        now: u64,
        out: &mut Vec<SimCommand>,
    ) -> Vec<KubbId> {
        let span = (BASELINE_KUBBS - 1) as f32 * BASELINE_SPACING;
        (0..BASELINE_KUBBS)
            .map(|i| {
                let x = -span / 2.0 + i as f32 * BASELINE_SPACING;
                let pos = Vec3::new(x, GROUND_Y + KUBB_HEIGHT / 2.0, side.baseline_z());
                self.spawn(
                    KubbKind::Baseline,
                    Some(side),
                    pos,
                    KubbStatus::Standing,
                    now,
                    out,
                )
            })
            .collect()
    }

    /// The king at the centre of the pitch
    pub fn create_king(&mut self, now: u64, out: &mut Vec<SimCommand>) -> KubbId {
        let pos = Vec3::new(0.0, GROUND_Y + KING_HEIGHT / 2.0, 0.0);
        self.spawn(KubbKind::King, None, pos, KubbStatus::Standing, now, out)
    }

    /// `count` field kubbs bound for `destination`, clustered around a random
    /// centre inside the half's field rectangle. They start `InFlight`; their
    /// positions are the planned landing spots until a real landing arrives.
    pub fn create_field_targets<R: Rng>(
        &mut self,
        count: usize,
        destination: Side,
        now: u64,
        rng: &mut R,
        out: &mut Vec<SimCommand>,
    ) -> Vec<KubbId> {
        if count == 0 {
            return Vec::new();
        }
        let (min, max) = field_bounds(destination);
        let centre = Vec2::new(
            rng.random_range(min.x + FIELD_CLUSTER_X..=max.x - FIELD_CLUSTER_X),
            rng.random_range(min.y + FIELD_CLUSTER_Z..=max.y - FIELD_CLUSTER_Z),
        );
        (0..count)
            .map(|_| {
                let x = centre.x + rng.random_range(-FIELD_CLUSTER_X..=FIELD_CLUSTER_X);
                let z = centre.y + rng.random_range(-FIELD_CLUSTER_Z..=FIELD_CLUSTER_Z);
                let pos = clamp_to_field(destination, Vec3::new(x, 0.0, z), KUBB_HEIGHT);
                self.spawn(
                    KubbKind::Field,
                    Some(destination),
                    pos,
                    KubbStatus::InFlight,
                    now,
                    out,
                )
            })
            .collect()
    }

    /// Standing → Down. Monotonic: returns false if the kubb was not standing.
    pub fn mark_down(&mut self, id: KubbId) -> bool {
        match self.get_mut(id) {
            Some(kubb) if kubb.is_standing() && !kubb.has_fired => {
                kubb.status = KubbStatus::Down;
                kubb.has_fired = true;
                true
            }
            _ => false,
        }
    }

    /// Settle an in-flight field kubb at its landing spot
    pub fn land(&mut self, id: KubbId, position: Vec3, raise_pending: bool, now: u64) -> bool {
        match self.get_mut(id) {
            Some(kubb) if kubb.status == KubbStatus::InFlight => {
                kubb.position = position;
                kubb.spawned_at = now;
                kubb.status = if raise_pending {
                    KubbStatus::LandedUnraised
                } else {
                    KubbStatus::Standing
                };
                true
            }
            _ => false,
        }
    }

    /// Raise a landed kubb on the chosen edge; it stays classified as standing
    pub fn mark_raised(&mut self, id: KubbId, edge: RaiseEdge, now: u64) -> bool {
        match self.get_mut(id) {
            Some(kubb) if kubb.status == KubbStatus::LandedUnraised => {
                kubb.height = edge.height();
                kubb.position.y = GROUND_Y + kubb.height / 2.0;
                kubb.status = KubbStatus::Standing;
                kubb.spawned_at = now;
                true
            }
            _ => false,
        }
    }

    /// Standing kubbs of a kind on a half (`None` addresses the king)
    pub fn standing(&self, side: Option<Side>, kind: KubbKind) -> impl Iterator<Item = &Kubb> {
        self.kubbs
            .iter()
            .filter(move |k| k.side == side && k.kind == kind && k.is_standing())
    }

    pub fn standing_count(&self, side: Option<Side>, kind: KubbKind) -> usize {
        self.standing(side, kind).count()
    }

    /// Kubbs on a half that still count for the king rule
    pub fn live_count(&self, side: Side) -> usize {
        self.kubbs
            .iter()
            .filter(|k| k.side == Some(side) && k.is_live())
            .count()
    }

    /// Retire knocked field kubbs on a half once they have been re-queued
    pub fn clear_down_field(&mut self, side: Side) -> usize {
        let before = self.kubbs.len();
        self.kubbs.retain(|k| {
            !(k.side == Some(side) && k.kind == KubbKind::Field && k.status == KubbStatus::Down)
        });
        before - self.kubbs.len()
    }
}
