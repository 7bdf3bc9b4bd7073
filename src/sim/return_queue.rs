//! Return throws: knocked kubbs go back onto the defending half
//!
//! After a turn that knocked kubbs, each one is re-thrown as a field kubb, one
//! at a time. The queue owns the ordering, the landing watch, and the list of
//! landed kubbs still waiting for the player to raise them.

use std::collections::VecDeque;

use glam::{Vec2, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::landing::{Landing, LandingDetector};
use super::registry::{KubbRegistry, clamp_to_field};
use super::state::{BodyId, KubbId, RaiseEdge, Side, SimCommand};
use super::throw::{ThrowIntent, ThrowKind, ThrowParameterTranslator};
use crate::consts::KUBB_HEIGHT;
use crate::secs_to_ticks;
use crate::tuning::Tuning;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnQueueEntry {
    /// The field kubb being thrown
    pub kubb_id: KubbId,
    /// The knocked kubb it replaces
    pub source_id: KubbId,
    /// Where the knocked kubb stood
    pub original_position: Vec3,
    pub destination: Side,
    /// Planned landing spot inside the destination field
    pub aim: Vec3,
}

/// A completed return throw
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandedKubb {
    pub kubb_id: KubbId,
    pub position: Vec3,
    pub fallback: bool,
    pub raise_pending: bool,
}

#[derive(Debug, Clone)]
pub struct ReturnThrowQueue {
    /// Player-thrown kubbs wait for a manual raise
    pub manual_raise: bool,
    thrower: Option<Side>,
    pending: VecDeque<ReturnQueueEntry>,
    in_flight: Option<ReturnQueueEntry>,
    awaiting_raise: VecDeque<KubbId>,
    detector: LandingDetector,
}

impl ReturnThrowQueue {
    pub fn from_tuning(tuning: &Tuning) -> Self {
        Self {
            manual_raise: tuning.manual_raise,
            thrower: None,
            pending: VecDeque::new(),
            in_flight: None,
            awaiting_raise: VecDeque::new(),
            detector: LandingDetector::new(
                tuning.landing_speed_threshold,
                secs_to_ticks(tuning.landing_settle_secs),
                secs_to_ticks(tuning.flight_timeout_secs),
            ),
        }
    }

    pub fn thrower(&self) -> Option<Side> {
        self.thrower
    }

    pub fn pending(&self) -> impl Iterator<Item = &ReturnQueueEntry> {
        self.pending.iter()
    }

    pub fn in_flight(&self) -> Option<&ReturnQueueEntry> {
        self.in_flight.as_ref()
    }

    /// Landed kubbs must be raised by hand
    pub fn raises_pending_for(&self, thrower: Side) -> bool {
        self.manual_raise && thrower == Side::Player
    }

    /// Queue the kubbs `thrower` knocked down. Each one becomes a new field
    /// kubb on the opposing half; knocked field kubbs there are retired.
    /// Returns the number of entries queued.
    pub fn build<R: Rng>(
        &mut self,
        thrower: Side,
        knocked: &[KubbId],
        registry: &mut KubbRegistry,
        now: u64,
        rng: &mut R,
        out: &mut Vec<SimCommand>,
    ) -> usize {
        self.clear();
        let destination = thrower.opponent();

        let mut sources: Vec<(KubbId, Vec3)> = Vec::with_capacity(knocked.len());
        for &id in knocked {
            if sources.iter().any(|(seen, _)| *seen == id) {
                continue;
            }
            if let Some(kubb) = registry.get(id) {
                sources.push((id, kubb.position));
            }
        }
        if sources.is_empty() {
            return 0;
        }

        let retired = registry.clear_down_field(destination);
        let ids = registry.create_field_targets(sources.len(), destination, now, rng, out);
        for ((source_id, original_position), kubb_id) in sources.into_iter().zip(ids) {
            let aim = registry.get(kubb_id).map_or(original_position, |k| k.position);
            self.pending.push_back(ReturnQueueEntry {
                kubb_id,
                source_id,
                original_position,
                destination,
                aim,
            });
        }
        self.thrower = Some(thrower);
        log::info!(
            "{} returns {} kubbs to the {} half ({} knocked field kubbs retired)",
            thrower.as_str(),
            self.pending.len(),
            destination.as_str(),
            retired
        );
        self.pending.len()
    }

    /// Next entry to be thrown
    pub fn peek_next(&self) -> Option<&ReturnQueueEntry> {
        self.pending.front()
    }

    /// Release point for an entry: behind the thrower's baseline, in line
    /// with where the knocked kubb stood
    pub fn launch_origin(&self, entry: &ReturnQueueEntry) -> Vec3 {
        entry
            .destination
            .opponent()
            .baton_ready_position(entry.original_position.x)
    }

    /// Throw the next queued kubb. Only one kubb is airborne at a time.
    pub fn launch_next(
        &mut self,
        translator: &ThrowParameterTranslator,
        intent: ThrowIntent,
        wind: Vec2,
        now: u64,
        out: &mut Vec<SimCommand>,
    ) -> Option<ReturnQueueEntry> {
        let thrower = self.thrower?;
        if self.in_flight.is_some() {
            return None;
        }
        let entry = self.pending.pop_front()?;
        let origin = self.launch_origin(&entry);
        let launch = translator.translate(ThrowKind::Kubb, thrower, intent, wind);
        let body = BodyId::Kubb(entry.kubb_id);
        out.push(SimCommand::ResetBody {
            body,
            position: origin,
        });
        out.push(SimCommand::SetVelocity {
            body,
            linear: launch.linear,
            angular: launch.angular,
        });
        self.detector.track(body, origin, now);
        self.in_flight = Some(entry);
        Some(entry)
    }

    pub fn observe_motion(
        &mut self,
        body: BodyId,
        position: Vec3,
        speed: f32,
        now: u64,
    ) -> Option<Landing> {
        self.detector.observe_motion(body, position, speed, now)
    }

    pub fn observe_out_of_bounds(&mut self, body: BodyId, position: Vec3) -> Option<Landing> {
        self.detector.observe_out_of_bounds(body, position)
    }

    pub fn poll_timeout(&mut self, now: u64) -> Vec<Landing> {
        self.detector.poll_timeout(now)
    }

    /// Settle the in-flight kubb. The landing spot is clamped into the
    /// destination field and the kubb is stood up there.
    pub fn complete_landing(
        &mut self,
        landing: Landing,
        registry: &mut KubbRegistry,
        now: u64,
        out: &mut Vec<SimCommand>,
    ) -> Option<LandedKubb> {
        let entry = self.in_flight.filter(|e| BodyId::Kubb(e.kubb_id) == landing.body)?;
        let thrower = self.thrower?;
        self.in_flight = None;

        let position = clamp_to_field(entry.destination, landing.position, KUBB_HEIGHT);
        if landing.fallback {
            log::warn!(
                "Kubb {} never settled, placed at ({:.2}, {:.2})",
                entry.kubb_id,
                position.x,
                position.z
            );
        }
        let raise_pending = self.raises_pending_for(thrower);
        if !registry.land(entry.kubb_id, position, raise_pending, now) {
            return None;
        }
        out.push(SimCommand::ResetBody {
            body: landing.body,
            position,
        });
        if raise_pending {
            self.awaiting_raise.push_back(entry.kubb_id);
        }
        Some(LandedKubb {
            kubb_id: entry.kubb_id,
            position,
            fallback: landing.fallback,
            raise_pending,
        })
    }

    /// Raise the oldest landed kubb on the chosen edge
    pub fn raise_next(
        &mut self,
        edge: RaiseEdge,
        registry: &mut KubbRegistry,
        now: u64,
        out: &mut Vec<SimCommand>,
    ) -> Option<KubbId> {
        let id = self.awaiting_raise.pop_front()?;
        if !registry.mark_raised(id, edge, now) {
            return None;
        }
        if let Some(kubb) = registry.get(id) {
            out.push(SimCommand::ResetBody {
                body: BodyId::Kubb(id),
                position: kubb.position,
            });
        }
        Some(id)
    }

    pub fn all_landed(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_none()
    }

    pub fn all_raised(&self) -> bool {
        self.awaiting_raise.is_empty()
    }

    /// Forget the current batch
    pub fn clear(&mut self) {
        self.thrower = None;
        self.pending.clear();
        self.in_flight = None;
        self.awaiting_raise.clear();
        self.detector.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::sim::registry::field_bounds;
    use crate::sim::state::{KubbKind, KubbStatus};
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    struct Fixture {
        queue: ReturnThrowQueue,
        reg: KubbRegistry,
        rng: Pcg32,
        out: Vec<SimCommand>,
        knocked: Vec<KubbId>,
    }

    fn fixture(manual_raise: bool) -> Fixture {
        let tuning = Tuning {
            manual_raise,
            ..Tuning::default()
        };
        let mut reg = KubbRegistry::new();
        let mut out = Vec::new();
        let bot = reg.create_baseline_targets(Side::Bot, 0, &mut out);
        reg.mark_down(bot[1]);
        reg.mark_down(bot[3]);
        Fixture {
            queue: ReturnThrowQueue::from_tuning(&tuning),
            reg,
            rng: Pcg32::seed_from_u64(9),
            out: Vec::new(),
            knocked: vec![bot[1], bot[3], bot[1]],
        }
    }

    #[test]
    fn test_build_dedupes_and_targets_opponent_half() {
        let mut f = fixture(false);
        let n = f.queue.build(Side::Player, &f.knocked, &mut f.reg, 0, &mut f.rng, &mut f.out);
        assert_eq!(n, 2);
        let entries: Vec<_> = f.queue.pending().copied().collect();
        assert!(entries.iter().all(|e| e.destination == Side::Bot));
        assert_eq!(entries[0].original_position.z, Side::Bot.baseline_z());
        assert_eq!(f.reg.live_count(Side::Bot), 3 + 2);
        let origin = f.queue.launch_origin(&entries[0]);
        assert!(origin.z > BASELINE_Z);
    }

    #[test]
    fn test_one_in_flight_at_a_time() {
        let mut f = fixture(false);
        let t = ThrowParameterTranslator::default();
        f.queue.build(Side::Player, &f.knocked, &mut f.reg, 0, &mut f.rng, &mut f.out);
        let intent = ThrowIntent::kubb(0.6, 0.0, 0.0);
        assert!(f.queue.launch_next(&t, intent, Vec2::ZERO, 10, &mut f.out).is_some());
        assert!(f.queue.launch_next(&t, intent, Vec2::ZERO, 11, &mut f.out).is_none());
        assert!(!f.queue.all_landed());
    }

    #[test]
    fn test_auto_raise_landing_stands_kubb() {
        let mut f = fixture(false);
        let t = ThrowParameterTranslator::default();
        f.queue.build(Side::Bot, &f.knocked, &mut f.reg, 0, &mut f.rng, &mut f.out);
        let intent = ThrowIntent::kubb(0.5, 0.0, 0.0);
        let entry = f.queue.launch_next(&t, intent, Vec2::ZERO, 0, &mut f.out);
        let entry = entry.expect("queued entry");
        assert_eq!(entry.destination, Side::Player);
        let body = BodyId::Kubb(entry.kubb_id);
        let spot = Vec3::new(0.4, 0.3, 4.0);
        let mut landed = None;
        for now in 1..=200 {
            if let Some(l) = f.queue.observe_motion(body, spot, 0.1, now) {
                landed = f.queue.complete_landing(l, &mut f.reg, now, &mut f.out);
                break;
            }
        }
        let landed = landed.expect("kubb settles");
        assert!(!landed.raise_pending && !landed.fallback);
        assert_eq!(f.reg.get(entry.kubb_id).map(|k| k.status), Some(KubbStatus::Standing));
        assert!(f.queue.all_raised());
    }

    #[test]
    fn test_fallback_landing_is_clamped() {
        let mut f = fixture(true);
        let t = ThrowParameterTranslator::default();
        f.queue.build(Side::Player, &f.knocked, &mut f.reg, 0, &mut f.rng, &mut f.out);
        let entry = f
            .queue
            .launch_next(&t, ThrowIntent::kubb(1.0, 1.0, 0.0), Vec2::ZERO, 0, &mut f.out)
            .expect("queued entry");
        let body = BodyId::Kubb(entry.kubb_id);
        // Flew off the side of the world
        let landing = f
            .queue
            .observe_out_of_bounds(body, Vec3::new(24.0, -2.0, -12.0))
            .expect("fallback landing");
        let landed = f
            .queue
            .complete_landing(landing, &mut f.reg, 50, &mut f.out)
            .expect("landed");
        let (min, max) = field_bounds(Side::Bot);
        assert!(landed.fallback);
        assert_eq!(landed.position.x, max.x);
        assert_eq!(landed.position.z, min.y);
        assert!(landed.raise_pending);
        assert_eq!(f.reg.get(entry.kubb_id).map(|k| k.status), Some(KubbStatus::LandedUnraised));

        let raised = f.queue.raise_next(RaiseEdge::Top, &mut f.reg, 60, &mut f.out);
        assert_eq!(raised, Some(entry.kubb_id));
        assert_eq!(f.reg.get(entry.kubb_id).map(|k| k.height), Some(KUBB_RAISED_TOP_HEIGHT));
        assert_eq!(f.reg.standing_count(Some(Side::Bot), KubbKind::Field), 1);
        assert!(f.queue.all_raised());
    }

    #[test]
    fn test_timeout_completes_landing() {
        let mut f = fixture(false);
        let t = ThrowParameterTranslator::default();
        f.queue.build(Side::Player, &f.knocked, &mut f.reg, 0, &mut f.rng, &mut f.out);
        f.queue.launch_next(&t, ThrowIntent::kubb(0.5, 0.0, 0.0), Vec2::ZERO, 0, &mut f.out);
        let timeout = secs_to_ticks(Tuning::default().flight_timeout_secs);
        assert!(f.queue.poll_timeout(timeout - 1).is_empty());
        let landings = f.queue.poll_timeout(timeout);
        assert_eq!(landings.len(), 1);
        assert!(f.queue.complete_landing(landings[0], &mut f.reg, timeout, &mut f.out).is_some());
        assert!(!f.queue.all_landed());
    }
}
