//! Settle detection for thrown bodies
//!
//! A body has landed once its reported speed stays under a threshold for a
//! settle window. Bodies that leave the world, or stay airborne past the
//! flight timeout, land by fallback at their last known position.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::state::BodyId;
use crate::is_out_of_world;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landing {
    pub body: BodyId,
    pub position: Vec3,
    /// Forced by the out-of-world or timeout fallback
    pub fallback: bool,
}

#[derive(Debug, Clone, Copy)]
struct Tracked {
    launched_at: u64,
    slow_since: Option<u64>,
    last_position: Vec3,
}

#[derive(Debug, Clone)]
pub struct LandingDetector {
    pub speed_threshold: f32,
    pub settle_ticks: u64,
    pub timeout_ticks: u64,
    tracked: BTreeMap<BodyId, Tracked>,
}

impl LandingDetector {
    pub fn new(speed_threshold: f32, settle_ticks: u64, timeout_ticks: u64) -> Self {
        Self {
            speed_threshold,
            settle_ticks,
            timeout_ticks,
            tracked: BTreeMap::new(),
        }
    }

    /// Start watching a body launched from `origin`
    pub fn track(&mut self, body: BodyId, origin: Vec3, now: u64) {
        self.tracked.insert(
            body,
            Tracked {
                launched_at: now,
                slow_since: None,
                last_position: origin,
            },
        );
    }

    pub fn is_tracking(&self, body: BodyId) -> bool {
        self.tracked.contains_key(&body)
    }

    pub fn clear(&mut self) {
        self.tracked.clear();
    }

    /// Per-frame motion read-back. Untracked bodies are ignored.
    pub fn observe_motion(
        &mut self,
        body: BodyId,
        position: Vec3,
        speed: f32,
        now: u64,
    ) -> Option<Landing> {
        let entry = self.tracked.get_mut(&body)?;
        entry.last_position = position;
        if is_out_of_world(position) {
            return self.finish(body, position, true);
        }
        if speed < self.speed_threshold {
            let since = *entry.slow_since.get_or_insert(now);
            if now.saturating_sub(since) >= self.settle_ticks {
                return self.finish(body, position, false);
            }
        } else {
            entry.slow_since = None;
        }
        None
    }

    /// The simulator saw the body leave the world
    pub fn observe_out_of_bounds(&mut self, body: BodyId, position: Vec3) -> Option<Landing> {
        if !self.is_tracking(body) {
            return None;
        }
        self.finish(body, position, true)
    }

    /// Force-land bodies that have been airborne too long
    pub fn poll_timeout(&mut self, now: u64) -> Vec<Landing> {
        let expired: Vec<(BodyId, Vec3)> = self
            .tracked
            .iter()
            .filter(|(_, t)| now.saturating_sub(t.launched_at) >= self.timeout_ticks)
            .map(|(body, t)| (*body, t.last_position))
            .collect();
        expired
            .into_iter()
            .filter_map(|(body, position)| self.finish(body, position, true))
            .collect()
    }

    fn finish(&mut self, body: BodyId, position: Vec3, fallback: bool) -> Option<Landing> {
        self.tracked.remove(&body)?;
        Some(Landing {
            body,
            position,
            fallback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: BodyId = BodyId::Kubb(3);

    fn detector() -> LandingDetector {
        let mut d = LandingDetector::new(0.5, 60, 960);
        d.track(BODY, Vec3::new(0.0, 1.0, 8.0), 0);
        d
    }

    #[test]
    fn test_settles_after_sustained_slow_speed() {
        let mut d = detector();
        let pos = Vec3::new(0.0, 0.3, -3.0);
        assert!(d.observe_motion(BODY, pos, 0.2, 100).is_none());
        assert!(d.observe_motion(BODY, pos, 0.2, 159).is_none());
        let landing = d.observe_motion(BODY, pos, 0.2, 160);
        assert_eq!(landing, Some(Landing { body: BODY, position: pos, fallback: false }));
        assert!(!d.is_tracking(BODY));
    }

    #[test]
    fn test_bounce_restarts_settle_window() {
        let mut d = detector();
        let pos = Vec3::ZERO;
        d.observe_motion(BODY, pos, 0.1, 10);
        d.observe_motion(BODY, pos, 3.0, 50);
        assert!(d.observe_motion(BODY, pos, 0.1, 80).is_none());
        assert!(d.observe_motion(BODY, pos, 0.1, 120).is_none());
        assert!(d.observe_motion(BODY, pos, 0.1, 140).is_some());
    }

    #[test]
    fn test_out_of_world_is_fallback() {
        let mut d = detector();
        let landing = d.observe_motion(BODY, Vec3::new(0.0, -6.0, 0.0), 9.0, 30);
        assert!(landing.is_some_and(|l| l.fallback));
        let mut d = detector();
        let landing = d.observe_out_of_bounds(BODY, Vec3::new(30.0, 0.0, 0.0));
        assert!(landing.is_some_and(|l| l.fallback));
        assert!(d.observe_out_of_bounds(BODY, Vec3::ZERO).is_none());
    }

    #[test]
    fn test_timeout_uses_last_position() {
        let mut d = detector();
        let last = Vec3::new(1.0, 2.0, -4.0);
        d.observe_motion(BODY, last, 4.0, 500);
        assert!(d.poll_timeout(959).is_empty());
        let landed = d.poll_timeout(960);
        assert_eq!(landed, vec![Landing { body: BODY, position: last, fallback: true }]);
    }

    #[test]
    fn test_untracked_bodies_ignored() {
        let mut d = detector();
        assert!(d.observe_motion(BodyId::Baton, Vec3::ZERO, 0.0, 1000).is_none());
        d.clear();
        assert!(d.poll_timeout(10_000).is_empty());
    }
}
