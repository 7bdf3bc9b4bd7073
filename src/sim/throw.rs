//! Throw intents to launch velocities
//!
//! A throw intent is what the UI (or the bot) asks for: power, sideways aim,
//! spin and arc. The translator turns it into the linear and angular velocity
//! the simulator applies at release. Wind is added on top.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::state::Side;
use crate::consts::GRAVITY;

/// Arc used for baton throws unless the intent says otherwise
pub const BATON_ARC_DEGREES: f32 = 20.0;
/// Arc used for kubb tosses unless the intent says otherwise
pub const KUBB_ARC_DEGREES: f32 = 45.0;

const MIN_ARC_DEGREES: f32 = 5.0;
const MAX_ARC_DEGREES: f32 = 75.0;

/// Requested throw (power 0–1, aim and spin -1–1)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThrowIntent {
    pub power: f32,
    pub aim_offset: f32,
    pub spin: f32,
    pub arc_degrees: f32,
}

impl ThrowIntent {
    pub fn baton(power: f32, aim_offset: f32) -> Self {
        Self {
            power,
            aim_offset,
            spin: 0.0,
            arc_degrees: BATON_ARC_DEGREES,
        }
    }

    pub fn kubb(power: f32, aim_offset: f32, spin: f32) -> Self {
        Self {
            power,
            aim_offset,
            spin,
            arc_degrees: KUBB_ARC_DEGREES,
        }
    }

    /// Clamp into range. Power above 1 is read as a percentage.
    pub fn normalized(self) -> Self {
        let power = if self.power > 1.0 {
            self.power / 100.0
        } else {
            self.power
        };
        let finite = |v: f32| if v.is_finite() { v } else { 0.0 };
        let arc = if self.arc_degrees.is_finite() {
            self.arc_degrees.clamp(MIN_ARC_DEGREES, MAX_ARC_DEGREES)
        } else {
            BATON_ARC_DEGREES
        };
        Self {
            power: finite(power).clamp(0.0, 1.0),
            aim_offset: finite(self.aim_offset).clamp(-1.0, 1.0),
            spin: finite(self.spin).clamp(-1.0, 1.0),
            arc_degrees: arc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThrowKind {
    Baton,
    Kubb,
}

/// Speed and spin ranges for one kind of throw
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaunchProfile {
    /// Release speed at zero power
    pub min_speed: f32,
    /// Extra speed at full power
    pub power_speed: f32,
    /// Sideways speed at full aim offset
    pub lateral_speed: f32,
    /// End-over-end rotation at zero power
    pub base_flip: f32,
    /// Extra end-over-end rotation at full power
    pub power_flip: f32,
    /// Rotation about the vertical axis at full spin
    pub spin_rate: f32,
}

impl LaunchProfile {
    pub const BATON: Self = Self {
        min_speed: 8.0,
        power_speed: 8.0,
        lateral_speed: 3.0,
        base_flip: 8.0,
        power_flip: 4.0,
        spin_rate: 3.0,
    };

    pub const KUBB: Self = Self {
        min_speed: 4.0,
        power_speed: 9.0,
        lateral_speed: 1.5,
        base_flip: 0.0,
        power_flip: 0.0,
        spin_rate: 5.0,
    };

    fn speed(&self, power: f32) -> f32 {
        self.min_speed + self.power_speed * power
    }

    /// Inverse of `speed`, unclamped
    fn power_for(&self, speed: f32) -> f32 {
        (speed - self.min_speed) / self.power_speed
    }
}

/// Velocities applied at release
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Launch {
    pub linear: Vec3,
    pub angular: Vec3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrowParameterTranslator {
    pub baton: LaunchProfile,
    pub kubb: LaunchProfile,
}

impl Default for ThrowParameterTranslator {
    fn default() -> Self {
        Self {
            baton: LaunchProfile::BATON,
            kubb: LaunchProfile::KUBB,
        }
    }
}

impl ThrowParameterTranslator {
    pub fn profile(&self, kind: ThrowKind) -> &LaunchProfile {
        match kind {
            ThrowKind::Baton => &self.baton,
            ThrowKind::Kubb => &self.kubb,
        }
    }

    /// Launch velocities for a throw by `side`, wind in (x, z)
    pub fn translate(
        &self,
        kind: ThrowKind,
        side: Side,
        intent: ThrowIntent,
        wind: Vec2,
    ) -> Launch {
        let intent = intent.normalized();
        let profile = self.profile(kind);
        let dir = side.throw_direction();
        let arc = intent.arc_degrees.to_radians();
        let speed = profile.speed(intent.power);

        let linear = Vec3::new(
            intent.aim_offset * profile.lateral_speed + wind.x,
            speed * arc.sin(),
            dir * speed * arc.cos() + wind.y,
        );
        let flip = profile.base_flip + profile.power_flip * intent.power;
        let angular = Vec3::new(dir * flip, intent.spin * profile.spin_rate, 0.0);
        Launch { linear, angular }
    }

    /// Intent that carries a throw from `from` to `to` at the given arc,
    /// compensating for wind. Out-of-reach targets saturate power.
    pub fn intent_for_target(
        &self,
        kind: ThrowKind,
        side: Side,
        from: Vec3,
        to: Vec3,
        arc_degrees: f32,
        wind: Vec2,
    ) -> ThrowIntent {
        let profile = self.profile(kind);
        let arc = arc_degrees
            .clamp(MIN_ARC_DEGREES, MAX_ARC_DEGREES)
            .to_radians();
        let dir = side.throw_direction();
        let dx = to.x - from.x;
        let dz = to.z - from.z;
        let dy = to.y - from.y;

        // Still-air solution, then refine flight time against the wind drift
        let mut speed = ballistic_speed(dz.abs(), dy, arc);
        let mut t = flight_time(speed * arc.sin(), dy);
        for _ in 0..8 {
            let throw_vz = dz / t - wind.y;
            let next = (throw_vz * dir).max(0.0) / arc.cos();
            speed = 0.5 * (speed + next);
            t = flight_time(speed * arc.sin(), dy);
        }
        let throw_vx = dx / t - wind.x;

        ThrowIntent {
            power: profile.power_for(speed),
            aim_offset: throw_vx / profile.lateral_speed,
            spin: 0.0,
            arc_degrees,
        }
        .normalized()
    }

    /// Sample the ballistic path of a launch until it meets the ground
    pub fn preview_trajectory(
        start: Vec3,
        launch: &Launch,
        steps: usize,
        step_dt: f32,
    ) -> Vec<Vec3> {
        let mut points = Vec::with_capacity(steps);
        for i in 0..steps {
            let t = i as f32 * step_dt;
            let p = start + launch.linear * t + Vec3::new(0.0, -0.5 * GRAVITY * t * t, 0.0);
            points.push(p);
            if i > 0 && p.y <= 0.0 {
                break;
            }
        }
        points
    }
}

/// Release speed reaching ground distance `d` with height change `dy` at `arc` radians
fn ballistic_speed(d: f32, dy: f32, arc: f32) -> f32 {
    let cos = arc.cos();
    let lift = d * arc.tan() - dy;
    if d <= f32::EPSILON || lift <= f32::EPSILON {
        return 0.0;
    }
    (GRAVITY * d * d / (2.0 * cos * cos * lift)).sqrt()
}

/// Time for a body launched upward at `vy` to come down at height `dy`
fn flight_time(vy: f32, dy: f32) -> f32 {
    let disc = vy * vy - 2.0 * GRAVITY * dy;
    let t = if disc > 0.0 {
        (vy + disc.sqrt()) / GRAVITY
    } else {
        vy / GRAVITY
    };
    t.max(0.05)
}
