//! Crosswind added to every launch

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Strength scale (0 = calm)
pub const MAX_STRENGTH: f32 = 10.0;
/// Horizontal speed added at full strength
pub const MAX_WIND_SPEED: f32 = 2.0;

/// Wind over the pitch. Direction is radians clockwise from north (-z).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Wind {
    pub direction: f32,
    pub strength: f32,
}

impl Wind {
    pub fn calm() -> Self {
        Self::default()
    }

    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self {
            direction: rng.random_range(0.0..TAU),
            strength: rng.random_range(0.0..MAX_STRENGTH),
        }
    }

    /// Small drift between throws
    pub fn shift<R: Rng>(&mut self, rng: &mut R) {
        self.strength = (self.strength + rng.random_range(-0.1..=0.1)).clamp(0.0, MAX_STRENGTH);
        let turn = rng.random_range(-1.0f32..=1.0).to_radians();
        self.direction = (self.direction + turn).rem_euclid(TAU);
    }

    /// Velocity added to a launch, in (x, z)
    pub fn velocity(&self) -> Vec2 {
        let factor = self.strength / MAX_STRENGTH * MAX_WIND_SPEED;
        Vec2::new(self.direction.sin() * factor, -self.direction.cos() * factor)
    }

    /// Eight-point compass label
    pub fn label(&self) -> &'static str {
        const LABELS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
        let degrees = self.direction.to_degrees().rem_euclid(360.0);
        let sector = ((degrees + 22.5) / 45.0) as usize % 8;
        LABELS[sector]
    }
}
