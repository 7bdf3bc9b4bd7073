//! Deterministic match engine
//!
//! All rules logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by kubb id)
//! - No rendering, physics or platform dependencies

pub mod bot;
pub mod collision;
pub mod landing;
pub mod registry;
pub mod return_queue;
pub mod schedule;
pub mod scoring;
pub mod state;
pub mod throw;
pub mod tick;
pub mod turn;
pub mod wind;

pub use bot::{BotAi, BotThrow};
pub use collision::{CollisionResolver, Hit, Impact};
pub use landing::{Landing, LandingDetector};
pub use registry::{KubbRegistry, clamp_to_field, field_bounds};
pub use return_queue::{LandedKubb, ReturnQueueEntry, ReturnThrowQueue};
pub use schedule::{ScheduledAction, Scheduler};
pub use scoring::ScoringEngine;
pub use state::{
    BodyId, CollisionFilter, GameEvent, KingVerdict, Kubb, KubbId, KubbKind, KubbStatus,
    KubbView, MatchFault, MatchSnapshot, MatchState, Notification, RaiseEdge, Side, SimCommand,
};
pub use throw::{Launch, ThrowIntent, ThrowKind, ThrowParameterTranslator};
pub use tick::{HostEvent, PlayerAction, TickInput, tick};
pub use turn::{GamePhase, TurnState};
pub use wind::Wind;
