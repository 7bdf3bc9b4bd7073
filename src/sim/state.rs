//! Match state and core simulation types
//!
//! Everything the reducer mutates lives in [`MatchState`]. Other components
//! receive borrowed views of it and never hold their own copies.

use glam::Vec3;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::bot::BotAi;
use super::collision::CollisionResolver;
use super::registry::KubbRegistry;
use super::return_queue::ReturnThrowQueue;
use super::schedule::Scheduler;
use super::scoring::ScoringEngine;
use super::throw::ThrowParameterTranslator;
use super::turn::{GamePhase, TurnState};
use super::wind::Wind;
use crate::consts::*;
use crate::tuning::Tuning;

/// One of the two competing sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    /// The human player (owns the +z half)
    Player,
    /// The computer opponent (owns the -z half)
    Bot,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Player, Side::Bot];

    pub fn opponent(self) -> Side {
        match self {
            Side::Player => Side::Bot,
            Side::Bot => Side::Player,
        }
    }

    /// Array slot for per-side counters
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Side::Player => 0,
            Side::Bot => 1,
        }
    }

    /// Sign of z on this side's half
    #[inline]
    pub fn half_sign(self) -> f32 {
        match self {
            Side::Player => 1.0,
            Side::Bot => -1.0,
        }
    }

    /// Sign of z velocity when this side throws toward the opponent
    #[inline]
    pub fn throw_direction(self) -> f32 {
        -self.half_sign()
    }

    /// z coordinate of this side's back line
    #[inline]
    pub fn baseline_z(self) -> f32 {
        BASELINE_Z * self.half_sign()
    }

    /// Where the idle baton waits before a throw
    pub fn baton_ready_position(self, x: f32) -> Vec3 {
        Vec3::new(
            x,
            BATON_READY_Y,
            (BASELINE_Z + BATON_BEHIND_BASELINE) * self.half_sign(),
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Player => "player",
            Side::Bot => "bot",
        }
    }
}

/// Kubb identifier (stable for the lifetime of a match)
pub type KubbId = u32;

/// Kubb roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KubbKind {
    /// One of the five fixed kubbs on a back line
    Baseline,
    /// A kubb tossed onto a half after being knocked down
    Field,
    /// The centre kubb whose fall ends the match
    King,
}

/// Kubb lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KubbStatus {
    #[default]
    Standing,
    /// Toppling after a hit (transient)
    Falling,
    /// Knocked over; never stands again this match unless re-thrown as a new field kubb
    Down,
    /// Being thrown back onto a half
    InFlight,
    /// Landed on a half, waiting for the player to raise it
    LandedUnraised,
}

/// Which edge a returned kubb is raised on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaiseEdge {
    /// Stands on the top edge: shorter, harder to hit
    Top,
    /// Stands on the bottom edge: taller, easier to hit
    Bottom,
}

impl RaiseEdge {
    pub fn height(self) -> f32 {
        match self {
            RaiseEdge::Top => KUBB_RAISED_TOP_HEIGHT,
            RaiseEdge::Bottom => KUBB_HEIGHT,
        }
    }
}

/// Simulator collision groups
pub mod groups {
    pub const PLAYER_BATON: u32 = 1 << 0;
    pub const BOT_BATON: u32 = 1 << 1;
    pub const KUBB: u32 = 1 << 2;
    pub const GROUND: u32 = 1 << 3;
}

/// Collision group/mask pair sent to the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionFilter {
    pub group: u32,
    pub mask: u32,
}

impl CollisionFilter {
    /// Filter for a kubb standing on `side`'s half (only the opposing baton topples it)
    pub fn for_half(side: Side) -> Self {
        let baton = match side.opponent() {
            Side::Player => groups::PLAYER_BATON,
            Side::Bot => groups::BOT_BATON,
        };
        Self {
            group: groups::KUBB,
            mask: baton | groups::KUBB | groups::GROUND,
        }
    }

    /// The king can be toppled by either baton
    pub fn king() -> Self {
        Self {
            group: groups::KUBB,
            mask: groups::PLAYER_BATON | groups::BOT_BATON | groups::KUBB | groups::GROUND,
        }
    }

    /// Baton owned by `side`
    pub fn baton(side: Side) -> Self {
        let group = match side {
            Side::Player => groups::PLAYER_BATON,
            Side::Bot => groups::BOT_BATON,
        };
        Self {
            group,
            mask: groups::KUBB | groups::GROUND,
        }
    }

    #[inline]
    pub fn accepts(&self, group: u32) -> bool {
        self.mask & group != 0
    }
}

/// A kubb entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kubb {
    pub id: KubbId,
    pub kind: KubbKind,
    /// Half the kubb stands on (`None` for the king at the centre)
    pub side: Option<Side>,
    pub position: Vec3,
    pub status: KubbStatus,
    /// Effective height (changes when raised on the top edge)
    pub height: f32,
    pub filter: CollisionFilter,
    /// Tick the kubb was last placed (start of the impact grace window)
    pub spawned_at: u64,
    /// Latched on the first scoring hit
    pub has_fired: bool,
}

impl Kubb {
    /// Upright on its half (raised or still waiting for a raise)
    pub fn is_standing(&self) -> bool {
        matches!(self.status, KubbStatus::Standing | KubbStatus::LandedUnraised)
    }

    /// Still a live target for the king rule (standing or on its way to a half)
    pub fn is_live(&self) -> bool {
        self.is_standing() || self.status == KubbStatus::InFlight
    }
}

/// Bodies the core addresses in the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BodyId {
    Baton,
    Kubb(KubbId),
}

/// Baton state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatonState {
    Idle,
    Thrown,
}

/// The single baton shared by both sides
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Baton {
    pub owner: Side,
    pub state: BatonState,
}

/// Commands issued to the physics simulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimCommand {
    /// Teleport a body and zero its motion
    ResetBody { body: BodyId, position: Vec3 },
    /// Set a body's linear and angular velocity
    SetVelocity {
        body: BodyId,
        linear: Vec3,
        angular: Vec3,
    },
    /// Restrict which bodies can touch this one
    SetCollisionFilter { body: BodyId, filter: CollisionFilter },
    /// Apply an impulse at a local offset and set spin
    ApplyImpulse {
        body: BodyId,
        impulse: Vec3,
        offset: Vec3,
        angular: Vec3,
    },
}

/// Outcome of a king hit for the side that felled it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KingVerdict {
    Win,
    Lose,
}

/// Notifications for the UI / audio layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    PhaseChanged {
        from: GamePhase,
        to: GamePhase,
    },
    RoundStarted {
        round: u32,
    },
    BatonThrown {
        side: Side,
        remaining: u8,
    },
    KubbHit {
        kubb: KubbId,
        side: Option<Side>,
        turn_owner: Side,
        scored: bool,
    },
    KingFelled {
        by: Side,
        verdict: KingVerdict,
    },
    FieldKubbsQueued {
        count: usize,
        destination: Side,
    },
    KubbThrown {
        kubb: KubbId,
        thrower: Side,
    },
    KubbLanded {
        kubb: KubbId,
        position: Vec3,
        fallback: bool,
    },
    KubbRaised {
        kubb: KubbId,
        edge: RaiseEdge,
    },
    MustReset,
    MatchReset,
}

/// A notification stamped with its position in the match's event stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub seq: u64,
    pub tick: u64,
    pub event: GameEvent,
}

/// Unrecoverable host-side conditions; the match waits for a reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchFault {
    SimulatorDisconnected,
}

/// Complete match state (single writer: [`super::tick`])
#[derive(Debug, Clone)]
pub struct MatchState {
    pub tuning: Tuning,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub turn: TurnState,
    pub registry: KubbRegistry,
    pub scoring: ScoringEngine,
    pub resolver: CollisionResolver,
    pub translator: ThrowParameterTranslator,
    pub returns: ReturnThrowQueue,
    pub bot: BotAi,
    pub scheduler: Scheduler,
    pub wind: Wind,
    pub fault: Option<MatchFault>,
    pub(crate) rng: Pcg32,
    /// Commands waiting to be drained by the host
    pub(crate) outbox: Vec<SimCommand>,
    /// Notifications waiting to be drained by the UI
    pub(crate) notifications: Vec<Notification>,
    /// Next notification sequence number (monotonic across resets)
    event_seq: u64,
}

impl MatchState {
    /// Create a match seeded from the tuning seed
    pub fn new(tuning: Tuning) -> Self {
        let rng = Pcg32::seed_from_u64(tuning.seed);
        Self::with_rng(tuning, rng)
    }

    /// Create a match with an injected RNG. A tuning that fails validation
    /// is replaced by the defaults (keeping its seed).
    pub fn with_rng(tuning: Tuning, rng: Pcg32) -> Self {
        let tuning = match tuning.validate() {
            Ok(()) => tuning,
            Err(e) => {
                log::warn!("{}; falling back to default tuning", e);
                Tuning {
                    seed: tuning.seed,
                    ..Tuning::default()
                }
            }
        };
        let mut state = Self {
            turn: TurnState::new(tuning.batons_per_turn),
            registry: KubbRegistry::new(),
            scoring: ScoringEngine::new(),
            resolver: CollisionResolver::from_tuning(&tuning),
            translator: ThrowParameterTranslator::default(),
            returns: ReturnThrowQueue::from_tuning(&tuning),
            bot: BotAi::from_tuning(&tuning),
            scheduler: Scheduler::new(),
            wind: Wind::calm(),
            fault: None,
            time_ticks: 0,
            rng,
            outbox: Vec::new(),
            notifications: Vec::new(),
            event_seq: 0,
            tuning,
        };
        state.setup_field();
        state
    }

    /// Put every kubb back to the opening layout and start at the player's turn
    pub fn reset(&mut self) {
        self.scheduler.advance_generation();
        self.returns.clear();
        self.outbox.clear();
        self.registry.reset();
        self.scoring.reset();
        self.turn = TurnState::new(self.tuning.batons_per_turn);
        self.fault = None;
        self.setup_field();
        self.emit(GameEvent::MatchReset);
        log::info!("Match reset");
    }

    fn setup_field(&mut self) {
        let now = self.time_ticks;
        for side in Side::BOTH {
            self.registry
                .create_baseline_targets(side, now, &mut self.outbox);
        }
        self.registry.create_king(now, &mut self.outbox);
        self.wind = if self.tuning.wind {
            Wind::random(&mut self.rng)
        } else {
            Wind::calm()
        };
        self.outbox.push(SimCommand::SetCollisionFilter {
            body: BodyId::Baton,
            filter: CollisionFilter::baton(Side::Player),
        });
        self.outbox.push(SimCommand::ResetBody {
            body: BodyId::Baton,
            position: Side::Player.baton_ready_position(0.0),
        });
        log::info!(
            "Match ready: {} kubbs, wind {:.1} from {}",
            self.registry.len(),
            self.wind.strength,
            self.wind.label()
        );
    }

    pub fn phase(&self) -> GamePhase {
        self.turn.phase
    }

    pub fn score(&self, side: Side) -> u32 {
        self.scoring.score(side)
    }

    pub fn batons_remaining(&self, side: Side) -> u8 {
        self.turn.batons(side)
    }

    pub fn round(&self) -> u32 {
        self.turn.round
    }

    /// Drain simulator commands issued since the last call
    pub fn take_commands(&mut self) -> Vec<SimCommand> {
        std::mem::take(&mut self.outbox)
    }

    /// Drain UI notifications issued since the last call
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub(crate) fn emit(&mut self, event: GameEvent) {
        let seq = self.event_seq;
        self.event_seq += 1;
        self.notifications.push(Notification {
            seq,
            tick: self.time_ticks,
            event,
        });
    }

    /// Read-only view for rendering
    pub fn snapshot(&self) -> MatchSnapshot {
        let king_standing = self
            .registry
            .iter()
            .any(|k| k.kind == KubbKind::King && k.is_standing());
        MatchSnapshot {
            phase: self.turn.phase,
            active_side: self.turn.phase.active_side(),
            round: self.turn.round,
            player_batons: self.turn.batons(Side::Player),
            bot_batons: self.turn.batons(Side::Bot),
            player_score: self.scoring.score(Side::Player),
            bot_score: self.scoring.score(Side::Bot),
            total_throws: self.turn.total_throws,
            king_standing,
            kubbs: self
                .registry
                .iter()
                .map(|k| KubbView {
                    id: k.id,
                    kind: k.kind,
                    side: k.side,
                    position: k.position,
                    status: k.status,
                    height: k.height,
                })
                .collect(),
            wind: self.wind,
            fault: self.fault,
        }
    }
}

/// Per-kubb slice of the snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KubbView {
    pub id: KubbId,
    pub kind: KubbKind,
    pub side: Option<Side>,
    pub position: Vec3,
    pub status: KubbStatus,
    pub height: f32,
}

/// Everything the UI needs to draw a frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub phase: GamePhase,
    pub active_side: Option<Side>,
    pub round: u32,
    pub player_batons: u8,
    pub bot_batons: u8,
    pub player_score: u32,
    pub bot_score: u32,
    pub total_throws: u32,
    pub king_standing: bool,
    pub kubbs: Vec<KubbView>,
    pub wind: Wind,
    pub fault: Option<MatchFault>,
}
