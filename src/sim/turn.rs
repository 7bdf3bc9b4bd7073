//! Turn phases and per-turn bookkeeping
//!
//! The transition rules here are pure functions; `tick` applies them and runs
//! the entry side effects.

use serde::{Deserialize, Serialize};

use super::state::{Baton, BatonState, KingVerdict, KubbId, Side};

/// Current phase of the match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GamePhase {
    /// Player throwing batons (field kubbs first, then bot baseline kubbs)
    PlayerTurn,
    /// Player tossing knocked kubbs onto the bot's half
    PlayerThrowKubbs,
    /// Player choosing the edge to raise each tossed kubb on
    PlayerRaiseKubbs,
    /// Bot throwing batons
    BotTurn,
    /// Bot tossing knocked kubbs onto the player's half
    BotThrowKubbs,
    PlayerWin,
    PlayerLose,
}

impl GamePhase {
    /// Side holding phase authority (`None` once the match is over)
    pub fn active_side(self) -> Option<Side> {
        match self {
            GamePhase::PlayerTurn | GamePhase::PlayerThrowKubbs | GamePhase::PlayerRaiseKubbs => {
                Some(Side::Player)
            }
            GamePhase::BotTurn | GamePhase::BotThrowKubbs => Some(Side::Bot),
            GamePhase::PlayerWin | GamePhase::PlayerLose => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, GamePhase::PlayerWin | GamePhase::PlayerLose)
    }

    /// Phases in which batons fly
    pub fn is_baton_turn(self) -> bool {
        matches!(self, GamePhase::PlayerTurn | GamePhase::BotTurn)
    }

    /// Baton turn for a side
    pub fn turn_of(side: Side) -> Self {
        match side {
            Side::Player => GamePhase::PlayerTurn,
            Side::Bot => GamePhase::BotTurn,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::PlayerTurn => "player_turn",
            GamePhase::PlayerThrowKubbs => "player_throw_kubbs",
            GamePhase::PlayerRaiseKubbs => "player_raise_kubbs",
            GamePhase::BotTurn => "bot_turn",
            GamePhase::BotThrowKubbs => "bot_throw_kubbs",
            GamePhase::PlayerWin => "player_win",
            GamePhase::PlayerLose => "player_lose",
        }
    }
}

/// Phase that follows a side's baton turn
pub fn phase_after_turn(side: Side, knocked: usize) -> GamePhase {
    match (side, knocked > 0) {
        (Side::Player, true) => GamePhase::PlayerThrowKubbs,
        (Side::Player, false) => GamePhase::BotTurn,
        (Side::Bot, true) => GamePhase::BotThrowKubbs,
        (Side::Bot, false) => GamePhase::PlayerTurn,
    }
}

/// Phase that follows a completed return-throw queue
pub fn phase_after_returns(thrower: Side, raises_pending: bool) -> GamePhase {
    match thrower {
        Side::Player if raises_pending => GamePhase::PlayerRaiseKubbs,
        Side::Player => GamePhase::BotTurn,
        Side::Bot => GamePhase::PlayerTurn,
    }
}

/// Terminal phase for a king hit by `active`
pub fn phase_after_king(active: Side, verdict: KingVerdict) -> GamePhase {
    match (active, verdict) {
        (Side::Player, KingVerdict::Win) | (Side::Bot, KingVerdict::Lose) => GamePhase::PlayerWin,
        (Side::Player, KingVerdict::Lose) | (Side::Bot, KingVerdict::Win) => GamePhase::PlayerLose,
    }
}

/// Turn bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnState {
    pub phase: GamePhase,
    /// Batons left this turn, indexed by [`Side::index`]
    batons: [u8; 2],
    batons_per_turn: u8,
    /// Starts at 1; increments when play passes from the bot back to the player
    pub round: u32,
    /// Kubbs knocked by each side during its current turn, pending return throw
    knocked: [Vec<KubbId>; 2],
    /// Batons the player has thrown this match
    pub total_throws: u32,
    pub baton: Baton,
}

impl TurnState {
    pub fn new(batons_per_turn: u8) -> Self {
        Self {
            phase: GamePhase::PlayerTurn,
            batons: [batons_per_turn; 2],
            batons_per_turn,
            round: 1,
            knocked: [Vec::new(), Vec::new()],
            total_throws: 0,
            baton: Baton {
                owner: Side::Player,
                state: BatonState::Idle,
            },
        }
    }

    pub fn batons(&self, side: Side) -> u8 {
        self.batons[side.index()]
    }

    /// Refill a side's batons at the start of its turn
    pub fn refill(&mut self, side: Side) {
        self.batons[side.index()] = self.batons_per_turn;
    }

    /// Use up one baton; false when none are left
    pub fn consume_baton(&mut self, side: Side) -> bool {
        let left = &mut self.batons[side.index()];
        if *left == 0 {
            return false;
        }
        *left -= 1;
        if side == Side::Player {
            self.total_throws += 1;
        }
        true
    }

    /// Record a knocked kubb for the side whose turn it is (deduplicated)
    pub fn record_knock(&mut self, side: Side, id: KubbId) {
        let list = &mut self.knocked[side.index()];
        if !list.contains(&id) {
            list.push(id);
        }
    }

    pub fn knocked(&self, side: Side) -> &[KubbId] {
        &self.knocked[side.index()]
    }

    pub fn take_knocked(&mut self, side: Side) -> Vec<KubbId> {
        std::mem::take(&mut self.knocked[side.index()])
    }

    pub fn baton_in_flight(&self) -> bool {
        self.baton.state == BatonState::Thrown
    }
}
