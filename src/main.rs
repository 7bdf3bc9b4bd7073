//! Kubb Toss entry point
//!
//! Headless demo: plays one match against the bot with a scripted stand-in
//! for the physics simulator, then prints the final snapshot as JSON.
//!
//! Usage: `kubb-toss [tuning.json]`

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::collections::BTreeMap;

    use glam::Vec3;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use kubb_toss::consts::*;
    use kubb_toss::is_out_of_world;
    use kubb_toss::sim::state::groups;
    use kubb_toss::sim::{
        BodyId, CollisionFilter, GamePhase, HostEvent, Impact, KubbKind, MatchState, PlayerAction,
        RaiseEdge, Side, SimCommand, ThrowKind, TickInput, tick,
    };
    use kubb_toss::{Tuning, secs_to_ticks, ticks_to_secs};

    /// Give up on matches that run longer than this
    const MAX_MATCH_SECS: f32 = 30.0 * 60.0;
    /// Horizontal reach of a baton against a kubb
    const HIT_RADIUS: f32 = 0.3;
    /// Ground friction applied per tick while sliding
    const GROUND_DAMPING: f32 = 0.6;
    const REST_SPEED: f32 = 0.05;
    const BATON_REST_Y: f32 = 0.05;

    #[derive(Debug, Clone, Default)]
    struct Body {
        position: Vec3,
        velocity: Vec3,
        filter: Option<CollisionFilter>,
        moving: bool,
        /// Knocked over by an impulse (no longer a target)
        toppled: bool,
        /// Launched since the last reset, so motion is reported each frame
        reporting: bool,
    }

    /// Minimal ballistic stand-in for the rigid-body simulator
    #[derive(Debug, Default)]
    struct ScriptedHost {
        bodies: BTreeMap<BodyId, Body>,
    }

    impl ScriptedHost {
        fn apply(&mut self, commands: Vec<SimCommand>) {
            for command in commands {
                match command {
                    SimCommand::ResetBody { body, position } => {
                        let b = self.bodies.entry(body).or_default();
                        b.position = position;
                        b.velocity = Vec3::ZERO;
                        b.moving = false;
                        b.toppled = false;
                        b.reporting = false;
                    }
                    SimCommand::SetVelocity { body, linear, .. } => {
                        let b = self.bodies.entry(body).or_default();
                        b.velocity = linear;
                        b.moving = true;
                        b.reporting = true;
                    }
                    SimCommand::SetCollisionFilter { body, filter } => {
                        self.bodies.entry(body).or_default().filter = Some(filter);
                    }
                    SimCommand::ApplyImpulse { body, .. } => {
                        self.bodies.entry(body).or_default().toppled = true;
                    }
                }
            }
        }

        fn step(&mut self, dt: f32) -> Vec<HostEvent> {
            let mut events = Vec::new();
            for (&id, body) in self.bodies.iter_mut() {
                if !body.moving {
                    continue;
                }
                body.velocity.y -= GRAVITY * dt;
                body.position += body.velocity * dt;
                let rest_y = match id {
                    BodyId::Baton => BATON_REST_Y,
                    BodyId::Kubb(_) => KUBB_HEIGHT / 2.0,
                };
                if body.position.y <= rest_y {
                    body.position.y = rest_y;
                    body.velocity.y = 0.0;
                    body.velocity.x *= GROUND_DAMPING;
                    body.velocity.z *= GROUND_DAMPING;
                    if body.velocity.length() < REST_SPEED {
                        body.velocity = Vec3::ZERO;
                        body.moving = false;
                    }
                }
                if is_out_of_world(body.position) {
                    body.moving = false;
                    body.reporting = false;
                    events.push(HostEvent::OutOfBounds {
                        body: id,
                        position: body.position,
                    });
                }
            }

            for (&id, body) in &self.bodies {
                if body.reporting && matches!(id, BodyId::Kubb(_)) {
                    events.push(HostEvent::BodyMotion {
                        body: id,
                        position: body.position,
                        speed: body.velocity.length(),
                    });
                }
            }

            events.extend(self.baton_impacts());
            events
        }

        /// Contacts between the flying baton and upright kubbs it may touch
        fn baton_impacts(&mut self) -> Vec<HostEvent> {
            let Some(baton) = self.bodies.get(&BodyId::Baton).cloned() else {
                return Vec::new();
            };
            if !baton.moving {
                return Vec::new();
            }
            let group = baton.filter.map_or(groups::PLAYER_BATON, |f| f.group);
            let speed = baton.velocity.length();
            let mut events = Vec::new();
            for (&id, body) in self.bodies.iter_mut() {
                let BodyId::Kubb(target) = id else {
                    continue;
                };
                if body.toppled || body.moving || !body.filter.is_some_and(|f| f.accepts(group)) {
                    continue;
                }
                let dx = baton.position.x - body.position.x;
                let dz = baton.position.z - body.position.z;
                let top = body.position.y * 2.0;
                if (dx * dx + dz * dz).sqrt() < HIT_RADIUS && baton.position.y <= top {
                    body.toppled = true;
                    events.push(HostEvent::Impact(Impact {
                        target,
                        impact_speed: speed,
                    }));
                }
            }
            events
        }
    }

    /// Scripted stand-in for the human player
    fn auto_player(state: &MatchState, rng: &mut Pcg32) -> Option<PlayerAction> {
        let wind = state.wind.velocity();
        match state.phase() {
            GamePhase::PlayerTurn => {
                if state.turn.baton_in_flight() || state.batons_remaining(Side::Player) == 0 {
                    return None;
                }
                let reg = &state.registry;
                let half = Some(Side::Bot);
                let target = reg
                    .standing(half, KubbKind::Field)
                    .next()
                    .or_else(|| reg.standing(half, KubbKind::Baseline).next())
                    .or_else(|| {
                        (reg.live_count(Side::Bot) == 0)
                            .then(|| reg.standing(None, KubbKind::King).next())
                            .flatten()
                    })?;
                let release = Side::Player.baton_ready_position(0.0);
                let mut intent = state.translator.intent_for_target(
                    ThrowKind::Baton,
                    Side::Player,
                    release,
                    target.position,
                    20.0,
                    wind,
                );
                intent.power = (intent.power + rng.random_range(-0.03..=0.03)).clamp(0.0, 1.0);
                intent.aim_offset += rng.random_range(-0.06..=0.06);
                Some(PlayerAction::ThrowBaton(intent))
            }
            GamePhase::PlayerThrowKubbs => {
                if state.returns.in_flight().is_some() {
                    return None;
                }
                let entry = state.returns.peek_next()?;
                let origin = state.returns.launch_origin(entry);
                let intent = state.translator.intent_for_target(
                    ThrowKind::Kubb,
                    Side::Player,
                    origin,
                    entry.aim,
                    45.0,
                    wind,
                );
                Some(PlayerAction::ThrowKubb(intent))
            }
            GamePhase::PlayerRaiseKubbs => {
                let edge = if rng.random::<bool>() {
                    RaiseEdge::Top
                } else {
                    RaiseEdge::Bottom
                };
                Some(PlayerAction::Raise(edge))
            }
            _ => None,
        }
    }

    pub fn run() {
        let tuning = match std::env::args().nth(1) {
            Some(path) => match Tuning::load(&path) {
                Ok(tuning) => {
                    log::info!("Loaded tuning from {}", path);
                    tuning
                }
                Err(e) => {
                    log::error!("{}", e);
                    std::process::exit(1);
                }
            },
            None => Tuning::default(),
        };
        log::info!(
            "Kubb Toss (headless) seed {} difficulty {}",
            tuning.seed,
            tuning.difficulty.as_str()
        );

        let mut player_rng = Pcg32::seed_from_u64(tuning.seed.wrapping_add(1));
        let mut state = MatchState::new(tuning);
        let mut host = ScriptedHost::default();
        host.apply(state.take_commands());

        let max_ticks = secs_to_ticks(MAX_MATCH_SECS);
        while !state.phase().is_terminal() && state.time_ticks < max_ticks {
            let input = TickInput {
                actions: auto_player(&state, &mut player_rng).into_iter().collect(),
                host: host.step(SIM_DT),
            };
            tick(&mut state, &input);
            host.apply(state.take_commands());
            for n in state.take_notifications() {
                log::debug!("#{} @{} {:?}", n.seq, n.tick, n.event);
            }
        }

        if state.phase().is_terminal() {
            log::info!(
                "Finished after {:.1} s of play, round {}",
                ticks_to_secs(state.time_ticks),
                state.round()
            );
        } else {
            log::warn!("Match did not finish within {} s", MAX_MATCH_SECS);
        }
        match serde_json::to_string_pretty(&state.snapshot()) {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("Failed to serialize snapshot: {}", e),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    demo::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The engine is embedded by a host on the web; there is no standalone entry point
}
