//! Per-tick driver: input cooldowns, gravity, particle collisions, overlays and the audio mix.

use crate::audio::{AudioCues, AudioMix, MixTarget};
use crate::game::{BOARD_ORIGIN_Y, BOARD_PX_HEIGHT, Events, Game, GameEvent};
use crate::layer::Layer;
use crate::particles::{ParticleSystem, VerticalBounds};
use crate::piece::Polarity;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Length of one reference frame; tick deltas are measured in these.
pub const FRAME_MS: f32 = 1000.0 / 60.0;

/// Inputs held during this tick. `vertical` is +1 toward the floor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputDeltas {
    pub rotate: i8,
    pub vertical: i8,
    pub lateral: i8,
    pub hard_drop: bool,
}

impl InputDeltas {
    /// Directional or rotate input; these dismiss an overlay, hard drop does not.
    pub fn any(&self) -> bool {
        self.rotate != 0 || self.vertical != 0 || self.lateral != 0
    }
}

/// Frames elapsed since each action last fired.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Cooldowns {
    pub fall: f32,
    pub rotate: f32,
    pub lateral: f32,
    pub up: f32,
    pub down: f32,
}

impl Cooldowns {
    fn advance(&mut self, dt: f32) {
        for t in [
            &mut self.fall,
            &mut self.rotate,
            &mut self.lateral,
            &mut self.up,
            &mut self.down,
        ] {
            *t += dt;
        }
    }
}

/// Take one action off `t` if it is past `threshold`, keeping the fractional frame.
fn consume(t: &mut f32, threshold: f32) -> bool {
    if *t > threshold {
        *t = t.fract();
        true
    } else {
        false
    }
}

/// Cooldown thresholds in frames. Everything but rotation speeds up with cleared rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Speeds {
    pub rotate: f32,
    pub fall: f32,
    pub up: f32,
    pub down: f32,
    pub lateral: f32,
}

impl Speeds {
    pub fn for_rows(rows: u32) -> Self {
        let r = rows as f32;
        Self {
            rotate: 10.0,
            fall: (30.0 * (-r / 40.0).exp()).max(6.0),
            up: 6.0 + r / 5.0,
            down: 3.0,
            lateral: (8.0 - r / 20.0).max(4.0),
        }
    }
}

/// Spawner period in ms: fast early ramp, then a slow linear one, floored at 4 s.
pub fn spawners_rate_ms(pieces: u32) -> f32 {
    let p = pieces as f32;
    (10_000.0 + 30_000.0 * (-p / 10.0).exp() - 100.0 * p).max(4000.0)
}

/// Spawner difficulty in (-0.5, 1).
pub fn global_difficulty(rows: u32) -> f32 {
    1.0 - 1.5 * (-(rows as f32) / 10.0).exp()
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub events: Events,
    pub cues: AudioCues,
}

impl TickReport {
    pub fn game_over_score(&self) -> Option<u32> {
        self.events.iter().find_map(|e| match e {
            GameEvent::GameOver { score } => Some(*score),
            _ => None,
        })
    }
}

/// Owns the round, the particle field and everything that persists between rounds.
#[derive(Debug)]
pub struct Orchestrator {
    game: Game,
    particles: ParticleSystem,
    layer: Option<Layer>,
    cooldowns: Cooldowns,
    audio: AudioMix,
    want_volume: bool,
    best_score: u32,
    rng: StdRng,
}

impl Orchestrator {
    /// Fresh game behind the menu. `seed` makes every random draw reproducible.
    pub fn new(seed: Option<u64>) -> Self {
        let mut rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        let bounds = VerticalBounds {
            top: BOARD_ORIGIN_Y + 5.0,
            bottom: BOARD_ORIGIN_Y + BOARD_PX_HEIGHT - 5.0,
        };
        let particles = ParticleSystem::new(bounds, StdRng::seed_from_u64(rng.random()));
        let game = Game::new(StdRng::seed_from_u64(rng.random()));
        Self {
            game,
            particles,
            layer: Some(Layer::menu()),
            cooldowns: Cooldowns::default(),
            audio: AudioMix::default(),
            want_volume: true,
            best_score: 0,
            rng,
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    #[cfg(test)]
    pub(crate) fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    pub fn particles(&self) -> &ParticleSystem {
        &self.particles
    }

    #[cfg(test)]
    pub(crate) fn particles_mut(&mut self) -> &mut ParticleSystem {
        &mut self.particles
    }

    pub fn layer(&self) -> Option<&Layer> {
        self.layer.as_ref()
    }

    pub fn audio(&self) -> &AudioMix {
        &self.audio
    }

    pub fn set_want_volume(&mut self, want: bool) {
        self.want_volume = want;
    }

    pub fn want_volume(&self) -> bool {
        self.want_volume
    }

    /// Best score shown on the game-over layer.
    pub fn set_best_score(&mut self, best: u32) {
        self.best_score = best;
    }

    /// Replace the round; the particle field keeps flying.
    pub fn new_game(&mut self) {
        self.game = Game::new(StdRng::seed_from_u64(self.rng.random()));
        self.cooldowns = Cooldowns::default();
    }

    /// Drop any overlay and start the round, replacing it first if it is over.
    pub fn start(&mut self) {
        self.layer = None;
        if self.game.is_over() {
            self.new_game();
        }
        self.game.start();
    }

    /// Ticking is stopped while paused; only the volume reacts.
    pub fn pause(&mut self) {
        self.audio.silence();
    }

    /// Advance the whole simulation by `dt` reference frames.
    pub fn tick(&mut self, dt: f32, input: InputDeltas) -> TickReport {
        let dt_ms = dt * FRAME_MS;
        let mut events = Events::new();

        self.particles.update(dt, dt_ms);

        if self.game.is_running() {
            self.game.update(dt, dt_ms);
            self.run_round(dt, input, &mut events);
        } else {
            self.particles.set_highlights(false, false);
            self.run_layer(dt, dt_ms, input);
        }

        self.audio.step(MixTarget {
            want_volume: self.want_volume,
            running: self.game.is_running(),
            over: self.game.is_over(),
            pink: self.game.player_is_pink(),
        });

        let cues = AudioCues::from_events(&events);
        TickReport { events, cues }
    }

    fn run_round(&mut self, dt: f32, input: InputDeltas, events: &mut Events) {
        let rows = self.game.row_count();
        let pieces = self.game.piece_count();
        let speeds = Speeds::for_rows(rows);
        let cd = &mut self.cooldowns;

        if input.rotate != 0 && consume(&mut cd.rotate, speeds.rotate) {
            self.game.rotate(input.rotate > 0, events);
        }
        if input.vertical > 0 && consume(&mut cd.down, speeds.down) {
            self.game.move_piece(0, 1, events);
        }
        if input.vertical < 0 && consume(&mut cd.up, speeds.up) {
            self.game.move_piece(0, -1, events);
        }
        if input.lateral != 0 && consume(&mut cd.lateral, speeds.lateral) {
            self.game
                .move_piece(i32::from(input.lateral.signum()), 0, events);
        }
        if input.hard_drop {
            self.game.hard_drop(events);
        }

        if cd.fall > speeds.fall && cd.up > speeds.fall && cd.down > speeds.fall {
            cd.fall = 0.0;
            self.game.move_piece(0, 1, events);
        }

        let mut absorbed = Vec::new();
        let mut struck = Vec::new();
        if self.game.row_count() == rows {
            for (i, p) in self.particles.particles().iter().enumerate() {
                if !p.is_active() || !self.game.piece_collides_particle(p) {
                    continue;
                }
                if self.game.particle_is_absorbable(p) {
                    absorbed.push(i);
                } else {
                    struck.push(i);
                }
            }
        }

        match self.game.player_polarity() {
            Some(polarity) => self
                .particles
                .set_highlights(polarity == Polarity::Blue, polarity == Polarity::Pink),
            None => self.particles.set_highlights(false, false),
        }

        self.cooldowns.advance(dt);

        let particles = self.particles.particles_mut();
        for i in absorbed {
            if particles[i].melt() {
                events.push(GameEvent::Melt);
            }
        }
        for &i in &struck {
            if particles[i].explode() {
                events.push(GameEvent::Explode);
            }
        }

        self.particles.set_spawners_rate(spawners_rate_ms(pieces));
        self.particles.set_difficulty(global_difficulty(rows));

        if !struck.is_empty() {
            log::info!("piece hit by {} particle(s) of the other colour", struck.len());
            self.game.game_over(events);
        }
    }

    fn run_layer(&mut self, dt: f32, dt_ms: f32, input: InputDeltas) {
        if self.layer.is_none() && self.game.is_over() {
            self.layer = Some(Layer::game_over(self.game.score(), self.best_score));
        }
        let Some(layer) = self.layer.as_mut() else {
            return;
        };
        layer.update(dt, dt_ms);
        if layer.is_ready() && input.any() {
            self.start();
        }
    }
}
