//! Particle field: spawners on the right edge emit pink/blue particles that drift left,
//! bounce off the vertical bounds and melt or explode when they hit the piece.

use crate::piece::Polarity;
use rand::Rng;
use rand::rngs::StdRng;
use std::f32::consts::{FRAC_PI_4, PI};

/// World size in pixels; the board sits in the middle.
pub const WORLD_WIDTH: f32 = 1200.0;
pub const WORLD_HEIGHT: f32 = 600.0;
/// Horizontal lanes spawners can occupy.
pub const SPAWN_SLOTS: usize = 6;
/// Collision radius of a particle.
pub const PARTICLE_RADIUS: f32 = 4.0;
/// Spawn period before the orchestrator feeds a real one.
pub const DEFAULT_SPAWNERS_RATE_MS: f32 = 10_000.0;

const SLOT_PROBES: usize = 50;
const MELT_MS: f32 = 100.0;
const EXPLODE_MS: f32 = 500.0;
/// Particles further than this outside the world are dropped.
const EXIT_MARGIN: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParticleState {
    Active,
    /// Absorbed by a matching piece; progress 0..=1.
    Melting(f32),
    /// Hit a piece of the other colour; progress 0..=1.
    Exploding(f32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub polarity: Polarity,
    pub state: ParticleState,
    pub highlighted: bool,
}

impl Particle {
    pub fn new(x: f32, y: f32, vx: f32, vy: f32, polarity: Polarity) -> Self {
        Self {
            x,
            y,
            vx,
            vy,
            polarity,
            state: ParticleState::Active,
            highlighted: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == ParticleState::Active
    }

    /// Start melting. Returns false if the particle was already melting or exploding.
    pub fn melt(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.state = ParticleState::Melting(0.0);
        true
    }

    /// Start exploding. Returns false if the particle was already melting or exploding.
    pub fn explode(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.state = ParticleState::Exploding(0.0);
        true
    }

    /// Drawing scale: shrinks to 0 while melting, grows to 4x while exploding.
    pub fn scale(&self) -> f32 {
        match self.state {
            ParticleState::Active => 1.0,
            ParticleState::Melting(p) => 1.0 - p,
            ParticleState::Exploding(p) => 1.0 + 3.0 * p,
        }
    }

    /// Move, bounce and animate. False once the particle should be removed.
    fn update(&mut self, dt_frames: f32, dt_ms: f32, bounds: VerticalBounds) -> bool {
        self.x += self.vx * dt_frames;
        self.y += self.vy * dt_frames;
        if bounds.bounce(&mut self.y) {
            self.vy = -self.vy;
        }
        let alive = match &mut self.state {
            ParticleState::Active => true,
            ParticleState::Melting(p) => {
                *p += dt_ms / MELT_MS;
                *p <= 1.0
            }
            ParticleState::Exploding(p) => {
                *p += dt_ms / EXPLODE_MS;
                *p <= 1.0
            }
        };
        alive && self.x >= -EXIT_MARGIN && self.x <= WORLD_WIDTH + EXIT_MARGIN
    }
}

/// Top and bottom of the particle corridor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalBounds {
    pub top: f32,
    pub bottom: f32,
}

impl VerticalBounds {
    /// Pull `y` back inside; true if it was outside.
    pub fn bounce(&self, y: &mut f32) -> bool {
        if *y < self.top {
            *y = self.top;
            true
        } else if *y > self.bottom {
            *y = self.bottom;
            true
        } else {
            false
        }
    }
}

/// Spawner difficulty tier, ordered from easiest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SpawnerTier {
    Easy,
    Medium,
    Hard,
}

impl SpawnerTier {
    /// Pick a tier from a (randomised) difficulty scalar.
    pub fn for_difficulty(d: f32) -> Self {
        if d > 0.66 {
            Self::Hard
        } else if d < 0.33 {
            Self::Easy
        } else {
            Self::Medium
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    fn roll(self, rng: &mut impl Rng) -> SpawnerParams {
        match self {
            Self::Easy => SpawnerParams {
                angle: tilted_angle(rng),
                pattern: vec![quiet_steps(rng, 2, 1.8), burst_steps(rng, 2.0, 4.0)],
                speed: 1.0,
                step_ms: 1000.0,
                drift: 0.0,
                life_ms: 15_000.0,
            },
            Self::Medium => SpawnerParams {
                angle: tilted_angle(rng),
                pattern: vec![
                    quiet_steps(rng, 2, 1.8),
                    burst_steps(rng, 2.0, 4.0),
                    quiet_steps(rng, 4, 3.8),
                    burst_steps(rng, 5.0, 4.0),
                ],
                speed: 2.0,
                step_ms: 500.0,
                drift: 0.5 * rng.random::<f32>(),
                life_ms: 10_000.0,
            },
            Self::Hard => SpawnerParams {
                angle: if rng.random_bool(0.4) {
                    PI + 2.4 * (rng.random::<f32>() - 0.5)
                } else {
                    PI
                },
                pattern: vec![quiet_steps(rng, 10, 18.0), burst_steps(rng, 20.0, 10.0)],
                speed: 2.0,
                step_ms: 200.0,
                drift: rng.random::<f32>(),
                life_ms: 10_000.0,
            },
        }
    }
}

/// Leftward angle, tilted by a quarter-pi 30% of the time.
fn tilted_angle(rng: &mut impl Rng) -> f32 {
    if rng.random_bool(0.3) {
        if rng.random_bool(0.5) { PI + FRAC_PI_4 } else { PI - FRAC_PI_4 }
    } else {
        PI
    }
}

/// Negative pattern entry: `base + floor(spread * r)` silent steps.
fn quiet_steps(rng: &mut impl Rng, base: i32, spread: f32) -> i32 {
    -base - (spread * rng.random::<f32>()).floor() as i32
}

/// Positive pattern entry: `floor(base + spread * r)` emitting steps.
fn burst_steps(rng: &mut impl Rng, base: f32, spread: f32) -> i32 {
    (base + spread * rng.random::<f32>()).floor() as i32
}

#[derive(Debug, Clone, PartialEq)]
struct SpawnerParams {
    angle: f32,
    pattern: Vec<i32>,
    speed: f32,
    step_ms: f32,
    drift: f32,
    life_ms: f32,
}

/// Emits one particle per pattern step while the current pattern entry is positive;
/// negative entries are silent steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Spawner {
    pub x: f32,
    pub y: f32,
    /// Vertical drift in px/frame; bounces off the corridor bounds.
    pub vy: f32,
    pub angle: f32,
    pub speed: f32,
    pub polarity: Polarity,
    pub tier: SpawnerTier,
    pub slot: usize,
    pub age_ms: f32,
    pub life_ms: f32,
    step_ms: f32,
    pattern: Vec<i32>,
    pattern_index: usize,
    steps_in_entry: u32,
    step_acc_ms: f32,
}

impl Spawner {
    fn new(params: SpawnerParams, tier: SpawnerTier, x: f32, y: f32, polarity: Polarity, slot: usize) -> Self {
        Self {
            x,
            y,
            vy: params.drift,
            angle: params.angle,
            speed: params.speed,
            polarity,
            tier,
            slot,
            age_ms: 0.0,
            life_ms: params.life_ms,
            step_ms: params.step_ms,
            pattern: params.pattern,
            pattern_index: 0,
            steps_in_entry: 0,
            // First step fires on the first update.
            step_acc_ms: params.step_ms,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.age_ms > self.life_ms
    }

    /// Run elapsed pattern steps; returns how many particles to emit.
    fn advance(&mut self, dt_ms: f32) -> usize {
        self.step_acc_ms += dt_ms;
        let mut emit = 0;
        while self.step_acc_ms >= self.step_ms && !self.pattern.is_empty() {
            self.step_acc_ms -= self.step_ms;
            let entry = self.pattern[self.pattern_index];
            if entry > 0 {
                emit += 1;
            }
            self.steps_in_entry += 1;
            if self.steps_in_entry >= entry.unsigned_abs() {
                self.steps_in_entry = 0;
                self.pattern_index = (self.pattern_index + 1) % self.pattern.len();
            }
        }
        emit
    }

    fn emit(&self) -> Particle {
        Particle::new(
            self.x,
            self.y,
            self.speed * self.angle.cos(),
            self.speed * self.angle.sin(),
            self.polarity,
        )
    }
}

/// All spawners and particles plus the emission clock.
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    pub bounds: VerticalBounds,
    particles: Vec<Particle>,
    spawners: Vec<Spawner>,
    spawners_rate_ms: f32,
    difficulty: f32,
    /// Time since the last emission cycle; `None` until the first one.
    since_cycle_ms: Option<f32>,
    rng: StdRng,
}

impl ParticleSystem {
    pub fn new(bounds: VerticalBounds, rng: StdRng) -> Self {
        Self {
            bounds,
            particles: Vec::new(),
            spawners: Vec::new(),
            spawners_rate_ms: DEFAULT_SPAWNERS_RATE_MS,
            difficulty: 0.0,
            since_cycle_ms: None,
            rng,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn spawners(&self) -> &[Spawner] {
        &self.spawners
    }

    #[cfg(test)]
    pub(crate) fn push_particle(&mut self, particle: Particle) {
        self.particles.push(particle);
    }

    pub fn spawners_rate_ms(&self) -> f32 {
        self.spawners_rate_ms
    }

    pub fn set_spawners_rate(&mut self, ms: f32) {
        self.spawners_rate_ms = ms;
    }

    pub fn difficulty(&self) -> f32 {
        self.difficulty
    }

    pub fn set_difficulty(&mut self, d: f32) {
        self.difficulty = d;
    }

    /// Vertical centre of spawn lane `slot`.
    pub fn slot_y(&self, slot: usize) -> f32 {
        let span = self.bounds.bottom - self.bounds.top;
        self.bounds.top + (1 + slot) as f32 / (SPAWN_SLOTS + 1) as f32 * span
    }

    /// Random free lane, or `None` if every probe hit an occupied one.
    pub fn find_spot(&mut self) -> Option<usize> {
        (0..SLOT_PROBES)
            .map(|_| self.rng.random_range(0..SPAWN_SLOTS))
            .find(|&slot| !self.spawners.iter().any(|s| s.slot == slot))
    }

    fn spawn_cycle(&mut self) {
        let polarity = Polarity::from_pink(self.rng.random_bool(0.5));
        let Some(slot) = self.find_spot() else {
            log::debug!("no free spawn lane, skipping cycle");
            return;
        };
        let tier = SpawnerTier::for_difficulty(self.difficulty * self.rng.random::<f32>());
        let params = tier.roll(&mut self.rng);
        let y = self.slot_y(slot);
        log::debug!("spawner {tier:?} {polarity:?} in lane {slot}");
        self.spawners
            .push(Spawner::new(params, tier, WORLD_WIDTH, y, polarity, slot));
    }

    /// One tick: emission cycle, spawner drift/emission, particle motion and animation.
    pub fn update(&mut self, dt_frames: f32, dt_ms: f32) {
        let due = match self.since_cycle_ms.as_mut() {
            None => true,
            Some(t) => {
                *t += dt_ms;
                *t > self.spawners_rate_ms
            }
        };
        if due {
            self.since_cycle_ms = Some(0.0);
            self.spawn_cycle();
        }

        let bounds = self.bounds;
        let mut emitted = Vec::new();
        self.spawners.retain_mut(|s| {
            s.age_ms += dt_ms;
            if s.is_expired() {
                return false;
            }
            if s.vy != 0.0 {
                s.y += s.vy * dt_frames;
                if bounds.bounce(&mut s.y) {
                    s.vy = -s.vy;
                }
            }
            for _ in 0..s.advance(dt_ms) {
                emitted.push(s.emit());
            }
            true
        });
        self.particles.extend(emitted);
        self.particles
            .retain_mut(|p| p.update(dt_frames, dt_ms, bounds));
    }

    /// Highlight flags per polarity; unhighlighted particles are drawn dimmed.
    pub fn set_highlights(&mut self, pink: bool, blue: bool) {
        for p in &mut self.particles {
            p.highlighted = if p.polarity.is_pink() { pink } else { blue };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const BOUNDS: VerticalBounds = VerticalBounds {
        top: 105.0,
        bottom: 495.0,
    };

    fn system(seed: u64) -> ParticleSystem {
        ParticleSystem::new(BOUNDS, StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_first_update_creates_spawner_at_right_edge() {
        let mut ps = system(1);
        ps.update(1.0, 16.0);
        assert_eq!(ps.spawners().len(), 1);
        let s = &ps.spawners()[0];
        assert_eq!(s.x, WORLD_WIDTH);
        assert_eq!(s.y, ps.slot_y(s.slot));
        assert_eq!(s.tier, SpawnerTier::Easy);
    }

    #[test]
    fn test_emission_cycle_waits_for_rate() {
        let mut ps = system(2);
        ps.set_spawners_rate(1000.0);
        ps.update(1.0, 16.0);
        assert_eq!(ps.spawners().len(), 1);
        ps.update(30.0, 500.0);
        assert_eq!(ps.spawners().len(), 1);
        ps.update(31.0, 520.0);
        assert_eq!(ps.spawners().len(), 2);
    }

    #[test]
    fn test_find_spot_gives_up_when_lanes_are_full() {
        let mut ps = system(3);
        ps.set_spawners_rate(0.0);
        for _ in 0..40 {
            ps.update(0.01, 0.1);
        }
        assert_eq!(ps.spawners().len(), SPAWN_SLOTS);
        assert_eq!(ps.find_spot(), None);
        let mut slots: Vec<usize> = ps.spawners().iter().map(|s| s.slot).collect();
        slots.sort_unstable();
        assert_eq!(slots, (0..SPAWN_SLOTS).collect::<Vec<_>>());
    }

    #[test]
    fn test_spawners_expire() {
        let mut ps = system(4);
        ps.set_spawners_rate(f32::MAX);
        ps.update(1.0, 16.0);
        assert_eq!(ps.spawners().len(), 1);
        ps.update(900.0, 15_001.0);
        assert!(ps.spawners().is_empty());
    }

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(SpawnerTier::for_difficulty(-0.5), SpawnerTier::Easy);
        assert_eq!(SpawnerTier::for_difficulty(0.5), SpawnerTier::Medium);
        assert_eq!(SpawnerTier::for_difficulty(0.7), SpawnerTier::Hard);
    }

    #[test]
    fn test_pattern_alternates_silence_and_bursts() {
        let params = SpawnerParams {
            angle: PI,
            pattern: vec![-2, 3],
            speed: 1.0,
            step_ms: 100.0,
            drift: 0.0,
            life_ms: 10_000.0,
        };
        let fresh = Spawner::new(params, SpawnerTier::Easy, 0.0, 0.0, Polarity::Pink, 0);
        let mut s = fresh.clone();
        let mut counts = vec![s.advance(0.0)];
        counts.extend((1..10).map(|_| s.advance(100.0)));
        assert_eq!(counts, vec![0, 0, 1, 1, 1, 0, 0, 1, 1, 1]);
        // Several steps elapsing in one tick are all run.
        let mut batched = fresh;
        assert_eq!(batched.advance(900.0), 6);
    }

    #[test]
    fn test_drifting_spawner_bounces_off_bottom() {
        let mut ps = system(10);
        ps.set_spawners_rate(f32::MAX);
        ps.since_cycle_ms = Some(0.0);
        let params = SpawnerParams {
            angle: PI,
            pattern: vec![-1],
            speed: 2.0,
            step_ms: 500.0,
            drift: 3.0,
            life_ms: 10_000.0,
        };
        ps.spawners.push(Spawner::new(
            params,
            SpawnerTier::Medium,
            WORLD_WIDTH,
            BOUNDS.bottom - 1.0,
            Polarity::Pink,
            5,
        ));
        ps.update(1.0, 16.0);
        let s = &ps.spawners()[0];
        assert_eq!(s.y, BOUNDS.bottom);
        assert_eq!(s.vy, -3.0);
        ps.update(1.0, 16.0);
        let s = &ps.spawners()[0];
        assert_eq!(s.y, BOUNDS.bottom - 3.0);
        assert_eq!(s.vy, -3.0);
    }

    #[test]
    fn test_medium_tier_parameters() {
        let mut rng = StdRng::seed_from_u64(20);
        for _ in 0..50 {
            let params = SpawnerTier::Medium.roll(&mut rng);
            let [a, b, c, d] = params.pattern[..] else {
                panic!("medium pattern has four entries: {:?}", params.pattern);
            };
            assert!((-3..=-2).contains(&a), "{a}");
            assert!((2..=5).contains(&b), "{b}");
            assert!((-7..=-4).contains(&c), "{c}");
            assert!((5..=8).contains(&d), "{d}");
            assert_eq!(params.step_ms, 500.0);
            assert_eq!(params.life_ms, 10_000.0);
            assert_eq!(params.speed, 2.0);
            assert!((0.0..0.5).contains(&params.drift));
        }
    }

    #[test]
    fn test_hard_tier_parameters() {
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..50 {
            let params = SpawnerTier::Hard.roll(&mut rng);
            let [quiet, burst] = params.pattern[..] else {
                panic!("hard pattern has two entries: {:?}", params.pattern);
            };
            assert!((-27..=-10).contains(&quiet), "{quiet}");
            assert!((20..=29).contains(&burst), "{burst}");
            assert_eq!(params.step_ms, 200.0);
            assert_eq!(params.life_ms, 10_000.0);
            assert!((0.0..1.0).contains(&params.drift));
            assert!((params.angle - PI).abs() <= 1.2 + 1e-5);
        }
    }

    #[test]
    fn test_tiers_order_by_difficulty() {
        assert!(SpawnerTier::Easy < SpawnerTier::Medium);
        assert!(SpawnerTier::Medium < SpawnerTier::Hard);
        assert_eq!(SpawnerTier::Hard.label(), "hard");
    }

    #[test]
    fn test_emitted_particles_head_left() {
        let params = SpawnerParams {
            angle: PI,
            pattern: vec![1],
            speed: 2.0,
            step_ms: 100.0,
            drift: 0.0,
            life_ms: 10_000.0,
        };
        let s = Spawner::new(params, SpawnerTier::Medium, 1200.0, 300.0, Polarity::Blue, 2);
        let p = s.emit();
        assert!((p.vx + 2.0).abs() < 1e-5);
        assert!(p.vy.abs() < 1e-5);
        assert_eq!(p.polarity, Polarity::Blue);
    }

    #[test]
    fn test_particle_bounces_off_bounds() {
        let mut ps = system(5);
        ps.set_spawners_rate(f32::MAX);
        ps.since_cycle_ms = Some(0.0);
        ps.push_particle(Particle::new(600.0, 106.0, 0.0, -3.0, Polarity::Pink));
        ps.update(1.0, 16.0);
        let p = &ps.particles()[0];
        assert_eq!(p.y, BOUNDS.top);
        assert_eq!(p.vy, 3.0);
    }

    #[test]
    fn test_particle_leaving_world_is_removed() {
        let mut ps = system(6);
        ps.set_spawners_rate(f32::MAX);
        ps.since_cycle_ms = Some(0.0);
        ps.push_particle(Particle::new(-9.0, 300.0, -2.0, 0.0, Polarity::Blue));
        ps.update(1.0, 16.0);
        assert!(ps.particles().is_empty());
    }

    #[test]
    fn test_melt_is_idempotent_and_removes_particle() {
        let mut p = Particle::new(0.0, 0.0, 0.0, 0.0, Polarity::Pink);
        assert!(p.melt());
        assert!(!p.melt());
        assert!(!p.explode());
        let mut ps = system(7);
        ps.set_spawners_rate(f32::MAX);
        ps.since_cycle_ms = Some(0.0);
        ps.push_particle(p);
        ps.update(3.0, 50.0);
        assert_eq!(ps.particles().len(), 1);
        assert!((ps.particles()[0].scale() - 0.5).abs() < 1e-5);
        ps.update(4.0, 60.0);
        assert!(ps.particles().is_empty());
    }

    #[test]
    fn test_explosion_lasts_longer_than_melt() {
        let mut ps = system(8);
        ps.set_spawners_rate(f32::MAX);
        ps.since_cycle_ms = Some(0.0);
        let mut p = Particle::new(600.0, 300.0, 0.0, 0.0, Polarity::Blue);
        assert!(p.explode());
        ps.push_particle(p);
        ps.update(15.0, 250.0);
        assert_eq!(ps.particles().len(), 1);
        assert!((ps.particles()[0].scale() - 2.5).abs() < 1e-5);
        ps.update(16.0, 260.0);
        assert!(ps.particles().is_empty());
    }

    #[test]
    fn test_highlights_by_polarity() {
        let mut ps = system(9);
        ps.push_particle(Particle::new(0.0, 0.0, 0.0, 0.0, Polarity::Pink));
        ps.push_particle(Particle::new(0.0, 0.0, 0.0, 0.0, Polarity::Blue));
        ps.set_highlights(false, true);
        assert!(!ps.particles()[0].highlighted);
        assert!(ps.particles()[1].highlighted);
    }
}
