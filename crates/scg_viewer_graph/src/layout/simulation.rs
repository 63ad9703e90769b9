// SPDX-License-Identifier: MIT OR Apache-2.0
//! Velocity Verlet particle simulation for force-directed layout.
//!
//! The integrator follows the d3-force model: every step the temperature
//! `alpha` moves towards its target, each force adds an `alpha`-scaled
//! velocity change, velocities are damped and added to positions. Forces:
//!
//! - many-body repulsion between every pair of particles, with the strength
//!   of the particle being pushed away from
//! - springs that pull their ends towards a rest length, weaker for
//!   well-connected particles
//! - a centring shift that moves the mean position onto a point
//!
//! Pinned particles never move on their own; they are repositioned by the
//! owner of the simulation.

use super::ForceSettings;
use crate::math::Vector2;
use std::collections::HashSet;
use std::f32::consts::PI;

/// Radius of the first ring used to spread coincident particles
const INITIAL_RADIUS: f32 = 10.0;

/// Deterministic linear congruential generator
#[derive(Debug, Clone)]
struct Lcg(u32);

impl Lcg {
    const A: u32 = 1_664_525;
    const C: u32 = 1_013_904_223;

    fn new() -> Self {
        Self(1)
    }

    /// Next value in `[0, 1)`
    fn next(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(Self::A).wrapping_add(Self::C);
        (f64::from(self.0) / 4_294_967_296.0) as f32
    }

    /// Tiny random offset used to separate coincident particles
    fn jiggle(&mut self) -> f32 {
        (self.next() - 0.5) * 1.0e-6
    }
}

/// A simulated body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Current position
    pub pos: Vector2,
    /// Current velocity
    pub vel: Vector2,
    /// Fixed position, if pinned
    pub pinned: Option<Vector2>,
    /// Many-body strength; negative values repel
    pub charge: f32,
}

impl Particle {
    /// A particle free to move
    pub fn free(pos: Vector2, charge: f32) -> Self {
        Self {
            pos,
            vel: Vector2::ZERO,
            pinned: None,
            charge,
        }
    }

    /// A particle held at `pos`
    pub fn pinned(pos: Vector2, charge: f32) -> Self {
        Self {
            pinned: Some(pos),
            ..Self::free(pos, charge)
        }
    }
}

/// Spring between two particles, by index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spring {
    /// Index of the source particle
    pub source: usize,
    /// Index of the target particle
    pub target: usize,
    /// Rest length
    pub distance: f32,
}

/// Spring with its derived coefficients
#[derive(Debug, Clone, Copy)]
struct ActiveSpring {
    spring: Spring,
    strength: f32,
    /// Share of the correction applied to the target
    bias: f32,
}

/// Force-directed particle simulation
#[derive(Debug, Clone)]
pub struct Simulation {
    particles: Vec<Particle>,
    springs: Vec<ActiveSpring>,
    center: Vector2,
    center_strength: f32,
    distance_min2: f32,
    alpha: f32,
    alpha_min: f32,
    alpha_decay: f32,
    alpha_target: f32,
    /// Velocity kept after each step
    velocity_keep: f32,
    random: Lcg,
}

impl Simulation {
    /// Create a simulation centred on `center`.
    ///
    /// Free particles sharing a position with an earlier particle are spread
    /// on a phyllotaxis spiral around it. Springs referencing missing
    /// particles are ignored.
    pub fn new(
        mut particles: Vec<Particle>,
        springs: Vec<Spring>,
        settings: &ForceSettings,
        center: Vector2,
    ) -> Self {
        spread_coincident(&mut particles);

        let n = particles.len();
        let springs: Vec<Spring> = springs
            .into_iter()
            .filter(|s| {
                let valid = s.source < n && s.target < n;
                if !valid {
                    tracing::warn!(
                        "Ignoring spring {} -> {}: no such particle",
                        s.source,
                        s.target
                    );
                }
                valid
            })
            .collect();

        let mut degree = vec![0usize; n];
        for spring in &springs {
            degree[spring.source] += 1;
            degree[spring.target] += 1;
        }
        let springs = springs
            .into_iter()
            .map(|spring| {
                let (s, t) = (degree[spring.source] as f32, degree[spring.target] as f32);
                ActiveSpring {
                    spring,
                    strength: 1.0 / s.min(t),
                    bias: s / (s + t),
                }
            })
            .collect();

        Self {
            particles,
            springs,
            center,
            center_strength: settings.center_strength,
            distance_min2: settings.distance_min * settings.distance_min,
            alpha: settings.alpha,
            alpha_min: settings.alpha_min,
            alpha_decay: settings.alpha_decay,
            alpha_target: settings.alpha_target,
            velocity_keep: 1.0 - settings.velocity_decay,
            random: Lcg::new(),
        }
    }

    /// All particles
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Position of a particle
    pub fn position(&self, index: usize) -> Option<Vector2> {
        self.particles.get(index).map(|p| p.pos)
    }

    /// Hold a particle at `pos`
    pub fn pin(&mut self, index: usize, pos: Vector2) {
        if let Some(particle) = self.particles.get_mut(index) {
            particle.pinned = Some(pos);
            particle.pos = pos;
        }
    }

    /// Current temperature
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Whether the simulation is still moving
    pub fn is_hot(&self) -> bool {
        self.alpha >= self.alpha_min
    }

    /// Advance the simulation by one step
    pub fn step(&mut self) {
        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;

        self.apply_many_body();
        self.apply_springs();
        self.apply_center();

        for particle in &mut self.particles {
            match particle.pinned {
                Some(pos) => {
                    particle.pos = pos;
                    particle.vel = Vector2::ZERO;
                }
                None => {
                    particle.vel = particle.vel * self.velocity_keep;
                    particle.pos += particle.vel;
                }
            }
        }
    }

    fn apply_many_body(&mut self) {
        let alpha = self.alpha;
        for i in 0..self.particles.len() {
            let origin = self.particles[i].pos;
            let mut dv = Vector2::ZERO;
            for (j, other) in self.particles.iter().enumerate() {
                if i == j {
                    continue;
                }
                let mut d = other.pos - origin;
                let mut l = d.len_squared();
                if d.x == 0.0 {
                    d.x = self.random.jiggle();
                    l += d.x * d.x;
                }
                if d.y == 0.0 {
                    d.y = self.random.jiggle();
                    l += d.y * d.y;
                }
                if l < self.distance_min2 {
                    l = (self.distance_min2 * l).sqrt();
                }
                dv += d * (other.charge * alpha / l);
            }
            self.particles[i].vel += dv;
        }
    }

    fn apply_springs(&mut self) {
        let alpha = self.alpha;
        for active in &self.springs {
            let Spring {
                source,
                target,
                distance,
            } = active.spring;
            let (s, t) = (self.particles[source], self.particles[target]);

            let mut d = (t.pos + t.vel) - (s.pos + s.vel);
            if d.x == 0.0 {
                d.x = self.random.jiggle();
            }
            if d.y == 0.0 {
                d.y = self.random.jiggle();
            }
            let l = d.len();
            let d = d * ((l - distance) / l * alpha * active.strength);

            self.particles[target].vel -= d * active.bias;
            self.particles[source].vel += d * (1.0 - active.bias);
        }
    }

    fn apply_center(&mut self) {
        if self.particles.is_empty() {
            return;
        }
        let sum = self
            .particles
            .iter()
            .fold(Vector2::ZERO, |acc, p| acc + p.pos);
        let shift = (sum / self.particles.len() as f32 - self.center) * self.center_strength;
        for particle in &mut self.particles {
            particle.pos -= shift;
        }
    }
}

/// Spread free particles that sit on an already occupied position
fn spread_coincident(particles: &mut [Particle]) {
    let angle_step = PI * (3.0 - 5.0_f32.sqrt());
    let mut occupied = HashSet::new();
    for (i, particle) in particles.iter_mut().enumerate() {
        let key = (particle.pos.x.to_bits(), particle.pos.y.to_bits());
        if occupied.insert(key) || particle.pinned.is_some() {
            continue;
        }
        let radius = INITIAL_RADIUS * (0.5 + i as f32).sqrt();
        let angle = i as f32 * angle_step;
        particle.pos += Vector2::new(radius * angle.cos(), radius * angle.sin());
        occupied.insert((particle.pos.x.to_bits(), particle.pos.y.to_bits()));
    }
}
