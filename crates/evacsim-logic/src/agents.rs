//! Per-agent constants and the active/escaped state tag.
//!
//! Agents are identified only by index. Constant attributes live in
//! parallel vectors in [`Population`]; time-varying position and velocity
//! are owned by the integrator.

use std::f64::consts::TAU;

use rand::Rng;

use crate::error::{Error, Result};

/// Whether an agent still takes part in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AgentState {
    #[default]
    Active,
    /// Reached an exit. Parked outside the room and ignored by every force sum.
    Escaped,
}

impl AgentState {
    #[inline]
    pub fn is_active(self) -> bool {
        self == AgentState::Active
    }
}

/// Constant attributes of every agent, indexed by agent id.
#[derive(Debug, Clone, PartialEq)]
pub struct Population {
    radius: Vec<f64>,
    mass: Vec<f64>,
    desired_speed: Vec<f64>,
}

impl Population {
    /// Build a population from explicit attribute vectors.
    ///
    /// Errors: `Error::InvalidParam` if lengths differ, the population is
    /// empty, or any value is non-finite or non-positive.
    pub fn new(radius: Vec<f64>, mass: Vec<f64>, desired_speed: Vec<f64>) -> Result<Self> {
        let n = radius.len();
        if n == 0 {
            return Err(Error::InvalidParam("population is empty".into()));
        }
        if mass.len() != n || desired_speed.len() != n {
            return Err(Error::InvalidParam(format!(
                "attribute lengths differ: radius={}, mass={}, desired_speed={}",
                n,
                mass.len(),
                desired_speed.len()
            )));
        }
        for (name, values) in [
            ("radius", &radius),
            ("mass", &mass),
            ("desired_speed", &desired_speed),
        ] {
            if let Some(i) = values.iter().position(|v| !v.is_finite() || *v <= 0.0) {
                return Err(Error::InvalidParam(format!(
                    "{name} of agent #{i} must be finite and > 0, got {}",
                    values[i]
                )));
            }
        }
        Ok(Self {
            radius,
            mass,
            desired_speed,
        })
    }

    /// `n` identical agents.
    pub fn uniform(n: usize, radius: f64, mass: f64, desired_speed: f64) -> Result<Self> {
        Self::new(vec![radius; n], vec![mass; n], vec![desired_speed; n])
    }

    /// Sample `n` agents whose radius and mass share one size factor drawn
    /// from `N(1, std_dev)`, truncated to `1 ± 4·std_dev`.
    pub fn sample<R: Rng + ?Sized>(
        n: usize,
        mean_radius: f64,
        mean_mass: f64,
        std_dev: f64,
        desired_speed: f64,
        rng: &mut R,
    ) -> Result<Self> {
        let mut radius = Vec::with_capacity(n);
        let mut mass = Vec::with_capacity(n);
        for _ in 0..n {
            let factor = (1.0 + std_dev * standard_normal(rng))
                .clamp(1.0 - 4.0 * std_dev, 1.0 + 4.0 * std_dev);
            radius.push(mean_radius * factor);
            mass.push(mean_mass * factor);
        }
        Self::new(radius, mass, vec![desired_speed; n])
    }

    pub fn len(&self) -> usize {
        self.radius.len()
    }

    pub fn is_empty(&self) -> bool {
        self.radius.is_empty()
    }

    pub fn radius(&self) -> &[f64] {
        &self.radius
    }

    pub fn mass(&self) -> &[f64] {
        &self.mass
    }

    pub fn desired_speed(&self) -> &[f64] {
        &self.desired_speed
    }

    /// Largest radius in the population.
    pub fn max_radius(&self) -> f64 {
        self.radius.iter().copied().fold(0.0, f64::max)
    }

    /// Footprint used by the spawn capacity check: Σ (2r)².
    pub fn footprint(&self) -> f64 {
        self.radius.iter().map(|r| 4.0 * r * r).sum()
    }
}

/// Box–Muller draw from the standard normal distribution.
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>(); // (0, 1], keeps ln finite
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}
