//! Social-force model: acceleration as a pure function of state.
//!
//! For agent `i` with heading `e_i`:
//!
//! ```text
//! a_i = (v0_i·e_i − v_i)/τ + Σ_j f_ij / m_i + Σ_W f_iW / m_i
//! ```
//!
//! Pair and wall forces share one shape: an always-on exponential
//! repulsion `A·exp(overlap/B)` along the normal, plus body compression
//! `k·ramp(overlap)` and sliding friction `κ·ramp(overlap)·Δv_t` that only
//! act while bodies overlap.
//!
//! All forces of one evaluation read the same frozen snapshot. Escaped
//! agents neither feel nor exert force.

use glam::DVec2;
use rayon::prelude::*;

use crate::agents::{AgentState, Population};
use crate::config::ForceParams;
use crate::geometry::{point_segment_distance, ramp, Segment};
use crate::integrator::AccelerationField;
use crate::planner::desired_directions;
use crate::room::Room;

/// Force exerted on agent `i` by agent `j`.
///
/// The normal points from `j` to `i`. Swapping the arguments yields the
/// exact negation, so the pair can be evaluated once.
pub fn pair_force(
    params: &ForceParams,
    pos_i: DVec2,
    pos_j: DVec2,
    vel_i: DVec2,
    vel_j: DVec2,
    radius_i: f64,
    radius_j: f64,
) -> DVec2 {
    let offset = pos_i - pos_j;
    let d = offset.length();
    let n = offset / d;
    let t = n.perp();
    let overlap = radius_i + radius_j - d;
    let dv_t = (vel_j - vel_i).dot(t);

    let normal = params.a * (overlap / params.b).exp() + params.k * ramp(overlap);
    let tangential = params.kappa * ramp(overlap) * dv_t;
    n * normal + t * tangential
}

/// Force exerted on an agent by a single wall.
///
/// Friction opposes the agent's own sliding velocity along the wall.
pub fn wall_force(
    params: &ForceParams,
    pos: DVec2,
    vel: DVec2,
    radius: f64,
    wall: &Segment,
) -> DVec2 {
    let contact = point_segment_distance(pos, wall);
    let overlap = radius - contact.distance;

    let normal = params.a * (overlap / params.b).exp() + params.k * ramp(overlap);
    let tangential = params.kappa * ramp(overlap) * vel.dot(contact.tangent);
    contact.normal * normal - contact.tangent * tangential
}

/// Acceleration field of the social-force model over one room.
#[derive(Debug, Clone)]
pub struct ForceModel<'a> {
    room: &'a Room,
    population: &'a Population,
    params: ForceParams,
    parallel: bool,
}

impl<'a> ForceModel<'a> {
    pub fn new(room: &'a Room, population: &'a Population, params: ForceParams) -> Self {
        Self {
            room,
            population,
            params,
            parallel: false,
        }
    }

    /// Accumulate pair forces on the rayon pool. Results are bit-identical
    /// to the serial path.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn params(&self) -> &ForceParams {
        &self.params
    }

    pub fn room(&self) -> &Room {
        self.room
    }

    pub fn population(&self) -> &Population {
        self.population
    }

    /// Net agent-agent force on every agent.
    pub fn agent_forces(
        &self,
        positions: &[DVec2],
        velocities: &[DVec2],
        states: &[AgentState],
    ) -> Vec<DVec2> {
        if self.parallel {
            self.agent_forces_parallel(positions, velocities, states)
        } else {
            self.agent_forces_serial(positions, velocities, states)
        }
    }

    fn pair(&self, i: usize, j: usize, positions: &[DVec2], velocities: &[DVec2]) -> DVec2 {
        let radius = self.population.radius();
        pair_force(
            &self.params,
            positions[i],
            positions[j],
            velocities[i],
            velocities[j],
            radius[i],
            radius[j],
        )
    }

    fn agent_forces_serial(
        &self,
        positions: &[DVec2],
        velocities: &[DVec2],
        states: &[AgentState],
    ) -> Vec<DVec2> {
        let n = positions.len();
        let mut forces = vec![DVec2::ZERO; n];
        for i in 0..n {
            if !states[i].is_active() {
                continue;
            }
            for j in (i + 1)..n {
                if !states[j].is_active() {
                    continue;
                }
                let f = self.pair(i, j, positions, velocities);
                forces[i] += f;
                forces[j] -= f;
            }
        }
        forces
    }

    // Each agent sums its own row in index order, so every pair is evaluated
    // twice: double the work of the serial path, split across threads.
    // Because f_ij is the exact negation of f_ji, this matches the serial
    // accumulation bit for bit.
    fn agent_forces_parallel(
        &self,
        positions: &[DVec2],
        velocities: &[DVec2],
        states: &[AgentState],
    ) -> Vec<DVec2> {
        let n = positions.len();
        (0..n)
            .into_par_iter()
            .map(|i| {
                if !states[i].is_active() {
                    return DVec2::ZERO;
                }
                (0..n)
                    .filter(|&j| j != i && states[j].is_active())
                    .fold(DVec2::ZERO, |acc, j| {
                        acc + self.pair(i, j, positions, velocities)
                    })
            })
            .collect()
    }

    /// Net wall force on every agent, summed over all walls.
    pub fn wall_forces(
        &self,
        positions: &[DVec2],
        velocities: &[DVec2],
        states: &[AgentState],
    ) -> Vec<DVec2> {
        let radius = self.population.radius();
        let walls = self.room.walls();
        let per_agent = |i: usize| {
            if !states[i].is_active() {
                return DVec2::ZERO;
            }
            walls.iter().fold(DVec2::ZERO, |acc, wall| {
                acc + wall_force(&self.params, positions[i], velocities[i], radius[i], wall)
            })
        };
        if self.parallel {
            (0..positions.len()).into_par_iter().map(per_agent).collect()
        } else {
            (0..positions.len()).map(per_agent).collect()
        }
    }

    /// Self-propulsion `(v0·e − v)/τ` towards each agent's desired heading.
    pub fn propulsion(
        &self,
        positions: &[DVec2],
        velocities: &[DVec2],
        states: &[AgentState],
    ) -> Vec<DVec2> {
        let headings = desired_directions(self.room, self.population, positions, states);
        let speed = self.population.desired_speed();
        let tau = self.params.relaxation_time;
        headings
            .iter()
            .zip(velocities)
            .zip(states)
            .enumerate()
            .map(|(i, ((&e, &v), state))| {
                if state.is_active() {
                    (e * speed[i] - v) / tau
                } else {
                    DVec2::ZERO
                }
            })
            .collect()
    }
}

impl AccelerationField for ForceModel<'_> {
    fn num_agents(&self) -> Option<usize> {
        Some(self.population.len())
    }

    fn acceleration(
        &self,
        positions: &[DVec2],
        velocities: &[DVec2],
        states: &[AgentState],
    ) -> Vec<DVec2> {
        let propulsion = self.propulsion(positions, velocities, states);
        let agents = self.agent_forces(positions, velocities, states);
        let walls = self.wall_forces(positions, velocities, states);
        let mass = self.population.mass();

        propulsion
            .into_iter()
            .zip(agents.into_iter().zip(walls))
            .enumerate()
            .map(|(i, (p, (fa, fw)))| {
                if states[i].is_active() {
                    p + fa / mass[i] + fw / mass[i]
                } else {
                    DVec2::ZERO
                }
            })
            .collect()
    }
}
