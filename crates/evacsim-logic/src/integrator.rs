//! Leap-frog style time stepping with exit detection.
//!
//! Per step `k → k+1`:
//! 1. `y_{k+1} = y_k + dt·v_k`
//! 2. `a_k = a(y_k, v_k)`
//! 3. `v_{k+1} = v_k + dt·a(y_{k+1}, v_k + dt·a_k)` (predictor-corrector)
//! 4. Agents within `escape_radius` of any exit are tagged escaped, parked
//!    far outside the room and frozen
//!
//! Velocities are offset by half a step at start: `v_0 += ½·dt·a(y_0, v_0)`.

use glam::DVec2;
use log::{debug, info, warn};

use crate::agents::AgentState;
use crate::error::{Error, Result};
use crate::room::Room;

/// Exit tolerance used when none is configured.
pub const DEFAULT_ESCAPE_RADIUS: f64 = 0.1;

/// Anchor of the parking area for escaped agents, far outside any room.
pub const ESCAPE_PARKING: DVec2 = DVec2::new(1.0e6, 1.0e6);

/// Parking spot of agent `i`. Spots are distinct so parked agents never coincide.
pub fn parking_spot(i: usize) -> DVec2 {
    ESCAPE_PARKING + DVec2::new(10.0 * i as f64, 0.0)
}

/// Anything that maps a state snapshot to per-agent accelerations.
///
/// Implementations must be pure: the same inputs give the same output.
pub trait AccelerationField {
    fn acceleration(
        &self,
        positions: &[DVec2],
        velocities: &[DVec2],
        states: &[AgentState],
    ) -> Vec<DVec2>;

    /// Number of agents the field is built for, if it is tied to one.
    fn num_agents(&self) -> Option<usize> {
        None
    }
}

impl<F> AccelerationField for F
where
    F: Fn(&[DVec2], &[DVec2], &[AgentState]) -> Vec<DVec2>,
{
    fn acceleration(
        &self,
        positions: &[DVec2],
        velocities: &[DVec2],
        states: &[AgentState],
    ) -> Vec<DVec2> {
        self(positions, velocities, states)
    }
}

/// Step count, step size and exit tolerance for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegratorSettings {
    pub steps: usize,
    pub time_step: f64,
    pub escape_radius: f64,
}

impl IntegratorSettings {
    pub fn new(steps: usize, time_step: f64) -> Self {
        Self {
            steps,
            time_step,
            escape_radius: DEFAULT_ESCAPE_RADIUS,
        }
    }
}

/// Full history of one run, indexed `[step][agent]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub positions: Vec<Vec<DVec2>>,
    pub velocities: Vec<Vec<DVec2>>,
    pub accelerations: Vec<Vec<DVec2>>,
    /// Cumulative number of escaped agents after each step.
    pub escaped: Vec<u32>,
    /// Step at which each agent escaped, if it did.
    pub escape_steps: Vec<Option<usize>>,
    /// Agent states after the last step.
    pub final_states: Vec<AgentState>,
}

impl Trajectory {
    fn with_capacity(steps: usize, n: usize) -> Self {
        Self {
            positions: Vec::with_capacity(steps),
            velocities: Vec::with_capacity(steps),
            accelerations: Vec::with_capacity(steps),
            escaped: Vec::with_capacity(steps),
            escape_steps: vec![None; n],
            final_states: vec![AgentState::Active; n],
        }
    }

    pub fn num_steps(&self) -> usize {
        self.positions.len()
    }

    pub fn num_agents(&self) -> usize {
        self.final_states.len()
    }

    /// Number of agents that escaped during the run.
    pub fn total_escaped(&self) -> u32 {
        self.escaped.last().copied().unwrap_or(0)
    }

    /// True if no recorded position, velocity or acceleration is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        [&self.positions, &self.velocities, &self.accelerations]
            .iter()
            .flat_map(|history| history.iter().flatten())
            .all(|v| v.is_finite())
    }
}

/// Advance `initial_positions`/`initial_velocities` through `settings.steps`
/// recorded states.
///
/// Errors: `Error::InvalidParam` if the state vectors differ in length or
/// the step size is not positive. Numerical blow-ups inside the loop are not
/// errors; they show up as non-finite values (see [`Trajectory::is_finite`]).
pub fn integrate<A: AccelerationField + ?Sized>(
    initial_positions: Vec<DVec2>,
    initial_velocities: Vec<DVec2>,
    field: &A,
    room: &Room,
    settings: &IntegratorSettings,
) -> Result<Trajectory> {
    let n = initial_positions.len();
    if initial_velocities.len() != n {
        return Err(Error::InvalidParam(format!(
            "{} positions but {} velocities",
            n,
            initial_velocities.len()
        )));
    }
    if let Some(expected) = field.num_agents().filter(|&m| m != n) {
        return Err(Error::InvalidParam(format!(
            "acceleration field is built for {expected} agents but {n} were given"
        )));
    }
    let dt = settings.time_step;
    if !dt.is_finite() || dt <= 0.0 {
        return Err(Error::InvalidParam(format!("time step must be > 0, got {dt}")));
    }

    let mut traj = Trajectory::with_capacity(settings.steps, n);
    if settings.steps == 0 {
        return Ok(traj);
    }
    info!(
        "integrating {} agents for {} steps (dt = {})",
        n, settings.steps, dt
    );

    let mut states = vec![AgentState::Active; n];
    let mut y = initial_positions;
    let mut v = initial_velocities;

    let a0 = evaluate(field, &y, &v, &states)?;
    for (vi, ai) in v.iter_mut().zip(&a0) {
        *vi += *ai * (0.5 * dt);
    }
    traj.positions.push(y.clone());
    traj.velocities.push(v.clone());
    traj.escaped.push(0);

    let mut escaped_count = 0u32;
    let mut warned_non_finite = false;

    for k in 0..settings.steps - 1 {
        let mut y_next: Vec<DVec2> = y.iter().zip(&v).map(|(yi, vi)| *yi + *vi * dt).collect();

        let a_k = evaluate(field, &y, &v, &states)?;
        let v_pred: Vec<DVec2> = v.iter().zip(&a_k).map(|(vi, ai)| *vi + *ai * dt).collect();
        let a_next = evaluate(field, &y_next, &v_pred, &states)?;
        let mut v_next: Vec<DVec2> = v.iter().zip(&a_next).map(|(vi, ai)| *vi + *ai * dt).collect();

        for i in 0..n {
            if !states[i].is_active() {
                continue;
            }
            if room.nearest_destination_distance(y_next[i]) < settings.escape_radius {
                states[i] = AgentState::Escaped;
                y_next[i] = parking_spot(i);
                v_next[i] = DVec2::ZERO;
                traj.escape_steps[i] = Some(k + 1);
                escaped_count += 1;
                debug!("agent {} escaped at step {}", i, k + 1);
            }
        }

        if !warned_non_finite && y_next.iter().any(|p| !p.is_finite()) {
            warn!("non-finite agent position at step {}", k + 1);
            warned_non_finite = true;
        }

        traj.accelerations.push(a_k);
        traj.positions.push(y_next.clone());
        traj.velocities.push(v_next.clone());
        traj.escaped.push(escaped_count);
        y = y_next;
        v = v_next;
    }

    // Close the acceleration history with the field at the final state.
    traj.accelerations.push(evaluate(field, &y, &v, &states)?);
    traj.final_states = states;

    info!(
        "finished: {} of {} agents escaped in {} steps",
        escaped_count,
        n,
        settings.steps
    );
    Ok(traj)
}

/// Evaluate `field`, rejecting output that does not cover every agent.
fn evaluate<A: AccelerationField + ?Sized>(
    field: &A,
    positions: &[DVec2],
    velocities: &[DVec2],
    states: &[AgentState],
) -> Result<Vec<DVec2>> {
    let a = field.acceleration(positions, velocities, states);
    if a.len() != positions.len() {
        return Err(Error::InvalidParam(format!(
            "acceleration field returned {} values for {} agents",
            a.len(),
            positions.len()
        )));
    }
    Ok(a)
}
