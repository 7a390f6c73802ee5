//! Post-run statistics: crush forces, casualties, evacuation timing.
//!
//! The force felt by an agent is taken as `m·|a|`, the net of propulsion,
//! crowd and wall forces. Agents above the lethal threshold in a step are
//! counted as casualties for that step.

use serde::Serialize;

use crate::agents::Population;
use crate::integrator::Trajectory;

/// Net force magnitude `m·|a|` per step and agent.
pub fn force_magnitudes(trajectory: &Trajectory, population: &Population) -> Vec<Vec<f64>> {
    let mass = population.mass();
    trajectory
        .accelerations
        .iter()
        .map(|step| {
            step.iter()
                .zip(mass)
                .map(|(a, m)| a.length() * m)
                .collect()
        })
        .collect()
}

/// Number of agents above `threshold` in each step.
pub fn casualties_per_step(forces: &[Vec<f64>], threshold: f64) -> Vec<u32> {
    forces
        .iter()
        .map(|step| step.iter().filter(|&&f| f > threshold).count() as u32)
        .collect()
}

/// Agents that exceeded `threshold` at least once, in index order.
pub fn agents_over_threshold(forces: &[Vec<f64>], threshold: f64) -> Vec<usize> {
    let n = forces.first().map_or(0, Vec::len);
    (0..n)
        .filter(|&i| forces.iter().any(|step| step[i] > threshold))
        .collect()
}

/// First step at which at least `count` agents have escaped.
pub fn step_reaching(escaped: &[u32], count: u32) -> Option<usize> {
    escaped.iter().position(|&e| e >= count)
}

/// Headline numbers of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvacuationSummary {
    pub num_agents: usize,
    pub num_steps: usize,
    pub time_step: f64,
    pub escaped: u32,
    /// Simulated time at which half the agents were out.
    pub half_evacuated_at: Option<f64>,
    /// Simulated time at which everyone was out.
    pub fully_evacuated_at: Option<f64>,
    /// Mean escape time over agents that escaped.
    pub mean_escape_time: Option<f64>,
    pub peak_force: f64,
    pub peak_force_agent: Option<usize>,
    pub lethal_force: f64,
    /// Largest number of agents above the lethal force in a single step.
    pub max_casualties_in_step: u32,
    /// Agents that were above the lethal force at any step.
    pub casualties: usize,
}

impl EvacuationSummary {
    pub fn from_run(
        trajectory: &Trajectory,
        population: &Population,
        time_step: f64,
        lethal_force: f64,
    ) -> Self {
        let n = trajectory.num_agents();
        let forces = force_magnitudes(trajectory, population);
        let to_time = |step: usize| step as f64 * time_step;

        let (peak_force, peak_force_agent) = forces
            .iter()
            .flat_map(|step| step.iter().copied().enumerate())
            .filter(|(_, f)| f.is_finite())
            .fold((0.0, None), |(best, who), (i, f)| {
                if f > best {
                    (f, Some(i))
                } else {
                    (best, who)
                }
            });

        let escape_times: Vec<f64> = trajectory
            .escape_steps
            .iter()
            .flatten()
            .map(|&s| to_time(s))
            .collect();
        let mean_escape_time = if escape_times.is_empty() {
            None
        } else {
            Some(escape_times.iter().sum::<f64>() / escape_times.len() as f64)
        };

        let half = (n as u32).div_ceil(2);
        Self {
            num_agents: n,
            num_steps: trajectory.num_steps(),
            time_step,
            escaped: trajectory.total_escaped(),
            half_evacuated_at: step_reaching(&trajectory.escaped, half.max(1)).map(to_time),
            fully_evacuated_at: step_reaching(&trajectory.escaped, (n as u32).max(1))
                .map(to_time),
            mean_escape_time,
            peak_force,
            peak_force_agent,
            lethal_force,
            max_casualties_in_step: casualties_per_step(&forces, lethal_force)
                .into_iter()
                .max()
                .unwrap_or(0),
            casualties: agents_over_threshold(&forces, lethal_force).len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentState;
    use crate::error::Result;
    use glam::DVec2;

    fn toy_trajectory() -> Trajectory {
        // Two agents over three steps; agent 1 escapes at step 2.
        Trajectory {
            positions: vec![vec![DVec2::ZERO; 2]; 3],
            velocities: vec![vec![DVec2::ZERO; 2]; 3],
            accelerations: vec![
                vec![DVec2::new(3.0, 4.0), DVec2::new(0.0, 1.0)],
                vec![DVec2::new(0.0, 20.0), DVec2::new(0.0, 2.0)],
                vec![DVec2::new(1.0, 0.0), DVec2::ZERO],
            ],
            escaped: vec![0, 0, 1],
            escape_steps: vec![None, Some(2)],
            final_states: vec![AgentState::Active, AgentState::Escaped],
        }
    }

    #[test]
    fn forces_scale_with_mass() -> Result<()> {
        let pop = Population::new(vec![0.25; 2], vec![50.0, 100.0], vec![1.0; 2])?;
        let f = force_magnitudes(&toy_trajectory(), &pop);
        assert_eq!(f[0], vec![250.0, 100.0]);
        assert_eq!(f[1], vec![1000.0, 200.0]);
        Ok(())
    }

    #[test]
    fn casualties_counted_per_step() {
        let forces = vec![vec![800.0, 10.0], vec![900.0, 701.0], vec![0.0, 0.0]];
        assert_eq!(casualties_per_step(&forces, 700.0), vec![1, 2, 0]);
        assert_eq!(agents_over_threshold(&forces, 700.0), vec![0, 1]);
        assert_eq!(agents_over_threshold(&forces, 850.0), vec![0]);
    }

    #[test]
    fn step_reaching_finds_first_crossing() {
        let escaped = [0, 0, 1, 1, 3];
        assert_eq!(step_reaching(&escaped, 1), Some(2));
        assert_eq!(step_reaching(&escaped, 3), Some(4));
        assert_eq!(step_reaching(&escaped, 4), None);
    }

    #[test]
    fn summary_of_toy_run() -> Result<()> {
        let pop = Population::new(vec![0.25; 2], vec![50.0, 100.0], vec![1.0; 2])?;
        let s = EvacuationSummary::from_run(&toy_trajectory(), &pop, 0.5, 700.0);
        assert_eq!(s.num_agents, 2);
        assert_eq!(s.escaped, 1);
        assert_eq!(s.half_evacuated_at, Some(1.0));
        assert_eq!(s.fully_evacuated_at, None);
        assert_eq!(s.mean_escape_time, Some(1.0));
        assert_eq!(s.peak_force, 1000.0);
        assert_eq!(s.peak_force_agent, Some(0));
        assert_eq!(s.max_casualties_in_step, 1);
        assert_eq!(s.casualties, 1);
        Ok(())
    }
}
