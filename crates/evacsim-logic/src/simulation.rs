//! Run driver: config → room → population → placement → trajectory.

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::agents::Population;
use crate::analysis::EvacuationSummary;
use crate::config::SimConfig;
use crate::error::{Error, Result};
use crate::forces::ForceModel;
use crate::integrator::{integrate, IntegratorSettings, Trajectory};
use crate::room::Room;
use crate::spawn::{check_separation, fill_room, InitialState};

/// Output of [`Simulation::run`].
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub trajectory: Trajectory,
    pub summary: EvacuationSummary,
}

/// A fully set-up evacuation, ready to run.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimConfig,
    room: Room,
    population: Population,
    initial: InitialState,
}

impl Simulation {
    /// Build the catalog room, sample the population and place it.
    ///
    /// Errors: invalid config, invalid room, or a spawn zone too small for
    /// the population.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let room = Room::from_layout(config.room, config.room_size)?;
        let population = Population::sample(
            config.num_agents,
            config.mean_radius,
            config.mean_mass,
            config.size_std_dev,
            config.desired_speed,
            &mut rng,
        )?;
        let initial = fill_room(&room, &population, &mut rng)?;
        info!(
            "placed {} agents in {} (size {})",
            population.len(),
            config.room,
            config.room_size
        );
        Ok(Self {
            config,
            room,
            population,
            initial,
        })
    }

    /// Use a caller-supplied room, population and placement.
    ///
    /// Room and sampling fields of `config` are ignored and `num_agents` is
    /// taken from `population`. The placement is checked for separation
    /// once here, not per step.
    pub fn from_parts(
        mut config: SimConfig,
        room: Room,
        population: Population,
        initial: InitialState,
    ) -> Result<Self> {
        config.validate_run()?;
        config.num_agents = population.len();
        check_separation(&room, &population, &initial.positions)?;
        if initial.velocities.len() != population.len() {
            return Err(Error::InvalidParam(format!(
                "{} velocities for {} agents",
                initial.velocities.len(),
                population.len()
            )));
        }
        Ok(Self {
            config,
            room,
            population,
            initial,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn initial_state(&self) -> &InitialState {
        &self.initial
    }

    pub fn force_model(&self) -> ForceModel<'_> {
        ForceModel::new(&self.room, &self.population, self.config.forces)
            .with_parallel(self.config.parallel)
    }

    /// Integrate the configured number of steps and summarise the run.
    pub fn run(&self) -> Result<SimulationReport> {
        let settings = IntegratorSettings {
            steps: self.config.num_steps,
            time_step: self.config.time_step,
            escape_radius: self.config.escape_radius,
        };
        let trajectory = integrate(
            self.initial.positions.clone(),
            self.initial.velocities.clone(),
            &self.force_model(),
            &self.room,
            &settings,
        )?;
        let summary = EvacuationSummary::from_run(
            &trajectory,
            &self.population,
            self.config.time_step,
            self.config.lethal_force,
        );
        Ok(SimulationReport {
            trajectory,
            summary,
        })
    }
}
