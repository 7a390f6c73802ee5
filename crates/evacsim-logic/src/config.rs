//! Run configuration and force-model constants.
//!
//! Both structs are plain serde data with sensible defaults, so a harness
//! can load a partial JSON file and fall back to defaults for the rest.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::room::RoomLayout;

/// Social-force constants shared by the whole population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceParams {
    /// Amplitude of the long-range exponential repulsion `A`.
    pub a: f64,
    /// Decay length of the exponential repulsion `B`.
    pub b: f64,
    /// Body compression stiffness `k`.
    pub k: f64,
    /// Sliding friction coefficient `κ`.
    pub kappa: f64,
    /// Relaxation time `τ` of the self-propulsion term.
    pub relaxation_time: f64,
}

impl Default for ForceParams {
    fn default() -> Self {
        Self {
            a: 2.0e3,
            b: 0.08,
            k: 1.2e5,
            kappa: 2.4e5,
            relaxation_time: 0.1,
        }
    }
}

impl ForceParams {
    /// Check every field, including those only used to build the room and
    /// sample the population.
    pub fn validate(&self) -> Result<()> {
        if self.num_agents == 0 {
            return Err(Error::InvalidParam("num_agents must be > 0".into()));
        }
        check_positive(&[
            ("desired_speed", self.desired_speed),
            ("room_size", self.room_size),
            ("mean_radius", self.mean_radius),
            ("mean_mass", self.mean_mass),
        ])?;
        // Size factors are drawn from N(1, σ); keep them well away from zero.
        if !self.size_std_dev.is_finite() || !(0.0..0.25).contains(&self.size_std_dev) {
            return Err(Error::InvalidParam(format!(
                "size_std_dev must be in [0, 0.25), got {}",
                self.size_std_dev
            )));
        }
        self.validate_run()
    }

    /// Check only what a run over an already built room and population
    /// reads: step size, exit tolerance, lethal threshold and forces.
    pub fn validate_run(&self) -> Result<()> {
        check_positive(&[
            ("time_step", self.time_step),
            ("escape_radius", self.escape_radius),
            ("lethal_force", self.lethal_force),
        ])?;
        self.forces.validate()
    }
}

fn check_positive(fields: &[(&str, f64)]) -> Result<()> {
    for &(name, value) in fields {
        if !value.is_finite() || value <= 0.0 {
            return Err(Error::InvalidParam(format!(
                "{name} must be finite and > 0, got {value}"
            )));
        }
    }
    Ok(())
}
