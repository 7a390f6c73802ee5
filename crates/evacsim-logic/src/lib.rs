//! Social-force crowd evacuation model.
//!
//! Agents are pushed towards an exit by self-propulsion and pushed apart by
//! short-range repulsion and contact forces from each other and from walls.
//! Everything here is plain data in, plain data out: no I/O, no rendering,
//! no global state. The `evacsim-simtest` harness drives it headlessly.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`agents`] | Per-agent radius/mass/speed, active/escaped tag |
//! | [`analysis`] | Crush forces, casualty counts, evacuation timing |
//! | [`config`] | Run configuration and force constants (serde) |
//! | [`error`] | Crate-wide error type |
//! | [`forces`] | Pair, wall and propulsion forces → acceleration |
//! | [`geometry`] | Point-segment distance, line intersection, containment |
//! | [`integrator`] | Leap-frog stepping, exit detection, trajectory |
//! | [`planner`] | Desired heading with single-wall detours |
//! | [`room`] | Wall/exit/spawn-zone geometry and the room catalog |
//! | [`simulation`] | Driver tying config, placement and integration |
//! | [`spawn`] | Non-overlapping initial placement |
//!
//! # Usage
//!
//! ```
//! use evacsim_logic::config::SimConfig;
//! use evacsim_logic::simulation::Simulation;
//!
//! let config = SimConfig {
//!     num_agents: 4,
//!     num_steps: 10,
//!     room_size: 10.0,
//!     seed: Some(3),
//!     ..SimConfig::default()
//! };
//! let report = Simulation::new(config)?.run()?;
//! assert_eq!(report.trajectory.num_steps(), 10);
//! # Ok::<(), evacsim_logic::error::Error>(())
//! ```

pub mod agents;
pub mod analysis;
pub mod config;
pub mod error;
pub mod forces;
pub mod geometry;
pub mod integrator;
pub mod planner;
pub mod room;
pub mod simulation;
pub mod spawn;

pub use error::{Error, Result};
