//! Integration tests for the full evacuation pipeline.
//!
//! Exercises: SimConfig → Room → Population → fill_room → ForceModel
//! → integrate → EvacuationSummary
//!
//! All tests are pure logic: no rendering, no files.

use evacsim_logic::agents::{AgentState, Population};
use evacsim_logic::config::{ForceParams, SimConfig};
use evacsim_logic::forces::ForceModel;
use evacsim_logic::geometry::Segment;
use evacsim_logic::integrator::{integrate, parking_spot, IntegratorSettings};
use evacsim_logic::planner::desired_directions;
use evacsim_logic::room::{Room, RoomLayout, SpawnZone};
use evacsim_logic::simulation::Simulation;
use evacsim_logic::Result;
use glam::DVec2;

// ── Helpers ────────────────────────────────────────────────────────────

fn small_run(layout: RoomLayout, seed: u64) -> SimConfig {
    SimConfig {
        num_agents: 10,
        num_steps: 80,
        time_step: 0.05,
        room: layout,
        room_size: 12.0,
        seed: Some(seed),
        ..SimConfig::default()
    }
}

/// A room whose only wall and exit are far from the action.
fn open_field(destination: DVec2) -> Result<Room> {
    Room::new(
        1000.0,
        vec![Segment::from_coords(1.0e4, 0.0, 1.0e4, 1.0)],
        vec![destination],
        1,
        false,
        SpawnZone {
            x_min: -100.0,
            x_max: 100.0,
            y_min: -100.0,
            y_max: 100.0,
        },
    )
}

// ── Reference scenarios ────────────────────────────────────────────────

#[test]
fn distant_agents_relax_to_desired_velocity() -> Result<()> {
    let target = DVec2::new(200.0, 0.0);
    let room = open_field(target)?;
    let pop = Population::uniform(2, 0.25, 60.0, 1.25)?;
    let model = ForceModel::new(&room, &pop, ForceParams::default());

    let start = vec![DVec2::new(0.0, 20.0), DVec2::new(0.0, -20.0)];
    let traj = integrate(
        start,
        vec![DVec2::ZERO; 2],
        &model,
        &room,
        &IntegratorSettings::new(30, 0.05),
    )?;

    // Far apart the interaction is a vanishing exponential tail.
    let states = [AgentState::Active; 2];
    let f = model.agent_forces(&traj.positions[0], &traj.velocities[0], &states);
    assert!(f[0].length() < 1e-100, "{:?}", f[0]);

    let last = traj.num_steps() - 1;
    for i in 0..2 {
        let p = traj.positions[last][i];
        let want = (target - p).normalize() * 1.25;
        let got = traj.velocities[last][i];
        assert!(
            (got - want).length() < 1e-2,
            "agent {i}: velocity {got:?}, want {want:?}"
        );
    }
    Ok(())
}

#[test]
fn agent_at_the_door_escapes_in_one_step() -> Result<()> {
    let room = Room::from_layout(RoomLayout::SquareOneExit, 10.0)?;
    let exit = room.destinations()[0];
    let pop = Population::uniform(1, 0.25, 50.0, 1.25)?;
    let model = ForceModel::new(&room, &pop, ForceParams::default());

    let traj = integrate(
        vec![exit + DVec2::new(0.05, 0.0)],
        vec![DVec2::ZERO],
        &model,
        &room,
        &IntegratorSettings::new(5, 0.1),
    )?;

    assert_eq!(traj.escaped, vec![0, 1, 1, 1, 1]);
    assert_eq!(traj.escape_steps, vec![Some(1)]);
    assert_eq!(traj.final_states, vec![AgentState::Escaped]);
    for step in 1..traj.num_steps() {
        let p = traj.positions[step][0];
        assert_eq!(p, parking_spot(0));
        assert!(p.x > room.size() * 100.0 && p.y > room.size() * 100.0);
        assert_eq!(traj.velocities[step][0], DVec2::ZERO);
    }
    Ok(())
}

// ── Whole runs ─────────────────────────────────────────────────────────

#[test]
fn every_catalog_room_runs_cleanly() -> Result<()> {
    for layout in RoomLayout::ALL {
        let report = Simulation::new(small_run(layout, 7))?.run()?;
        let traj = &report.trajectory;
        assert!(traj.is_finite(), "{layout}: non-finite state");
        assert_eq!(traj.num_steps(), 80);
        assert!(
            traj.escaped.windows(2).all(|w| w[0] <= w[1]),
            "{layout}: escape count decreased"
        );
        let tagged = traj
            .final_states
            .iter()
            .filter(|s| **s == AgentState::Escaped)
            .count();
        assert_eq!(tagged as u32, traj.total_escaped(), "{layout}");
        assert_eq!(report.summary.escaped, traj.total_escaped());
    }
    Ok(())
}

#[test]
fn someone_gets_out_of_a_small_room() -> Result<()> {
    let config = SimConfig {
        num_steps: 300,
        ..small_run(RoomLayout::SquareOneExit, 3)
    };
    let report = Simulation::new(config)?.run()?;
    assert!(report.summary.escaped > 0, "{:?}", report.summary);
    let first = report.trajectory.escape_steps.iter().flatten().min().copied();
    assert_eq!(
        report.summary.mean_escape_time.is_some(),
        first.is_some()
    );
    Ok(())
}

#[test]
fn seeded_runs_are_bit_identical() -> Result<()> {
    let config = small_run(RoomLayout::SquareOneExitOneWall, 99);
    let a = Simulation::new(config.clone())?.run()?;
    let b = Simulation::new(config)?.run()?;
    assert_eq!(a.trajectory, b.trajectory);
    assert_eq!(a.summary, b.summary);
    Ok(())
}

#[test]
fn parallel_run_matches_serial_run() -> Result<()> {
    let serial = small_run(RoomLayout::SquareTwoExits, 5);
    let parallel = SimConfig {
        parallel: true,
        ..serial.clone()
    };
    let a = Simulation::new(serial)?.run()?;
    let b = Simulation::new(parallel)?.run()?;
    assert_eq!(a.trajectory, b.trajectory);
    Ok(())
}

// ── Exit assignment ────────────────────────────────────────────────────

#[test]
fn two_exit_rooms_split_population_by_index() -> Result<()> {
    let sim = Simulation::new(small_run(RoomLayout::SquareTwoExits, 11))?;
    let room = sim.room();
    let [left, right] = [room.destinations()[0], room.destinations()[1]];
    let n = sim.population().len();
    let positions = &sim.initial_state().positions;
    let states = vec![AgentState::Active; n];
    let headings = desired_directions(room, sim.population(), positions, &states);

    for (i, (p, e)) in positions.iter().zip(&headings).enumerate() {
        let exit = if i < n / 2 { left } else { right };
        assert_eq!(room.destination_for(i, n), exit);
        assert!(e.dot(exit - *p) > 0.0, "agent {i} heads away from its exit");
    }
    Ok(())
}
