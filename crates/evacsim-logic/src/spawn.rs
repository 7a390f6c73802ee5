//! Initial placement of agents inside the spawn zone.
//!
//! Placement is rejection sampling: each agent draws uniform positions
//! until it keeps `3·max(r_i, r_j)` from every agent placed before it and
//! two radii from every wall. A capacity check runs first so overfull
//! rooms fail fast instead of spinning.

use glam::DVec2;
use log::debug;
use rand::Rng;

use crate::agents::{AgentState, Population};
use crate::error::{Error, Result};
use crate::geometry::point_segment_distance;
use crate::planner::desired_directions;
use crate::room::Room;

/// Minimum centre distance between two agents, in units of the larger radius.
pub const SEPARATION_FACTOR: f64 = 3.0;

/// Distance to any wall kept by [`fill_room`], in units of the agent radius.
pub const WALL_CLEARANCE_FACTOR: f64 = 2.0;

/// Distance to any wall required of a caller-supplied placement: no body
/// may start in contact with a wall.
pub const MIN_WALL_CLEARANCE_FACTOR: f64 = 1.0;

/// Fraction of the spawn square the population footprint may fill.
pub const MAX_FILL_RATIO: f64 = 0.7;

/// Draws per agent before giving up.
pub const MAX_SPAWN_ATTEMPTS: usize = 10_000;

/// Positions and velocities before the first step.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialState {
    pub positions: Vec<DVec2>,
    pub velocities: Vec<DVec2>,
}

/// Reject populations whose footprint `Σ(2r)²` does not fit the spawn zone.
///
/// The zone is measured by its longer side, squared.
pub fn check_capacity(room: &Room, population: &Population) -> Result<()> {
    let zone = room.spawn_zone();
    let max_len = zone.width().max(zone.height());
    let available = MAX_FILL_RATIO * max_len * max_len;
    let required = population.footprint();
    if required >= available {
        return Err(Error::SpawnAreaTooSmall {
            required,
            available,
        });
    }
    Ok(())
}

/// Verify that a given initial placement keeps agents apart and off walls.
///
/// Used for caller-supplied placements. Walls only need to be one radius
/// away; [`fill_room`] keeps two and so satisfies this by construction.
pub fn check_separation(room: &Room, population: &Population, positions: &[DVec2]) -> Result<()> {
    if positions.len() != population.len() {
        return Err(Error::InvalidParam(format!(
            "{} positions for {} agents",
            positions.len(),
            population.len()
        )));
    }
    let radius = population.radius();
    for (i, &p) in positions.iter().enumerate() {
        if !p.is_finite() {
            return Err(Error::InvalidParam(format!("agent #{i} position is not finite")));
        }
        if let Some(j) = (0..i).find(|&j| too_close(p, positions[j], radius[i], radius[j])) {
            return Err(Error::InvalidParam(format!(
                "agents #{j} and #{i} start closer than {SEPARATION_FACTOR} radii"
            )));
        }
        if touches_wall(room, p, radius[i], MIN_WALL_CLEARANCE_FACTOR) {
            return Err(Error::InvalidParam(format!(
                "agent #{i} starts within {MIN_WALL_CLEARANCE_FACTOR} radius of a wall"
            )));
        }
    }
    Ok(())
}

/// Place every agent in the spawn zone and start it walking at its desired
/// speed towards its exit.
pub fn fill_room<R: Rng + ?Sized>(
    room: &Room,
    population: &Population,
    rng: &mut R,
) -> Result<InitialState> {
    check_capacity(room, population)?;

    let zone = *room.spawn_zone();
    let radius = population.radius();
    let mut positions: Vec<DVec2> = Vec::with_capacity(population.len());

    for i in 0..population.len() {
        let mut placed = None;
        for attempt in 0..MAX_SPAWN_ATTEMPTS {
            let candidate = DVec2::new(
                zone.x_min + zone.width() * rng.gen::<f64>(),
                zone.y_min + zone.height() * rng.gen::<f64>(),
            );
            let clear = !touches_wall(room, candidate, radius[i], WALL_CLEARANCE_FACTOR)
                && positions
                    .iter()
                    .enumerate()
                    .all(|(j, &other)| !too_close(candidate, other, radius[i], radius[j]));
            if clear {
                if attempt > 0 {
                    debug!("agent {} placed after {} retries", i, attempt);
                }
                placed = Some(candidate);
                break;
            }
        }
        match placed {
            Some(p) => positions.push(p),
            None => {
                return Err(Error::SpawnFailed {
                    agent: i,
                    attempts: MAX_SPAWN_ATTEMPTS,
                })
            }
        }
    }

    let states = vec![AgentState::Active; positions.len()];
    let headings = desired_directions(room, population, &positions, &states);
    let velocities = headings
        .iter()
        .zip(population.desired_speed())
        .map(|(e, speed)| *e * *speed)
        .collect();

    Ok(InitialState {
        positions,
        velocities,
    })
}

fn too_close(a: DVec2, b: DVec2, radius_a: f64, radius_b: f64) -> bool {
    a.distance(b) < SEPARATION_FACTOR * radius_a.max(radius_b)
}

fn touches_wall(room: &Room, p: DVec2, radius: f64, factor: f64) -> bool {
    room.walls()
        .iter()
        .any(|w| point_segment_distance(p, w).distance < factor * radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::RoomLayout;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn filled_room_respects_separation() -> Result<()> {
        let room = Room::from_layout(RoomLayout::SquareOneExit, 20.0)?;
        let pop = Population::uniform(60, 0.25, 50.0, 1.25)?;
        let mut rng = StdRng::seed_from_u64(1);
        let init = fill_room(&room, &pop, &mut rng)?;

        assert_eq!(init.positions.len(), 60);
        check_separation(&room, &pop, &init.positions)?;
        for p in &init.positions {
            assert!(room.spawn_zone().contains(*p), "{p:?}");
        }
        Ok(())
    }

    #[test]
    fn initial_velocity_is_desired_speed_towards_exit() -> Result<()> {
        let room = Room::from_layout(RoomLayout::SquareOneExit, 20.0)?;
        let pop = Population::uniform(5, 0.25, 50.0, 1.25)?;
        let mut rng = StdRng::seed_from_u64(2);
        let init = fill_room(&room, &pop, &mut rng)?;
        let exit = room.destinations()[0];
        for (p, v) in init.positions.iter().zip(&init.velocities) {
            assert!((v.length() - 1.25).abs() < 1e-12);
            assert!(v.dot(exit - *p) > 0.0);
        }
        Ok(())
    }

    #[test]
    fn same_seed_same_placement() -> Result<()> {
        let room = Room::from_layout(RoomLayout::SquareTwoExits, 15.0)?;
        let pop = Population::uniform(20, 0.25, 50.0, 1.25)?;
        let a = fill_room(&room, &pop, &mut StdRng::seed_from_u64(42))?;
        let b = fill_room(&room, &pop, &mut StdRng::seed_from_u64(42))?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn overfull_room_is_rejected() -> Result<()> {
        let room = Room::from_layout(RoomLayout::SquareOneExit, 5.0)?;
        // Spawn zone is 3 units on its longer side: 0.7 · 9 = 6.3 area units.
        let pop = Population::uniform(30, 0.25, 50.0, 1.25)?;
        let err = fill_room(&room, &pop, &mut StdRng::seed_from_u64(0)).unwrap_err();
        match err {
            Error::SpawnAreaTooSmall {
                required,
                available,
            } => {
                assert!((required - 7.5).abs() < 1e-9);
                assert!((available - 6.3).abs() < 1e-9);
            }
            other => panic!("expected SpawnAreaTooSmall, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn separation_violation_reported() -> Result<()> {
        let room = Room::from_layout(RoomLayout::SquareOneExit, 20.0)?;
        let pop = Population::uniform(2, 0.25, 50.0, 1.25)?;
        let err = check_separation(
            &room,
            &pop,
            &[DVec2::new(10.0, 10.0), DVec2::new(10.5, 10.0)],
        )
        .unwrap_err();
        assert!(err.to_string().contains("agents #0 and #1"));

        let err = check_separation(
            &room,
            &pop,
            &[DVec2::new(10.0, 10.0), DVec2::new(19.8, 10.0)],
        )
        .unwrap_err();
        assert!(err.to_string().contains("agent #1 starts within"));
        Ok(())
    }

    #[test]
    fn supplied_placement_may_stand_closer_to_walls_than_fill_room() -> Result<()> {
        let room = Room::from_layout(RoomLayout::SquareOneExit, 20.0)?;
        let pop = Population::uniform(1, 0.25, 50.0, 1.25)?;
        // 0.4 from the right wall: inside 2r, outside r.
        check_separation(&room, &pop, &[DVec2::new(19.6, 10.0)])?;
        assert!(touches_wall(&room, DVec2::new(19.6, 10.0), 0.25, WALL_CLEARANCE_FACTOR));
        Ok(())
    }
}
