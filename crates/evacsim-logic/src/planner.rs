//! Desired walking direction for each agent.
//!
//! Without interior obstacles every agent heads straight for its exit.
//! With obstacles a greedy local rule is applied:
//! 1. Pick the obstacle wall whose line crosses the agent→exit line closest
//!    to the agent
//! 2. The straight path is blocked if that crossing lies on the wall and in
//!    front of the agent, or if the agent is brushing a wall tip
//! 3. If blocked, aim just past the wall tip with the shorter total path,
//!    two radii beyond the end so the body clears it
//! 4. Otherwise head straight for the exit
//!
//! Only one wall is considered per decision. Obstacles that occlude each
//! other are not handled.

use glam::DVec2;

use crate::agents::{AgentState, Population};
use crate::geometry::{heading, is_between, segment_intersection, Segment};
use crate::room::Room;

/// Unit heading for every agent. Escaped agents get the zero vector.
pub fn desired_directions(
    room: &Room,
    population: &Population,
    positions: &[DVec2],
    states: &[AgentState],
) -> Vec<DVec2> {
    let n = positions.len();
    positions
        .iter()
        .zip(states)
        .enumerate()
        .map(|(i, (&pos, state))| {
            if state.is_active() {
                desired_direction(room, i, n, pos, population.radius()[i])
            } else {
                DVec2::ZERO
            }
        })
        .collect()
}

/// Unit heading for agent `agent` at `pos` with body radius `radius`.
pub fn desired_direction(
    room: &Room,
    agent: usize,
    num_agents: usize,
    pos: DVec2,
    radius: f64,
) -> DVec2 {
    let dest = room.destination_for(agent, num_agents);
    if !room.has_interior_obstacles() {
        return heading(pos, dest);
    }
    match nearest_obstacle(room.obstacle_walls(), pos, dest) {
        Some((wall, crossing)) if is_blocked(&wall, crossing, pos, dest, radius) => {
            detour_heading(&wall, pos, dest, radius)
        }
        _ => heading(pos, dest),
    }
}

/// Obstacle wall whose line meets the agent→exit line closest to the agent,
/// together with that meeting point. Walls parallel to the path are skipped.
pub fn nearest_obstacle(obstacles: &[Segment], pos: DVec2, dest: DVec2) -> Option<(Segment, DVec2)> {
    obstacles
        .iter()
        .filter_map(|wall| segment_intersection(pos, dest, wall.p0, wall.p1).map(|p| (*wall, p)))
        .min_by(|(_, a), (_, b)| pos.distance(*a).total_cmp(&pos.distance(*b)))
}

/// Whether `wall` stands between the agent and its exit.
pub fn is_blocked(wall: &Segment, crossing: DVec2, pos: DVec2, dest: DVec2, radius: f64) -> bool {
    let on_wall = is_between(wall.p0, wall.p1, crossing);
    let straight = pos.distance(dest);
    let from_crossing = crossing.distance(dest);
    let near_tip = pos.distance(wall.p0).min(pos.distance(wall.p1)) < 2.0 * radius;

    (on_wall && straight + radius > from_crossing) || (near_tip && straight > from_crossing)
}

/// Head for the point two radii past the wall tip with the shorter
/// agent→tip→exit path. Ties go to `p0`.
pub fn detour_heading(wall: &Segment, pos: DVec2, dest: DVec2, radius: f64) -> DVec2 {
    let along = wall.direction();
    let via = |tip: DVec2| dest.distance(tip) + pos.distance(tip);
    let target = if via(wall.p0) <= via(wall.p1) {
        wall.p0 + along * (2.0 * radius)
    } else {
        wall.p1 - along * (2.0 * radius)
    };
    heading(pos, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::room::RoomLayout;

    const R: f64 = 0.25;

    fn v(x: f64, y: f64) -> DVec2 {
        DVec2::new(x, y)
    }

    fn assert_close(a: DVec2, b: DVec2) {
        assert!((a - b).length() < 1e-9, "{a:?} != {b:?}");
    }

    // Size 40 with one exit and an interior wall at x = 10, y ∈ [12, 28].
    fn obstacle_room() -> Result<Room> {
        Room::from_layout(RoomLayout::SquareOneExitOneWall, 40.0)
    }

    // --- Open rooms ---

    #[test]
    fn open_room_heads_for_exit() -> Result<()> {
        let room = Room::from_layout(RoomLayout::SquareOneExit, 40.0)?;
        let e = desired_direction(&room, 0, 1, v(20.0, 20.0), R);
        assert_close(e, v(-1.0, 0.0));
        Ok(())
    }

    #[test]
    fn two_exits_split_population() -> Result<()> {
        let room = Room::from_layout(RoomLayout::SquareTwoExits, 40.0)?;
        let pop = Population::uniform(4, R, 50.0, 1.5)?;
        let positions = vec![v(20.0, 20.0); 4];
        let states = vec![AgentState::Active; 4];
        let e = desired_directions(&room, &pop, &positions, &states);
        assert_close(e[0], v(-1.0, 0.0));
        assert_close(e[1], v(-1.0, 0.0));
        assert_close(e[2], v(1.0, 0.0));
        assert_close(e[3], v(1.0, 0.0));
        Ok(())
    }

    #[test]
    fn escaped_agents_have_no_heading() -> Result<()> {
        let room = Room::from_layout(RoomLayout::SquareOneExit, 40.0)?;
        let pop = Population::uniform(2, R, 50.0, 1.5)?;
        let e = desired_directions(
            &room,
            &pop,
            &[v(20.0, 20.0), v(30.0, 30.0)],
            &[AgentState::Active, AgentState::Escaped],
        );
        assert!((e[0].length() - 1.0).abs() < 1e-12);
        assert_eq!(e[1], DVec2::ZERO);
        Ok(())
    }

    // --- Obstacle routing ---

    #[test]
    fn wall_straight_ahead_is_blocked() -> Result<()> {
        let room = obstacle_room()?;
        let pos = v(20.0, 20.0);
        // Symmetric about the wall centre: the tie picks p0 = (10, 12),
        // extended to (10, 11.5).
        let e = desired_direction(&room, 0, 1, pos, R);
        assert_close(e, (v(10.0, 11.5) - pos).normalize());
        Ok(())
    }

    #[test]
    fn detour_uses_closer_tip() -> Result<()> {
        let room = obstacle_room()?;
        let pos = v(20.0, 30.0);
        let e = desired_direction(&room, 0, 1, pos, R);
        assert_close(e, (v(10.0, 28.5) - pos).normalize());
        Ok(())
    }

    #[test]
    fn clear_line_of_sight_goes_straight() -> Result<()> {
        let room = obstacle_room()?;
        // The path passes above the wall tip.
        let pos = v(20.0, 39.0);
        let e = desired_direction(&room, 0, 1, pos, R);
        assert_close(e, heading(pos, room.destinations()[0]));
        Ok(())
    }

    #[test]
    fn wall_behind_agent_is_ignored() -> Result<()> {
        let room = obstacle_room()?;
        let pos = v(5.0, 20.0);
        let e = desired_direction(&room, 0, 1, pos, R);
        assert_close(e, v(-1.0, 0.0));
        Ok(())
    }

    #[test]
    fn brushing_tip_counts_as_blocked() {
        let wall = Segment::from_coords(10.0, 12.0, 10.0, 28.0);
        let dest = v(-0.5, 20.0);
        // Just past the lower tip on the far side, path crossing misses the wall.
        let pos = v(10.2, 11.7);
        let crossing = segment_intersection(pos, dest, wall.p0, wall.p1).expect("not parallel");
        assert!(!is_between(wall.p0, wall.p1, crossing));
        assert!(is_blocked(&wall, crossing, pos, dest, R));
    }

    #[test]
    fn parallel_path_has_no_obstacle() {
        let wall = Segment::from_coords(10.0, 12.0, 10.0, 28.0);
        assert!(nearest_obstacle(&[wall], v(5.0, 30.0), v(5.0, 0.0)).is_none());
    }

    #[test]
    fn nearest_obstacle_picks_closest_crossing() {
        let near = Segment::from_coords(15.0, 0.0, 15.0, 40.0);
        let far = Segment::from_coords(5.0, 0.0, 5.0, 40.0);
        let (wall, crossing) =
            nearest_obstacle(&[far, near], v(20.0, 20.0), v(-0.5, 20.0)).expect("crossing");
        assert_eq!(wall, near);
        assert_close(crossing, v(15.0, 20.0));
    }
}
