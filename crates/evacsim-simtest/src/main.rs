//! Evacsim Headless Simulation Harness
//!
//! Validates the force model, the integrator and every catalog room, then
//! runs one configured evacuation and prints its summary.
//! Runs entirely in-process: no files written, no rendering.
//!
//! Usage:
//!   cargo run -p evacsim-simtest
//!   cargo run -p evacsim-simtest -- --verbose
//!   cargo run -p evacsim-simtest -- --config run.json --room square_room_with_2_exits
//!   cargo run -p evacsim-simtest -- --agents 50 --steps 400 --seed 7 --json

use evacsim_logic::agents::{AgentState, Population};
use evacsim_logic::config::{ForceParams, SimConfig};
use evacsim_logic::forces::{pair_force, wall_force, ForceModel};
use evacsim_logic::geometry::{is_between, point_segment_distance, segment_intersection, Segment};
use evacsim_logic::integrator::{integrate, parking_spot, AccelerationField, IntegratorSettings};
use evacsim_logic::room::{Room, RoomLayout};
use evacsim_logic::simulation::{Simulation, SimulationReport};
use glam::DVec2;
use log::{error, info};

// ── Command line ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Options {
    verbose: bool,
    json: bool,
    config: Option<String>,
    room: Option<RoomLayout>,
    agents: Option<usize>,
    steps: Option<usize>,
    seed: Option<u64>,
}

fn parse_args() -> Result<Options, String> {
    let mut opts = Options::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .ok_or_else(|| format!("{flag} needs a value"))
        };
        match arg.as_str() {
            "--verbose" => opts.verbose = true,
            "--json" => opts.json = true,
            "--config" => opts.config = Some(value("--config")?),
            "--room" => {
                let v = value("--room")?;
                opts.room = Some(v.parse().map_err(|e| format!("{e}"))?);
            }
            "--agents" => {
                let v = value("--agents")?;
                opts.agents = Some(v.parse().map_err(|_| format!("bad --agents '{v}'"))?);
            }
            "--steps" => {
                let v = value("--steps")?;
                opts.steps = Some(v.parse().map_err(|_| format!("bad --steps '{v}'"))?);
            }
            "--seed" => {
                let v = value("--seed")?;
                opts.seed = Some(v.parse().map_err(|_| format!("bad --seed '{v}'"))?);
            }
            other => return Err(format!("unknown argument '{other}'")),
        }
    }
    Ok(opts)
}

fn load_config(opts: &Options) -> evacsim_logic::Result<SimConfig> {
    let mut config = match &opts.config {
        Some(path) => SimConfig::from_path(path)?,
        None => SimConfig {
            seed: Some(2024),
            ..SimConfig::default()
        },
    };
    if let Some(room) = opts.room {
        config.room = room;
    }
    if let Some(n) = opts.agents {
        config.num_agents = n;
    }
    if let Some(n) = opts.steps {
        config.num_steps = n;
    }
    if opts.seed.is_some() {
        config.seed = opts.seed;
    }
    config.validate()?;
    Ok(config)
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let opts = match parse_args() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };

    let default_filter = if opts.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = match load_config(&opts) {
        Ok(c) => c,
        Err(e) => {
            error!("config: {e}");
            std::process::exit(2);
        }
    };

    println!("=== Evacsim Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Geometry queries
    results.extend(validate_geometry(opts.verbose));

    // 2. Force model properties
    results.extend(validate_forces(opts.verbose));

    // 3. Integrator and escape handling
    results.extend(validate_integrator(opts.verbose));

    // 4. Every catalog room at small scale
    results.extend(validate_room_catalog(opts.verbose));

    // 5. Reproducibility
    results.extend(validate_determinism(opts.verbose));

    // 6. The configured run
    results.extend(run_configured(&config, opts.verbose, opts.json));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || opts.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn failure(name: &str, detail: impl std::fmt::Display) -> TestResult {
    TestResult {
        name: name.into(),
        passed: false,
        detail: detail.to_string(),
    }
}

// ── 1. Geometry ─────────────────────────────────────────────────────────

fn validate_geometry(_verbose: bool) -> Vec<TestResult> {
    println!("--- Geometry ---");
    let mut results = Vec::new();

    let wall = Segment::from_coords(0.0, 0.0, 10.0, 0.0);

    // Interior projection, both endpoint clamps
    let probes = [
        (DVec2::new(4.0, 3.0), 3.0, DVec2::new(4.0, 0.0)),
        (DVec2::new(-3.0, 4.0), 5.0, DVec2::new(0.0, 0.0)),
        (DVec2::new(13.0, -4.0), 5.0, DVec2::new(10.0, 0.0)),
    ];
    let bad: Vec<String> = probes
        .iter()
        .filter_map(|&(p, want_d, want_q)| {
            let c = point_segment_distance(p, &wall);
            let ok = (c.distance - want_d).abs() < 1e-12
                && (c.nearest - want_q).length() < 1e-12
                && (c.normal.length() - 1.0).abs() < 1e-12;
            (!ok).then(|| format!("{p:?} -> d={:.4} q={:?}", c.distance, c.nearest))
        })
        .collect();
    results.push(TestResult {
        name: "distance_projection_and_clamp".into(),
        passed: bad.is_empty(),
        detail: if bad.is_empty() {
            format!("{} probes matched", probes.len())
        } else {
            bad.join("; ")
        },
    });

    // Perpendicular diagonals cross at the centre
    let cross = segment_intersection(
        DVec2::new(0.0, 0.0),
        DVec2::new(2.0, 2.0),
        DVec2::new(0.0, 2.0),
        DVec2::new(2.0, 0.0),
    );
    results.push(TestResult {
        name: "intersection_diagonals".into(),
        passed: cross.is_some_and(|p| (p - DVec2::ONE).length() < 1e-12),
        detail: format!("{cross:?}"),
    });

    let parallel = segment_intersection(
        DVec2::new(0.0, 0.0),
        DVec2::new(1.0, 0.0),
        DVec2::new(0.0, 1.0),
        DVec2::new(1.0, 1.0),
    );
    results.push(TestResult {
        name: "intersection_parallel_none".into(),
        passed: parallel.is_none(),
        detail: format!("{parallel:?}"),
    });

    // A computed intersection must count as lying on both segments
    let (a1, a2) = (DVec2::new(0.1, 0.3), DVec2::new(7.7, 3.9));
    let (b1, b2) = (DVec2::new(0.2, 5.1), DVec2::new(6.3, -1.7));
    let on_both = segment_intersection(a1, a2, b1, b2)
        .is_some_and(|p| is_between(a1, a2, p) && is_between(b1, b2, p));
    results.push(TestResult {
        name: "intersection_is_between_tolerant".into(),
        passed: on_both,
        detail: "crossing point accepted on both segments".into(),
    });

    results
}

// ── 2. Force Model ──────────────────────────────────────────────────────

fn validate_forces(verbose: bool) -> Vec<TestResult> {
    println!("--- Force Model ---");
    let mut results = Vec::new();
    let params = ForceParams::default();

    // Pair force antisymmetry on a spread of separations and velocities
    let mut worst = 0.0f64;
    for k in 0..50 {
        let t = k as f64 * 0.37;
        let pi = DVec2::new(t.sin() * 2.0, t.cos());
        let pj = pi + DVec2::new(0.2 + 0.02 * k as f64, 0.1 * t.sin());
        let vi = DVec2::new(t.cos(), 0.5);
        let vj = DVec2::new(-0.3, t.sin());
        let f_ij = pair_force(&params, pi, pj, vi, vj, 0.25, 0.27);
        let f_ji = pair_force(&params, pj, pi, vj, vi, 0.27, 0.25);
        worst = worst.max((f_ij + f_ji).length());
    }
    results.push(TestResult {
        name: "pair_force_antisymmetric".into(),
        passed: worst == 0.0,
        detail: format!("max |f_ij + f_ji| = {worst:e}"),
    });

    // Overlapping a wall pushes the agent back out
    let wall = Segment::from_coords(0.0, 0.0, 0.0, 10.0);
    let pos = DVec2::new(0.15, 5.0);
    let f = wall_force(&params, pos, DVec2::new(-0.5, 0.3), 0.25, &wall);
    let outward = point_segment_distance(pos, &wall).normal;
    results.push(TestResult {
        name: "wall_contact_pushes_out".into(),
        passed: f.dot(outward) > 0.0,
        detail: format!("f = ({:.1}, {:.1})", f.x, f.y),
    });

    // A lone agent at rest only feels its own propulsion
    match lone_agent_acceleration(&params) {
        Ok(a) => {
            let want = DVec2::new(-12.5, 0.0);
            results.push(TestResult {
                name: "lone_agent_propulsion".into(),
                passed: (a - want).length() < 1e-6,
                detail: format!("a = ({:.4}, {:.4}), want ({}, {})", a.x, a.y, want.x, want.y),
            });
        }
        Err(e) => results.push(failure("lone_agent_propulsion", e)),
    }

    if verbose {
        println!("  Force decay with separation (r_i = r_j = 0.25):");
        for d in [0.3, 0.4, 0.5, 0.6, 0.8, 1.0] {
            let f = pair_force(
                &params,
                DVec2::new(d, 0.0),
                DVec2::ZERO,
                DVec2::ZERO,
                DVec2::ZERO,
                0.25,
                0.25,
            );
            println!("    d = {d:.1}: |f| = {:>10.3} N", f.length());
        }
    }

    results
}

fn lone_agent_acceleration(params: &ForceParams) -> evacsim_logic::Result<DVec2> {
    let room = Room::from_layout(RoomLayout::SquareOneExit, 40.0)?;
    let pop = Population::uniform(1, 0.25, 50.0, 1.25)?;
    let model = ForceModel::new(&room, &pop, *params);
    // On the exit's horizontal line, far from all walls.
    let a = model.acceleration(&[DVec2::new(20.0, 20.0)], &[DVec2::ZERO], &[AgentState::Active]);
    Ok(a[0])
}

// ── 3. Integrator ───────────────────────────────────────────────────────

fn validate_integrator(_verbose: bool) -> Vec<TestResult> {
    println!("--- Integrator ---");
    let mut results = Vec::new();

    match door_escape() {
        Ok((escaped, parked)) => {
            results.push(TestResult {
                name: "escape_after_one_step".into(),
                passed: escaped == [0, 1, 1],
                detail: format!("escape counts {escaped:?}"),
            });
            results.push(TestResult {
                name: "escaped_agent_parked".into(),
                passed: parked == parking_spot(0),
                detail: format!("parked at ({:.0}, {:.0})", parked.x, parked.y),
            });
        }
        Err(e) => results.push(failure("escape_after_one_step", e)),
    }

    results
}

fn door_escape() -> evacsim_logic::Result<(Vec<u32>, DVec2)> {
    let room = Room::from_layout(RoomLayout::SquareOneExit, 10.0)?;
    let pop = Population::uniform(1, 0.25, 50.0, 1.25)?;
    let model = ForceModel::new(&room, &pop, ForceParams::default());
    let start = room.destinations()[0] + DVec2::new(0.05, 0.0);
    let traj = integrate(
        vec![start],
        vec![DVec2::ZERO],
        &model,
        &room,
        &IntegratorSettings::new(3, 0.1),
    )?;
    Ok((traj.escaped.clone(), traj.positions[2][0]))
}

// ── 4. Room Catalog ─────────────────────────────────────────────────────

fn catalog_config(layout: RoomLayout, seed: u64) -> SimConfig {
    SimConfig {
        num_agents: 20,
        num_steps: 150,
        time_step: 0.05,
        room: layout,
        room_size: 15.0,
        seed: Some(seed),
        ..SimConfig::default()
    }
}

fn validate_room_catalog(verbose: bool) -> Vec<TestResult> {
    println!("--- Room Catalog ---");
    let mut results = Vec::new();

    for layout in RoomLayout::ALL {
        let name = format!("room_{}", layout.name());
        let report = match Simulation::new(catalog_config(layout, 1)).and_then(|s| s.run()) {
            Ok(r) => r,
            Err(e) => {
                results.push(failure(&name, e));
                continue;
            }
        };
        let problems = check_report(&report);
        results.push(TestResult {
            name,
            passed: problems.is_empty(),
            detail: if problems.is_empty() {
                format!(
                    "{}/{} escaped in {} steps",
                    report.summary.escaped, report.summary.num_agents, report.summary.num_steps
                )
            } else {
                problems.join("; ")
            },
        });
        if verbose {
            println!(
                "  {:40} escaped={:3} peak_force={:8.1} N",
                layout.name(),
                report.summary.escaped,
                report.summary.peak_force
            );
        }
    }

    results
}

/// Structural checks every finished run must pass.
fn check_report(report: &SimulationReport) -> Vec<String> {
    let traj = &report.trajectory;
    let mut problems = Vec::new();
    if !traj.is_finite() {
        problems.push("non-finite state".to_string());
    }
    if !traj.escaped.windows(2).all(|w| w[0] <= w[1]) {
        problems.push("escape count decreased".to_string());
    }
    let tagged = traj
        .final_states
        .iter()
        .filter(|s| !s.is_active())
        .count() as u32;
    if tagged != traj.total_escaped() {
        problems.push(format!(
            "{} tagged escaped but counter says {}",
            tagged,
            traj.total_escaped()
        ));
    }
    problems
}

// ── 5. Determinism ──────────────────────────────────────────────────────

fn validate_determinism(_verbose: bool) -> Vec<TestResult> {
    println!("--- Determinism ---");
    let mut results = Vec::new();

    let config = catalog_config(RoomLayout::SquareTwoExitsOneWallOneDoor, 42);
    let run = |c: SimConfig| Simulation::new(c).and_then(|s| s.run());

    match (run(config.clone()), run(config.clone())) {
        (Ok(a), Ok(b)) => results.push(TestResult {
            name: "same_seed_same_trajectory".into(),
            passed: a.trajectory == b.trajectory,
            detail: format!("{} steps compared", a.trajectory.num_steps()),
        }),
        (Err(e), _) | (_, Err(e)) => results.push(failure("same_seed_same_trajectory", e)),
    }

    let parallel = SimConfig {
        parallel: true,
        ..config.clone()
    };
    match (run(config), run(parallel)) {
        (Ok(a), Ok(b)) => results.push(TestResult {
            name: "parallel_matches_serial".into(),
            passed: a.trajectory == b.trajectory,
            detail: format!("{} agents compared", a.trajectory.num_agents()),
        }),
        (Err(e), _) | (_, Err(e)) => results.push(failure("parallel_matches_serial", e)),
    }

    results
}

// ── 6. Configured Run ───────────────────────────────────────────────────

fn run_configured(config: &SimConfig, verbose: bool, json: bool) -> Vec<TestResult> {
    println!("--- Configured Run ---");
    let mut results = Vec::new();

    info!(
        "{} agents, {} steps, room {} ({})",
        config.num_agents, config.num_steps, config.room, config.room_size
    );
    let report = match Simulation::new(config.clone()).and_then(|s| s.run()) {
        Ok(r) => r,
        Err(e) => {
            results.push(failure("configured_run", e));
            return results;
        }
    };

    let problems = check_report(&report);
    let s = &report.summary;
    results.push(TestResult {
        name: "configured_run".into(),
        passed: problems.is_empty(),
        detail: if problems.is_empty() {
            format!("{}/{} escaped", s.escaped, s.num_agents)
        } else {
            problems.join("; ")
        },
    });

    let fmt_time = |t: Option<f64>| t.map_or("-".to_string(), |t| format!("{t:.1}"));
    println!("  room:              {} (size {})", config.room, config.room_size);
    println!("  escaped:           {}/{}", s.escaped, s.num_agents);
    println!("  half evacuated at: {}", fmt_time(s.half_evacuated_at));
    println!("  all evacuated at:  {}", fmt_time(s.fully_evacuated_at));
    println!("  mean escape time:  {}", fmt_time(s.mean_escape_time));
    println!("  peak force:        {:.1} N", s.peak_force);
    println!(
        "  casualties:        {} (max {} in one step, threshold {:.0} N)",
        s.casualties, s.max_casualties_in_step, s.lethal_force
    );

    if verbose {
        let every = (s.num_steps / 10).max(1);
        println!("  Escaped over time:");
        for (step, count) in report.trajectory.escaped.iter().enumerate().step_by(every) {
            println!("    t = {:6.1}: {}", step as f64 * s.time_step, count);
        }
    }

    if json {
        match serde_json::to_string_pretty(s) {
            Ok(text) => println!("{text}"),
            Err(e) => results.push(failure("summary_json", e)),
        }
    }

    results
}
