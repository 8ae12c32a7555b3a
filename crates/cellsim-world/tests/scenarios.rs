use cellsim_core::{CellId, Position, SimConfig};
use cellsim_world::{Behavior, SimEvent, Simulation};

/// Empty world with no food economy, so every change is caused by the test.
fn quiet_config(seed: u64) -> SimConfig {
    let mut config = SimConfig::default();
    config.population.seed = seed;
    config.population.initial_cells = 0;
    config.population.initial_food = 0;
    config.food.min_food = 0;
    config.food.respawn_rate = 0.0;
    config
}

fn spawn_ready(sim: &mut Simulation, pos: Position) -> CellId {
    let id = sim.spawn_cell(pos).unwrap();
    sim.cell_mut(id).unwrap().mating_cooldown = 0;
    id
}

#[test]
fn test_mating_pair_produces_offspring() {
    let mut sim = Simulation::new(quiet_config(7), Vec::new()).unwrap();
    let first = spawn_ready(&mut sim, Position::new(100, 100));
    let second = spawn_ready(&mut sim, Position::new(110, 100));

    let report = sim.step();
    assert!(report
        .events
        .iter()
        .any(|e| matches!(e, SimEvent::MatingStarted { first: a, second: b } if *a == first && *b == second)));
    assert!(sim.cell(first).unwrap().is_mating());
    assert!(sim.cell(second).unwrap().is_mating());
    assert_eq!(sim.cell(first).unwrap().behavior(), Behavior::Mating);

    for _ in 0..240 {
        let report = sim.step();
        assert_eq!(report.mating_completed().count(), 0);
    }
    assert_eq!(sim.cell(first).unwrap().mating_timer(), 0);
    assert_eq!(sim.cell(first).unwrap().position(), Position::new(100, 100));

    let before = sim.cell(first).unwrap().clone();
    let report = sim.step();
    let completed: Vec<_> = report.mating_completed().collect();
    assert_eq!(completed.len(), 1);
    assert_eq!((completed[0].0, completed[0].1), (first, second));

    let after = sim.cell(first).unwrap();
    assert!(!after.is_mating());
    assert!((before.stamina - after.stamina - 90.0).abs() < 1e-3);
    assert!((before.hunger - after.hunger - 30.0).abs() < 1e-3);
    assert_eq!(after.mating_cooldown, 400);

    let partner = sim.cell(second).unwrap();
    assert!(!partner.is_mating());
    // the partner already ran its own status update this tick
    assert_eq!(partner.mating_cooldown, 399);
    assert!(partner.stamina <= 61.0);

    let born: Vec<_> = report
        .events
        .iter()
        .filter_map(|e| match e {
            SimEvent::CellBorn { id, parents, generation, position } => {
                Some((*id, *parents, *generation, *position))
            }
            _ => None,
        })
        .collect();
    assert!((1..=3).contains(&born.len()));
    assert_eq!(report.births, born.len());
    assert_eq!(completed[0].2, born.len());

    for (id, parents, generation, position) in born {
        assert_eq!(parents, Some((first, second)));
        assert_eq!(generation, 1);
        assert!(position.is_adjacent(&Position::new(100, 100), 10));
        assert_ne!(position, Position::new(100, 100));
        assert_ne!(position, Position::new(110, 100));

        let child = sim.cell(id).unwrap();
        assert_eq!(child.mating_cooldown, 160);
        assert!(child.traits.speed >= 1);
        assert!(child.traits.max_hp >= 10);
        assert!(sim.index().contains(id, position));
    }
    assert_eq!(sim.totals().matings_completed, 1);
}

#[test]
fn test_pair_is_released_when_partner_dies() {
    let mut sim = Simulation::new(quiet_config(3), Vec::new()).unwrap();
    let first = spawn_ready(&mut sim, Position::new(100, 100));
    let second = spawn_ready(&mut sim, Position::new(110, 100));
    sim.step();
    assert!(sim.cell(first).unwrap().is_mating());

    {
        let dying = sim.cell_mut(first).unwrap();
        dying.hunger = 0.0;
        dying.hp = 1.0;
    }
    let report = sim.step();
    assert!(sim.cell(first).is_none());
    assert!(report
        .events
        .iter()
        .any(|e| matches!(e, SimEvent::MatingAbandoned { id } if *id == second)));

    let survivor = sim.cell(second).unwrap();
    assert!(!survivor.is_mating());
    assert_eq!(survivor.partner(), None);
    // abandoning costs nothing
    assert_eq!(survivor.mating_cooldown, 0);
}

#[test]
fn test_dead_cell_is_gone_next_tick() {
    let mut sim = Simulation::new(quiet_config(11), Vec::new()).unwrap();
    let doomed = sim.spawn_cell(Position::new(300, 300)).unwrap();
    let neighbor = sim.spawn_cell(Position::new(320, 300)).unwrap();
    {
        let cell = sim.cell_mut(doomed).unwrap();
        cell.hunger = 0.0;
        cell.hp = 1.0;
    }

    let report = sim.step();
    assert_eq!(report.deaths, 1);
    assert!(report
        .events
        .iter()
        .any(|e| matches!(e, SimEvent::CellDied { id, .. } if *id == doomed)));

    assert!(sim.cell(doomed).is_none());
    assert!(sim.cell(neighbor).is_some());
    assert_eq!(sim.population(), 1);
    assert_eq!(sim.index().len(), 1);

    let near = sim.cell(neighbor).unwrap().position();
    assert!(sim.index().neighbors(near).all(|(id, _)| id != doomed));
    assert!(sim
        .index()
        .neighbors(Position::new(300, 300))
        .all(|(id, _)| id != doomed));

    // the spot is free again
    assert!(sim.spawn_cell(Position::new(300, 300)).is_some());
}

#[test]
fn test_food_floor_spawns_every_tick() {
    let mut config = quiet_config(5);
    config.population.initial_food = 50;
    config.food.min_food = 50;
    config.food.respawn_rate = 0.0;
    let mut sim = Simulation::new(config, Vec::new()).unwrap();
    assert_eq!(sim.food().len(), 50);

    let report = sim.step();
    assert_eq!(sim.food().len(), 51);
    assert!(report
        .events
        .iter()
        .any(|e| matches!(e, SimEvent::FoodSpawned { .. })));

    // above the floor only the (zero) rate applies
    sim.step();
    assert_eq!(sim.food().len(), 51);
}

#[test]
fn test_hungry_cell_eats_food_it_reaches() {
    let mut sim = Simulation::new(quiet_config(2), Vec::new()).unwrap();
    let id = sim.spawn_cell(Position::new(700, 450)).unwrap();
    assert!(sim.spawn_food(Position::new(700, 460)));
    sim.cell_mut(id).unwrap().hunger = 50.0;

    let report = sim.step();
    assert!(report
        .events
        .iter()
        .any(|e| matches!(e, SimEvent::FoodEaten { by, .. } if *by == id)));
    assert!(sim.food().is_empty());

    let cell = sim.cell(id).unwrap();
    assert_eq!(cell.position(), Position::new(700, 460));
    // 50 - 0.1 (step) - 1 (tick) + 45 (food)
    assert!((cell.hunger - 93.9).abs() < 1e-3);
}

#[test]
fn test_same_seed_same_trajectory() {
    let run = |seed: u64| {
        let mut config = SimConfig::default();
        config.population.seed = seed;
        let mut sim = Simulation::with_random_obstacles(config).unwrap();
        sim.run(300);
        serde_json::to_string(&sim.snapshot()).unwrap()
    };

    assert_eq!(run(42), run(42));
    assert_ne!(run(42), run(43));
}

#[test]
fn test_run_with_sees_every_tick() {
    let mut sim = Simulation::with_random_obstacles(SimConfig::default()).unwrap();
    let mut ticks = Vec::new();
    let summary = sim.run_with(25, |report| ticks.push(report.tick));

    assert_eq!(ticks, (1..=25).collect::<Vec<_>>());
    assert_eq!(summary.ticks_run, 25);
    assert_eq!(summary.stats.tick, 25);
    assert_eq!(summary.stats.population, sim.population());
    assert!(summary.peak_population >= sim.population());
}
