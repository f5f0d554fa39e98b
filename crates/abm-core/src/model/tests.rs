use super::*;

fn uniform_grid(value: f64, size: usize) -> Grid {
    Grid::from_rows(vec![vec![value; size]; size]).unwrap()
}

fn config(num_agents: usize) -> SimConfig {
    SimConfig {
        num_agents,
        num_iterations: 50,
        neighbourhood_radius: 3.0,
        store_size: 0.0,
        bite_size: 10.0,
        x_limit: None,
        y_limit: None,
        seed: 1234,
        ..SimConfig::default()
    }
}

fn conserved_total(model: &Model) -> f64 {
    model.environment().total() + model.agents.iter().map(|a| a.store).sum::<f64>()
}

#[test]
fn new_places_agents_inside_the_window() {
    let cfg = SimConfig {
        x_limit: Some(7),
        y_limit: Some(5),
        ..config(200)
    };
    let model = Model::new(cfg, uniform_grid(50.0, 20), &StartPositions::default()).unwrap();
    assert_eq!(model.agents.len(), 200);
    assert!(model.agents.iter().all(|a| a.x < 7 && a.y < 5));
    assert!(model.agents.iter().all(|a| a.store == 0.0));
}

#[test]
fn seed_positions_fill_leading_agents() {
    let start = StartPositions {
        xs: vec![1, 2, 25],
        ys: vec![3, -1],
    };
    let model = Model::new(config(4), uniform_grid(50.0, 10), &start).unwrap();
    assert_eq!(model.agents[0].position(), [1, 3]);
    assert_eq!(model.agents[1].position(), [2, 9]);
    // x seeded and wrapped, y random
    assert_eq!(model.agents[2].x, 5);
    assert!(model.agents[2].y < 10);
    assert!(model.agents[3].x < 10 && model.agents[3].y < 10);
}

#[test]
fn empty_window_is_rejected_only_when_agents_exist() {
    let cfg = SimConfig {
        x_limit: Some(0),
        ..config(3)
    };
    let err = Model::new(cfg.clone(), uniform_grid(1.0, 4), &StartPositions::default())
        .err()
        .unwrap();
    assert_eq!(
        err,
        ModelInitError::EmptyEnvironment {
            x_length: 0,
            y_length: 4
        }
    );

    let no_agents = SimConfig {
        num_agents: 0,
        ..cfg
    };
    let mut model = Model::new(no_agents, uniform_grid(1.0, 4), &StartPositions::default()).unwrap();
    assert_eq!(model.tick(), TickOutcome::Running);
}

#[test]
fn invalid_config_is_rejected() {
    let cfg = SimConfig {
        bite_size: -1.0,
        ..config(3)
    };
    let err = Model::new(cfg, uniform_grid(1.0, 4), &StartPositions::default())
        .err()
        .unwrap();
    assert!(matches!(err, ModelInitError::Config(_)));
    assert!(err.source().is_some());
}

#[test]
fn tick_conserves_resource_plus_stores() {
    let mut model = Model::new(config(40), uniform_grid(35.0, 12), &StartPositions::default())
        .unwrap();
    let before = conserved_total(&model);
    for _ in 0..30 {
        model.tick();
        assert!((conserved_total(&model) - before).abs() < 1e-6);
        assert!(model
            .agents
            .iter()
            .all(|a| a.x < 12 && a.y < 12 && a.store >= 0.0));
    }
    assert!(model.agents.iter().any(|a| a.store > 0.0));
    assert_eq!(model.tick_index(), 30);
}

#[test]
fn cells_never_drop_below_zero() {
    let mut model = Model::new(config(60), uniform_grid(25.0, 6), &StartPositions::default())
        .unwrap();
    for _ in 0..200 {
        model.tick();
    }
    assert!(model.environment().window().iter().all(|&v| v >= 0.0));
    // 25 allows two bites (25 > 10, 15 > 10) then stops at 5.
    assert!(model.environment().window().iter().all(|&v| v >= 5.0 - 1e-9));
}

#[test]
fn same_seed_gives_same_run() {
    let run = || {
        let mut model =
            Model::new(config(25), uniform_grid(40.0, 15), &StartPositions::default()).unwrap();
        for _ in 0..20 {
            model.tick();
        }
        model.snapshot()
    };
    let a = run();
    let b = run();
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn tick_shuffles_population_order() {
    let mut model = Model::new(config(20), uniform_grid(0.0, 10), &StartPositions::default())
        .unwrap();
    model.tick();
    let ids: Vec<u32> = model.agents.iter().map(|a| a.id).collect();
    assert_ne!(ids, (0..20).collect::<Vec<u32>>());
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..20).collect::<Vec<u32>>());
}

#[test]
fn sharing_spreads_stores_between_neighbours() {
    let cfg = SimConfig {
        neighbourhood_radius: 100.0,
        ..config(2)
    };
    let mut model = Model::new(cfg, uniform_grid(0.0, 5), &StartPositions::default()).unwrap();
    model.agents[0].store = 10.0;
    model.tick();
    assert_eq!(model.agents[0].store, 5.0);
    assert_eq!(model.agents[1].store, 5.0);
}

#[test]
fn capped_stores_eventually_complete() {
    let cfg = SimConfig {
        store_size: 20.0,
        neighbourhood_radius: 0.0,
        ..config(5)
    };
    let mut model = Model::new(cfg, uniform_grid(1e6, 8), &StartPositions::default()).unwrap();
    let summary = model.try_run(500, 10).unwrap();
    assert!(summary.completed);
    assert!(summary.ticks_run < 500);
    assert!(model.is_complete());
    assert!(model.agents.iter().all(|a| a.store <= 20.0));
    let last = summary.samples.last().unwrap();
    assert_eq!(last.tick, summary.ticks_run);
    assert_eq!(last.full_agents, 5);
}

#[test]
fn unlimited_stores_never_complete() {
    let mut model = Model::new(config(5), uniform_grid(1e6, 8), &StartPositions::default())
        .unwrap();
    let summary = model.run(40, 10);
    assert!(!summary.completed);
    assert_eq!(summary.ticks_run, 40);
    assert_eq!(summary.samples.len(), 4);
    assert_eq!(summary.final_stores.len(), 5);
}

#[test]
fn samples_include_the_final_tick() {
    let mut model = Model::new(config(3), uniform_grid(5.0, 8), &StartPositions::default())
        .unwrap();
    let summary = model.try_run(10, 3).unwrap();
    let ticks: Vec<usize> = summary.samples.iter().map(|s| s.tick).collect();
    assert_eq!(ticks, vec![3, 6, 9, 10]);
}

#[test]
fn run_arguments_are_checked() {
    let mut model = Model::new(config(1), uniform_grid(5.0, 4), &StartPositions::default())
        .unwrap();
    assert_eq!(model.try_run(5, 0).unwrap_err(), RunError::InvalidSampleEvery);
    assert!(matches!(
        model.try_run(Model::MAX_RUN_TICKS + 1, 1),
        Err(RunError::TooManyTicks { .. })
    ));
}

#[test]
fn reset_rebuilds_environment_and_agents() {
    let mut model = Model::new(config(10), uniform_grid(30.0, 10), &StartPositions::default())
        .unwrap();
    for _ in 0..10 {
        model.tick();
    }
    assert!(model.environment().total() < 3_000.0);
    model
        .reset(uniform_grid(30.0, 10), &StartPositions::default())
        .unwrap();
    assert_eq!(model.tick_index(), 0);
    assert_eq!(model.environment().total(), 3_000.0);
    assert!(model.agents.iter().all(|a| a.store == 0.0));
    let ids: Vec<u32> = model.agents.iter().map(|a| a.id).collect();
    assert_eq!(ids, (0..10).collect::<Vec<u32>>());
}

#[test]
fn failed_reset_keeps_previous_environment() {
    let cfg = SimConfig {
        x_limit: Some(4),
        ..config(3)
    };
    let mut model = Model::new(cfg, uniform_grid(2.0, 6), &StartPositions::default()).unwrap();
    let empty = Grid::from_rows(Vec::new()).unwrap();
    assert!(model.reset(empty, &StartPositions::default()).is_err());
    assert_eq!(model.environment().x_length(), 4);
    assert_eq!(model.agents.len(), 3);
}

#[test]
fn snapshot_lists_agents_by_id() {
    let mut model = Model::new(config(6), uniform_grid(20.0, 5), &StartPositions::default())
        .unwrap();
    model.tick();
    let snap = model.snapshot();
    assert_eq!(snap.tick, 1);
    assert_eq!((snap.x_length, snap.y_length), (5, 5));
    assert_eq!(snap.plane.len(), 25);
    let ids: Vec<u32> = snap.agents.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
}
