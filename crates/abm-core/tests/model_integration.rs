use abm_core::config::SimConfig;
use abm_core::controller::{AnimationState, Controller, FileLoader};
use abm_core::environment::Grid;
use abm_core::model::{Model, RunSummary};
use abm_core::params::ParameterForm;
use abm_core::start_positions::StartPositions;
use std::fmt::Write as _;
use std::path::Path;

fn write_grid(path: &Path, size: usize, value: f64) {
    let mut text = String::new();
    for _ in 0..size {
        let row: Vec<String> = (0..size).map(|_| format!("\"{value}\"")).collect();
        writeln!(text, "{}", row.join(",")).unwrap();
    }
    std::fs::write(path, text).unwrap();
}

#[test]
fn controller_runs_a_file_backed_scenario_to_the_end() {
    let dir = tempfile::tempdir().unwrap();
    let grid_path = dir.path().join("in.txt");
    write_grid(&grid_path, 30, 100.0);
    let html_path = dir.path().join("data.html");
    std::fs::write(
        &html_path,
        r#"<table><tr><td class="y">5</td><td class="x">6</td></tr>
<tr><td class="y">7</td><td class="x">8</td></tr></table>"#,
    )
    .unwrap();

    let config = SimConfig {
        num_agents: 12,
        num_iterations: 25,
        neighbourhood_radius: 5.0,
        store_size: 0.0,
        x_limit: Some(20),
        y_limit: Some(20),
        environment_path: grid_path.clone(),
        start_positions: Some(html_path.display().to_string()),
        ..SimConfig::default()
    };
    let mut controller = Controller::new(config, Box::new(FileLoader)).unwrap();
    let initial = controller.model().environment().total();
    assert_eq!(initial, 20.0 * 20.0 * 100.0);

    controller.run_model().unwrap();
    let mut frames = 0;
    while let Some(metrics) = controller.on_frame() {
        frames += 1;
        let conserved = metrics.resource_total + metrics.total_store;
        assert!((conserved - initial).abs() < 1e-6);
    }
    assert_eq!(frames, 25);
    assert_eq!(controller.state(), AnimationState::Finished);

    // Reload with a smaller window; the grid file is read again.
    let form = ParameterForm {
        environment_limit: "10,10".into(),
        ..ParameterForm::from_config(controller.config())
    };
    controller.load_parameters(&form).unwrap();
    assert_eq!(controller.model().environment().x_length(), 10);
    assert_eq!(controller.model().agents.len(), 12);
    assert_eq!(controller.model().environment().total(), 10_000.0);
}

#[test]
fn run_summary_serialises_to_json() {
    let grid = Grid::parse_csv("20,20,20\n20,20,20\n20,20,20\n").unwrap();
    let config = SimConfig {
        num_agents: 3,
        x_limit: None,
        y_limit: None,
        ..SimConfig::default()
    };
    let mut model = Model::new(config, grid, &StartPositions::default()).unwrap();
    let summary = model.run(6, 2);
    let json = serde_json::to_string(&summary).unwrap();
    let back: RunSummary = serde_json::from_str(&json).unwrap();
    assert_eq!(back.ticks_run, 6);
    assert_eq!(back.samples.len(), 3);
    assert_eq!(back.final_stores, summary.final_stores);
}
