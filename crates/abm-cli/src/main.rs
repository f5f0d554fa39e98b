use abm_core::config::SimConfig;
use abm_core::controller::{AnimationState, Controller, FileLoader, ScenarioLoader};
use abm_core::environment::{Grid, GridError};
use abm_core::experiment::run_replicates;
use abm_core::model::{Model, RunSummary};
use abm_core::params::{parse_limit, ParameterForm};
use abm_core::start_positions::{StartPositions, StartPositionsError};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "abm", about = "Agents foraging and sharing on a resource grid")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one model headless and report a summary.
    Run {
        #[command(flatten)]
        model: ModelArgs,
        #[arg(long, default_value_t = 10)]
        sample_every: usize,
        /// Write the run summary as JSON here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Write the final model state as JSON here.
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Run independent replicates with consecutive seeds.
    Replicates {
        #[command(flatten)]
        model: ModelArgs,
        #[arg(long, default_value_t = 4)]
        count: u64,
        #[arg(long, default_value_t = 10)]
        sample_every: usize,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Drive the model from stdin commands on a frame timer.
    Interactive {
        #[command(flatten)]
        model: ModelArgs,
    },
}

#[derive(Args)]
struct ModelArgs {
    /// JSON parameter file; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    agents: Option<usize>,
    #[arg(long)]
    iterations: Option<usize>,
    #[arg(long)]
    radius: Option<f64>,
    #[arg(long)]
    store_size: Option<f64>,
    #[arg(long)]
    bite_size: Option<f64>,
    /// Environment limit as X,Y; `-` leaves an axis unlimited.
    #[arg(long)]
    limit: Option<String>,
    #[arg(long)]
    environment: Option<PathBuf>,
    /// URL or path of an HTML page with `x`/`y` classed coordinates.
    #[arg(long)]
    start_positions: Option<String>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    frame_interval_ms: Option<u64>,
}

impl ModelArgs {
    fn resolve(&self) -> Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                SimConfig::from_json(&text)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => SimConfig::default(),
        };
        if let Some(v) = self.agents {
            config.num_agents = v;
        }
        if let Some(v) = self.iterations {
            config.num_iterations = v;
        }
        if let Some(v) = self.radius {
            config.neighbourhood_radius = v;
        }
        if let Some(v) = self.store_size {
            config.store_size = v;
        }
        if let Some(v) = self.bite_size {
            config.bite_size = v;
        }
        if let Some(text) = &self.limit {
            let (x_limit, y_limit) = parse_limit(text)?;
            config.x_limit = x_limit;
            config.y_limit = y_limit;
        }
        if let Some(v) = &self.environment {
            config.environment_path = v.clone();
        }
        if let Some(v) = &self.start_positions {
            config.start_positions = Some(v.clone());
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        if let Some(v) = self.frame_interval_ms {
            config.frame_interval_ms = v;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Filesystem loader that also fetches `http(s)://` start-position pages.
struct NetLoader;

impl ScenarioLoader for NetLoader {
    fn load_grid(&self, path: &Path) -> Result<Grid, GridError> {
        FileLoader.load_grid(path)
    }

    fn load_start_positions(&self, source: &str) -> Result<StartPositions, StartPositionsError> {
        if !(source.starts_with("http://") || source.starts_with("https://")) {
            return FileLoader.load_start_positions(source);
        }
        info!(url = %source, "Fetching start positions from URL");
        let fetch_err = |e: reqwest::Error| StartPositionsError::Fetch {
            url: source.to_string(),
            message: e.to_string(),
        };
        let html = reqwest::blocking::get(source)
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(fetch_err)?;
        StartPositions::from_html(&html)
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            model,
            sample_every,
            output,
            snapshot,
        } => run(&model.resolve()?, sample_every, output, snapshot),
        Command::Replicates {
            model,
            count,
            sample_every,
            output,
        } => replicates(&model.resolve()?, count, sample_every, output),
        Command::Interactive { model } => interactive(model.resolve()?),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn load_inputs(config: &SimConfig) -> Result<(Grid, StartPositions)> {
    let start_positions = match &config.start_positions {
        Some(source) => NetLoader.load_start_positions(source)?,
        None => StartPositions::default(),
    };
    let grid = NetLoader.load_grid(&config.environment_path)?;
    Ok((grid, start_positions))
}

fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run(
    config: &SimConfig,
    sample_every: usize,
    output: Option<PathBuf>,
    snapshot: Option<PathBuf>,
) -> Result<()> {
    info!("Running model.\n{config}");
    let (grid, start_positions) = load_inputs(config)?;
    let mut model = Model::new(config.clone(), grid, &start_positions)?;
    let summary = model.try_run(config.num_iterations, sample_every)?;
    log_summary(&summary);
    write_json(&summary, output.as_deref())?;
    if let Some(path) = snapshot {
        write_json(&model.snapshot(), Some(&path))?;
    }
    Ok(())
}

fn replicates(
    config: &SimConfig,
    count: u64,
    sample_every: usize,
    output: Option<PathBuf>,
) -> Result<()> {
    let (grid, start_positions) = load_inputs(config)?;
    let seeds: Vec<u64> = (0..count).map(|i| config.seed.wrapping_add(i)).collect();
    info!(count, first_seed = config.seed, "Running replicates");
    let results = run_replicates(config, &grid, &start_positions, &seeds, sample_every)?;
    for rep in &results {
        info!(seed = rep.seed, "Replicate finished");
        log_summary(&rep.summary);
    }
    write_json(&results, output.as_deref())
}

fn log_summary(summary: &RunSummary) {
    if let Some(last) = summary.samples.last() {
        info!(
            ticks = summary.ticks_run,
            completed = summary.completed,
            mean_store = last.mean_store,
            full_agents = last.full_agents,
            resource_total = last.resource_total,
            "Run finished"
        );
    } else {
        warn!("Run finished without any ticks");
    }
}

fn interactive(config: SimConfig) -> Result<()> {
    let interval = Duration::from_millis(config.frame_interval_ms);
    let mut controller = Controller::new(config, Box::new(NetLoader))?;
    let mut form = ParameterForm::from_config(controller.config());
    print_help();

    let (tx, rx) = mpsc::channel::<String>();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    loop {
        match rx.recv_timeout(interval) {
            Ok(line) => {
                if !handle_command(&mut controller, &mut form, line.trim()) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if let Some(m) = controller.on_frame() {
                    println!(
                        "tick {:>5}  mean store {:>8.2}  full {:>4}  resource {:>12.1}",
                        m.tick, m.mean_store, m.full_agents, m.resource_total
                    );
                    if controller.state() == AnimationState::Finished {
                        println!("finished");
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    info!("Shutting down.");
    Ok(())
}

fn print_help() {
    println!("commands: run | stop | start | reset | set FIELD VALUE | load | params | status | quit");
    println!("fields: {}", ParameterForm::FIELDS.join(", "));
}

/// Returns false when the session should end. Errors are reported and the
/// session continues with the previous model.
fn handle_command(controller: &mut Controller, form: &mut ParameterForm, line: &str) -> bool {
    let mut parts = line.splitn(3, char::is_whitespace);
    let outcome: Result<()> = match parts.next().unwrap_or("") {
        "" => Ok(()),
        "quit" | "exit" => return false,
        "help" => {
            print_help();
            Ok(())
        }
        "run" => controller.run_model().map_err(anyhow::Error::from),
        "stop" => {
            controller.stop_animation();
            Ok(())
        }
        "start" => {
            controller.start_animation();
            Ok(())
        }
        "reset" => controller.reset().map_err(anyhow::Error::from),
        "set" => {
            let field = parts.next().unwrap_or("");
            let value = parts.next().unwrap_or("").trim();
            form.set(field, value).map_err(anyhow::Error::from)
        }
        "load" => match controller.load_parameters(form) {
            Ok(()) => {
                *form = ParameterForm::from_config(controller.config());
                Ok(())
            }
            Err(e) => Err(e.into()),
        },
        "params" => {
            println!("{form:#?}");
            Ok(())
        }
        "status" => {
            let m = controller.model().collect_tick_metrics();
            println!(
                "{:?}, tick {}, {} frames left, {} agents, mean store {:.2}",
                controller.state(),
                m.tick,
                controller.frames_remaining(),
                m.agent_count,
                m.mean_store
            );
            println!("{}", controller.config());
            Ok(())
        }
        other => Err(anyhow::anyhow!("unknown command {other:?}, try `help`")),
    };
    if let Err(e) = outcome {
        eprintln!("Error: {e:#}");
    }
    true
}
