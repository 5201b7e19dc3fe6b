use std::{
    env,
    path::{Path, PathBuf},
    process,
    time::Instant,
};

use sph_fluid::{args::RunArgs, config::SAVE_FILE, Grid, ParticleFile, SimConfig};

/// When set, snapshots of each phase of the first step are written to this directory.
const TRACE_DIR_VAR: &str = "SPH_TRACE_DIR";

const LOG_INTERVAL: usize = 100;

fn fail(msg: impl std::fmt::Display, code: i32) -> ! {
    eprintln!("Error: {msg}");
    process::exit(code);
}

fn load_config() -> SimConfig {
    let path = Path::new(SAVE_FILE);
    if !path.exists() {
        return SimConfig::default();
    }

    match SimConfig::load(path) {
        Ok(cfg) => {
            log::info!("Loaded config from {SAVE_FILE}");
            cfg
        }
        Err(e) => {
            log::warn!("Ignoring unreadable config {SAVE_FILE}: {e}");
            SimConfig::default()
        }
    }
}

/// Run the first step phase by phase, saving a snapshot after each.
fn step_traced(grid: &mut Grid, dir: &Path) {
    let mut result = Ok(());
    grid.step_traced(|phase, trace| {
        if result.is_ok() {
            let path = dir.join(format!("{}-base-1.trz", phase.file_stem()));
            result = trace.save(&path);
        }
    });

    if let Err(e) = result {
        fail(&e, e.exit_code());
    }
    log::info!("Wrote step traces to {}", dir.display());
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let run = RunArgs::parse(&args).unwrap_or_else(|e| fail(&e, e.exit_code()));

    let cfg = load_config();
    let file = ParticleFile::load(&run.input).unwrap_or_else(|e| fail(&e, e.exit_code()));

    let mut grid = Grid::new(file, cfg);
    let trace_dir = env::var_os(TRACE_DIR_VAR).map(PathBuf::from);

    let start = Instant::now();
    let mut start_interval = Instant::now();

    for t in 0..run.num_steps {
        match (&trace_dir, t) {
            (Some(dir), 0) => step_traced(&mut grid, dir),
            _ => grid.step(),
        }

        if (t + 1) % LOG_INTERVAL == 0 {
            log::debug!(
                "t: {}, last {} steps: {}ms",
                t + 1,
                LOG_INTERVAL,
                start_interval.elapsed().as_millis()
            );
            start_interval = Instant::now();
        }
    }

    log::info!(
        "Ran {} steps in {}ms",
        run.num_steps,
        start.elapsed().as_millis()
    );

    if let Err(e) = grid.write(&run.output) {
        fail(&e, e.exit_code());
    }
    log::info!("Wrote {}", run.output.display());
}
