//! Flow Transport CLI - Run FTLE, LIC and derived-field jobs from JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use flow_transport::{ComputeError, JobConfig, pipeline};

const COMMANDS: [&str; 6] = ["ftle", "lic", "magnitude", "vorticity", "featureflow", "all"];

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && args[1] == "--example" {
        print_example_config();
        return;
    }

    if args.len() < 3 || !COMMANDS.contains(&args[2].as_str()) {
        eprintln!("Usage: {} <config.json> <command>", args[0]);
        eprintln!();
        eprintln!("Compute transport fields for a velocity time series.");
        eprintln!();
        eprintln!("Commands:");
        eprintln!("  ftle         FTLE field for every configured start time");
        eprintln!("  lic          Line integral convolution of selected samples");
        eprintln!("  magnitude    Velocity magnitude of selected samples");
        eprintln!("  vorticity    Vorticity magnitude of selected samples");
        eprintln!("  featureflow  Velocity of moving critical points at selected samples");
        eprintln!("  all          All of the above");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    let config_path = PathBuf::from(&args[1]);
    let command = args[2].as_str();

    let config = load_config(&config_path).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    println!("Flow Transport");
    println!("==============");
    println!("Data set: {}", config.dataset.base_path.display());
    println!(
        "Series: {} samples, dt={}, t0={}",
        config.dataset.time_series.num_time_steps,
        config.dataset.time_series.temporal_spacing,
        config.dataset.time_series.start_time
    );
    println!("Command: {}", command);
    println!();

    let start = Instant::now();
    let written = run(&config, command).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    for path in &written {
        println!("  {}", path.display());
    }
    println!();
    println!(
        "Wrote {} files in {:.2}s",
        written.len(),
        start.elapsed().as_secs_f32()
    );
}

fn load_config(path: &Path) -> Result<JobConfig, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("reading config file {}: {}", path.display(), e))?;
    let config: JobConfig =
        serde_json::from_str(&text).map_err(|e| format!("parsing config: {}", e))?;
    config
        .validate()
        .map_err(|e| format!("invalid config: {}", e))?;
    Ok(config)
}

fn run(config: &JobConfig, command: &str) -> Result<Vec<PathBuf>, ComputeError> {
    let mut written = Vec::new();
    if matches!(command, "ftle" | "all") {
        written.extend(pipeline::run_ftle(config)?);
    }
    if matches!(command, "lic" | "all") {
        written.extend(pipeline::run_lic(config)?);
    }
    if matches!(command, "magnitude" | "all") {
        written.extend(pipeline::run_magnitude(config)?);
    }
    if matches!(command, "vorticity" | "all") {
        written.extend(pipeline::run_vorticity(config)?);
    }
    if matches!(command, "featureflow" | "all") {
        written.extend(pipeline::run_feature_flow(config)?);
    }
    Ok(written)
}

fn print_example_config() {
    let config = JobConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing example config: {}", e),
    }
}
