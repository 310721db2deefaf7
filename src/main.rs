// Surgical Flow Simulator - Main Entry Point
//
// You can run it via Cargo:
//
// ```console
// $ cargo build --release
// $ ./target/release/surgical-flow-sim
// ```
//
// Or with custom configuration:
//
// ```console
// $ ./target/release/surgical-flow-sim --num-recovery-rooms 1 --num-replications 50 --output reps.csv --verbose
// ```

use anyhow::{Context, Result};
use clap::Parser;
use std::process;
use std::time::Instant;
use tracing::{error, info};

use surgical_flow_sim::simulation::{
    write_comparison_json, write_patient_table, write_replication_table, write_summary_json,
    AggregateSummary, LoggingConfig, PairedComparison, StudyResult, StudyRunner,
};
use surgical_flow_sim::types::config::CliArgs;
use surgical_flow_sim::types::{ConfigOverride, OutputFormat, SimulationConfig};

/// Metrics shown in the console summary
const HEADLINE_METRICS: [&str; 6] = [
    "mean_throughput_time",
    "blocking_probability",
    "theatre_blocked_fraction",
    "all_recovery_busy_probability",
    "mean_theatre_utilization",
    "num_patients_completed",
];

fn main() {
    // Parse CLI arguments first to check for special flags
    let args = CliArgs::parse();

    // Handle special CLI flags that don't require full initialization
    if args.print_config {
        match SimulationConfig::default().print_json() {
            Ok(json) => {
                println!("{}", json);
                return;
            }
            Err(e) => {
                eprintln!("Failed to serialize default configuration: {}", e);
                process::exit(1);
            }
        }
    }

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = match LoggingConfig::for_cli(args.verbose, args.debug).init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    info!("Starting Surgical Flow Simulator");

    if let Err(e) = run(args) {
        error!("Simulation failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }

    info!("Surgical Flow Simulator completed successfully");
}

fn run(args: CliArgs) -> Result<()> {
    // Load configuration from CLI arguments and optional config file
    let config =
        SimulationConfig::from_cli_args(args.clone()).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;
    let format: OutputFormat = args
        .output_format
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))
        .context("Invalid output format")?;

    info!("Configuration loaded and validated successfully");

    // Handle dry run mode
    if args.dry_run {
        eprintln!("Configuration validation successful!");
        eprintln!("Dry run mode - simulation will not be executed.");
        print_configuration_summary(&config);
        return Ok(());
    }

    print_startup_banner(&config);
    let start_time = Instant::now();
    let runner = StudyRunner::new().with_outputs(args.patients_output.is_some());

    match args.compare_recovery_rooms {
        Some(rooms) => {
            let variant = config
                .with_override(ConfigOverride::RecoveryRooms(rooms))
                .context("Invalid comparison variant")?;
            let comparison = runner
                .run_paired_comparison(&config, &variant, config.num_replications)
                .context("Paired comparison failed")?;

            write_study_outputs(&args, &comparison.first, format)?;
            if let Some(path) = &args.summary_output {
                write_comparison_json(&comparison, path)
                    .with_context(|| format!("Failed to write comparison summary to {}", path))?;
                eprintln!("Comparison summary written to: {}", path);
            }
            print_comparison(&comparison);
        }
        None => {
            let result = runner.run_study(&config).context("Study failed")?;

            write_study_outputs(&args, &result, format)?;
            if let Some(path) = &args.summary_output {
                write_summary_json(&result, path)
                    .with_context(|| format!("Failed to write summary to {}", path))?;
                eprintln!("Summary written to: {}", path);
            }
            print_study(&result);
        }
    }

    eprintln!("Runtime: {:.2} seconds", start_time.elapsed().as_secs_f64());
    Ok(())
}

/// Write the per-replication and patient tables if requested
fn write_study_outputs(args: &CliArgs, result: &StudyResult, format: OutputFormat) -> Result<()> {
    if let Some(path) = &args.output {
        write_replication_table(&result.records, path, format)
            .with_context(|| format!("Failed to write replication table to {}", path))?;
        eprintln!("Replication table written to: {}", path);
    }

    if let Some(path) = &args.patients_output {
        write_patient_table(&result.outputs(), path)
            .with_context(|| format!("Failed to write patient table to {}", path))?;
        eprintln!("Patient table written to: {}", path);
    }

    Ok(())
}

/// Print startup banner and configuration summary
fn print_startup_banner(config: &SimulationConfig) {
    eprintln!("Surgical Flow Simulator");
    eprintln!("=======================");
    eprintln!("Patient flow through preparation, theatre and recovery");
    eprintln!();

    print_configuration_summary(config);
}

/// Print configuration summary
fn print_configuration_summary(config: &SimulationConfig) {
    eprintln!("Configuration ({}):", config.scenario_name());
    eprintln!(
        "  Capacities: {} prep / {} theatre / {} recovery",
        config.num_prep_rooms, config.num_operating_theatres, config.num_recovery_rooms
    );
    eprintln!("  Mean Interarrival: {:.1} min", config.mean_interarrival);
    eprintln!(
        "  Mean Service: prep {:.1} / operation {:.1} / recovery {:.1} min",
        config.mean_prep_time, config.mean_operation_time, config.mean_recovery_time
    );
    eprintln!(
        "  Horizon: {:.0} min (warmup {:.0} min)",
        config.sim_duration, config.warmup_period
    );
    eprintln!("  Replications: {}", config.num_replications);
    eprintln!("  Random Seed: {}", config.random_seed);
    eprintln!("  Monitoring Interval: {:.1} min", config.monitoring_interval);
    eprintln!();
}

fn print_summary_table(summary: &AggregateSummary) {
    eprintln!("  {:<32} {:>10} {:>22}", "metric", "mean", "95% CI");
    for name in HEADLINE_METRICS {
        match summary.get(name) {
            Some(s) => eprintln!(
                "  {:<32} {:>10.4} [{:>9.4}, {:>9.4}]",
                name, s.mean, s.ci_lower, s.ci_upper
            ),
            None => eprintln!("  {:<32} {:>10}", name, "n/a"),
        }
    }
}

fn print_study(result: &StudyResult) {
    eprintln!("\nResults for {}:", result.config.scenario_name());
    eprintln!("===================");
    print_summary_table(&result.summary);
    if result.degenerate_replications > 0 {
        eprintln!(
            "  {} replication(s) had no completed patients after warmup",
            result.degenerate_replications
        );
    }
    eprintln!();
}

fn print_comparison(comparison: &PairedComparison) {
    print_study(&comparison.first);
    print_study(&comparison.second);

    eprintln!(
        "Paired differences ({} - {}, {} pairs):",
        comparison.first.config.scenario_name(),
        comparison.second.config.scenario_name(),
        comparison.differences.len()
    );
    print_summary_table(&comparison.difference_summary);

    let significant = comparison.significant_metrics();
    if significant.is_empty() {
        eprintln!("  No metric differs significantly at the 95% level");
    } else {
        eprintln!("  Significant at 95%:");
        for (name, summary) in significant {
            eprintln!("    {}: {:+.4}", name, summary.mean);
        }
    }
    eprintln!();
}
