use anyhow::Context;
use clap::{value_parser, Arg, ArgMatches, Command};
use evo_autonomy::dry_run::DRY_RUN_KEY;
use evo_autonomy::{load_feedback, AutonomousPipeline, DryRunModel, StandardWorkflow};
use evo_core::{CredentialRef, CrewConfig, ExecutionMode};
use evo_engine::{ProgressObserver, TaskStatus};
use indexmap::IndexMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("evo")
        .version(evo_autonomy::VERSION)
        .about("Project Evolution - feedback-driven sprint planning with agent crews")
        .subcommand(
            Command::new("run")
                .about("Run the improvement cycle over a feedback file")
                .arg(
                    Arg::new("mode")
                        .long("mode")
                        .value_parser(value_parser!(ExecutionMode))
                        .help("sequential, concurrent (or parallel) or autonomous"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                )
                .arg(
                    Arg::new("feedback")
                        .long("feedback")
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON array of feedback items"),
                )
                .arg(
                    Arg::new("output-dir")
                        .long("output-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory for result files"),
                )
                .arg(
                    Arg::new("max-iterations")
                        .long("max-iterations")
                        .value_parser(value_parser!(u32))
                        .help("Cap on re-planning passes per loop in autonomous mode"),
                )
                .arg(
                    Arg::new("priority-focus")
                        .long("priority-focus")
                        .help("Feature area the proposals should favour"),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Print the effective configuration as TOML")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                ),
        )
}

fn init_tracing(config: &CrewConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.execution.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(args: &ArgMatches) -> anyhow::Result<CrewConfig> {
    let path = args.get_one::<PathBuf>("config");
    CrewConfig::load(path.map(PathBuf::as_path)).context("loading configuration")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("run", args)) => run(args).await,
        Some(("config", args)) => {
            let config = load_config(args)?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        _ => {
            cli().print_help()?;
            Ok(())
        }
    }
}

async fn run(args: &ArgMatches) -> anyhow::Result<()> {
    let mut config = load_config(args)?;
    if let Some(dir) = args.get_one::<PathBuf>("output-dir") {
        config = config.with_output_dir(dir);
    }
    if let Some(max) = args.get_one::<u32>("max-iterations") {
        config = config.with_max_iterations(*max);
    }
    init_tracing(&config);

    let mode = args
        .get_one::<ExecutionMode>("mode")
        .copied()
        .unwrap_or(config.execution.default_mode);
    let feedback = args
        .get_one::<PathBuf>("feedback")
        .cloned()
        .unwrap_or_else(|| config.data.feedback_file.clone());

    println!("Running {mode} workflow");
    println!("Feedback: {}", feedback.display());
    println!("Output: {}", config.data.output_dir.display());
    println!();

    if mode == ExecutionMode::Autonomous {
        let report = AutonomousPipeline::new(&config)
            .run_file(&feedback)
            .context("autonomous run failed")?;

        let metrics = &report.stakeholder_update.aggregated_report.metrics;
        println!("Feedback items analyzed: {}", metrics.feedback_items_analyzed);
        println!("Feature proposals: {}", metrics.feature_proposals_generated);
        println!("Average feasibility: {:.1}%", metrics.average_feasibility_score);
        println!("Capacity utilization: {:.1}%", metrics.sprint_capacity_utilization);
        println!("Iterations: {}", report.iteration_metrics.total_iterations);
        println!("Completed in {:.2} seconds", report.elapsed_secs);
        return Ok(());
    }

    let items = load_feedback(&feedback)?;
    let mut workflow = StandardWorkflow::from_items(&items)
        .with_credential(CredentialRef::Inline(DRY_RUN_KEY.to_string()));
    if let Some(focus) = args.get_one::<String>("priority-focus") {
        workflow = workflow.with_priority_focus(focus);
    }

    let observer: Arc<dyn ProgressObserver> =
        Arc::new(|id: &str, status: TaskStatus, index: usize, total: usize| {
            println!("[{}/{total}] {id}: {status}", index + 1);
        });
    let mut crew = workflow
        .build(&config, Arc::new(DryRunModel), mode)?
        .with_progress(observer);
    let report = crew.run(IndexMap::new()).await?;

    println!();
    for (id, output) in &report.results {
        println!("== {id}");
        println!("{output}");
    }
    let failures = report.errors().count();
    println!();
    println!(
        "{} tasks, {failures} failed, {:.2} seconds",
        report.results.len(),
        report.elapsed_secs
    );
    Ok(())
}
