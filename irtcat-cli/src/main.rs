mod config;
mod output;
mod parse;
mod prompt;
mod study;

use clap::Parser;
use irtcat_core::{
    estimate_with_trace, replication_seed, select_next, simulate_session, summarize, ItemIndex,
    Response, SessionController, SessionOutcome,
};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{IrtcatConfig, SimulationSettings};
use crate::parse::{parse_answer, parse_response_arg, Answer};
use crate::study::{load_study, LoadedStudy};

pub fn bail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

#[derive(Parser)]
#[command(name = "irtcat", version, about = "Adaptive questionnaires with 2PL ability estimation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Take a study interactively on the terminal
    Run(RunArgs),
    /// Run simulated respondents with known theta through a study
    Simulate(SimulateArgs),
    /// Estimate theta for a given response log and recommend the next item
    Estimate(EstimateArgs),
    /// Create a default config file at ~/.config/irtcat/config.toml
    Init,
}

#[derive(clap::Args)]
struct CommonArgs {
    /// Study file (TOML). Falls back to `study` in the config file.
    #[arg(long)]
    study: Option<PathBuf>,

    /// Path to config file (default: ~/.config/irtcat/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Newton-Raphson iteration cap
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Convergence tolerance on the theta step
    #[arg(long)]
    tolerance: Option<f64>,

    /// Output JSON instead of table
    #[arg(long)]
    json: bool,

    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(clap::Args)]
struct RunArgs {
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(clap::Args)]
struct SimulateArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// True theta to simulate (repeatable)
    #[arg(long = "theta", allow_hyphen_values = true, required = true)]
    thetas: Vec<f64>,

    /// Sessions per true theta. Default: 100.
    #[arg(long)]
    replications: Option<usize>,

    /// Max sessions running at once. Default: 32.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Base seed. Default: random.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(clap::Args)]
struct EstimateArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Observed response as ITEM=CATEGORY (repeatable, in administration order)
    #[arg(long = "response", value_parser = parse_response_arg)]
    responses: Vec<(usize, u8)>,
}

/// Priority: RUST_LOG > --verbose (debug) > info for irtcat, warn for everything else.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn,irtcat=info,irtcat_core=info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Load config file and study, merging CLI args over config values (CLI wins).
fn load(common: &CommonArgs) -> (IrtcatConfig, LoadedStudy) {
    let config_path = common.config.clone().unwrap_or_else(config::config_path);
    let cfg = config::load_config(&config_path);

    let study_path = cfg.study_path(common.study.clone()).unwrap_or_else(|| {
        bail(format!("No study specified. Pass --study or set it in {}", config_path.display()));
    });

    let overrides = cfg.estimator.overrides(common.max_iterations, common.tolerance);
    let loaded = load_study(&study_path, overrides);
    info!(
        study = %loaded.name,
        items = loaded.study.bank().len(),
        positions = loaded.study.design().total_positions(),
        "study loaded"
    );
    (cfg, loaded)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            init_tracing(args.common.verbose);
            run_interactive(args);
        }
        Commands::Simulate(args) => {
            init_tracing(args.common.verbose);
            run_simulation(args).await;
        }
        Commands::Estimate(args) => {
            init_tracing(args.common.verbose);
            run_estimate(args);
        }
        Commands::Init => {
            let path = config::create_default_config();
            println!("Created config at {}", path.display());
            println!("Edit it to set your default study, estimator settings, etc.");
        }
    }
}

fn run_interactive(args: RunArgs) {
    let (_, loaded) = load(&args.common);

    let stdin = io::stdin();
    if !stdin.is_terminal() {
        warn!("stdin is not a terminal, reading answers line by line");
    }
    let mut lines = stdin.lock().lines();
    let total = loaded.study.design().total_positions();
    let max_category = loaded.max_category();

    let mut session = SessionController::new(Arc::clone(&loaded.study));

    loop {
        let next = match session.next_item() {
            Ok(Some(next)) => next,
            Ok(None) => break,
            Err(e) => bail(e),
        };
        let prompt = prompt::build_prompt(&next, total, loaded.text(next.item), &loaded.labels, max_category);

        let category = loop {
            eprint!("\n{prompt}");
            let _ = io::stderr().flush();

            let line = match lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => bail(format!("Failed to read from stdin: {e}")),
                None => bail("Input ended before the session was complete"),
            };
            match parse_answer(&line, max_category, &loaded.labels) {
                Ok(Answer::Category(c)) => break c,
                Ok(Answer::Quit) => {
                    info!(administered = session.state().len(), "session abandoned");
                    return;
                }
                Err(msg) => eprintln!("{msg}"),
            }
        };

        if let Err(e) = session.record_response(next.item, category) {
            bail(e);
        }
        if let Some(est) = session.state().last_estimate() {
            debug!(theta = est.theta, se = est.standard_error, "interim estimate");
        }
    }

    let outcome = session.finish().unwrap_or_else(|e| bail(e));
    if args.common.json {
        output::print_session_json(&loaded, &outcome);
    } else {
        eprintln!();
        output::print_session_table(&loaded, &outcome);
    }
}

async fn run_simulation(args: SimulateArgs) {
    let (cfg, loaded) = load(&args.common);

    let SimulationSettings { replications, concurrency, seed } = cfg
        .simulation
        .resolve(args.replications, args.concurrency, args.seed)
        .unwrap_or_else(|e| bail(e));

    info!(
        thetas = args.thetas.len(),
        replications,
        concurrency,
        seed,
        "starting simulation"
    );

    // Sessions share the study read-only; each task owns its controller.
    let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency));
    let mut handles = Vec::with_capacity(args.thetas.len() * replications);

    for (theta_idx, &true_theta) in args.thetas.iter().enumerate() {
        for rep in 0..replications {
            let sem = semaphore.clone();
            let study = Arc::clone(&loaded.study);
            let task_seed = replication_seed(seed, theta_idx, rep);

            let handle = tokio::spawn(async move {
                let _permit = sem.acquire_owned().await.ok();
                (theta_idx, simulate_session(study, true_theta, task_seed))
            });
            handles.push(handle);
        }
    }

    let mut per_theta: Vec<Vec<SessionOutcome>> = vec![Vec::with_capacity(replications); args.thetas.len()];
    let mut failed: usize = 0;

    for handle in handles {
        match handle.await {
            Ok((theta_idx, Ok(outcome))) => per_theta[theta_idx].push(outcome),
            Ok((theta_idx, Err(e))) => {
                failed += 1;
                warn!(true_theta = args.thetas[theta_idx], error = %e, "simulated session failed");
            }
            Err(e) => {
                failed += 1;
                warn!(error = %e, "simulation task panicked");
            }
        }
    }

    let summaries: Vec<_> = args
        .thetas
        .iter()
        .zip(&per_theta)
        .filter_map(|(&theta, outcomes)| summarize(theta, outcomes))
        .collect();

    if summaries.is_empty() {
        bail("All simulated sessions failed. No results to report.");
    }

    if args.common.json {
        output::print_simulation_json(&loaded.name, &summaries, failed);
    } else {
        output::print_simulation_table(&summaries, failed);
    }
}

fn run_estimate(args: EstimateArgs) {
    let (_, loaded) = load(&args.common);
    let bank = loaded.study.bank();

    let responses: Vec<Response> = args
        .responses
        .iter()
        .map(|&(item, category)| Response::new(item, category))
        .collect();

    let (estimate, trace) = estimate_with_trace(bank, &responses, &loaded.study.design().estimator)
        .unwrap_or_else(|e| bail(e));

    let candidates: Vec<ItemIndex> = bank
        .adaptive_pool()
        .filter(|&i| !responses.iter().any(|r| r.item_index == i))
        .collect();
    let next_item = select_next(bank, &estimate, &candidates);

    if args.common.json {
        output::print_estimate_json(&estimate, &trace, next_item);
    } else {
        output::print_estimate_table(&estimate, &trace, next_item);
    }
}
