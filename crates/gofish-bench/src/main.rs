use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::Level;

use gofish_bench::config::{BenchmarkConfig, FeedConfig, ResolvedOutputs};
use gofish_bench::logging::{init_logging, init_stderr};
use gofish_bench::protocol::serve;
use gofish_bench::tournament::TournamentRunner;

/// Tournament harness and control protocol for Go Fish policies.
#[derive(Debug, Parser)]
#[command(
    name = "gofish-bench",
    author,
    version,
    about = "Deterministic two-player Go Fish tournament harness"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a head-to-head tournament described by a YAML config.
    Run(RunArgs),
    /// Speak the line-oriented JSON protocol on stdin/stdout.
    Serve,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/bench.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of games to play.
    #[arg(long, value_name = "GAMES")]
    games: Option<usize>,

    /// Override the base seed; game i uses seed + i.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Override fair seating (alternate which policy moves first).
    #[arg(long, value_name = "BOOL")]
    fair: Option<bool>,

    /// Override the per-game ply cap.
    #[arg(long, value_name = "PLIES")]
    max_plies: Option<usize>,

    /// Read moves for POLICY from FILE (strict).
    #[arg(long, value_names = ["POLICY", "FILE"], num_args = 2)]
    feed: Option<Vec<String>>,

    /// Exit after validating the configuration (no tournament is run).
    #[arg(long)]
    validate_only: bool,

    /// Log per-component score breakdowns for every decision (forces GOFISH_DECISION_DETAILS=1).
    #[arg(long)]
    log_decision_details: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args),
        Command::Serve => {
            init_stderr(Level::WARN);
            let stdin = io::stdin();
            let stdout = io::stdout();
            serve(stdin.lock(), BufWriter::new(stdout.lock())).context("serving control protocol")
        }
    }
}

fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = BenchmarkConfig::from_path(&args.config)?;

    if let Some(run_id) = args.run_id {
        config.run_id = run_id;
    }

    if let Some(games) = args.games {
        config.games.count = games;
    }

    if let Some(seed) = args.seed {
        config.games.seed = seed;
    }

    if let Some(fair) = args.fair {
        config.games.fair = fair;
    }

    if let Some(max_plies) = args.max_plies {
        config.games.max_plies = max_plies;
    }

    if let Some(feed) = args.feed {
        if let [policy, path] = feed.as_slice() {
            config.feed = Some(FeedConfig {
                path: PathBuf::from(path),
                policy: policy.clone(),
                strict: true,
            });
        }
    }

    if args.log_decision_details {
        config.logging.decision_details = true;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let games = config.games.count;

    println!(
        "Loaded configuration '{run_id}': {} vs {} over {games} game{} ({} seating)",
        config.policy_a().name,
        config.policy_b().name,
        if games == 1 { "" } else { "s" },
        if config.games.fair { "fair" } else { "fixed" }
    );

    let _logging_guard = init_logging(&config.logging, &outputs, &run_id)?;
    let runner = TournamentRunner::new(config, outputs)?;

    if args.validate_only {
        println!("Validation-only mode: tournament execution skipped.");
        return Ok(());
    }

    let summary = runner.run()?;
    let stats = &summary.stats;
    println!(
        "Tournament complete for '{run_id}': {} games → {} rows at {}",
        summary.games_played,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    println!(
        "  {} {:.2}% / {} {:.2}% / ties {:.2}% ({} aborted, sign test p = {:.4})",
        stats.policy_a,
        stats.policy_a_win_rate,
        stats.policy_b,
        stats.policy_b_win_rate,
        stats.tie_rate,
        stats.aborted,
        stats.sign_test_p
    );
    println!("Report: {}", summary.report_path.display());
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(plot_path) = summary.plot_path.as_ref() {
        println!("Win-rate plot: {}", plot_path.display());
    }
    if let Some(telemetry_path) = summary.telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }

    Ok(())
}
