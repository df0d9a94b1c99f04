mod chain;
mod feed;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::analytics::{AnalyticsCollector, AnalyticsError, TournamentStats};
use crate::config::{BenchmarkConfig, DEFAULT_MAX_PLIES, PolicyConfig, ResolvedOutputs};
use crate::report::{ReportError, TournamentReport};
use gofish_bot::{Policy, PolicyContext, PolicyDescriptor, PolicyError, PolicyRegistry};
use gofish_core::game::event::Winner;
use gofish_core::game::state::{GameOptions, GameState};
use gofish_core::model::player::Seat;
use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

pub use chain::{
    ChainPosition, Decided, DecisionChain, DecisionSource, FallbackCounts, FallbackTrigger,
};
pub use feed::{FeedEntry, FeedError, MoveFeed};

/// One of the two compared policies, independent of seating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    A,
    B,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::A, Side::B];

    pub const fn index(self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }

    pub const fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Side::A => "A",
            Side::B => "B",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    Win(Side),
    Tie,
    Aborted,
}

/// Everything needed to play a series between two policies.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPlan {
    pub run_id: String,
    pub games: usize,
    pub seed: u64,
    pub fair: bool,
    pub max_plies: usize,
    pub policy_a: PolicyConfig,
    pub policy_b: PolicyConfig,
}

impl BatchPlan {
    pub fn new(policy_a: PolicyConfig, policy_b: PolicyConfig, games: usize, seed: u64) -> Self {
        Self {
            run_id: String::new(),
            games,
            seed,
            fair: false,
            max_plies: DEFAULT_MAX_PLIES,
            policy_a,
            policy_b,
        }
    }

    pub fn from_config(config: &BenchmarkConfig) -> Self {
        Self {
            run_id: config.run_id.clone(),
            games: config.games.count,
            seed: config.games.seed,
            fair: config.games.fair,
            max_plies: config.games.max_plies,
            policy_a: config.policy_a().clone(),
            policy_b: config.policy_b().clone(),
        }
    }

    pub fn fair(mut self, fair: bool) -> Self {
        self.fair = fair;
        self
    }

    pub fn game_seed(&self, index: usize) -> u64 {
        self.seed.wrapping_add(index as u64)
    }

    /// Side sitting at each seat; fair mode puts B first on odd games.
    pub fn seating(&self, index: usize) -> [Side; 2] {
        if self.fair && index % 2 == 1 {
            [Side::B, Side::A]
        } else {
            [Side::A, Side::B]
        }
    }

    pub fn config(&self, side: Side) -> &PolicyConfig {
        match side {
            Side::A => &self.policy_a,
            Side::B => &self.policy_b,
        }
    }
}

#[derive(Default)]
struct DecisionMetrics {
    total: Duration,
    decisions: u32,
}

impl DecisionMetrics {
    fn record(&mut self, duration: Duration) {
        self.total += duration;
        self.decisions += 1;
    }

    fn finalize(&self) -> DecisionSummary {
        let avg_ms = if self.decisions == 0 {
            0.0
        } else {
            self.total.as_secs_f64() * 1000.0 / f64::from(self.decisions)
        };

        DecisionSummary {
            decisions: self.decisions,
            avg_ms_per_decision: avg_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DecisionSummary {
    pub decisions: u32,
    pub avg_ms_per_decision: f64,
}

/// Outcome of one game, attributed to sides rather than seats.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameRecord {
    pub game_index: usize,
    pub seed: u64,
    pub first: Side,
    pub result: GameResult,
    pub plies: usize,
    pub books_a: usize,
    pub books_b: usize,
    pub fallbacks_a: FallbackCounts,
    pub fallbacks_b: FallbackCounts,
    pub decisions_a: DecisionSummary,
    pub decisions_b: DecisionSummary,
}

impl GameRecord {
    pub fn aborted(&self) -> bool {
        self.result == GameResult::Aborted
    }
}

struct Contestant {
    name: String,
    policy: Box<dyn Policy>,
    chain: DecisionChain,
    fallbacks: FallbackCounts,
    metrics: DecisionMetrics,
}

impl Contestant {
    fn build(config: &PolicyConfig, registry: &PolicyRegistry) -> Result<Self, RunnerError> {
        Ok(Self {
            name: config.name.clone(),
            policy: registry.build(config.kind(), &config.params)?,
            chain: DecisionChain::standard(false),
            fallbacks: FallbackCounts::default(),
            metrics: DecisionMetrics::default(),
        })
    }

    fn begin_game(&mut self, seed: u64) {
        self.policy.reset(seed);
        self.fallbacks = FallbackCounts::default();
        self.metrics = DecisionMetrics::default();
    }
}

struct FeedBinding {
    side: Side,
    feed: MoveFeed,
}

/// Two policies playing a seeded series.
pub struct HeadToHead {
    plan: BatchPlan,
    contestants: [Contestant; 2],
    feed: Option<FeedBinding>,
}

impl HeadToHead {
    pub fn new(plan: BatchPlan, registry: &PolicyRegistry) -> Result<Self, RunnerError> {
        let contestants = [
            Contestant::build(&plan.policy_a, registry)?,
            Contestant::build(&plan.policy_b, registry)?,
        ];
        Ok(Self {
            plan,
            contestants,
            feed: None,
        })
    }

    /// Route `side`'s plies through `feed` before its policy.
    pub fn with_feed(mut self, side: Side, feed: MoveFeed) -> Self {
        self.contestants[side.index()].chain = DecisionChain::standard(true);
        self.feed = Some(FeedBinding { side, feed });
        self
    }

    pub fn plan(&self) -> &BatchPlan {
        &self.plan
    }

    pub fn descriptor(&self, side: Side) -> PolicyDescriptor {
        self.contestants[side.index()].policy.descriptor()
    }

    /// Plays every game in order, handing each record to `sink`.
    pub fn play_all(
        &mut self,
        mut sink: impl FnMut(&GameRecord) -> Result<(), RunnerError>,
    ) -> Result<(), RunnerError> {
        for index in 0..self.plan.games {
            let record = self.play_game(index)?;
            sink(&record)?;
        }
        if let Some(binding) = self.feed.as_ref() {
            binding.feed.finish()?;
        }
        Ok(())
    }

    pub fn play_game(&mut self, index: usize) -> Result<GameRecord, RunnerError> {
        let seed = self.plan.game_seed(index);
        let seating = self.plan.seating(index);

        // Reset seeds follow the seat, so a game depends only on seed and seating.
        let mut seeds = StdRng::seed_from_u64(seed);
        for side in seating {
            self.contestants[side.index()].begin_game(seeds.next_u64());
        }

        let names = seating.map(|side| self.contestants[side.index()].name.clone());
        let options = GameOptions {
            seed,
            names,
            ..GameOptions::default()
        };
        let mut state = GameState::new(options).map_err(|err| RunnerError::game(err.to_string()))?;

        let mut plies = 0usize;
        while !state.is_over() && plies < self.plan.max_plies {
            let legal = state.legal_moves();
            let seat = state.current_seat();
            let side = seating[seat.index()];
            let feed = self
                .feed
                .as_mut()
                .filter(|binding| binding.side == side)
                .map(|binding| &mut binding.feed);
            let contestant = &mut self.contestants[side.index()];

            let ctx = PolicyContext::new(&state, &legal, seat);
            let start = Instant::now();
            let decided = contestant.chain.decide(
                &ctx,
                contestant.policy.as_mut(),
                feed,
                ChainPosition { game: index, ply: plies },
                &mut contestant.fallbacks,
            )?;
            contestant.metrics.record(start.elapsed());

            let Some(decided) = decided else {
                return Err(RunnerError::game(format!(
                    "no move available for {} in game {index} at ply {plies}",
                    contestant.name
                )));
            };
            state = state
                .apply(decided.action)
                .map_err(|err| RunnerError::game(err.to_string()))?
                .state;
            plies += 1;
        }

        let result = match state.winner() {
            Some(Winner::Seat(seat)) => GameResult::Win(seating[seat.index()]),
            Some(Winner::Tie) => GameResult::Tie,
            None => GameResult::Aborted,
        };
        let books = |side: Side| {
            Seat::BOTH
                .iter()
                .filter(|seat| seating[seat.index()] == side)
                .map(|&seat| state.player(seat).books().len())
                .sum::<usize>()
        };
        let [a, b] = &self.contestants;
        let record = GameRecord {
            game_index: index,
            seed,
            first: seating[0],
            result,
            plies,
            books_a: books(Side::A),
            books_b: books(Side::B),
            fallbacks_a: a.fallbacks,
            fallbacks_b: b.fallbacks,
            decisions_a: a.metrics.finalize(),
            decisions_b: b.metrics.finalize(),
        };
        log_game(&self.plan, &record);
        Ok(record)
    }
}

fn log_game(plan: &BatchPlan, record: &GameRecord) {
    if !tracing::enabled!(Level::INFO) {
        return;
    }
    let result = match record.result {
        GameResult::Win(side) => plan.config(side).name.as_str(),
        GameResult::Tie => "tie",
        GameResult::Aborted => "aborted",
    };
    event!(
        target: "gofish_bench::game",
        Level::INFO,
        run_id = %plan.run_id,
        game_index = record.game_index as u32,
        seed = record.seed,
        first = record.first.as_str(),
        result,
        plies = record.plies as u32,
        books_a = record.books_a as u32,
        books_b = record.books_b as u32,
        fallbacks_a = record.fallbacks_a.total(),
        fallbacks_b = record.fallbacks_b.total(),
    );
}

/// Primary entry point for orchestrating tournaments.
pub struct TournamentRunner {
    config: BenchmarkConfig,
    outputs: ResolvedOutputs,
    registry: PolicyRegistry,
    feed: Option<(Side, MoveFeed)>,
    logging_enabled: bool,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub games_played: usize,
    pub rows_written: usize,
    pub stats: TournamentStats,
    pub jsonl_path: PathBuf,
    pub report_path: PathBuf,
    pub summary_path: PathBuf,
    pub plot_path: Option<PathBuf>,
    pub telemetry_path: Option<PathBuf>,
}

impl TournamentRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: BenchmarkConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let registry = PolicyRegistry::with_builtin();
        HeadToHead::new(BatchPlan::from_config(&config), &registry)?;

        let feed = match config.feed.as_ref() {
            Some(feed) => {
                let side = if feed.policy == config.policy_a().name {
                    Side::A
                } else {
                    Side::B
                };
                Some((side, MoveFeed::from_path(&feed.path, feed.strict)?))
            }
            None => None,
        };

        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            registry,
            feed,
        })
    }

    /// Execute the tournament, streaming JSONL rows to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.report_json.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;
        if !self.outputs.plots_dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.outputs.plots_dir)?;
        }

        let plan = BatchPlan::from_config(&self.config);
        let mut head = HeadToHead::new(plan.clone(), &self.registry)?;
        if let Some((side, feed)) = self.feed.as_ref() {
            head = head.with_feed(*side, feed.clone());
        }

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut analytics = AnalyticsCollector::new(&plan);
        let mut rows_written = 0usize;
        head.play_all(|record| {
            analytics.record(record);
            write_game_row(&mut writer, &plan, record)?;
            rows_written += 1;
            Ok(())
        })?;
        writer.flush()?;

        let stats = analytics.finalize();
        stats.write_markdown(&self.outputs.summary_md)?;
        let report = TournamentReport::build(
            &self.config.run_id,
            [
                (&plan.policy_a, head.descriptor(Side::A)),
                (&plan.policy_b, head.descriptor(Side::B)),
            ],
            &stats,
        )?;
        report.write(&self.outputs.report_json)?;

        let plot_path = match stats.render_plot(&self.outputs.plots_dir) {
            Ok(path) => Some(path),
            Err(err) => {
                eprintln!("WARN: {}", err);
                None
            }
        };

        let telemetry_path = if self.logging_enabled {
            let dir = self
                .outputs
                .summary_md
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            Some(dir.join("telemetry.jsonl"))
        } else {
            None
        };

        Ok(RunSummary {
            games_played: plan.games,
            rows_written,
            stats,
            jsonl_path: self.outputs.jsonl.clone(),
            report_path: self.outputs.report_json.clone(),
            summary_path: self.outputs.summary_md.clone(),
            plot_path,
            telemetry_path,
        })
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct GameLogRow<'a> {
    run_id: &'a str,
    policy_a: &'a str,
    policy_b: &'a str,
    #[serde(flatten)]
    record: &'a GameRecord,
}

fn write_game_row(
    writer: &mut BufWriter<File>,
    plan: &BatchPlan,
    record: &GameRecord,
) -> Result<(), RunnerError> {
    let row = GameLogRow {
        run_id: &plan.run_id,
        policy_a: &plan.policy_a.name,
        policy_b: &plan.policy_b.name,
        record,
    };
    serde_json::to_writer(&mut *writer, &row)?;
    writer.write_all(b"\n")?;
    Ok(())
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("{0}")]
    Policy(#[from] PolicyError),
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("game execution failed: {message}")]
    Game { message: String },
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
    #[error("report error: {0}")]
    Report(#[from] ReportError),
}

impl RunnerError {
    fn game(message: String) -> Self {
        RunnerError::Game { message }
    }
}
