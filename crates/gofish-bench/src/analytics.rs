use std::fs;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use serde::Serialize;
use statrs::distribution::{Binomial, ContinuousCDF, DiscreteCDF, Normal};
use thiserror::Error;

use crate::tournament::{BatchPlan, FallbackCounts, GameRecord, GameResult, Side};

const CONFIDENCE: f64 = 0.95;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to render plot: {0}")]
    Plot(String),
}

/// Results of the games in which one side sat first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SeatRecord {
    pub games: usize,
    pub a_wins: usize,
    pub b_wins: usize,
    pub ties: usize,
    pub aborted: usize,
}

impl SeatRecord {
    fn record(&mut self, result: GameResult) {
        self.games += 1;
        match result {
            GameResult::Win(Side::A) => self.a_wins += 1,
            GameResult::Win(Side::B) => self.b_wins += 1,
            GameResult::Tie => self.ties += 1,
            GameResult::Aborted => self.aborted += 1,
        }
    }
}

#[derive(Default)]
struct LatencyAccumulator {
    decisions: u64,
    total_ms: f64,
}

impl LatencyAccumulator {
    fn add(&mut self, decisions: u32, avg_ms: f64) {
        self.decisions += u64::from(decisions);
        self.total_ms += avg_ms * f64::from(decisions);
    }

    fn average(&self) -> f64 {
        if self.decisions == 0 {
            0.0
        } else {
            self.total_ms / self.decisions as f64
        }
    }
}

pub struct AnalyticsCollector {
    policy_a: String,
    policy_b: String,
    fair: bool,
    a_first: SeatRecord,
    b_first: SeatRecord,
    total_plies: usize,
    fallbacks: [FallbackCounts; 2],
    latency: [LatencyAccumulator; 2],
}

impl AnalyticsCollector {
    pub fn new(plan: &BatchPlan) -> Self {
        Self {
            policy_a: plan.policy_a.name.clone(),
            policy_b: plan.policy_b.name.clone(),
            fair: plan.fair,
            a_first: SeatRecord::default(),
            b_first: SeatRecord::default(),
            total_plies: 0,
            fallbacks: [FallbackCounts::default(); 2],
            latency: [LatencyAccumulator::default(), LatencyAccumulator::default()],
        }
    }

    pub fn record(&mut self, record: &GameRecord) {
        match record.first {
            Side::A => self.a_first.record(record.result),
            Side::B => self.b_first.record(record.result),
        }
        self.total_plies += record.plies;
        self.fallbacks[Side::A.index()].merge(&record.fallbacks_a);
        self.fallbacks[Side::B.index()].merge(&record.fallbacks_b);
        self.latency[Side::A.index()].add(
            record.decisions_a.decisions,
            record.decisions_a.avg_ms_per_decision,
        );
        self.latency[Side::B.index()].add(
            record.decisions_b.decisions,
            record.decisions_b.avg_ms_per_decision,
        );
    }

    pub fn finalize(self) -> TournamentStats {
        let games = self.a_first.games + self.b_first.games;
        let a_wins = self.a_first.a_wins + self.b_first.a_wins;
        let b_wins = self.a_first.b_wins + self.b_first.b_wins;
        let ties = self.a_first.ties + self.b_first.ties;
        let aborted = self.a_first.aborted + self.b_first.aborted;
        let decided = games - aborted;

        let score_rate = if decided == 0 {
            0.0
        } else {
            (a_wins as f64 + 0.5 * ties as f64) / decided as f64
        };

        TournamentStats {
            policy_a: self.policy_a,
            policy_b: self.policy_b,
            fair: self.fair,
            games,
            policy_a_wins: a_wins,
            policy_b_wins: b_wins,
            ties,
            aborted,
            policy_a_win_rate: percent(a_wins, games),
            policy_b_win_rate: percent(b_wins, games),
            tie_rate: percent(ties, games),
            avg_plies: round2(self.total_plies as f64 / games.max(1) as f64),
            score_rate,
            score_rate_ci95: score_interval(score_rate, decided),
            sign_test_p: sign_test(a_wins, b_wins),
            a_first: self.a_first,
            b_first: self.b_first,
            fallbacks_a: self.fallbacks[Side::A.index()],
            fallbacks_b: self.fallbacks[Side::B.index()],
            avg_ms_per_decision_a: self.latency[Side::A.index()].average(),
            avg_ms_per_decision_b: self.latency[Side::B.index()].average(),
        }
    }
}

/// Aggregate head-to-head statistics. Rates are percentages of all games.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TournamentStats {
    pub policy_a: String,
    pub policy_b: String,
    pub fair: bool,
    pub games: usize,
    pub policy_a_wins: usize,
    pub policy_b_wins: usize,
    pub ties: usize,
    pub aborted: usize,
    pub policy_a_win_rate: f64,
    pub policy_b_win_rate: f64,
    pub tie_rate: f64,
    pub avg_plies: f64,
    /// A's wins plus half its ties over non-aborted games.
    pub score_rate: f64,
    pub score_rate_ci95: (f64, f64),
    /// Exact two-sided sign test over decisive games.
    pub sign_test_p: f64,
    pub a_first: SeatRecord,
    pub b_first: SeatRecord,
    pub fallbacks_a: FallbackCounts,
    pub fallbacks_b: FallbackCounts,
    pub avg_ms_per_decision_a: f64,
    pub avg_ms_per_decision_b: f64,
}

impl TournamentStats {
    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let mut rows = String::new();
        rows.push_str("# Tournament Summary\n\n");
        rows.push_str(&format!(
            "{games} games, {mode} seating, {aborted} aborted, {plies:.2} plies on average\n\n",
            games = self.games,
            mode = if self.fair { "fair" } else { "fixed" },
            aborted = self.aborted,
            plies = self.avg_plies,
        ));
        rows.push_str("| Policy | Wins | Win % | Starts first | Fallbacks | Avg ms/decision |\n");
        rows.push_str("|--------|------|-------|--------------|-----------|-----------------|\n");
        for (name, wins, rate, first, fallbacks, latency) in [
            (
                &self.policy_a,
                self.policy_a_wins,
                self.policy_a_win_rate,
                self.a_first.games,
                self.fallbacks_a.total(),
                self.avg_ms_per_decision_a,
            ),
            (
                &self.policy_b,
                self.policy_b_wins,
                self.policy_b_win_rate,
                self.b_first.games,
                self.fallbacks_b.total(),
                self.avg_ms_per_decision_b,
            ),
        ] {
            rows.push_str(&format!(
                "| {name} | {wins} | {rate:.2}% | {first} | {fallbacks} | {latency:.3} |\n"
            ));
        }
        rows.push_str(&format!(
            "\nTies: {ties} ({tie_rate:.2}%)\n\n",
            ties = self.ties,
            tie_rate = self.tie_rate,
        ));
        rows.push_str(&format!(
            "Score rate of {a}: {score:.3}, 95% CI [{low:.3}, {high:.3}], sign test p = {p:.4}\n",
            a = self.policy_a,
            score = self.score_rate,
            low = self.score_rate_ci95.0,
            high = self.score_rate_ci95.1,
            p = self.sign_test_p,
        ));

        fs::write(path.as_ref(), rows).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })?;
        Ok(())
    }

    pub fn render_plot(&self, dir: impl AsRef<Path>) -> Result<PathBuf, AnalyticsError> {
        let dir = dir.as_ref();
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|e| AnalyticsError::Io {
                context: "creating plots directory",
                source: e,
            })?;
        }

        let output_path = dir.join("win_rates.png");
        let bars = vec![
            (self.policy_a.clone(), self.policy_a_win_rate, BLUE),
            (self.policy_b.clone(), self.policy_b_win_rate, RED),
            ("tie".to_string(), self.tie_rate, GREEN),
        ];

        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));

        let plot_attempt = std::panic::catch_unwind(move || {
            let root = BitMapBackend::new(&output_path, (640, 420)).into_drawing_area();
            root.fill(&WHITE)
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            let mut chart = ChartBuilder::on(&root)
                .margin(20)
                .caption("Win rate (%)", ("sans-serif", 22))
                .set_label_area_size(LabelAreaPosition::Left, 50)
                .set_label_area_size(LabelAreaPosition::Bottom, 40)
                .build_cartesian_2d(0..bars.len(), 0.0f64..100.0)
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .configure_mesh()
                .disable_mesh()
                .y_desc("% of games")
                .x_label_formatter(&|idx| {
                    bars.get(*idx)
                        .map(|(label, _, _)| label.clone())
                        .unwrap_or_default()
                })
                .draw()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .draw_series(bars.iter().enumerate().map(|(idx, (_, rate, color))| {
                    Rectangle::new([(idx, 0.0), (idx + 1, *rate)], color.filled())
                }))
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(chart);

            root.present()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(root);

            Ok(output_path)
        });

        std::panic::set_hook(prev_hook);

        match plot_attempt {
            Ok(result) => result,
            Err(_) => Err(AnalyticsError::Plot(
                "plotters panicked while rendering (missing font support?)".into(),
            )),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percent(count: usize, games: usize) -> f64 {
    round2(count as f64 * 100.0 / games.max(1) as f64)
}

/// Normal approximation, clamped to [0, 1].
fn score_interval(rate: f64, samples: usize) -> (f64, f64) {
    if samples == 0 {
        return (0.0, 1.0);
    }
    let std_error = (rate * (1.0 - rate) / samples as f64).sqrt();
    let z = Normal::new(0.0, 1.0)
        .map(|normal| normal.inverse_cdf(0.5 + CONFIDENCE / 2.0))
        .unwrap_or(1.96);
    let margin = z * std_error;
    ((rate - margin).max(0.0), (rate + margin).min(1.0))
}

fn sign_test(a_wins: usize, b_wins: usize) -> f64 {
    let n = (a_wins + b_wins) as u64;
    if n == 0 {
        return 1.0;
    }
    let k = a_wins.min(b_wins) as u64;
    match Binomial::new(0.5, n) {
        Ok(binomial) => (2.0 * binomial.cdf(k)).min(1.0),
        Err(_) => 1.0,
    }
}
