use std::fs;
use std::path::Path;

use gofish_bench::config::{BenchmarkConfig, FeedConfig, PolicyConfig};
use gofish_bench::tournament::{
    BatchPlan, GameRecord, GameResult, HeadToHead, RunnerError, Side, TournamentRunner,
};
use gofish_bot::PolicyRegistry;
use tempfile::tempdir;

fn load_config(output_dir: &Path, games: usize, fair: bool) -> BenchmarkConfig {
    let yaml = format!(
        r#"
run_id: "test_smoke"
games:
  count: {games}
  seed: 4242
  fair: {fair}
policies:
  - name: "baseline"
  - name: "rando"
    kind: "random"
outputs:
  jsonl: "{jsonl}"
  report_json: "{report}"
  summary_md: "{summary}"
  plots_dir: "{plots}"
logging:
  enable_structured: false
"#,
        jsonl = output_dir.join("games.jsonl").display(),
        report = output_dir.join("report.json").display(),
        summary = output_dir.join("summary.md").display(),
        plots = output_dir.join("plots").display()
    );

    let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("valid yaml");
    cfg.validate().expect("config validates");
    cfg
}

/// JSONL rows with decision timings zeroed.
fn normalized_rows(path: &Path) -> Vec<serde_json::Value> {
    let jsonl = fs::read_to_string(path).expect("jsonl readable");
    jsonl
        .lines()
        .map(|line| {
            let mut value: serde_json::Value =
                serde_json::from_str(line).expect("row decodes to JSON");
            for key in ["decisions_a", "decisions_b"] {
                if let Some(timing) = value.get_mut(key).and_then(|v| v.as_object_mut()) {
                    timing.insert("avg_ms_per_decision".into(), serde_json::json!(0.0));
                }
            }
            value
        })
        .collect()
}

#[test]
fn tournament_smoke_test_writes_all_artifacts() {
    let dir = tempdir().expect("temp dir");
    let config = load_config(dir.path(), 6, true);
    let outputs = config.resolved_outputs();

    let runner = TournamentRunner::new(config, outputs).expect("runner created");
    let summary = runner.run().expect("tournament completes");

    assert_eq!(summary.games_played, 6);
    assert_eq!(summary.rows_written, 6);
    let rows = normalized_rows(&summary.jsonl_path);
    assert_eq!(rows.len(), 6);
    for (index, row) in rows.iter().enumerate() {
        assert_eq!(row["run_id"], "test_smoke");
        assert_eq!(row["game_index"], index);
        assert_eq!(row["seed"], 4242 + index as u64);
        assert_eq!(row["first"], if index % 2 == 0 { "a" } else { "b" });
    }

    let stats = &summary.stats;
    assert_eq!(stats.games, 6);
    assert_eq!(stats.a_first.games, 3);
    assert_eq!(stats.b_first.games, 3);
    assert_eq!(
        stats.policy_a_wins + stats.policy_b_wins + stats.ties + stats.aborted,
        6
    );

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&summary.report_path).expect("report readable"))
            .expect("report is JSON");
    assert_eq!(report["run_id"], "test_smoke");
    assert_eq!(report["policies"][0]["name"], "baseline");
    assert_eq!(report["policies"][1]["kind"], "random");
    assert_eq!(report["policies"][0]["sha256"].as_str().map(str::len), Some(64));

    assert!(summary.summary_path.exists(), "summary markdown missing");
    // Plot rendering is optional; ensure any failure surfaces explicitly
    if let Some(plot_path) = summary.plot_path {
        assert!(plot_path.exists(), "plot path reported but missing on disk");
    }
}

#[test]
fn seeded_runs_are_reproducible() {
    let first_dir = tempdir().expect("temp dir");
    let second_dir = tempdir().expect("temp dir");

    let run = |dir: &Path| {
        let config = load_config(dir, 4, true);
        let outputs = config.resolved_outputs();
        let summary = TournamentRunner::new(config, outputs)
            .expect("runner created")
            .run()
            .expect("tournament completes");
        normalized_rows(&summary.jsonl_path)
    };

    assert_eq!(run(first_dir.path()), run(second_dir.path()));
}

fn mirrored(result: GameResult) -> GameResult {
    match result {
        GameResult::Win(side) => GameResult::Win(side.other()),
        other => other,
    }
}

fn play_plan(plan: BatchPlan) -> Vec<GameRecord> {
    let registry = PolicyRegistry::with_builtin();
    let mut head = HeadToHead::new(plan, &registry).expect("policies build");
    let mut records = Vec::new();
    head.play_all(|record| {
        records.push(record.clone());
        Ok(())
    })
    .expect("batch completes");
    records
}

#[test]
fn fair_runs_are_symmetric_under_label_swap() {
    let forward = play_plan(
        BatchPlan::new(PolicyConfig::new("baseline"), PolicyConfig::new("greedy"), 4, 77).fair(true),
    );
    let swapped = play_plan(
        BatchPlan::new(PolicyConfig::new("greedy"), PolicyConfig::new("baseline"), 4, 78).fair(true),
    );

    assert_eq!(forward.iter().filter(|r| r.first == Side::A).count(), 2);
    // Swapped game i (greedy first, seed 78 + i) replays forward game i + 1.
    for index in [0, 2] {
        let original = &forward[index + 1];
        let replay = &swapped[index];
        assert_eq!(original.seed, replay.seed);
        assert_eq!(original.first, Side::B);
        assert_eq!(replay.first, Side::A);
        assert_eq!(original.plies, replay.plies);
        assert_eq!(original.books_a, replay.books_b);
        assert_eq!(original.books_b, replay.books_a);
        assert_eq!(mirrored(original.result), replay.result);
    }
}

#[test]
fn strict_feed_with_leftover_moves_aborts_the_run() {
    let dir = tempdir().expect("temp dir");
    let feed_path = dir.path().join("feed.txt");
    // A handful of ace asks cannot carry seat 1 through a whole game.
    fs::write(&feed_path, "# aces only\nA\nA\nA\nA\nA\nA\nA\nA\n").expect("feed written");

    let mut config = load_config(dir.path(), 1, false);
    config.feed = Some(FeedConfig {
        path: feed_path,
        policy: "rando".to_string(),
        strict: true,
    });
    config.validate().expect("config validates");
    let outputs = config.resolved_outputs();

    let err = TournamentRunner::new(config, outputs)
        .expect("runner created")
        .run()
        .err()
        .expect("strict feed fails");
    assert!(matches!(err, RunnerError::Feed(_)), "unexpected error: {err}");
}

#[test]
fn lenient_feed_falls_back_and_counts() {
    let dir = tempdir().expect("temp dir");
    let feed_path = dir.path().join("feed.txt");
    fs::write(&feed_path, "not-a-rank\n{\"ask_rank\":\"Z\"}\n").expect("feed written");

    let mut config = load_config(dir.path(), 1, false);
    config.feed = Some(FeedConfig {
        path: feed_path,
        policy: "baseline".to_string(),
        strict: false,
    });
    config.validate().expect("config validates");
    let outputs = config.resolved_outputs();

    let summary = TournamentRunner::new(config, outputs)
        .expect("runner created")
        .run()
        .expect("lenient feed never aborts");
    let fallbacks = summary.stats.fallbacks_a;
    assert_eq!(fallbacks.feed_illegal, 2);
    assert!(fallbacks.feed_missing > 0);
    assert_eq!(summary.stats.fallbacks_b.total(), 0);
}
