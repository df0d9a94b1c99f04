//! Line-oriented JSON control protocol.
//!
//! Each request is one JSON object per line with a `cmd` field; each
//! response is one JSON object per line. A malformed request produces an
//! error response and the session continues.

use std::io::{self, BufRead, Write};

use gofish_bot::{PolicyError, PolicyRegistry};
use gofish_core::game::event::GameEvent;
use gofish_core::game::serialization::PublicSummary;
use gofish_core::game::state::{Action, GameOptions, GameState, Outcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{Level, event};

use crate::analytics::{AnalyticsCollector, TournamentStats};
use crate::config::{DEFAULT_MAX_PLIES, PolicyConfig};
use crate::tournament::{BatchPlan, HeadToHead, RunnerError};

pub const PROTOCOL: &str = "gofish-cli.v1";

const COMMANDS: [&str; 6] = ["init", "state", "legal", "step", "batch", "batch_fair"];
const DEFAULT_BATCH_GAMES: usize = 1000;
const DEFAULT_BATCH_SEED: u64 = 1;

#[derive(Debug, Default, Serialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<GameEvent>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<PublicSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal: Option<Vec<Action>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<TournamentStats>,
}

impl Response {
    pub fn ready() -> Self {
        Self {
            ok: true,
            ready: Some(true),
            protocol: Some(PROTOCOL),
            ..Self::default()
        }
    }

    fn error(reason: &str) -> Self {
        Self {
            ok: false,
            reason: Some(reason.to_string()),
            ..Self::default()
        }
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn with_state(mut self, state: &GameState) -> Self {
        self.state = Some(state.summarize(Some(state.current_seat())));
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum Request {
    Init {
        #[serde(default)]
        options: GameOptions,
    },
    State,
    Legal,
    Step {
        #[serde(default)]
        action: Value,
    },
    Batch(BatchRequest),
    BatchFair(BatchRequest),
}

#[derive(Debug, Deserialize)]
struct BatchRequest {
    #[serde(default = "default_games")]
    games: usize,
    #[serde(default = "default_policy_a", alias = "policyA")]
    policy_a: String,
    #[serde(default = "default_policy_b", alias = "policyB")]
    policy_b: String,
    #[serde(default)]
    fair: bool,
    #[serde(default = "default_seed")]
    seed: u64,
    #[serde(default = "default_max_plies")]
    max_plies: usize,
}

fn default_games() -> usize {
    DEFAULT_BATCH_GAMES
}

fn default_policy_a() -> String {
    "dadslayer".to_string()
}

fn default_policy_b() -> String {
    "random".to_string()
}

fn default_seed() -> u64 {
    DEFAULT_BATCH_SEED
}

fn default_max_plies() -> usize {
    DEFAULT_MAX_PLIES
}

/// One controller connection: at most one live game plus the policy registry.
pub struct Session {
    state: Option<GameState>,
    registry: PolicyRegistry,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: None,
            registry: PolicyRegistry::with_builtin(),
        }
    }

    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    pub fn handle_line(&mut self, line: &str) -> Response {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(err) => return Response::error("invalid-json").with_message(err.to_string()),
        };
        let cmd = value.get("cmd").and_then(Value::as_str).unwrap_or_default();
        if !COMMANDS.contains(&cmd) {
            return Response::error("unknown-cmd");
        }
        event!(target: "gofish_bench::protocol", Level::DEBUG, cmd, "request");
        match serde_json::from_value::<Request>(value) {
            Ok(request) => self.dispatch(request),
            Err(err) => Response::error("bad-request").with_message(err.to_string()),
        }
    }

    fn dispatch(&mut self, request: Request) -> Response {
        match request {
            Request::Init { options } => match GameState::new(options) {
                Ok(state) => {
                    let response = Response {
                        ok: true,
                        ..Response::default()
                    }
                    .with_state(&state);
                    self.state = Some(state);
                    response
                }
                Err(err) => Response::error("bad-request").with_message(err.to_string()),
            },
            Request::State => match self.state.as_ref() {
                Some(state) => Response {
                    ok: true,
                    ..Response::default()
                }
                .with_state(state),
                None => Response::error("no-game"),
            },
            Request::Legal => match self.state.as_ref() {
                Some(state) => Response {
                    ok: true,
                    legal: Some(state.legal_moves()),
                    ..Response::default()
                },
                None => Response::error("no-game"),
            },
            Request::Step { action } => self.step(&action),
            Request::Batch(batch) => self.batch(batch, false),
            Request::BatchFair(batch) => self.batch(batch, true),
        }
    }

    fn step(&mut self, action: &Value) -> Response {
        let Some(state) = self.state.as_ref() else {
            return Response::error("no-game");
        };
        match state.apply_value(action) {
            Ok(transition) => {
                let seen = state.events().len();
                let events = transition.state.events()[seen..].to_vec();
                let response = Response {
                    ok: true,
                    event: Some(transition.outcome),
                    events: Some(events),
                    ..Response::default()
                }
                .with_state(&transition.state);
                self.state = Some(transition.state);
                response
            }
            Err(err) => Response::error(err.code())
                .with_message(err.to_string())
                .with_state(state),
        }
    }

    fn batch(&self, request: BatchRequest, force_fair: bool) -> Response {
        if request.games == 0 || request.max_plies == 0 {
            return Response::error("bad-request").with_message("games and max_plies must be positive");
        }
        let mut plan = BatchPlan::new(
            PolicyConfig::new(request.policy_a),
            PolicyConfig::new(request.policy_b),
            request.games,
            request.seed,
        )
        .fair(force_fair || request.fair);
        plan.run_id = "serve".to_string();
        plan.max_plies = request.max_plies;

        match run_batch(plan, &self.registry) {
            Ok(stats) => Response {
                ok: true,
                stats: Some(stats),
                ..Response::default()
            },
            Err(RunnerError::Policy(err @ PolicyError::UnknownPolicy(_))) => {
                Response::error("unknown-policy").with_message(err.to_string())
            }
            Err(err) => Response::error("bad-request").with_message(err.to_string()),
        }
    }
}

/// Plays a batch in memory and returns its aggregate statistics.
pub fn run_batch(plan: BatchPlan, registry: &PolicyRegistry) -> Result<TournamentStats, RunnerError> {
    let mut analytics = AnalyticsCollector::new(&plan);
    let mut head = HeadToHead::new(plan, registry)?;
    head.play_all(|record| {
        analytics.record(record);
        Ok(())
    })?;
    Ok(analytics.finalize())
}

/// Writes the ready banner, then answers each non-blank input line.
pub fn serve<R: BufRead, W: Write>(reader: R, mut writer: W) -> io::Result<()> {
    let mut session = Session::new();
    write_response(&mut writer, &Response::ready())?;
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = session.handle_line(&line);
        write_response(&mut writer, &response)?;
    }
    Ok(())
}

fn write_response<W: Write>(writer: &mut W, response: &Response) -> io::Result<()> {
    serde_json::to_writer(&mut *writer, response)?;
    writer.write_all(b"\n")?;
    writer.flush()
}
