use gofish_bot::{PolicyParams, PolicyRegistry};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

pub const DEFAULT_MAX_PLIES: usize = 10_000;
const DEFAULT_SEED: u64 = 1;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root benchmark configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BenchmarkConfig {
    pub run_id: String,
    pub games: GamesConfig,
    pub policies: Vec<PolicyConfig>,
    #[serde(default)]
    pub feed: Option<FeedConfig>,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchmarkConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: BenchmarkConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.games.validate()?;
        self.outputs.validate(&self.run_id)?;
        self.logging.normalize();
        validate_policies(&self.policies, &PolicyRegistry::with_builtin())?;
        if let Some(feed) = self.feed.as_ref() {
            feed.validate(&self.policies)?;
        }
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            report_json: resolve_template(&self.run_id, &self.outputs.report_json),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
            plots_dir: resolve_template(&self.run_id, &self.outputs.plots_dir),
        }
    }

    pub fn policy_a(&self) -> &PolicyConfig {
        &self.policies[0]
    }

    pub fn policy_b(&self) -> &PolicyConfig {
        &self.policies[1]
    }
}

/// How many games to play and how seats are assigned.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GamesConfig {
    pub count: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Alternate which policy sits first.
    #[serde(default = "default_fair")]
    pub fair: bool,
    #[serde(default = "default_max_plies")]
    pub max_plies: usize,
}

impl GamesConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.count == 0 {
            return Err(ValidationError::InvalidField {
                field: "games.count".to_string(),
                message: "number of games must be greater than zero".to_string(),
            });
        }

        if self.max_plies == 0 {
            return Err(ValidationError::InvalidField {
                field: "games.max_plies".to_string(),
                message: "ply ceiling must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_fair() -> bool {
    true
}

fn default_max_plies() -> usize {
    DEFAULT_MAX_PLIES
}

/// One of the two compared policies.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PolicyConfig {
    pub name: String,
    /// Registry name or alias; defaults to `name`.
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub params: PolicyParams,
}

impl PolicyConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            params: PolicyParams::new(),
        }
    }

    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or(&self.name)
    }
}

/// Pre-recorded moves for one policy, one per line.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FeedConfig {
    pub path: PathBuf,
    /// Name of the policy whose plies are read from the feed.
    pub policy: String,
    #[serde(default = "default_strict")]
    pub strict: bool,
}

impl FeedConfig {
    fn validate(&self, policies: &[PolicyConfig]) -> Result<(), ValidationError> {
        if self.path.as_os_str().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "feed.path".to_string(),
                message: "path must not be empty".to_string(),
            });
        }
        if !policies.iter().any(|p| p.name == self.policy) {
            return Err(ValidationError::InvalidField {
                field: "feed.policy".to_string(),
                message: format!("feed policy '{}' is not defined in policies list", self.policy),
            });
        }
        Ok(())
    }
}

fn default_strict() -> bool {
    true
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub report_json: String,
    pub summary_md: String,
    pub plots_dir: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.report_json", &self.report_json),
            ("outputs.summary_md", &self.summary_md),
            ("outputs.plots_dir", &self.plots_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
    /// Per-component score breakdowns for every bot decision.
    #[serde(default)]
    pub decision_details: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
            decision_details: false,
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn validate_policies(
    policies: &[PolicyConfig],
    registry: &PolicyRegistry,
) -> Result<(), ValidationError> {
    if policies.len() != 2 {
        return Err(ValidationError::InvalidField {
            field: "policies".to_string(),
            message: format!("exactly two policies are compared, found {}", policies.len()),
        });
    }

    let mut seen = HashSet::new();
    for (index, policy) in policies.iter().enumerate() {
        if policy.name.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: format!("policies[{index}].name"),
                message: "policy name must not be empty".to_string(),
            });
        }

        if !seen.insert(policy.name.clone()) {
            return Err(ValidationError::InvalidField {
                field: "policies".to_string(),
                message: format!("policy name '{}' defined more than once", policy.name),
            });
        }

        if registry.resolve(policy.kind()).is_none() {
            return Err(ValidationError::UnknownPolicy {
                field: format!("policies[{index}].kind"),
                kind: policy.kind().to_string(),
            });
        }
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub report_json: PathBuf,
    pub summary_md: PathBuf,
    pub plots_dir: PathBuf,
}

impl ResolvedOutputs {
    /// Everything under one directory, for ad-hoc runs.
    pub fn under(dir: &Path, run_id: &str) -> Self {
        Self {
            jsonl: dir.join(format!("{run_id}.games.jsonl")),
            report_json: dir.join(format!("{run_id}.report.json")),
            summary_md: dir.join(format!("{run_id}.summary.md")),
            plots_dir: dir.join("plots"),
        }
    }
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
    #[error("{field}: unknown policy '{kind}'")]
    UnknownPolicy { field: String, kind: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC_YAML: &str = r#"
run_id: "stage0_smoke"
games:
  count: 16
  seed: 123
policies:
  - name: "greedy"
    params:
      temperature: 0.0
  - name: "claw"
    kind: "analytical"
outputs:
  jsonl: "bench/out/{run_id}/games.jsonl"
  report_json: "bench/out/{run_id}/report.json"
  summary_md: "bench/out/{run_id}/summary.md"
  plots_dir: "bench/out/{run_id}/plots"
logging:
  enable_structured: true
  tracing_level: "debug"
"#;

    #[test]
    fn loads_and_validates_basic_config() {
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(BASIC_YAML).expect("parse yaml");
        cfg.validate().expect("validate");

        assert!(cfg.games.fair);
        assert_eq!(cfg.games.max_plies, DEFAULT_MAX_PLIES);
        assert!(cfg.logging.enable_structured);
        assert_eq!(cfg.policy_a().kind(), "greedy");
        assert_eq!(cfg.policy_b().kind(), "analytical");
        assert_eq!(cfg.policy_a().params["temperature"], 0.0);

        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.jsonl,
            PathBuf::from("bench/out/stage0_smoke/games.jsonl")
        );
    }

    #[test]
    fn rejects_unknown_policy_kind() {
        let yaml = BASIC_YAML.replace("kind: \"analytical\"", "kind: \"oracle\"");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("should fail");
        assert!(matches!(
            err,
            ValidationError::UnknownPolicy { kind, .. } if kind == "oracle"
        ));
    }

    #[test]
    fn rejects_duplicate_policies() {
        let yaml = BASIC_YAML.replace("name: \"claw\"", "name: \"greedy\"");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("duplicate policies should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "policies"
        ));
    }

    #[test]
    fn rejects_invalid_run_id() {
        let yaml = BASIC_YAML.replace("stage0_smoke", "stage 0 smoke");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("invalid run id");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "run_id"
        ));
    }

    #[test]
    fn feed_must_name_a_policy() {
        let yaml = format!("{BASIC_YAML}feed:\n  path: \"moves.txt\"\n  policy: \"nobody\"\n");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("unknown feed policy");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "feed.policy"
        ));

        let yaml = format!("{BASIC_YAML}feed:\n  path: \"moves.txt\"\n  policy: \"claw\"\n");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        cfg.validate().expect("valid feed");
        assert!(cfg.feed.unwrap().strict);
    }

    #[test]
    fn outputs_resolve_template_multiple_occurrences() {
        let yaml = BASIC_YAML.replace(
            "bench/out/{run_id}/plots",
            "bench/out/{run_id}/{run_id}/plots",
        );
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        cfg.validate().expect("valid");
        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.plots_dir,
            PathBuf::from("bench/out/stage0_smoke/stage0_smoke/plots")
        );
    }
}
