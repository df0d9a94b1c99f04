use std::fs;
use std::path::Path;

use gofish_bot::PolicyDescriptor;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::analytics::TournamentStats;
use crate::config::PolicyConfig;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write report {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyIdentity {
    pub name: String,
    pub kind: String,
    pub descriptor: PolicyDescriptor,
    /// Hex SHA-256 of the descriptor's JSON form.
    pub sha256: String,
}

impl PolicyIdentity {
    pub fn new(config: &PolicyConfig, descriptor: PolicyDescriptor) -> Result<Self, ReportError> {
        Ok(Self {
            name: config.name.clone(),
            kind: config.kind().to_string(),
            sha256: fingerprint(&descriptor)?,
            descriptor,
        })
    }
}

/// JSON artifact describing one finished run.
#[derive(Debug, Clone, Serialize)]
pub struct TournamentReport {
    pub timestamp: String,
    pub run_id: String,
    pub version: String,
    pub policies: [PolicyIdentity; 2],
    pub stats: TournamentStats,
}

impl TournamentReport {
    pub fn build(
        run_id: &str,
        policies: [(&PolicyConfig, PolicyDescriptor); 2],
        stats: &TournamentStats,
    ) -> Result<Self, ReportError> {
        let [(config_a, descriptor_a), (config_b, descriptor_b)] = policies;
        Ok(Self {
            timestamp: OffsetDateTime::now_utc().format(&Rfc3339)?,
            run_id: run_id.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            policies: [
                PolicyIdentity::new(config_a, descriptor_a)?,
                PolicyIdentity::new(config_b, descriptor_b)?,
            ],
            stats: stats.clone(),
        })
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let path = path.as_ref();
        let body = serde_json::to_string_pretty(self)?;
        fs::write(path, body).map_err(|source| ReportError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}

pub fn fingerprint(descriptor: &PolicyDescriptor) -> Result<String, ReportError> {
    let bytes = serde_json::to_vec(descriptor)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
