//! Common types used across blobconv

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BlobconvError, Result};

/// Name of an object within a single store container.
///
/// Names compare byte-wise, which is the order every worker enumerates in.
pub type ObjectName = String;

/// Position of one worker among the workers sharing a batch
///
/// Deserializing goes through [`WorkerIdentity::new`], so a report or config
/// can never carry an out-of-range identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawWorkerIdentity")]
pub struct WorkerIdentity {
    ordinal: usize,
    total: usize,
}

#[derive(Deserialize)]
struct RawWorkerIdentity {
    ordinal: usize,
    total: usize,
}

impl TryFrom<RawWorkerIdentity> for WorkerIdentity {
    type Error = BlobconvError;

    fn try_from(raw: RawWorkerIdentity) -> Result<Self> {
        Self::new(raw.ordinal, raw.total)
    }
}

impl WorkerIdentity {
    /// Build an identity, rejecting `total == 0` and `ordinal >= total`
    pub fn new(ordinal: usize, total: usize) -> Result<Self> {
        if total == 0 {
            return Err(BlobconvError::config(
                "total worker count must be a positive integer",
            ));
        }
        if ordinal >= total {
            return Err(BlobconvError::config(format!(
                "worker ordinal {} is out of range for {} worker(s); expected 0..{}",
                ordinal, total, total
            )));
        }
        Ok(Self { ordinal, total })
    }

    /// Identity of the only worker in a single-worker batch
    pub fn single() -> Self {
        Self {
            ordinal: 0,
            total: 1,
        }
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

impl std::fmt::Display for WorkerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.ordinal + 1, self.total)
    }
}

/// Stage at which a single conversion failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Read,
    Decode,
    Encode,
    Write,
    /// The conversion task itself panicked or was cancelled
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &str {
        match self {
            FailureKind::Read => "read_error",
            FailureKind::Decode => "decode_error",
            FailureKind::Encode => "encode_error",
            FailureKind::Write => "write_error",
            FailureKind::Internal => "internal_error",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of converting one object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionStatus {
    /// Output written; `checksum` is the SHA-256 of the written bytes
    Succeeded { bytes_written: u64, checksum: String },
    /// Output already present and `--skip-existing` was requested
    Skipped,
    Failed { kind: FailureKind, message: String },
}

/// Result of converting a single input object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub input: ObjectName,
    pub output: ObjectName,
    #[serde(flatten)]
    pub status: ConversionStatus,
}

impl ConversionResult {
    pub fn succeeded(
        input: impl Into<ObjectName>,
        output: impl Into<ObjectName>,
        bytes_written: u64,
        checksum: impl Into<String>,
    ) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            status: ConversionStatus::Succeeded {
                bytes_written,
                checksum: checksum.into(),
            },
        }
    }

    pub fn skipped(input: impl Into<ObjectName>, output: impl Into<ObjectName>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            status: ConversionStatus::Skipped,
        }
    }

    pub fn failed(
        input: impl Into<ObjectName>,
        output: impl Into<ObjectName>,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            status: ConversionStatus::Failed {
                kind,
                message: message.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, ConversionStatus::Succeeded { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, ConversionStatus::Failed { .. })
    }
}

/// Everything one worker did during a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub identity: WorkerIdentity,
    pub input_container: String,
    pub output_container: String,
    /// Objects found in the input container
    pub enumerated: usize,
    /// Objects matching the eligible extensions, across all workers
    pub eligible: usize,
    /// Objects assigned to this worker
    pub assigned: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<ConversionResult>,
}

impl RunSummary {
    /// Tally `results` into a summary
    #[allow(clippy::too_many_arguments)]
    pub fn from_results(
        identity: WorkerIdentity,
        input_container: impl Into<String>,
        output_container: impl Into<String>,
        enumerated: usize,
        eligible: usize,
        assigned: usize,
        dry_run: bool,
        started_at: DateTime<Utc>,
        results: Vec<ConversionResult>,
    ) -> Self {
        let mut succeeded = 0;
        let mut skipped = 0;
        let mut failed = 0;
        for result in &results {
            match result.status {
                ConversionStatus::Succeeded { .. } => succeeded += 1,
                ConversionStatus::Skipped => skipped += 1,
                ConversionStatus::Failed { .. } => failed += 1,
            }
        }

        Self {
            identity,
            input_container: input_container.into(),
            output_container: output_container.into(),
            enumerated,
            eligible,
            assigned,
            succeeded,
            skipped,
            failed,
            dry_run,
            started_at,
            finished_at: Utc::now(),
            results,
        }
    }

    /// Items that went through conversion, successful or not
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &ConversionResult> {
        self.results.iter().filter(|r| r.is_failure())
    }
}
