use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{RenderError, RenderResult};

const JOB_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Unique per-request token namespacing every temp file and cloud object of one render.
///
/// Identities are 12 characters drawn uniformly from `A-Z0-9` (about 62 bits of entropy).
/// A retry always mints a new identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobId(String);

impl JobId {
    /// Number of characters in a job identity.
    pub const LEN: usize = 12;

    /// Mint a fresh identity from the thread-local cryptographically secure generator.
    pub fn mint() -> Self {
        Self::mint_with(&mut rand::rng())
    }

    /// Mint an identity from a caller-supplied generator.
    pub fn mint_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let id = (0..Self::LEN)
            .map(|_| JOB_ID_ALPHABET[rng.random_range(0..JOB_ID_ALPHABET.len())] as char)
            .collect();
        Self(id)
    }

    /// Parse an identity received from a caller (for example a job handle or CLI flag).
    ///
    /// Accepts exactly [`JobId::LEN`] ASCII alphanumerics so the identity is always a safe
    /// single path segment.
    pub fn parse(s: &str) -> RenderResult<Self> {
        if s.len() != Self::LEN || !s.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(RenderError::invalid_request(format!(
                "job id must be {} ASCII alphanumeric characters, got '{s}'",
                Self::LEN
            )));
        }
        Ok(Self(s.to_owned()))
    }

    /// Borrow the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for JobId {
    type Error = RenderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<JobId> for String {
    fn from(value: JobId) -> Self {
        value.0
    }
}

/// Where a render request executes. Decided once per request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionEnvironment {
    /// Child process on this machine.
    Local,
    /// Disposable cloud virtual machine.
    Cloud,
}

impl FromStr for ExecutionEnvironment {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "cloud" | "gcp" => Ok(Self::Cloud),
            other => Err(RenderError::invalid_configuration(format!(
                "unknown render environment '{other}' (expected 'local', 'cloud' or 'gcp')"
            ))),
        }
    }
}

impl std::fmt::Display for ExecutionEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Cloud => f.write_str("cloud"),
        }
    }
}

/// Status of a cloud render, derived on every poll from marker objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    /// Neither marker exists yet.
    Pending,
    /// The success marker exists (the output object was uploaded before it).
    Succeeded,
    /// The failure marker exists.
    Failed,
}

impl JobStatus {
    /// `true` for [`JobStatus::Succeeded`] and [`JobStatus::Failed`].
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => f.write_str("PENDING"),
            Self::Succeeded => f.write_str("SUCCEEDED"),
            Self::Failed => f.write_str("FAILED"),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
