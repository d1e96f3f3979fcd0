use std::path::PathBuf;

/// Convenience result type used across shotrender.
pub type RenderResult<T> = Result<T, RenderError>;

/// Top-level error taxonomy used by dispatch, execution, storage and status APIs.
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    /// Bad caller input. Nothing was started and no side effects were performed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Required configuration is missing or malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The local renderer process failed.
    #[error("render process error: {0}")]
    RenderProcess(ProcessFailure),

    /// The renderer reported success but the expected artifact is absent or empty.
    #[error("render output missing: '{}'", .0.display())]
    OutputMissing(PathBuf),

    /// The cloud provider rejected the launch request.
    #[error("provisioning error: {0}")]
    Provisioning(String),

    /// The object store could not be reached or refused access.
    #[error("storage access error: {0}")]
    StorageAccess(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// How a local renderer process failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessFailure {
    /// The process exited with a non-zero code.
    ExitCode(i32),
    /// The renderer executable could not be found.
    ExecutableMissing(String),
    /// The process was terminated by a signal (including cancellation).
    Signalled,
    /// Spawning or waiting on the process failed for another reason.
    Io(String),
}

impl std::fmt::Display for ProcessFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExitCode(code) => write!(f, "renderer exited with code {code}"),
            Self::ExecutableMissing(program) => {
                write!(f, "renderer executable not found: '{program}'")
            }
            Self::Signalled => f.write_str("renderer was terminated by a signal"),
            Self::Io(msg) => write!(f, "renderer io failure: {msg}"),
        }
    }
}

/// Caller-facing classification of a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureClass {
    /// The render never started; fix the input or configuration.
    NeverStarted,
    /// The render ran and failed; re-submit if appropriate.
    RanAndFailed,
    /// The outcome is unknown; retry the poll later.
    Unknown,
}

impl RenderError {
    /// Build a [`RenderError::InvalidRequest`] value.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Build a [`RenderError::InvalidConfiguration`] value.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Build a [`RenderError::Provisioning`] value.
    pub fn provisioning(msg: impl Into<String>) -> Self {
        Self::Provisioning(msg.into())
    }

    /// Build a [`RenderError::StorageAccess`] value.
    pub fn storage_access(msg: impl Into<String>) -> Self {
        Self::StorageAccess(msg.into())
    }

    /// Build a [`RenderError::RenderProcess`] value for a non-zero exit code.
    pub fn exit_code(code: i32) -> Self {
        Self::RenderProcess(ProcessFailure::ExitCode(code))
    }

    /// Classify the error for callers deciding between fixing input, re-submitting or
    /// polling again.
    pub fn class(&self) -> FailureClass {
        match self {
            Self::InvalidRequest(_)
            | Self::InvalidConfiguration(_)
            | Self::Provisioning(_)
            | Self::Other(_) => FailureClass::NeverStarted,
            Self::RenderProcess(_) | Self::OutputMissing(_) => FailureClass::RanAndFailed,
            Self::StorageAccess(_) => FailureClass::Unknown,
        }
    }

    /// Exit code of a failed renderer process, if that is what happened.
    pub fn exit_code_value(&self) -> Option<i32> {
        match self {
            Self::RenderProcess(ProcessFailure::ExitCode(code)) => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
