use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::foundation::core::{JobId, JobStatus};
use crate::foundation::error::{RenderError, RenderResult};
use crate::store::ArtifactStore;
use crate::store::layout::JobLayout;

/// Handle of a launched cloud job.
///
/// Created once by the dispatcher and only read afterwards. Serializes to a flat JSON record so
/// another process can poll it later.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderJob {
    /// Job identity.
    pub job_id: JobId,
    /// Key of the rendered output object.
    pub output_key: String,
    /// Key of the success marker.
    pub success_marker_key: String,
    /// Key of the failure marker.
    pub failure_marker_key: String,
    /// Addressable URI of the output object, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_uri: Option<String>,
    /// Dispatch time, when known.
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
}

impl RenderJob {
    /// Handle for a freshly launched job laid out by `layout`.
    pub fn launched(job_id: JobId, layout: &JobLayout, output_uri: String) -> Self {
        Self {
            job_id,
            output_key: layout.output(),
            success_marker_key: layout.success_marker(),
            failure_marker_key: layout.failure_marker(),
            output_uri: Some(output_uri),
            created_at: Some(OffsetDateTime::now_utc()),
        }
    }

    /// Rebuild a handle from a bare job id. Creation time and URI are unknown.
    pub fn for_id(job_id: JobId, output_extension: &str) -> Self {
        let layout = JobLayout::new(&job_id, "", output_extension);
        Self {
            output_key: layout.output(),
            success_marker_key: layout.success_marker(),
            failure_marker_key: layout.failure_marker(),
            output_uri: None,
            created_at: None,
            job_id,
        }
    }

    /// Parse a handle previously printed as JSON.
    pub fn from_json_str(s: &str) -> RenderResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| RenderError::invalid_request(format!("malformed job handle: {e}")))
    }
}

/// Derives [`JobStatus`] from marker objects on every call.
///
/// Holds no job table and caches nothing; the store is the source of truth.
#[derive(Clone)]
pub struct JobStatusTracker {
    store: Arc<dyn ArtifactStore>,
}

impl std::fmt::Debug for JobStatusTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobStatusTracker").finish_non_exhaustive()
    }
}

impl JobStatusTracker {
    /// Tracker reading markers from `store`.
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    /// Current status of `job`.
    ///
    /// The success marker is checked first, so a job with both markers is `Succeeded`.
    /// Storage failures are returned as errors and never reported as `Failed`.
    #[tracing::instrument(skip(self, job), fields(job_id = %job.job_id))]
    pub fn poll(&self, job: &RenderJob) -> RenderResult<JobStatus> {
        let status = if self.store.exists(&job.success_marker_key)? {
            JobStatus::Succeeded
        } else if self.store.exists(&job.failure_marker_key)? {
            JobStatus::Failed
        } else {
            JobStatus::Pending
        };
        tracing::debug!(%status, "polled markers");
        Ok(status)
    }

    /// Poll every `interval` until a terminal status or until `timeout` has elapsed.
    ///
    /// Storage access errors count as "still pending". Other errors are returned. At the
    /// deadline the last observation is returned, which is `Pending` unless a marker appeared.
    /// A timeout too large to represent means no deadline.
    pub fn poll_until(
        &self,
        job: &RenderJob,
        interval: Duration,
        timeout: Duration,
    ) -> RenderResult<JobStatus> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            let status = match self.poll(job) {
                Ok(status) => status,
                Err(RenderError::StorageAccess(msg)) => {
                    tracing::warn!(job_id = %job.job_id, error = %msg, "poll failed; retrying");
                    JobStatus::Pending
                }
                Err(e) => return Err(e),
            };
            if status.is_terminal() {
                return Ok(status);
            }

            let now = Instant::now();
            let pause = match deadline {
                Some(deadline) if now >= deadline => return Ok(status),
                Some(deadline) => interval.min(deadline - now),
                None => interval,
            };
            std::thread::sleep(pause);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/status/tracker.rs"]
mod tests;
