use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::config::Settings;
use crate::domain::{Identifier, OutputFormat};
use crate::error::RetrieverError;
use crate::retry::RetryExecutor;
use crate::transport::{HttpRequest, Transport};
use crate::wait::{CancellationToken, Sleeper};

pub const DEFAULT_FROM_DB: &str = "UniProtKB_AC-ID";
pub const DEFAULT_TO_DB: &str = "UniProtKB";
const RESULTS_FORMAT: OutputFormat = OutputFormat::Fasta;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRequest {
    pub ids: Vec<Identifier>,
    pub from_db: String,
    pub to_db: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobState {
    Submitted,
    Running,
    Complete,
    Failed,
}

impl JobState {
    /// The server signals completion by including `results` or `failedIds`;
    /// an explicit `jobStatus` of `FAILED`/`ERROR` ends the job.
    pub fn from_status_body(body: &Value) -> JobState {
        if body.get("results").is_some() || body.get("failedIds").is_some() {
            return JobState::Complete;
        }
        match body.get("jobStatus").and_then(Value::as_str) {
            Some("FAILED") | Some("ERROR") => JobState::Failed,
            _ => JobState::Running,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Complete | JobState::Failed)
    }

    pub fn can_advance_to(self, next: JobState) -> bool {
        match self {
            JobState::Submitted => next != JobState::Submitted,
            JobState::Running => next != JobState::Submitted,
            JobState::Complete | JobState::Failed => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingJob {
    pub job_id: String,
    pub state: JobState,
}

impl MappingJob {
    pub fn submitted(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            state: JobState::Submitted,
        }
    }

    pub fn advance(&mut self, next: JobState) -> Result<(), RetrieverError> {
        if !self.state.can_advance_to(next) {
            return Err(RetrieverError::JobFailed {
                job_id: self.job_id.clone(),
                reason: format!("invalid state transition {:?} -> {next:?}", self.state),
            });
        }
        self.state = next;
        Ok(())
    }

    fn fail(&mut self, reason: String) -> RetrieverError {
        if self.state.can_advance_to(JobState::Failed) {
            self.state = JobState::Failed;
        }
        error!("ID mapping job {} failed: {reason}", self.job_id);
        RetrieverError::JobFailed {
            job_id: self.job_id.clone(),
            reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_polls: usize,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_polls: 200,
        }
    }
}

pub struct JobPoller<'a, T: ?Sized, S> {
    transport: &'a T,
    retry: &'a RetryExecutor<S>,
    settings: &'a Settings,
}

impl<'a, T: Transport + ?Sized, S: Sleeper> JobPoller<'a, T, S> {
    pub fn new(transport: &'a T, retry: &'a RetryExecutor<S>, settings: &'a Settings) -> Self {
        Self {
            transport,
            retry,
            settings,
        }
    }

    pub fn run(
        &self,
        request: &MappingRequest,
        cancel: &CancellationToken,
    ) -> Result<String, RetrieverError> {
        let mut job = self.submit(request, cancel)?;
        let max_polls = self.settings.polling.max_polls.max(1);

        for poll in 1..=max_polls {
            cancel.check()?;
            let state = self.poll(&mut job, cancel)?;
            job.advance(state)?;
            match state {
                JobState::Submitted | JobState::Running => {
                    info!("job {} still running, waiting...", job.job_id);
                    if poll < max_polls {
                        self.retry
                            .sleeper()
                            .sleep(self.settings.polling.interval, cancel)?;
                    }
                }
                JobState::Complete => {
                    let payload = self.fetch_results(&mut job, cancel)?;
                    info!("ID mapping job {} completed", job.job_id);
                    return Ok(payload);
                }
                JobState::Failed => {
                    return Err(job.fail("server reported job failure".to_string()));
                }
            }
        }

        error!(
            "ID mapping job {} did not finish after {max_polls} polls",
            job.job_id
        );
        Err(RetrieverError::JobTimedOut {
            job_id: job.job_id,
            polls: max_polls,
        })
    }

    pub fn submit(
        &self,
        request: &MappingRequest,
        cancel: &CancellationToken,
    ) -> Result<MappingJob, RetrieverError> {
        let ids = request
            .ids
            .iter()
            .map(Identifier::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let form = vec![
            ("ids".to_string(), ids),
            ("from".to_string(), request.from_db.clone()),
            ("to".to_string(), request.to_db.clone()),
        ];
        let http = HttpRequest::post_form(
            format!("{}/idmapping/run", self.settings.base_url),
            form,
            self.settings.timeouts.submit,
        );

        info!("submitting ID mapping job for {} ids", request.ids.len());
        let response = match self
            .retry
            .send(self.transport, &http, "ID mapping submission", cancel)
        {
            Ok(Some(response)) => response,
            Ok(None) => {
                return Err(RetrieverError::JobSubmissionFailed(
                    "submission endpoint returned 404".to_string(),
                ));
            }
            Err(RetrieverError::Cancelled) => return Err(RetrieverError::Cancelled),
            Err(err) => return Err(RetrieverError::JobSubmissionFailed(err.to_string())),
        };

        let body = response
            .json()
            .map_err(|err| RetrieverError::JobSubmissionFailed(err.to_string()))?;
        let job_id = body
            .get("jobId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                RetrieverError::JobSubmissionFailed("response has no jobId".to_string())
            })?;
        info!("job submitted: {job_id}");
        Ok(MappingJob::submitted(job_id))
    }

    fn poll(
        &self,
        job: &mut MappingJob,
        cancel: &CancellationToken,
    ) -> Result<JobState, RetrieverError> {
        let http = HttpRequest::get(
            format!("{}/idmapping/status/{}", self.settings.base_url, job.job_id),
            self.settings.timeouts.poll,
        );
        let label = format!("status of job {}", job.job_id);
        match self.retry.send(self.transport, &http, &label, cancel) {
            Ok(Some(response)) => {
                let body = response.json().map_err(|err| job.fail(err.to_string()))?;
                Ok(JobState::from_status_body(&body))
            }
            Ok(None) => Err(job.fail("status endpoint returned 404".to_string())),
            Err(RetrieverError::Cancelled) => Err(RetrieverError::Cancelled),
            Err(err) => Err(job.fail(format!("status check failed: {err}"))),
        }
    }

    fn fetch_results(
        &self,
        job: &mut MappingJob,
        cancel: &CancellationToken,
    ) -> Result<String, RetrieverError> {
        let http = HttpRequest::get(
            format!("{}/idmapping/results/{}", self.settings.base_url, job.job_id),
            self.settings.timeouts.results,
        )
        .with_query("format", RESULTS_FORMAT.as_str());
        let label = format!("results of job {}", job.job_id);
        match self.retry.send(self.transport, &http, &label, cancel) {
            Ok(Some(response)) => Ok(response.body),
            Ok(None) => Err(job.fail("results endpoint returned 404".to_string())),
            Err(RetrieverError::Cancelled) => Err(RetrieverError::Cancelled),
            Err(err) => Err(job.fail(format!("failed to retrieve results: {err}"))),
        }
    }
}
