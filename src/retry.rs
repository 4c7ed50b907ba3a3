use std::time::Duration;

use tracing::{debug, error, warn};

use crate::error::{FailureCause, RetrieverError};
use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::wait::{CancellationToken, Sleeper};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Pause after failed attempt `attempt` (0-indexed): `base * 2^attempt`.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let factor = 2u32.saturating_pow(u32::try_from(attempt).unwrap_or(u32::MAX));
        self.base_delay.saturating_mul(factor)
    }
}

#[derive(Debug)]
pub enum Outcome {
    Success(HttpResponse),
    NotFound,
    Rejected(u16),
    Retryable(FailureCause),
}

pub fn classify(result: Result<HttpResponse, TransportError>) -> Outcome {
    match result {
        Ok(resp) if resp.is_success() => Outcome::Success(resp),
        Ok(resp) if resp.status == 404 => Outcome::NotFound,
        Ok(resp) if is_retryable_status(resp.status) => {
            Outcome::Retryable(FailureCause::Status(resp.status))
        }
        Ok(resp) => Outcome::Rejected(resp.status),
        Err(err) => Outcome::Retryable(FailureCause::Transport(err.0)),
    }
}

fn is_retryable_status(status: u16) -> bool {
    !(400..500).contains(&status) || matches!(status, 408 | 429)
}

pub struct RetryExecutor<S> {
    policy: RetryPolicy,
    sleeper: S,
}

impl<S: Sleeper> RetryExecutor<S> {
    pub fn new(policy: RetryPolicy, sleeper: S) -> Self {
        Self { policy, sleeper }
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    pub fn send<T: Transport + ?Sized>(
        &self,
        transport: &T,
        request: &HttpRequest,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<HttpResponse>, RetrieverError> {
        self.execute(label, &request.url, cancel, || transport.send(request))
    }

    pub fn execute<F>(
        &self,
        label: &str,
        url: &str,
        cancel: &CancellationToken,
        mut make_req: F,
    ) -> Result<Option<HttpResponse>, RetrieverError>
    where
        F: FnMut() -> Result<HttpResponse, TransportError>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last = FailureCause::Transport("no attempt made".to_string());
        for attempt in 0..max_attempts {
            cancel.check()?;
            match classify(make_req()) {
                Outcome::Success(resp) => {
                    debug!(label, attempt = attempt + 1, status = resp.status, "request succeeded");
                    return Ok(Some(resp));
                }
                Outcome::NotFound => {
                    warn!("{label}: not found ({url})");
                    return Ok(None);
                }
                Outcome::Rejected(status) => {
                    error!("{label}: rejected with status {status}, not retrying");
                    return Err(RetrieverError::RequestRejected {
                        status,
                        url: url.to_string(),
                    });
                }
                Outcome::Retryable(cause) => {
                    warn!(
                        "attempt {}/{} failed for {label}: {cause}",
                        attempt + 1,
                        max_attempts
                    );
                    last = cause;
                    if attempt + 1 < max_attempts {
                        self.sleeper.sleep(self.policy.delay_for(attempt), cancel)?;
                    }
                }
            }
        }
        error!("failed to retrieve {label} after {max_attempts} attempts");
        Err(RetrieverError::RetriesExhausted {
            label: label.to_string(),
            attempts: max_attempts,
            last,
        })
    }
}
