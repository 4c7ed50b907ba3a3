#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use kira_uniprot::config::Settings;
use kira_uniprot::error::RetrieverError;
use kira_uniprot::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use kira_uniprot::wait::{CancellationToken, Sleeper};

pub const BASE_URL: &str = "https://rest.test";

pub fn settings() -> Settings {
    Settings {
        base_url: BASE_URL.to_string(),
        ..Settings::default()
    }
}

/// Replays canned responses in order and records every request it saw.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<HttpResponse, TransportError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError("script exhausted".to_string())))
    }
}

/// Records requested pauses instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration, cancel: &CancellationToken) -> Result<(), RetrieverError> {
        cancel.check()?;
        self.sleeps.lock().unwrap().push(duration);
        Ok(())
    }
}

pub fn ok(body: &str) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse::new(200, body))
}

pub fn status(code: u16) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse::new(code, "error"))
}

pub fn network_error() -> Result<HttpResponse, TransportError> {
    Err(TransportError("connection reset by peer".to_string()))
}

pub fn page(body: &str, next: Option<&str>) -> Result<HttpResponse, TransportError> {
    let response = HttpResponse::new(200, body);
    Ok(match next {
        Some(url) => response.with_header("Link", format!("<{url}>; rel=\"next\"")),
        None => response,
    })
}

pub fn fasta(accessions: &[&str]) -> String {
    accessions
        .iter()
        .map(|acc| format!(">sp|{acc}|TEST_HUMAN Test protein\nMKV"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn secs(values: &[u64]) -> Vec<Duration> {
    values.iter().copied().map(Duration::from_secs).collect()
}

/// Trips `token` the first time anything waits, as an interrupt arriving mid-sleep would.
pub struct CancellingSleeper {
    token: CancellationToken,
}

impl CancellingSleeper {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl Sleeper for CancellingSleeper {
    fn sleep(&self, _duration: Duration, cancel: &CancellationToken) -> Result<(), RetrieverError> {
        self.token.cancel();
        cancel.check()
    }
}
