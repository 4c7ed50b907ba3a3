use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use crate::domain::OutputFormat;
use crate::error::RetrieverError;
use crate::retry::RetryExecutor;
use crate::transport::{HttpRequest, Transport};
use crate::wait::{CancellationToken, Sleeper};

static NEXT_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<([^>]*)>[^<]*?;\s*rel\s*=\s*"?next\b"#).expect("valid link regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub body: String,
    pub next: Option<String>,
}

#[derive(Debug, Default)]
pub struct AggregatedResult {
    pub pages: Vec<Page>,
    pub entries: usize,
    pub complete: bool,
    pub failure: Option<RetrieverError>,
}

impl AggregatedResult {
    pub fn payload(&self) -> String {
        self.pages
            .iter()
            .map(|page| page.body.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn push(&mut self, page: Page, format: OutputFormat) {
        self.entries += format.count_entries(&page.body);
        self.pages.push(page);
    }
}

/// Continuation URL from a `Link` header, if one link value is marked `rel="next"`.
///
/// Link values are delimited by `<`, so cursor URLs may contain commas.
pub fn extract_next_link(header: &str) -> Option<String> {
    NEXT_LINK
        .captures(header)
        .map(|caps| caps[1].trim().to_string())
        .filter(|url| !url.is_empty())
}

pub struct Paginator<'a, T: ?Sized, S> {
    transport: &'a T,
    retry: &'a RetryExecutor<S>,
}

impl<'a, T: Transport + ?Sized, S: Sleeper> Paginator<'a, T, S> {
    pub fn new(transport: &'a T, retry: &'a RetryExecutor<S>) -> Self {
        Self { transport, retry }
    }

    pub fn aggregate(
        &self,
        initial: HttpRequest,
        format: OutputFormat,
        limit: usize,
        label: &str,
        cancel: &CancellationToken,
    ) -> AggregatedResult {
        let mut result = AggregatedResult::default();
        let timeout = initial.timeout;
        let mut request = initial;

        loop {
            let page_label = format!("{label} page {}", result.pages.len() + 1);
            let response = match self.retry.send(self.transport, &request, &page_label, cancel) {
                Ok(Some(response)) => response,
                Ok(None) => {
                    return abort(
                        result,
                        RetrieverError::NotFound {
                            url: request.url.clone(),
                        },
                    );
                }
                Err(err) => return abort(result, err),
            };

            let next = response.header("link").and_then(extract_next_link);
            result.push(
                Page {
                    body: response.body,
                    next: next.clone(),
                },
                format,
            );
            info!(
                "{page_label}: {} entries so far (limit {limit})",
                result.entries
            );

            match next {
                Some(url) if result.entries < limit => {
                    request = HttpRequest::get(url, timeout);
                }
                Some(_) => {
                    info!("{label}: result limit {limit} reached, not following cursor");
                    break;
                }
                None => break,
            }
        }

        result.complete = true;
        result
    }
}

fn abort(mut result: AggregatedResult, err: RetrieverError) -> AggregatedResult {
    warn!(
        "pagination stopped after {} pages: {err}",
        result.pages.len()
    );
    result.complete = false;
    result.failure = Some(err);
    result
}
