use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::domain::{Identifier, OutputFormat, ProteomeId};
use crate::error::RetrieverError;
use crate::mapping::{JobPoller, MappingRequest};
use crate::paginate::Paginator;
use crate::query::{self, SearchFilters};
use crate::request::{RequestKind, RequestSpec};
use crate::retry::RetryExecutor;
use crate::store::OutputSink;
use crate::transport::{HttpRequest, Transport};
use crate::wait::{CancellationToken, Sleeper, ThreadSleeper};

pub const BATCH_LIMIT: usize = 500;
pub const PROTEOME_LIMIT: usize = 100_000;
pub const GENE_SEARCH_LIMIT: usize = 100;
pub const DEFAULT_SEARCH_LIMIT: usize = 500;

#[derive(Debug, Clone, Serialize)]
pub struct Retrieval {
    #[serde(skip)]
    pub payload: Option<String>,
    pub written_to: Option<Utf8PathBuf>,
    pub entries: usize,
    pub pages: usize,
    pub complete: bool,
    pub diagnostic: Option<String>,
}

pub struct Retriever<T, S = ThreadSleeper> {
    transport: T,
    retry: RetryExecutor<S>,
    settings: Settings,
    cancel: CancellationToken,
}

impl<T: Transport> Retriever<T, ThreadSleeper> {
    pub fn new(transport: T, settings: Settings) -> Self {
        Self::with_sleeper(transport, settings, ThreadSleeper)
    }
}

impl<T: Transport, S: Sleeper> Retriever<T, S> {
    pub fn with_sleeper(transport: T, settings: Settings, sleeper: S) -> Self {
        Self {
            transport,
            retry: RetryExecutor::new(settings.retry.clone(), sleeper),
            settings,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// `Ok(None)` only for a single entry that does not exist.
    pub fn execute(
        &self,
        spec: &RequestSpec,
        sink: &OutputSink,
    ) -> Result<Option<Retrieval>, RetrieverError> {
        let format = spec.format();
        match spec.kind() {
            RequestKind::Single(id) => self.fetch_single(id, format, sink),
            RequestKind::Accessions(ids) => self.fetch_batch(ids, format, sink).map(Some),
            RequestKind::Genes { genes, organism } => {
                self.fetch_by_genes(genes, organism, format, sink).map(Some)
            }
            RequestKind::Search { query, filters } => {
                let limit = spec.limit().unwrap_or(DEFAULT_SEARCH_LIMIT);
                self.search(query, filters, limit, format, sink).map(Some)
            }
            RequestKind::Proteome { id, reviewed_only } => self
                .fetch_proteome(id, *reviewed_only, format, sink)
                .map(Some),
            RequestKind::Mapping(request) => self
                .map_identifiers(&request.ids, &request.from_db, &request.to_db, sink)
                .map(Some),
        }
    }

    pub fn fetch_single(
        &self,
        id: &Identifier,
        format: OutputFormat,
        sink: &OutputSink,
    ) -> Result<Option<Retrieval>, RetrieverError> {
        let url = format!("{}/uniprotkb/{}.{}", self.settings.base_url, id, format);
        let request = HttpRequest::get(url, self.settings.timeouts.single);
        let label = format!("entry {id}");
        let Some(response) = self
            .retry
            .send(&self.transport, &request, &label, &self.cancel)?
        else {
            warn!("entry {id} not found");
            return Ok(None);
        };

        info!("successfully retrieved {id}");
        let entries = format.count_entries(&response.body);
        let (payload, written_to) = sink.deliver(response.body)?;
        Ok(Some(Retrieval {
            payload,
            written_to,
            entries,
            pages: 1,
            complete: true,
            diagnostic: None,
        }))
    }

    pub fn fetch_batch(
        &self,
        ids: &[Identifier],
        format: OutputFormat,
        sink: &OutputSink,
    ) -> Result<Retrieval, RetrieverError> {
        info!("retrieving {} protein sequences...", ids.len());
        let query = query::accession_query(ids)?;
        let retrieval = self.paginate(query, format, BATCH_LIMIT, "batch", sink)?;
        if retrieval.complete {
            info!("successfully retrieved {} entries", retrieval.entries);
        }
        Ok(retrieval)
    }

    pub fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        limit: usize,
        format: OutputFormat,
        sink: &OutputSink,
    ) -> Result<Retrieval, RetrieverError> {
        let full_query = query::with_filters(query, filters)?;
        info!("searching UniProt with query: {full_query}");
        let retrieval = self.paginate(full_query, format, limit, "search", sink)?;
        info!("retrieved {} protein entries", retrieval.entries);
        Ok(retrieval)
    }

    pub fn fetch_proteome(
        &self,
        id: &ProteomeId,
        reviewed_only: bool,
        format: OutputFormat,
        sink: &OutputSink,
    ) -> Result<Retrieval, RetrieverError> {
        info!("downloading proteome {id}...");
        let filters = SearchFilters {
            organism: None,
            reviewed_only,
        };
        self.search(
            &query::proteome_query(id),
            &filters,
            PROTEOME_LIMIT,
            format,
            sink,
        )
    }

    pub fn fetch_by_genes(
        &self,
        genes: &[Identifier],
        organism: &str,
        format: OutputFormat,
        sink: &OutputSink,
    ) -> Result<Retrieval, RetrieverError> {
        let filters = SearchFilters {
            organism: Some(organism.to_string()),
            reviewed_only: true,
        };
        self.search(
            &query::gene_query(genes)?,
            &filters,
            GENE_SEARCH_LIMIT,
            format,
            sink,
        )
    }

    pub fn map_identifiers(
        &self,
        ids: &[Identifier],
        from_db: &str,
        to_db: &str,
        sink: &OutputSink,
    ) -> Result<Retrieval, RetrieverError> {
        if ids.is_empty() {
            return Err(RetrieverError::InvalidQuery(
                "no identifiers to map".to_string(),
            ));
        }
        let request = MappingRequest {
            ids: ids.to_vec(),
            from_db: from_db.to_string(),
            to_db: to_db.to_string(),
        };
        let payload =
            JobPoller::new(&self.transport, &self.retry, &self.settings).run(&request, &self.cancel)?;

        info!("ID mapping completed successfully");
        let entries = OutputFormat::Fasta.count_entries(&payload);
        let (payload, written_to) = sink.deliver(payload)?;
        Ok(Retrieval {
            payload,
            written_to,
            entries,
            pages: 1,
            complete: true,
            diagnostic: None,
        })
    }

    fn paginate(
        &self,
        query: String,
        format: OutputFormat,
        limit: usize,
        label: &str,
        sink: &OutputSink,
    ) -> Result<Retrieval, RetrieverError> {
        let size = limit.clamp(1, self.settings.page_size.max(1));
        let request = HttpRequest::get(
            format!("{}/uniprotkb/search", self.settings.base_url),
            self.settings.timeouts.search,
        )
        .with_query("query", query)
        .with_query("format", format.as_str())
        .with_query("size", size.to_string());

        let result = Paginator::new(&self.transport, &self.retry).aggregate(
            request,
            format,
            limit,
            label,
            &self.cancel,
        );
        if matches!(result.failure, Some(RetrieverError::Cancelled)) {
            warn!("{label} cancelled after {} pages", result.pages.len());
            return Err(RetrieverError::Cancelled);
        }
        let diagnostic = result.failure.as_ref().map(|err| match result.pages.len() {
            0 => format!("{label} failed: {err}"),
            n => format!("{label} incomplete after {n} pages: {err}"),
        });

        if result.pages.is_empty() {
            if let Some(message) = &diagnostic {
                error!("{message}");
            }
            return Ok(Retrieval {
                payload: sink.wants_payload().then(String::new),
                written_to: None,
                entries: 0,
                pages: 0,
                complete: result.complete,
                diagnostic,
            });
        }

        let (payload, written_to) = sink.deliver(result.payload())?;
        Ok(Retrieval {
            payload,
            written_to,
            entries: result.entries,
            pages: result.pages.len(),
            complete: result.complete,
            diagnostic,
        })
    }
}
