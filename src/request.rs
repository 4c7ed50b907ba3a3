use crate::domain::{Identifier, OutputFormat, ProteomeId};
use crate::mapping::MappingRequest;
use crate::query::SearchFilters;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    Single(Identifier),
    Accessions(Vec<Identifier>),
    Genes {
        genes: Vec<Identifier>,
        organism: String,
    },
    Search {
        query: String,
        filters: SearchFilters,
    },
    Proteome {
        id: ProteomeId,
        reviewed_only: bool,
    },
    Mapping(MappingRequest),
}

impl RequestKind {
    pub fn operation(&self) -> &'static str {
        match self {
            RequestKind::Single(_) => "single",
            RequestKind::Accessions(_) => "batch",
            RequestKind::Genes { .. } => "genes",
            RequestKind::Search { .. } => "search",
            RequestKind::Proteome { .. } => "proteome",
            RequestKind::Mapping(_) => "id-mapping",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    kind: RequestKind,
    format: OutputFormat,
    limit: Option<usize>,
}

impl RequestSpec {
    pub fn new(kind: RequestKind, format: OutputFormat) -> Self {
        Self {
            kind,
            format,
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn kind(&self) -> &RequestKind {
        &self.kind
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn operation(&self) -> &'static str {
        self.kind.operation()
    }
}
