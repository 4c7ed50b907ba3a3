//! Search query assembly.
//!
//! Clauses have the shape `field:value`; filters are appended with ` AND `
//! and multi-value lists are joined with ` OR `.

use crate::domain::{Identifier, ProteomeId};
use crate::error::RetrieverError;

pub const HUMAN_TAXON_ID: u32 = 9606;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilters {
    pub organism: Option<String>,
    pub reviewed_only: bool,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            organism: None,
            reviewed_only: true,
        }
    }
}

pub fn organism_clause(organism: &str) -> String {
    let trimmed = organism.trim();
    match trimmed.to_lowercase().as_str() {
        "human" | "homo sapiens" => format!("organism_id:{HUMAN_TAXON_ID}"),
        _ => format!("organism:{trimmed}"),
    }
}

pub fn any_of(field: &str, values: &[Identifier]) -> Result<String, RetrieverError> {
    if values.is_empty() {
        return Err(RetrieverError::InvalidQuery(format!(
            "no values given for {field}"
        )));
    }
    if let Some(value) = values
        .iter()
        .find(|value| value.as_str().contains([':', '(', ')', '"']))
    {
        return Err(RetrieverError::InvalidQuery(format!(
            "{field} value {value} contains query syntax"
        )));
    }
    Ok(values
        .iter()
        .map(|value| format!("{field}:{value}"))
        .collect::<Vec<_>>()
        .join(" OR "))
}

pub fn accession_query(ids: &[Identifier]) -> Result<String, RetrieverError> {
    any_of("accession", ids)
}

pub fn gene_query(genes: &[Identifier]) -> Result<String, RetrieverError> {
    any_of("gene", genes)
}

pub fn proteome_query(id: &ProteomeId) -> String {
    format!("proteome:{id}")
}

/// Appends organism and reviewed-status clauses to `query`.
///
/// A top-level disjunction is parenthesized first so the filters apply to
/// every alternative, not only the last one.
pub fn with_filters(query: &str, filters: &SearchFilters) -> Result<String, RetrieverError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(RetrieverError::InvalidQuery("empty query".to_string()));
    }
    let organism = filters
        .organism
        .as_deref()
        .filter(|organism| !organism.trim().is_empty());
    let has_filters = organism.is_some() || filters.reviewed_only;

    let mut full = if has_filters && query.contains(" OR ") && !is_wrapped(query) {
        format!("({query})")
    } else {
        query.to_string()
    };
    if let Some(organism) = organism {
        full.push_str(" AND ");
        full.push_str(&organism_clause(organism));
    }
    if filters.reviewed_only {
        full.push_str(" AND reviewed:true");
    }
    Ok(full)
}

fn is_wrapped(query: &str) -> bool {
    if !(query.starts_with('(') && query.ends_with(')')) {
        return false;
    }
    let mut depth = 0usize;
    for (idx, ch) in query.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 && idx + 1 < query.len() {
                    return false;
                }
            }
            _ => {}
        }
    }
    true
}
