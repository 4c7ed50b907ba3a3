use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::RetrieverError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Fasta,
    Json,
    Tsv,
    Xml,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Fasta => "fasta",
            OutputFormat::Json => "json",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Xml => "xml",
        }
    }

    /// Only used to enforce result limits; the page itself is never parsed.
    pub fn count_entries(&self, page: &str) -> usize {
        match self {
            OutputFormat::Fasta => page.lines().filter(|line| line.starts_with('>')).count(),
            OutputFormat::Tsv => page
                .lines()
                .filter(|line| !line.trim().is_empty())
                .count()
                .saturating_sub(1),
            OutputFormat::Json => page.matches("\"primaryAccession\"").count(),
            OutputFormat::Xml => page
                .match_indices("<entry")
                .filter(|(idx, _)| {
                    page[idx + "<entry".len()..]
                        .chars()
                        .next()
                        .is_some_and(|ch| ch == ' ' || ch == '>')
                })
                .count(),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = RetrieverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "fasta" => Ok(OutputFormat::Fasta),
            "json" => Ok(OutputFormat::Json),
            "tsv" => Ok(OutputFormat::Tsv),
            "xml" => Ok(OutputFormat::Xml),
            _ => Err(RetrieverError::InvalidFormat(value.to_string())),
        }
    }
}

/// Accession, gene name or foreign-database id such as `HGNC:5`.
///
/// Commas are rejected because mapping jobs submit ids comma-joined.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier(String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Identifier {
    type Err = RetrieverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid = !trimmed.is_empty()
            && !trimmed
                .chars()
                .any(|ch| ch.is_whitespace() || ch == ',');
        if !is_valid {
            return Err(RetrieverError::InvalidIdentifier(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProteomeId(String);

impl ProteomeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProteomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProteomeId {
    type Err = RetrieverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        let digits = normalized.strip_prefix("UP").unwrap_or("");
        let is_valid = !digits.is_empty() && digits.chars().all(|ch| ch.is_ascii_digit());
        if !is_valid {
            return Err(RetrieverError::InvalidProteomeId(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

pub fn parse_identifiers<S: AsRef<str>>(values: &[S]) -> Result<Vec<Identifier>, RetrieverError> {
    values
        .iter()
        .map(|value| value.as_ref().parse())
        .collect()
}
