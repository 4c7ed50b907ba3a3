use std::fs;

use camino::Utf8Path;

use crate::domain::Identifier;
use crate::error::RetrieverError;

pub fn read_identifiers(path: &Utf8Path) -> Result<Vec<Identifier>, RetrieverError> {
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|err| RetrieverError::Filesystem(format!("read {path}: {err}")))?;
    parse_identifier_list(&content)
}

pub fn parse_identifier_list(content: &str) -> Result<Vec<Identifier>, RetrieverError> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::parse)
        .collect()
}
