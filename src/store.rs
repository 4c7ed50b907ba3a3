use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;
use tracing::info;

use crate::error::RetrieverError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
    Payload,
    File(Utf8PathBuf),
    Both(Utf8PathBuf),
}

impl OutputSink {
    pub fn path(&self) -> Option<&Utf8Path> {
        match self {
            OutputSink::Payload => None,
            OutputSink::File(path) | OutputSink::Both(path) => Some(path),
        }
    }

    pub fn wants_payload(&self) -> bool {
        !matches!(self, OutputSink::File(_))
    }

    pub fn deliver(
        &self,
        payload: String,
    ) -> Result<(Option<String>, Option<Utf8PathBuf>), RetrieverError> {
        let written = match self.path() {
            Some(path) => {
                write_payload(path, &payload)?;
                Some(path.to_path_buf())
            }
            None => None,
        };
        let payload = self.wants_payload().then_some(payload);
        Ok((payload, written))
    }
}

/// Writes `payload` verbatim, replacing `path` atomically.
pub fn write_payload(path: &Utf8Path, payload: &str) -> Result<(), RetrieverError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| RetrieverError::Filesystem(err.to_string()))?;

    let mut tmp = Builder::new()
        .prefix(".kira-uniprot")
        .suffix(".tmp")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| RetrieverError::Filesystem(err.to_string()))?;
    tmp.write_all(payload.as_bytes())
        .map_err(|err| RetrieverError::Filesystem(err.to_string()))?;
    tmp.flush()
        .map_err(|err| RetrieverError::Filesystem(err.to_string()))?;
    tmp.persist(path.as_std_path())
        .map_err(|err| RetrieverError::Filesystem(format!("persist {path}: {}", err.error)))?;

    info!("results saved to {path}");
    Ok(())
}

pub fn read_payload(path: &Utf8Path) -> Result<String, RetrieverError> {
    fs::read_to_string(path.as_std_path())
        .map_err(|err| RetrieverError::Filesystem(format!("read {path}: {err}")))
}
