use std::io::{self, Write};

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::domain::OutputFormat;
use crate::engine::Retrieval;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub operation: String,
    pub format: OutputFormat,
    pub found: bool,
    pub output: Option<Utf8PathBuf>,
    pub entries: usize,
    pub pages: usize,
    pub complete: bool,
    pub diagnostic: Option<String>,
    pub finished_at: String,
}

impl RunReport {
    pub fn new(operation: &str, format: OutputFormat, retrieval: Option<&Retrieval>) -> Self {
        Self {
            operation: operation.to_string(),
            format,
            found: retrieval.is_some(),
            output: retrieval.and_then(|r| r.written_to.clone()),
            entries: retrieval.map(|r| r.entries).unwrap_or(0),
            pages: retrieval.map(|r| r.pages).unwrap_or(0),
            complete: retrieval.is_some_and(|r| r.complete),
            diagnostic: retrieval.and_then(|r| r.diagnostic.clone()),
            finished_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &RunReport) -> io::Result<()> {
        let json = serde_json::to_string_pretty(report).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_report(report: &RunReport) -> io::Result<()> {
        let mut stdout = io::stdout();
        let status = match (report.found, report.complete) {
            (false, _) => "not found",
            (true, true) => "complete",
            (true, false) => "incomplete",
        };
        writeln!(
            stdout,
            "{}: {} entries in {} pages ({status})",
            report.operation, report.entries, report.pages
        )?;
        if let Some(path) = &report.output {
            writeln!(stdout, "results saved to: {path}")?;
        }
        if let Some(diagnostic) = &report.diagnostic {
            writeln!(stdout, "warning: {diagnostic}")?;
        }
        Ok(())
    }
}
