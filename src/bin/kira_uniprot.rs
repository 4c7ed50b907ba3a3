use std::fs::OpenOptions;
use std::process::ExitCode;
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser};
use miette::IntoDiagnostic;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use kira_uniprot::config::ConfigLoader;
use kira_uniprot::domain::{OutputFormat, parse_identifiers};
use kira_uniprot::engine::{DEFAULT_SEARCH_LIMIT, Retriever};
use kira_uniprot::error::RetrieverError;
use kira_uniprot::input::read_identifiers;
use kira_uniprot::mapping::{DEFAULT_FROM_DB, DEFAULT_TO_DB, MappingRequest};
use kira_uniprot::output::{JsonOutput, RunReport, TextOutput};
use kira_uniprot::query::SearchFilters;
use kira_uniprot::request::{RequestKind, RequestSpec};
use kira_uniprot::store::OutputSink;
use kira_uniprot::transport::HttpTransport;

#[derive(Parser)]
#[command(name = "kira-uniprot")]
#[command(about = "Retrieve protein sequences and annotations from UniProt")]
#[command(version, author)]
struct Cli {
    #[command(flatten)]
    input: InputArgs,

    #[arg(long, help = "Organism filter (e.g. human, Mus musculus)")]
    organism: Option<String>,

    #[arg(long, help = "Include unreviewed (TrEMBL) entries")]
    unreviewed: bool,

    #[arg(short, long, help = "Output file path")]
    output: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Fasta)]
    format: OutputFormat,

    #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT, help = "Maximum number of search results")]
    limit: usize,

    #[arg(long, default_value = DEFAULT_FROM_DB, help = "Source database for --map")]
    from: String,

    #[arg(long, default_value = DEFAULT_TO_DB, help = "Target database for --map")]
    to: String,

    #[arg(long, help = "Contact email sent in the User-Agent")]
    email: Option<String>,

    #[arg(long)]
    config: Option<String>,

    #[arg(long, help = "Also append logs to this file")]
    log_file: Option<String>,

    #[arg(long, help = "Print the run report as JSON")]
    json: bool,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct InputArgs {
    #[arg(long, num_args = 1.., help = "UniProt accession(s)")]
    ids: Option<Vec<String>>,

    #[arg(long, help = "File containing UniProt accessions, one per line")]
    input: Option<String>,

    #[arg(long, num_args = 1.., help = "Gene name(s)")]
    genes: Option<Vec<String>>,

    #[arg(long, help = "Custom UniProt query")]
    query: Option<String>,

    #[arg(long, help = "Proteome id (e.g. UP000005640)")]
    proteome: Option<String>,

    #[arg(long = "map", num_args = 1.., help = "Identifiers to map between databases")]
    map: Option<Vec<String>>,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            if let Some(err) = report.downcast_ref::<RetrieverError>() {
                return ExitCode::from(map_exit_code(err));
            }
            ExitCode::from(1)
        }
    }
}

fn map_exit_code(error: &RetrieverError) -> u8 {
    match error {
        RetrieverError::NotFound { .. }
        | RetrieverError::InvalidIdentifier(_)
        | RetrieverError::InvalidProteomeId(_)
        | RetrieverError::InvalidFormat(_)
        | RetrieverError::InvalidQuery(_)
        | RetrieverError::ConfigRead(_)
        | RetrieverError::ConfigParse(_) => 2,
        RetrieverError::JobSubmissionFailed(_)
        | RetrieverError::JobFailed { .. }
        | RetrieverError::JobTimedOut { .. } => 3,
        RetrieverError::Cancelled => 130,
        err if err.is_network() => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref())?;

    let mut settings = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(email) = &cli.email {
        settings.contact_email = email.clone();
    }

    let spec = build_request(&cli)?;
    let transport = HttpTransport::new(&settings.contact_email)?;
    let retriever = Retriever::new(transport, settings);
    info!(
        "initialized UniProt retriever (contact: {})",
        retriever.settings().contact_email
    );

    let cancel = retriever.cancellation().clone();
    ctrlc::set_handler(move || {
        warn!("interrupt received, stopping after the current request");
        cancel.cancel();
    })
    .into_diagnostic()?;

    let sink = OutputSink::File(Utf8PathBuf::from(cli.output.as_str()));
    let retrieval = retriever.execute(&spec, &sink)?;
    let report = RunReport::new(spec.operation(), spec.format(), retrieval.as_ref());
    if cli.json {
        JsonOutput::print_report(&report).into_diagnostic()?;
    } else {
        TextOutput::print_report(&report).into_diagnostic()?;
    }

    let code = match &retrieval {
        None => 2,
        Some(r) if !r.complete && r.pages == 0 => 3,
        Some(r) if !r.complete => 4,
        Some(_) => {
            info!("retrieval complete, results saved to: {}", cli.output);
            0
        }
    };
    Ok(ExitCode::from(code))
}

fn init_tracing(log_file: Option<&str>) -> Result<(), RetrieverError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| RetrieverError::Filesystem(format!("open {path}: {err}")))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(std::io::stderr.and(Mutex::new(file)))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn build_request(cli: &Cli) -> Result<RequestSpec, RetrieverError> {
    let reviewed_only = !cli.unreviewed;
    let input = &cli.input;

    let kind = if let Some(ids) = &input.ids {
        let mut ids = parse_identifiers(ids)?;
        if ids.len() == 1 {
            RequestKind::Single(ids.remove(0))
        } else {
            RequestKind::Accessions(ids)
        }
    } else if let Some(path) = &input.input {
        let ids = read_identifiers(Utf8Path::new(path))?;
        info!("read {} ids from {path}", ids.len());
        RequestKind::Accessions(ids)
    } else if let Some(genes) = &input.genes {
        RequestKind::Genes {
            genes: parse_identifiers(genes)?,
            organism: cli
                .organism
                .clone()
                .unwrap_or_else(|| "human".to_string()),
        }
    } else if let Some(query) = &input.query {
        RequestKind::Search {
            query: query.clone(),
            filters: SearchFilters {
                organism: cli.organism.clone(),
                reviewed_only,
            },
        }
    } else if let Some(proteome) = &input.proteome {
        RequestKind::Proteome {
            id: proteome.parse()?,
            reviewed_only,
        }
    } else if let Some(ids) = &input.map {
        RequestKind::Mapping(MappingRequest {
            ids: parse_identifiers(ids)?,
            from_db: cli.from.clone(),
            to_db: cli.to.clone(),
        })
    } else {
        return Err(RetrieverError::InvalidQuery("no input given".to_string()));
    };

    Ok(RequestSpec::new(kind, cli.format).with_limit(cli.limit))
}
