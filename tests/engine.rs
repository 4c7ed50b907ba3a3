mod support;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use kira_uniprot::domain::{Identifier, OutputFormat, ProteomeId, parse_identifiers};
use kira_uniprot::engine::Retriever;
use kira_uniprot::error::RetrieverError;
use kira_uniprot::mapping::MappingRequest;
use kira_uniprot::query::SearchFilters;
use kira_uniprot::request::{RequestKind, RequestSpec};
use kira_uniprot::store::{OutputSink, read_payload};
use kira_uniprot::wait::CancellationToken;

use support::{
    CancellingSleeper, RecordingSleeper, ScriptedTransport, fasta, ok, page, settings, status,
};

fn utf8_dir(temp: &tempfile::TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap()
}

fn id(value: &str) -> Identifier {
    value.parse().unwrap()
}

#[test]
fn single_fetch_missing_entry_is_absent() {
    let transport = ScriptedTransport::new(vec![status(404)]);
    let sleeper = RecordingSleeper::default();
    let retriever = Retriever::with_sleeper(&transport, settings(), &sleeper);

    let result = retriever
        .fetch_single(&id("P00000"), OutputFormat::Fasta, &OutputSink::Payload)
        .unwrap();

    assert!(result.is_none());
    assert_eq!(transport.calls(), 1);
    assert_eq!(
        transport.requests()[0].url,
        "https://rest.test/uniprotkb/P00000.fasta"
    );
}

#[test]
fn single_fetch_writes_and_returns_payload() {
    let temp = tempfile::tempdir().unwrap();
    let path = utf8_dir(&temp).join("nucleolin.fasta");
    let body = fasta(&["P19338"]);
    let transport = ScriptedTransport::new(vec![status(503), ok(&body)]);
    let sleeper = RecordingSleeper::default();
    let retriever = Retriever::with_sleeper(&transport, settings(), &sleeper);

    let result = retriever
        .fetch_single(&id("P19338"), OutputFormat::Fasta, &OutputSink::Both(path.clone()))
        .unwrap()
        .unwrap();

    assert_eq!(result.payload.as_deref(), Some(body.as_str()));
    assert_eq!(result.written_to.as_ref(), Some(&path));
    assert_eq!(result.entries, 1);
    assert!(result.complete);
    assert_eq!(read_payload(&path).unwrap(), body);
}

#[test]
fn single_fetch_exhaustion_is_an_error() {
    let transport = ScriptedTransport::new((0..5).map(|_| status(500)).collect());
    let sleeper = RecordingSleeper::default();
    let retriever = Retriever::with_sleeper(&transport, settings(), &sleeper);

    let err = retriever
        .fetch_single(&id("P19338"), OutputFormat::Json, &OutputSink::Payload)
        .unwrap_err();

    assert_matches!(err, RetrieverError::RetriesExhausted { attempts: 5, .. });
}

#[test]
fn batch_builds_disjunctive_accession_query() {
    let transport = ScriptedTransport::new(vec![ok(&fasta(&["P19338", "P09651", "Q9H2U1"]))]);
    let sleeper = RecordingSleeper::default();
    let retriever = Retriever::with_sleeper(&transport, settings(), &sleeper);
    let ids = parse_identifiers(&["P19338", "P09651", "Q9H2U1"]).unwrap();

    let result = retriever
        .fetch_batch(&ids, OutputFormat::Fasta, &OutputSink::Payload)
        .unwrap();

    assert!(result.complete);
    assert_eq!(result.entries, 3);
    let request = &transport.requests()[0];
    assert_eq!(request.url, "https://rest.test/uniprotkb/search");
    assert_eq!(
        request.query_value("query"),
        Some("accession:P19338 OR accession:P09651 OR accession:Q9H2U1")
    );
    assert_eq!(request.query_value("format"), Some("fasta"));
    assert_eq!(request.query_value("size"), Some("500"));
}

#[test]
fn batch_of_nothing_is_rejected_before_any_request() {
    let transport = ScriptedTransport::default();
    let sleeper = RecordingSleeper::default();
    let retriever = Retriever::with_sleeper(&transport, settings(), &sleeper);

    let err = retriever
        .fetch_batch(&[], OutputFormat::Fasta, &OutputSink::Payload)
        .unwrap_err();

    assert_matches!(err, RetrieverError::InvalidQuery(_));
    assert_eq!(transport.calls(), 0);
}

#[test]
fn search_applies_filters_and_page_size() {
    let transport = ScriptedTransport::new(vec![ok(&fasta(&["P19338"]))]);
    let sleeper = RecordingSleeper::default();
    let retriever = Retriever::with_sleeper(&transport, settings(), &sleeper);
    let filters = SearchFilters {
        organism: Some("Homo sapiens".to_string()),
        reviewed_only: true,
    };

    retriever
        .search("annotation:(type:rna-bind)", &filters, 50, OutputFormat::Fasta, &OutputSink::Payload)
        .unwrap();

    let request = &transport.requests()[0];
    assert_eq!(
        request.query_value("query"),
        Some("annotation:(type:rna-bind) AND organism_id:9606 AND reviewed:true")
    );
    assert_eq!(request.query_value("size"), Some("50"));
}

#[test]
fn gene_lookup_scopes_filters_over_all_genes() {
    let transport = ScriptedTransport::new(vec![ok(&fasta(&["P19338", "P35637"]))]);
    let sleeper = RecordingSleeper::default();
    let retriever = Retriever::with_sleeper(&transport, settings(), &sleeper);
    let genes = parse_identifiers(&["NCL", "FUS"]).unwrap();

    let result = retriever
        .fetch_by_genes(&genes, "Mus musculus", OutputFormat::Fasta, &OutputSink::Payload)
        .unwrap();

    assert_eq!(result.entries, 2);
    let request = &transport.requests()[0];
    assert_eq!(
        request.query_value("query"),
        Some("(gene:NCL OR gene:FUS) AND organism:Mus musculus AND reviewed:true")
    );
    assert_eq!(request.query_value("size"), Some("100"));
}

#[test]
fn proteome_download_follows_every_page() {
    let transport = ScriptedTransport::new(vec![
        page(&fasta(&["P1"]), Some("https://rest.test/uniprotkb/search?cursor=1")),
        page(&fasta(&["P2"]), Some("https://rest.test/uniprotkb/search?cursor=2")),
        page(&fasta(&["P3"]), None),
    ]);
    let sleeper = RecordingSleeper::default();
    let retriever = Retriever::with_sleeper(&transport, settings(), &sleeper);
    let proteome: ProteomeId = "up000005640".parse().unwrap();

    let result = retriever
        .fetch_proteome(&proteome, true, OutputFormat::Fasta, &OutputSink::Payload)
        .unwrap();

    assert!(result.complete);
    assert_eq!(result.pages, 3);
    assert_eq!(
        result.payload.as_deref(),
        Some([fasta(&["P1"]), fasta(&["P2"]), fasta(&["P3"])].join("\n").as_str())
    );
    assert_eq!(
        transport.requests()[0].query_value("query"),
        Some("proteome:UP000005640 AND reviewed:true")
    );
}

#[test]
fn failed_search_returns_empty_incomplete_result_without_writing() {
    let temp = tempfile::tempdir().unwrap();
    let path = utf8_dir(&temp).join("out.fasta");
    let transport = ScriptedTransport::new(vec![status(400)]);
    let sleeper = RecordingSleeper::default();
    let retriever = Retriever::with_sleeper(&transport, settings(), &sleeper);

    let result = retriever
        .search(
            "gene:NCL",
            &SearchFilters::default(),
            10,
            OutputFormat::Fasta,
            &OutputSink::Both(path.clone()),
        )
        .unwrap();

    assert!(!result.complete);
    assert_eq!(result.pages, 0);
    assert_eq!(result.payload.as_deref(), Some(""));
    assert!(result.written_to.is_none());
    assert!(result.diagnostic.unwrap().contains("400"));
    assert!(!path.as_std_path().exists());
}

#[test]
fn partial_search_is_written_and_flagged() {
    let temp = tempfile::tempdir().unwrap();
    let path = utf8_dir(&temp).join("partial.fasta");
    let transport = ScriptedTransport::new(vec![
        page(&fasta(&["P1"]), Some("https://rest.test/uniprotkb/search?cursor=1")),
        status(404),
    ]);
    let sleeper = RecordingSleeper::default();
    let retriever = Retriever::with_sleeper(&transport, settings(), &sleeper);

    let result = retriever
        .search(
            "gene:NCL",
            &SearchFilters::default(),
            1000,
            OutputFormat::Fasta,
            &OutputSink::File(path.clone()),
        )
        .unwrap();

    assert!(!result.complete);
    assert!(result.payload.is_none());
    assert_eq!(result.pages, 1);
    assert!(result.diagnostic.is_some());
    assert_eq!(read_payload(&path).unwrap(), fasta(&["P1"]));
}

#[test]
fn execute_dispatches_mapping_requests() {
    let temp = tempfile::tempdir().unwrap();
    let path = utf8_dir(&temp).join("mapped.fasta");
    let transport = ScriptedTransport::new(vec![
        ok(r#"{"jobId": "m1"}"#),
        ok(r#"{"jobStatus": "RUNNING"}"#),
        ok(r#"{"results": []}"#),
        ok(&fasta(&["P19338"])),
    ]);
    let sleeper = RecordingSleeper::default();
    let retriever = Retriever::with_sleeper(&transport, settings(), &sleeper);
    let spec = RequestSpec::new(
        RequestKind::Mapping(MappingRequest {
            ids: parse_identifiers(&["NCL"]).unwrap(),
            from_db: "Gene_Name".to_string(),
            to_db: "UniProtKB".to_string(),
        }),
        OutputFormat::Fasta,
    );

    let result = retriever
        .execute(&spec, &OutputSink::File(path.clone()))
        .unwrap()
        .unwrap();

    assert_eq!(spec.operation(), "id-mapping");
    assert!(result.complete);
    assert_eq!(result.entries, 1);
    assert_eq!(read_payload(&path).unwrap(), fasta(&["P19338"]));
    assert_eq!(sleeper.sleeps(), support::secs(&[3]));
}

#[test]
fn execute_uses_request_limit_for_searches() {
    let transport = ScriptedTransport::new(vec![ok(&fasta(&["P1"]))]);
    let sleeper = RecordingSleeper::default();
    let retriever = Retriever::with_sleeper(&transport, settings(), &sleeper);
    let spec = RequestSpec::new(
        RequestKind::Search {
            query: "reviewed:true AND organism_id:9606".to_string(),
            filters: SearchFilters {
                organism: None,
                reviewed_only: false,
            },
        },
        OutputFormat::Tsv,
    )
    .with_limit(25);

    retriever.execute(&spec, &OutputSink::Payload).unwrap();

    let request = &transport.requests()[0];
    assert_eq!(
        request.query_value("query"),
        Some("reviewed:true AND organism_id:9606")
    );
    assert_eq!(request.query_value("size"), Some("25"));
    assert_eq!(request.query_value("format"), Some("tsv"));
}

#[test]
fn retrieval_report_serializes_output_path() {
    let temp = tempfile::tempdir().unwrap();
    let path = utf8_dir(&temp).join("report.fasta");
    let transport = ScriptedTransport::new(vec![ok(&fasta(&["P19338"]))]);
    let sleeper = RecordingSleeper::default();
    let retriever = Retriever::with_sleeper(&transport, settings(), &sleeper);

    let result = retriever
        .fetch_single(&id("P19338"), OutputFormat::Fasta, &OutputSink::Both(path.clone()))
        .unwrap()
        .unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["written_to"], path.as_str());
    assert_eq!(json["entries"], 1);
    assert!(json.get("payload").is_none());
}

#[test]
fn cancelled_search_is_an_error_before_any_request() {
    let transport = ScriptedTransport::new(vec![ok(&fasta(&["P1"]))]);
    let sleeper = RecordingSleeper::default();
    let retriever = Retriever::with_sleeper(&transport, settings(), &sleeper);
    retriever.cancellation().cancel();

    let err = retriever
        .search("gene:NCL", &SearchFilters::default(), 10, OutputFormat::Fasta, &OutputSink::Payload)
        .unwrap_err();

    assert_matches!(err, RetrieverError::Cancelled);
    assert_eq!(transport.calls(), 0);
}

#[test]
fn cancellation_mid_pagination_discards_partial_result() {
    let temp = tempfile::tempdir().unwrap();
    let path = utf8_dir(&temp).join("cancelled.fasta");
    let transport = ScriptedTransport::new(vec![
        page(&fasta(&["P1"]), Some("https://rest.test/uniprotkb/search?cursor=1")),
        status(503),
        ok(&fasta(&["P2"])),
    ]);
    let token = CancellationToken::new();
    let sleeper = CancellingSleeper::new(token.clone());
    let retriever =
        Retriever::with_sleeper(&transport, settings(), &sleeper).with_cancellation(token);

    let err = retriever
        .search(
            "gene:NCL",
            &SearchFilters::default(),
            1000,
            OutputFormat::Fasta,
            &OutputSink::Both(path.clone()),
        )
        .unwrap_err();

    assert_matches!(err, RetrieverError::Cancelled);
    assert_eq!(transport.calls(), 2);
    assert!(!path.as_std_path().exists());
}

#[test]
fn cancellation_during_poll_wait_stops_mapping() {
    let transport = ScriptedTransport::new(vec![
        ok(r#"{"jobId": "m2"}"#),
        ok(r#"{"jobStatus": "RUNNING"}"#),
        ok(r#"{"results": []}"#),
    ]);
    let token = CancellationToken::new();
    let sleeper = CancellingSleeper::new(token.clone());
    let retriever =
        Retriever::with_sleeper(&transport, settings(), &sleeper).with_cancellation(token);
    let ids = parse_identifiers(&["HGNC:5"]).unwrap();

    let err = retriever
        .map_identifiers(&ids, "HGNC", "UniProtKB", &OutputSink::Payload)
        .unwrap_err();

    assert_matches!(err, RetrieverError::Cancelled);
    assert_eq!(transport.calls(), 2);
}

#[test]
fn cancelled_single_fetch_matches_search() {
    let transport = ScriptedTransport::new(vec![ok(&fasta(&["P1"]))]);
    let sleeper = RecordingSleeper::default();
    let retriever = Retriever::with_sleeper(&transport, settings(), &sleeper);
    retriever.cancellation().cancel();

    let err = retriever
        .fetch_single(&id("P1"), OutputFormat::Fasta, &OutputSink::Payload)
        .unwrap_err();

    assert_matches!(err, RetrieverError::Cancelled);
    assert_eq!(transport.calls(), 0);
}
