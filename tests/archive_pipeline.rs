//! Archive Pipeline Tests
//!
//! Retrieval and assembly end to end:
//! - Concatenated archives hold every page in retrieval order
//! - A failing volume is isolated and reported in ERROR.err
//! - One audit record per contiguous volume run
//! - Separated archives keep page and metadata boundaries
//! - Repeated pages and volumes never collapse into one entry
//! - Streaming quota modes

use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;

use dataapi::archive::{ArchiveAssembler, PackingStrategy, CONCATENATED_ENTRY_NAME, ERROR_ENTRY_NAME};
use dataapi::coordinates::{parse_page_ids, parse_volume_ids};
use dataapi::errors::AccessError;
use dataapi::observability::{AuditAction, FileAuditor, MemoryAuditor};
use dataapi::policy::{PolicyLimits, PolicyRegistry};
use dataapi::retrieval::{StoreVolumeRetriever, StreamingQuota};
use dataapi::store::{DirectoryStore, MemoryStore, VolumeStore};
use dataapi::validation::Granularity;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn abc_store() -> Arc<dyn VolumeStore> {
    Arc::new(
        MemoryStore::new()
            .with_volume("vol1", ["A", "B"])
            .with_volume("vol2", ["C"])
            .with_volume("vol3", ["D", "E", "F"])
            .with_metadata("vol1", "mets.xml", "<mets/>"),
    )
}

fn read_entries(bytes: Vec<u8>) -> Vec<(String, String)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut text = String::new();
            file.read_to_string(&mut text).unwrap();
            (file.name().to_string(), text)
        })
        .collect()
}

fn run(
    store: Arc<dyn VolumeStore>,
    ids: &str,
    strategy: PackingStrategy,
    retriever_setup: impl FnOnce(StoreVolumeRetriever) -> StoreVolumeRetriever,
) -> (Vec<(String, String)>, MemoryAuditor) {
    let auditor = MemoryAuditor::new();
    let coordinates = parse_volume_ids(ids).unwrap();
    let mut retriever =
        retriever_setup(StoreVolumeRetriever::new(store, coordinates, Granularity::WholeVolume));

    let mut out = Vec::new();
    ArchiveAssembler::new(strategy, Arc::new(auditor.clone()))
        .assemble(&mut out, &mut retriever)
        .unwrap();
    (read_entries(out), auditor)
}

fn write_volume(root: &Path, dir: &str, pages: &[&str], metadata: &[(&str, &str)]) {
    let dir = root.join(dir);
    fs::create_dir_all(&dir).unwrap();
    for (i, text) in pages.iter().enumerate() {
        fs::write(dir.join(format!("{:08}.txt", i + 1)), text).unwrap();
    }
    for (name, text) in metadata {
        fs::write(dir.join(name), text).unwrap();
    }
}

// =============================================================================
// Concatenated strategy
// =============================================================================

#[test]
fn test_concatenated_all_successes() {
    let (entries, auditor) = run(
        abc_store(),
        "vol1|vol2|vol3",
        PackingStrategy::Concatenated,
        |r| r,
    );

    assert_eq!(
        entries,
        vec![(CONCATENATED_ENTRY_NAME.to_string(), "ABCDEF".to_string())]
    );

    let records = auditor.records();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.action == AuditAction::Accessed));
    assert_eq!(records[0].content_names, vec!["00000001", "00000002"]);
    assert_eq!(records[1].content_names, vec!["00000001"]);
    assert_eq!(records[2].volume_id, "vol3");
}

#[test]
fn test_concatenated_missing_middle_volume() {
    let store: Arc<dyn VolumeStore> = Arc::new(
        MemoryStore::new()
            .with_volume("vol1", ["A", "B"])
            .with_volume("vol3", ["D", "E", "F"]),
    );
    let (entries, auditor) = run(store, "vol1|vol2|vol3", PackingStrategy::Concatenated, |r| r);

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].1, "ABDEF");
    assert_eq!(entries[1].0, ERROR_ENTRY_NAME);
    assert_eq!(entries[1].1, "KeyNotFound: Key not found: vol2\n");

    let ids: Vec<String> = auditor.records().into_iter().map(|r| r.volume_id).collect();
    assert_eq!(ids, vec!["vol1", "vol3"]);
}

#[test]
fn test_concatenated_omits_metadata() {
    let (entries, _) = run(abc_store(), "vol1", PackingStrategy::Concatenated, |r| r);
    assert_eq!(entries, vec![(CONCATENATED_ENTRY_NAME.to_string(), "AB".to_string())]);
}

#[test]
fn test_concatenated_partial_pages_in_request_order() {
    let auditor = MemoryAuditor::new();
    let coordinates = parse_page_ids("vol3[3,1]|vol1[2]").unwrap();
    let mut retriever =
        StoreVolumeRetriever::new(abc_store(), coordinates, Granularity::PartialPage);

    let mut out = Vec::new();
    ArchiveAssembler::new(PackingStrategy::Concatenated, Arc::new(auditor.clone()))
        .assemble(&mut out, &mut retriever)
        .unwrap();

    assert_eq!(read_entries(out)[0].1, "FDB");
    assert_eq!(auditor.records()[0].content_names, vec!["00000003", "00000001"]);
}

// =============================================================================
// Separated strategy
// =============================================================================

#[test]
fn test_separated_entry_per_page_and_metadata() {
    let (entries, auditor) = run(abc_store(), "vol1|vol2", PackingStrategy::Separated, |r| r);

    let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "vol1/00000001.txt",
            "vol1/00000002.txt",
            "vol1/mets.xml",
            "vol2/00000001.txt",
        ]
    );
    assert_eq!(entries[2].1, "<mets/>");
    assert_eq!(
        auditor.records()[0].content_names,
        vec!["00000001", "00000002", "mets.xml"]
    );
}

#[test]
fn test_separated_from_directory_store() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("data");
    write_volume(
        &root,
        "uc2.ark+=13960=t0001",
        &["first", "second"],
        &[("uc2.ark+=13960=t0001.mets.xml", "<mets/>")],
    );

    let audit_path = temp_dir.path().join("audit.log");
    let auditor = Arc::new(FileAuditor::open(&audit_path).unwrap());
    let store: Arc<dyn VolumeStore> = Arc::new(DirectoryStore::new(&root));
    let coordinates = parse_page_ids("uc2.ark:/13960/t0001[2]|missing").unwrap();
    let mut retriever = StoreVolumeRetriever::new(store, coordinates, Granularity::PartialPage);

    let mut out = Vec::new();
    let report = ArchiveAssembler::new(PackingStrategy::Separated, auditor)
        .assemble(&mut out, &mut retriever)
        .unwrap();

    let entries = read_entries(out);
    assert_eq!(entries[0].0, "uc2.ark+=13960=t0001/00000002.txt");
    assert_eq!(entries[0].1, "second");
    assert_eq!(entries[1].0, "uc2.ark+=13960=t0001/uc2.ark+=13960=t0001.mets.xml");
    assert_eq!(entries[2].0, ERROR_ENTRY_NAME);
    assert_eq!(report.errors.len(), 1);

    let audit = fs::read_to_string(&audit_path).unwrap();
    let line: serde_json::Value = serde_json::from_str(audit.lines().next().unwrap()).unwrap();
    assert_eq!(line["action"], "ACCESSED");
    assert_eq!(line["volume_id"], "uc2.ark:/13960/t0001");
}

#[test]
fn test_separated_repeats_stay_readable() {
    let auditor = MemoryAuditor::new();
    let coordinates = parse_page_ids("vol1[1,1]|vol2|vol1[2]").unwrap();
    let mut retriever =
        StoreVolumeRetriever::new(abc_store(), coordinates, Granularity::PartialPage);

    let mut out = Vec::new();
    let report = ArchiveAssembler::new(PackingStrategy::Separated, Arc::new(auditor.clone()))
        .assemble(&mut out, &mut retriever)
        .unwrap();

    let entries = read_entries(out);
    assert_eq!(entries.len(), report.entries_written);
    let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "vol1/00000001.txt",
            "vol1/00000001-2.txt",
            "vol1/mets.xml",
            "vol2/00000001.txt",
            "vol1/00000002.txt",
            "vol1/mets-2.xml",
        ]
    );
    assert_eq!(entries[1].1, "A");

    // audit keeps the page names as released
    assert_eq!(
        auditor.records()[0].content_names,
        vec!["00000001", "00000001", "mets.xml"]
    );
}

// =============================================================================
// Streaming quotas
// =============================================================================

#[test]
fn test_isolate_keeps_streaming_after_violation() {
    let registry = PolicyRegistry::from_limits(&PolicyLimits::new(0, 0, 2));
    let (entries, auditor) = run(abc_store(), "vol1|vol3|vol2", PackingStrategy::Concatenated, |r| {
        r.with_quota(StreamingQuota::Isolate, &registry)
    });

    assert_eq!(entries[0].1, "ABC");
    assert!(entries[1].1.starts_with("PolicyViolation: "));
    assert!(entries[1].1.contains("vol3[2]"));
    assert_eq!(auditor.len(), 2);
}

#[test]
fn test_halt_stops_stream_at_violation() {
    let registry = PolicyRegistry::from_limits(&PolicyLimits::new(0, 0, 2));
    let (entries, auditor) = run(abc_store(), "vol1|vol3|vol2", PackingStrategy::Concatenated, |r| {
        r.with_quota(StreamingQuota::Halt, &registry)
    });

    assert_eq!(entries[0].1, "AB");
    assert_eq!(entries[1].1.lines().count(), 1);
    assert_eq!(auditor.len(), 1);
}

#[test]
fn test_off_ignores_quotas() {
    let registry = PolicyRegistry::from_limits(&PolicyLimits::new(1, 1, 1));
    let (entries, _) = run(abc_store(), "vol1|vol2|vol3", PackingStrategy::Concatenated, |r| {
        r.with_quota(StreamingQuota::Off, &registry)
    });
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].1, "ABCDEF");
}

#[test]
fn test_repository_failure_is_isolated() {
    let store: Arc<dyn VolumeStore> = Arc::new(
        MemoryStore::new()
            .with_volume("vol1", ["A"])
            .with_failure("vol2", AccessError::repository("connection reset")),
    );
    let (entries, _) = run(store, "vol1|vol2", PackingStrategy::Separated, |r| r);
    assert_eq!(entries[0].0, "vol1/00000001.txt");
    assert_eq!(
        entries[1].1,
        "RepositoryFailure: Repository failure: connection reset\n"
    );
}

#[test]
fn test_failed_content_read_does_not_count_against_quota() {
    let store: Arc<dyn VolumeStore> = Arc::new(
        MemoryStore::new()
            .with_volume("ok1", ["A"])
            .with_volume("bad", ["B"])
            .with_volume("ok2", ["C"])
            .with_content_failure("bad", AccessError::repository("node down")),
    );
    let registry = PolicyRegistry::from_limits(&PolicyLimits::new(2, 0, 0));
    let (entries, auditor) = run(store, "ok1|bad|ok2", PackingStrategy::Concatenated, |r| {
        r.with_quota(StreamingQuota::Isolate, &registry)
    });

    assert_eq!(entries[0].1, "AC");
    assert_eq!(entries[1].1, "RepositoryFailure: Repository failure: node down\n");
    assert_eq!(auditor.len(), 2);
}
