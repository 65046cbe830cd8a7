//! Common test utilities for the zone checker tests

#![allow(dead_code)] // These functions are used by various test files

use checkzone::{
    DomainName, DnssecState, ResourceRecord, ZoneReport, ZoneState, check_zone,
    zone::{Diagnostic, MemoryBackend, Severity},
};
use std::sync::Once;

pub const APEX: &str = "example.com";
pub const DEFAULT_TTL: u32 = 3600;
pub const SOA_CONTENT: &str = "ns1.example.com hostmaster.example.com 2024010101 3600 900 604800 86400";

static INIT_LOGGING: Once = Once::new();

/// Route tracing output to the test writer, filtered by `RUST_LOG`
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn name(text: &str) -> DomainName {
    DomainName::parse(text).unwrap()
}

/// Authoritative record with the default TTL
pub fn record(owner: &str, rtype: &str, content: &str) -> ResourceRecord {
    record_with_ttl(owner, rtype, content, DEFAULT_TTL)
}

pub fn record_with_ttl(owner: &str, rtype: &str, content: &str, ttl: u32) -> ResourceRecord {
    ResourceRecord::from_text(owner, rtype, content, ttl).unwrap()
}

pub fn zone_state() -> ZoneState {
    ZoneState::new(name(APEX), DEFAULT_TTL)
}

/// SOA, apex NS and its glue: a zone without findings
pub fn baseline_records() -> Vec<ResourceRecord> {
    vec![
        record(APEX, "SOA", SOA_CONTENT),
        record(APEX, "NS", "ns1.example.com"),
        record("ns1.example.com", "A", "192.0.2.1"),
    ]
}

/// Baseline records followed by `extra`
pub fn zone_with(extra: Vec<ResourceRecord>) -> Vec<ResourceRecord> {
    let mut records = baseline_records();
    records.extend(extra);
    records
}

pub fn check(records: &[ResourceRecord]) -> ZoneReport {
    check_with(&DnssecState::insecure(), records)
}

pub fn check_with(dnssec: &DnssecState, records: &[ResourceRecord]) -> ZoneReport {
    init_test_logging();
    check_zone(dnssec, &zone_state(), records, false)
}

/// Diagnostics of `report` whose message contains `needle`
pub fn matching<'a>(report: &'a ZoneReport, needle: &str) -> Vec<&'a Diagnostic> {
    report
        .diagnostics
        .iter()
        .filter(|d| d.message.contains(needle))
        .collect()
}

/// Assert exactly one diagnostic mentions `needle` and it has `severity`
pub fn assert_single(report: &ZoneReport, needle: &str, severity: Severity) {
    let found = matching(report, needle);
    assert_eq!(
        found.len(),
        1,
        "expected one diagnostic containing {:?}, got {:#?}",
        needle,
        report.diagnostics
    );
    assert_eq!(found[0].severity, severity, "{}", found[0]);
}

pub fn assert_clean(report: &ZoneReport) {
    assert!(
        report.diagnostics.is_empty(),
        "expected no diagnostics, got {:#?}",
        report.diagnostics
    );
}

/// A backend serving the baseline zone
pub fn baseline_backend() -> MemoryBackend {
    let backend = MemoryBackend::new();
    let apex = name(APEX);
    backend.add_zone(apex.clone(), DEFAULT_TTL);
    for record in baseline_records() {
        backend.add_record(&apex, record).unwrap();
    }
    backend
}
