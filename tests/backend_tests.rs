mod common;

use checkzone::zone::{
    DnssecKeeper, MemoryBackend, Nsec3Param, RecordSource, Severity, SoaData, StaticKeeper, ZoneId,
};
use checkzone::{
    CheckError, DnssecState, DomainName, RecordType, ResourceRecord, ZoneValidator,
    check_delegation,
};
use common::*;

#[test]
fn test_delegation_missing_in_parent() {
    init_test_logging();
    let backend = MemoryBackend::new();
    backend.add_zone(name("example"), 3600);
    backend.add_zone(name("sub.example"), 3600);

    let diagnostics = check_delegation(&name("sub.example."), &backend).unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Error);
    assert_eq!(
        diagnostics[0].message,
        "No delegation for zone 'sub.example.' in parent 'example.'"
    );
}

#[test]
fn test_delegation_skips_unserved_ancestors() {
    let backend = MemoryBackend::new();
    let parent = name("example.com");
    backend.add_zone(parent.clone(), 3600);
    backend
        .add_record(&parent, record("c.example.com", "NS", "ns.example.net"))
        .unwrap();

    assert!(check_delegation(&name("c.example.com"), &backend).unwrap().is_empty());

    // Neither b.c.example.com nor c.example.com is a zone, the walk ends at example.com
    let diagnostics = check_delegation(&name("a.b.c.example.com"), &backend).unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].message,
        "No delegation for zone 'a.b.c.example.com.' in parent 'example.com.'"
    );
}

#[test]
fn test_backend_zone_without_soa() {
    let backend = MemoryBackend::new();
    let report = ZoneValidator::default()
        .check_backend_zone(&StaticKeeper::new(), &backend, &name(APEX))
        .unwrap();

    assert_eq!(report.record_count, 0);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(
        report.diagnostics[0].message,
        "No SOA record present, or active, in zone 'example.com.'"
    );
    assert_eq!(
        report.to_string(),
        "Checked 0 records of 'example.com.', 1 errors, 0 warnings."
    );
}

#[test]
fn test_backend_zone_is_clean() {
    init_test_logging();
    let backend = baseline_backend();
    let report = ZoneValidator::default()
        .check_backend_zone(&StaticKeeper::new(), &backend, &name(APEX))
        .unwrap();

    assert_clean(&report);
    assert_eq!(report.record_count, 3);
}

#[test]
fn test_backend_zone_diagnostic_order() {
    let backend = baseline_backend();
    let child = name("sub.example.com");
    backend.add_zone(child.clone(), 300);
    backend.add_record(&child, record("sub.example.com", "SOA", SOA_CONTENT)).unwrap();

    let mut keeper = StaticKeeper::new();
    keeper.set(
        child.clone(),
        DnssecState {
            valid_keys: false,
            ..DnssecState::insecure()
        },
    );

    let report = ZoneValidator::default()
        .check_backend_zone(&keeper, &backend, &child)
        .unwrap();
    let messages: Vec<&str> = report.diagnostics.iter().map(|d| d.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "zone 'sub.example.com' has at least one invalid DNS Private Key.",
            "No delegation for zone 'sub.example.com.' in parent 'example.com.'",
            "No NS record at zone apex in zone 'sub.example.com.'",
        ]
    );
    assert_eq!(report.record_count, 1);
}

#[test]
fn test_backend_zone_uses_soa_default_ttl() {
    let backend = baseline_backend();
    let apex = name(APEX);
    backend
        .add_record(&apex, record_with_ttl(APEX, "DNSKEY", "257 3 8 AwEAAQ==", 60))
        .unwrap();

    let mut keeper = StaticKeeper::new();
    keeper.set(apex.clone(), DnssecState::secured());

    let validator = ZoneValidator::new(checkzone::CheckConfig {
        direct_dnskey: true,
        ..Default::default()
    });
    let report = validator.check_backend_zone(&keeper, &backend, &apex).unwrap();
    assert_single(
        &report,
        "DNSKEY TTL of 60 at 'example.com.' differs from SOA minimum of 3600",
        Severity::Warning,
    );
}

#[test]
fn test_backend_nsec3_precheck() {
    let long = DomainName::parse(&format!(
        "{}.{}.{}.{}.com",
        "a".repeat(60),
        "b".repeat(60),
        "c".repeat(60),
        "d".repeat(40)
    ))
    .unwrap();
    let backend = MemoryBackend::new();
    backend.add_zone(long.clone(), 3600);

    let mut keeper = StaticKeeper::new();
    keeper.set(long.clone(), DnssecState::secured().with_nsec3(Nsec3Param::default()));

    let report = ZoneValidator::default()
        .check_backend_zone(&keeper, &backend, &long)
        .unwrap();
    assert_single(&report, "has NSEC3 semantics but is too long", Severity::Error);
    assert!(
        matching(&report, "has NSEC3 semantics")[0]
            .message
            .ends_with("Zone name is 229 bytes long, whereas the maximum is 222 bytes.")
    );
}

struct FailingSource;

impl RecordSource for FailingSource {
    fn get_soa(&self, name: &DomainName) -> checkzone::Result<Option<SoaData>> {
        Ok(Some(SoaData {
            zone: name.clone(),
            zone_id: 1,
            default_ttl: 3600,
            serial: 1,
        }))
    }

    fn lookup(
        &self,
        _rtype: Option<RecordType>,
        _name: &DomainName,
        _zone_id: ZoneId,
    ) -> checkzone::Result<Vec<ResourceRecord>> {
        Err(CheckError::Backend("lookup failed".to_string()))
    }

    fn list(&self, _zone: &DomainName, _zone_id: ZoneId) -> checkzone::Result<Vec<ResourceRecord>> {
        Err(CheckError::Backend("list failed".to_string()))
    }
}

struct FailingKeeper;

impl DnssecKeeper for FailingKeeper {
    fn is_secured_zone(&self, _zone: &DomainName) -> checkzone::Result<bool> {
        Err(CheckError::Backend("keeper unavailable".to_string()))
    }

    fn is_presigned(&self, _zone: &DomainName) -> checkzone::Result<bool> {
        Ok(false)
    }

    fn check_keys(&self, _zone: &DomainName) -> checkzone::Result<bool> {
        Ok(true)
    }

    fn get_nsec3param(&self, _zone: &DomainName) -> checkzone::Result<Option<Nsec3Param>> {
        Ok(None)
    }
}

#[test]
fn test_collaborator_failures_propagate() {
    let validator = ZoneValidator::default();

    let err = validator
        .check_backend_zone(&StaticKeeper::new(), &FailingSource, &name(APEX))
        .unwrap_err();
    assert!(matches!(err, CheckError::Backend(ref msg) if msg == "lookup failed"));

    let err = check_delegation(&name("sub.example.com"), &FailingSource).unwrap_err();
    assert!(matches!(err, CheckError::Backend(_)));

    let backend = baseline_backend();
    let err = validator
        .check_backend_zone(&FailingKeeper, &backend, &name(APEX))
        .unwrap_err();
    assert_eq!(err.to_string(), "Backend error: keeper unavailable");
}
