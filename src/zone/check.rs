use super::content::{self, ContentCheck};
use super::delegation::check_delegation;
use super::diagnostic::{Diagnostic, ZoneReport};
use super::dnssec::{DnssecKeeper, DnssecState};
use super::source::{RecordSource, SoaData};
use super::ResourceRecord;
use crate::config::CheckConfig;
use crate::dns::{DomainName, RecordType};
use crate::error::Result;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// The zone being checked: its apex and default TTL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneState {
    pub name: DomainName,
    /// SOA minimum, the TTL DNSKEY records are expected to carry
    pub default_ttl: u32,
}

impl ZoneState {
    pub fn new(name: DomainName, default_ttl: u32) -> Self {
        Self { name, default_ttl }
    }

    pub fn wire_length(&self) -> usize {
        self.name.wire_length()
    }
}

impl From<&SoaData> for ZoneState {
    fn from(soa: &SoaData) -> Self {
        Self::new(soa.zone.clone(), soa.default_ttl)
    }
}

/// Working sets built while walking the records of one zone
#[derive(Default)]
struct Collected {
    has_ns_at_apex: bool,
    tlsas: BTreeSet<DomainName>,
    cnames: BTreeSet<DomainName>,
    noncnames: BTreeSet<DomainName>,
    glue: BTreeSet<DomainName>,
    check_glue: BTreeSet<DomainName>,
    contents: FxHashSet<String>,
    ttls: FxHashMap<String, u32>,
}

impl Collected {
    fn has_owner(&self, name: &DomainName) -> bool {
        self.cnames.contains(name) || self.noncnames.contains(name)
    }
}

/// Runs the consistency rules over the records of a zone
#[derive(Debug, Clone, Default)]
pub struct ZoneValidator {
    config: CheckConfig,
}

impl ZoneValidator {
    pub fn new(config: CheckConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Zone-wide checks that do not look at individual records
    pub fn prechecks(&self, dnssec: &DnssecState, zone: &ZoneState) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        let max = self.config.nsec3_max_apex_wire_length;
        if dnssec.has_nsec3() && dnssec.secured && zone.wire_length() > max {
            diagnostics.push(Diagnostic::error(format!(
                "zone '{}' has NSEC3 semantics but is too long to have the hash prepended. Zone name is {} bytes long, whereas the maximum is {} bytes.",
                zone.name,
                zone.wire_length(),
                max
            )));
        }

        if !dnssec.valid_keys {
            diagnostics.push(Diagnostic::error(format!(
                "zone '{}' has at least one invalid DNS Private Key.",
                zone.name
            )));
        }

        diagnostics
    }

    /// Pre-checks followed by the record rules
    pub fn check(
        &self,
        dnssec: &DnssecState,
        zone: &ZoneState,
        records: &[ResourceRecord],
    ) -> ZoneReport {
        let mut report = ZoneReport::new(zone.name.clone());
        report.diagnostics.extend(self.prechecks(dnssec, zone));
        self.check_records(dnssec, zone, records, &mut report);
        report
    }

    /// Check a zone served by `source`, with DNSSEC facts from `keeper`.
    ///
    /// Only failures of the collaborators are returned as errors; everything
    /// wrong with the zone itself ends up in the report.
    pub fn check_backend_zone<K, S>(
        &self,
        keeper: &K,
        source: &S,
        zone: &DomainName,
    ) -> Result<ZoneReport>
    where
        K: DnssecKeeper + ?Sized,
        S: RecordSource + ?Sized,
    {
        let mut report = ZoneReport::new(zone.clone());

        let Some(soa) = source.get_soa(zone)? else {
            debug!("No SOA for {}, not checking records", zone);
            report.push(Diagnostic::error(format!(
                "No SOA record present, or active, in zone '{}'",
                zone.to_fqdn()
            )));
            return Ok(report);
        };

        let dnssec = DnssecState::capture(keeper, zone)?;
        let state = ZoneState::new(zone.clone(), soa.default_ttl);

        report.diagnostics.extend(self.prechecks(&dnssec, &state));
        report.diagnostics.extend(check_delegation(zone, source)?);

        let records = source.list(zone, soa.zone_id)?;
        self.check_records(&dnssec, &state, &records, &mut report);
        Ok(report)
    }

    /// The per-record pass followed by the passes over the collected names.
    /// Diagnostics are appended to `report` and the record count is updated.
    pub fn check_records(
        &self,
        dnssec: &DnssecState,
        zone: &ZoneState,
        records: &[ResourceRecord],
        report: &mut ZoneReport,
    ) {
        debug!(
            "Checking {} records of zone {} (secured={}, presigned={}, nsec3={})",
            records.len(),
            zone.name,
            dnssec.secured,
            dnssec.presigned,
            dnssec.has_nsec3()
        );

        let mut collected = Collected::default();
        for record in records {
            if record.rtype.is_empty() {
                trace!("Skipping record {} without a type", record.name);
                continue;
            }
            report.record_count += 1;
            self.check_record(dnssec, zone, record, &mut collected, report);
        }

        self.check_collected(zone, &collected, report);

        debug!(
            "Checked {} records of zone {}: {} errors, {} warnings",
            report.record_count,
            zone.name,
            report.error_count(),
            report.warning_count()
        );
    }

    fn check_record(
        &self,
        dnssec: &DnssecState,
        zone: &ZoneState,
        record: &ResourceRecord,
        collected: &mut Collected,
        report: &mut ZoneReport,
    ) {
        let name = &record.name;
        let rtype = record.rtype;

        if rtype == RecordType::TLSA {
            collected.tlsas.insert(name.clone());
        }

        let normalized = content::normalize(rtype, &record.content);
        let rdata = normalized.as_ref();
        let described = format!("{} IN {} {}", name.to_fqdn(), rtype, rdata);

        match content::verify(rtype, rdata) {
            Ok(ContentCheck::Canonical) => {}
            Ok(ContentCheck::NonCanonical { rendered }) => {
                report.push(Diagnostic::warning(format!(
                    "Parsed and original record content are not equal: {} IN {} '{}' (Content parsed as '{}')",
                    name.to_fqdn(),
                    rtype,
                    rdata,
                    rendered
                )));
            }
            Ok(ContentCheck::InvalidIpv6) => {
                report.push(Diagnostic::warning(format!(
                    "Following record is not a valid IPv6 address: {} IN {} '{}'",
                    name.to_fqdn(),
                    rtype,
                    rdata
                )));
            }
            Err(e) => {
                report.push(Diagnostic::error(format!(
                    "Following record had a problem: {}. Error was: {}",
                    described, e
                )));
                return;
            }
        }

        if !name.is_part_of(&zone.name) {
            report.push(Diagnostic::error(format!(
                "Record '{}' in zone '{}' is out-of-zone.",
                described,
                zone.name.to_fqdn()
            )));
            return;
        }

        let key = format!("{} {} {}", name.to_fqdn(), rtype, rdata).to_lowercase();
        if collected.contents.contains(&key) {
            report.push(Diagnostic::error(format!(
                "Duplicate record found in rrset: '{}'",
                described
            )));
            return;
        }
        collected.contents.insert(key);

        let mut rrset = format!("{} {}", name.to_fqdn(), rtype);
        if rtype == RecordType::RRSIG {
            if let Some(covered) = content::rrsig_covered_type(rdata) {
                rrset.push_str(&format!(" ({})", covered));
            }
        }
        let first_ttl = *collected
            .ttls
            .entry(rrset.to_lowercase())
            .or_insert(record.ttl);
        if first_ttl != record.ttl {
            report.push(Diagnostic::error(format!(
                "TTL mismatch in rrset: '{}' ({} != {})",
                described, first_ttl, record.ttl
            )));
            return;
        }

        if dnssec.secured && dnssec.opt_out() && name.is_wildcard() {
            report.push(Diagnostic::warning(format!(
                "wildcard record '{}' is insecure. Wildcard records in opt-out zones are insecure, disable the opt-out flag of zone '{}' to avoid this warning.",
                described,
                zone.name.to_fqdn()
            )));
        }

        if rtype == RecordType::NS {
            // Targets strictly below the NS owner can only be reached through glue
            if let Ok(target) = DomainName::parse(rdata) {
                if target.is_part_of(name) && target != *name {
                    collected.check_glue.insert(target);
                }
            }
        }

        if *name == zone.name {
            match rtype {
                RecordType::NS => collected.has_ns_at_apex = true,
                RecordType::DS => report.push(Diagnostic::warning(format!(
                    "DS at apex in zone '{}', should not be here.",
                    zone.name.to_fqdn()
                ))),
                _ => {}
            }
        } else {
            match rtype {
                RecordType::SOA => {
                    report.push(Diagnostic::error(format!(
                        "SOA record not at apex '{}' in zone '{}'",
                        described,
                        zone.name.to_fqdn()
                    )));
                    return;
                }
                RecordType::DNSKEY => report.push(Diagnostic::warning(format!(
                    "DNSKEY record not at apex '{}' in zone '{}', should not be here.",
                    described,
                    zone.name.to_fqdn()
                ))),
                RecordType::A | RecordType::AAAA => {
                    collected.glue.insert(name.clone());
                }
                _ => {}
            }
        }

        match rtype {
            RecordType::CNAME => {
                if !collected.cnames.insert(name.clone()) {
                    report.push(Diagnostic::error(format!(
                        "Duplicate CNAME found at '{}'",
                        name.to_fqdn()
                    )));
                    return;
                }
            }
            RecordType::RRSIG => {
                if !dnssec.presigned {
                    report.push(Diagnostic::error(format!(
                        "RRSIG found at '{}' in non-presigned zone. These do not belong in the database.",
                        name.to_fqdn()
                    )));
                    return;
                }
            }
            _ => {
                collected.noncnames.insert(name.clone());
            }
        }

        if matches!(rtype, RecordType::NSEC | RecordType::NSEC3) {
            report.push(Diagnostic::error(format!(
                "NSEC or NSEC3 found at '{}'. These do not belong in the database.",
                name.to_fqdn()
            )));
            return;
        }

        if !dnssec.presigned && rtype == RecordType::DNSKEY {
            if self.config.direct_dnskey {
                if record.ttl != zone.default_ttl {
                    report.push(Diagnostic::warning(format!(
                        "DNSKEY TTL of {} at '{}' differs from SOA minimum of {}",
                        record.ttl,
                        name.to_fqdn(),
                        zone.default_ttl
                    )));
                }
            } else {
                report.push(Diagnostic::warning(format!(
                    "DNSKEY at '{}' in non-presigned zone will mostly be ignored and can cause problems.",
                    name.to_fqdn()
                )));
            }
        }

        if matches!(
            rtype,
            RecordType::NS | RecordType::SRV | RecordType::MX | RecordType::CNAME | RecordType::DNAME
        ) && rdata.ends_with('.')
        {
            report.push(Diagnostic::warning(format!(
                "The record {} with type {} has a trailing dot in the content ({}). Your backend might not work well with this.",
                name.to_fqdn(),
                rtype,
                rdata
            )));
        }

        if !record.auth
            && !matches!(rtype, RecordType::NS | RecordType::A | RecordType::AAAA)
        {
            report.push(Diagnostic::error(format!(
                "Following record is not authoritative, the zone needs to be rectified: {}",
                described
            )));
        }
    }

    fn check_collected(&self, zone: &ZoneState, collected: &Collected, report: &mut ZoneReport) {
        for name in collected.cnames.intersection(&collected.noncnames) {
            report.push(Diagnostic::error(format!(
                "CNAME {} found, but other records with same label exist.",
                name.to_fqdn()
            )));
        }

        for tlsa in &collected.tlsas {
            if let Some(warning) = self.check_tlsa_target(tlsa, collected) {
                report.push(warning);
            }
        }

        if !collected.has_ns_at_apex {
            report.push(Diagnostic::error(format!(
                "No NS record at zone apex in zone '{}'",
                zone.name.to_fqdn()
            )));
        }

        for target in collected.check_glue.difference(&collected.glue) {
            report.push(Diagnostic::warning(format!(
                "Missing glue for '{}' in zone '{}'",
                target.to_fqdn(),
                zone.name.to_fqdn()
            )));
        }
    }

    /// A TLSA owner is `_port._proto.<target>`; warn when nothing exists at the target
    fn check_tlsa_target(&self, tlsa: &DomainName, collected: &Collected) -> Option<Diagnostic> {
        if tlsa.label_count() < 2 {
            return Some(Diagnostic::warning(format!(
                "TLSA record at '{}' has no _port._proto prefix, the name it secures cannot be determined.",
                tlsa.to_fqdn()
            )));
        }

        let mut target = tlsa.clone();
        target.trim_to_labels(tlsa.label_count() - 2);
        if collected.has_owner(&target) {
            return None;
        }

        let wildcard = if self.config.tlsa_wildcard_fallback {
            let mut wildcard = target.clone();
            wildcard.chop_off();
            (wildcard.prepend_label(b"*").is_ok() && collected.has_owner(&wildcard))
                .then_some(wildcard)
        } else {
            None
        };

        let found = match wildcard {
            Some(wildcard) => format!(
                "A wildcard record exist for '{}' and a TLSA record for '{}'.",
                wildcard.to_fqdn(),
                tlsa.to_fqdn()
            ),
            None => format!(
                "No record for '{}' exists, but a TLSA record for '{}' does.",
                target.to_fqdn(),
                tlsa.to_fqdn()
            ),
        };
        Some(Diagnostic::warning(format!(
            "{} A query for '{}' will yield an empty response. This is most likely a mistake, please create records for '{}'.",
            found,
            target.to_fqdn(),
            target.to_fqdn()
        )))
    }
}

/// Check `records` of `zone` with default settings apart from `direct_dnskey`
pub fn check_zone(
    dnssec: &DnssecState,
    zone: &ZoneState,
    records: &[ResourceRecord],
    direct_dnskey: bool,
) -> ZoneReport {
    let validator = ZoneValidator::new(CheckConfig {
        direct_dnskey,
        ..Default::default()
    });
    validator.check(dnssec, zone, records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> DomainName {
        DomainName::parse(s).unwrap()
    }

    fn record(owner: &str, rtype: &str, content: &str) -> ResourceRecord {
        ResourceRecord::from_text(owner, rtype, content, 3600).unwrap()
    }

    fn zone() -> ZoneState {
        ZoneState::new(name("example.com"), 3600)
    }

    fn messages(report: &ZoneReport) -> Vec<String> {
        report.diagnostics.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn test_prechecks_nsec3_length() {
        let long = format!("{}.{}.{}.{}.com", "a".repeat(60), "b".repeat(60), "c".repeat(60), "d".repeat(40));
        let state = ZoneState::new(name(&long), 3600);
        assert!(state.wire_length() > 222);

        let validator = ZoneValidator::default();
        let nsec3 = DnssecState::secured().with_nsec3(Default::default());
        let diagnostics = validator.prechecks(&nsec3, &state);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].is_error());
        assert!(diagnostics[0].message.contains("too long to have the hash prepended"));

        // Only secured NSEC3 zones are affected
        assert!(validator.prechecks(&DnssecState::secured(), &state).is_empty());
        let unsigned = DnssecState::insecure().with_nsec3(Default::default());
        assert!(validator.prechecks(&unsigned, &state).is_empty());
    }

    #[test]
    fn test_prechecks_invalid_keys() {
        let dnssec = DnssecState {
            valid_keys: false,
            ..DnssecState::insecure()
        };
        let diagnostics = ZoneValidator::default().prechecks(&dnssec, &zone());
        assert_eq!(
            diagnostics,
            vec![Diagnostic::error(
                "zone 'example.com' has at least one invalid DNS Private Key."
            )]
        );
    }

    #[test]
    fn test_skips_empty_type() {
        let records = vec![
            ResourceRecord::new(name("example.com"), RecordType::Unknown(0), "", 3600),
            record("example.com", "NS", "ns1.example.com"),
        ];
        let report = check_zone(&DnssecState::insecure(), &zone(), &records, false);
        assert_eq!(report.record_count, 1);
    }

    #[test]
    fn test_rrsig_rrsets_keyed_by_covered_type() {
        let dnssec = DnssecState::secured().presigned();
        let mut records = vec![
            record("example.com", "NS", "ns1.example.com"),
            record(
                "example.com",
                "RRSIG",
                "NS 8 2 3600 20240101000000 20231201000000 12345 example.com AAAA",
            ),
        ];
        let mut soa_sig = record(
            "example.com",
            "RRSIG",
            "SOA 8 2 3600 20240101000000 20231201000000 12345 example.com AAAA",
        );
        soa_sig.ttl = 300;
        records.push(soa_sig);

        let report = check_zone(&dnssec, &zone(), &records, false);
        assert!(
            !messages(&report).iter().any(|m| m.contains("TTL mismatch")),
            "{:?}",
            messages(&report)
        );
    }

    #[test]
    fn test_tlsa_without_prefix() {
        let validator = ZoneValidator::default();
        let collected = Collected::default();
        let warning = validator
            .check_tlsa_target(&name("com"), &collected)
            .unwrap();
        assert!(!warning.is_error());
        assert!(warning.message.contains("no _port._proto prefix"));
    }

    #[test]
    fn test_tlsa_wildcard_fallback_disabled() {
        let mut collected = Collected::default();
        collected.noncnames.insert(name("*.example.com"));
        let tlsa = name("_443._tcp.www.example.com");

        let warning = ZoneValidator::default()
            .check_tlsa_target(&tlsa, &collected)
            .unwrap();
        assert!(warning.message.starts_with("A wildcard record exist for '*.example.com.'"));

        let strict = ZoneValidator::new(CheckConfig {
            tlsa_wildcard_fallback: false,
            ..Default::default()
        });
        let warning = strict.check_tlsa_target(&tlsa, &collected).unwrap();
        assert!(warning.message.starts_with("No record for 'www.example.com.' exists"));

        collected.noncnames.insert(name("www.example.com"));
        assert!(strict.check_tlsa_target(&tlsa, &collected).is_none());
    }
}
