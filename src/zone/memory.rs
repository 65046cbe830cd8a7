use super::source::{RecordSource, SoaData, ZoneId};
use super::ResourceRecord;
use crate::dns::{DomainName, RecordType};
use crate::error::{CheckError, Result};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tracing::debug;

struct MemoryZone {
    soa: SoaData,
    records: Vec<ResourceRecord>,
}

#[derive(Default)]
struct Zones {
    by_apex: BTreeMap<DomainName, MemoryZone>,
    apex_by_id: FxHashMap<ZoneId, DomainName>,
}

impl Zones {
    fn by_id(&self, zone_id: ZoneId) -> Option<&MemoryZone> {
        self.apex_by_id
            .get(&zone_id)
            .and_then(|apex| self.by_apex.get(apex))
    }
}

/// Record source keeping zones in memory, indexed by apex and by id
pub struct MemoryBackend {
    zones: RwLock<Zones>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            zones: RwLock::new(Zones::default()),
        }
    }

    /// Register a zone apex. Re-adding an existing apex keeps its id and records.
    pub fn add_zone(&self, apex: DomainName, default_ttl: u32) -> ZoneId {
        let mut zones = self.zones.write();
        if let Some(existing) = zones.by_apex.get(&apex) {
            return existing.soa.zone_id;
        }

        let zone_id = ZoneId::try_from(zones.by_apex.len() + 1).unwrap_or(ZoneId::MAX);
        debug!("Adding zone {} with id {}", apex, zone_id);
        zones.apex_by_id.insert(zone_id, apex.clone());
        zones.by_apex.insert(
            apex.clone(),
            MemoryZone {
                soa: SoaData {
                    zone: apex,
                    zone_id,
                    default_ttl,
                    serial: 1,
                },
                records: Vec::new(),
            },
        );
        zone_id
    }

    /// Append a record to a registered zone
    pub fn add_record(&self, zone: &DomainName, record: ResourceRecord) -> Result<()> {
        let mut zones = self.zones.write();
        let entry = zones
            .by_apex
            .get_mut(zone)
            .ok_or_else(|| CheckError::ZoneNotFound(zone.to_fqdn()))?;
        entry.records.push(record);
        Ok(())
    }

    pub fn zone_count(&self) -> usize {
        self.zones.read().by_apex.len()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordSource for MemoryBackend {
    fn get_soa(&self, name: &DomainName) -> Result<Option<SoaData>> {
        Ok(self.zones.read().by_apex.get(name).map(|zone| zone.soa.clone()))
    }

    fn lookup(
        &self,
        rtype: Option<RecordType>,
        name: &DomainName,
        zone_id: ZoneId,
    ) -> Result<Vec<ResourceRecord>> {
        let zones = self.zones.read();
        Ok(zones
            .by_id(zone_id)
            .into_iter()
            .flat_map(|zone| zone.records.iter())
            .filter(|record| &record.name == name)
            .filter(|record| rtype.is_none_or(|rtype| record.rtype == rtype))
            .cloned()
            .collect())
    }

    fn list(&self, zone: &DomainName, zone_id: ZoneId) -> Result<Vec<ResourceRecord>> {
        let zones = self.zones.read();
        match zones.by_apex.get(zone) {
            Some(entry) if entry.soa.zone_id == zone_id => Ok(entry.records.clone()),
            _ => Err(CheckError::ZoneNotFound(zone.to_fqdn())),
        }
    }
}
