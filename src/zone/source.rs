use super::ResourceRecord;
use crate::dns::{DomainName, RecordType};
use crate::error::Result;

/// Backend identifier of a zone
pub type ZoneId = u32;

/// What a backend knows about a zone apex
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoaData {
    pub zone: DomainName,
    pub zone_id: ZoneId,
    /// Default TTL (SOA minimum) of the zone
    pub default_ttl: u32,
    pub serial: u32,
}

/// Read access to a backend's zones and records
pub trait RecordSource {
    /// SOA data for `name` if `name` is the apex of a zone this source serves
    fn get_soa(&self, name: &DomainName) -> Result<Option<SoaData>>;

    /// Records at `name` in zone `zone_id`, all types when `rtype` is `None`
    fn lookup(
        &self,
        rtype: Option<RecordType>,
        name: &DomainName,
        zone_id: ZoneId,
    ) -> Result<Vec<ResourceRecord>>;

    /// Every record of a zone, in backend order
    fn list(&self, zone: &DomainName, zone_id: ZoneId) -> Result<Vec<ResourceRecord>>;
}

impl<S: RecordSource + ?Sized> RecordSource for &S {
    fn get_soa(&self, name: &DomainName) -> Result<Option<SoaData>> {
        (**self).get_soa(name)
    }

    fn lookup(
        &self,
        rtype: Option<RecordType>,
        name: &DomainName,
        zone_id: ZoneId,
    ) -> Result<Vec<ResourceRecord>> {
        (**self).lookup(rtype, name, zone_id)
    }

    fn list(&self, zone: &DomainName, zone_id: ZoneId) -> Result<Vec<ResourceRecord>> {
        (**self).list(zone, zone_id)
    }
}
