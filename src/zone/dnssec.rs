use crate::dns::DomainName;
use crate::error::Result;
use rustc_hash::FxHashMap;

/// NSEC3PARAM settings of a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Nsec3Param {
    pub algorithm: u8,
    pub flags: u8,
    pub iterations: u16,
    /// Narrow mode (hashes computed on the fly, not stored)
    pub narrow: bool,
}

impl Nsec3Param {
    /// The opt-out bit of the NSEC3 flags field
    pub fn opt_out(&self) -> bool {
        self.flags & 0x01 != 0
    }
}

/// Source of a zone's DNSSEC configuration
pub trait DnssecKeeper {
    fn is_secured_zone(&self, zone: &DomainName) -> Result<bool>;
    fn is_presigned(&self, zone: &DomainName) -> Result<bool>;
    /// False if any configured key of the zone is unusable
    fn check_keys(&self, zone: &DomainName) -> Result<bool>;
    fn get_nsec3param(&self, zone: &DomainName) -> Result<Option<Nsec3Param>>;
}

/// Immutable snapshot of a zone's DNSSEC facts, taken once per check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DnssecState {
    pub secured: bool,
    pub presigned: bool,
    pub valid_keys: bool,
    pub nsec3: Option<Nsec3Param>,
}

impl DnssecState {
    /// An unsigned zone with no key problems
    pub fn insecure() -> Self {
        Self {
            secured: false,
            presigned: false,
            valid_keys: true,
            nsec3: None,
        }
    }

    /// A zone signed on the fly with NSEC
    pub fn secured() -> Self {
        Self {
            secured: true,
            ..Self::insecure()
        }
    }

    pub fn with_nsec3(mut self, param: Nsec3Param) -> Self {
        self.nsec3 = Some(param);
        self
    }

    pub fn presigned(mut self) -> Self {
        self.presigned = true;
        self
    }

    pub fn capture<K: DnssecKeeper + ?Sized>(keeper: &K, zone: &DomainName) -> Result<Self> {
        Ok(Self {
            secured: keeper.is_secured_zone(zone)?,
            presigned: keeper.is_presigned(zone)?,
            valid_keys: keeper.check_keys(zone)?,
            nsec3: keeper.get_nsec3param(zone)?,
        })
    }

    pub fn has_nsec3(&self) -> bool {
        self.nsec3.is_some()
    }

    pub fn opt_out(&self) -> bool {
        self.nsec3.is_some_and(|param| param.opt_out())
    }
}

impl Default for DnssecState {
    fn default() -> Self {
        Self::insecure()
    }
}

/// A keeper answering from fixed per-zone states; unknown zones are insecure
#[derive(Debug, Clone, Default)]
pub struct StaticKeeper {
    zones: FxHashMap<DomainName, DnssecState>,
}

impl StaticKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, zone: DomainName, state: DnssecState) {
        self.zones.insert(zone, state);
    }

    fn state(&self, zone: &DomainName) -> DnssecState {
        self.zones.get(zone).copied().unwrap_or_default()
    }
}

impl DnssecKeeper for StaticKeeper {
    fn is_secured_zone(&self, zone: &DomainName) -> Result<bool> {
        Ok(self.state(zone).secured)
    }

    fn is_presigned(&self, zone: &DomainName) -> Result<bool> {
        Ok(self.state(zone).presigned)
    }

    fn check_keys(&self, zone: &DomainName) -> Result<bool> {
        Ok(self.state(zone).valid_keys)
    }

    fn get_nsec3param(&self, zone: &DomainName) -> Result<Option<Nsec3Param>> {
        Ok(self.state(zone).nsec3)
    }
}
