//! Consistency and DNSSEC sanity checks for DNS zones.
//!
//! [`ZoneValidator`] runs the record rules over a zone's records and a
//! snapshot of its DNSSEC state, [`check_delegation`] verifies that the
//! parent zone delegates to it. Problems found in the zone are reported as
//! [`Diagnostic`]s; only failures of the record source or DNSSEC provider
//! surface as [`CheckError`].

pub mod config;
pub mod dns;
pub mod error;
pub mod zone;

pub use config::CheckConfig;
pub use dns::{DomainName, RecordType};
pub use error::{CheckError, ConfigError, Result};
pub use zone::{
    Diagnostic, DnssecState, ResourceRecord, Severity, ZoneReport, ZoneState, ZoneValidator,
    check_delegation, check_zone,
};
