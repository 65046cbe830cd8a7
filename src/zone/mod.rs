pub mod check;
pub mod content;
pub mod delegation;
pub mod diagnostic;
pub mod dnssec;
pub mod errors;
pub mod memory;
pub mod record;
pub mod source;

pub use check::{ZoneState, ZoneValidator, check_zone};
pub use content::{ContentCheck, RecordContent};
pub use delegation::check_delegation;
pub use diagnostic::{Diagnostic, Severity, ZoneReport};
pub use dnssec::{DnssecKeeper, DnssecState, Nsec3Param, StaticKeeper};
pub use errors::ContentError;
pub use memory::MemoryBackend;
pub use record::ResourceRecord;
pub use source::{RecordSource, SoaData, ZoneId};
