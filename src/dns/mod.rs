pub mod enums;
pub mod name;

pub use enums::{RecordType, UnknownRecordType};
pub use name::{DomainName, NameError};
