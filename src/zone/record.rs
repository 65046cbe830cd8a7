use crate::dns::{DomainName, RecordType};
use crate::error::Result;
use std::fmt;

/// A single resource record as a backend hands it over
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    /// Owner name
    pub name: DomainName,
    /// Record type
    pub rtype: RecordType,
    /// Record data in text format
    pub content: String,
    /// Time to live in seconds
    pub ttl: u32,
    /// Whether the record is authoritative data for the zone
    pub auth: bool,
}

impl ResourceRecord {
    /// Create a new authoritative record
    pub fn new(name: DomainName, rtype: RecordType, content: impl Into<String>, ttl: u32) -> Self {
        Self {
            name,
            rtype,
            content: content.into(),
            ttl,
            auth: true,
        }
    }

    /// Build a record from its textual owner name and type mnemonic
    pub fn from_text(name: &str, rtype: &str, content: impl Into<String>, ttl: u32) -> Result<Self> {
        Ok(Self::new(
            DomainName::parse(name)?,
            rtype.parse()?,
            content,
            ttl,
        ))
    }

    /// Mark the record as non-authoritative (e.g. glue or delegated data)
    pub fn non_authoritative(mut self) -> Self {
        self.auth = false;
        self
    }
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} IN {} {}", self.name.to_fqdn(), self.rtype, self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text() {
        let record = ResourceRecord::from_text("www.example.com.", "a", "192.0.2.1", 300).unwrap();
        assert_eq!(record.rtype, RecordType::A);
        assert_eq!(record.ttl, 300);
        assert!(record.auth);
        assert_eq!(record.to_string(), "www.example.com. IN A 192.0.2.1");
    }

    #[test]
    fn test_from_text_rejects_bad_input() {
        assert!(ResourceRecord::from_text("a..example", "A", "192.0.2.1", 300).is_err());
        assert!(ResourceRecord::from_text("www.example", "NOPE", "192.0.2.1", 300).is_err());
    }

    #[test]
    fn test_non_authoritative() {
        let record = ResourceRecord::from_text("ns1.sub.example.com", "A", "192.0.2.1", 300)
            .unwrap()
            .non_authoritative();
        assert!(!record.auth);
    }
}
