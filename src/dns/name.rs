use serde::{Serialize, Serializer};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt::{self, Write as _};
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Maximum length of a single label (RFC 1035)
pub const MAX_LABEL_LENGTH: usize = 63;

/// Maximum wire length of a domain name, including the root label (RFC 1035)
pub const MAX_NAME_LENGTH: usize = 255;

/// Errors raised while building a domain name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("DNS label too long: {0} bytes")]
    LabelTooLong(usize),

    #[error("Domain name too long: {0} bytes")]
    NameTooLong(usize),

    #[error("Empty label in domain name: {0}")]
    EmptyLabel(String),

    #[error("Invalid escape sequence in domain name: {0}")]
    InvalidEscape(String),
}

/// A domain name held as a sequence of raw labels, leftmost label first.
///
/// Equality, hashing and ordering ignore ASCII case. Ordering follows the
/// DNSSEC canonical order: labels are compared from the rightmost one, so
/// `example.com` sorts before `a.example.com` which sorts before `b.example.com`.
#[derive(Clone, Default)]
pub struct DomainName {
    labels: SmallVec<[Vec<u8>; 4]>,
}

impl DomainName {
    /// The root name
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a name in presentation format.
    ///
    /// The trailing dot is optional, `\.` and `\DDD` escapes are decoded, and
    /// both the empty string and `.` denote the root.
    pub fn parse(text: &str) -> Result<Self, NameError> {
        let text = text.trim();
        if text.is_empty() || text == "." {
            return Ok(Self::root());
        }

        let bytes = text.as_bytes();
        let mut labels = SmallVec::new();
        let mut current = Vec::new();
        let mut pos = 0;

        while pos < bytes.len() {
            match bytes[pos] {
                b'\\' => {
                    let (byte, next) = unescape(bytes, pos)
                        .ok_or_else(|| NameError::InvalidEscape(text.to_string()))?;
                    current.push(byte);
                    pos = next;
                }
                b'.' => {
                    if current.is_empty() {
                        return Err(NameError::EmptyLabel(text.to_string()));
                    }
                    Self::check_label(&current)?;
                    labels.push(std::mem::take(&mut current));
                    pos += 1;
                }
                byte => {
                    current.push(byte);
                    pos += 1;
                }
            }
        }

        if !current.is_empty() {
            Self::check_label(&current)?;
            labels.push(current);
        }

        let name = Self { labels };
        name.check_length()?;
        Ok(name)
    }

    /// Build a name from raw (unescaped) labels, leftmost first
    pub fn from_labels<I, L>(labels: I) -> Result<Self, NameError>
    where
        I: IntoIterator<Item = L>,
        L: AsRef<[u8]>,
    {
        let mut collected = SmallVec::new();
        for label in labels {
            let label = label.as_ref();
            if label.is_empty() {
                return Err(NameError::EmptyLabel(String::from_utf8_lossy(label).into_owned()));
            }
            Self::check_label(label)?;
            collected.push(label.to_vec());
        }

        let name = Self { labels: collected };
        name.check_length()?;
        Ok(name)
    }

    fn check_label(label: &[u8]) -> Result<(), NameError> {
        if label.len() > MAX_LABEL_LENGTH {
            return Err(NameError::LabelTooLong(label.len()));
        }
        Ok(())
    }

    fn check_length(&self) -> Result<(), NameError> {
        let length = self.wire_length();
        if length > MAX_NAME_LENGTH {
            return Err(NameError::NameTooLong(length));
        }
        Ok(())
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Raw labels, leftmost first
    pub fn labels(&self) -> impl Iterator<Item = &[u8]> {
        self.labels.iter().map(Vec::as_slice)
    }

    pub fn first_label(&self) -> Option<&[u8]> {
        self.labels.first().map(Vec::as_slice)
    }

    /// True when the leftmost label is `*`
    pub fn is_wildcard(&self) -> bool {
        self.first_label() == Some(b"*".as_slice())
    }

    /// Length of the name in uncompressed wire format
    pub fn wire_length(&self) -> usize {
        self.labels.iter().map(|label| label.len() + 1).sum::<usize>() + 1
    }

    /// Strip the leftmost label. Returns false if the name is already the root.
    pub fn chop_off(&mut self) -> bool {
        if self.labels.is_empty() {
            return false;
        }
        self.labels.remove(0);
        true
    }

    /// The name with its leftmost label removed, or `None` for the root
    pub fn parent(&self) -> Option<Self> {
        let mut parent = self.clone();
        parent.chop_off().then_some(parent)
    }

    /// Add a raw label in front of the name
    pub fn prepend_label(&mut self, label: &[u8]) -> Result<(), NameError> {
        if label.is_empty() {
            return Err(NameError::EmptyLabel(self.to_fqdn()));
        }
        Self::check_label(label)?;

        let length = self.wire_length() + label.len() + 1;
        if length > MAX_NAME_LENGTH {
            return Err(NameError::NameTooLong(length));
        }

        self.labels.insert(0, label.to_vec());
        Ok(())
    }

    /// Strip leftmost labels until at most `count` labels remain
    pub fn trim_to_labels(&mut self, count: usize) {
        while self.labels.len() > count {
            self.labels.remove(0);
        }
    }

    /// True if this name equals `parent` or is below it
    pub fn is_part_of(&self, parent: &DomainName) -> bool {
        if parent.labels.len() > self.labels.len() {
            return false;
        }
        self.labels
            .iter()
            .rev()
            .zip(parent.labels.iter().rev())
            .all(|(ours, theirs)| ours.eq_ignore_ascii_case(theirs))
    }

    /// Absolute presentation form, with trailing dot
    pub fn to_fqdn(&self) -> String {
        if self.is_root() {
            ".".to_string()
        } else {
            format!("{}.", self)
        }
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str(".");
        }

        let mut out = String::with_capacity(self.wire_length());
        for (i, label) in self.labels.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            for &byte in label {
                push_escaped(&mut out, byte, b".\\", false);
            }
        }
        f.write_str(&out)
    }
}

impl fmt::Debug for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DomainName({})", self.to_fqdn())
    }
}

impl FromStr for DomainName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialEq for DomainName {
    fn eq(&self, other: &Self) -> bool {
        self.labels.len() == other.labels.len()
            && self
                .labels
                .iter()
                .zip(other.labels.iter())
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

impl Eq for DomainName {}

impl Hash for DomainName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.labels.len());
        for label in &self.labels {
            state.write_usize(label.len());
            for byte in label {
                state.write_u8(byte.to_ascii_lowercase());
            }
        }
    }
}

impl Ord for DomainName {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.labels.iter().rev().zip(other.labels.iter().rev()) {
            let ord = a
                .iter()
                .map(u8::to_ascii_lowercase)
                .cmp(b.iter().map(u8::to_ascii_lowercase));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.labels.len().cmp(&other.labels.len())
    }
}

impl PartialOrd for DomainName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for DomainName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_fqdn())
    }
}

/// Decode the `\X` or `\DDD` escape whose backslash sits at `pos`.
/// Returns the decoded byte and the position just past the escape.
pub(crate) fn unescape(bytes: &[u8], pos: usize) -> Option<(u8, usize)> {
    let rest = bytes.get(pos + 1..)?;
    match rest.first()? {
        digit if digit.is_ascii_digit() => {
            let digits = rest.get(..3)?;
            if !digits.iter().all(u8::is_ascii_digit) {
                return None;
            }
            let value = digits
                .iter()
                .fold(0u16, |acc, d| acc * 10 + u16::from(d - b'0'));
            u8::try_from(value).ok().map(|byte| (byte, pos + 4))
        }
        &byte => Some((byte, pos + 2)),
    }
}

/// Append `byte` in presentation form: bytes in `specials` get a backslash,
/// anything non-printable becomes `\DDD`.
pub(crate) fn push_escaped(out: &mut String, byte: u8, specials: &[u8], keep_space: bool) {
    if specials.contains(&byte) {
        out.push('\\');
        out.push(char::from(byte));
    } else if byte.is_ascii_graphic() || (keep_space && byte == b' ') {
        out.push(char::from(byte));
    } else {
        let _ = write!(out, "\\{:03}", byte);
    }
}
