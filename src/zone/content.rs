//! Record content codec.
//!
//! Parses the textual rdata a backend stores into a typed representation and
//! renders it back, so the checker can tell whether stored content is in the
//! canonical form the server would produce itself.

use super::errors::{ContentError, Result};
use crate::dns::name::{push_escaped, unescape};
use crate::dns::{DomainName, RecordType};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, NaiveDate};
use std::borrow::Cow;
use std::fmt::Write as _;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Number of whitespace separated fields in SOA content
pub const SOA_FIELD_COUNT: usize = 7;

/// Maximum length of a character-string
const MAX_STRING_LENGTH: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Soa {
    pub mname: DomainName,
    pub rname: DomainName,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rrsig {
    pub type_covered: RecordType,
    pub algorithm: u8,
    pub labels: u8,
    pub original_ttl: u32,
    pub expiration: u32,
    pub inception: u32,
    pub key_tag: u16,
    pub signer: DomainName,
    pub signature: Vec<u8>,
}

/// Parsed record content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordContent {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    /// NS, CNAME, DNAME and PTR: a single target name
    Name(DomainName),
    Mx {
        preference: u16,
        exchange: DomainName,
    },
    Srv {
        priority: u16,
        weight: u16,
        port: u16,
        target: DomainName,
    },
    Soa(Soa),
    Txt(Vec<Vec<u8>>),
    Hinfo {
        cpu: Vec<u8>,
        os: Vec<u8>,
    },
    Caa {
        flags: u8,
        tag: String,
        value: Vec<u8>,
    },
    /// DS and CDS
    Ds {
        key_tag: u16,
        algorithm: u8,
        digest_type: u8,
        digest: Vec<u8>,
    },
    /// DNSKEY and CDNSKEY
    Dnskey {
        flags: u16,
        protocol: u8,
        algorithm: u8,
        public_key: Vec<u8>,
    },
    Rrsig(Rrsig),
    Nsec {
        next: DomainName,
        types: Vec<RecordType>,
    },
    Nsec3 {
        algorithm: u8,
        flags: u8,
        iterations: u16,
        salt: Vec<u8>,
        next_hashed: Vec<u8>,
        types: Vec<RecordType>,
    },
    Nsec3Param {
        algorithm: u8,
        flags: u8,
        iterations: u16,
        salt: Vec<u8>,
    },
    Tlsa {
        usage: u8,
        selector: u8,
        matching_type: u8,
        data: Vec<u8>,
    },
    Sshfp {
        algorithm: u8,
        fp_type: u8,
        fingerprint: Vec<u8>,
    },
    /// Types without a dedicated parser; content is kept verbatim
    Opaque(String),
}

/// Outcome of comparing stored content with its canonical rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentCheck {
    Canonical,
    NonCanonical { rendered: String },
    /// AAAA content that is not a plain IPv6 literal
    InvalidIpv6,
}

impl RecordContent {
    /// Parse `content` as rdata of type `rtype`
    pub fn parse(rtype: RecordType, content: &str) -> Result<Self> {
        if content.trim().is_empty() && has_parser(rtype) {
            return Err(ContentError::Empty);
        }

        let fields: Vec<&str> = content.split_whitespace().collect();

        match rtype {
            RecordType::A => {
                expect_fields(rtype, &fields, 1)?;
                fields[0]
                    .parse()
                    .map(RecordContent::A)
                    .map_err(|_| ContentError::InvalidIpv4(fields[0].to_string()))
            }
            RecordType::AAAA => {
                expect_fields(rtype, &fields, 1)?;
                fields[0]
                    .parse()
                    .map(RecordContent::Aaaa)
                    .map_err(|_| ContentError::InvalidIpv6(fields[0].to_string()))
            }
            RecordType::NS | RecordType::CNAME | RecordType::DNAME | RecordType::PTR => {
                expect_fields(rtype, &fields, 1)?;
                Ok(RecordContent::Name(parse_name(fields[0])?))
            }
            RecordType::MX => {
                expect_fields(rtype, &fields, 2)?;
                Ok(RecordContent::Mx {
                    preference: number("MX preference", fields[0])?,
                    exchange: parse_name(fields[1])?,
                })
            }
            RecordType::SRV => {
                expect_fields(rtype, &fields, 4)?;
                Ok(RecordContent::Srv {
                    priority: number("SRV priority", fields[0])?,
                    weight: number("SRV weight", fields[1])?,
                    port: number("SRV port", fields[2])?,
                    target: parse_name(fields[3])?,
                })
            }
            RecordType::SOA => {
                expect_fields(rtype, &fields, SOA_FIELD_COUNT)?;
                Ok(RecordContent::Soa(Soa {
                    mname: parse_name(fields[0])?,
                    rname: parse_name(fields[1])?,
                    serial: number("SOA serial", fields[2])?,
                    refresh: number("SOA refresh", fields[3])?,
                    retry: number("SOA retry", fields[4])?,
                    expire: number("SOA expire", fields[5])?,
                    minimum: number("SOA minimum", fields[6])?,
                }))
            }
            RecordType::TXT => {
                let strings = character_strings(content)?;
                if strings.is_empty() {
                    return Err(ContentError::Empty);
                }
                Ok(RecordContent::Txt(strings))
            }
            RecordType::HINFO => {
                let mut strings = character_strings(content)?;
                if strings.len() != 2 {
                    return Err(ContentError::FieldCount {
                        rtype,
                        expected: 2,
                        got: strings.len(),
                    });
                }
                let os = strings.pop().unwrap_or_default();
                let cpu = strings.pop().unwrap_or_default();
                Ok(RecordContent::Hinfo { cpu, os })
            }
            RecordType::CAA => parse_caa(rtype, content),
            RecordType::DS | RecordType::CDS => {
                let (head, rest) = split_fields(content, 3);
                expect_head(rtype, &head, rest, 3)?;
                Ok(RecordContent::Ds {
                    key_tag: number("DS key tag", head[0])?,
                    algorithm: number("DS algorithm", head[1])?,
                    digest_type: number("DS digest type", head[2])?,
                    digest: decode_hex(rest)?,
                })
            }
            RecordType::DNSKEY | RecordType::CDNSKEY => {
                let (head, rest) = split_fields(content, 3);
                expect_head(rtype, &head, rest, 3)?;
                Ok(RecordContent::Dnskey {
                    flags: number("DNSKEY flags", head[0])?,
                    protocol: number("DNSKEY protocol", head[1])?,
                    algorithm: number("DNSKEY algorithm", head[2])?,
                    public_key: decode_base64(rest)?,
                })
            }
            RecordType::RRSIG => {
                let (head, rest) = split_fields(content, 8);
                expect_head(rtype, &head, rest, 8)?;
                Ok(RecordContent::Rrsig(Rrsig {
                    type_covered: head[0]
                        .parse()
                        .map_err(|_| ContentError::UnknownType(head[0].to_string()))?,
                    algorithm: number("RRSIG algorithm", head[1])?,
                    labels: number("RRSIG labels", head[2])?,
                    original_ttl: number("RRSIG original TTL", head[3])?,
                    expiration: parse_timestamp(head[4])?,
                    inception: parse_timestamp(head[5])?,
                    key_tag: number("RRSIG key tag", head[6])?,
                    signer: parse_name(head[7])?,
                    signature: decode_base64(rest)?,
                }))
            }
            RecordType::NSEC => Ok(RecordContent::Nsec {
                next: parse_name(fields[0])?,
                types: parse_types(&fields[1..])?,
            }),
            RecordType::NSEC3 => {
                if fields.len() < 5 {
                    return Err(ContentError::FieldCount {
                        rtype,
                        expected: 5,
                        got: fields.len(),
                    });
                }
                Ok(RecordContent::Nsec3 {
                    algorithm: number("NSEC3 algorithm", fields[0])?,
                    flags: number("NSEC3 flags", fields[1])?,
                    iterations: number("NSEC3 iterations", fields[2])?,
                    salt: parse_salt(fields[3])?,
                    next_hashed: decode_base32hex(fields[4])?,
                    types: parse_types(&fields[5..])?,
                })
            }
            RecordType::NSEC3PARAM => {
                expect_fields(rtype, &fields, 4)?;
                Ok(RecordContent::Nsec3Param {
                    algorithm: number("NSEC3PARAM algorithm", fields[0])?,
                    flags: number("NSEC3PARAM flags", fields[1])?,
                    iterations: number("NSEC3PARAM iterations", fields[2])?,
                    salt: parse_salt(fields[3])?,
                })
            }
            RecordType::TLSA => {
                let (head, rest) = split_fields(content, 3);
                expect_head(rtype, &head, rest, 3)?;
                Ok(RecordContent::Tlsa {
                    usage: number("TLSA usage", head[0])?,
                    selector: number("TLSA selector", head[1])?,
                    matching_type: number("TLSA matching type", head[2])?,
                    data: decode_hex(rest)?,
                })
            }
            RecordType::SSHFP => {
                let (head, rest) = split_fields(content, 2);
                expect_head(rtype, &head, rest, 2)?;
                Ok(RecordContent::Sshfp {
                    algorithm: number("SSHFP algorithm", head[0])?,
                    fp_type: number("SSHFP fingerprint type", head[1])?,
                    fingerprint: decode_hex(rest)?,
                })
            }
            _ => Ok(RecordContent::Opaque(content.to_string())),
        }
    }

    /// Render the content in presentation format.
    ///
    /// With `no_dot` set, embedded names are rendered without their trailing
    /// dot, which is how backends store them. Otherwise names are absolute.
    pub fn render(&self, no_dot: bool) -> String {
        let name = |n: &DomainName| if no_dot { n.to_string() } else { n.to_fqdn() };

        match self {
            RecordContent::A(addr) => addr.to_string(),
            RecordContent::Aaaa(addr) => addr.to_string(),
            RecordContent::Name(target) => name(target),
            RecordContent::Mx {
                preference,
                exchange,
            } => format!("{} {}", preference, name(exchange)),
            RecordContent::Srv {
                priority,
                weight,
                port,
                target,
            } => format!("{} {} {} {}", priority, weight, port, name(target)),
            RecordContent::Soa(soa) => format!(
                "{} {} {} {} {} {} {}",
                name(&soa.mname),
                name(&soa.rname),
                soa.serial,
                soa.refresh,
                soa.retry,
                soa.expire,
                soa.minimum
            ),
            RecordContent::Txt(strings) => strings
                .iter()
                .map(|s| quote(s))
                .collect::<Vec<_>>()
                .join(" "),
            RecordContent::Hinfo { cpu, os } => format!("{} {}", quote(cpu), quote(os)),
            RecordContent::Caa { flags, tag, value } => {
                format!("{} {} {}", flags, tag, quote(value))
            }
            RecordContent::Ds {
                key_tag,
                algorithm,
                digest_type,
                digest,
            } => format!(
                "{} {} {} {}",
                key_tag,
                algorithm,
                digest_type,
                hex::encode(digest)
            ),
            RecordContent::Dnskey {
                flags,
                protocol,
                algorithm,
                public_key,
            } => format!(
                "{} {} {} {}",
                flags,
                protocol,
                algorithm,
                BASE64.encode(public_key)
            ),
            RecordContent::Rrsig(sig) => format!(
                "{} {} {} {} {} {} {} {} {}",
                sig.type_covered,
                sig.algorithm,
                sig.labels,
                sig.original_ttl,
                render_timestamp(sig.expiration),
                render_timestamp(sig.inception),
                sig.key_tag,
                name(&sig.signer),
                BASE64.encode(&sig.signature)
            ),
            RecordContent::Nsec { next, types } => render_types(name(next), types),
            RecordContent::Nsec3 {
                algorithm,
                flags,
                iterations,
                salt,
                next_hashed,
                types,
            } => render_types(
                format!(
                    "{} {} {} {} {}",
                    algorithm,
                    flags,
                    iterations,
                    render_salt(salt),
                    base32::encode(base32::Alphabet::Rfc4648HexLower { padding: false }, next_hashed)
                ),
                types,
            ),
            RecordContent::Nsec3Param {
                algorithm,
                flags,
                iterations,
                salt,
            } => format!("{} {} {} {}", algorithm, flags, iterations, render_salt(salt)),
            RecordContent::Tlsa {
                usage,
                selector,
                matching_type,
                data,
            } => format!("{} {} {} {}", usage, selector, matching_type, hex::encode(data)),
            RecordContent::Sshfp {
                algorithm,
                fp_type,
                fingerprint,
            } => format!("{} {} {}", algorithm, fp_type, hex::encode(fingerprint)),
            RecordContent::Opaque(text) => text.clone(),
        }
    }
}

/// Bring stored content into the shape the parser expects: SOA content is
/// padded with `0` fields up to seven fields, unquoted TXT content is quoted.
pub fn normalize(rtype: RecordType, content: &str) -> Cow<'_, str> {
    match rtype {
        RecordType::SOA => {
            let present = content.split_whitespace().count();
            if present >= SOA_FIELD_COUNT {
                return Cow::Borrowed(content);
            }
            let mut padded = content.to_string();
            for _ in present..SOA_FIELD_COUNT {
                padded.push_str(" 0");
            }
            Cow::Owned(padded)
        }
        RecordType::TXT if !content.is_empty() && !content.starts_with('"') => {
            Cow::Owned(format!("\"{}\"", content))
        }
        _ => Cow::Borrowed(content),
    }
}

/// Check that (already normalized) content survives a parse/render round trip.
///
/// AAAA content is not round-tripped: it only has to be an IPv6 literal
/// without any dotted-quad part.
pub fn verify(rtype: RecordType, content: &str) -> Result<ContentCheck> {
    if rtype == RecordType::AAAA {
        return Ok(if is_valid_ipv6(content) {
            ContentCheck::Canonical
        } else {
            ContentCheck::InvalidIpv6
        });
    }

    let parsed = RecordContent::parse(rtype, content)?;
    let mut rendered = parsed.render(true);
    if !rendered.eq_ignore_ascii_case(content) && rtype == RecordType::SOA {
        rendered = parsed.render(false);
    }

    if rendered.eq_ignore_ascii_case(content) {
        Ok(ContentCheck::Canonical)
    } else {
        Ok(ContentCheck::NonCanonical { rendered })
    }
}

pub fn is_valid_ipv6(content: &str) -> bool {
    content.parse::<Ipv6Addr>().is_ok() && !content.contains('.')
}

/// The type an RRSIG covers, read from the first field of its content
pub fn rrsig_covered_type(content: &str) -> Option<RecordType> {
    content.split_whitespace().next()?.parse().ok()
}

fn has_parser(rtype: RecordType) -> bool {
    !matches!(
        rtype,
        RecordType::SVCB | RecordType::HTTPS | RecordType::Unknown(_)
    )
}

fn expect_fields(rtype: RecordType, fields: &[&str], expected: usize) -> Result<()> {
    if fields.len() != expected {
        return Err(ContentError::FieldCount {
            rtype,
            expected,
            got: fields.len(),
        });
    }
    Ok(())
}

fn expect_head(rtype: RecordType, head: &[&str], rest: &str, count: usize) -> Result<()> {
    if head.len() < count || rest.is_empty() {
        return Err(ContentError::FieldCount {
            rtype,
            expected: count + 1,
            got: head.len() + usize::from(!rest.is_empty()),
        });
    }
    Ok(())
}

/// Split off the first `count` whitespace separated fields and return them
/// together with the untouched remainder.
fn split_fields(content: &str, count: usize) -> (Vec<&str>, &str) {
    let mut rest = content.trim_start();
    let mut fields = Vec::with_capacity(count);
    while fields.len() < count && !rest.is_empty() {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        fields.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    (fields, rest.trim_end())
}

fn number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T> {
    value.parse().map_err(|_| ContentError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

fn parse_name(value: &str) -> Result<DomainName> {
    DomainName::parse(value).map_err(|e| ContentError::InvalidName(value.to_string(), e))
}

fn parse_types(fields: &[&str]) -> Result<Vec<RecordType>> {
    fields
        .iter()
        .map(|field| {
            field
                .parse()
                .map_err(|_| ContentError::UnknownType(field.to_string()))
        })
        .collect()
}

fn render_types(mut out: String, types: &[RecordType]) -> String {
    let mut sorted = types.to_vec();
    sorted.sort_by_key(|rtype| rtype.code());
    sorted.dedup();
    for rtype in sorted {
        let _ = write!(out, " {}", rtype);
    }
    out
}

fn decode_hex(value: &str) -> Result<Vec<u8>> {
    let compact: String = value.split_whitespace().collect();
    hex::decode(&compact).map_err(|_| ContentError::InvalidHex(value.to_string()))
}

fn decode_base64(value: &str) -> Result<Vec<u8>> {
    let compact: String = value.split_whitespace().collect();
    BASE64
        .decode(compact.as_bytes())
        .map_err(|_| ContentError::InvalidBase64(value.to_string()))
}

fn decode_base32hex(value: &str) -> Result<Vec<u8>> {
    base32::decode(
        base32::Alphabet::Rfc4648Hex { padding: false },
        &value.to_ascii_uppercase(),
    )
    .ok_or_else(|| ContentError::InvalidBase32(value.to_string()))
}

fn parse_salt(value: &str) -> Result<Vec<u8>> {
    if value == "-" {
        Ok(Vec::new())
    } else {
        decode_hex(value)
    }
}

fn render_salt(salt: &[u8]) -> String {
    if salt.is_empty() {
        "-".to_string()
    } else {
        hex::encode(salt)
    }
}

/// Signature times are either `YYYYMMDDHHmmSS` (UTC) or seconds since the epoch.
/// Dates outside the 32-bit range wrap around (RFC 4034 serial arithmetic).
fn parse_timestamp(value: &str) -> Result<u32> {
    let invalid = || ContentError::InvalidTimestamp(value.to_string());

    if value.len() == 14 && value.bytes().all(|b| b.is_ascii_digit()) {
        let part = |range: std::ops::Range<usize>| value[range].parse::<u32>().map_err(|_| invalid());
        let year = i32::try_from(part(0..4)?).map_err(|_| invalid())?;
        let time = NaiveDate::from_ymd_opt(year, part(4..6)?, part(6..8)?)
            .and_then(|date| date.and_hms_opt(part(8..10).ok()?, part(10..12).ok()?, part(12..14).ok()?))
            .ok_or_else(invalid)?;
        u32::try_from(time.and_utc().timestamp().rem_euclid(1 << 32)).map_err(|_| invalid())
    } else {
        value.parse::<u32>().map_err(|_| invalid())
    }
}

fn render_timestamp(timestamp: u32) -> String {
    DateTime::from_timestamp(i64::from(timestamp), 0)
        .map(|time| time.format("%Y%m%d%H%M%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

fn parse_caa(rtype: RecordType, content: &str) -> Result<RecordContent> {
    let (head, rest) = split_fields(content, 2);
    expect_head(rtype, &head, rest, 2)?;

    let mut values = character_strings(rest)?;
    if values.len() != 1 {
        return Err(ContentError::FieldCount {
            rtype,
            expected: 3,
            got: head.len() + values.len(),
        });
    }

    Ok(RecordContent::Caa {
        flags: number("CAA flags", head[0])?,
        tag: head[1].to_string(),
        value: values.pop().unwrap_or_default(),
    })
}

/// Split content into character-strings, quoted or bare, decoding escapes
fn character_strings(input: &str) -> Result<Vec<Vec<u8>>> {
    let bytes = input.as_bytes();
    let mut strings = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos].is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let quoted = bytes[pos] == b'"';
        if quoted {
            pos += 1;
        }

        let mut current = Vec::new();
        let mut closed = !quoted;
        while pos < bytes.len() {
            match bytes[pos] {
                b'"' if quoted => {
                    closed = true;
                    pos += 1;
                    break;
                }
                byte if !quoted && byte.is_ascii_whitespace() => break,
                b'\\' => {
                    let (byte, next) = unescape(bytes, pos)
                        .ok_or_else(|| ContentError::InvalidEscape(input.to_string()))?;
                    current.push(byte);
                    pos = next;
                }
                byte => {
                    current.push(byte);
                    pos += 1;
                }
            }
        }

        if !closed {
            return Err(ContentError::UnterminatedString(input.to_string()));
        }
        if current.len() > MAX_STRING_LENGTH {
            return Err(ContentError::StringTooLong(current.len()));
        }
        strings.push(current);
    }

    Ok(strings)
}

fn quote(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');
    for &byte in bytes {
        push_escaped(&mut out, byte, b"\"\\", true);
    }
    out.push('"');
    out
}
