use super::diagnostic::Diagnostic;
use super::source::RecordSource;
use crate::dns::{DomainName, RecordType};
use crate::error::Result;
use tracing::debug;

/// Verify that the closest enclosing zone served by `source` delegates `zone`.
///
/// Only the first ancestor that is a zone apex is examined. When no ancestor
/// is served there is nothing to check and no diagnostic is returned.
pub fn check_delegation<S>(zone: &DomainName, source: &S) -> Result<Vec<Diagnostic>>
where
    S: RecordSource + ?Sized,
{
    let mut parent = zone.clone();
    while parent.chop_off() {
        let Some(soa) = source.get_soa(&parent)? else {
            continue;
        };

        debug!("Found parent zone {} of {}", parent, zone);
        let delegated = source
            .lookup(None, zone, soa.zone_id)?
            .iter()
            .any(|record| record.rtype == RecordType::NS);

        if delegated {
            return Ok(Vec::new());
        }
        return Ok(vec![Diagnostic::error(format!(
            "No delegation for zone '{}' in parent '{}'",
            zone.to_fqdn(),
            parent.to_fqdn()
        ))]);
    }

    debug!("No parent zone of {} is served", zone);
    Ok(Vec::new())
}
