use tracing::debug;

use crate::backend::{self, Backend, RawLease};
use crate::recordset::{self, Recordset, SearchParams};
use crate::{display_state, format_timestamp, PrefixRecord};

const LEASE_TYPE_PD: &str = "ia-pd";

/// List delegated prefixes, active or not, ordered by prefix by default.
pub fn search_prefix(backend: &dyn Backend, params: &SearchParams) -> Recordset {
    let prefixes: Vec<PrefixRecord> = backend::leases(backend, true)
        .into_iter()
        .filter_map(prefix_record)
        .collect();

    debug!(prefixes = prefixes.len(), "assembled prefix listing");
    recordset::search(&prefixes, params, "prefix", |_| true)
}

/// Like addresses, only the first prefix of a lease is reported.
fn prefix_record(raw: RawLease) -> Option<PrefixRecord> {
    if raw.lease_type != LEASE_TYPE_PD {
        return None;
    }
    let seg = raw
        .prefixes
        .into_iter()
        .next()
        .filter(|seg| !seg.iaprefix.trim().is_empty())?;

    Some(PrefixRecord {
        lease_type: raw.lease_type,
        iaid: raw.iaid,
        duid: raw.duid,
        prefix: seg.iaprefix,
        state: display_state(&seg.binding),
        cltt: format_timestamp(raw.cltt),
        ends: format_timestamp(seg.ends),
    })
}
