use std::collections::BTreeMap;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::backend::{self, Backend, RawLease, StaticReservation};
use crate::config::Config;
use crate::de::lenient_flag;
use crate::interfaces::InterfaceResolver;
use crate::mac_resolvers::{resolve_hardware, ResolveContext, DEFAULT_CHAIN};
use crate::neighbors::OnlineSet;
use crate::recordset::{self, Recordset, SearchParams};
use crate::{display_state, format_timestamp, LeaseKind, LeaseRecord};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaseQuery {
    /// Include expired and released leases.
    #[serde(default, deserialize_with = "lenient_flag")]
    pub inactive: bool,
    /// Only keep leases on these interfaces. Empty keeps everything.
    #[serde(default)]
    pub selected_interfaces: Vec<CompactString>,
    #[serde(flatten)]
    pub search: SearchParams,
}

impl LeaseQuery {
    fn selects(&self, interface: &str) -> bool {
        self.selected_interfaces.is_empty()
            || self.selected_interfaces.iter().any(|i| i.as_str() == interface)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LeaseSearchResponse {
    #[serde(flatten)]
    pub recordset: Recordset,
    /// Every interface at least one lease resolved to, with its description.
    pub interfaces: BTreeMap<CompactString, String>,
}

/// List dynamic leases and static reservations with hardware and interface
/// details filled in.
///
/// Backend calls happen in a fixed order: neighbor table, leases, static
/// mappings, vendor table.
pub fn search_lease(backend: &dyn Backend, config: &Config, query: &LeaseQuery) -> LeaseSearchResponse {
    let neighbors = backend::neighbors(backend);
    let online = OnlineSet::from_neighbors(&neighbors);

    let mut records: Vec<LeaseRecord> = backend::leases(backend, query.inactive)
        .into_iter()
        .filter_map(|raw| dynamic_record(raw, &online))
        .collect();
    records.extend(
        backend::static_reservations(backend)
            .into_iter()
            .map(|res| static_record(res, &online)),
    );

    let vendors = backend::vendor_table(backend);
    let ctx = ResolveContext {
        neighbors: &neighbors,
        vendors: &vendors,
    };
    let resolver = InterfaceResolver::new(config);
    let mut interfaces = BTreeMap::new();

    for record in records.iter_mut() {
        if let Some((hw, method)) =
            resolve_hardware(&DEFAULT_CHAIN, &ctx, &record.address, &record.duid)
        {
            trace!(address = %record.address, mac = %hw.mac, method = method.name(), "resolved MAC");
            record.mac = hw.mac;
            record.vendor = hw.vendor;
        }

        match resolver.resolve(&record.interface, &record.address) {
            Some(found) => {
                interfaces
                    .entry(found.name.clone())
                    .or_insert_with(|| found.descr.clone());
                record.interface = found.name;
                record.interface_descr = found.descr;
            }
            None => {
                record.interface = CompactString::default();
                record.interface_descr.clear();
            }
        }
    }

    debug!(
        records = records.len(),
        online = online.len(),
        ranges = resolver.range_count(),
        interfaces = interfaces.len(),
        "assembled lease listing"
    );

    let recordset = recordset::search(&records, &query.search, "address", |record| {
        query.selects(&record.interface)
    });

    LeaseSearchResponse {
        recordset,
        interfaces,
    }
}

/// Only the first address of a lease is reported. RFC 8415 section 6.6 allows
/// several per IA, which is rare in practice.
fn dynamic_record(raw: RawLease, online: &OnlineSet) -> Option<LeaseRecord> {
    let Some(seg) = raw
        .addresses
        .into_iter()
        .next()
        .filter(|seg| !seg.iaaddr.trim().is_empty())
    else {
        debug!(iaid_duid = %raw.iaid_duid, "lease without addresses, skipping");
        return None;
    };

    Some(LeaseRecord {
        kind: LeaseKind::Dynamic,
        status: online.status(&seg.iaaddr),
        lease_type: raw.lease_type,
        iaid: raw.iaid,
        duid: raw.duid,
        iaid_duid: raw.iaid_duid,
        state: display_state(&seg.binding),
        cltt: format_timestamp(raw.cltt),
        ends: format_timestamp(seg.ends),
        address: seg.iaaddr,
        interface: CompactString::default(),
        interface_descr: String::new(),
        mac: String::new(),
        vendor: String::new(),
        descr: String::new(),
    })
}

fn static_record(res: StaticReservation, online: &OnlineSet) -> LeaseRecord {
    LeaseRecord {
        kind: LeaseKind::Static,
        status: online.status(&res.ipaddrv6),
        lease_type: String::new(),
        iaid: String::new(),
        duid: res.duid,
        iaid_duid: String::new(),
        address: res.ipaddrv6,
        state: "active".to_string(),
        cltt: String::new(),
        ends: String::new(),
        interface: CompactString::from(res.interface),
        interface_descr: String::new(),
        mac: String::new(),
        vendor: String::new(),
        descr: res.descr,
    }
}
