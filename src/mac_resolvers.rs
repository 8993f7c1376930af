//! MAC address and vendor inference for lease records.
//!
//! A lease record carries an address and usually a DUID but no hardware
//! address. Resolvers are tried in order and the first one that produces a
//! result wins.

use std::str::FromStr;

use advmac::MacAddr6;
use tracing::debug;

use crate::backend::{NdpEntry, VendorTable};
use crate::neighbors::find_by_address;

/// MAC address resolution method.
///
/// Variants are listed in order of reliability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacResolver {
    /// Look the record's address up in the live neighbor table.
    Neighbor,

    /// Parse the link-layer address embedded in a DUID-LLT or DUID-LL.
    /// RFC 8415 section 11 warns the client may no longer use this address,
    /// so the result is only kept when its OUI is a known vendor.
    Duid,
}

/// Resolution order used by the lease lister.
pub const DEFAULT_CHAIN: [MacResolver; 2] = [MacResolver::Neighbor, MacResolver::Duid];

/// Lookup tables shared by all resolvers for one request.
pub struct ResolveContext<'a> {
    pub neighbors: &'a [NdpEntry],
    pub vendors: &'a VendorTable,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HardwareInfo {
    pub mac: String,
    /// May be empty when the neighbor table has no vendor for the MAC.
    pub vendor: String,
}

impl MacResolver {
    /// Attempt to resolve hardware information using this method.
    pub fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        address: &str,
        duid: &str,
    ) -> Option<HardwareInfo> {
        match self {
            Self::Neighbor => resolve_neighbor(ctx.neighbors, address),
            Self::Duid => resolve_duid(ctx.vendors, duid),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Neighbor => "neighbor",
            Self::Duid => "duid",
        }
    }
}

/// Run `chain` in order and return the first hit with the resolver that produced it.
pub fn resolve_hardware(
    chain: &[MacResolver],
    ctx: &ResolveContext<'_>,
    address: &str,
    duid: &str,
) -> Option<(HardwareInfo, MacResolver)> {
    chain.iter().find_map(|resolver| {
        resolver
            .resolve(ctx, address, duid)
            .map(|info| (info, *resolver))
    })
}

fn resolve_neighbor(neighbors: &[NdpEntry], address: &str) -> Option<HardwareInfo> {
    find_by_address(neighbors, address).map(|entry| HardwareInfo {
        mac: entry.mac.clone(),
        vendor: entry.manufacturer.clone(),
    })
}

fn resolve_duid(vendors: &VendorTable, duid: &str) -> Option<HardwareInfo> {
    let mac = mac_from_duid(duid)?;
    let prefix = vendor_prefix(mac)?;

    match vendors.get(&prefix) {
        Some(vendor) => Some(HardwareInfo {
            mac: mac.to_string(),
            vendor: vendor.clone(),
        }),
        None => {
            debug!(duid, %prefix, "DUID MAC has no known vendor, discarding");
            None
        }
    }
}

/// DUID type prefixes (RFC 8415) in the colon separated text form the
/// backend prints.
const DUID_LLT: &str = "00:01"; // Link-layer address plus time
const DUID_LL: &str = "00:03"; // Link-layer address

/// Hardware type for Ethernet from IANA.
const HTYPE_ETHERNET: &str = "00:01";

/// Length of a colon separated 48-bit MAC in text form.
const MAC_TEXT_LEN: usize = 17;

/// Extract the MAC text from a DUID-LLT or DUID-LL with Ethernet hardware type.
///
/// DUID-LLT format: type(2) + htype(2) + time(4) + link-layer(6)
/// DUID-LL format:  type(2) + htype(2) + link-layer(6)
///
/// Either way the link-layer address is the trailing 17 characters.
pub fn mac_from_duid(duid: &str) -> Option<&str> {
    let duid_type = duid.get(0..5)?;
    if duid_type != DUID_LLT && duid_type != DUID_LL {
        debug!(duid, "DUID type does not contain a link-layer address");
        return None;
    }

    let htype = duid.get(6..11)?;
    if htype != HTYPE_ETHERNET {
        debug!(duid, htype, "DUID hardware type is not Ethernet");
        return None;
    }

    // type + htype + one MAC is the shortest DUID carrying a link-layer address
    if duid.len() < 12 + MAC_TEXT_LEN {
        return None;
    }
    duid.get(duid.len() - MAC_TEXT_LEN..)
}

/// Uppercase six hex digit OUI used as the vendor table key.
pub fn vendor_prefix(mac: &str) -> Option<String> {
    if MacAddr6::from_str(mac).is_err() {
        debug!(mac, "not a parseable MAC address");
        return None;
    }

    let hex: String = mac.chars().filter(|c| c.is_ascii_hexdigit()).collect();
    hex.get(0..6).map(str::to_ascii_uppercase)
}
