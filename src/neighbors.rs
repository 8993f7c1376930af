use std::collections::HashSet;
use std::net::IpAddr;

use crate::backend::NdpEntry;
use crate::OnlineStatus;

/// Canonical form used whenever addresses are compared.
///
/// Parseable addresses are rendered in their canonical lowercase form so
/// `FE80:0::1` and `fe80::1` compare equal; anything else is lowercased.
pub fn normalize_address(addr: &str) -> String {
    let addr = addr.trim();
    match addr.parse::<IpAddr>() {
        Ok(ip) => ip.to_string(),
        Err(_) => addr.to_ascii_lowercase(),
    }
}

/// MACs and addresses currently present in the neighbor table.
#[derive(Debug, Default)]
pub struct OnlineSet {
    known: HashSet<String>,
}

impl OnlineSet {
    pub fn from_neighbors(entries: &[NdpEntry]) -> Self {
        let mut known = HashSet::with_capacity(entries.len() * 2);
        for entry in entries {
            if !entry.mac.is_empty() {
                known.insert(entry.mac.trim().to_ascii_lowercase());
            }
            if !entry.ip.is_empty() {
                known.insert(normalize_address(&entry.ip));
            }
        }
        Self { known }
    }

    pub fn status(&self, addr: &str) -> OnlineStatus {
        if !addr.is_empty() && self.known.contains(&normalize_address(addr)) {
            OnlineStatus::Online
        } else {
            OnlineStatus::Offline
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.known.len()
    }
}

/// First neighbor entry whose IP matches `addr`.
pub fn find_by_address<'a>(entries: &'a [NdpEntry], addr: &str) -> Option<&'a NdpEntry> {
    if addr.is_empty() {
        return None;
    }
    let wanted = normalize_address(addr);
    entries
        .iter()
        .find(|entry| normalize_address(&entry.ip) == wanted)
}
