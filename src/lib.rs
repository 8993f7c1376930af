use chrono::{Local, TimeZone};
use compact_str::CompactString;
use serde::Serialize;

pub mod backend;
pub mod config;
pub mod de;
pub mod interfaces;
pub mod logging;
pub mod mac_resolvers;
pub mod mgmt;
pub mod neighbors;
pub mod recordset;
pub mod service;
#[cfg(unix)]
pub mod signal;

/// Display format for every lease timestamp, rendered in local time.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Binding state the backend reports for a lease that has run out.
const BINDING_FREE: &str = "free";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaseKind {
    Dynamic,
    Static,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OnlineStatus {
    Online,
    #[default]
    Offline,
}

/// A dynamic lease or static reservation as shown to the operator.
///
/// Field names on the wire follow the grid columns of the web UI, hence
/// `type`, `if` and `man`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaseRecord {
    #[serde(rename = "type")]
    pub kind: LeaseKind,
    pub status: OnlineStatus,
    pub lease_type: String,
    pub iaid: String,
    pub duid: String,
    pub iaid_duid: String,
    pub address: String,
    pub state: String,
    pub cltt: String,
    pub ends: String,
    #[serde(rename = "if")]
    pub interface: CompactString,
    #[serde(rename = "if_descr")]
    pub interface_descr: String,
    pub mac: String,
    #[serde(rename = "man")]
    pub vendor: String,
    pub descr: String,
}

/// A delegated prefix (IA_PD) lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrefixRecord {
    pub lease_type: String,
    pub iaid: String,
    pub duid: String,
    pub prefix: String,
    pub state: String,
    pub cltt: String,
    pub ends: String,
}

/// Map a backend binding state to the state shown in listings.
///
/// `free` is reported as `expired`; everything else passes through.
pub fn display_state(binding: &str) -> String {
    if binding == BINDING_FREE {
        "expired".to_string()
    } else {
        binding.to_string()
    }
}

/// Render a unix timestamp as local time, or the empty string when absent.
pub fn format_timestamp(epoch: Option<i64>) -> String {
    epoch
        .and_then(|secs| Local.timestamp_opt(secs, 0).single())
        .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}
