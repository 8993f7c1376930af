//! Access to the lease backend, neighbor table and vendor database.
//!
//! Every collaborator is reached through the host's configuration daemon as a
//! named action that prints JSON. [`Backend`] is the seam: production code runs
//! the control tool, tests script the output. The typed query functions below
//! are the only place raw backend JSON is decoded.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::de::{lenient_opt_string, lenient_string, lenient_timestamp};

pub const ACTION_NDP: &str = "interface list ndp json";
pub const ACTION_MACDB: &str = "interface list macdb json";
pub const ACTION_LEASES: &str = "dhcpd6 list leases";
pub const ACTION_STATIC: &str = "dhcpd6 list static";
pub const ACTION_REMOVE: &str = "dhcpd6 remove lease";

/// Uppercase six hex digit MAC prefix -> vendor name.
pub type VendorTable = HashMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("action '{action}' exited with {status}: {stderr}")]
    Status {
        action: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("action '{action}' returned non UTF-8 output")]
    Utf8 { action: String },
    #[error("action '{action}' returned invalid JSON: {source}")]
    Json {
        action: String,
        #[source]
        source: serde_json::Error,
    },
}

pub trait Backend: Send + Sync {
    /// Run a named action with positional parameters and return its stdout.
    fn run(&self, action: &str, params: &[&str]) -> Result<String, BackendError>;
}

/// Runs actions through the configuration daemon's command line client.
#[derive(Debug, Clone)]
pub struct Configctl {
    program: PathBuf,
}

impl Configctl {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Backend for Configctl {
    fn run(&self, action: &str, params: &[&str]) -> Result<String, BackendError> {
        let output = Command::new(&self.program)
            .args(action.split_whitespace())
            .args(params)
            .output()
            .map_err(|source| BackendError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(BackendError::Status {
                action: action.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| BackendError::Utf8 {
            action: action.to_string(),
        })
    }
}

/// One row of the neighbor (NDP) table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NdpEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub ip: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mac: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub manufacturer: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub intf: String,
}

/// A static DHCPv6 mapping from the server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StaticReservation {
    #[serde(default, deserialize_with = "lenient_string")]
    pub ipaddrv6: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub descr: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub duid: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub interface: String,
}

/// A lease as dumped by the DHCPv6 server, before any formatting.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLease {
    #[serde(default, deserialize_with = "lenient_string")]
    pub lease_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub iaid: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub duid: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub iaid_duid: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub cltt: Option<i64>,
    #[serde(default)]
    pub addresses: Vec<RawAddress>,
    #[serde(default)]
    pub prefixes: Vec<RawPrefix>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAddress {
    #[serde(default, deserialize_with = "lenient_string")]
    pub iaaddr: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub binding: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub ends: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPrefix {
    #[serde(default, deserialize_with = "lenient_string")]
    pub iaprefix: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub binding: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub ends: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct StaticListing {
    #[serde(default)]
    dhcpd: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RemoveResponse {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub removed_leases: Option<String>,
}

impl RemoveResponse {
    /// True when the backend reports at least one removed lease.
    pub fn removed_any(&self) -> bool {
        match self.removed_leases.as_deref().map(str::trim) {
            None | Some("") => false,
            Some(count) => count.parse::<u64>().map_or(true, |n| n != 0),
        }
    }
}

/// Current neighbor table. Empty when the backend fails.
pub fn neighbors(backend: &dyn Backend) -> Vec<NdpEntry> {
    fetch_list(backend, ACTION_NDP, &[])
}

/// MAC prefix to vendor table. Non-string vendor values are dropped.
pub fn vendor_table(backend: &dyn Backend) -> VendorTable {
    let Some(Value::Object(map)) = fetch_json(backend, ACTION_MACDB, &[]) else {
        return VendorTable::new();
    };

    map.into_iter()
        .filter_map(|(prefix, vendor)| match vendor {
            Value::String(vendor) => Some((prefix.to_ascii_uppercase(), vendor)),
            _ => None,
        })
        .collect()
}

/// Dynamic leases, optionally including expired and released ones.
pub fn leases(backend: &dyn Backend, include_inactive: bool) -> Vec<RawLease> {
    let flag = if include_inactive { "1" } else { "0" };
    fetch_list(backend, ACTION_LEASES, &[flag])
}

/// Static mappings from the DHCPv6 server configuration.
pub fn static_reservations(backend: &dyn Backend) -> Vec<StaticReservation> {
    let Some(value) = fetch_json(backend, ACTION_STATIC, &["0"]) else {
        return Vec::new();
    };

    match serde_json::from_value::<StaticListing>(value) {
        Ok(listing) => decode_entries(ACTION_STATIC, listing.dhcpd),
        Err(e) => {
            warn!(action = ACTION_STATIC, %e, "unexpected static reservation listing");
            Vec::new()
        }
    }
}

/// Ask the backend to drop every lease for `ip`.
pub fn remove_lease(backend: &dyn Backend, ip: &str) -> Result<RemoveResponse, BackendError> {
    let raw = backend.run(ACTION_REMOVE, &[ip])?;
    serde_json::from_str(&raw).map_err(|source| BackendError::Json {
        action: ACTION_REMOVE.to_string(),
        source,
    })
}

fn fetch_json(backend: &dyn Backend, action: &str, params: &[&str]) -> Option<Value> {
    let raw = match backend.run(action, params) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(action, %e, "backend action failed");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(action, %e, "backend returned invalid JSON");
            None
        }
    }
}

fn fetch_list<T: DeserializeOwned>(backend: &dyn Backend, action: &str, params: &[&str]) -> Vec<T> {
    match fetch_json(backend, action, params) {
        Some(Value::Array(entries)) => decode_entries(action, entries),
        Some(other) => {
            warn!(action, kind = value_kind(&other), "expected a JSON list");
            Vec::new()
        }
        None => Vec::new(),
    }
}

/// Decode entries one at a time so a single malformed row is skipped, not fatal.
fn decode_entries<T: DeserializeOwned>(action: &str, entries: Vec<Value>) -> Vec<T> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(idx, entry)| match serde_json::from_value(entry) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                debug!(action, idx, %e, "skipping malformed entry");
                None
            }
        })
        .collect()
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
