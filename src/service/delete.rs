use std::net::Ipv6Addr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::backend::{self, Backend};

/// Method of the request that asked for the deletion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    #[default]
    Get,
    Head,
    Options,
    Post,
    Put,
    Patch,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteResult {
    Deleted,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub result: DeleteResult,
}

impl DeleteOutcome {
    const fn failed() -> Self {
        Self {
            result: DeleteResult::Failed,
        }
    }
}

/// Remove the lease for `ip`.
///
/// Only POST requests reach the backend. The result is `deleted` when the
/// backend reports a non-zero removal count and `failed` in every other case.
pub fn del_lease(backend: &dyn Backend, method: RequestMethod, ip: &str) -> DeleteOutcome {
    if method != RequestMethod::Post {
        warn!(?method, ip, "refusing lease removal without POST");
        return DeleteOutcome::failed();
    }

    let ip = ip.trim();
    if ip.parse::<Ipv6Addr>().is_err() {
        warn!(ip, "refusing lease removal for invalid address");
        return DeleteOutcome::failed();
    }

    match backend::remove_lease(backend, ip) {
        Ok(resp) if resp.removed_any() => {
            info!(ip, removed = ?resp.removed_leases, "removed lease");
            DeleteOutcome {
                result: DeleteResult::Deleted,
            }
        }
        Ok(resp) => {
            info!(ip, removed = ?resp.removed_leases, "backend removed no leases");
            DeleteOutcome::failed()
        }
        Err(e) => {
            warn!(ip, %e, "lease removal failed");
            DeleteOutcome::failed()
        }
    }
}
