use std::sync::Arc;

use crate::backend::Backend;
use crate::config::SharedConfig;
use crate::recordset::{Recordset, SearchParams};

pub mod delete;
pub mod leases;
pub mod prefixes;

pub use delete::{del_lease, DeleteOutcome, DeleteResult, RequestMethod};
pub use leases::{search_lease, LeaseQuery, LeaseSearchResponse};
pub use prefixes::search_prefix;

/// Lease reporting operations bound to a backend and a configuration snapshot.
#[derive(Clone)]
pub struct LeaseService {
    backend: Arc<dyn Backend>,
    config: SharedConfig,
}

impl LeaseService {
    pub fn new(backend: Arc<dyn Backend>, config: SharedConfig) -> Self {
        Self { backend, config }
    }

    pub fn search_lease(&self, query: &LeaseQuery) -> LeaseSearchResponse {
        let config = self.config.load();
        leases::search_lease(self.backend.as_ref(), &config, query)
    }

    pub fn search_prefix(&self, params: &SearchParams) -> Recordset {
        prefixes::search_prefix(self.backend.as_ref(), params)
    }

    pub fn del_lease(&self, method: RequestMethod, ip: &str) -> DeleteOutcome {
        delete::del_lease(self.backend.as_ref(), method, ip)
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }
}
