use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config;
use crate::recordset::{Recordset, SearchParams};
use crate::service::{DeleteOutcome, LeaseQuery, LeaseSearchResponse, LeaseService, RequestMethod};

#[derive(Debug, Deserialize)]
#[serde(tag = "command")]
pub enum MgmtRequest {
    #[serde(rename = "search_lease")]
    SearchLease(LeaseQuery),
    #[serde(rename = "search_prefix")]
    SearchPrefix(SearchParams),
    #[serde(rename = "del_lease")]
    DelLease {
        #[serde(default)]
        method: RequestMethod,
        #[serde(default)]
        ip: String,
    },
    #[serde(rename = "reload")]
    Reload,
    #[serde(rename = "status")]
    Status,
}

impl MgmtRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SearchLease(_) => "search_lease",
            Self::SearchPrefix(_) => "search_prefix",
            Self::DelLease { .. } => "del_lease",
            Self::Reload => "reload",
            Self::Status => "status",
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct ControlResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface_count: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MgmtResponse {
    Leases(LeaseSearchResponse),
    Prefixes(Recordset),
    Delete(DeleteOutcome),
    Control(ControlResponse),
}

impl MgmtResponse {
    fn error(message: String) -> Self {
        Self::Control(ControlResponse {
            success: false,
            error: Some(message),
            ..Default::default()
        })
    }
}

/// Everything a management connection needs to answer requests.
pub struct MgmtContext {
    pub service: LeaseService,
    pub config_path: PathBuf,
}

/// Main management listener loop. Connections are served one at a time.
pub fn listener(listener: TcpListener, ctx: &MgmtContext) {
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let peer = stream.peer_addr().ok();
                handle_client(stream, ctx);
                if let Some(addr) = peer {
                    info!(%addr, "handled management request");
                }
            }
            Err(e) => {
                warn!(%e, "failed to accept management connection");
            }
        }
    }
}

fn handle_client(stream: TcpStream, ctx: &MgmtContext) {
    stream.set_read_timeout(Some(Duration::from_secs(5))).ok();
    stream.set_write_timeout(Some(Duration::from_secs(5))).ok();

    let mut reader = BufReader::new(&stream);
    let mut line = String::new();

    match reader.read_line(&mut line) {
        Ok(0) => return, // EOF
        Ok(_) => {}
        Err(e) => {
            warn!(%e, "failed to read from management client");
            return;
        }
    }

    let response = match serde_json::from_str::<MgmtRequest>(&line) {
        Ok(request) => handle_request(ctx, request),
        Err(e) => MgmtResponse::error(format!("Invalid request: {e}")),
    };

    let mut writer = stream;
    if let Err(e) = serde_json::to_writer(&mut writer, &response) {
        warn!(%e, "failed to write response");
    }
    if let Err(e) = writer.write_all(b"\n") {
        warn!(%e, "failed to terminate response");
    }
}

/// Dispatch one decoded request.
pub fn handle_request(ctx: &MgmtContext, request: MgmtRequest) -> MgmtResponse {
    let started = Instant::now();
    let command = request.name();

    let response = match request {
        MgmtRequest::SearchLease(query) => MgmtResponse::Leases(ctx.service.search_lease(&query)),
        MgmtRequest::SearchPrefix(params) => {
            MgmtResponse::Prefixes(ctx.service.search_prefix(&params))
        }
        MgmtRequest::DelLease { method, ip } => {
            MgmtResponse::Delete(ctx.service.del_lease(method, &ip))
        }
        MgmtRequest::Reload => reload(ctx, &ctx.config_path),
        MgmtRequest::Status => {
            let count = ctx.service.config().load().interfaces.len();
            MgmtResponse::Control(ControlResponse {
                success: true,
                message: Some("Status OK".into()),
                interface_count: Some(count),
                ..Default::default()
            })
        }
    };

    info!(
        command,
        elapsed_us = started.elapsed().as_micros() as u64,
        "served request"
    );
    response
}

fn reload(ctx: &MgmtContext, path: &Path) -> MgmtResponse {
    match config::reload_from_disk(ctx.service.config(), path) {
        Ok(count) => MgmtResponse::Control(ControlResponse {
            success: true,
            message: Some(format!("Reloaded {count} interfaces")),
            interface_count: Some(count),
            ..Default::default()
        }),
        Err(e) => {
            warn!(%e, "failed to reload configuration");
            MgmtResponse::error(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arc_swap::ArcSwap;
    use serde_json::{json, Value};

    use super::*;
    use crate::backend::testing::ScriptedBackend;
    use crate::config::Config;

    fn context(backend: ScriptedBackend, config_path: PathBuf) -> MgmtContext {
        let config: Config = serde_json::from_value(json!({
            "interfaces": {"lan": {"ipaddrv6": "2001:db8:1::1", "subnetv6": "64", "descr": "LAN"}},
            "dhcpdv6": {"lan": {}}
        }))
        .unwrap();
        MgmtContext {
            service: LeaseService::new(Arc::new(backend), Arc::new(ArcSwap::from_pointee(config))),
            config_path,
        }
    }

    fn dispatch(ctx: &MgmtContext, request: Value) -> Value {
        let request: MgmtRequest = serde_json::from_value(request).unwrap();
        serde_json::to_value(handle_request(ctx, request)).unwrap()
    }

    #[test]
    fn search_lease_request() {
        let backend = ScriptedBackend::new()
            .respond("interface list ndp json", "[]")
            .respond(
                "dhcpd6 list leases 1",
                r#"[{"lease_type": "ia-na", "iaid": 1, "duid": "",
                     "addresses": [{"iaaddr": "2001:db8:1::5", "binding": "active"}]}]"#,
            )
            .respond("dhcpd6 list static 0", r#"{"dhcpd": []}"#)
            .respond("interface list macdb json", "{}");
        let ctx = context(backend, PathBuf::new());

        let resp = dispatch(
            &ctx,
            json!({"command": "search_lease", "inactive": "1", "selected_interfaces": ["lan"]}),
        );
        assert_eq!(resp["total"], 1);
        assert_eq!(resp["rowCount"], 1);
        assert_eq!(resp["current"], 1);
        assert_eq!(resp["rows"][0]["if"], "lan");
        assert_eq!(resp["interfaces"], json!({"lan": "LAN"}));
    }

    #[test]
    fn search_prefix_request() {
        let backend = ScriptedBackend::new().respond("dhcpd6 list leases 1", "[]");
        let ctx = context(backend, PathBuf::new());

        let resp = dispatch(&ctx, json!({"command": "search_prefix", "rowCount": 10}));
        assert_eq!(resp, json!({"total": 0, "rowCount": 0, "current": 1, "rows": []}));
    }

    #[test]
    fn form_style_paging_and_sort() {
        let backend = ScriptedBackend::new()
            .respond("interface list ndp json", "[]")
            .respond(
                "dhcpd6 list leases 0",
                r#"[{"lease_type": "ia-na", "iaid": 1, "duid": "",
                     "addresses": [{"iaaddr": "2001:db8:1::5", "binding": "active"}]},
                    {"lease_type": "ia-na", "iaid": 2, "duid": "",
                     "addresses": [{"iaaddr": "2001:db8:1::6", "binding": "active"}]}]"#,
            )
            .respond("dhcpd6 list static 0", r#"{"dhcpd": []}"#)
            .respond("interface list macdb json", "{}");
        let ctx = context(backend, PathBuf::new());

        let request: MgmtRequest = serde_json::from_str(
            r#"{"command": "search_lease", "current": "2", "rowCount": "1",
                "sort": {"address": "DESC"}}"#,
        )
        .unwrap();
        let resp = serde_json::to_value(handle_request(&ctx, request)).unwrap();
        assert_eq!(resp["total"], 2);
        assert_eq!(resp["current"], 2);
        assert_eq!(resp["rowCount"], 1);
        assert_eq!(resp["rows"][0]["address"], "2001:db8:1::5");
    }

    #[test]
    fn del_lease_defaults_to_get() {
        let ctx = context(ScriptedBackend::new(), PathBuf::new());
        let resp = dispatch(&ctx, json!({"command": "del_lease", "ip": "2001:db8::1"}));
        assert_eq!(resp, json!({"result": "failed"}));
    }

    #[test]
    fn del_lease_with_post() {
        let backend = ScriptedBackend::new()
            .respond("dhcpd6 remove lease 2001:db8::1", r#"{"removed_leases": "1"}"#);
        let ctx = context(backend, PathBuf::new());
        let resp = dispatch(
            &ctx,
            json!({"command": "del_lease", "method": "POST", "ip": "2001:db8::1"}),
        );
        assert_eq!(resp, json!({"result": "deleted"}));
    }

    #[test]
    fn status_and_reload() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"interfaces": {"lan": {}, "opt1": {}}}"#)
            .unwrap();
        let ctx = context(ScriptedBackend::new(), file.path().to_path_buf());

        let resp = dispatch(&ctx, json!({"command": "status"}));
        assert_eq!(resp["success"], true);
        assert_eq!(resp["interface_count"], 1);

        let resp = dispatch(&ctx, json!({"command": "reload"}));
        assert_eq!(resp["success"], true);
        assert_eq!(resp["interface_count"], 2);
        assert_eq!(ctx.service.config().load().interfaces.len(), 2);
    }

    #[test]
    fn failed_reload_reports_error() {
        let ctx = context(ScriptedBackend::new(), PathBuf::from("/nonexistent/config.json"));
        let resp = dispatch(&ctx, json!({"command": "reload"}));
        assert_eq!(resp["success"], false);
        assert!(resp["error"].as_str().unwrap().contains("/nonexistent/config.json"));
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(serde_json::from_value::<MgmtRequest>(json!({"command": "shutdown"})).is_err());
    }
}
