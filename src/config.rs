use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use compact_str::CompactString;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::de::lenient_string;

/// Read-only view of the firewall configuration a request works against.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Interface name (e.g. `lan`, `opt1`) -> addressing.
    #[serde(default)]
    pub interfaces: BTreeMap<CompactString, InterfaceConfig>,
    /// Interfaces with a DHCPv6 server section. Only the keys matter here.
    #[serde(default)]
    pub dhcpdv6: BTreeMap<CompactString, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterfaceConfig {
    /// Static address, or a mode keyword such as `track6` / `dhcp6`.
    #[serde(default, deserialize_with = "lenient_string")]
    pub ipaddrv6: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub subnetv6: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub descr: String,
}

/// Snapshot handle shared between the request loop and the reload paths.
pub type SharedConfig = Arc<ArcSwap<Config>>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_reader(std::io::BufReader::new(file)).map_err(|source| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    pub fn interface(&self, name: &str) -> Option<&InterfaceConfig> {
        self.interfaces.get(name)
    }
}

/// Load the configuration from disk and swap it into the running snapshot.
///
/// On error the previous snapshot stays in place.
pub fn reload_from_disk(shared: &SharedConfig, path: &Path) -> Result<usize, ConfigError> {
    let config = Config::load(path)?;
    let count = config.interfaces.len();
    shared.store(Arc::new(config));

    info!(count, path = %path.display(), "reloaded interface configuration");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const SAMPLE: &str = r#"{
        "interfaces": {
            "lan": {"ipaddrv6": "2001:db8:1::1", "subnetv6": "64", "descr": "LAN"},
            "opt1": {"ipaddrv6": "track6", "descr": "Guests"},
            "opt2": {"ipaddrv6": "2001:db8:2::1", "subnetv6": 56}
        },
        "dhcpdv6": {
            "lan": {"enable": "1"},
            "opt2": {}
        }
    }"#;

    #[test]
    fn parse_sample_config() {
        let config: Config = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(config.interfaces.len(), 3);
        assert_eq!(config.interface("lan").unwrap().subnetv6, "64");
        assert_eq!(config.interface("opt2").unwrap().subnetv6, "56");
        assert_eq!(config.interface("opt1").unwrap().subnetv6, "");
        assert!(config.dhcpdv6.contains_key("opt2"));
        assert!(config.interface("wan").is_none());
    }

    #[test]
    fn empty_object_is_valid() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.interfaces.is_empty());
        assert!(config.dhcpdv6.is_empty());
    }

    #[test]
    fn reload_swaps_snapshot() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let shared: SharedConfig = Arc::new(ArcSwap::from_pointee(Config::default()));
        let count = reload_from_disk(&shared, file.path()).unwrap();

        assert_eq!(count, 3);
        assert_eq!(shared.load().interfaces.len(), 3);
    }

    #[test]
    fn failed_reload_keeps_previous_snapshot() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();

        let previous: Config = serde_json::from_str(SAMPLE).unwrap();
        let shared: SharedConfig = Arc::new(ArcSwap::from_pointee(previous));

        let err = reload_from_disk(&shared, file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(shared.load().interfaces.len(), 3);

        let err = reload_from_disk(&shared, Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
