use std::net::{IpAddr, Ipv6Addr};

use compact_str::CompactString;
use ipnet::Ipv6Net;
use tracing::debug;

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceMatch {
    pub name: CompactString,
    pub descr: String,
}

/// IPv6 networks of the interfaces that run a DHCPv6 server.
#[derive(Debug, Default)]
pub struct InterfaceRanges {
    ranges: Vec<(CompactString, Ipv6Net)>,
}

impl InterfaceRanges {
    /// Interfaces without both a static address and a prefix length are left out.
    pub fn from_config(config: &Config) -> Self {
        let mut ranges = Vec::new();

        for name in config.dhcpdv6.keys() {
            let Some(iface) = config.interface(name) else {
                continue;
            };
            let (addr, len) = (iface.ipaddrv6.trim(), iface.subnetv6.trim());
            if addr.is_empty() || len.is_empty() {
                continue;
            }

            let net = addr
                .parse::<Ipv6Addr>()
                .ok()
                .zip(len.parse::<u8>().ok())
                .and_then(|(addr, len)| Ipv6Net::new(addr, len).ok());

            match net {
                Some(net) => ranges.push((name.clone(), net.trunc())),
                None => debug!(interface = %name, addr, len, "unusable interface network"),
            }
        }

        Self { ranges }
    }

    /// Interface whose network contains `addr`. The longest prefix wins.
    pub fn find(&self, addr: &str) -> Option<&str> {
        let addr = addr.trim().parse::<Ipv6Addr>().ok()?;

        let mut best: Option<&(CompactString, Ipv6Net)> = None;
        for range in self.ranges.iter().filter(|(_, net)| net.contains(&addr)) {
            if best.map_or(true, |(_, b)| range.1.prefix_len() > b.prefix_len()) {
                best = Some(range);
            }
        }
        best.map(|(name, _)| name.as_str())
    }

    pub(crate) fn len(&self) -> usize {
        self.ranges.len()
    }
}

/// Decides which interface a lease belongs to.
pub struct InterfaceResolver<'a> {
    config: &'a Config,
    ranges: InterfaceRanges,
}

impl<'a> InterfaceResolver<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            ranges: InterfaceRanges::from_config(config),
        }
    }

    pub(crate) fn range_count(&self) -> usize {
        self.ranges.len()
    }

    /// Resolve the owning interface for a record.
    ///
    /// An `explicit` interface (static mappings carry one) is only trusted when
    /// that interface has a literal IP address configured. Records without one
    /// are matched against the DHCPv6 interface networks.
    pub fn resolve(&self, explicit: &str, address: &str) -> Option<InterfaceMatch> {
        let name = if explicit.is_empty() {
            self.ranges.find(address)?
        } else {
            let iface = self.config.interface(explicit)?;
            if iface.ipaddrv6.trim().parse::<IpAddr>().is_err() {
                debug!(interface = explicit, "interface has no usable IPv6 address");
                return None;
            }
            explicit
        };

        Some(InterfaceMatch {
            name: CompactString::from(name),
            descr: self
                .config
                .interface(name)
                .map(|iface| iface.descr.clone())
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        serde_json::from_str(
            r#"{
                "interfaces": {
                    "lan":  {"ipaddrv6": "2001:db8:1::1", "subnetv6": "64", "descr": "LAN"},
                    "igb0": {"ipaddrv6": "2001:db8:2::1", "subnetv6": "48", "descr": "Office"},
                    "igb1": {"ipaddrv6": "2001:db8:2:5::1", "subnetv6": "64", "descr": "Lab"},
                    "opt1": {"ipaddrv6": "track6", "subnetv6": "64", "descr": "Tracked"},
                    "opt2": {"ipaddrv6": "2001:db8:3::1", "descr": "No prefix"},
                    "opt3": {"ipaddrv6": "2001:db8:4::1", "subnetv6": "64", "descr": "No DHCPv6"}
                },
                "dhcpdv6": {"lan": {}, "igb0": {}, "igb1": {}, "opt1": {}, "opt2": {}, "wan": {}}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn ranges_need_address_and_prefix() {
        let ranges = InterfaceRanges::from_config(&config());
        // lan, igb0, igb1: opt1 is not an address, opt2 has no prefix,
        // opt3 has no DHCPv6 section and wan has no interface config.
        assert_eq!(ranges.len(), 3);
    }

    #[test]
    fn address_matches_containing_network() {
        let ranges = InterfaceRanges::from_config(&config());
        assert_eq!(ranges.find("2001:db8:1::100"), Some("lan"));
        assert_eq!(ranges.find("2001:db8:4::100"), None);
        assert_eq!(ranges.find("garbage"), None);
    }

    #[test]
    fn most_specific_network_wins() {
        let ranges = InterfaceRanges::from_config(&config());
        assert_eq!(ranges.find("2001:db8:2:5::20"), Some("igb1"));
        assert_eq!(ranges.find("2001:db8:2:6::20"), Some("igb0"));
    }

    #[test]
    fn resolve_by_range_carries_description() {
        let config = config();
        let resolver = InterfaceResolver::new(&config);
        assert_eq!(resolver.range_count(), 3);
        let found = resolver.resolve("", "2001:db8:1::abcd").unwrap();
        assert_eq!(found.name, "lan");
        assert_eq!(found.descr, "LAN");
    }

    #[test]
    fn explicit_interface_requires_ip_address() {
        let config = config();
        let resolver = InterfaceResolver::new(&config);

        // explicit interface wins even if the address lies elsewhere
        let found = resolver.resolve("opt3", "2001:db8:1::5").unwrap();
        assert_eq!(found.name, "opt3");
        assert_eq!(found.descr, "No DHCPv6");

        assert_eq!(resolver.resolve("opt1", "2001:db8:1::5"), None);
        assert_eq!(resolver.resolve("missing", "2001:db8:1::5"), None);
    }
}
