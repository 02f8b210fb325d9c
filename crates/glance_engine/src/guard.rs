//! URL safety guard: keeps outbound fetches away from private, loopback and
//! link-local destinations.
//!
//! A URL is approved only when its scheme is `http`/`https` and every address
//! its host resolves to is public. Resolution failures block the URL. An
//! approved target carries the addresses that were checked so the fetcher can
//! connect to exactly those and nothing a later DNS answer might return.

use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use glance_logging::{glance_debug, glance_warn};
use url::{Host, Url};

/// Hostnames that always refer to the local machine.
const RESERVED_HOSTNAMES: [&str; 5] = [
    "localhost",
    "localhost.localdomain",
    "ip6-localhost",
    "ip6-loopback",
    "0.0.0.0",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressRange {
    /// RFC 1918: 10/8, 172.16/12, 192.168/16.
    Private,
    Loopback,
    LinkLocal,
    Unspecified,
    /// IPv6 fc00::/7.
    UniqueLocal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    InvalidUrl,
    UnsupportedScheme,
    MissingHost,
    ReservedHostname,
    ResolutionFailed,
    Address(AddressRange),
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::InvalidUrl => write!(f, "Invalid URL"),
            BlockReason::UnsupportedScheme => write!(f, "Only http and https URLs are allowed"),
            BlockReason::MissingHost => write!(f, "URL has no host"),
            BlockReason::ReservedHostname => write!(f, "URL points to a reserved host"),
            BlockReason::ResolutionFailed => write!(f, "Could not resolve host"),
            BlockReason::Address(range) => {
                let label = match range {
                    AddressRange::Private => "a private",
                    AddressRange::Loopback => "a loopback",
                    AddressRange::LinkLocal => "a link-local",
                    AddressRange::Unspecified => "an unspecified",
                    AddressRange::UniqueLocal => "a unique-local",
                };
                write!(f, "URL resolves to {label} address")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressVerdict {
    Allowed,
    Blocked(BlockReason),
}

/// Classify an address literal. Pure; no lookups.
pub fn classify_ip(ip: IpAddr) -> AddressVerdict {
    let range = match ip {
        IpAddr::V4(v4) => classify_v4(v4),
        IpAddr::V6(v6) => classify_v6(v6),
    };
    match range {
        Some(range) => AddressVerdict::Blocked(BlockReason::Address(range)),
        None => AddressVerdict::Allowed,
    }
}

fn classify_v4(ip: Ipv4Addr) -> Option<AddressRange> {
    let [a, b, _, _] = ip.octets();
    match (a, b) {
        (0, _) => Some(AddressRange::Unspecified),
        (10, _) => Some(AddressRange::Private),
        (172, 16..=31) => Some(AddressRange::Private),
        (192, 168) => Some(AddressRange::Private),
        (127, _) => Some(AddressRange::Loopback),
        (169, 254) => Some(AddressRange::LinkLocal),
        _ => None,
    }
}

fn classify_v6(ip: Ipv6Addr) -> Option<AddressRange> {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return classify_v4(v4);
    }
    let first = ip.segments()[0];
    if ip.is_loopback() {
        Some(AddressRange::Loopback)
    } else if ip.is_unspecified() {
        Some(AddressRange::Unspecified)
    } else if first & 0xfe00 == 0xfc00 {
        Some(AddressRange::UniqueLocal)
    } else if first & 0xffc0 == 0xfe80 {
        Some(AddressRange::LinkLocal)
    } else {
        None
    }
}

/// True for `localhost` and its aliases, case-insensitive, trailing dot ignored.
pub fn is_reserved_hostname(host: &str) -> bool {
    let host = host.strip_suffix('.').unwrap_or(host).to_ascii_lowercase();
    RESERVED_HOSTNAMES.contains(&host.as_str()) || host.ends_with(".localhost")
}

#[async_trait::async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, host: &str, port: u16) -> std::io::Result<Vec<SocketAddr>>;
}

/// Resolves through the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait::async_trait]
impl Resolver for SystemResolver {
    async fn resolve(&self, host: &str, port: u16) -> std::io::Result<Vec<SocketAddr>> {
        let addrs = tokio::net::lookup_host((host, port)).await?;
        Ok(addrs.collect())
    }
}

/// Resolves from a fixed table; unknown names fail to resolve.
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    entries: HashMap<String, Vec<IpAddr>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: &str, addrs: &[IpAddr]) -> Self {
        self.entries
            .insert(host.to_ascii_lowercase(), addrs.to_vec());
        self
    }
}

#[async_trait::async_trait]
impl Resolver for StaticResolver {
    async fn resolve(&self, host: &str, port: u16) -> std::io::Result<Vec<SocketAddr>> {
        self.entries
            .get(&host.to_ascii_lowercase())
            .map(|ips| ips.iter().map(|ip| SocketAddr::new(*ip, port)).collect())
            .ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, format!("unknown host {host}"))
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardSettings {
    /// Hosts the operator trusts explicitly; they skip address classification.
    pub trusted_hosts: Vec<String>,
}

/// A URL the guard approved, with the addresses it was checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovedTarget {
    pub url: Url,
    /// Empty for IP literals and trusted hosts.
    pub pinned_addrs: Vec<SocketAddr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardVerdict {
    Allowed(ApprovedTarget),
    Blocked(BlockReason),
}

impl GuardVerdict {
    pub fn into_result(self) -> Result<ApprovedTarget, BlockReason> {
        match self {
            GuardVerdict::Allowed(target) => Ok(target),
            GuardVerdict::Blocked(reason) => Err(reason),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardVerdict::Allowed(_))
    }
}

#[derive(Clone)]
pub struct UrlGuard {
    resolver: Arc<dyn Resolver>,
    settings: GuardSettings,
}

impl fmt::Debug for UrlGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlGuard")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Default for UrlGuard {
    fn default() -> Self {
        Self::new(GuardSettings::default())
    }
}

impl UrlGuard {
    pub fn new(settings: GuardSettings) -> Self {
        Self::with_resolver(settings, Arc::new(SystemResolver))
    }

    pub fn with_resolver(settings: GuardSettings, resolver: Arc<dyn Resolver>) -> Self {
        Self { resolver, settings }
    }

    pub async fn check(&self, raw: &str) -> GuardVerdict {
        match Url::parse(raw.trim()) {
            Ok(url) => self.check_url(url).await,
            Err(err) => {
                glance_warn!("Guard rejected unparseable url: {}", err);
                GuardVerdict::Blocked(BlockReason::InvalidUrl)
            }
        }
    }

    pub async fn check_url(&self, url: Url) -> GuardVerdict {
        let verdict = self.evaluate(url).await;
        match &verdict {
            GuardVerdict::Allowed(target) => {
                glance_debug!(
                    "Guard allowed {} ({} pinned addrs)",
                    target.url,
                    target.pinned_addrs.len()
                );
            }
            GuardVerdict::Blocked(reason) => glance_warn!("Guard blocked url: {}", reason),
        }
        verdict
    }

    async fn evaluate(&self, url: Url) -> GuardVerdict {
        if !matches!(url.scheme(), "http" | "https") {
            return GuardVerdict::Blocked(BlockReason::UnsupportedScheme);
        }
        let Some(host_str) = url.host_str() else {
            return GuardVerdict::Blocked(BlockReason::MissingHost);
        };
        if self.is_trusted(host_str) {
            return allowed(url, Vec::new());
        }

        let domain = match url.host() {
            Some(Host::Ipv4(ip)) => return verdict_for_literal(url.clone(), IpAddr::V4(ip)),
            Some(Host::Ipv6(ip)) => return verdict_for_literal(url.clone(), IpAddr::V6(ip)),
            Some(Host::Domain(domain)) => domain.to_string(),
            None => return GuardVerdict::Blocked(BlockReason::MissingHost),
        };
        if is_reserved_hostname(&domain) {
            return GuardVerdict::Blocked(BlockReason::ReservedHostname);
        }

        let port = url.port_or_known_default().unwrap_or(80);
        let addrs = match self.resolver.resolve(&domain, port).await {
            Ok(addrs) if !addrs.is_empty() => addrs,
            Ok(_) => return GuardVerdict::Blocked(BlockReason::ResolutionFailed),
            Err(err) => {
                glance_debug!("Resolution of {} failed: {}", domain, err);
                return GuardVerdict::Blocked(BlockReason::ResolutionFailed);
            }
        };

        // One private answer is enough to reject the host.
        for addr in &addrs {
            if let AddressVerdict::Blocked(reason) = classify_ip(addr.ip()) {
                return GuardVerdict::Blocked(reason);
            }
        }
        allowed(url, addrs)
    }

    fn is_trusted(&self, host: &str) -> bool {
        self.settings
            .trusted_hosts
            .iter()
            .any(|trusted| trusted.eq_ignore_ascii_case(host))
    }
}

fn verdict_for_literal(url: Url, ip: IpAddr) -> GuardVerdict {
    match classify_ip(ip) {
        AddressVerdict::Allowed => allowed(url, Vec::new()),
        AddressVerdict::Blocked(reason) => GuardVerdict::Blocked(reason),
    }
}

fn allowed(url: Url, pinned_addrs: Vec<SocketAddr>) -> GuardVerdict {
    GuardVerdict::Allowed(ApprovedTarget { url, pinned_addrs })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_names_ignore_case_and_trailing_dot() {
        assert!(is_reserved_hostname("localhost"));
        assert!(is_reserved_hostname("LOCALHOST."));
        assert!(is_reserved_hostname("api.localhost"));
        assert!(is_reserved_hostname("ip6-loopback"));
        assert!(!is_reserved_hostname("localhost.example.com"));
        assert!(!is_reserved_hostname("example.com"));
    }

    #[test]
    fn ipv4_mapped_addresses_use_the_embedded_ipv4() {
        let mapped: Ipv6Addr = "::ffff:10.1.2.3".parse().unwrap();
        assert_eq!(classify_v6(mapped), Some(AddressRange::Private));
        let public: Ipv6Addr = "::ffff:93.184.216.34".parse().unwrap();
        assert_eq!(classify_v6(public), None);
    }
}
