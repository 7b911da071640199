// src/core/target.rs

use crate::core::error::TargetError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

// RFC 1123 style hostname: dot-separated labels of 1-63 alphanumerics or
// hyphens, never starting or ending with a hyphen, optional trailing dot.
static RE_HOSTNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*\.?$",
    )
    .unwrap()
});

const MAX_HOSTNAME_LEN: usize = 253;

/// What kind of host a target names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetKind {
    Ip(IpAddr),
    Domain(String),
}

/// A validated scan target: either an IP literal or a hostname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    raw: String,
    kind: TargetKind,
}

impl Target {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> &TargetKind {
        &self.kind
    }

    /// The domain name, or `None` for IP targets.
    pub fn domain(&self) -> Option<&str> {
        match &self.kind {
            TargetKind::Domain(d) => Some(d.as_str()),
            TargetKind::Ip(_) => None,
        }
    }

    /// Bare host for socket connections: the IP literal or the normalized domain.
    pub fn host(&self) -> String {
        match &self.kind {
            TargetKind::Ip(ip) => ip.to_string(),
            TargetKind::Domain(d) => d.clone(),
        }
    }

    /// Host component suitable for a URL (IPv6 literals are bracketed).
    pub fn url_host(&self) -> String {
        match &self.kind {
            TargetKind::Ip(IpAddr::V6(v6)) => format!("[{v6}]"),
            TargetKind::Ip(IpAddr::V4(v4)) => v4.to_string(),
            TargetKind::Domain(d) => d.clone(),
        }
    }
}

impl FromStr for Target {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.is_empty() {
            return Err(TargetError::Empty);
        }
        if value.contains("://") || value.contains('/') {
            return Err(TargetError::UrlNotAllowed);
        }
        if let Ok(ip) = value.parse::<IpAddr>() {
            return Ok(Self { raw: value.to_string(), kind: TargetKind::Ip(ip) });
        }
        if value.len() > MAX_HOSTNAME_LEN || !RE_HOSTNAME.is_match(value) {
            return Err(TargetError::InvalidHostname(value.to_string()));
        }
        let domain = value.trim_end_matches('.').to_ascii_lowercase();
        Ok(Self { raw: value.to_string(), kind: TargetKind::Domain(domain) })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_domains_and_ip_literals() {
        let domain: Target = " Example.COM ".parse().unwrap();
        assert_eq!(domain.as_str(), "Example.COM");
        assert_eq!(domain.domain(), Some("example.com"));
        assert!(matches!(domain.kind(), TargetKind::Domain(_)));

        let fqdn: Target = "mail.example.org.".parse().unwrap();
        assert_eq!(fqdn.domain(), Some("mail.example.org"));

        let v4: Target = "93.184.216.34".parse().unwrap();
        assert!(matches!(v4.kind(), TargetKind::Ip(_)));
        assert_eq!(v4.domain(), None);
        assert_eq!(v4.url_host(), "93.184.216.34");

        let v6: Target = "2001:db8::1".parse().unwrap();
        assert!(matches!(v6.kind(), TargetKind::Ip(_)));
        assert_eq!(v6.url_host(), "[2001:db8::1]");
    }

    #[test]
    fn rejects_urls_and_paths() {
        assert_eq!("https://example.com".parse::<Target>(), Err(TargetError::UrlNotAllowed));
        assert_eq!("example.com/login".parse::<Target>(), Err(TargetError::UrlNotAllowed));
        assert_eq!("   ".parse::<Target>(), Err(TargetError::Empty));
    }

    #[test]
    fn rejects_malformed_hostnames() {
        for bad in ["-example.com", "example-.com", "exa mple.com", "ex_ample.com", "a..b", "example.com;rm"] {
            assert!(
                matches!(bad.parse::<Target>(), Err(TargetError::InvalidHostname(_))),
                "{bad} should be rejected"
            );
        }
        let long_label = format!("{}.com", "a".repeat(64));
        assert!(long_label.parse::<Target>().is_err());
        let too_long = format!("{}.com", ["abcdefghij"; 25].join("."));
        assert!(too_long.len() > MAX_HOSTNAME_LEN);
        assert!(too_long.parse::<Target>().is_err());
    }
}
