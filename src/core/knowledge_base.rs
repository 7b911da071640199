//! Static, read-only rule tables shared by the probing modules.
//! Port catalogue, per-port risk profiles, tracked security headers and TLS
//! denylists live here so the modules only carry decision logic.

use crate::core::models::Severity;

/// A well-known port and the service usually listening on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortService {
    pub port: u16,
    pub service: &'static str,
}

/// The catalogue of ports probed by the network exposure module, in probe order.
pub static COMMON_PORTS: &[PortService] = &[
    PortService { port: 21, service: "FTP" },
    PortService { port: 22, service: "SSH" },
    PortService { port: 23, service: "Telnet" },
    PortService { port: 25, service: "SMTP" },
    PortService { port: 53, service: "DNS" },
    PortService { port: 80, service: "HTTP" },
    PortService { port: 110, service: "POP3" },
    PortService { port: 143, service: "IMAP" },
    PortService { port: 443, service: "HTTPS" },
    PortService { port: 445, service: "SMB" },
    PortService { port: 3306, service: "MySQL" },
    PortService { port: 3389, service: "RDP" },
    PortService { port: 5432, service: "PostgreSQL" },
    PortService { port: 5900, service: "VNC" },
    PortService { port: 6379, service: "Redis" },
    PortService { port: 8080, service: "HTTP-Alt" },
    PortService { port: 8443, service: "HTTPS-Alt" },
    PortService { port: 27017, service: "MongoDB" },
];

/// Remote-access and file-sharing ports that are risky whenever they are reachable.
pub static HIGH_RISK_PORTS: &[u16] = &[21, 23, 445, 3389, 5900];

/// Database engines that should never face the internet.
pub static DATABASE_PORTS: &[u16] = &[3306, 5432, 6379, 27017];

/// Severity and wording for an exposed high-risk port.
pub struct PortRiskProfile {
    pub port: u16,
    pub severity: Severity,
    pub title: &'static str,
    pub description: &'static str,
    pub score_impact: u8,
}

static PORT_RISK_PROFILES: &[PortRiskProfile] = &[
    PortRiskProfile {
        port: 23,
        severity: Severity::Critical,
        title: "Unencrypted Telnet exposed",
        description: "Telnet transmits credentials and session data in clear text.",
        score_impact: 25,
    },
    PortRiskProfile {
        port: 3389,
        severity: Severity::High,
        title: "RDP publicly exposed",
        description: "Remote Desktop is a frequent target of brute-force and credential stuffing attacks.",
        score_impact: 20,
    },
    PortRiskProfile {
        port: 5900,
        severity: Severity::High,
        title: "VNC publicly exposed",
        description: "VNC servers often rely on weak or no authentication.",
        score_impact: 18,
    },
    PortRiskProfile {
        port: 445,
        severity: Severity::High,
        title: "SMB publicly exposed",
        description: "SMB is a common vector for ransomware and remote exploits.",
        score_impact: 22,
    },
    PortRiskProfile {
        port: 21,
        severity: Severity::Moderate,
        title: "FTP exposed",
        description: "FTP can transmit credentials in clear text.",
        score_impact: 12,
    },
];

/// A security header the HTTP module expects on every response.
pub struct SecurityHeaderRule {
    pub name: &'static str,
    pub severity: Severity,
    pub score_impact: u8,
    pub description: &'static str,
}

pub static SECURITY_HEADERS: &[SecurityHeaderRule] = &[
    SecurityHeaderRule {
        name: "Strict-Transport-Security",
        severity: Severity::High,
        score_impact: 15,
        description: "HSTS protects against protocol downgrade attacks by forcing HTTPS.",
    },
    SecurityHeaderRule {
        name: "Content-Security-Policy",
        severity: Severity::High,
        score_impact: 18,
        description: "CSP mitigates cross-site scripting and content injection attacks.",
    },
    SecurityHeaderRule {
        name: "X-Frame-Options",
        severity: Severity::Moderate,
        score_impact: 10,
        description: "Protects visitors against clickjacking.",
    },
    SecurityHeaderRule {
        name: "X-Content-Type-Options",
        severity: Severity::Moderate,
        score_impact: 8,
        description: "Prevents MIME-sniffing attacks.",
    },
    SecurityHeaderRule {
        name: "Referrer-Policy",
        severity: Severity::Low,
        score_impact: 5,
        description: "Controls how much referrer information is sent with requests.",
    },
    SecurityHeaderRule {
        name: "Permissions-Policy",
        severity: Severity::Low,
        score_impact: 5,
        description: "Restricts which browser features the page may use.",
    },
];

/// Minimum HSTS max-age considered strong: one year.
pub const HSTS_MIN_MAX_AGE: u64 = 31_536_000;

/// Substrings that mark a cipher suite as weak. Checked in order; first match wins.
pub static WEAK_CIPHER_TOKENS: &[&str] = &["RC4", "DES", "3DES", "MD5", "NULL", "EXPORT"];

/// Protocol versions that must no longer be negotiated.
pub static OBSOLETE_PROTOCOLS: &[&str] = &["SSLv2", "SSLv3", "TLSv1", "TLSv1.0", "TLSv1.1"];

pub fn service_name(port: u16) -> &'static str {
    COMMON_PORTS
        .iter()
        .find(|p| p.port == port)
        .map(|p| p.service)
        .unwrap_or("Unknown")
}

pub fn is_high_risk_port(port: u16) -> bool {
    HIGH_RISK_PORTS.contains(&port)
}

pub fn is_database_port(port: u16) -> bool {
    DATABASE_PORTS.contains(&port)
}

/// Retrieves the risk profile of a high-risk port, if one is defined.
pub fn port_risk_profile(port: u16) -> Option<&'static PortRiskProfile> {
    PORT_RISK_PROFILES.iter().find(|p| p.port == port)
}

pub fn is_obsolete_protocol(version: &str) -> bool {
    OBSOLETE_PROTOCOLS.contains(&version)
}

/// Returns the first weak token contained in a cipher suite name.
pub fn weak_cipher_token(cipher: &str) -> Option<&'static str> {
    let upper = cipher.to_ascii_uppercase();
    WEAK_CIPHER_TOKENS.iter().copied().find(|token| upper.contains(token))
}
