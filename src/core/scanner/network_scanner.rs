// src/core/scanner/network_scanner.rs

use crate::core::error::ProbeError;
use crate::core::knowledge_base::{
    is_database_port, is_high_risk_port, port_risk_profile, service_name, PortService, COMMON_PORTS,
};
use crate::core::models::{Category, Finding, Metadata, Severity};
use crate::core::scanner::{ModuleOutcome, ProbeModule};
use crate::core::target::{Target, TargetKind};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Number of open ports above which the attack surface is flagged as large.
const LARGE_SURFACE_THRESHOLD: usize = 5;

/// Probes the well-known port catalogue with bounded TCP connects.
pub struct NetworkScanner {
    port_timeout: Duration,
    resolve_timeout: Duration,
    catalogue: Vec<PortService>,
}

impl NetworkScanner {
    pub fn new(port_timeout: Duration, resolve_timeout: Duration) -> Self {
        Self { port_timeout, resolve_timeout, catalogue: COMMON_PORTS.to_vec() }
    }

    fn service_of(&self, port: u16) -> &'static str {
        self.catalogue
            .iter()
            .find(|entry| entry.port == port)
            .map_or_else(|| service_name(port), |entry| entry.service)
    }

    async fn resolve(&self, target: &Target) -> Result<IpAddr, ProbeError> {
        let host = match target.kind() {
            TargetKind::Ip(ip) => return Ok(*ip),
            TargetKind::Domain(domain) => domain.as_str(),
        };
        debug!(host, "Resolving target address.");

        let lookup = timeout(self.resolve_timeout, tokio::net::lookup_host((host, 0)))
            .await
            .map_err(|_| ProbeError::Timeout { operation: "address resolution", secs: self.resolve_timeout.as_secs() })?
            .map_err(|e| ProbeError::Resolution { host: host.to_string(), reason: e.to_string() })?;

        let addrs: Vec<SocketAddr> = lookup.collect();
        addrs
            .iter()
            .find(|a| a.is_ipv4())
            .or_else(|| addrs.first())
            .map(|a| a.ip())
            .ok_or_else(|| ProbeError::Resolution { host: host.to_string(), reason: "no addresses returned".into() })
    }

    /// Connects to every catalogue port concurrently and returns the open ones
    /// in catalogue order.
    async fn probe_ports(&self, ip: IpAddr) -> Vec<u16> {
        let mut probes = JoinSet::new();
        for entry in &self.catalogue {
            let port = entry.port;
            let port_timeout = self.port_timeout;
            probes.spawn(async move {
                let open = matches!(
                    timeout(port_timeout, TcpStream::connect(SocketAddr::new(ip, port))).await,
                    Ok(Ok(_))
                );
                (port, open)
            });
        }

        let mut open_ports = Vec::new();
        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok((port, true)) => {
                    debug!(port, "Port open.");
                    open_ports.push(port);
                }
                Ok((_, false)) => {}
                Err(e) => warn!(error = %e, "Port probe task failed."),
            }
        }
        let catalogue_index = |port: &u16| self.catalogue.iter().position(|p| p.port == *port);
        open_ports.sort_by_key(catalogue_index);
        open_ports
    }
}

#[async_trait]
impl ProbeModule for NetworkScanner {
    fn name(&self) -> &'static str {
        "Network Exposure"
    }

    fn category(&self) -> Category {
        Category::Network
    }

    /// Resolves the target and checks every catalogue port for reachability.
    ///
    /// # Arguments
    /// * `target` - The validated domain or IP address.
    ///
    /// # Returns
    /// A `ModuleOutcome` with one finding per exposed risky port and the open
    /// ports in its metadata. Resolution failures yield a failed outcome.
    async fn scan(&self, target: &Target) -> Result<ModuleOutcome, ProbeError> {
        info!(target = %target, "Starting network exposure scan.");

        let ip = match self.resolve(target).await {
            Ok(ip) => ip,
            Err(e) => {
                warn!(target = %target, error = %e, "Target could not be resolved.");
                let finding = Finding::new(
                    Category::Network,
                    Severity::Critical,
                    "Hostname could not be resolved",
                    format!("{target} could not be resolved to an IP address"),
                    20,
                )
                .with_evidence(e.to_string());
                let mut metadata = Metadata::new();
                metadata.insert("error".into(), Value::String("DNS resolution failed".into()));
                return Ok(ModuleOutcome::failed(finding, metadata));
            }
        };

        let open_ports = self.probe_ports(ip).await;
        let findings = analyze_open_ports(target.as_str(), &open_ports);

        let mut metadata = Metadata::new();
        metadata.insert("ip_address".into(), Value::String(ip.to_string()));
        metadata.insert("total_ports_scanned".into(), json!(self.catalogue.len()));
        metadata.insert(
            "open_ports".into(),
            Value::Array(
                open_ports
                    .iter()
                    .map(|&port| json!({ "port": port, "service": self.service_of(port) }))
                    .collect(),
            ),
        );
        metadata.insert(
            "high_risk_exposed".into(),
            json!(open_ports.iter().filter(|&&p| is_high_risk_port(p)).count()),
        );

        info!(open = open_ports.len(), findings = findings.len(), "Network exposure scan finished.");
        Ok(ModuleOutcome::success(findings, metadata))
    }
}

/// Turns the list of open ports into findings: one per exposed high-risk or
/// database port, plus an aggregate one when the surface is large.
///
/// # Arguments
/// * `target` - The target as typed, quoted in evidence.
/// * `open_ports` - Open ports in catalogue order.
///
/// # Returns
/// A vector of `Finding` for the exposed services.
pub fn analyze_open_ports(target: &str, open_ports: &[u16]) -> Vec<Finding> {
    let mut findings: Vec<Finding> = open_ports
        .iter()
        .filter_map(|&port| port_finding(target, port))
        .collect();

    if open_ports.len() > LARGE_SURFACE_THRESHOLD {
        debug!(open = open_ports.len(), "Large attack surface detected.");
        let list = open_ports.iter().map(u16::to_string).collect::<Vec<_>>().join(", ");
        findings.push(
            Finding::new(
                Category::Network,
                Severity::Moderate,
                "Large attack surface",
                format!(
                    "{} open ports detected. Every additional exposed service widens the attack surface.",
                    open_ports.len()
                ),
                15,
            )
            .with_evidence(format!("Open ports: {list}"))
            .with_impact("Each exposed service is a potential entry point for attackers")
            .with_recommendation("Close unnecessary ports and restrict access with a firewall"),
        );
    }
    findings
}

fn port_finding(target: &str, port: u16) -> Option<Finding> {
    let service = service_name(port);

    if is_high_risk_port(port) {
        let finding = match port_risk_profile(port) {
            Some(profile) => Finding::new(
                Category::Network,
                profile.severity,
                profile.title,
                profile.description,
                profile.score_impact,
            ),
            None => Finding::new(
                Category::Network,
                Severity::Moderate,
                format!("{service} exposed"),
                format!("{service} is reachable from the internet"),
                10,
            ),
        };
        return Some(
            finding
                .with_evidence(format!("{service} (port {port}) reachable on {target}"))
                .with_impact("Unauthorized access, credential theft, lateral movement")
                .with_recommendation(format!("Close port {port} or restrict access through a VPN or firewall")),
        );
    }

    if is_database_port(port) {
        return Some(
            Finding::new(
                Category::Network,
                Severity::High,
                format!("{service} database publicly exposed"),
                format!("The {service} database is reachable from the internet"),
                20,
            )
            .with_evidence(format!("{service} (port {port}) reachable on {target}"))
            .with_impact("Direct access to data, possible data breach")
            .with_recommendation(format!("Close port {port} and allow access only from authorized IPs")),
        );
    }

    None
}
