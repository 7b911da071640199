// src/core/scanner/headers_scanner.rs

use crate::core::error::ProbeError;
use crate::core::knowledge_base::{SecurityHeaderRule, HSTS_MIN_MAX_AGE, SECURITY_HEADERS};
use crate::core::models::{Category, Finding, Metadata, Severity};
use crate::core::scanner::{ModuleOutcome, ProbeModule};
use crate::core::target::Target;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::redirect;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info, warn};

const MAX_REDIRECTS: usize = 10;

/// Fetches the target's landing page and audits its security headers.
pub struct HeadersScanner {
    timeout: Duration,
    user_agent: String,
}

/// Result of auditing one response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderAnalysis {
    pub findings: Vec<Finding>,
    pub present_headers: Vec<&'static str>,
    pub missing_count: usize,
    pub weak_count: usize,
}

impl HeadersScanner {
    pub fn new(timeout: Duration, user_agent: String) -> Self {
        Self { timeout, user_agent }
    }

    fn client(&self) -> Result<reqwest::Client, ProbeError> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.as_str())
            .timeout(self.timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| {
                error!(error = %e, "Failed to build HTTP client for headers scan.");
                ProbeError::Http(e)
            })
    }
}

#[async_trait]
impl ProbeModule for HeadersScanner {
    fn name(&self) -> &'static str {
        "HTTP Security Headers"
    }

    fn category(&self) -> Category {
        Category::HttpHeaders
    }

    async fn scan(&self, target: &Target) -> Result<ModuleOutcome, ProbeError> {
        info!(target = %target, "Starting headers scan.");
        let client = self.client()?;
        let host = target.url_host();
        let mut metadata = Metadata::new();

        let page = match fetch(&client, &format!("https://{host}"), &format!("http://{host}")).await {
            Ok(page) => page,
            Err(https_error) => {
                let finding = Finding::new(
                    Category::HttpHeaders,
                    Severity::High,
                    "Server unreachable over HTTP/HTTPS",
                    format!("Could not connect to {target}"),
                    15,
                )
                .with_evidence(https_error.to_string());
                metadata.insert("error".into(), Value::String(https_error.to_string()));
                return Ok(ModuleOutcome::failed(finding, metadata));
            }
        };
        if page.https_failed {
            metadata.insert("https_failed".into(), Value::Bool(true));
        }
        let response = page.response;

        info!(status = %response.status(), final_url = %response.url(), "Received HTTP response for headers scan.");
        metadata.insert("status_code".into(), json!(response.status().as_u16()));
        metadata.insert("final_url".into(), Value::String(response.url().to_string()));

        let analysis = analyze_headers(response.headers());
        metadata.insert("present_headers".into(), json!(analysis.present_headers));
        metadata.insert("missing_count".into(), json!(analysis.missing_count));
        metadata.insert("weak_count".into(), json!(analysis.weak_count));

        info!(findings = analysis.findings.len(), "Headers scan finished.");
        Ok(ModuleOutcome::success(analysis.findings, metadata))
    }
}

/// A landing page response and whether it needed the plain HTTP retry.
#[derive(Debug)]
pub struct FetchedPage {
    pub response: reqwest::Response,
    pub https_failed: bool,
}

/// Requests the landing page over HTTPS and retries once over plain HTTP.
///
/// # Arguments
/// * `client` - The HTTP client to send both requests with.
/// * `https_url` - The URL tried first.
/// * `http_url` - The fallback URL used when the HTTPS request fails.
///
/// # Returns
/// The first successful response, or the HTTPS error when both attempts fail.
pub async fn fetch(client: &reqwest::Client, https_url: &str, http_url: &str) -> Result<FetchedPage, reqwest::Error> {
    let https_error = match client.get(https_url).send().await {
        Ok(response) => return Ok(FetchedPage { response, https_failed: false }),
        Err(e) => e,
    };
    warn!(url = %https_url, error = %https_error, "HTTPS request failed, retrying over HTTP.");
    match client.get(http_url).send().await {
        Ok(response) => Ok(FetchedPage { response, https_failed: true }),
        Err(http_error) => {
            error!(url = %http_url, error = %http_error, "HTTP request failed for headers scan.");
            Err(https_error)
        }
    }
}

/// Reads a header as text. Non-UTF-8 values still count as present.
fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).map(|value| match value.to_str() {
        Ok(s) => s.to_string(),
        Err(_) => {
            warn!(header_name = name, "Header found but contained invalid UTF-8.");
            "[Invalid UTF-8]".to_string()
        }
    })
}

/// Audits a response's headers: missing security headers first (table order),
/// then weak ones, then information disclosure.
///
/// # Arguments
/// * `headers` - The response headers to audit.
///
/// # Returns
/// A `HeaderAnalysis` holding the findings and the header counts for metadata.
pub fn analyze_headers(headers: &HeaderMap) -> HeaderAnalysis {
    debug!("Analyzing collected header data.");
    let mut missing: Vec<&SecurityHeaderRule> = Vec::new();
    let mut weak: Vec<(&SecurityHeaderRule, String, String)> = Vec::new();
    let mut present_headers = Vec::new();

    for rule in SECURITY_HEADERS {
        match header_value(headers, rule.name) {
            Some(value) => {
                debug!(header_name = rule.name, value = %value, "Header found.");
                present_headers.push(rule.name);
                if let Some(weakness) = header_weakness(rule.name, &value) {
                    weak.push((rule, weakness, value));
                }
            }
            None => {
                debug!(header_name = rule.name, "Header not found.");
                missing.push(rule);
            }
        }
    }

    let mut findings = Vec::new();
    for rule in &missing {
        findings.push(
            Finding::new(
                Category::HttpHeaders,
                rule.severity,
                format!("Missing security header: {}", rule.name),
                rule.description,
                rule.score_impact,
            )
            .with_evidence(format!("Header '{}' not present in the HTTP response", rule.name))
            .with_impact("Exposure to the attacks this header prevents")
            .with_recommendation(format!("Add the '{}' header to the server configuration", rule.name)),
        );
    }
    for (rule, weakness, value) in &weak {
        findings.push(
            Finding::new(
                Category::HttpHeaders,
                Severity::Moderate,
                format!("Weak configuration: {}", rule.name),
                weakness.as_str(),
                rule.score_impact / 2,
            )
            .with_evidence(format!("{}: {}", rule.name, value))
            .with_recommendation(format!("Harden the '{}' configuration", rule.name)),
        );
    }

    if let Some(server) = header_value(headers, "server") {
        findings.push(
            Finding::new(
                Category::HttpHeaders,
                Severity::Low,
                "Server header discloses information",
                "The 'Server' header reveals the software in use",
                3,
            )
            .with_evidence(format!("Server: {server}"))
            .with_impact("Information disclosure that helps attackers")
            .with_recommendation("Remove or obfuscate the 'Server' header"),
        );
    }
    if let Some(powered_by) = header_value(headers, "x-powered-by") {
        findings.push(
            Finding::new(
                Category::HttpHeaders,
                Severity::Low,
                "X-Powered-By discloses technology",
                "The 'X-Powered-By' header reveals the backend technology",
                2,
            )
            .with_evidence(format!("X-Powered-By: {powered_by}"))
            .with_impact("Information disclosure")
            .with_recommendation("Remove the 'X-Powered-By' header"),
        );
    }

    HeaderAnalysis { findings, present_headers, missing_count: missing.len(), weak_count: weak.len() }
}

/// Describes why a present header is weak, if it is.
fn header_weakness(name: &str, value: &str) -> Option<String> {
    let lower = value.to_ascii_lowercase();
    match name {
        "Strict-Transport-Security" => {
            if !lower.contains("max-age") {
                return Some("HSTS without max-age".to_string());
            }
            // An unparsable max-age is not reported.
            let max_age = lower
                .split(';')
                .filter_map(|directive| directive.trim().strip_prefix("max-age="))
                .next()
                .and_then(|v| v.trim().trim_matches('"').parse::<u64>().ok())?;
            (max_age < HSTS_MIN_MAX_AGE).then(|| {
                format!("HSTS max-age too low ({max_age}s, recommended >= {HSTS_MIN_MAX_AGE})")
            })
        }
        "Content-Security-Policy" => (lower.contains("unsafe-inline") || lower.contains("unsafe-eval"))
            .then(|| "CSP contains 'unsafe' directives that weaken protection".to_string()),
        "X-Frame-Options" => {
            (!matches!(lower.trim(), "deny" | "sameorigin")).then(|| format!("Weak X-Frame-Options value: '{value}'"))
        }
        _ => None,
    }
}
