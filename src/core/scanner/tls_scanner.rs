// src/core/scanner/tls_scanner.rs

use crate::core::error::ProbeError;
use crate::core::knowledge_base::{is_obsolete_protocol, weak_cipher_token};
use crate::core::models::{Category, Finding, Metadata, Severity};
use crate::core::scanner::{ModuleOutcome, ProbeModule};
use crate::core::target::Target;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{AlertDescription, ClientConfig, DigitallySignedStruct, PeerIncompatible, ProtocolVersion, SignatureScheme};
use serde_json::{json, Value};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tracing::{debug, info, warn};
use x509_parser::prelude::*;

const HTTPS_PORT: u16 = 443;

/// What a single handshake against the HTTPS port revealed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TlsObservation {
    pub tls_version: Option<String>,
    pub cipher: Option<String>,
    pub cert_retrieved: bool,
    pub cert_error: Option<String>,
    /// The server rejected every protocol version this client offers (TLS 1.2+).
    pub legacy_protocol_refused: bool,
    /// The server aborted the handshake over the offered suites: it only
    /// speaks ciphers outside the modern AEAD set.
    pub weak_cipher_refused: bool,
    pub certificate: Option<CertificateInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CertificateInfo {
    pub subject: String,
    pub issuer: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub days_until_expiry: i64,
}

/// Checks HTTPS availability, then inspects protocol, cipher and certificate.
///
/// Certificate chains are never validated: misconfigured and self-signed
/// targets must still be inspectable.
pub struct TlsScanner {
    timeout: Duration,
}

impl TlsScanner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn connect_https(&self, host: &str) -> Option<TcpStream> {
        debug!(host, "Connecting TCP stream to port 443.");
        match timeout(self.timeout, TcpStream::connect((host, HTTPS_PORT))).await {
            Ok(Ok(stream)) => Some(stream),
            Ok(Err(e)) => {
                debug!(host, error = %e, "HTTPS port unreachable.");
                None
            }
            Err(_) => {
                debug!(host, "HTTPS port probe timed out.");
                None
            }
        }
    }

    async fn handshake(&self, host: &str, stream: TcpStream) -> Result<TlsObservation, ProbeError> {
        let connector = TlsConnector::from(Arc::new(insecure_client_config()?));
        let server_name = ServerName::try_from(host.to_string()).map_err(|e| ProbeError::Tls(e.to_string()))?;

        debug!(host, "Performing TLS handshake.");
        let tls_stream = match timeout(self.timeout, connector.connect(server_name, stream)).await {
            Ok(Ok(s)) => s,
            Ok(Err(e)) => {
                let refusal = classify_handshake_error(&e);
                warn!(host, error = %e, ?refusal, "TLS handshake failed.");
                return Ok(TlsObservation {
                    cert_error: Some(format!("TLS connection error: {e}")),
                    legacy_protocol_refused: refusal == HandshakeRefusal::LegacyProtocol,
                    weak_cipher_refused: refusal == HandshakeRefusal::WeakCipher,
                    ..TlsObservation::default()
                });
            }
            Err(_) => {
                warn!(host, "TLS handshake timed out.");
                return Ok(TlsObservation {
                    cert_error: Some(format!("TLS handshake timed out after {}s", self.timeout.as_secs())),
                    ..TlsObservation::default()
                });
            }
        };

        let (_, session) = tls_stream.get_ref();
        let tls_version = session.protocol_version().map(protocol_label);
        let cipher = session.negotiated_cipher_suite().map(|s| format!("{:?}", s.suite()));

        let (cert_retrieved, cert_error, certificate) = match session.peer_certificates().and_then(|c| c.first()) {
            Some(der) => (true, None, parse_certificate(der.as_ref())),
            None => (false, Some("Certificate could not be retrieved".to_string()), None),
        };

        Ok(TlsObservation { tls_version, cipher, cert_retrieved, cert_error, certificate, ..TlsObservation::default() })
    }
}

#[async_trait]
impl ProbeModule for TlsScanner {
    fn name(&self) -> &'static str {
        "TLS Security"
    }

    fn category(&self) -> Category {
        Category::Tls
    }

    async fn scan(&self, target: &Target) -> Result<ModuleOutcome, ProbeError> {
        info!(target = %target, "Starting TLS scan.");
        let host = target.host();
        let mut metadata = Metadata::new();

        let Some(stream) = self.connect_https(&host).await else {
            metadata.insert("https_available".into(), Value::Bool(false));
            let finding = Finding::new(
                Category::Tls,
                Severity::High,
                "HTTPS not available",
                format!("{target} does not answer on port 443 (HTTPS)"),
                25,
            )
            .with_evidence("HTTPS connection failed")
            .with_impact("Traffic travels unencrypted and is exposed to man-in-the-middle attacks")
            .with_recommendation("Install a TLS certificate and enable HTTPS");
            info!(target = %target, "TLS scan finished: no HTTPS listener.");
            return Ok(ModuleOutcome::success(vec![finding], metadata));
        };
        metadata.insert("https_available".into(), Value::Bool(true));

        let observation = self.handshake(&host, stream).await?;
        let findings = analyze_tls(&observation);

        metadata.insert("tls_version".into(), json!(observation.tls_version));
        metadata.insert("cipher".into(), json!(observation.cipher));
        metadata.insert("cert_retrieved".into(), Value::Bool(observation.cert_retrieved));
        metadata.insert("cert_error".into(), json!(observation.cert_error));
        if observation.legacy_protocol_refused {
            metadata.insert("legacy_protocol_refused".into(), Value::Bool(true));
        }
        if observation.weak_cipher_refused {
            metadata.insert("weak_cipher_refused".into(), Value::Bool(true));
        }
        if let Some(cert) = &observation.certificate {
            metadata.insert(
                "certificate".into(),
                json!({
                    "subject": cert.subject,
                    "issuer": cert.issuer,
                    "not_before": cert.not_before,
                    "not_after": cert.not_after,
                    "days_until_expiry": cert.days_until_expiry,
                }),
            );
        }

        info!(findings = findings.len(), "TLS scan finished.");
        Ok(ModuleOutcome::success(findings, metadata))
    }
}

/// Applies the protocol, cipher and certificate rules to one observation.
///
/// A handshake the server aborted over cipher negotiation counts as a weak
/// cipher finding, since this client only offers modern AEAD suites.
///
/// # Arguments
/// * `observation` - The outcome of one handshake against port 443.
///
/// # Returns
/// A vector of `Finding` in rule order: protocol, cipher, certificate.
pub fn analyze_tls(observation: &TlsObservation) -> Vec<Finding> {
    let mut findings = Vec::new();

    match observation.tls_version.as_deref() {
        Some(version) if is_obsolete_protocol(version) => {
            debug!(version, "Obsolete protocol negotiated.");
            findings.push(obsolete_protocol_finding(
                format!("The server negotiates {version}, a deprecated and insecure version"),
                format!("TLS version: {version}"),
            ));
        }
        Some(version @ "TLSv1.2") => {
            findings.push(
                Finding::new(
                    Category::Tls,
                    Severity::Low,
                    "TLS 1.3 not detected",
                    "The server uses TLS 1.2. TLS 1.3 offers better performance and security",
                    3,
                )
                .with_evidence(format!("TLS version: {version}"))
                .with_recommendation("Consider upgrading to TLS 1.3"),
            );
        }
        Some(_) => {}
        None if observation.legacy_protocol_refused => {
            debug!("Server refused TLS 1.2 and 1.3.");
            findings.push(obsolete_protocol_finding(
                "The server refused TLS 1.2 and TLS 1.3, so it only offers deprecated versions".to_string(),
                "Handshake rejected with a protocol version alert".to_string(),
            ));
        }
        None => {}
    }

    match observation.cipher.as_deref() {
        Some(cipher) => {
            if let Some(weak) = weak_cipher_token(cipher) {
                debug!(cipher, weak, "Weak cipher negotiated.");
                findings.push(weak_cipher_finding(
                    format!("The server negotiates a cipher suite using {weak}, which is considered insecure"),
                    format!("Cipher: {cipher}"),
                ));
            }
        }
        None if observation.weak_cipher_refused => {
            debug!("Server refused every modern cipher suite.");
            findings.push(weak_cipher_finding(
                "The server refused every modern AEAD cipher suite, so it only offers legacy ones such as RC4, 3DES or CBC"
                    .to_string(),
                "Handshake rejected during cipher negotiation".to_string(),
            ));
        }
        None => {}
    }

    if !observation.cert_retrieved {
        findings.push(
            Finding::new(
                Category::Tls,
                Severity::Critical,
                "TLS certificate not valid",
                "The TLS certificate could not be retrieved or inspected",
                25,
            )
            .with_evidence(observation.cert_error.clone().unwrap_or_else(|| "Unknown error".to_string()))
            .with_impact("Users will see security warnings; man-in-the-middle becomes possible")
            .with_recommendation("Renew or fix the TLS certificate"),
        );
    }

    findings
}

fn obsolete_protocol_finding(description: String, evidence: String) -> Finding {
    Finding::new(Category::Tls, Severity::Critical, "Obsolete TLS version", description, 30)
        .with_evidence(evidence)
        .with_impact("Exposed to downgrade attacks and broken protocols")
        .with_recommendation("Disable TLS 1.0/1.1 and enable only TLS 1.2/1.3")
}

fn weak_cipher_finding(description: String, evidence: String) -> Finding {
    Finding::new(Category::Tls, Severity::High, "Weak cipher suite detected", description, 20)
        .with_evidence(evidence)
        .with_impact("Exposed to cryptographic attacks")
        .with_recommendation("Allow only modern, secure cipher suites")
}

// --- rustls plumbing ---

fn insecure_client_config() -> Result<ClientConfig, ProbeError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()
        .map_err(|e| ProbeError::Tls(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate(provider)))
        .with_no_client_auth();
    Ok(config)
}

/// Accepts any certificate chain while still checking handshake signatures.
#[derive(Debug)]
struct AcceptAnyCertificate(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

fn protocol_label(version: ProtocolVersion) -> String {
    match version {
        ProtocolVersion::TLSv1_3 => "TLSv1.3".to_string(),
        ProtocolVersion::TLSv1_2 => "TLSv1.2".to_string(),
        ProtocolVersion::TLSv1_1 => "TLSv1.1".to_string(),
        ProtocolVersion::TLSv1_0 => "TLSv1.0".to_string(),
        ProtocolVersion::SSLv3 => "SSLv3".to_string(),
        ProtocolVersion::SSLv2 => "SSLv2".to_string(),
        other => format!("{other:?}"),
    }
}

/// Why a server aborted the handshake, as far as the error tells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandshakeRefusal {
    LegacyProtocol,
    WeakCipher,
    Other,
}

fn classify_handshake_error(error: &io::Error) -> HandshakeRefusal {
    let Some(tls_error) = error.get_ref().and_then(|inner| inner.downcast_ref::<rustls::Error>()) else {
        return HandshakeRefusal::Other;
    };
    match tls_error {
        rustls::Error::AlertReceived(AlertDescription::HandshakeFailure | AlertDescription::InsufficientSecurity)
        | rustls::Error::PeerIncompatible(PeerIncompatible::NoCipherSuitesInCommon) => HandshakeRefusal::WeakCipher,
        rustls::Error::AlertReceived(AlertDescription::ProtocolVersion) | rustls::Error::PeerIncompatible(_) => {
            HandshakeRefusal::LegacyProtocol
        }
        _ => HandshakeRefusal::Other,
    }
}

fn parse_certificate(der: &[u8]) -> Option<CertificateInfo> {
    match parse_x509_certificate(der) {
        Ok((_, x509)) => {
            debug!(subject = %x509.subject(), issuer = %x509.issuer(), "Parsed peer certificate.");
            let validity = x509.validity();
            let not_after = asn1_time_to_chrono_utc(&validity.not_after);
            Some(CertificateInfo {
                subject: x509.subject().to_string(),
                issuer: x509.issuer().to_string(),
                not_before: asn1_time_to_chrono_utc(&validity.not_before),
                not_after,
                days_until_expiry: not_after.signed_duration_since(Utc::now()).num_days(),
            })
        }
        Err(e) => {
            warn!(error = %e, "Peer certificate could not be parsed.");
            None
        }
    }
}

fn asn1_time_to_chrono_utc(time: &ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}
