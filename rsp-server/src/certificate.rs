//! Certificate inspection and human-readable rendering
//!
//! Reports name their output after identifiers taken from the eUICC and EUM
//! certificates (EID, authority and subject key identifiers), and attach a
//! text rendering of each certificate. Rendering shells out to `openssl`
//! when it is available and falls back to PEM otherwise.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rsp_core::KeyIdentifier;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::ParsedExtension;
use x509_parser::prelude::FromDer;

/// OID of the `serialNumber` name attribute (holds the EID)
const OID_SERIAL_NUMBER: &str = "2.5.4.5";

const PEM_LINE_WIDTH: usize = 64;

/// How long `openssl` may take to render one certificate
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Identifiers read from a DER certificate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateSummary {
    /// Subject `serialNumber`; the EID for eUICC certificates
    pub subject_serial_number: Option<String>,
    pub authority_key_id: Option<KeyIdentifier>,
    pub subject_key_id: Option<KeyIdentifier>,
}

impl CertificateSummary {
    /// Parse a DER certificate; returns `None` if it is not one
    pub fn parse(der: &[u8]) -> Option<Self> {
        let (_, cert) = X509Certificate::from_der(der).ok()?;
        let mut summary = CertificateSummary {
            subject_serial_number: cert
                .subject()
                .iter_attributes()
                .find(|attr| attr.attr_type().to_id_string() == OID_SERIAL_NUMBER)
                .and_then(|attr| attr.as_str().ok())
                .map(str::to_string),
            ..Default::default()
        };
        for extension in cert.extensions() {
            match extension.parsed_extension() {
                ParsedExtension::AuthorityKeyIdentifier(aki) => {
                    summary.authority_key_id = aki
                        .key_identifier
                        .as_ref()
                        .map(|id| KeyIdentifier::from(id.0));
                }
                ParsedExtension::SubjectKeyIdentifier(ski) => {
                    summary.subject_key_id = Some(KeyIdentifier::from(ski.0));
                }
                _ => {}
            }
        }
        Some(summary)
    }
}

/// Encode DER bytes as a PEM `CERTIFICATE` block
pub fn pem_encode(der: &[u8]) -> String {
    let encoded = STANDARD.encode(der);
    let mut pem = String::with_capacity(encoded.len() + encoded.len() / PEM_LINE_WIDTH + 64);
    pem.push_str("-----BEGIN CERTIFICATE-----\n");
    for line in encoded.as_bytes().chunks(PEM_LINE_WIDTH) {
        // base64 output is ASCII
        pem.push_str(&String::from_utf8_lossy(line));
        pem.push('\n');
    }
    pem.push_str("-----END CERTIFICATE-----\n");
    pem
}

/// Turns a DER certificate into text for a report
///
/// Rendering never fails; implementations fall back to PEM.
#[async_trait]
pub trait CertificateRenderer: Send + Sync {
    async fn render(&self, der: &[u8]) -> String;
}

/// Always renders PEM
#[derive(Debug, Clone, Copy, Default)]
pub struct PemRenderer;

#[async_trait]
impl CertificateRenderer for PemRenderer {
    async fn render(&self, der: &[u8]) -> String {
        pem_encode(der)
    }
}

/// Renders with `openssl x509 -text`, falling back to PEM
///
/// A run that exceeds the timeout is killed and the certificate is
/// rendered as PEM instead.
#[derive(Debug, Clone)]
pub struct OpensslRenderer {
    program: PathBuf,
    timeout: Duration,
}

impl OpensslRenderer {
    /// Create a renderer running `program` (usually `openssl`)
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, der: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .args([
                "x509",
                "-inform",
                "DER",
                "-text",
                "-certopt",
                "ext_parse",
                "-nameopt",
                "sep_multiline,space_eq,lname,utf8",
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(der).await?;
        }
        let output = child.wait_with_output().await?;
        if !output.status.success() || output.stdout.is_empty() {
            return Err(std::io::Error::other(format!(
                "{} exited with {}",
                self.program.display(),
                output.status
            )));
        }
        Ok(output.stdout)
    }
}

impl Default for OpensslRenderer {
    fn default() -> Self {
        Self::new("openssl")
    }
}

#[async_trait]
impl CertificateRenderer for OpensslRenderer {
    async fn render(&self, der: &[u8]) -> String {
        // dropping the timed out future kills the child
        match tokio::time::timeout(self.timeout, self.run(der)).await {
            Ok(Ok(text)) => String::from_utf8_lossy(&text).into_owned(),
            Ok(Err(e)) => {
                log::debug!("Certificate rendering failed, using PEM: {}", e);
                pem_encode(der)
            }
            Err(_) => {
                log::warn!(
                    "{} did not finish within {:?}, using PEM",
                    self.program.display(),
                    self.timeout
                );
                pem_encode(der)
            }
        }
    }
}
