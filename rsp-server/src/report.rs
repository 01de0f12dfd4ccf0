//! Report delivery
//!
//! [`ReportSink`] is what the relay calls once per successful
//! AuthenticateClient. [`ReportWriter`] stores each report in its own
//! directory:
//!
//! ```text
//! <report_dir>/<EID>/
//!     EUICCInfo2.json
//!     report.json
//!     EUICC-<EID[..8]>-<AKI[..3]>.txt
//!     EUM-<AKI[..3]>-<SKI[..3]>.txt
//! ```
//!
//! Without a parseable eUICC certificate, the directory and certificate
//! files are named by SHA-256 instead.

use crate::certificate::{CertificateRenderer, CertificateSummary};
use async_trait::async_trait;
use rsp_bertlv::Tlv;
use rsp_core::{RspError, RspResult};
use rsp_es9::Report;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Receives the `authenticateResponseOk` of every completed handshake
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Handle one successful AuthenticateClient
    ///
    /// # Errors
    /// Any error becomes the outcome reported to the client.
    async fn on_authenticate_client(&self, response: &Tlv) -> RspResult<()>;
}

/// Subject line used when the EID or issuer is unknown
pub const DEFAULT_SUBJECT: &str = "RSP Dump Report";

/// One-line summary of a report: `"<EID[..16]> (<issuer[..6]>)"`
pub fn report_subject(eid: Option<&str>, issuer: Option<&str>) -> String {
    match (eid, issuer) {
        (Some(eid), Some(issuer)) if eid.len() == 32 && issuer.len() == 40 => {
            format!("{} ({})", &eid[..16], &issuer[..6])
        }
        _ => DEFAULT_SUBJECT.to_string(),
    }
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Prefix of at most `len` characters
fn head(s: &str, len: usize) -> &str {
    s.get(..len).unwrap_or(s)
}

/// A certificate ready to be written
struct CertificateFile {
    name: String,
    text: String,
}

/// Writes each report to a directory under `report_dir`
pub struct ReportWriter {
    report_dir: PathBuf,
    renderer: Arc<dyn CertificateRenderer>,
}

impl ReportWriter {
    pub fn new(report_dir: impl Into<PathBuf>, renderer: Arc<dyn CertificateRenderer>) -> Self {
        Self {
            report_dir: report_dir.into(),
            renderer,
        }
    }

    /// Write a report
    ///
    /// # Returns
    /// The directory the report was written to
    ///
    /// # Errors
    /// Returns `Report` if a file cannot be written.
    pub async fn write(&self, report: &Report) -> RspResult<PathBuf> {
        let euicc_der = report.euicc_certificate.as_ref().map(Tlv::encode).transpose()?;
        let eum_der = report.eum_certificate.as_ref().map(Tlv::encode).transpose()?;
        let euicc = euicc_der.as_deref().and_then(CertificateSummary::parse);
        let eum = eum_der.as_deref().and_then(CertificateSummary::parse);

        // the EID becomes a path component, so only plain alphanumerics are used
        let eid = euicc
            .as_ref()
            .and_then(|summary| summary.subject_serial_number.clone())
            .filter(|eid| !eid.is_empty() && eid.chars().all(|c| c.is_ascii_alphanumeric()));
        let issuer = eum
            .as_ref()
            .and_then(|summary| summary.authority_key_id.as_ref())
            .map(|aki| aki.to_hex());

        let info2 = report.euicc_info2_json()?;
        let full = serde_json::to_string_pretty(report)?;

        let directory_name = match (&eid, &euicc_der) {
            (Some(eid), _) => eid.clone(),
            (None, Some(der)) => head(&sha256_hex(der), 16).to_string(),
            (None, None) => head(&sha256_hex(full.as_bytes()), 16).to_string(),
        };
        let directory = self.report_dir.join(directory_name);

        let mut certificates = Vec::new();
        if let Some(der) = &euicc_der {
            let name = match (&eid, euicc.as_ref().and_then(|s| s.authority_key_id.as_ref())) {
                (Some(eid), Some(aki)) => format!("EUICC-{}-{}.txt", head(eid, 8), head(&aki.to_hex(), 6)),
                _ => format!("EUICC-{}.txt", head(&sha256_hex(der), 16)),
            };
            certificates.push(CertificateFile {
                name,
                text: self.renderer.render(der).await,
            });
        }
        if let Some(der) = &eum_der {
            let name = match (&issuer, eum.as_ref().and_then(|s| s.subject_key_id.as_ref())) {
                (Some(issuer), Some(ski)) => format!("EUM-{}-{}.txt", head(issuer, 6), head(&ski.to_hex(), 6)),
                _ => format!("EUM-{}.txt", head(&sha256_hex(der), 16)),
            };
            certificates.push(CertificateFile {
                name,
                text: self.renderer.render(der).await,
            });
        }

        write_file(&directory, "EUICCInfo2.json", info2.as_bytes()).await?;
        write_file(&directory, "report.json", full.as_bytes()).await?;
        for certificate in &certificates {
            write_file(&directory, &certificate.name, certificate.text.as_bytes()).await?;
        }

        log::info!(
            "Report \"{}\" written to {}",
            report_subject(eid.as_deref(), issuer.as_deref()),
            directory.display()
        );
        Ok(directory)
    }
}

async fn write_file(directory: &Path, name: &str, contents: &[u8]) -> RspResult<()> {
    tokio::fs::create_dir_all(directory)
        .await
        .map_err(|e| RspError::Report(format!("cannot create {}: {}", directory.display(), e)))?;
    let path = directory.join(name);
    tokio::fs::write(&path, contents)
        .await
        .map_err(|e| RspError::Report(format!("cannot write {}: {}", path.display(), e)))
}

#[async_trait]
impl ReportSink for ReportWriter {
    async fn on_authenticate_client(&self, response: &Tlv) -> RspResult<()> {
        let report = Report::extract(response);
        self.write(&report).await?;
        Ok(())
    }
}
