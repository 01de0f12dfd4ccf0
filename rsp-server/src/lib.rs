//! RSP relay server
//!
//! This crate provides the SM-DP+ facing side of the relay: issuer
//! routing, the ES9+ relay handler, report delivery and the HTTP listener.
//!
//! - [`registry`]: issuer key identifier to upstream host registry
//! - [`router`]: upstream selection by address pattern or signing list
//! - [`upstream`]: outbound ES9+ client
//! - [`relay`]: InitiateAuthentication / AuthenticateClient / `asn1` handling
//! - [`report`]: report sink and on-disk report writer
//! - [`certificate`]: certificate identifiers and text rendering
//! - [`listener`]: HTTP/1.1 listener

pub mod certificate;
pub mod listener;
pub mod registry;
pub mod relay;
pub mod report;
pub mod router;
pub mod upstream;

pub use certificate::{CertificateRenderer, CertificateSummary, OpensslRenderer, PemRenderer};
pub use listener::ServerListener;
pub use registry::IssuerRegistry;
pub use relay::{Relay, Reply};
pub use report::{ReportSink, ReportWriter};
pub use router::{IssuerRouter, Route};
pub use upstream::{HttpUpstream, UpstreamClient, UpstreamRequest};
