//! Upstream SM-DP+ selection
//!
//! An SM-DP+ address is usually pinned to an issuer by naming convention,
//! e.g. `f54172.rsp.example.com` for CI key `f54172...`. The router tries
//! that first, then falls back to the eUICC's own list of CI keys it can
//! sign with:
//!
//! 1. host pattern: the `issuer` capture of the configured pattern is
//!    looked up as a key prefix in the registry
//! 2. signing list: the first `euiccCiPKIdListForSigning` entry present in
//!    the registry
//!
//! Within an issuer, one host is picked at random.

use crate::registry::IssuerRegistry;
use rand::seq::SliceRandom;
use regex::Regex;
use rsp_bertlv::Tlv;
use rsp_core::{KeyIdentifier, RspError, RspResult};
use rsp_es9::tags;
use std::sync::Arc;

/// Default SM-DP+ address convention: `<issuer hex prefix>.rsp.<domain>`
pub const DEFAULT_HOST_PATTERN: &str = r"^(?P<issuer>[a-f0-9]{6,40})\.rsp\.";

/// Name of the capture group holding the issuer prefix
const ISSUER_GROUP: &str = "issuer";

/// Upstream chosen for one InitiateAuthentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Key identifier injected into the forwarded EUICCInfo1
    pub issuer: KeyIdentifier,
    /// Upstream SM-DP+ host
    pub host: String,
}

/// Resolves the upstream for a request
#[derive(Debug, Clone)]
pub struct IssuerRouter {
    registry: Arc<IssuerRegistry>,
    host_pattern: Option<Regex>,
}

impl IssuerRouter {
    /// Create a router with content-based routing only
    pub fn new(registry: Arc<IssuerRegistry>) -> Self {
        Self {
            registry,
            host_pattern: None,
        }
    }

    /// Enable routing by address pattern
    ///
    /// # Errors
    /// Returns `Config` if the pattern has no `issuer` capture group.
    pub fn with_host_pattern(mut self, pattern: Regex) -> RspResult<Self> {
        if !pattern.capture_names().flatten().any(|name| name == ISSUER_GROUP) {
            return Err(RspError::Config(format!(
                "host pattern {:?} has no (?P<{}>...) group",
                pattern.as_str(),
                ISSUER_GROUP
            )));
        }
        self.host_pattern = Some(pattern);
        Ok(self)
    }

    /// Choose the issuer and upstream host for a request
    ///
    /// # Arguments
    /// * `address` - The SM-DP+ address the eUICC asked for
    /// * `euicc_info1` - The client's EUICCInfo1
    ///
    /// # Errors
    /// Returns `IssuerNotFound` if neither strategy finds a registered issuer.
    pub fn route(&self, address: &str, euicc_info1: &Tlv) -> RspResult<Route> {
        if let Some(route) = self.route_by_address(address) {
            return Ok(route);
        }
        self.route_by_signing_list(euicc_info1)
            .ok_or(RspError::IssuerNotFound)
    }

    fn route_by_address(&self, address: &str) -> Option<Route> {
        let captures = self.host_pattern.as_ref()?.captures(address)?;
        let prefix = captures.name(ISSUER_GROUP)?.as_str();
        let (key_id, hosts) = self.registry.find_prefix(prefix)?;
        let issuer = key_id.parse::<KeyIdentifier>().ok()?;
        log::debug!("Address {} matched issuer {}", address, key_id);
        Some(Route {
            issuer,
            host: pick(hosts)?,
        })
    }

    fn route_by_signing_list(&self, euicc_info1: &Tlv) -> Option<Route> {
        euicc_info1
            .first(tags::CI_PKID_LIST_FOR_SIGNING)?
            .find(tags::OCTET_STRING)
            .map(|child| KeyIdentifier::from(child.value()))
            .find_map(|issuer| {
                let hosts = self.registry.hosts(&issuer.to_hex())?;
                Some(Route {
                    host: pick(hosts)?,
                    issuer,
                })
            })
    }
}

fn pick(hosts: &[String]) -> Option<String> {
    hosts.choose(&mut rand::thread_rng()).cloned()
}
