//! Issuer registry
//!
//! Maps a CI public key identifier (lower-case hex) to the SM-DP+ hosts
//! that accept it. Loaded once at startup from a JSON object of the form
//! `{"<hex key id>": ["host", ...]}` and read-only afterwards.

use rsp_core::{RspError, RspResult};
use std::collections::BTreeMap;
use std::path::Path;

/// Registry of upstream hosts keyed by issuer key identifier
///
/// Keys are kept sorted, so prefix lookups are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuerRegistry {
    issuers: BTreeMap<String, Vec<String>>,
}

impl IssuerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an issuer and its candidate hosts
    ///
    /// # Arguments
    /// * `key_id` - Hex key identifier, any case
    /// * `hosts` - Candidate upstream hosts
    ///
    /// # Returns
    /// `false` if the entry was skipped because it lists no hosts
    ///
    /// # Errors
    /// Returns `Config` if `key_id` is empty or not valid hex.
    pub fn insert(&mut self, key_id: &str, hosts: Vec<String>) -> RspResult<bool> {
        let key = key_id.trim().to_ascii_lowercase();
        if key.is_empty() || hex::decode(&key).is_err() {
            return Err(RspError::Config(format!(
                "issuer registry key {:?} is not a hex key identifier",
                key_id
            )));
        }
        let hosts: Vec<String> = hosts
            .into_iter()
            .map(|host| host.trim().to_string())
            .filter(|host| !host.is_empty())
            .collect();
        if hosts.is_empty() {
            log::warn!("Issuer {} has no hosts, skipping", key);
            return Ok(false);
        }
        self.issuers.insert(key, hosts);
        Ok(true)
    }

    /// Parse a registry from its JSON form
    pub fn from_json(json: &str) -> RspResult<Self> {
        let entries: BTreeMap<String, Vec<String>> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for (key_id, hosts) in entries {
            registry.insert(&key_id, hosts)?;
        }
        Ok(registry)
    }

    /// Load a registry file
    ///
    /// # Errors
    /// Returns `Config` if the file cannot be read, or the parse error.
    pub fn load(path: impl AsRef<Path>) -> RspResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            RspError::Config(format!("cannot read issuer registry {}: {}", path.display(), e))
        })?;
        let registry = Self::from_json(&json)?;
        log::info!("Loaded {} issuers from {}", registry.len(), path.display());
        Ok(registry)
    }

    /// Hosts registered for an exact hex key identifier
    pub fn hosts(&self, key_id: &str) -> Option<&[String]> {
        self.issuers.get(key_id).map(Vec::as_slice)
    }

    /// First issuer (in key order) whose hex key identifier starts with `prefix`
    pub fn find_prefix(&self, prefix: &str) -> Option<(&str, &[String])> {
        if prefix.is_empty() {
            return None;
        }
        let prefix = prefix.to_ascii_lowercase();
        self.issuers
            .range(prefix.clone()..)
            .next()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(key, hosts)| (key.as_str(), hosts.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.issuers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issuers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: &str = r#"{
        "F54172BDF98A95D65CBEB88A38A1C11D800A85C3": ["rsp.truphone.com", "rsp2.truphone.com"],
        "81370f5125d0b1d408d4c3b232e6d25e795bebfb": ["smdp.io"],
        "aabbcc": []
    }"#;

    #[test]
    fn test_from_json() {
        let registry = IssuerRegistry::from_json(REGISTRY).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.hosts("f54172bdf98a95d65cbeb88a38a1c11d800a85c3").unwrap(),
            &["rsp.truphone.com", "rsp2.truphone.com"]
        );
        assert!(registry.hosts("aabbcc").is_none());
    }

    #[test]
    fn test_invalid_key() {
        let err = IssuerRegistry::from_json(r#"{"not-hex": ["a.example"]}"#).unwrap_err();
        assert!(matches!(err, RspError::Config(_)));
        assert!(matches!(IssuerRegistry::from_json("[]"), Err(RspError::Json(_))));
    }

    #[test]
    fn test_find_prefix() {
        let registry = IssuerRegistry::from_json(REGISTRY).unwrap();
        let (key, hosts) = registry.find_prefix("F541").unwrap();
        assert_eq!(key, "f54172bdf98a95d65cbeb88a38a1c11d800a85c3");
        assert_eq!(hosts.len(), 2);
        assert_eq!(registry.find_prefix("8137").unwrap().1, &["smdp.io"]);
        assert!(registry.find_prefix("8138").is_none());
        assert!(registry.find_prefix("").is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let err = IssuerRegistry::load("/nonexistent/rsp-registry.json").unwrap_err();
        assert!(matches!(err, RspError::Config(_)));
    }
}
