//! ES9+ relay
//!
//! Each request is one complete transition; nothing is kept between
//! requests.
//!
//! - InitiateAuthentication: route to an upstream SM-DP+, rewrite
//!   EUICCInfo1 so that only the chosen issuer is offered, forward, and
//!   check that the upstream picked that issuer.
//! - AuthenticateClient: branch on the AuthenticateServerResponse; a
//!   success is handed to the [`ReportSink`] and the flow then ends with
//!   [`RspError::ExtractionFinished`], since no profile is ever downloaded.
//! - `/asn1`: the same two operations over raw BER-TLV.

use crate::report::ReportSink;
use crate::router::IssuerRouter;
use crate::upstream::{UpstreamClient, UpstreamRequest};
use bytes::Bytes;
use hyper::Method;
use rsp_bertlv::{Tag, Tlv};
use rsp_core::{RspError, RspResult, Version};
use rsp_es9::{
    AuthenticateClientRequest, AuthenticateServerResponse, GeneralResponse,
    InitiateAuthenticationRequest, InitiateAuthenticationResponse, tags,
};
use std::sync::Arc;

/// Common prefix of every RSP endpoint
pub const RSP2_PREFIX: &str = "/gsma/rsp2";
/// Raw BER-TLV endpoint
pub const ASN1_PATH: &str = "/gsma/rsp2/asn1";
/// ES9+ InitiateAuthentication
pub const INITIATE_AUTHENTICATION_PATH: &str = "/gsma/rsp2/es9plus/initiateAuthentication";
/// ES9+ AuthenticateClient
pub const AUTHENTICATE_CLIENT_PATH: &str = "/gsma/rsp2/es9plus/authenticateClient";

/// Transport-independent outcome of an HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `200`, `application/json`
    Json(Vec<u8>),
    /// `200`, `application/octet-stream`
    Binary(Vec<u8>),
    /// `307` to the given location
    Redirect(String),
    /// Bare status code
    Status(u16),
}

impl Reply {
    fn json<T: serde::Serialize>(value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Reply::Json(body),
            Err(e) => {
                log::error!("Cannot serialize response: {}", e);
                Reply::Status(500)
            }
        }
    }

    fn error(error: &RspError) -> Self {
        Reply::json(&GeneralResponse::from_error(error))
    }
}

/// The relay handler
///
/// # Usage Example
///
/// ```rust,ignore
/// let router = IssuerRouter::new(Arc::new(registry));
/// let relay = Relay::new(router, Arc::new(HttpUpstream::new(timeout)?), Arc::new(writer))
///     .with_homepage("https://example.com/rsp-dump/");
/// let reply = relay.handle(&Method::POST, ASN1_PATH, body).await;
/// ```
pub struct Relay {
    router: IssuerRouter,
    upstream: Arc<dyn UpstreamClient>,
    sink: Arc<dyn ReportSink>,
    homepage: Option<String>,
}

impl Relay {
    pub fn new(router: IssuerRouter, upstream: Arc<dyn UpstreamClient>, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            router,
            upstream,
            sink,
            homepage: None,
        }
    }

    /// Redirect requests outside the RSP endpoints to `url`
    pub fn with_homepage(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.homepage = (!url.is_empty()).then_some(url);
        self
    }

    /// Relay an InitiateAuthentication to the upstream SM-DP+
    ///
    /// # Returns
    /// The upstream response, unchanged, once it has confirmed the issuer.
    /// A failed upstream header is logged; without the issuer echo it still
    /// ends in `IssuerMismatch`.
    ///
    /// # Errors
    /// - `IssuerNotFound` if no upstream is registered for the request
    /// - `MissingElement` if EUICCInfo1 has no `svn`
    /// - `Upstream` / `Json` if the upstream call fails
    /// - `IssuerMismatch` if the upstream chose another issuer
    pub async fn initiate_authentication(
        &self,
        mut request: InitiateAuthenticationRequest,
    ) -> RspResult<InitiateAuthenticationResponse> {
        let route = self.router.route(&request.smdp_address, &request.euicc_info1)?;
        let svn = request
            .euicc_info1
            .first(tags::SVN)
            .cloned()
            .ok_or(RspError::MissingElement("svn"))?;
        let version = Version::from_bytes(svn.value());

        let issuer = || {
            vec![Tlv::primitive(
                tags::OCTET_STRING,
                route.issuer.as_bytes().to_vec(),
            )]
        };
        request.euicc_info1 = Tlv::constructed(
            request.euicc_info1.tag(),
            vec![
                svn,
                Tlv::constructed(tags::CI_PKID_LIST_FOR_VERIFICATION, issuer()),
                Tlv::constructed(tags::CI_PKID_LIST_FOR_SIGNING, issuer()),
            ],
        );
        request.smdp_address = route.host.clone();

        let body = serde_json::to_vec(&request)?;
        log::debug!("ES9+.InitiateAuthenticationRequest to {}: {}", route.host, String::from_utf8_lossy(&body));
        let upstream_request =
            UpstreamRequest::es9plus(&route.host, INITIATE_AUTHENTICATION_PATH, version, body);
        let body = self.upstream.post(upstream_request).await?;
        let response: InitiateAuthenticationResponse = serde_json::from_slice(&body)?;

        if !response.header.is_success() {
            log::warn!(
                "ES9+.InitiateAuthenticationResponse from {} failed: {:?}",
                route.host,
                response.header.function_execution_status.status_code_data
            );
        }
        let used_issuer = response.euicc_ci_pkid_to_be_used.as_ref().map(Tlv::value);
        if used_issuer != Some(route.issuer.as_bytes()) {
            return Err(RspError::IssuerMismatch(route.host));
        }
        log::info!(
            "ES9+.InitiateAuthenticationResponse TransactionId: {} Host: {} Issuer: {}",
            response.transaction_id,
            route.host,
            route.issuer
        );
        Ok(response)
    }

    /// Handle an AuthenticateClient
    ///
    /// This never completes normally: a successful authentication is passed
    /// to the report sink and then reported as `ExtractionFinished`.
    ///
    /// # Errors
    /// - `ExtractionFinished` once the report sink accepted the response
    /// - whatever the report sink returned, if it failed
    /// - `AuthenticateResponse` for an `authenticateResponseError`
    /// - `UnknownServerError` for any other response
    pub async fn authenticate_client(&self, request: &AuthenticateClientRequest) -> RspResult<GeneralResponse> {
        let response = &request.authenticate_server_response;
        log::info!("ES9+.AuthenticateClientRequest TransactionId: {}", request.transaction_id);
        if log::log_enabled!(log::Level::Debug) {
            if let Ok(encoded) = response.to_base64() {
                log::debug!("ES9+.AuthenticateClientRequest Response: {}", encoded);
            }
        }
        match AuthenticateServerResponse::classify(response)? {
            AuthenticateServerResponse::Ok(ok) => {
                self.sink.on_authenticate_client(ok).await?;
                Err(RspError::ExtractionFinished)
            }
            branch => Err(branch.to_error().unwrap_or(RspError::UnknownServerError)),
        }
    }

    /// Serve a raw BER-TLV request
    ///
    /// # Returns
    /// The encoded response, or an empty buffer when there is none or the
    /// request failed.
    pub async fn handle_asn1(&self, body: &Bytes) -> Vec<u8> {
        let result = match Tlv::decode(body) {
            Ok((request, _)) => self.asn1(&request).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(Some(response)) => response.encode().unwrap_or_else(|e| {
                log::error!("Cannot encode ASN.1 response: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("ASN.1 request failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn asn1(&self, request: &Tlv) -> RspResult<Option<Tlv>> {
        if let Some(initiate) = request.first(tags::INITIATE_AUTHENTICATION_REQUEST) {
            let response = self
                .initiate_authentication(InitiateAuthenticationRequest {
                    euicc_challenge: required(initiate, tags::CONTEXT_1, "euiccChallenge")?.value().to_vec(),
                    smdp_address: String::from_utf8_lossy(
                        required(initiate, tags::CONTEXT_3, "smdpAddress")?.value(),
                    )
                    .into_owned(),
                    euicc_info1: required(initiate, tags::EUICC_INFO1, "euiccInfo1")?.clone(),
                })
                .await?;
            let transaction_id = hex::decode(&response.transaction_id).map_err(|e| {
                RspError::InvalidData(format!("transactionId {:?}: {}", response.transaction_id, e))
            })?;
            let ok = Tlv::constructed(
                tags::CONSTRUCTED_0,
                vec![
                    Tlv::primitive(tags::CONTEXT_0, transaction_id),
                    response.server_signed1.ok_or(RspError::MissingElement("serverSigned1"))?,
                    response
                        .server_signature1
                        .ok_or(RspError::MissingElement("serverSignature1"))?,
                    response
                        .euicc_ci_pkid_to_be_used
                        .ok_or(RspError::MissingElement("euiccCiPKIdToBeUsed"))?,
                    response
                        .server_certificate
                        .ok_or(RspError::MissingElement("serverCertificate"))?,
                ],
            );
            return Ok(Some(Tlv::constructed(tags::INITIATE_AUTHENTICATION_REQUEST, vec![ok])));
        }
        if let Some(authenticate) = request.first(tags::AUTHENTICATE_CLIENT_REQUEST) {
            let request = AuthenticateClientRequest {
                transaction_id: hex::encode(required(authenticate, tags::CONTEXT_0, "transactionId")?.value()),
                authenticate_server_response: required(
                    authenticate,
                    tags::AUTHENTICATE_SERVER_RESPONSE,
                    "authenticateServerResponse",
                )?
                .clone(),
            };
            if let Err(e) = self.authenticate_client(&request).await {
                log_outcome(AUTHENTICATE_CLIENT_PATH, &e);
            }
            return Ok(None);
        }
        Ok(None)
    }

    /// Dispatch an HTTP request
    ///
    /// # Arguments
    /// * `method` - Request method
    /// * `path` - Request path, without query
    /// * `body` - Complete request body
    pub async fn handle(&self, method: &Method, path: &str, body: Bytes) -> Reply {
        let known = matches!(
            path,
            ASN1_PATH | INITIATE_AUTHENTICATION_PATH | AUTHENTICATE_CLIENT_PATH
        );
        if !known {
            if !path.starts_with(RSP2_PREFIX) {
                log::debug!("{} {} is not an RSP endpoint", method, path);
            }
            return match &self.homepage {
                Some(url) => Reply::Redirect(url.clone()),
                None => Reply::Status(403),
            };
        }
        if method != Method::POST {
            return Reply::Status(405);
        }

        match path {
            ASN1_PATH => Reply::Binary(self.handle_asn1(&body).await),
            INITIATE_AUTHENTICATION_PATH => {
                let result = match serde_json::from_slice::<InitiateAuthenticationRequest>(&body) {
                    Ok(request) => self.initiate_authentication(request).await,
                    Err(e) => Err(e.into()),
                };
                match result {
                    Ok(response) => Reply::json(&response),
                    Err(e) => {
                        log_outcome(path, &e);
                        Reply::error(&e)
                    }
                }
            }
            _ => {
                let result = match serde_json::from_slice::<AuthenticateClientRequest>(&body) {
                    Ok(request) => self.authenticate_client(&request).await,
                    Err(e) => Err(e.into()),
                };
                match result {
                    Ok(response) => Reply::json(&response),
                    Err(e) => {
                        log_outcome(path, &e);
                        Reply::error(&e)
                    }
                }
            }
        }
    }
}

fn required<'a>(node: &'a Tlv, tag: Tag, name: &'static str) -> RspResult<&'a Tlv> {
    node.first(tag).ok_or(RspError::MissingElement(name))
}

fn log_outcome(path: &str, error: &RspError) {
    match error {
        RspError::ExtractionFinished => log::info!("{}: {}", path, error),
        _ => log::warn!("{} failed: {}", path, error),
    }
}
