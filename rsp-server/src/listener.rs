//! HTTP listener for the relay
//!
//! This module accepts TCP connections and serves HTTP/1.1 on them with
//! `hyper`, handing every request to the [`Relay`]. TLS is terminated in
//! front of the listener.

use crate::relay::{Relay, Reply};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::header::{self, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use rsp_core::{RspError, RspResult};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Default request body limit (1 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Server listener for accepting client connections
///
/// The listener spawns a task for each accepted connection, allowing
/// concurrent handling of multiple clients.
///
/// # Usage Example
/// ```rust,ignore
/// use rsp_server::listener::ServerListener;
///
/// let listener = ServerListener::new(relay, "localhost:33000");
/// listener.start().await?;
/// ```
pub struct ServerListener {
    /// The relay every request goes to
    relay: Arc<Relay>,
    /// Address to listen on
    address: String,
    /// Largest accepted request body
    max_body_bytes: usize,
}

impl ServerListener {
    /// Create a new server listener
    ///
    /// # Arguments
    /// * `relay` - The relay handler
    /// * `address` - Address to listen on (e.g., "localhost:33000")
    pub fn new(relay: Relay, address: impl Into<String>) -> Self {
        Self {
            relay: Arc::new(relay),
            address: address.into(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Set the request body limit; larger bodies get `413`
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Bind the listening socket
    ///
    /// # Errors
    /// Returns `Connection` if binding to the address fails
    pub async fn bind(&self) -> RspResult<TcpListener> {
        TcpListener::bind(self.address.as_str()).await.map_err(|e| {
            RspError::Connection(std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                format!("Failed to bind to {}: {}", self.address, e),
            ))
        })
    }

    /// Start listening for connections
    ///
    /// This method will block and accept connections indefinitely.
    pub async fn start(&self) -> RspResult<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Accept connections from an already bound socket
    pub async fn serve(&self, listener: TcpListener) -> RspResult<()> {
        log::info!("RSP relay listening on {}", listener.local_addr()?);

        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    log::debug!("Accepted connection from {}", peer_addr);
                    let relay = self.relay.clone();
                    let max_body_bytes = self.max_body_bytes;

                    tokio::spawn(async move {
                        let service = service_fn(move |request| {
                            handle_request(relay.clone(), max_body_bytes, request)
                        });
                        if let Err(e) = http1::Builder::new()
                            .serve_connection(TokioIo::new(stream), service)
                            .await
                        {
                            log::error!("Error handling connection from {}: {}", peer_addr, e);
                        }
                    });
                }
                Err(e) => {
                    log::error!("Error accepting connection: {}", e);
                }
            }
        }
    }
}

async fn handle_request(
    relay: Arc<Relay>,
    max_body_bytes: usize,
    request: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = request.into_parts();
    let body = match Limited::new(body, max_body_bytes).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            log::warn!("{} {}: body exceeds {} bytes", parts.method, parts.uri.path(), max_body_bytes);
            return Ok(status_response(StatusCode::PAYLOAD_TOO_LARGE));
        }
        Err(e) => {
            log::warn!("{} {}: cannot read body: {}", parts.method, parts.uri.path(), e);
            return Ok(status_response(StatusCode::BAD_REQUEST));
        }
    };
    let reply = relay.handle(&parts.method, parts.uri.path(), body).await;
    Ok(into_response(reply))
}

fn into_response(reply: Reply) -> Response<Full<Bytes>> {
    match reply {
        Reply::Json(body) => body_response(body, "application/json"),
        Reply::Binary(body) => body_response(body, "application/octet-stream"),
        Reply::Redirect(location) => match HeaderValue::from_str(&location) {
            Ok(location) => {
                let mut response = status_response(StatusCode::TEMPORARY_REDIRECT);
                response.headers_mut().insert(header::LOCATION, location);
                response
            }
            Err(_) => {
                log::error!("Invalid redirect location {:?}", location);
                status_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        },
        Reply::Status(code) => {
            status_response(StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
        }
    }
}

fn body_response(body: Vec<u8>, content_type: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Plain-text response carrying the status' reason phrase
fn status_response(status: StatusCode) -> Response<Full<Bytes>> {
    let text = format!("{}\n", status.canonical_reason().unwrap_or(""));
    let mut response = body_response(text.into_bytes(), "text/plain; charset=utf-8");
    *response.status_mut() = status;
    response
}
