//! reqwest based transport
//!
//! Issues the raw GET/PUT/DELETE requests of bfs-core. Every HTTP status is
//! returned to the caller; only connection level failures become errors.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;

use bfs_core::{
    BucketOperation, Error, Method, Result, Transport, TransportRequest, TransportResponse,
};

/// Transport backed by a shared [`reqwest::Client`]
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: Client,
}

impl ReqwestTransport {
    /// Create a transport, optionally accepting invalid TLS certificates
    pub fn new(insecure: bool) -> Result<Self> {
        let http_client = Client::builder()
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|e| Error::General(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { http_client })
    }

    fn operation(method: Method) -> BucketOperation {
        match method {
            Method::Get => BucketOperation::Download,
            Method::Put => BucketOperation::Upload,
            Method::Delete => BucketOperation::Delete,
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let TransportRequest {
            method,
            uri,
            authorization,
            body,
        } = request;
        tracing::debug!("{method} {uri}");

        let mut builder = match method {
            Method::Get => self.http_client.get(uri.clone()),
            Method::Put => self.http_client.put(uri.clone()),
            Method::Delete => self.http_client.delete(uri.clone()),
        };
        if let Some(authorization) = authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let wire_error = |e: reqwest::Error| Error::Transport {
            operation: Self::operation(method),
            uri: uri.to_string(),
            status: None,
            message: e.to_string(),
        };
        let response = builder.send().await.map_err(wire_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(wire_error)?;
        tracing::debug!("{method} {uri} -> {status} ({} bytes)", body.len());
        Ok(TransportResponse::new(status, body.to_vec()))
    }
}
