//! ---
//! cm_section: "02-chaos-client"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Blocking HTTP transport seam."
//! cm_version: "v0.4.0"
//! cm_owner: "tbd"
//! ---
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode, Url};

use crate::error::{ChaosError, Result};

/// A fully prepared request. Authentication and user agent are already part
/// of `headers`.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Issues exactly one HTTP round trip per call, blocking until the response
/// body has been read or the timeout expires.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// [`Transport`] backed by `reqwest`'s blocking client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ChaosError::config(format!("unable to build HTTP client: {err}")))?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = builder.send().map_err(ChaosError::transport)?;
        let status = response.status();
        let body = response.bytes().map_err(ChaosError::transport)?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}
