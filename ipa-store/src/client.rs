/*
Copyright 2022 Daniel Brotsky. All rights reserved.

All of the copyrighted work in this repository is licensed under the
GNU Affero General Public License, reproduced in the LICENSE-AGPL file.

Attribution:

Some source files in this repository are derived from files in two Adobe Open
Source projects: the Adobe License Decoder repository found at this URL:
    https://github.com/adobe/adobe-license-decoder.rs
and the FRL Online Proxy repository found at this URL:
    https://github.com/adobe/frl-online-proxy

The files in those original works are copyright 2022 Adobe and the use of those
materials in this work is permitted by the MIT license under which they were
released.  That license is reproduced here in the LICENSE-MIT file.
*/
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use ipa_base::{device_guid, Error, Result, Session};

use crate::cookies::StoreCookies;
use crate::endpoint::Endpoints;
use crate::request::StoreRequest;
use crate::response::StoreResponse;

pub const STORE_USER_AGENT: &str =
    "Configurator/2.15 (Macintosh; OS X 11.0.0; 16G29) AppleWebKit/2603.3.8";
pub const STORE_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Timeouts and transport retry policy.  Retries only happen on
/// connection failures and timeouts, never on store failures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub retry_count: u32,
    pub retry_delay_ms: u64,
}

impl Default for NetConfig {
    fn default() -> Self {
        NetConfig {
            timeout_secs: 60,
            connect_timeout_secs: 30,
            retry_count: 2,
            retry_delay_ms: 1000,
        }
    }
}

/// What came back over the wire, before classification.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// A connection to the store.  Each client has its own cookie jar,
/// which lives as long as the client does.
#[derive(Clone)]
pub struct StoreClient {
    http: reqwest::Client,
    cookies: Arc<StoreCookies>,
    endpoints: Endpoints,
    guid: String,
    config: NetConfig,
}

impl StoreClient {
    /// A client that identifies itself with this machine's device GUID.
    pub fn new(endpoints: Endpoints, config: NetConfig) -> Result<Self> {
        let guid = device_guid()?;
        Self::with_guid(endpoints, config, guid)
    }

    pub fn with_guid(endpoints: Endpoints, config: NetConfig, guid: &str) -> Result<Self> {
        let cookies = Arc::new(StoreCookies::new());
        let http = reqwest::Client::builder()
            .cookie_provider(cookies.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        Ok(StoreClient { http, cookies, endpoints, guid: guid.to_string(), config })
    }

    /// Replay a saved session's cookies on every later request.
    pub fn restore_session(&self, session: &Session) {
        debug!("Restoring {} cookie(s) from saved session", session.cookies.len());
        self.cookies.restore(&session.cookies, &self.endpoints.origins());
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn cookies(&self) -> &StoreCookies {
        &self.cookies
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Send a request and classify the response.
    pub async fn issue(
        &self,
        request: &StoreRequest,
        cancel: &CancellationToken,
    ) -> Result<StoreResponse> {
        let raw = self.send(request, cancel).await?;
        decode_response(&raw)
    }

    /// Send a request, retrying transient transport failures, and hand
    /// back the status and body without looking at them.
    pub async fn send(
        &self,
        request: &StoreRequest,
        cancel: &CancellationToken,
    ) -> Result<RawResponse> {
        let url = request.endpoint.url(&self.endpoints, &self.guid);
        let headers = self.headers(request)?;
        let body = request.body()?;
        debug!("Sending {:?} to {}", request, &url);
        let mut attempt: u32 = 0;
        loop {
            if attempt > 0 {
                let delay = Duration::from_millis(self.config.retry_delay_ms) * attempt;
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            let builder = self.http.post(&url).headers(headers.clone()).body(body.clone());
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Cancelled {:?} request", request.endpoint);
                    return Err(Error::Cancelled);
                }
                outcome = execute(builder) => outcome,
            };
            match outcome {
                Ok(raw) => {
                    debug!("Received status {} with {} byte body", raw.status, raw.body.len());
                    return Ok(raw);
                }
                Err(err) if attempt < self.config.retry_count && is_transient(&err) => {
                    attempt += 1;
                    warn!("Transport failure on {:?} request (retry {}): {}", request.endpoint, attempt, err);
                }
                Err(err) => return Err(Error::Transport(err)),
            }
        }
    }

    fn headers(&self, request: &StoreRequest) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(STORE_USER_AGENT));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(STORE_CONTENT_TYPE));
        for (name, value) in request.headers.iter() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| Error::Request(format!("bad header name '{}': {}", name, err)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|err| Error::Request(format!("bad value for header '{}': {}", name, err)))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

pub(crate) fn decode_response(raw: &RawResponse) -> Result<StoreResponse> {
    match StoreResponse::decode(&raw.body) {
        Ok(response) => Ok(response),
        Err(err) if !(200..300).contains(&raw.status) => Err(Error::MalformedResponse(format!(
            "unexpected status {} ({})",
            raw.status, err
        ))),
        Err(err) => Err(err),
    }
}

async fn execute(builder: reqwest::RequestBuilder) -> reqwest::Result<RawResponse> {
    let response = builder.send().await?;
    let status = response.status().as_u16();
    let body = response.bytes().await?.to_vec();
    Ok(RawResponse { status, body })
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}
