use crate::{
    api_error::ApiError,
    error::{Error, ErrorType, Result},
    gateway::GatewayBot,
    request::Request,
};
use bytes::Buf;
use halcyon_http_ratelimiting::{Method as RlMethod, RateLimiter};
use hyper::{
    body,
    client::{Client as HyperClient, HttpConnector},
    header::{HeaderValue, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT},
    Body, Method, Response, StatusCode,
};
use hyper_rustls::HttpsConnector;
use serde::de::DeserializeOwned;
use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::time::sleep;

const API_VERSION: u8 = 10;
const DEFAULT_MAX_RETRIES: u32 = 5;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Whether a retryable failure should be retried: one initial attempt plus
/// up to `max_retries` further attempts.
const fn should_retry(attempt: u32, max_retries: u32) -> bool {
    attempt <= max_retries
}

const fn to_hyper_method(method: RlMethod) -> Method {
    match method {
        RlMethod::Delete => Method::DELETE,
        RlMethod::Get => Method::GET,
        RlMethod::Patch => Method::PATCH,
        RlMethod::Post => Method::POST,
        RlMethod::Put => Method::PUT,
    }
}

struct State {
    http: HyperClient<HttpsConnector<HttpConnector>, Body>,
    ratelimiter: RateLimiter,
    token: Option<Box<str>>,
    token_invalid: AtomicBool,
    timeout: Duration,
    max_retries: u32,
}

impl Debug for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("State").field("token", &self.token).field("max_retries", &self.max_retries).finish()
    }
}

/// The REST requester: builds and issues requests through the shared
/// [`RateLimiter`], retrying transient failures up to a fixed budget.
///
/// Cheaply [`Clone`]-able; every clone shares the same token, connection
/// pool, and rate limiter state.
#[derive(Clone, Debug)]
pub struct Client {
    state: Arc<State>,
}

impl Client {
    pub fn new(token: impl Into<String>) -> Self {
        ClientBuilder::new().token(token).build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn token(&self) -> Option<&str> {
        self.state.token.as_deref()
    }

    pub fn ratelimiter(&self) -> RateLimiter {
        self.state.ratelimiter.clone()
    }

    /// Fetches the recommended shard count and gateway URL.
    pub async fn gateway_bot(&self) -> Result<GatewayBot> {
        self.request(Request::new(RlMethod::Get, "/gateway/bot")).await
    }

    /// Issues a request, chunking and deserializing the response body.
    pub async fn request<T: DeserializeOwned>(&self, request: Request) -> Result<T> {
        let bytes = self.request_bytes(request).await?;

        serde_json::from_slice(&bytes).map_err(|source| Error {
            kind: ErrorType::Parsing { body: bytes.to_vec() },
            source: Some(Box::new(source)),
        })
    }

    /// Issues a request, checking only that the response was a success.
    pub async fn verify(&self, request: Request) -> Result<()> {
        self.request_bytes(request).await.map(drop)
    }

    async fn request_bytes(&self, request: Request) -> Result<bytes::Bytes> {
        let method = to_hyper_method(request.method);
        let path = request.path.clone();
        let body = request.body.clone();
        let headers = request.headers.clone();
        let use_authorization = request.use_authorization;
        let route = request.route_key();

        let mut attempt = 0;

        loop {
            let resp = self
                .raw(method, &path, body.clone(), headers.clone(), use_authorization, route.clone())
                .await?;

            let status = resp.status();

            if status.is_success() {
                return body::aggregate(resp.into_body())
                    .await
                    .map(|mut buf| buf.copy_to_bytes(buf.remaining()))
                    .map_err(|source| Error { kind: ErrorType::ChunkingResponse, source: Some(Box::new(source)) });
            }

            let retryable = matches!(
                status,
                StatusCode::TOO_MANY_REQUESTS
                    | StatusCode::INTERNAL_SERVER_ERROR
                    | StatusCode::BAD_GATEWAY
                    | StatusCode::SERVICE_UNAVAILABLE
                    | StatusCode::GATEWAY_TIMEOUT
            );

            attempt += 1;

            if retryable && should_retry(attempt, self.state.max_retries) {
                let wait = Duration::from_millis(250 * u64::from(attempt));
                tracing::debug!(%status, attempt, "retrying request after backoff");
                sleep(wait).await;
                continue;
            }

            let mut buf = body::aggregate(resp.into_body())
                .await
                .map_err(|source| Error { kind: ErrorType::ChunkingResponse, source: Some(Box::new(source)) })?;

            let mut bytes = vec![0; buf.remaining()];
            buf.copy_to_slice(&mut bytes);

            let error = serde_json::from_slice::<ApiError>(&bytes).unwrap_or(ApiError {
                code: 0,
                message: String::new(),
                global: None,
                retry_after: None,
            });

            if retryable {
                return Err(Error { kind: ErrorType::RetriesExhausted { attempts: attempt }, source: None });
            }

            return Err(Error { kind: ErrorType::Response { body: bytes, error, status }, source: None });
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn raw(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        extra_headers: Vec<(hyper::header::HeaderName, HeaderValue)>,
        use_authorization: bool,
        route: halcyon_http_ratelimiting::RouteKey,
    ) -> Result<Response<Body>> {
        if self.state.token_invalid.load(Ordering::Relaxed) {
            return Err(Error { kind: ErrorType::Unauthorized, source: None });
        }

        let url = format!("https://discord.com/api/v{API_VERSION}{path}");

        let mut builder = hyper::Request::builder().method(method).uri(&url);

        if use_authorization {
            if let Some(token) = &self.state.token {
                if let Some(headers) = builder.headers_mut() {
                    headers.insert(AUTHORIZATION, HeaderValue::from_str(token).map_err(|source| Error {
                        kind: ErrorType::BuildingRequest,
                        source: Some(Box::new(source)),
                    })?);
                }
            }
        }

        if let Some(headers) = builder.headers_mut() {
            headers.insert(USER_AGENT, HeaderValue::from_static(concat!("DiscordBot (https://github.com/halcyon-rs/halcyon, ", env!("CARGO_PKG_VERSION"), ")")));

            if let Some(bytes) = &body {
                headers.insert(CONTENT_LENGTH, bytes.len().into());
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }

            for (name, value) in extra_headers {
                headers.insert(name, value);
            }
        }

        let req = builder
            .body(body.map_or_else(Body::empty, Body::from))
            .map_err(|source| Error { kind: ErrorType::BuildingRequest, source: Some(Box::new(source)) })?;

        let ticket = self.state.ratelimiter.ticket(route);
        let responder = ticket.await.map_err(|source| Error { kind: ErrorType::Sending, source: Some(Box::new(source)) })?;

        let sent = tokio::time::timeout(self.state.timeout, self.state.http.request(req))
            .await
            .map_err(|source| Error { kind: ErrorType::RequestTimedOut, source: Some(Box::new(source)) })?
            .map_err(|source| Error { kind: ErrorType::Sending, source: Some(Box::new(source)) })?;

        if sent.status() == StatusCode::UNAUTHORIZED {
            self.state.token_invalid.store(true, Ordering::Relaxed);
        }

        match halcyon_http_ratelimiting::RatelimitHeaders::from_pairs(
            sent.headers().iter().map(|(name, value)| (name.as_str(), value.to_str().unwrap_or_default())),
        ) {
            Ok(headers) => {
                let _ = responder.send(Some(headers));
            }
            Err(error) => {
                tracing::warn!(%error, "failed to parse ratelimit headers");
                let _ = responder.send(None);
            }
        }

        Ok(sent)
    }
}

/// Builds a [`Client`].
pub struct ClientBuilder {
    token: Option<String>,
    timeout: Duration,
    max_retries: u32,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self { token: None, timeout: DEFAULT_TIMEOUT, max_retries: DEFAULT_MAX_RETRIES }
    }

    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();

        self.token = Some(if token.starts_with("Bot ") || token.starts_with("Bearer ") {
            token
        } else {
            format!("Bot {token}")
        });

        self
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn build(self) -> Client {
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .https_or_http()
            .enable_http1()
            .build();

        let http = HyperClient::builder().build(connector);

        Client {
            state: Arc::new(State {
                http,
                ratelimiter: RateLimiter::new(),
                token: self.token.map(String::into_boxed_str),
                token_invalid: AtomicBool::new(false),
                timeout: self.timeout,
                max_retries: self.max_retries,
            }),
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::should_retry;

    #[test]
    fn retries_up_to_the_budget_then_stops() {
        let max_retries = 5;

        // One initial attempt plus up to `max_retries` retries: attempts
        // 1 through 5 should retry, attempt 6 should not.
        for attempt in 1..=max_retries {
            assert!(should_retry(attempt, max_retries), "attempt {attempt} should still retry");
        }

        assert!(!should_retry(max_retries + 1, max_retries));
    }

    #[test]
    fn zero_max_retries_never_retries() {
        assert!(!should_retry(1, 0));
    }
}
