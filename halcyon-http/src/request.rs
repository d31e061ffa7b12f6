use halcyon_http_ratelimiting::{Method, RouteKey};
use hyper::header::{HeaderName, HeaderValue};
use serde::Serialize;

/// A single outbound request: method, path, optional JSON body, and any
/// extra headers (audit log reason, content type overrides).
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) body: Option<Vec<u8>>,
    pub(crate) headers: Vec<(HeaderName, HeaderValue)>,
    pub(crate) use_authorization: bool,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
            use_authorization: true,
        }
    }

    #[must_use]
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Serializes `value` as JSON and sets it as the body.
    pub fn json(self, value: &impl Serialize) -> Result<Self, serde_json::Error> {
        let bytes = serde_json::to_vec(value)?;
        Ok(self.body(bytes))
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((name, value));
        self
    }

    #[must_use]
    pub const fn use_authorization(mut self, use_authorization: bool) -> Self {
        self.use_authorization = use_authorization;
        self
    }

    pub(crate) fn route_key(&self) -> RouteKey {
        RouteKey::normalize(self.method, &self.path)
    }
}
