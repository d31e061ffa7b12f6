//! REST requester for the halcyon Discord client library: builds and
//! issues HTTP requests through the shared rate limiter, retrying
//! transient failures and permanently refusing further requests once the
//! token is known to be rejected.
//!
//! Endpoint coverage (message/guild/channel builders, entity schemas, CDN
//! URL construction) is intentionally out of scope; see [`Request`] for
//! the low-level primitive callers build those on top of.

mod api_error;
mod client;
mod error;
mod gateway;
mod request;

pub use self::{
    api_error::ApiError,
    client::{Client, ClientBuilder},
    error::{Error, ErrorType, Result},
    gateway::{GatewayBot, SessionStartLimit},
    request::Request,
};

pub use halcyon_http_ratelimiting::Method;

#[cfg(test)]
mod tests {
    use super::{Client, ClientBuilder};
    use static_assertions::assert_impl_all;
    use std::fmt::Debug;

    assert_impl_all!(Client: Clone, Debug, Send, Sync);
    assert_impl_all!(ClientBuilder: Send, Sync);

    #[test]
    fn token_is_prefixed_with_bot() {
        let client = Client::new("abc123");
        assert_eq!(client.token(), Some("Bot abc123"));
    }

    #[test]
    fn bearer_token_is_not_reprefixed() {
        let client = ClientBuilder::new().token("Bearer xyz").build();
        assert_eq!(client.token(), Some("Bearer xyz"));
    }
}
