use std::{
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
};

/// The rate-limit-relevant headers extracted from one REST response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RatelimitHeaders {
    /// The response carried no rate-limit headers at all.
    None,
    /// The bucket's state after this response.
    Present {
        bucket: Option<String>,
        limit: u64,
        remaining: u64,
        reset_after: u64,
        /// Whether the 429 that produced this response was scoped to the
        /// whole application rather than this bucket (`X-RateLimit-Scope:
        /// shared`, or the legacy `X-RateLimit-Global: true`).
        global_scope: bool,
    },
    /// The request was rejected by the shared global lane; `retry_after` is
    /// in milliseconds.
    GlobalLimited { retry_after: u64 },
}

impl RatelimitHeaders {
    /// Parses rate-limit headers out of an iterator of `(name, value)`
    /// pairs, as provided by an HTTP client's header map. Header names are
    /// matched case-insensitively; values are expected to already be valid
    /// UTF-8 strings.
    pub fn from_pairs<'a>(
        pairs: impl Iterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, HeaderParsingError> {
        let mut bucket = None;
        let mut global = false;
        let mut limit = None;
        let mut remaining = None;
        let mut reset_after = None;
        let mut retry_after = None;
        let mut scope_shared = false;

        for (name, value) in pairs {
            match name.to_ascii_lowercase().as_str() {
                HeaderName::BUCKET => bucket = Some(value.to_owned()),
                HeaderName::GLOBAL => {
                    global = parse_bool(HeaderName::GLOBAL, value)?;
                }
                HeaderName::LIMIT => {
                    limit = Some(parse_int(HeaderName::LIMIT, value)?);
                }
                HeaderName::REMAINING => {
                    remaining = Some(parse_int(HeaderName::REMAINING, value)?);
                }
                HeaderName::RESET_AFTER => {
                    reset_after = Some(parse_millis_from_seconds(HeaderName::RESET_AFTER, value)?);
                }
                HeaderName::RETRY_AFTER => {
                    retry_after = Some(parse_millis_from_seconds(HeaderName::RETRY_AFTER, value)?);
                }
                HeaderName::SCOPE => {
                    scope_shared = value.eq_ignore_ascii_case("shared");
                }
                _ => {}
            }
        }

        if global || (scope_shared && retry_after.is_some()) {
            return Ok(Self::GlobalLimited {
                retry_after: retry_after.unwrap_or_default(),
            });
        }

        match (limit, remaining, reset_after) {
            (Some(limit), Some(remaining), Some(reset_after)) => Ok(Self::Present {
                bucket,
                limit,
                remaining,
                reset_after,
                global_scope: scope_shared,
            }),
            _ => Ok(Self::None),
        }
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, HeaderParsingError> {
    value
        .parse()
        .map_err(|source| HeaderParsingError {
            kind: HeaderParsingErrorType::Parsing {
                name,
                value: value.to_owned(),
            },
            source: Some(Box::new(source)),
        })
}

fn parse_int(name: &'static str, value: &str) -> Result<u64, HeaderParsingError> {
    value.parse().map_err(|source: std::num::ParseIntError| HeaderParsingError {
        kind: HeaderParsingErrorType::Parsing {
            name,
            value: value.to_owned(),
        },
        source: Some(Box::new(source)),
    })
}

/// Discord reports `reset-after`/`retry-after` as fractional seconds; the
/// rate limiter works in milliseconds throughout, so convert (rounding up,
/// never under-waiting) at the parsing boundary.
fn parse_millis_from_seconds(name: &'static str, value: &str) -> Result<u64, HeaderParsingError> {
    let seconds: f64 = value.parse().map_err(|source: std::num::ParseFloatError| HeaderParsingError {
        kind: HeaderParsingErrorType::Parsing {
            name,
            value: value.to_owned(),
        },
        source: Some(Box::new(source)),
    })?;

    Ok((seconds * 1000.0).ceil() as u64)
}

struct HeaderName;

impl HeaderName {
    const BUCKET: &'static str = "x-ratelimit-bucket";
    const GLOBAL: &'static str = "x-ratelimit-global";
    const LIMIT: &'static str = "x-ratelimit-limit";
    const REMAINING: &'static str = "x-ratelimit-remaining";
    const RESET_AFTER: &'static str = "x-ratelimit-reset-after";
    const RETRY_AFTER: &'static str = "retry-after";
    const SCOPE: &'static str = "x-ratelimit-scope";
}

/// An error parsing one of the rate-limit response headers.
#[derive(Debug)]
pub struct HeaderParsingError {
    pub(crate) kind: HeaderParsingErrorType,
    pub(crate) source: Option<Box<dyn Error + Send + Sync>>,
}

impl HeaderParsingError {
    pub const fn kind(&self) -> &HeaderParsingErrorType {
        &self.kind
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum HeaderParsingErrorType {
    Parsing { name: &'static str, value: String },
}

impl Display for HeaderParsingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.kind {
            HeaderParsingErrorType::Parsing { name, value } => {
                write!(f, "header `{name}` had an unparseable value `{value}`")
            }
        }
    }
}

impl Error for HeaderParsingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_ref().map(|source| &**source as &(dyn Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::RatelimitHeaders;

    #[test]
    fn present_bucket_parses() {
        let pairs = [
            ("X-RateLimit-Bucket", "abcd1234"),
            ("X-RateLimit-Limit", "5"),
            ("X-RateLimit-Remaining", "3"),
            ("X-RateLimit-Reset-After", "1.250"),
        ];

        let headers = RatelimitHeaders::from_pairs(pairs.into_iter()).unwrap();

        assert_eq!(
            headers,
            RatelimitHeaders::Present {
                bucket: Some("abcd1234".to_owned()),
                limit: 5,
                remaining: 3,
                reset_after: 1250,
                global_scope: false,
            }
        );
    }

    #[test]
    fn shared_scope_429_is_global_limited() {
        let pairs = [
            ("X-RateLimit-Scope", "shared"),
            ("Retry-After", "0.5"),
        ];

        let headers = RatelimitHeaders::from_pairs(pairs.into_iter()).unwrap();

        assert_eq!(headers, RatelimitHeaders::GlobalLimited { retry_after: 500 });
    }

    #[test]
    fn legacy_global_header_is_global_limited() {
        let pairs = [("X-RateLimit-Global", "true"), ("Retry-After", "2")];

        let headers = RatelimitHeaders::from_pairs(pairs.into_iter()).unwrap();

        assert_eq!(headers, RatelimitHeaders::GlobalLimited { retry_after: 2000 });
    }

    #[test]
    fn no_headers_is_none() {
        let headers = RatelimitHeaders::from_pairs(std::iter::empty()).unwrap();
        assert_eq!(headers, RatelimitHeaders::None);
    }
}
