use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::{SystemTime, UNIX_EPOCH};

/// Discord snowflakes embed a creation timestamp in their upper 42 bits;
/// a message older than this is bucketed separately on delete, mirroring
/// Discord's "deleting old messages" rate limit carve-out.
const FOURTEEN_DAYS_MS: u64 = 14 * 24 * 60 * 60 * 1000;
const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

static SNOWFLAKE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{17,19}").unwrap());
static REACTION_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"/reactions/[^/]+(/[^/]+)?$").unwrap());
static WEBHOOK_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(/webhooks/:id)/[^/]+$").unwrap());

/// An HTTP method, kept local to avoid pulling in a full HTTP crate just
/// for its method enum.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    Delete,
    Get,
    Patch,
    Post,
    Put,
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::Delete => "DELETE",
            Self::Get => "GET",
            Self::Patch => "PATCH",
            Self::Post => "POST",
            Self::Put => "PUT",
        })
    }
}

/// A normalized rate-limit route key: the `(method, template, majorParam)`
/// tuple every bucket and queue-lock is keyed by.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RouteKey {
    pub method: Method,
    pub template: String,
    pub major_param: String,
}

impl RouteKey {
    /// Normalizes a `(method, path)` pair into a [`RouteKey`].
    ///
    /// IDs are replaced with `:id`; reaction emoji/user suffixes collapse to
    /// a single `:reaction` segment; webhook tokens collapse to `:token`;
    /// interaction callbacks share one global bucket; and a `DELETE` of a
    /// message older than 14 days gets its own template, since Discord
    /// rate-limits those separately from normal message deletes.
    pub fn normalize(method: Method, path: &str) -> Self {
        if path.starts_with("/interactions/") && path.ends_with("/callback") {
            return Self {
                method,
                template: "/interactions/:id/:token/callback".to_owned(),
                major_param: "global".to_owned(),
            };
        }

        let mut major_param = String::new();
        let mut first_seen = false;

        let mut template = SNOWFLAKE_RUN
            .replace_all(path, |caps: &regex::Captures<'_>| {
                if !first_seen {
                    major_param = caps[0].to_owned();
                    first_seen = true;
                }
                ":id"
            })
            .into_owned();

        template = REACTION_SUFFIX.replace(&template, "/reactions/:reaction").into_owned();
        template = WEBHOOK_TOKEN.replace(&template, "$1/:token").into_owned();

        if method == Method::Delete && template == "/channels/:id/messages/:id" {
            if let Some(message_id) = extract_last_id(path) {
                if is_older_than_14_days(message_id) {
                    template.push_str("#old-message-delete");
                }
            }
        }

        Self {
            method,
            template,
            major_param,
        }
    }
}

fn extract_last_id(path: &str) -> Option<u64> {
    SNOWFLAKE_RUN
        .find_iter(path)
        .last()
        .and_then(|m| m.as_str().parse().ok())
}

fn is_older_than_14_days(snowflake: u64) -> bool {
    let created_ms = (snowflake >> 22) + DISCORD_EPOCH_MS;
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;

    now_ms.saturating_sub(created_ms) > FOURTEEN_DAYS_MS
}

#[cfg(test)]
mod tests {
    use super::{Method, RouteKey};

    #[test]
    fn normalizes_ids_to_colon_id() {
        let key = RouteKey::normalize(Method::Get, "/channels/175928847299117063/messages/175928847299117064");
        assert_eq!(key.template, "/channels/:id/messages/:id");
        assert_eq!(key.major_param, "175928847299117063");
    }

    #[test]
    fn collapses_reaction_suffix() {
        let key = RouteKey::normalize(
            Method::Put,
            "/channels/175928847299117063/messages/175928847299117064/reactions/%F0%9F%91%8D/@me",
        );
        assert_eq!(key.template, "/channels/:id/messages/:id/reactions/:reaction");
    }

    #[test]
    fn collapses_webhook_token() {
        let key = RouteKey::normalize(Method::Post, "/webhooks/175928847299117063/some-token-value");
        assert_eq!(key.template, "/webhooks/:id/:token");
    }

    #[test]
    fn interaction_callback_shares_global_bucket() {
        let key = RouteKey::normalize(Method::Post, "/interactions/175928847299117063/some-token/callback");
        assert_eq!(key.major_param, "global");
    }

    #[test]
    fn old_message_delete_gets_separate_template() {
        // This snowflake's embedded timestamp is April 2016, far more than
        // 14 days in the past from any real clock.
        let key = RouteKey::normalize(Method::Delete, "/channels/175928847299117063/messages/175928847299117064");
        assert!(key.template.ends_with("#old-message-delete"));
    }

    #[test]
    fn recent_message_delete_uses_normal_template() {
        let now_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        let recent_snowflake = (now_ms.saturating_sub(1_420_070_400_000)) << 22;
        let path = format!("/channels/175928847299117063/messages/{recent_snowflake}");

        let key = RouteKey::normalize(Method::Delete, &path);
        assert_eq!(key.template, "/channels/:id/messages/:id");
    }
}
