//! Mapping of GitHub responses onto [`RemoteError`].

use reqwest::header::HeaderMap;

use crate::remote::RemoteError;

/// What a failed response says beyond its status.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ResponseHints {
    /// `x-ratelimit-remaining: 0` or a `retry-after` header was present.
    pub(crate) rate_limited: bool,
}

impl ResponseHints {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Self {
        let exhausted = headers
            .get("x-ratelimit-remaining")
            .is_some_and(|v| v.as_bytes() == b"0");
        Self {
            rate_limited: exhausted || headers.contains_key("retry-after"),
        }
    }
}

/// GitHub words both primary and secondary limits this way.
fn mentions_rate_limit(message: &str) -> bool {
    message.to_ascii_lowercase().contains("rate limit")
}

/// Classify a non-success status for `resource`.
///
/// 403 means rate limiting when the hints say so and a forbidden action
/// otherwise. Only 401 ends the session.
pub(crate) fn from_status(status: u16, hints: ResponseHints, resource: &str) -> RemoteError {
    match status {
        401 => RemoteError::Unauthorized,
        429 => RemoteError::rate_limited(format!("Too many requests for {resource}")),
        403 if hints.rate_limited => {
            RemoteError::rate_limited(format!("Rate limit exhausted for {resource}"))
        }
        403 => RemoteError::api(format!("Forbidden: {resource}")),
        404 => RemoteError::not_found(resource),
        status => RemoteError::api(format!("Unexpected status {status} for {resource}")),
    }
}

/// Classify an octocrab error for `resource`.
///
/// GitHub answered: classify by status, using the message to spot rate
/// limits. Unreadable payloads are API errors. Everything else never got a
/// response and counts as a network failure.
pub(crate) fn from_octocrab(err: octocrab::Error, resource: &str) -> RemoteError {
    match err {
        octocrab::Error::GitHub { source, .. } => {
            let status = source.status_code.as_u16();
            let hints = ResponseHints {
                rate_limited: mentions_rate_limit(&source.message),
            };
            match status {
                401 | 404 | 429 => from_status(status, hints, resource),
                403 if hints.rate_limited => from_status(status, hints, resource),
                _ => RemoteError::api(format!("GitHub returned {status}: {}", source.message)),
            }
        }
        octocrab::Error::Json { .. } | octocrab::Error::Serde { .. } => {
            RemoteError::api(format!("Malformed response for {resource}: {err}"))
        }
        err => RemoteError::network(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;
    use crate::remote::ErrorKind;

    const PLAIN: ResponseHints = ResponseHints {
        rate_limited: false,
    };

    #[test]
    fn status_mapping() {
        assert_eq!(from_status(401, PLAIN, "a/b").kind(), ErrorKind::Unauthorized);
        assert_eq!(from_status(403, PLAIN, "a/b").kind(), ErrorKind::Other);
        assert_eq!(from_status(404, PLAIN, "a/b").kind(), ErrorKind::NotFound);
        assert_eq!(from_status(500, PLAIN, "a/b").kind(), ErrorKind::Other);
        assert_eq!(from_status(422, PLAIN, "a/b").kind(), ErrorKind::Other);
    }

    #[test]
    fn throttling_is_transient() {
        let limited = ResponseHints { rate_limited: true };
        let err = from_status(403, limited, "a/b");
        assert!(matches!(err, RemoteError::RateLimited { .. }), "{err:?}");
        assert!(err.is_transient());

        let err = from_status(429, PLAIN, "a/b");
        assert!(matches!(err, RemoteError::RateLimited { .. }), "{err:?}");
        assert!(err.is_transient());
    }

    #[test]
    fn rate_limit_headers_are_recognized() {
        let mut headers = HeaderMap::new();
        assert!(!ResponseHints::from_headers(&headers).rate_limited);

        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("12"));
        assert!(!ResponseHints::from_headers(&headers).rate_limited);

        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        assert!(ResponseHints::from_headers(&headers).rate_limited);

        let mut secondary = HeaderMap::new();
        secondary.insert("retry-after", HeaderValue::from_static("60"));
        assert!(ResponseHints::from_headers(&secondary).rate_limited);
    }

    #[test]
    fn rate_limit_messages_are_recognized() {
        assert!(mentions_rate_limit("API rate limit exceeded for user ID 1."));
        assert!(mentions_rate_limit(
            "You have exceeded a secondary rate limit. Please wait a few minutes."
        ));
        assert!(!mentions_rate_limit("Must have admin rights to Repository."));
    }

    #[test]
    fn not_found_names_the_resource() {
        let err = from_status(404, PLAIN, "octocat/hello");
        assert_eq!(err.to_string(), "Not found: octocat/hello");
    }
}
