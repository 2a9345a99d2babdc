use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Origin allow-list. A `*` matches exactly one DNS label, so
/// `https://*.vercel.app` admits `https://app.vercel.app` but not
/// `https://a.b.vercel.app` or `https://vercel.app`.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    patterns: Vec<String>,
}

impl OriginPolicy {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.into().trim().trim_end_matches('/').to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.patterns.iter().any(|p| origin_matches(p, origin))
    }

    pub fn layer(&self) -> CorsLayer {
        let policy = self.clone();
        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
                origin.to_str().map(|o| policy.allows(o)).unwrap_or(false)
            }))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    }
}

fn origin_matches(pattern: &str, origin: &str) -> bool {
    let Some((prefix, suffix)) = pattern.split_once('*') else {
        return pattern.eq_ignore_ascii_case(origin);
    };
    if !origin.is_ascii() || origin.len() < prefix.len() + suffix.len() {
        return false;
    }
    let (head, rest) = origin.split_at(prefix.len());
    let (label, tail) = rest.split_at(rest.len() - suffix.len());
    head.eq_ignore_ascii_case(prefix)
        && tail.eq_ignore_ascii_case(suffix)
        && !label.is_empty()
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
