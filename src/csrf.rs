use axum::http::Method;
use thiserror::Error;

/// CsrfError
///
/// The two ways Origin/Referer validation can fail. The reason strings are
/// intentionally short and never include the configured allow-list, so a 403
/// response does not leak the set of trusted deployments.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrfError {
    /// Unsafe request carried neither an Origin nor a Referer header.
    #[error("missing origin headers")]
    MissingHeaders,
    /// The presented origin matched neither the allow-list nor the request host.
    #[error("origin not allowed")]
    InvalidOrigin,
}

/// validate_origin
///
/// Pure cross-site request forgery decision function, consumed by the CSRF
/// middleware in front of every mutating route.
///
/// Rules:
/// 1. Safe methods (GET/HEAD/OPTIONS) always pass, no header inspection.
/// 2. For unsafe methods the candidate is the Origin header; the Referer is
///    only a fallback when Origin is absent. A bad Origin is never rescued by
///    a trusted Referer.
/// 3. The candidate passes if it starts with an allow-listed origin prefix,
///    or if its authority equals the request's own Host header (same-origin
///    exemption).
///
/// The same-origin comparison strips the scheme and path and then compares
/// authority strings verbatim, without normalization. Behind a proxy that
/// forwards arbitrary Host values this exemption is only as trustworthy as
/// the proxy configuration.
pub fn validate_origin(
    method: &Method,
    origin: Option<&str>,
    referer: Option<&str>,
    host: Option<&str>,
    allowed_origins: &[String],
) -> Result<(), CsrfError> {
    if matches!(method.as_str(), "GET" | "HEAD" | "OPTIONS") {
        return Ok(());
    }

    let candidate = match origin.or(referer) {
        Some(value) => value,
        None => return Err(CsrfError::MissingHeaders),
    };

    if allowed_origins
        .iter()
        .any(|allowed| candidate.starts_with(allowed.as_str()))
    {
        return Ok(());
    }

    if let Some(host) = host {
        if authority_of(candidate) == host {
            return Ok(());
        }
    }

    Err(CsrfError::InvalidOrigin)
}

/// Extracts the authority (host[:port]) portion of an Origin or Referer value.
fn authority_of(value: &str) -> &str {
    let without_scheme = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
        .unwrap_or(value);
    without_scheme.split('/').next().unwrap_or(without_scheme)
}
