//! Authentication extraction (SPEC_FULL §6 Open Question "Principal resolution transport"):
//! `Authorization: Bearer <jwt>`, `Authorization: ApiKey <key>`, or HTTP Basic (OCI clients,
//! where the password field carries the API key) are all reduced to a single opaque
//! credential string and handed to [`PrincipalResolver::resolve`]. Token issuance and
//! password verification happen inside whatever resolver is configured; this module only
//! does the wire-level extraction spec §1 keeps out of the core's scope.
use axum::http::HeaderMap;

use lodestone_core::model::Principal;
use lodestone_core::ports::PrincipalResolver;
use lodestone_core::Error as CoreError;

/// Pulls a bearer/apikey/basic credential out of `Authorization`, resolving it to a
/// [`Principal`] via `resolver`. Returns `Ok(None)` when no `Authorization` header is
/// present at all (anonymous request — the caller decides whether that's acceptable for
/// the operation at hand); an `Authorization` header that fails to resolve is always an
/// error, never silently treated as anonymous.
pub async fn authenticate(
    headers: &HeaderMap,
    resolver: &dyn PrincipalResolver,
) -> Result<Option<Principal>, CoreError> {
    let Some(value) = headers.get(http::header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| CoreError::InvalidRequest("Authorization header is not valid UTF-8".to_string()))?;

    let credential = extract_credential(value)?;
    resolver.resolve(&credential).await.map(Some)
}

/// Like [`authenticate`], but turns a missing `Authorization` header into `Unauthenticated`
/// rather than `None`, for operations that never permit anonymous access (OCI pushes, all
/// non-OCI publish/delete/ownership operations).
pub async fn require_principal(
    headers: &HeaderMap,
    resolver: &dyn PrincipalResolver,
) -> Result<Principal, CoreError> {
    authenticate(headers, resolver).await?.ok_or(CoreError::Unauthenticated)
}

fn extract_credential(value: &str) -> Result<String, CoreError> {
    if let Some(token) = value.strip_prefix("Bearer ") {
        return Ok(token.trim().to_string());
    }
    if let Some(key) = value.strip_prefix("ApiKey ") {
        return Ok(key.trim().to_string());
    }
    if let Some(encoded) = value.strip_prefix("Basic ") {
        use base64::Engine;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|_| CoreError::InvalidRequest("malformed Basic credentials".to_string()))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|_| CoreError::InvalidRequest("Basic credentials are not valid UTF-8".to_string()))?;
        let (_username, password) = decoded
            .split_once(':')
            .ok_or_else(|| CoreError::InvalidRequest("malformed Basic credentials".to_string()))?;
        return Ok(password.to_string());
    }
    Err(CoreError::InvalidRequest(
        "unsupported Authorization scheme".to_string(),
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(extract_credential("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
    }

    #[test]
    fn extracts_apikey() {
        assert_eq!(extract_credential("ApiKey sk-12345").unwrap(), "sk-12345");
    }

    #[test]
    fn extracts_basic_password_as_credential() {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode("someuser:sk-12345");
        let credential = extract_credential(&format!("Basic {encoded}")).unwrap();
        assert_eq!(credential, "sk-12345");
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!(extract_credential("Digest foo").is_err());
    }
}
