use aliri_base64::{Base64Url, InvalidBase64Data};
use aliri_clock::{Clock, System, UnixTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AccessToken, AccessTokenRef, RefreshToken, RefreshTokenRef};

/// The credentials of the current session
///
/// At most one set of credentials is current at any time. A successful
/// refresh replaces the credentials as a whole rather than merging fields,
/// with the single exception of [`rotate()`][Self::rotate()] carrying over a
/// refresh token that the server chose not to reissue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    access_token: AccessToken,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<RefreshToken>,
}

impl Credentials {
    /// Constructs credentials holding only an access token
    pub fn new(access_token: impl Into<AccessToken>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
        }
    }

    /// Attaches a refresh token to these credentials
    pub fn with_refresh_token(mut self, refresh_token: impl Into<RefreshToken>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Gets the access token
    #[inline]
    pub fn access_token(&self) -> &AccessTokenRef {
        &self.access_token
    }

    /// Gets the refresh token, if one is held client-side
    #[inline]
    pub fn refresh_token(&self) -> Option<&RefreshTokenRef> {
        self.refresh_token.as_deref()
    }

    /// Produces the credentials that replace these after a refresh
    ///
    /// If `fresh` does not carry a refresh token, the current one is kept.
    pub fn rotate(&self, fresh: Credentials) -> Credentials {
        Credentials {
            access_token: fresh.access_token,
            refresh_token: fresh.refresh_token.or_else(|| self.refresh_token.clone()),
        }
    }

    /// Gets the status of the access token according to the system clock
    #[inline]
    pub fn status(&self) -> CredentialStatus {
        self.status_with_clock(&System)
    }

    /// Gets the status of the access token according to the provided clock
    #[inline]
    pub fn status_with_clock<C: Clock + ?Sized>(&self, clock: &C) -> CredentialStatus {
        self.status_at(clock.now())
    }

    /// Gets the status of the access token as of the provided time
    pub fn status_at(&self, time: UnixTime) -> CredentialStatus {
        match UntrustedClaims::decode(&self.access_token) {
            Ok(claims) => match claims.exp {
                Some(exp) if exp <= time => CredentialStatus::Expired,
                _ => CredentialStatus::Valid,
            },
            Err(error) => {
                tracing::debug!(
                    error = (&error as &dyn std::error::Error),
                    "access token is not a well-formed JWT"
                );
                CredentialStatus::Malformed
            }
        }
    }
}

/// The local view of an access token's validity
///
/// This is a structural check only. The signature is never verified on the
/// client; the server remains the authority on whether a token is accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialStatus {
    /// The token is well formed and not yet expired
    Valid,
    /// The token's `exp` claim is in the past
    Expired,
    /// The token is not a decodable JWT
    Malformed,
}

/// An access token that could not be decoded as a JWT
#[derive(Debug, Error)]
pub enum MalformedToken {
    /// The token did not consist of three dot-separated segments
    #[error("expected 3 token segments, found {0}")]
    SegmentCount(usize),
    /// The payload segment was not valid base64url
    #[error("token payload is not valid base64url")]
    Base64(#[from] InvalidBase64Data),
    /// The payload was not a JSON claims object
    #[error("token payload is not a JSON claims object")]
    Claims(#[from] serde_json::Error),
}

/// Claims read from an access token without verifying its signature
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct UntrustedClaims {
    /// The expiration time of the token
    #[serde(default)]
    pub exp: Option<UnixTime>,
    /// The time the token was issued
    #[serde(default)]
    pub iat: Option<UnixTime>,
}

impl UntrustedClaims {
    /// Decodes the payload segment of a compact JWT
    pub fn decode(token: &AccessTokenRef) -> Result<Self, MalformedToken> {
        let segments: Vec<&str> = token.as_str().split('.').collect();
        if segments.len() != 3 {
            return Err(MalformedToken::SegmentCount(segments.len()));
        }

        let payload = Base64Url::from_encoded(segments[1])?;
        Ok(serde_json::from_slice(payload.as_slice())?)
    }
}

#[cfg(test)]
pub(crate) mod test_tokens {
    use aliri_base64::Base64UrlRef;

    use crate::AccessToken;

    /// Builds an unsigned compact JWT with the given claims
    pub fn jwt(claims: serde_json::Value) -> AccessToken {
        let header = Base64UrlRef::from_slice(br#"{"alg":"HS256","typ":"JWT"}"#).to_string();
        let payload = Base64UrlRef::from_slice(claims.to_string().as_bytes()).to_string();
        AccessToken::new(format!("{}.{}.c2lnbmF0dXJl", header, payload))
    }
}

#[cfg(test)]
mod tests {
    use aliri_clock::TestClock;
    use serde_json::json;

    use super::test_tokens::jwt;
    use super::*;

    #[test]
    fn token_before_expiry_is_valid() {
        let creds = Credentials::new(jwt(json!({ "sub": "admin", "exp": 1_000 })));
        let clock = TestClock::new(UnixTime(999));
        assert_eq!(creds.status_with_clock(&clock), CredentialStatus::Valid);
    }

    #[test]
    fn token_at_expiry_is_expired() {
        let creds = Credentials::new(jwt(json!({ "exp": 1_000 })));
        assert_eq!(creds.status_at(UnixTime(1_000)), CredentialStatus::Expired);
    }

    #[test]
    fn token_without_expiry_is_valid() {
        let creds = Credentials::new(jwt(json!({ "sub": "admin" })));
        assert_eq!(creds.status_at(UnixTime(u64::MAX)), CredentialStatus::Valid);
    }

    #[test]
    fn opaque_token_is_malformed() {
        let creds = Credentials::new("not-a-jwt");
        assert_eq!(creds.status_at(UnixTime(0)), CredentialStatus::Malformed);
    }

    #[test]
    fn garbage_payload_is_malformed() {
        let creds = Credentials::new("aGVhZGVy.!!!.c2ln");
        assert_eq!(creds.status_at(UnixTime(0)), CredentialStatus::Malformed);
    }

    #[test]
    fn decode_reports_segment_count() {
        let err = UntrustedClaims::decode(&AccessToken::from_static("a.b")).unwrap_err();
        assert!(matches!(err, MalformedToken::SegmentCount(2)));
    }

    #[test]
    fn rotate_keeps_refresh_token_when_not_reissued() {
        let current = Credentials::new("old").with_refresh_token("refresh-1");
        let next = current.rotate(Credentials::new("new"));
        assert_eq!(next.access_token().as_str(), "new");
        assert_eq!(next.refresh_token().map(|r| r.as_str()), Some("refresh-1"));
    }

    #[test]
    fn rotate_replaces_reissued_refresh_token() {
        let current = Credentials::new("old").with_refresh_token("refresh-1");
        let next = current.rotate(Credentials::new("new").with_refresh_token("refresh-2"));
        assert_eq!(next.refresh_token().map(|r| r.as_str()), Some("refresh-2"));
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let creds = Credentials::new("a").with_refresh_token("r");
        let value = serde_json::to_value(&creds).unwrap();
        assert_eq!(value, json!({ "accessToken": "a", "refreshToken": "r" }));
    }
}
